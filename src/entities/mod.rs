//! Entities module - the data an export pass works on
//!
//! - `timeline` - host timeline snapshot (read-only strip records, frame rate)
//! - `strip` - resolved strips with per-variant in/out arithmetic

pub mod strip;
pub mod timeline;

pub use strip::{Strip, StripKind};
pub use timeline::{StripElement, StripRecord, StripType, Timeline};
