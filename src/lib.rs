//! strip-edl - timeline strips to per-channel EDL files
//!
//! Pipeline: timeline records -> strips (still images probed against their
//! numbered sequence) -> grouped/sorted per channel -> EDL text -> files.

pub mod cli;
pub mod config;
pub mod edl;
pub mod entities;
pub mod error;
pub mod export;
pub mod paths;
pub mod timecode;
pub mod utils;

pub use config::{ExportSettings, ProbeMode, StripFailurePolicy};
pub use entities::{Strip, StripKind, StripRecord, StripType, Timeline};
pub use error::{EdlError, Result};
pub use export::{export, ChannelOutput, ExportOptions, ExportReport, PreparedExport};
pub use timecode::{to_timecode, FrameRate, Timecode, TimecodeProfile};
