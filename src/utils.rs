//! Utility modules
//!
//! **Why**: Filesystem heuristics kept apart from the strip arithmetic
//!
//! **Used by**: entities::strip (offset resolution), config (probe selection)

pub mod sequences;
