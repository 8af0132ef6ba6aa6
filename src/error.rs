//! Error taxonomy for the export pipeline.
//!
//! Whole-export failures (`InvalidFrameRate`, timeline I/O) abort before any
//! file is touched. Per-strip failures are handled by the export's
//! `StripFailurePolicy`, per-channel write failures never stop other channels.
//!
//! Degraded sequence probing is deliberately *not* an error: the resolver
//! logs a warning and falls back to no correction.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdlError {
    /// Frame rate cannot produce timecodes: a non-positive part, a rate that
    /// rounds to 0 whole fps (e.g. 1/3), or one hour of frames overflowing `i64`.
    #[error("Invalid frame rate {numerator}/{denominator}")]
    InvalidFrameRate { numerator: i64, denominator: i64 },

    /// Strip directory has no usable second-to-last segment for a reel name.
    #[error("Strip {strip}: cannot derive reel name from directory '{directory}'")]
    MalformedStripPath { strip: String, directory: String },

    #[error("Strip {strip}: negative duration {duration}")]
    InvalidDuration { strip: String, duration: i64 },

    /// A computed in/out point lands before frame zero.
    #[error("Strip {strip}: {field} resolves to negative frame {frame}")]
    NegativeTimecode {
        strip: String,
        field: &'static str,
        frame: i64,
    },

    /// In/out point or profile shift does not fit in an `i64` frame number.
    #[error("{subject}: {field} overflows the frame range")]
    FrameOverflow {
        subject: String,
        field: &'static str,
    },

    /// Channel dropped because one of its strips failed (abort-channel policy).
    #[error("Channel {channel} aborted: {failures} strip(s) failed")]
    ChannelAborted { channel: i32, failures: usize },

    #[error("Channel {channel}: failed to write '{path}': {source}")]
    OutputWrite {
        channel: i32,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read timeline '{path}': {source}")]
    TimelineRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse timeline '{path}': {source}")]
    TimelineParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, EdlError>;
