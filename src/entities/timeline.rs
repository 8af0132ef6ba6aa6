//! Timeline: the read-only host data an export pass consumes.
//!
//! A timeline is a title, a rational frame rate and the flat list of strip
//! records exactly as the host reports them. It is the unit of
//! serialization: timelines are loaded via `Timeline::from_json` and can be
//! written back with `Timeline::to_json` (used by tests and tooling).
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "title": "Agent 327",
//!   "fps": 24, "fps_base": 1,
//!   "strips": [
//!     { "type": "IMAGE", "channel": 1, "frame_start": 1,
//!       "frame_offset_start": 0, "frame_final_duration": 12,
//!       "directory": "/renders/010_A/frames/",
//!       "elements": [{ "filename": "shot_0005.png" }] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EdlError, Result};
use crate::timecode::FrameRate;

/// Strip type as reported by the host.
///
/// Anything the exporter does not handle (sound, effects, color, text...)
/// deserializes to `Unsupported` and is skipped as ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StripType {
    /// Still image, or a numbered image sequence when it has several elements.
    Image,
    ImageSequence,
    #[serde(alias = "MOVIE")]
    Video,
    #[serde(other)]
    Unsupported,
}

/// One backing file of a strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripElement {
    pub filename: String,
}

/// A strip exactly as the host timeline exposes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripRecord {
    /// Host name, only used to identify the strip in reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub strip_type: StripType,
    pub channel: i32,
    pub frame_start: i64,
    #[serde(default)]
    pub frame_offset_start: i64,
    pub frame_final_duration: i64,
    /// Folder holding the backing file(s), usually with a trailing separator.
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub elements: Vec<StripElement>,
}

impl StripRecord {
    /// Human-readable identity for error reports.
    ///
    /// `position` is the record's index in the timeline's strip list.
    pub fn identity(&self, position: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("#{} on channel {}", position, self.channel),
        }
    }

    pub fn first_filename(&self) -> Option<&str> {
        self.elements.first().map(|e| e.filename.as_str())
    }
}

fn default_fps_base() -> i64 {
    1
}

/// Host timeline snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub title: String,
    /// Frame rate numerator
    pub fps: i64,
    /// Frame rate denominator
    #[serde(default = "default_fps_base")]
    pub fps_base: i64,
    #[serde(default)]
    pub strips: Vec<StripRecord>,
}

impl Timeline {
    pub fn new(title: impl Into<String>, fps: i64, fps_base: i64) -> Self {
        Self {
            title: title.into(),
            fps,
            fps_base,
            strips: Vec::new(),
        }
    }

    /// Validated project frame rate.
    pub fn frame_rate(&self) -> Result<FrameRate> {
        FrameRate::new(self.fps, self.fps_base)
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| EdlError::TimelineRead {
            path: path.to_path_buf(),
            source,
        })?;

        let timeline: Timeline =
            serde_json::from_str(&json).map_err(|source| EdlError::TimelineParse {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!(
            "Loaded timeline '{}' ({} strips) from {}",
            timeline.title,
            timeline.strips.len(),
            path.display()
        );
        Ok(timeline)
    }

    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
