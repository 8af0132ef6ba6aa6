//! Strip: one exportable clip on a timeline channel.
//!
//! # Variants
//!
//! `StripKind` is a closed set. Every variant shares the same base
//! arithmetic; they differ only in `image_offset`, computed once at
//! construction by [`image_offset_for`]:
//!
//! - `Video` - offset 0
//! - `ImageSequence` - offset 0 (the sequence numbering already encodes trim)
//! - `Image` - offset from the sequence probe, may be negative
//!
//! # Coordinate Systems
//!
//! - `frame_start` - timeline frame of the unoffset first frame
//! - `frame_offset_start` - frames trimmed from the head
//! - `frame_final_duration` - visible frames
//!
//! Computed once at construction (overflow is a per-strip error):
//! - `source_in()` = `image_offset + frame_offset_start`
//! - `source_out()` = `source_in() + frame_final_duration`
//! - `edit_in()` = `frame_start + frame_offset_start`
//! - `edit_out()` = `edit_in() + frame_final_duration`
//!
//! so `edit_out - edit_in == source_out - source_in == frame_final_duration`.

use std::fmt::Write as _;
use std::path::{self, Path};

use crate::error::{EdlError, Result};
use crate::timecode::{FrameRate, Timecode, TimecodeProfile};
use crate::utils::sequences::{resolve_image_offset, SequenceProbe};

use super::timeline::{StripRecord, StripType};

/// Reel names are capped to this many characters.
pub const REEL_NAME_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripKind {
    Video,
    ImageSequence,
    Image,
}

impl StripKind {
    /// Map a host record onto a variant. `None` = not exportable.
    pub fn classify(record: &StripRecord) -> Option<Self> {
        match record.strip_type {
            StripType::Video => Some(StripKind::Video),
            StripType::ImageSequence => Some(StripKind::ImageSequence),
            StripType::Image if record.elements.len() > 1 => Some(StripKind::ImageSequence),
            StripType::Image => Some(StripKind::Image),
            StripType::Unsupported => None,
        }
    }

    /// EDL channel code.
    pub fn channel_type(self) -> &'static str {
        match self {
            StripKind::Video | StripKind::ImageSequence | StripKind::Image => "V",
        }
    }

    /// Still images hold a single frame and need an `M2` freeze directive.
    pub fn is_freeze(self) -> bool {
        matches!(self, StripKind::Image)
    }
}

/// Per-variant source-in correction.
///
/// Returns `(image_offset, degraded)`, `degraded` meaning the sequence probe
/// could not find anything and fell back to no correction. `None` when the
/// correction overflows.
pub fn image_offset_for(
    kind: StripKind,
    record: &StripRecord,
    probe: &dyn SequenceProbe,
) -> Option<(i64, bool)> {
    match kind {
        StripKind::Video | StripKind::ImageSequence => Some((0, false)),
        StripKind::Image => {
            let res = resolve_image_offset(
                probe,
                Path::new(&record.directory),
                record.first_filename(),
                record.frame_offset_start,
            )?;
            Some((res.image_offset, res.degraded))
        }
    }
}

/// Reel name: second-to-last separator-delimited segment, capped at 7 chars.
///
/// `/renders/SceneA/` splits into `["", "renders", "SceneA", ""]`, giving
/// `SceneA`. Fewer than two segments or an empty segment is an error.
pub fn reel_name(directory: &str) -> Option<String> {
    let segments: Vec<&str> = directory.split(path::is_separator).collect();
    if segments.len() < 2 {
        return None;
    }
    let segment = segments[segments.len() - 2];
    if segment.is_empty() {
        return None;
    }
    Some(segment.chars().take(REEL_NAME_LEN).collect())
}

/// Resolved, immutable strip for one export pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strip {
    kind: StripKind,
    identity: String,
    channel: i32,
    frame_final_duration: i64,
    reel_name: String,
    image_offset: i64,
    source_in: i64,
    source_out: i64,
    edit_in: i64,
    edit_out: i64,
}

impl Strip {
    /// Build from a host record, probing the filesystem for `Image` strips.
    ///
    /// `kind` comes from [`StripKind::classify`]. Returns the strip and
    /// whether its sequence probe degraded.
    pub fn from_record(
        record: &StripRecord,
        kind: StripKind,
        position: usize,
        probe: &dyn SequenceProbe,
    ) -> Result<(Self, bool)> {
        let identity = record.identity(position);

        if record.frame_final_duration < 0 {
            return Err(EdlError::InvalidDuration {
                strip: identity,
                duration: record.frame_final_duration,
            });
        }

        let reel_name = reel_name(&record.directory).ok_or_else(|| EdlError::MalformedStripPath {
            strip: identity.clone(),
            directory: record.directory.clone(),
        })?;

        let overflow = |field| EdlError::FrameOverflow {
            subject: format!("Strip {}", identity),
            field,
        };

        let (image_offset, degraded) =
            image_offset_for(kind, record, probe).ok_or_else(|| overflow("image_offset"))?;

        let duration = record.frame_final_duration;
        let source_in = image_offset
            .checked_add(record.frame_offset_start)
            .ok_or_else(|| overflow("source_in"))?;
        let source_out = source_in.checked_add(duration).ok_or_else(|| overflow("source_out"))?;
        let edit_in = record
            .frame_start
            .checked_add(record.frame_offset_start)
            .ok_or_else(|| overflow("edit_in"))?;
        let edit_out = edit_in.checked_add(duration).ok_or_else(|| overflow("edit_out"))?;

        Ok((
            Self {
                kind,
                identity,
                channel: record.channel,
                frame_final_duration: duration,
                reel_name,
                image_offset,
                source_in,
                source_out,
                edit_in,
                edit_out,
            },
            degraded,
        ))
    }

    pub fn kind(&self) -> StripKind {
        self.kind
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn channel(&self) -> i32 {
        self.channel
    }

    pub fn reel_name(&self) -> &str {
        &self.reel_name
    }

    pub fn image_offset(&self) -> i64 {
        self.image_offset
    }

    pub fn duration(&self) -> i64 {
        self.frame_final_duration
    }

    pub fn source_in(&self) -> i64 {
        self.source_in
    }

    pub fn source_out(&self) -> i64 {
        self.source_out
    }

    pub fn edit_in(&self) -> i64 {
        self.edit_in
    }

    pub fn edit_out(&self) -> i64 {
        self.edit_out
    }

    /// Fail if any of the four in/out timecodes would be negative.
    ///
    /// Run before indexing so a rejected strip never leaves a hole in the
    /// event numbering.
    pub fn check_timecodes(&self, rate: &FrameRate) -> Result<()> {
        self.checked_tc("source_in", self.source_in(), rate, TimecodeProfile::Direct)?;
        self.checked_tc("source_out", self.source_out(), rate, TimecodeProfile::Direct)?;
        self.checked_tc("edit_in", self.edit_in(), rate, TimecodeProfile::ResolveOffset)?;
        self.checked_tc("edit_out", self.edit_out(), rate, TimecodeProfile::ResolveOffset)?;
        Ok(())
    }

    /// Render this strip's EDL event (and freeze directive for stills).
    ///
    /// Source timecodes are `Direct`, record timecodes `ResolveOffset`.
    /// Any negative timecode is a data inconsistency and fails the strip.
    pub fn to_edl(&self, index: usize, rate: &FrameRate) -> Result<String> {
        let source_in = self.checked_tc("source_in", self.source_in(), rate, TimecodeProfile::Direct)?;
        let source_out = self.checked_tc("source_out", self.source_out(), rate, TimecodeProfile::Direct)?;
        let edit_in = self.checked_tc("edit_in", self.edit_in(), rate, TimecodeProfile::ResolveOffset)?;
        let edit_out = self.checked_tc("edit_out", self.edit_out(), rate, TimecodeProfile::ResolveOffset)?;

        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{:03} {:<8} {} C {} {} {} {}",
            index,
            self.reel_name,
            self.kind.channel_type(),
            source_in,
            source_out,
            edit_in,
            edit_out,
        );

        if self.kind.is_freeze() {
            let _ = write!(out, "M2 {:<8} 000.0 {}\n\n", self.reel_name, source_in);
        }

        Ok(out)
    }

    fn checked_tc(
        &self,
        field: &'static str,
        frame: i64,
        rate: &FrameRate,
        profile: TimecodeProfile,
    ) -> Result<Timecode> {
        let shifted = profile.apply(frame, rate).ok_or_else(|| EdlError::FrameOverflow {
            subject: format!("Strip {}", self.identity),
            field,
        })?;
        if shifted < 0 {
            return Err(EdlError::NegativeTimecode {
                strip: self.identity.clone(),
                field,
                frame: shifted,
            });
        }
        Ok(Timecode::from_frame(shifted, rate))
    }
}
