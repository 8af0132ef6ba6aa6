//! Frame number to SMPTE timecode conversion
//!
//! Timecodes are non-drop-frame: frames are counted at the *nominal* integer
//! rate (24 for 23.976, 30 for 29.97), so every value is exact integer
//! arithmetic on a numerator/denominator pair. No floating point is involved.
//!
//! # Profiles
//!
//! Some destination tools expect record (edit) timecodes on a different
//! origin than source timecodes. Each quirk is a [`TimecodeProfile`] variant
//! applied to the frame number *before* conversion, so the HH:MM:SS:FF
//! formula itself never changes:
//!
//! - `Direct` - no adjustment
//! - `ResolveOffset` - `frame + round(fps) * 3600 - 1` (one hour minus one frame)
//!
//! # Examples
//!
//! ```
//! use strip_edl::timecode::{to_timecode, TimecodeProfile};
//!
//! assert_eq!(to_timecode(0, 24, 1, TimecodeProfile::Direct).unwrap(), "00:00:00:00");
//! assert_eq!(to_timecode(1, 24, 1, TimecodeProfile::ResolveOffset).unwrap(), "01:00:00:00");
//! ```

use std::fmt;

use crate::error::{EdlError, Result};

/// Project frame rate as an exact rational (`fps` / `fps_base` in host terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    numerator: i64,
    denominator: i64,
    nominal: i64,
}

impl FrameRate {
    /// Validate and build a frame rate.
    ///
    /// Fails with `InvalidFrameRate` for non-positive parts, when the rate
    /// rounds to zero whole frames per second, or when one hour of frames
    /// does not fit in an `i64`.
    pub fn new(numerator: i64, denominator: i64) -> Result<Self> {
        let invalid = || EdlError::InvalidFrameRate { numerator, denominator };
        if numerator <= 0 || denominator <= 0 {
            return Err(invalid());
        }

        // Rounded in i128 so `2 * numerator` cannot overflow
        let (num, den) = (i128::from(numerator), i128::from(denominator));
        let nominal = i64::try_from((2 * num + den) / (2 * den)).map_err(|_| invalid())?;
        if nominal == 0 || nominal.checked_mul(3600).is_none() {
            return Err(invalid());
        }

        Ok(Self {
            numerator,
            denominator,
            nominal,
        })
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Nearest integer frame rate, half rounds up (24000/1001 -> 24).
    pub fn nominal(&self) -> i64 {
        self.nominal
    }

    /// Frames in one hour at the nominal rate. Fits by construction.
    pub fn frames_per_hour(&self) -> i64 {
        self.nominal * 3600
    }

    /// Convert a frame number under the given profile.
    ///
    /// `None` when the profile shift pushes the frame past `i64::MAX`.
    pub fn timecode(&self, frame: i64, profile: TimecodeProfile) -> Option<Timecode> {
        profile
            .apply(frame, self)
            .map(|shifted| Timecode::from_frame(shifted, self))
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{} fps", self.numerator)
        } else {
            write!(f, "{}/{} fps", self.numerator, self.denominator)
        }
    }
}

/// Destination-specific adjustment applied before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimecodeProfile {
    /// Frame converted as-is.
    #[default]
    Direct,
    /// Record timecodes start one hour minus one frame later.
    ResolveOffset,
}

impl TimecodeProfile {
    /// Shift `frame` onto this profile's origin, `None` on overflow.
    pub fn apply(self, frame: i64, rate: &FrameRate) -> Option<i64> {
        match self {
            TimecodeProfile::Direct => Some(frame),
            TimecodeProfile::ResolveOffset => frame.checked_add(rate.frames_per_hour() - 1),
        }
    }
}

/// Broken-down SMPTE timecode.
///
/// Negative frames are representable (rendered with a leading `-`) so that
/// upstream inconsistencies can be detected instead of silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    negative: bool,
    hours: i64,
    minutes: i64,
    seconds: i64,
    frames: i64,
    frame_digits: usize,
}

impl Timecode {
    pub fn from_frame(frame: i64, rate: &FrameRate) -> Self {
        let fps = rate.nominal().unsigned_abs();
        let total = frame.unsigned_abs();

        // Each value is below u64::MAX / 3600 or below fps, so it fits in i64
        Self {
            negative: frame < 0,
            hours: (total / (fps * 3600)) as i64,
            minutes: ((total / (fps * 60)) % 60) as i64,
            seconds: ((total / fps) % 60) as i64,
            frames: (total % fps) as i64,
            frame_digits: frame_digits(rate.nominal()),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn hours(&self) -> i64 {
        self.hours
    }

    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn frames(&self) -> i64 {
        self.frames
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:02}:{:02}:{:02}:{:0width$}",
            if self.negative { "-" } else { "" },
            self.hours,
            self.minutes,
            self.seconds,
            self.frames,
            width = self.frame_digits,
        )
    }
}

/// Width of the FF field: enough digits for `fps - 1`, never less than 2.
fn frame_digits(fps: i64) -> usize {
    (fps - 1).max(0).to_string().len().max(2)
}

/// Convert `frame` at `numerator/denominator` fps to `HH:MM:SS:FF`.
pub fn to_timecode(
    frame: i64,
    numerator: i64,
    denominator: i64,
    profile: TimecodeProfile,
) -> Result<String> {
    let rate = FrameRate::new(numerator, denominator)?;
    rate.timecode(frame, profile)
        .map(|tc| tc.to_string())
        .ok_or(EdlError::FrameOverflow {
            subject: format!("Frame {}", frame),
            field: "timecode",
        })
}
