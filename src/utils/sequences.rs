//! Image sequence membership probing
//!
//! **Why**: A still image placed on the timeline is often one frame of a
//! numbered family (`shot_0001.png`, `shot_0002.png`, ...). Its source-in
//! point has to reflect where it physically sits in that family, not just the
//! timeline's trim bookkeeping.
//!
//! **Used by**: `Strip::from_record` for `Image` strips
//!
//! # Algorithm
//!
//! 1. Find the LAST run of ASCII digits in the filename (the frame token)
//! 2. Split into prefix / token / suffix, keep the token's padding
//! 3. Walk downward from `number - 1`, rebuilding padded names, and count
//!    consecutive files that exist; stop at the first gap or below frame 1
//! 4. `image_offset = real_offset - frame_offset_start`
//!
//! This is a best-effort heuristic tied to the zero-padded numeric-suffix
//! naming convention. Any probe failure degrades to "no correction".
//!
//! # Probes
//!
//! Membership checks go through [`SequenceProbe`]:
//! - [`DiskProbe`] - one existence check per candidate
//! - [`ListingProbe`] - one `read_dir` per directory per export run
//! - [`MemoryProbe`] - in-memory listing, for tests and dry runs

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

lazy_static! {
    // ASCII only: `\d` would also match non-ASCII digits.
    static ref FRAME_NUMBER: Regex = Regex::new(r"[0-9]+").expect("frame number regex");
}

/// Filename split around its frame number.
///
/// Example: `"shot_0005.png"` -> prefix `"shot_"`, number 5, padding 4, suffix `".png"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameToken {
    pub prefix: String,
    pub number: u64,
    pub padding: usize,
    pub suffix: String,
}

impl FrameToken {
    /// Parse the last digit run of `filename`. `None` if there is no digit run
    /// or the run does not fit a `u64`.
    pub fn parse(filename: &str) -> Option<Self> {
        let last = FRAME_NUMBER.find_iter(filename).last()?;
        let number = match last.as_str().parse::<u64>() {
            Ok(n) => n,
            Err(e) => {
                debug!("Frame number '{}' in {} unusable: {}", last.as_str(), filename, e);
                return None;
            }
        };

        Some(Self {
            prefix: filename[..last.start()].to_string(),
            number,
            padding: last.as_str().len(),
            suffix: filename[last.end()..].to_string(),
        })
    }

    /// Sibling filename for another frame number, same padding.
    pub fn filename(&self, number: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = self.padding
        )
    }
}

/// Answers "does this file exist in that directory".
///
/// Errors mean the directory could not be inspected; callers treat them as
/// degraded probing, not as export failures.
pub trait SequenceProbe {
    fn contains(&self, dir: &Path, filename: &str) -> io::Result<bool>;
}

/// Stats each candidate on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskProbe;

impl SequenceProbe for DiskProbe {
    fn contains(&self, dir: &Path, filename: &str) -> io::Result<bool> {
        dir.join(filename).try_exists()
    }
}

/// Reads each directory once and answers from the cached listing.
///
/// Listings are kept for the lifetime of the probe, so create one per export
/// run. Failed reads are not cached.
#[derive(Debug, Default)]
pub struct ListingProbe {
    listings: Mutex<HashMap<PathBuf, Arc<HashSet<String>>>>,
}

impl ListingProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directories listed so far
    pub fn cached_dirs(&self) -> usize {
        self.listings.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn listing(&self, dir: &Path) -> io::Result<Arc<HashSet<String>>> {
        let mut listings = self.listings.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(listing) = listings.get(dir) {
            return Ok(Arc::clone(listing));
        }

        let mut names = HashSet::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Ok(name) = entry.file_name().into_string() {
                names.insert(name);
            }
        }
        debug!("Listed {} ({} entries)", dir.display(), names.len());

        let listing = Arc::new(names);
        listings.insert(dir.to_path_buf(), Arc::clone(&listing));
        Ok(listing)
    }
}

impl SequenceProbe for ListingProbe {
    fn contains(&self, dir: &Path, filename: &str) -> io::Result<bool> {
        Ok(self.listing(dir)?.contains(filename))
    }
}

/// In-memory directory listing.
///
/// Unknown directories behave like missing ones on disk (`NotFound`).
#[derive(Debug, Default, Clone)]
pub struct MemoryProbe {
    dirs: HashMap<PathBuf, HashSet<String>>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `files` under `dir` (builder style).
    pub fn with_files<I, S>(mut self, dir: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirs
            .entry(dir.into())
            .or_default()
            .extend(files.into_iter().map(Into::into));
        self
    }
}

impl SequenceProbe for MemoryProbe {
    fn contains(&self, dir: &Path, filename: &str) -> io::Result<bool> {
        match self.dirs.get(dir) {
            Some(files) => Ok(files.contains(filename)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no listing for {}", dir.display()),
            )),
        }
    }
}

/// Result of resolving one still image against its numbered family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOffset {
    /// Correction added to the strip's source-in (`real_offset - frame_offset_start`).
    pub image_offset: i64,
    /// Consecutive predecessors found on disk.
    pub real_offset: i64,
    /// Probing was attempted but found nothing usable.
    pub degraded: bool,
}

/// Count existing files directly preceding `filename` in its numbered family.
///
/// Returns `(real_offset, degraded)`. An I/O error discards any partial
/// count and reports 0.
pub fn count_predecessors(probe: &dyn SequenceProbe, dir: &Path, filename: &str) -> (i64, bool) {
    let Some(token) = FrameToken::parse(filename) else {
        debug!("{}: no frame number, not part of a sequence", filename);
        return (0, false);
    };

    let mut found = 0i64;
    let mut candidate = token.number;
    while candidate > 1 {
        candidate -= 1;
        let name = token.filename(candidate);
        match probe.contains(dir, &name) {
            Ok(true) => found += 1,
            Ok(false) => break,
            Err(e) => {
                warn!(
                    "Sequence probe degraded for {} in {}: {}",
                    filename,
                    dir.display(),
                    e
                );
                return (0, true);
            }
        }
    }

    // Frames 0 and 1 have nothing before them; that is not a probe failure.
    if found == 0 && token.number > 1 {
        warn!(
            "Sequence probe degraded for {} in {}: no preceding frame {} found",
            filename,
            dir.display(),
            token.filename(token.number - 1)
        );
        return (0, true);
    }

    debug!("{}: {} consecutive predecessor(s)", filename, found);
    (found, false)
}

/// Resolve the source-in correction for a single-image strip.
///
/// `None` when `real_offset - frame_offset_start` does not fit in an `i64`.
pub fn resolve_image_offset(
    probe: &dyn SequenceProbe,
    dir: &Path,
    filename: Option<&str>,
    frame_offset_start: i64,
) -> Option<ImageOffset> {
    let Some(filename) = filename else {
        return Some(ImageOffset {
            image_offset: 0,
            real_offset: 0,
            degraded: false,
        });
    };

    if FrameToken::parse(filename).is_none() {
        // Not part of a numbered family: no correction at all.
        return Some(ImageOffset {
            image_offset: 0,
            real_offset: 0,
            degraded: false,
        });
    }

    let (real_offset, degraded) = count_predecessors(probe, dir, filename);
    Some(ImageOffset {
        image_offset: real_offset.checked_sub(frame_offset_start)?,
        real_offset,
        degraded,
    })
}
