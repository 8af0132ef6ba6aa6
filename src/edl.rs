//! EDL channel grouping, ordering and serialization
//!
//! One EDL file per channel:
//!
//! ```text
//! TITLE: <title>
//! 001 <reel>    V C <src_in> <src_out> <edit_in> <edit_out>
//! M2 <reel>    000.0 <src_in>        (stills only, followed by a blank line)
//! 002 ...
//! ```
//!
//! Strips are grouped by channel, stable-sorted by effective edit-in
//! (`frame_start + frame_offset_start`), then numbered from 1 in that order.
//! Ties keep encounter order; there is no secondary key.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::entities::Strip;
use crate::error::Result;
use crate::timecode::FrameRate;

/// Partition strips by channel, keeping encounter order inside each channel.
pub fn group_by_channel(strips: impl IntoIterator<Item = Strip>) -> BTreeMap<i32, Vec<Strip>> {
    let mut channels: BTreeMap<i32, Vec<Strip>> = BTreeMap::new();
    for strip in strips {
        channels.entry(strip.channel()).or_default().push(strip);
    }
    channels
}

/// Stable sort by effective edit-in.
pub fn sort_channel(strips: &mut [Strip]) {
    strips.sort_by_key(Strip::edit_in);
}

/// Group and sort in one step. Event index of a strip is its position + 1.
pub fn order_channels(strips: impl IntoIterator<Item = Strip>) -> BTreeMap<i32, Vec<Strip>> {
    let mut channels = group_by_channel(strips);
    for (channel, strips) in channels.iter_mut() {
        sort_channel(strips);
        debug!("Channel {}: {} event(s)", channel, strips.len());
    }
    channels
}

/// `{base}-V{channel}.edl`, with a trailing `.edl` stripped from `base` first.
///
/// Example: `/out/cut.edl`, channel 2 -> `/out/cut-V2.edl`
pub fn channel_path(base: &Path, channel: i32) -> PathBuf {
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".edl").unwrap_or(&name);
    base.with_file_name(format!("{}-V{}.edl", stem, channel))
}

/// Render one channel's EDL text. `strips` must already be sorted.
pub fn render_channel(title: &str, strips: &[Strip], rate: &FrameRate) -> Result<String> {
    let mut out = format!("TITLE: {}\n", title);
    for (i, strip) in strips.iter().enumerate() {
        out.push_str(&strip.to_edl(i + 1, rate)?);
    }
    Ok(out)
}

/// Create `path` and write `content` into it.
pub fn write_channel(path: &Path, content: &str) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(content.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{StripKind, StripRecord, StripType};
    use crate::utils::sequences::MemoryProbe;

    fn video(name: &str, channel: i32, frame_start: i64, offset: i64, duration: i64) -> Strip {
        let record = StripRecord {
            name: Some(name.to_string()),
            strip_type: StripType::Video,
            channel,
            frame_start,
            frame_offset_start: offset,
            frame_final_duration: duration,
            directory: format!("/shots/{}/", name),
            elements: Vec::new(),
        };
        Strip::from_record(&record, StripKind::Video, 0, &MemoryProbe::new())
            .unwrap()
            .0
    }

    fn names(strips: &[Strip]) -> Vec<&str> {
        strips.iter().map(Strip::identity).collect()
    }

    #[test]
    fn test_group_and_sort() {
        let channels = order_channels(vec![
            video("c", 1, 40, 0, 5),
            video("x", 2, 0, 0, 5),
            video("a", 1, 0, 0, 5),
            video("b", 1, 10, 5, 5), // effective 15
        ]);

        assert_eq!(channels.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(names(&channels[&1]), vec!["a", "b", "c"]);
        assert_eq!(names(&channels[&2]), vec!["x"]);
    }

    #[test]
    fn test_sort_is_stable() {
        // Same effective edit-in (20) from different start/offset splits
        let channels = order_channels(vec![
            video("first", 1, 20, 0, 5),
            video("early", 1, 0, 0, 5),
            video("second", 1, 15, 5, 5),
            video("third", 1, 10, 10, 5),
        ]);
        assert_eq!(names(&channels[&1]), vec!["early", "first", "second", "third"]);
    }

    #[test]
    fn test_channel_path() {
        assert_eq!(channel_path(Path::new("/out/cut.edl"), 1), PathBuf::from("/out/cut-V1.edl"));
        assert_eq!(channel_path(Path::new("/out/cut"), 3), PathBuf::from("/out/cut-V3.edl"));
        assert_eq!(channel_path(Path::new("cut.v2.edl"), 2), PathBuf::from("cut.v2-V2.edl"));
        // Only a literal ".edl" suffix is stripped
        assert_eq!(channel_path(Path::new("cut.EDL"), 1), PathBuf::from("cut.EDL-V1.edl"));
    }

    #[test]
    fn test_render_channel() {
        let rate = FrameRate::new(24, 1).unwrap();
        let strips = vec![video("SceneA", 1, 0, 0, 10), video("SceneB", 1, 10, 0, 5)];
        let text = render_channel("Agent 327", &strips, &rate).unwrap();

        assert_eq!(
            text,
            "TITLE: Agent 327\n\
             001 SceneA   V C 00:00:00:00 00:00:00:10 00:59:59:23 01:00:00:09\n\
             002 SceneB   V C 00:00:00:00 00:00:00:05 01:00:00:09 01:00:00:14\n"
        );
    }

    #[test]
    fn test_write_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut-V1.edl");
        write_channel(&path, "TITLE: x\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TITLE: x\n");

        let bad = dir.path().join("missing").join("cut-V1.edl");
        assert!(write_channel(&bad, "TITLE: x\n").is_err());
    }
}
