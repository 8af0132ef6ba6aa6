//! Export pipeline: timeline -> per-channel EDL files
//!
//! **Why**: Ties the pieces together with the failure rules applied in one
//! place: whole-export, per-strip and per-channel errors each have their own
//! blast radius.
//!
//! # Stages
//!
//! 1. Validate frame rate (fatal on failure)
//! 2. Resolve strips in encounter order: classify, build (probing stills),
//!    check timecodes. Ineligible strips are dropped silently
//! 3. Apply the strip failure policy per channel
//! 4. Group by channel, stable sort, index from 1
//! 5. Render + write each channel (parallel across channels)

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::StripFailurePolicy;
use crate::edl::{channel_path, order_channels, render_channel, write_channel};
use crate::entities::{Strip, StripKind, Timeline};
use crate::error::{EdlError, Result};
use crate::timecode::FrameRate;
use crate::utils::sequences::SequenceProbe;

/// Per-run export parameters
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// `TITLE:` header line content
    pub title: String,
    /// Restrict export to these channels (`None` = all)
    pub channels: Option<BTreeSet<i32>>,
    pub strip_failure: StripFailurePolicy,
}

impl ExportOptions {
    fn wants_channel(&self, channel: i32) -> bool {
        self.channels
            .as_ref()
            .is_none_or(|selected| selected.contains(&channel))
    }
}

/// A written channel file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutput {
    pub channel: i32,
    pub path: PathBuf,
    pub events: usize,
}

/// Outcome of one export run
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<ChannelOutput>,
    /// Per-strip failures (malformed path, bad duration, negative timecode)
    pub strip_errors: Vec<EdlError>,
    /// Channels that produced no file because of an error
    pub failed_channels: Vec<EdlError>,
    /// Strips of unsupported type or outside the channel selection
    pub ineligible: usize,
    /// Still images whose sequence probe fell back to no correction
    pub degraded_probes: usize,
}

impl ExportReport {
    /// True when every channel with strips was written.
    pub fn is_success(&self) -> bool {
        self.failed_channels.is_empty()
    }
}

/// Strips resolved, filtered and ordered; nothing written yet.
#[derive(Debug)]
pub struct PreparedExport {
    title: String,
    rate: FrameRate,
    channels: BTreeMap<i32, Vec<Strip>>,
    report: ExportReport,
}

impl PreparedExport {
    /// Run stages 1-4.
    pub fn prepare(
        timeline: &Timeline,
        options: &ExportOptions,
        probe: &dyn SequenceProbe,
    ) -> Result<Self> {
        let rate = timeline.frame_rate()?;
        let mut report = ExportReport::default();
        let mut strips = Vec::with_capacity(timeline.strips.len());
        let mut failures: BTreeMap<i32, Vec<EdlError>> = BTreeMap::new();

        for (position, record) in timeline.strips.iter().enumerate() {
            let kind = match StripKind::classify(record) {
                Some(kind) if options.wants_channel(record.channel) => kind,
                _ => {
                    debug!(
                        "Ineligible strip {} ({:?})",
                        record.identity(position),
                        record.strip_type
                    );
                    report.ineligible += 1;
                    continue;
                }
            };

            let built = Strip::from_record(record, kind, position, probe).and_then(|(strip, degraded)| {
                strip.check_timecodes(&rate)?;
                Ok((strip, degraded))
            });

            match built {
                Ok((strip, degraded)) => {
                    if degraded {
                        report.degraded_probes += 1;
                    }
                    strips.push(strip);
                }
                Err(e) => {
                    warn!("{}", e);
                    failures.entry(record.channel).or_default().push(e);
                }
            }
        }

        if options.strip_failure == StripFailurePolicy::AbortChannel {
            strips.retain(|s| !failures.contains_key(&s.channel()));
            for (channel, errors) in &failures {
                warn!("Channel {} aborted after {} strip failure(s)", channel, errors.len());
                report.failed_channels.push(EdlError::ChannelAborted {
                    channel: *channel,
                    failures: errors.len(),
                });
            }
        }
        report.strip_errors = failures.into_values().flatten().collect();

        Ok(Self {
            title: options.title.clone(),
            rate,
            channels: order_channels(strips),
            report,
        })
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Strip failures, ineligible and degraded counts gathered so far.
    pub fn report(&self) -> &ExportReport {
        &self.report
    }

    /// Ordered strips per channel. A strip's event index is its position + 1.
    pub fn channels(&self) -> &BTreeMap<i32, Vec<Strip>> {
        &self.channels
    }

    /// Render every channel without touching the filesystem.
    pub fn render(&self) -> Vec<(i32, Result<String>)> {
        self.channels
            .iter()
            .map(|(channel, strips)| (*channel, render_channel(&self.title, strips, &self.rate)))
            .collect()
    }

    /// Stage 5: write `{base}-V{channel}.edl` for every channel.
    ///
    /// A failed channel is recorded in the report; the others still write.
    pub fn write(self, base: &Path) -> ExportReport {
        let Self {
            title,
            rate,
            channels,
            mut report,
        } = self;

        let results: Vec<Result<ChannelOutput>> = channels
            .into_par_iter()
            .map(|(channel, strips)| {
                let path = channel_path(base, channel);
                let text = render_channel(&title, &strips, &rate)?;
                write_channel(&path, &text).map_err(|source| EdlError::OutputWrite {
                    channel,
                    path: path.clone(),
                    source,
                })?;
                info!("Wrote {} ({} events)", path.display(), strips.len());
                Ok(ChannelOutput {
                    channel,
                    path,
                    events: strips.len(),
                })
            })
            .collect();

        for result in results {
            match result {
                Ok(output) => report.written.push(output),
                Err(e) => {
                    warn!("{}", e);
                    report.failed_channels.push(e);
                }
            }
        }

        report
    }
}

/// Full pipeline in one call.
///
/// Errors only for whole-export failures (invalid frame rate); everything
/// else lands in the returned report.
pub fn export(
    timeline: &Timeline,
    base: &Path,
    options: &ExportOptions,
    probe: &dyn SequenceProbe,
) -> Result<ExportReport> {
    Ok(PreparedExport::prepare(timeline, options, probe)?.write(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{StripElement, StripRecord, StripType};
    use crate::utils::sequences::MemoryProbe;

    fn strip(name: &str, ty: StripType, channel: i32, frame_start: i64, directory: &str) -> StripRecord {
        StripRecord {
            name: Some(name.to_string()),
            strip_type: ty,
            channel,
            frame_start,
            frame_offset_start: 0,
            frame_final_duration: 10,
            directory: directory.to_string(),
            elements: vec![StripElement {
                filename: format!("{}_0001.png", name),
            }],
        }
    }

    fn timeline(strips: Vec<StripRecord>) -> Timeline {
        let mut timeline = Timeline::new("Test", 24, 1);
        timeline.strips = strips;
        timeline
    }

    fn options(policy: StripFailurePolicy) -> ExportOptions {
        ExportOptions {
            title: "Test".into(),
            channels: None,
            strip_failure: policy,
        }
    }

    #[test]
    fn test_invalid_frame_rate_is_fatal() {
        let mut tl = timeline(vec![strip("a", StripType::Video, 1, 0, "/s/A/")]);
        tl.fps = 0;
        let err = PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new())
            .unwrap_err();
        assert!(matches!(err, EdlError::InvalidFrameRate { .. }));
    }

    #[test]
    fn test_skip_strip_renumbers_survivors() {
        let tl = timeline(vec![
            strip("a", StripType::Video, 1, 0, "/s/A/"),
            strip("bad", StripType::Video, 1, 10, "nowhere"),
            strip("c", StripType::Video, 1, 20, "/s/C/"),
        ]);
        let prepared =
            PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new()).unwrap();

        let ch1: Vec<&str> = prepared.channels()[&1].iter().map(Strip::identity).collect();
        assert_eq!(ch1, vec!["a", "c"]);
        assert_eq!(prepared.report.strip_errors.len(), 1);
        assert!(prepared.report.failed_channels.is_empty());

        let rendered = prepared.render();
        let text = rendered[0].1.as_ref().unwrap();
        assert!(text.contains("\n001 A "));
        assert!(text.contains("\n002 C "));
        assert!(!text.contains("003"));
    }

    #[test]
    fn test_abort_channel_drops_whole_channel() {
        let tl = timeline(vec![
            strip("a", StripType::Video, 1, 0, "/s/A/"),
            strip("bad", StripType::Video, 1, 10, "nowhere"),
            strip("b", StripType::Video, 2, 0, "/s/B/"),
        ]);
        let prepared =
            PreparedExport::prepare(&tl, &options(StripFailurePolicy::AbortChannel), &MemoryProbe::new())
                .unwrap();

        assert!(!prepared.channels().contains_key(&1));
        assert!(prepared.channels().contains_key(&2));
        assert!(matches!(
            prepared.report.failed_channels[..],
            [EdlError::ChannelAborted { channel: 1, failures: 1 }]
        ));
        assert_eq!(prepared.report.strip_errors.len(), 1);
    }

    #[test]
    fn test_ineligible_and_selection() {
        let tl = timeline(vec![
            strip("a", StripType::Video, 1, 0, "/s/A/"),
            strip("snd", StripType::Unsupported, 3, 0, "/s/S/"),
            strip("b", StripType::Video, 2, 0, "/s/B/"),
        ]);
        let opts = ExportOptions {
            channels: Some([2].into_iter().collect()),
            ..options(StripFailurePolicy::SkipStrip)
        };
        let prepared = PreparedExport::prepare(&tl, &opts, &MemoryProbe::new()).unwrap();

        assert_eq!(prepared.channels().keys().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(prepared.report.ineligible, 2);
    }

    #[test]
    fn test_negative_edit_timecode_skips_strip() {
        // -86400 + 86399 = -1 -> negative record timecode
        let tl = timeline(vec![
            strip("early", StripType::Video, 1, -86_400, "/s/E/"),
            strip("ok", StripType::Video, 1, 0, "/s/O/"),
        ]);
        let prepared =
            PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new()).unwrap();

        assert_eq!(prepared.channels()[&1].len(), 1);
        assert!(matches!(
            prepared.report.strip_errors[..],
            [EdlError::NegativeTimecode { field: "edit_in", frame: -1, .. }]
        ));
    }

    #[test]
    fn test_degraded_probe_is_counted_not_failed() {
        let mut still = strip("shot", StripType::Image, 1, 0, "/renders/Shot/");
        still.elements[0].filename = "shot_0007.png".into();
        let tl = timeline(vec![still]);
        let prepared =
            PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new()).unwrap();

        assert_eq!(prepared.report.degraded_probes, 1);
        assert_eq!(prepared.channels()[&1][0].image_offset(), 0);
    }

    #[test]
    fn test_write_failure_is_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on channel 2's output path makes that write fail
        std::fs::create_dir(dir.path().join("cut-V2.edl")).unwrap();

        let tl = timeline(vec![
            strip("a", StripType::Video, 1, 0, "/s/A/"),
            strip("b", StripType::Video, 2, 0, "/s/B/"),
        ]);
        let report = export(
            &tl,
            &dir.path().join("cut.edl"),
            &options(StripFailurePolicy::SkipStrip),
            &MemoryProbe::new(),
        )
        .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].channel, 1);
        assert!(matches!(
            report.failed_channels[..],
            [EdlError::OutputWrite { channel: 2, .. }]
        ));
        assert!(dir.path().join("cut-V1.edl").is_file());
    }

    #[test]
    fn test_overflowing_timeline_skips_strip() {
        let json = r#"{"fps":24,"strips":[
            {"type":"VIDEO","channel":1,"frame_start":9223372036854775000,
             "frame_final_duration":10,"directory":"/a/B/"},
            {"type":"VIDEO","channel":1,"frame_start":0,
             "frame_final_duration":10,"directory":"/a/C/"}
        ]}"#;
        let tl: Timeline = serde_json::from_str(json).unwrap();
        let prepared =
            PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new()).unwrap();

        assert_eq!(prepared.channels()[&1].len(), 1);
        assert!(matches!(
            prepared.report().strip_errors[..],
            [EdlError::FrameOverflow { field: "edit_in", .. }]
        ));
    }

    #[test]
    fn test_overflowing_frame_rate_is_fatal() {
        let mut tl = timeline(vec![strip("a", StripType::Video, 1, 0, "/s/A/")]);
        tl.fps = i64::MAX;
        let err = PreparedExport::prepare(&tl, &options(StripFailurePolicy::SkipStrip), &MemoryProbe::new())
            .unwrap_err();
        assert!(matches!(err, EdlError::InvalidFrameRate { .. }));
    }
}
