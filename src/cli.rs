use clap::Parser;
use std::path::PathBuf;

use crate::config::ProbeMode;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Export timeline strips to per-channel EDL files
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Timeline description (JSON) to export
    #[arg(value_name = "TIMELINE")]
    pub timeline: PathBuf,

    /// Destination base path; each channel writes <BASE>-V<N>.edl (default: next to TIMELINE)
    #[arg(short = 'o', long = "output", value_name = "BASE")]
    pub output: Option<PathBuf>,

    /// Title written in the EDL header (overrides the timeline's title)
    #[arg(short = 't', long = "title", value_name = "TEXT")]
    pub title: Option<String>,

    /// Only export these channels (can be specified multiple times)
    #[arg(short = 'C', long = "channel", value_name = "N")]
    pub channels: Vec<i32>,

    /// Sequence probe for still images (overrides settings)
    #[arg(long = "probe", value_enum, value_name = "MODE")]
    pub probe: Option<ProbeMode>,

    /// Write no file for a channel if any of its strips fails (overrides settings)
    #[arg(long = "abort-channel")]
    pub abort_channel: bool,

    /// Print the EDLs to stdout instead of writing files
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Enable logging to file (default: strip-edl.log in the data directory)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Destination base: `--output`, else the timeline path with `.edl`.
    pub fn output_base(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.timeline.with_extension("edl"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "strip-edl", "cut.json", "-o", "/out/cut.edl", "-C", "1", "-C", "3",
            "--probe", "disk", "--abort-channel", "-vv",
        ])
        .unwrap();
        assert_eq!(args.channels, vec![1, 3]);
        assert_eq!(args.probe, Some(ProbeMode::Disk));
        assert!(args.abort_channel);
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.output_base(), PathBuf::from("/out/cut.edl"));
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_default_output_base() {
        let args = Args::try_parse_from(["strip-edl", "/proj/cut.json"]).unwrap();
        assert_eq!(args.output_base(), PathBuf::from("/proj/cut.edl"));
    }

    #[test]
    fn test_log_flag_without_value() {
        let args = Args::try_parse_from(["strip-edl", "cut.json", "-l"]).unwrap();
        assert_eq!(args.log_file, Some(None));
    }
}
