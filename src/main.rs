use strip_edl::cli::Args;
use strip_edl::config::{self, ExportSettings, StripFailurePolicy};
use strip_edl::entities::Timeline;
use strip_edl::export::{ExportOptions, ExportReport, PreparedExport};
use strip_edl::paths;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

fn main() -> Result<()> {
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = paths::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    init_logging(&args, &path_config)?;

    let settings_path = paths::config_file(config::SETTINGS_FILE, &path_config);
    let settings = ExportSettings::load(&settings_path);
    info!("Settings: {} ({:?})", settings_path.display(), settings);

    let timeline = Timeline::from_json(&args.timeline)?;

    let options = ExportOptions {
        title: args
            .title
            .clone()
            .unwrap_or_else(|| settings.title_for(&timeline.title).to_string()),
        channels: (!args.channels.is_empty()).then(|| args.channels.iter().copied().collect()),
        strip_failure: if args.abort_channel {
            StripFailurePolicy::AbortChannel
        } else {
            settings.strip_failure
        },
    };

    let probe = args.probe.unwrap_or(settings.probe).build();
    let prepared = PreparedExport::prepare(&timeline, &options, &*probe)
        .with_context(|| format!("Cannot export {}", args.timeline.display()))?;

    if args.dry_run {
        for (channel, text) in prepared.render() {
            match text {
                Ok(text) => print!("# V{}\n{}", channel, text),
                Err(e) => warn!("Channel {}: {}", channel, e),
            }
        }
        print_report(prepared.report());
        return Ok(());
    }

    let report = prepared.write(&args.output_base());
    print_report(&report);

    if !report.is_success() {
        bail!("{} channel(s) failed to export", report.failed_channels.len());
    }
    Ok(())
}

fn init_logging(args: &Args, path_config: &paths::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| paths::data_file(config::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .init();
    }

    Ok(())
}

fn print_report(report: &ExportReport) {
    for output in &report.written {
        println!("{} ({} events)", output.path.display(), output.events);
    }
    for e in &report.strip_errors {
        eprintln!("skipped: {}", e);
    }
    for e in &report.failed_channels {
        eprintln!("failed: {}", e);
    }
    if report.degraded_probes > 0 {
        eprintln!(
            "{} still image(s) exported without sequence offset correction",
            report.degraded_probes
        );
    }
}
