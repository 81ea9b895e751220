use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lfpscope::archive::{ArchiveClient, DandiHttpClient};
use lfpscope::config::ConfigLoader;
use lfpscope::domain::{parse_channel_list, DandisetId, ProbeIndex, VersionId, WindowSpec};
use lfpscope::error::{ErrorKind, ExplorerError};
use lfpscope::output::{JsonOutput, OutputMode, TextOutput};
use lfpscope::pipeline::{Pipeline, RunOptions, DEFAULT_ASSET_LIMIT};
use lfpscope::remote::HttpRemoteOpener;

#[derive(Parser)]
#[command(name = "lfpscope")]
#[command(about = "Explore DANDI electrophysiology datasets over byte-range HTTP")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the full exploration pipeline against one asset")]
    Explore(ExploreArgs),
    #[command(about = "List the first assets of a dandiset version")]
    Assets(AssetsArgs),
}

#[derive(Args, Clone)]
struct ExploreArgs {
    /// Six-digit dandiset id, e.g. 000563. Falls back to lfpscope.json.
    dandiset: Option<String>,

    /// Version, e.g. 0.250311.2145 or draft.
    version: Option<String>,

    #[arg(long)]
    config: Option<String>,

    /// Exact asset path; default is the first electrophysiology asset.
    #[arg(long)]
    asset_path: Option<String>,

    /// Probe index for the LFP sections (probe_{N}_lfp).
    #[arg(long)]
    probe: Option<u32>,

    /// First sample row of the window (inclusive).
    #[arg(long)]
    start: Option<u64>,

    /// Last sample row of the window (exclusive).
    #[arg(long)]
    end: Option<u64>,

    /// Comma-separated channel indices, e.g. 0,10,20,30.
    #[arg(long)]
    channels: Option<String>,

    /// Write the windowed traces as a PNG to this path.
    #[arg(long)]
    plot: Option<PathBuf>,

    #[arg(long)]
    asset_limit: Option<usize>,

    #[arg(long)]
    electrode_sample: Option<usize>,
}

#[derive(Args)]
struct AssetsArgs {
    dandiset: String,
    version: String,

    #[arg(long, default_value_t = DEFAULT_ASSET_LIMIT)]
    limit: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ExplorerError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ExplorerError) -> u8 {
    match error.kind() {
        ErrorKind::NotFound => 2,
        ErrorKind::Network => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Some(Commands::Explore(args)) => run_explore(args, output_mode),
        Some(Commands::Assets(args)) => run_assets(args, output_mode),
        None => Err(miette::Report::msg(
            "command required (try `lfpscope explore --help`)",
        )),
    }
}

fn run_explore(args: ExploreArgs, output_mode: OutputMode) -> miette::Result<()> {
    let options = build_options(args).into_diagnostic()?;

    let archive = DandiHttpClient::new().into_diagnostic()?;
    let pipeline = Pipeline::new(archive, HttpRemoteOpener);
    let report = pipeline.run(&options).into_diagnostic()?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_report(&report).into_diagnostic(),
        OutputMode::Interactive => TextOutput::print_report(&report).into_diagnostic(),
    }
}

/// CLI arguments win; the config file fills in a run only when no dandiset is
/// given on the command line.
fn build_options(args: ExploreArgs) -> Result<RunOptions, ExplorerError> {
    let mut options = match (&args.dandiset, &args.version) {
        (Some(dandiset), Some(version)) => {
            RunOptions::new(dandiset.parse::<DandisetId>()?, version.parse::<VersionId>()?)
        }
        (Some(_), None) => {
            return Err(ExplorerError::InvalidVersion(
                "a version is required alongside the dandiset id".to_string(),
            ));
        }
        (None, _) => ConfigLoader::resolve(args.config.as_deref())?,
    };

    if args.asset_path.is_some() {
        options.asset_path = args.asset_path;
    }
    if let Some(probe) = args.probe {
        options.probe = ProbeIndex(probe);
    }
    if let Some(limit) = args.asset_limit {
        options.asset_limit = limit;
    }
    if let Some(sample) = args.electrode_sample {
        options.electrode_sample = sample;
    }

    match (args.start, args.end, &args.channels) {
        (Some(start), Some(end), Some(channels)) => {
            options.window = Some(WindowSpec::new(start, end, parse_channel_list(channels)?)?);
        }
        (None, None, None) => {}
        _ => {
            return Err(ExplorerError::InvalidWindow(
                "--start, --end and --channels must be given together".to_string(),
            ));
        }
    }
    if args.plot.is_some() {
        options.plot = args.plot;
    }
    if options.plot.is_some() && options.window.is_none() {
        return Err(ExplorerError::InvalidWindow(
            "--plot requires a window (--start, --end, --channels)".to_string(),
        ));
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lfpscope::pipeline::DEFAULT_ELECTRODE_SAMPLE;

    use super::*;

    fn explore_args(config: Option<String>) -> ExploreArgs {
        ExploreArgs {
            dandiset: None,
            version: None,
            config,
            asset_path: None,
            probe: None,
            start: None,
            end: None,
            channels: None,
            plot: None,
            asset_limit: None,
            electrode_sample: None,
        }
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lfpscope.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    #[test]
    fn config_values_survive_without_cli_flags() {
        let (_dir, path) = write_config(
            r#"{
                "dandiset": "000563",
                "version": "0.250311.2145",
                "probe": 1,
                "asset_limit": 7,
                "electrode_sample": 3
            }"#,
        );

        let options = build_options(explore_args(Some(path))).unwrap();
        assert_eq!(options.probe, ProbeIndex(1));
        assert_eq!(options.asset_limit, 7);
        assert_eq!(options.electrode_sample, 3);
    }

    #[test]
    fn cli_flags_override_config_values() {
        let (_dir, path) = write_config(
            r#"{
                "dandiset": "000563",
                "version": "0.250311.2145",
                "probe": 1
            }"#,
        );

        let mut args = explore_args(Some(path));
        args.probe = Some(2);
        args.asset_limit = Some(10);

        let options = build_options(args).unwrap();
        assert_eq!(options.probe, ProbeIndex(2));
        assert_eq!(options.asset_limit, 10);
        assert_eq!(options.electrode_sample, DEFAULT_ELECTRODE_SAMPLE);
    }
}

fn run_assets(args: AssetsArgs, output_mode: OutputMode) -> miette::Result<()> {
    let dandiset: DandisetId = args.dandiset.parse().into_diagnostic()?;
    let version: VersionId = args.version.parse().into_diagnostic()?;

    let archive = DandiHttpClient::new().into_diagnostic()?;
    let assets = archive
        .assets(&dandiset, &version)
        .into_diagnostic()?
        .take(args.limit)
        .collect::<Result<Vec<_>, ExplorerError>>()
        .into_diagnostic()?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_assets(&assets).into_diagnostic(),
        OutputMode::Interactive => {
            for descriptor in &assets {
                println!("{} ({})", descriptor.path, descriptor.identifier);
            }
            Ok(())
        }
    }
}
