use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "render-replay", version)]
struct Cli {
    /// Log verbosity (written to stderr).
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a replay script and write the recorded keyframes.
    Record(RecordArgs),
    /// Summarize a keyframes document.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RecordArgs {
    /// Input replay script JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output keyframes JSON for whatever is still saved when the script ends.
    #[arg(long)]
    out: PathBuf,

    /// Write compact JSON instead of indented.
    #[arg(long)]
    compact: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Keyframes JSON written by `record`.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Record(args) => cmd_record(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn cmd_record(args: RecordArgs) -> anyhow::Result<()> {
    let script = render_replay::ReplayScript::from_path(&args.in_path)
        .with_context(|| format!("load script '{}'", args.in_path.display()))?;

    let mut config = script.config.clone().unwrap_or_default();
    config.enable_save = true;
    if args.compact {
        config.pretty_files = false;
    }

    let base_dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let mut runner = render_replay::ScriptRunner::new(config, base_dir);
    let summary = runner
        .run(&script)
        .with_context(|| format!("run script '{}'", args.in_path.display()))?;

    let stats = runner
        .manager_mut()
        .write_saved_keyframes_to_file(&args.out)
        .with_context(|| format!("write keyframes '{}'", args.out.display()))?;

    eprintln!(
        "ran {} steps: {} instances, {} keyframes saved, {} flushed to files",
        summary.steps,
        summary.instances_created,
        summary.keyframes_saved,
        summary.files.len()
    );
    eprintln!(
        "wrote {} ({} keyframes, {} bytes)",
        args.out.display(),
        stats.keyframes_written,
        stats.bytes_written
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read keyframes '{}'", args.in_path.display()))?;
    let doc = render_replay::KeyframesDocument::from_json_slice(&bytes)
        .with_context(|| format!("parse keyframes '{}'", args.in_path.display()))?;

    println!("{} keyframes", doc.keyframes.len());
    for (i, kf) in doc.keyframes.iter().enumerate() {
        print!(
            "  [{i}] loads={} creations={} deletions={} state_updates={} user_transforms={}",
            kf.loads.len(),
            kf.creations.len(),
            kf.deletions.len(),
            kf.state_updates.len(),
            kf.user_transforms.len()
        );
        #[cfg(feature = "observations")]
        if let Some(obs) = &kf.observation {
            print!(" observation={:?}", obs.sensor_type);
        }
        println!();
    }
    Ok(())
}
