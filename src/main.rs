use clap::{Parser, Subcommand};
use retouch::batch::{BatchEvent, BatchReplayer, BatchReport, CancelToken};
use retouch::session::ImageSession;
use retouch::transform::{TransformName, TransformRegistry};
use retouch::{config, naming, output};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Photo enhancement with operation history and batch replay")]
#[command(long_about = "\
Photo enhancement with operation history and batch replay

Apply named enhancements to an image in order. The applied sequence is the
history: it can be replayed over every image in the same folder, writing
each result next to its input as processed_<name>.

Transforms:

  grayscale            RGB → luminance (skipped if already gray)
  equalize-histogram   global histogram equalisation (grayscale only)
  color-balance        adaptive equalisation of lightness (color only)
  adjust-exposure      gain + offset, saturated (any image)
  enhance-contrast     equalisation of lightness (color only)
  remove-shadows       flatten uneven illumination (color only)
  enhance-details      edge-preserving detail boost (color only)

A transform that does not fit the current image is skipped and reported;
it does not stop the rest of the sequence.

Run 'retouch gen-config' to generate a documented retouch.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML). Stock defaults are used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that run a transform sequence.
#[derive(clap::Args, Clone)]
struct SequenceArgs {
    /// Transform to apply; repeat for a sequence, applied in order
    #[arg(short = 't', long = "transform", required = true)]
    transforms: Vec<TransformName>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply transforms to one image and save the result
    Apply {
        /// Image to open
        input: PathBuf,

        /// Output path (default: processed_<name> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replay the applied history over every image in the input's folder
        #[arg(long)]
        replay_folder: bool,

        /// Write the folder replay report as JSON to this path
        #[arg(long, requires = "replay_folder")]
        report: Option<PathBuf>,

        #[command(flatten)]
        sequence: SequenceArgs,
    },
    /// Replay a transform sequence over every image in a folder
    Batch {
        /// Folder to process (non-recursive)
        folder: PathBuf,

        /// Write the batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        sequence: SequenceArgs,
    },
    /// Print a stock retouch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Apply {
            input,
            output: destination,
            replay_folder,
            report: report_path,
            sequence,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let registry = Arc::new(TransformRegistry::new(config.transform_params()));
            let mut session = ImageSession::new(Arc::clone(&registry));
            session.set_observer(output::print_state_change);

            session.open(&input)?;
            for &name in &sequence.transforms {
                session.apply_transform(name)?;
            }
            output::print_history(session.history());

            let output_path = match destination {
                Some(path) => path,
                None => naming::output_path(&input, &config.batch.output_prefix)
                    .ok_or_else(|| format!("cannot derive output name from {}", input.display()))?,
            };
            session.save(&output_path)?;
            println!("Saved {}", output_path.display());

            if replay_folder {
                init_thread_pool(&config.batch);
                let replayer = BatchReplayer::new(registry, config.batch_settings());
                let steps = session.history().len();
                let report = with_progress(steps, |tx| {
                    session.replay_over_folder(&replayer, &CancelToken::new(), Some(tx))
                })??;
                finish_batch(&report, report_path.as_deref())?;
            }
        }
        Command::Batch {
            folder,
            report: report_path,
            sequence,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.batch);
            let registry = Arc::new(TransformRegistry::new(config.transform_params()));
            let replayer = BatchReplayer::new(registry, config.batch_settings());
            let steps = sequence.transforms.len();
            let report = with_progress(steps, |tx| {
                replayer.run_with(&folder, &sequence.transforms, &CancelToken::new(), Some(tx))
            })?;
            finish_batch(&report, report_path.as_deref())?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on batch config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(batch: &config::BatchConfig) {
    let threads = config::effective_threads(batch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Run `batch` while a printer thread renders its progress events.
fn with_progress<T>(
    steps: usize,
    batch: impl FnOnce(Sender<BatchEvent>) -> T,
) -> Result<T, Box<dyn std::error::Error>> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_batch_event(&event, steps);
        }
    });
    let result = batch(tx);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    Ok(result)
}

/// Print the summary, write the JSON report if asked, and fail if any file failed.
fn finish_batch(
    report: &BatchReport,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    output::print_batch_summary(report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json)?;
        println!("Report: {}", path.display());
    }

    if let Some(error) = &report.folder_error {
        return Err(format!("cannot read {}: {error}", report.folder.display()).into());
    }
    if report.is_clean() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} images were not processed",
            report.total - report.succeeded,
            report.total
        )
        .into())
    }
}
