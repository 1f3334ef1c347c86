use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use smoke_blend_core::{run_blend, BlendConfig, BlendError, BlendJob};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Blend two smoke simulation caches into one
#[derive(Parser, Debug)]
#[command(name = "smoke-blend")]
#[command(about = "Linearly blend two sparse grid files", long_about = None)]
struct Args {
    /// Output grid file (".gz" suffix enables compression)
    output: PathBuf,

    /// First input; its metadata and backgrounds are kept
    input1: PathBuf,

    /// Second input
    input2: PathBuf,

    /// Blend coefficient: 0 keeps input1, 1 takes input2; values outside
    /// [0, 1] extrapolate
    #[arg(allow_negative_numbers = true)]
    coefficient: f32,

    /// JSON blend configuration (required metadata keys, tile handling)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Expand tiles into voxels before blending
    #[arg(long)]
    voxelize_tiles: bool,

    /// Log per-grid statistics
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when called more than once
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(args: &Args) -> Result<(), BlendError> {
    let mut config = match &args.config {
        Some(path) => BlendConfig::load(path)?,
        None => BlendConfig::default(),
    };
    config.voxelize_tiles |= args.voxelize_tiles;

    let job = BlendJob {
        output: args.output.clone(),
        input1: args.input1.clone(),
        input2: args.input2.clone(),
        coefficient: args.coefficient,
        config,
    };

    let report = run_blend(&job)?;
    for (name, reason) in &report.skipped {
        info!("Grid '{}' left out of output: {}", name, reason);
    }
    Ok(())
}

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

/// Parse `argv`, run the blend and map the outcome to a process status.
fn exit_status<I, T>(argv: I) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Help and version go to stdout and succeed; usage errors share
            // the failure status with every other error
            return if e.use_stderr() {
                EXIT_FAILURE
            } else {
                EXIT_SUCCESS
            };
        }
    };

    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("{e}");
            EXIT_FAILURE
        }
    }
}

fn main() -> ExitCode {
    ExitCode::from(exit_status(std::env::args_os()))
}
