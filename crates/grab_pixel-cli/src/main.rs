//! grabpixel - Click on any pixel on your screen to display its color
//!
//! Grabs the pointer, waits for a click, captures the screen with an external
//! screenshot tool and prints the color under the click.

mod capture;
mod grab;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use grab_pixel::{probe, sample_with_options, Point, Rgba, SampleError, SampleOptions};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use capture::{CaptureError, CaptureTool, TempScreenshot};
use grab::GrabError;

#[derive(Parser, Debug)]
#[command(name = "grabpixel")]
#[command(version)]
#[command(about = "Click on any pixel on your screen to display its color", long_about = None)]
struct Cli {
    /// Screenshot tool used to capture the screen
    #[arg(short, long, value_enum, default_value_t = CaptureTool::Scrot)]
    tool: CaptureTool,

    /// Keep the captured screenshot instead of deleting it
    #[arg(short, long)]
    keep: bool,

    /// Also print the alpha channel
    #[arg(short, long)]
    alpha: bool,

    /// Decoder memory limit in MiB
    #[arg(long, value_name = "MIB", default_value = "512")]
    memory_limit: usize,

    /// Sample an existing PNG instead of capturing the screen
    #[arg(short, long, requires = "at")]
    image: Option<PathBuf>,

    /// Pixel to sample in --image
    #[arg(long, value_name = "X,Y", requires = "image")]
    at: Option<Point>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Grab(#[from] GrabError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(?err, "giving up");
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let options = SampleOptions {
        memory_limit: cli.memory_limit.saturating_mul(1024 * 1024),
    };

    let (point, color) = match (&cli.image, cli.at) {
        (Some(path), Some(point)) => (point, sample_file(path, point, &options)?),
        _ => {
            let point = grab::wait_for_click()?;
            tracing::info!("clicked at {point}");

            let shot = TempScreenshot::new(cli.keep)?;
            capture::capture(cli.tool, &shot)?;
            (point, sample_file(shot.path(), point, &options)?)
        }
    };

    Ok(format_color(point, color, cli.alpha))
}

fn sample_file(path: &Path, point: Point, options: &SampleOptions) -> Result<Rgba, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if let Ok(encoding) = probe(&bytes) {
        tracing::info!(
            interlaced = encoding.interlaced,
            trns = encoding.has_transparency,
            "decoding '{}' ({}x{}, {:?}, {} bit, {} bytes)",
            path.display(),
            encoding.width,
            encoding.height,
            encoding.model,
            encoding.bit_depth,
            bytes.len()
        );
    }

    Ok(sample_with_options(&bytes, point, options)?)
}

/// `(x, y) = RGB(r, g, b) = #RRGGBB`, or the RGBA form when `alpha` is set.
fn format_color(point: Point, color: Rgba, alpha: bool) -> String {
    if alpha {
        format!(
            "{} = RGBA({}, {}, {}, {}) = {}",
            point,
            color.r,
            color.g,
            color.b,
            color.a,
            color.to_hex_alpha()
        )
    } else {
        format!("{} = {} = {}", point, color, color.to_hex())
    }
}
