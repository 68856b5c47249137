//! moonviz - interactive moon viewer and map preparation tools.

use clap::{Parser, Subcommand};
use moonviz::app::{self, AppError};
use moonviz::assets::TextureSet;
use moonviz::config::{ConfigError, ViewerConfig};
use moonviz::controls::ControlError;
use moonviz::render::ExportError;
use moonviz::tools::{self, MapToolError};
use moonviz::viewer::{ExportTarget, Viewer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "moonviz")]
#[command(about = "Moon viewer with state-encoded screenshots")]
struct Cli {
    /// JSON viewer configuration. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive viewer (default).
    View,
    /// Render one frame headless and save it under its camera-state name.
    Export {
        /// Output directory. Defaults to the configured screenshot directory.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Control assignment applied before rendering, e.g. `camera.longitude=45`.
        #[arg(long = "set", value_name = "NAME=VALUE")]
        assignments: Vec<String>,
    },
    /// Bake a tangent-space normal map from a displacement raster.
    NormalMap {
        input: PathBuf,
        output: PathBuf,
        /// Multiplier applied to heights before taking gradients.
        #[arg(long, default_value_t = 1.0)]
        height_scale: f32,
    },
    /// Min-max normalize a displacement raster to 16-bit [0, 1].
    ScaleDisplacement { input: PathBuf, output: PathBuf },
    /// Re-encode any supported raster as PNG (`.png` is appended to OUTPUT).
    Convert { input: PathBuf, output: PathBuf },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    MapTool(#[from] MapToolError),
    #[error(transparent)]
    App(#[from] AppError),
}

fn load_viewer_inputs(cli: &Cli) -> Result<(ViewerConfig, Arc<TextureSet>), CliError> {
    let config = ViewerConfig::load_or_default(cli.config.as_deref())?;
    let textures = Arc::new(TextureSet::load_or_neutral(&config.textures));
    Ok((config, textures))
}

fn export(cli: &Cli, out: Option<PathBuf>, assignments: &[String]) -> Result<(), CliError> {
    let (config, textures) = load_viewer_inputs(cli)?;
    let dir = out.unwrap_or_else(|| config.screenshot_dir.clone());
    let mut viewer = Viewer::new(config, textures);
    for assignment in assignments {
        viewer.apply_assignment(assignment)?;
    }
    let path = viewer.export_screenshot(&ExportTarget::Directory(dir))?;
    println!("{}", path.display());
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        None | Some(Command::View) => {
            let (config, textures) = load_viewer_inputs(&cli)?;
            app::run(config, textures)?;
        }
        Some(Command::Export { out, assignments }) => export(&cli, out.clone(), assignments)?,
        Some(Command::NormalMap {
            input,
            output,
            height_scale,
        }) => tools::displacement_to_normal_map(input, output, *height_scale)?,
        Some(Command::ScaleDisplacement { input, output }) => {
            tools::scale_displacement(input, output)?
        }
        Some(Command::Convert { input, output }) => {
            tools::convert_to_png(input, output)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
