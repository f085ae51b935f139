//! Command-line interface wiring for the `cardmaker` binary.
//!
//! This module owns the clap definitions, folds flags into the config
//! layers, and hands the merged request to the library dispatcher.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cardmaker::{
    CardError, CardHeader, RasterOptions, ReportKind, ReportRequest, ToolPaths, ZintRenderer,
    generate_report,
};
use clap::{ArgAction, Parser};
use tracing::debug;

pub mod common;
pub mod config;
pub mod utils;

use common::ReportArg;
use config::{ConfigLayer, PathsConfig, Settings};

/// Parsed CLI entrypoint for the `cardmaker` binary.
#[derive(Parser, Debug)]
#[command(name = "cardmaker", version, about = "Compose Code 39 membership cards into printable documents")]
pub struct Cli {
    /// Raw card code, e.g. YXXXX0123456.
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Report to produce (see --list-reports).
    #[arg(short = 'r', long, value_enum)]
    pub report: Option<ReportArg>,

    /// Append the Mod-43 check symbol. Ignored by the mixed report.
    #[arg(long)]
    pub checksum: bool,

    /// Prefix the encoded data with '+' before checksum and rendering.
    #[arg(long)]
    pub plus: bool,

    /// Embed human-readable text in barcode-only outputs.
    #[arg(long)]
    pub text: bool,

    /// Append a timestamp to the output filename.
    #[arg(long)]
    pub timestamp: bool,

    /// Leave out the punch-hole markers.
    #[arg(long)]
    pub no_holes: bool,

    #[arg(long)]
    pub header_url: Option<String>,

    #[arg(long)]
    pub header_title: Option<String>,

    /// Data used when --data is not given.
    #[arg(long)]
    pub default_data: Option<String>,

    /// Barcode renderer executable.
    #[arg(long, visible_alias = "zint-exe")]
    pub renderer: Option<PathBuf>,

    /// Fixed-pitch font for the bottom line.
    #[arg(long, visible_alias = "ocrb-ttf")]
    pub font: Option<PathBuf>,

    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Directory for cached barcode artifacts.
    #[arg(long, visible_alias = "gen-dir")]
    pub cache_dir: Option<PathBuf>,

    /// Renderer scale factor for PNG output.
    #[arg(long)]
    pub png_scale: Option<f32>,

    /// Renderer X-dimension/density hint for PNG output.
    #[arg(long)]
    pub png_scalexdimdp: Option<String>,

    /// Config file (else $CARDMAKER_CONFIG, /etc/cardmaker, ~/.config/cardmaker).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Profile file (default profiles/default.json).
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Print the merged configuration as JSON and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// List report kinds and exit.
    #[arg(long)]
    pub list_reports: bool,

    /// More log output; repeat for trace.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The command line as the highest-precedence config layer.
    pub fn layer(&self) -> ConfigLayer {
        let set = |on: bool| on.then_some(true);
        ConfigLayer {
            report: self.report.map(|r| ReportKind::from(r).id().to_string()),
            data: self.data.clone(),
            default_data: self.default_data.clone(),
            header_url: self.header_url.clone(),
            header_title: self.header_title.clone(),
            checksum: set(self.checksum),
            plus: set(self.plus),
            text: set(self.text),
            no_holes: set(self.no_holes),
            timestamp: set(self.timestamp),
            png_scale: self.png_scale,
            png_scalexdimdp: self.png_scalexdimdp.clone(),
            paths: PathsConfig {
                renderer: self.renderer.clone(),
                font: self.font.clone(),
                out_dir: self.out_dir.clone(),
                cache_dir: self.cache_dir.clone(),
            },
            inline_paths: PathsConfig::default(),
        }
    }
}

/// Merge every layer for `cli`, with discovery rooted at `root`.
pub fn load_settings(cli: &Cli, root: &Path) -> Result<Settings> {
    let config_file = config::locate_config(
        cli.config.as_deref(),
        env::var_os(config::CONFIG_ENV).map(PathBuf::from),
        &config::well_known_configs(),
    )?;
    let profile_file = config::locate_profile(cli.profile.as_deref(), root)?;

    let mut layers = vec![cli.layer()];
    for file in config_file.iter().chain(profile_file.iter()) {
        debug!(path = %file.display(), "loading config layer");
        layers.push(ConfigLayer::load(file)?);
    }

    let mut settings = Settings::resolve(&layers, root);
    settings.config_file = config_file;
    settings.profile_file = profile_file;
    Ok(settings)
}

/// Execute the invocation described by `cli`.
pub fn run(cli: Cli) -> Result<()> {
    if cli.list_reports {
        for kind in ReportKind::ALL {
            println!("{:<22} {:<22} {}", kind.id(), kind.legacy_id(), kind.description());
        }
        return Ok(());
    }

    let root = env::current_dir().context("failed to read working directory")?;
    let settings = load_settings(&cli, &root)?;

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let kind: ReportKind = settings.report.parse()?;
    let request = request_from(&settings, kind);
    let renderer = ZintRenderer::new(renderer_path(&settings, &root)?);
    let paths = tool_paths(&settings, &root);

    let outcome = generate_report(paths, renderer, &request)
        .with_context(|| format!("{} report for '{}' failed", kind, request.raw))?;
    println!("Created: {}", outcome.path.display());
    if let Some(size) = outcome.raster {
        debug!(width = size.width, height = size.height, "raster size");
    }
    Ok(())
}

fn request_from(settings: &Settings, kind: ReportKind) -> ReportRequest {
    ReportRequest {
        kind,
        raw: settings.data.clone(),
        checksum: settings.checksum,
        plus: settings.plus,
        include_text: settings.text,
        holes: settings.holes,
        timestamp: settings.timestamp,
        header: CardHeader {
            url: settings.header_url.clone(),
            title: settings.header_title.clone(),
        },
        raster: RasterOptions {
            scale: Some(settings.png_scale),
            density: settings.png_scalexdimdp.clone(),
        },
    }
}

fn renderer_path(settings: &Settings, root: &Path) -> Result<PathBuf, CardError> {
    settings
        .renderer
        .clone()
        .ok_or_else(|| CardError::RendererNotFound(root.join("zint")))
}

fn tool_paths(settings: &Settings, root: &Path) -> ToolPaths {
    let font = settings
        .font
        .clone()
        .unwrap_or_else(|| root.join("assets/fonts/OCR-B.ttf"));
    ToolPaths {
        font,
        output_dir: settings.out_dir.clone(),
        cache_dir: settings.cache_dir.clone(),
    }
}
