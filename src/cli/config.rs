//! Layered configuration: command line, config file, profile, built-in defaults.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::utils::{discover_font, discover_renderer, read_json, resolve_against};

pub const DEFAULT_HEADER_URL: &str = "ymca.org";
pub const DEFAULT_HEADER_TITLE: &str = "YMCA";
pub const DEFAULT_DATA: &str = "YXXXX0123456";
pub const DEFAULT_REPORT: &str = "six-card-letter";
pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_CACHE_DIR: &str = ".gen_barcodes";
pub const DEFAULT_PNG_SCALE: f32 = 5.0;
pub const DEFAULT_PROFILE: &str = "profiles/default.json";
pub const CONFIG_ENV: &str = "CARDMAKER_CONFIG";
pub const SYSTEM_CONFIG: &str = "/etc/cardmaker/config.json";

/// Tool locations as they appear in a config layer.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(alias = "zint_exe")]
    pub renderer: Option<PathBuf>,
    #[serde(alias = "ocrb_ttf")]
    pub font: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    #[serde(alias = "gen_dir")]
    pub cache_dir: Option<PathBuf>,
}

impl PathsConfig {
    fn anchored(self, base: &Path) -> Self {
        let fix = |p: Option<PathBuf>| p.filter(|p| !p.as_os_str().is_empty()).map(|p| resolve_against(base, &p));
        Self {
            renderer: fix(self.renderer),
            font: fix(self.font),
            out_dir: fix(self.out_dir),
            cache_dir: fix(self.cache_dir),
        }
    }

    /// Fill unset entries from `lower`.
    fn or(self, lower: PathsConfig) -> Self {
        Self {
            renderer: self.renderer.or(lower.renderer),
            font: self.font.or(lower.font),
            out_dir: self.out_dir.or(lower.out_dir),
            cache_dir: self.cache_dir.or(lower.cache_dir),
        }
    }
}

/// One configuration layer. Every field is optional; unset falls through.
///
/// Path keys may sit in a `paths` table or at the top level; the top level
/// wins within the same file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub report: Option<String>,
    pub data: Option<String>,
    pub default_data: Option<String>,
    pub header_url: Option<String>,
    pub header_title: Option<String>,
    pub checksum: Option<bool>,
    pub plus: Option<bool>,
    pub text: Option<bool>,
    pub no_holes: Option<bool>,
    pub timestamp: Option<bool>,
    pub png_scale: Option<f32>,
    pub png_scalexdimdp: Option<String>,
    pub paths: PathsConfig,
    #[serde(flatten)]
    pub inline_paths: PathsConfig,
}

impl ConfigLayer {
    /// Load a layer from disk, anchoring relative paths at the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut layer: ConfigLayer = read_json(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let inline = std::mem::take(&mut layer.inline_paths);
        let table = std::mem::take(&mut layer.paths);
        layer.paths = inline.anchored(base).or(table.anchored(base));
        Ok(layer)
    }
}

/// Fully merged settings for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub report: String,
    pub data: String,
    pub checksum: bool,
    pub plus: bool,
    pub text: bool,
    pub holes: bool,
    pub timestamp: bool,
    pub header_url: String,
    pub header_title: String,
    pub png_scale: f32,
    pub png_scalexdimdp: Option<String>,
    pub renderer: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub config_file: Option<PathBuf>,
    pub profile_file: Option<PathBuf>,
}

fn text(layers: &[ConfigLayer], field: impl Fn(&ConfigLayer) -> Option<&String>) -> Option<String> {
    layers
        .iter()
        .filter_map(|l| field(l))
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(layers: &[ConfigLayer], field: impl Fn(&ConfigLayer) -> Option<bool>) -> bool {
    layers.iter().find_map(|l| field(l)).unwrap_or(false)
}

fn path(layers: &[ConfigLayer], field: impl Fn(&PathsConfig) -> Option<&PathBuf>) -> Option<PathBuf> {
    layers.iter().find_map(|l| field(&l.paths)).cloned()
}

/// Existing configured file, else discovery, else the configured path so
/// the eventual error names it.
fn located(configured: Option<PathBuf>, discover: impl FnOnce() -> Option<PathBuf>) -> Option<PathBuf> {
    match configured {
        Some(p) if p.is_file() => Some(p),
        other => discover().or(other),
    }
}

impl Settings {
    /// Merge `layers`, highest precedence first, on top of the built-in defaults.
    ///
    /// `root` anchors discovery and the default directories.
    pub fn resolve(layers: &[ConfigLayer], root: &Path) -> Self {
        let default_data = text(layers, |l| l.default_data.as_ref()).unwrap_or_else(|| DEFAULT_DATA.to_string());
        let renderer = located(path(layers, |p| p.renderer.as_ref()), || discover_renderer(root));
        let font = located(path(layers, |p| p.font.as_ref()), || discover_font(root));

        Settings {
            report: text(layers, |l| l.report.as_ref()).unwrap_or_else(|| DEFAULT_REPORT.to_string()),
            data: text(layers, |l| l.data.as_ref()).unwrap_or(default_data),
            checksum: flag(layers, |l| l.checksum),
            plus: flag(layers, |l| l.plus),
            text: flag(layers, |l| l.text),
            holes: !flag(layers, |l| l.no_holes),
            timestamp: flag(layers, |l| l.timestamp),
            header_url: text(layers, |l| l.header_url.as_ref())
                .unwrap_or_else(|| DEFAULT_HEADER_URL.to_string()),
            header_title: text(layers, |l| l.header_title.as_ref())
                .unwrap_or_else(|| DEFAULT_HEADER_TITLE.to_string()),
            png_scale: layers
                .iter()
                .find_map(|l| l.png_scale)
                .unwrap_or(DEFAULT_PNG_SCALE),
            png_scalexdimdp: text(layers, |l| l.png_scalexdimdp.as_ref()),
            renderer,
            font,
            out_dir: path(layers, |p| p.out_dir.as_ref()).unwrap_or_else(|| root.join(DEFAULT_OUT_DIR)),
            cache_dir: path(layers, |p| p.cache_dir.as_ref()).unwrap_or_else(|| root.join(DEFAULT_CACHE_DIR)),
            config_file: None,
            profile_file: None,
        }
    }
}

/// Pick the config file: explicit flag, then environment, then the first
/// existing well-known location. Explicitly named files must exist.
pub fn locate_config(explicit: Option<&Path>, from_env: Option<PathBuf>, well_known: &[PathBuf]) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if !p.is_file() {
            bail!("config file {} does not exist", p.display());
        }
        return Ok(Some(p.to_path_buf()));
    }
    if let Some(p) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        if !p.is_file() {
            bail!("{CONFIG_ENV} points at {}, which does not exist", p.display());
        }
        return Ok(Some(p));
    }
    Ok(well_known.iter().find(|p| p.is_file()).cloned())
}

/// System and per-user config locations, in lookup order.
pub fn well_known_configs() -> Vec<PathBuf> {
    let mut out = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(home) = env::var_os("HOME").filter(|h| !h.is_empty()) {
        out.push(PathBuf::from(home).join(".config/cardmaker/config.json"));
    }
    out
}

/// Explicit profile must exist; the default one is optional.
pub fn locate_profile(explicit: Option<&Path>, root: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(p) if p.is_file() => Ok(Some(p.to_path_buf())),
        Some(p) => bail!("profile {} does not exist", p.display()),
        None => {
            let p = root.join(DEFAULT_PROFILE);
            Ok(p.is_file().then_some(p))
        }
    }
}
