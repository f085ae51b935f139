//! External barcode renderer boundary.
//!
//! The rest of the crate only sees [`BarcodeRenderer`]; [`ZintRenderer`] is
//! the adapter that shells out to the `zint` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{CardError, Result};

/// Zint symbology id for Code 39.
const ZINT_CODE39: &str = "8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Svg,
    Png,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "svg",
            ArtifactFormat::Png => "png",
        }
    }

    fn zint_filetype(self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "SVG",
            ArtifactFormat::Png => "PNG",
        }
    }
}

/// Per-call rendering knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub format: ArtifactFormat,
    /// Embed the human-readable line in the artifact itself.
    pub include_text: bool,
    /// Linear scale factor (raster only).
    pub scale: Option<f32>,
    /// Physical density hint, e.g. `0.33,600` (raster only).
    pub density: Option<String>,
}

impl RenderOptions {
    /// Interchange vector form used for card composition: SVG without text.
    pub fn card_artifact() -> Self {
        Self {
            format: ArtifactFormat::Svg,
            include_text: false,
            scale: None,
            density: None,
        }
    }
}

/// Turns one exact data string into an artifact file.
///
/// `Ok(())` means `output` now holds a valid artifact. Any error means it
/// does not, whatever may be on disk.
pub trait BarcodeRenderer {
    fn name(&self) -> &str;

    /// Fail early if the renderer cannot possibly run.
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    fn render(&self, data: &str, output: &Path, options: &RenderOptions) -> Result<()>;
}

impl<R: BarcodeRenderer + ?Sized> BarcodeRenderer for &R {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ensure_available(&self) -> Result<()> {
        (**self).ensure_available()
    }

    fn render(&self, data: &str, output: &Path, options: &RenderOptions) -> Result<()> {
        (**self).render(data, output, options)
    }
}

/// Runs the Zint command-line encoder.
#[derive(Debug, Clone)]
pub struct ZintRenderer {
    executable: PathBuf,
}

impl ZintRenderer {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Argument vector for one invocation.
    pub fn arguments(&self, data: &str, output: &Path, options: &RenderOptions) -> Vec<String> {
        let mut args = vec![
            "-b".to_string(),
            ZINT_CODE39.to_string(),
            "-d".to_string(),
            data.to_string(),
            "--output".to_string(),
            output.display().to_string(),
            "--filetype".to_string(),
            options.format.zint_filetype().to_string(),
        ];
        if !options.include_text {
            args.push("--notext".to_string());
        }
        if options.format == ArtifactFormat::Png {
            if let Some(scale) = options.scale.filter(|s| *s > 0.0) {
                args.push("--scale".to_string());
                args.push(scale.to_string());
            }
            if let Some(density) = options.density.as_deref().filter(|d| !d.is_empty()) {
                args.push("--scalexdimdp".to_string());
                args.push(density.to_string());
            }
        }
        args
    }
}

impl BarcodeRenderer for ZintRenderer {
    fn name(&self) -> &str {
        "zint"
    }

    fn ensure_available(&self) -> Result<()> {
        if self.executable.is_file() {
            Ok(())
        } else {
            Err(CardError::RendererNotFound(self.executable.clone()))
        }
    }

    fn render(&self, data: &str, output: &Path, options: &RenderOptions) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CardError::DirectoryUnusable {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let args = self.arguments(data, output, options);
        debug!(program = %self.executable.display(), ?args, "running barcode renderer");

        let result = Command::new(&self.executable)
            .args(&args)
            .output()
            .map_err(|source| CardError::RendererLaunch {
                program: self.executable.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(CardError::RendererFailed {
                data: data.to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
