//! On-disk cache of vector barcode artifacts keyed by encoded data.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::encoding::safe_filename;
use crate::error::{CardError, Result};
use crate::renderer::{BarcodeRenderer, RenderOptions};

/// Maps encoded data to `<dir>/<safe_filename(data)>.svg`.
///
/// Entries are never validated or expired. A miss renders into a
/// process-unique temporary file that is renamed onto the key only after the
/// renderer reports success, so a failed render never leaves an entry behind.
pub struct BarcodeArtifactCache<R> {
    dir: PathBuf,
    renderer: R,
}

impl<R: BarcodeRenderer> BarcodeArtifactCache<R> {
    pub fn new(dir: impl Into<PathBuf>, renderer: R) -> Self {
        Self {
            dir: dir.into(),
            renderer,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Where the artifact for `encoded` lives, whether or not it exists yet.
    pub fn path_for(&self, encoded: &str) -> PathBuf {
        self.dir.join(format!("{}.svg", safe_filename(encoded)))
    }

    pub fn contains(&self, encoded: &str) -> bool {
        self.path_for(encoded).is_file()
    }

    /// Return the artifact for `encoded`, rendering it on a miss.
    pub fn artifact_for(&self, encoded: &str) -> Result<PathBuf> {
        let path = self.path_for(encoded);
        if path.is_file() {
            debug!(data = encoded, path = %path.display(), "barcode cache hit");
            return Ok(path);
        }

        fs::create_dir_all(&self.dir).map_err(|source| CardError::DirectoryUnusable {
            path: self.dir.clone(),
            source,
        })?;

        let staging = self.staging_path(encoded);
        debug!(data = encoded, renderer = self.renderer.name(), "barcode cache miss");
        if let Err(err) = self
            .renderer
            .render(encoded, &staging, &RenderOptions::card_artifact())
        {
            discard(&staging);
            return Err(err);
        }

        if let Err(source) = fs::rename(&staging, &path) {
            discard(&staging);
            return Err(CardError::io(&path, source));
        }
        Ok(path)
    }

    fn staging_path(&self, encoded: &str) -> PathBuf {
        self.dir.join(format!(
            ".{}.{}.partial.svg",
            safe_filename(encoded),
            std::process::id()
        ))
    }
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_file(path) {
            debug!(path = %path.display(), %err, "could not remove partial artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ArtifactFormat;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    struct Counting {
        calls: Cell<usize>,
        seen: RefCell<Vec<RenderOptions>>,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl BarcodeRenderer for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn render(&self, data: &str, output: &Path, options: &RenderOptions) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.seen.borrow_mut().push(options.clone());
            fs::write(output, format!("<svg><!-- {data} --></svg>")).map_err(|e| CardError::io(output, e))
        }
    }

    struct Failing;

    impl BarcodeRenderer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn render(&self, data: &str, output: &Path, _options: &RenderOptions) -> Result<()> {
            fs::write(output, "<svg").unwrap();
            Err(CardError::RendererFailed {
                data: data.to_string(),
                status: "exit status: 2".to_string(),
                stderr: "Error 000: simulated".to_string(),
            })
        }
    }

    #[test]
    fn second_request_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarcodeArtifactCache::new(dir.path().join("gen"), Counting::new());

        let first = cache.artifact_for("+ABCX").unwrap();
        let second = cache.artifact_for("+ABCX").unwrap();

        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("gen").join("_ABCX.svg"));
        assert_eq!(cache.renderer().calls.get(), 1);
        assert!(first.is_file());

        let seen = cache.renderer().seen.borrow();
        assert_eq!(seen[0].format, ArtifactFormat::Svg);
        assert!(!seen[0].include_text);
    }

    #[test]
    fn variants_use_independent_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarcodeArtifactCache::new(dir.path(), Counting::new());
        let plain = cache.artifact_for("ABC").unwrap();
        let chk = cache.artifact_for("ABCX").unwrap();
        assert_ne!(plain, chk);
        assert_eq!(cache.renderer().calls.get(), 2);
    }

    #[test]
    fn existing_file_is_reused_without_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarcodeArtifactCache::new(dir.path(), Counting::new());
        fs::write(cache.path_for("ABC"), "anything").unwrap();
        cache.artifact_for("ABC").unwrap();
        assert_eq!(cache.renderer().calls.get(), 0);
    }

    #[test]
    fn failed_render_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BarcodeArtifactCache::new(dir.path(), Failing);

        let err = cache.artifact_for("ABC").unwrap_err();
        assert!(matches!(err, CardError::RendererFailed { .. }));
        assert!(!cache.contains("ABC"));

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");

        assert!(cache.artifact_for("ABC").is_err());
    }
}
