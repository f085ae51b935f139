//! Report kinds and the dispatcher that turns one request into one output file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::BarcodeArtifactCache;
use crate::compositor::{CardCompositor, CardContent, CardHeader};
use crate::encoding::{BarcodeSpec, safe_filename};
use crate::error::{CardError, Result};
use crate::geometry::CardGeometry;
use crate::layout::{LayoutEngine, PageLayout};
use crate::renderer::{ArtifactFormat, BarcodeRenderer, RenderOptions};
use crate::surface::PdfSurface;

/// Format of the timestamp appended to output stems.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Every deliverable the tool can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    RawVector,
    RawRaster,
    SingleCardLetter,
    SingleCardCardsize,
    SixCardLetter,
    SixCardLetterMixed,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::RawVector,
        ReportKind::RawRaster,
        ReportKind::SingleCardLetter,
        ReportKind::SingleCardCardsize,
        ReportKind::SixCardLetter,
        ReportKind::SixCardLetterMixed,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ReportKind::RawVector => "raw-vector",
            ReportKind::RawRaster => "raw-raster",
            ReportKind::SingleCardLetter => "single-card-letter",
            ReportKind::SingleCardCardsize => "single-card-cardsize",
            ReportKind::SixCardLetter => "six-card-letter",
            ReportKind::SixCardLetterMixed => "six-card-letter-mixed",
        }
    }

    /// Older identifier still accepted on input.
    pub fn legacy_id(self) -> &'static str {
        match self {
            ReportKind::RawVector => "barcode_svg",
            ReportKind::RawRaster => "barcode_png",
            ReportKind::SingleCardLetter => "ymca_letter_1up",
            ReportKind::SingleCardCardsize => "ymca_cr80_1up",
            ReportKind::SixCardLetter => "ymca_letter_6up",
            ReportKind::SixCardLetterMixed => "ymca_letter_6up_mixed",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ReportKind::RawVector => "barcode only, SVG straight from the renderer",
            ReportKind::RawRaster => "barcode only, PNG straight from the renderer",
            ReportKind::SingleCardLetter => "one card in the top-left slot of a letter page",
            ReportKind::SingleCardCardsize => "one card on a page cut to CR80 size",
            ReportKind::SixCardLetter => "2x3 grid of identical cards on a letter page",
            ReportKind::SixCardLetterMixed => "2x3 grid, left column plain, right column checksum",
        }
    }

    /// Page arrangement for card reports; `None` for the raw kinds.
    pub fn page_layout(self) -> Option<PageLayout> {
        match self {
            ReportKind::RawVector | ReportKind::RawRaster => None,
            ReportKind::SingleCardLetter => Some(PageLayout::LetterSingle),
            ReportKind::SingleCardCardsize => Some(PageLayout::CardSized),
            ReportKind::SixCardLetter => Some(PageLayout::LetterGrid),
            ReportKind::SixCardLetterMixed => Some(PageLayout::LetterGridMixed),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportKind::RawVector => ArtifactFormat::Svg.extension(),
            ReportKind::RawRaster => ArtifactFormat::Png.extension(),
            _ => "pdf",
        }
    }

    pub fn is_card(self) -> bool {
        self.page_layout().is_some()
    }

    /// Whether the output stem carries the `plain`/`chk` tag.
    pub fn tags_variant(self) -> bool {
        self != ReportKind::SixCardLetterMixed
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ReportKind {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|k| k.id() == wanted || k.legacy_id() == wanted)
            .ok_or_else(|| CardError::UnknownReport(s.trim().to_string()))
    }
}

/// Files and directories one invocation depends on. Read-only once built.
/// The renderer is handed to [`ReportDispatcher::new`] separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolPaths {
    pub font: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl ToolPaths {
    /// Check everything `kind` needs before any rendering happens.
    ///
    /// Creates the output directory, and the cache directory for card kinds,
    /// and checks that each accepts new files.
    pub fn validate(&self, kind: ReportKind) -> Result<()> {
        if kind.is_card() && !self.font.is_file() {
            return Err(CardError::FontNotFound(self.font.clone()));
        }
        ensure_dir(&self.output_dir)?;
        if kind.is_card() {
            ensure_dir(&self.cache_dir)?;
        }
        Ok(())
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    let unusable = |source| CardError::DirectoryUnusable {
        path: path.to_path_buf(),
        source,
    };
    fs::create_dir_all(path).map_err(unusable)?;
    check_writable(path).map_err(unusable)
}

/// Create and remove an empty file in `dir`.
fn check_writable(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(format!(".cardmaker-write-check.{}", std::process::id()));
    fs::write(&marker, b"")?;
    fs::remove_file(&marker)
}

/// Raster-only renderer knobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterOptions {
    pub scale: Option<f32>,
    pub density: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: Some(5.0),
            density: None,
        }
    }
}

/// Everything a single report invocation needs besides the tool paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub raw: String,
    pub checksum: bool,
    pub plus: bool,
    /// Embed human-readable text in raw artifacts.
    pub include_text: bool,
    pub holes: bool,
    pub timestamp: bool,
    pub header: CardHeader,
    pub raster: RasterOptions,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            checksum: false,
            plus: false,
            include_text: false,
            holes: true,
            timestamp: false,
            header: CardHeader::default(),
            raster: RasterOptions::default(),
        }
    }

    /// Output file stem, without timestamp.
    pub fn output_stem(&self) -> String {
        let base = format!("{}__{}", safe_filename(&self.raw), self.kind.id());
        if self.kind.tags_variant() {
            let tag = if self.checksum { "chk" } else { "plain" };
            format!("{base}_{tag}")
        } else {
            base
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

/// What a successful dispatch produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOutcome {
    pub kind: ReportKind,
    pub path: PathBuf,
    /// Cards drawn on the page; zero for raw kinds.
    pub cards: usize,
    /// Cached vector artifacts the page was built from.
    pub artifacts: Vec<PathBuf>,
    pub raster: Option<RasterSize>,
}

/// Pick the output path for `stem`, never overwriting when timestamped.
pub fn choose_output_path(dir: &Path, stem: &str, ext: &str, timestamp: Option<&str>) -> PathBuf {
    let Some(stamp) = timestamp else {
        return dir.join(format!("{stem}.{ext}"));
    };
    let first = dir.join(format!("{stem}__{stamp}.{ext}"));
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("{stem}__{stamp}_{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

pub fn current_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Runs encoder, cache, layout and compositor for one request at a time.
pub struct ReportDispatcher<R> {
    paths: ToolPaths,
    geometry: CardGeometry,
    cache: BarcodeArtifactCache<R>,
}

impl<R: BarcodeRenderer> ReportDispatcher<R> {
    pub fn new(paths: ToolPaths, renderer: R) -> Self {
        let cache = BarcodeArtifactCache::new(paths.cache_dir.clone(), renderer);
        Self {
            paths,
            geometry: CardGeometry::cr80(),
            cache,
        }
    }

    pub fn with_geometry(mut self, geometry: CardGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn cache(&self) -> &BarcodeArtifactCache<R> {
        &self.cache
    }

    pub fn dispatch(&self, request: &ReportRequest) -> Result<ReportOutcome> {
        // Input is validated before the filesystem is touched.
        let requested = BarcodeSpec::new(&request.raw, request.checksum, request.plus)?;
        if request.kind.is_card() {
            request.header.check_encodable()?;
        }

        self.cache.renderer().ensure_available()?;
        self.paths.validate(request.kind)?;

        let stamp = request.timestamp.then(current_timestamp);
        let out = choose_output_path(
            &self.paths.output_dir,
            &request.output_stem(),
            request.kind.extension(),
            stamp.as_deref(),
        );

        let outcome = match request.kind.page_layout() {
            None => self.raw_report(request, &requested, out)?,
            Some(layout) => self.card_report(request, layout, out)?,
        };
        info!(
            kind = %outcome.kind,
            path = %outcome.path.display(),
            cards = outcome.cards,
            "report created"
        );
        Ok(outcome)
    }

    fn raw_report(&self, request: &ReportRequest, spec: &BarcodeSpec, out: PathBuf) -> Result<ReportOutcome> {
        let format = match request.kind {
            ReportKind::RawRaster => ArtifactFormat::Png,
            _ => ArtifactFormat::Svg,
        };
        let options = RenderOptions {
            format,
            include_text: request.include_text,
            scale: request.raster.scale,
            density: request.raster.density.clone(),
        };
        self.cache.renderer().render(&spec.encoded, &out, &options)?;

        let raster = if format == ArtifactFormat::Png {
            let (width, height) = image::image_dimensions(&out).map_err(|e| CardError::Artifact {
                path: out.clone(),
                message: e.to_string(),
            })?;
            debug!(width, height, "raster artifact dimensions");
            Some(RasterSize { width, height })
        } else {
            None
        };

        Ok(ReportOutcome {
            kind: request.kind,
            path: out,
            cards: 0,
            artifacts: Vec::new(),
            raster,
        })
    }

    fn card_report(&self, request: &ReportRequest, layout: PageLayout, out: PathBuf) -> Result<ReportOutcome> {
        let engine = LayoutEngine::new(&self.geometry);
        let plan = engine.plan(layout, request.checksum);
        debug!(variants = ?plan.variants(), cards = plan.placements.len(), "planned page");

        let compositor = CardCompositor::new(&self.geometry);
        let mut surface = PdfSurface::new(plan.page).with_title(request.header.title.clone());
        let font = compositor.register_font(&mut surface, &self.paths.font)?;

        // Every card is encoded and its bottom line measured before anything renders.
        let mut cards = Vec::with_capacity(plan.placements.len());
        for placement in &plan.placements {
            let spec = BarcodeSpec::new(&request.raw, placement.variant.is_checksum(), request.plus)?;
            surface.measure(&font, &spec.display, self.geometry.bottom_text_size)?;
            cards.push((placement.slot, spec));
        }

        let mut artifacts: Vec<(String, PathBuf)> = Vec::new();
        for (slot, spec) in &cards {
            let artifact = match artifacts.iter().find(|(encoded, _)| *encoded == spec.encoded) {
                Some((_, path)) => path.clone(),
                None => {
                    let path = self.cache.artifact_for(&spec.encoded)?;
                    artifacts.push((spec.encoded.clone(), path.clone()));
                    path
                }
            };
            let card = CardContent {
                artifact: &artifact,
                display: &spec.display,
                header: &request.header,
                holes: request.holes,
            };
            compositor.draw(&mut surface, slot.x, slot.y, &font, &card)?;
        }

        let path = surface.save(&out)?;
        Ok(ReportOutcome {
            kind: request.kind,
            path,
            cards: cards.len(),
            artifacts: artifacts.into_iter().map(|(_, p)| p).collect(),
            raster: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_parse_from_canonical_and_legacy_ids() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.id().parse::<ReportKind>().unwrap(), kind);
            assert_eq!(kind.legacy_id().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!(
            " Six-Card-Letter ".parse::<ReportKind>().unwrap(),
            ReportKind::SixCardLetter
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "ymca_letter_8up".parse::<ReportKind>().unwrap_err();
        assert!(matches!(err, CardError::UnknownReport(ref s) if s == "ymca_letter_8up"));
    }

    #[test]
    fn extensions_follow_kind() {
        assert_eq!(ReportKind::RawVector.extension(), "svg");
        assert_eq!(ReportKind::RawRaster.extension(), "png");
        assert_eq!(ReportKind::SingleCardCardsize.extension(), "pdf");
        assert!(!ReportKind::RawRaster.is_card());
        assert!(ReportKind::SixCardLetterMixed.is_card());
    }

    #[test]
    fn stems_carry_variant_tag_except_mixed() {
        let mut req = ReportRequest::new(ReportKind::SixCardLetter, "y 123");
        assert_eq!(req.output_stem(), "y_123__six-card-letter_plain");
        req.checksum = true;
        assert_eq!(req.output_stem(), "y_123__six-card-letter_chk");
        req.kind = ReportKind::SixCardLetterMixed;
        assert_eq!(req.output_stem(), "y_123__six-card-letter-mixed");
    }

    #[test]
    fn untimestamped_path_is_plain() {
        let dir = tempfile::tempdir().unwrap();
        let p = choose_output_path(dir.path(), "abc", "pdf", None);
        assert_eq!(p, dir.path().join("abc.pdf"));
    }

    #[test]
    fn timestamped_path_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let first = choose_output_path(dir.path(), "abc", "pdf", Some("20240102_030405"));
        assert_eq!(first, dir.path().join("abc__20240102_030405.pdf"));
        fs::write(&first, b"").unwrap();

        let second = choose_output_path(dir.path(), "abc", "pdf", Some("20240102_030405"));
        assert_eq!(second, dir.path().join("abc__20240102_030405_2.pdf"));
        fs::write(&second, b"").unwrap();

        let third = choose_output_path(dir.path(), "abc", "pdf", Some("20240102_030405"));
        assert_eq!(third, dir.path().join("abc__20240102_030405_3.pdf"));
    }

    #[test]
    fn timestamp_has_fixed_shape() {
        let ts = current_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn font_is_only_required_for_cards() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ToolPaths {
            font: dir.path().join("missing.ttf"),
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join("gen"),
        };
        assert!(paths.validate(ReportKind::RawVector).is_ok());
        assert!(dir.path().join("out").is_dir());
        assert!(!dir.path().join("gen").exists());
        assert!(matches!(
            paths.validate(ReportKind::SixCardLetter),
            Err(CardError::FontNotFound(_))
        ));
    }

    #[test]
    fn validation_leaves_directories_empty() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("f.ttf");
        fs::write(&font, b"").unwrap();
        let paths = ToolPaths {
            font,
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join("gen"),
        };
        paths.validate(ReportKind::SixCardLetter).unwrap();
        assert_eq!(fs::read_dir(&paths.output_dir).unwrap().count(), 0);
        assert_eq!(fs::read_dir(&paths.cache_dir).unwrap().count(), 0);
    }

    #[test]
    fn write_check_fails_where_files_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_writable(&dir.path().join("absent")).is_err());
        assert!(check_writable(dir.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn read_only_cache_dir_is_unusable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("f.ttf");
        fs::write(&font, b"").unwrap();
        let cache = dir.path().join("gen");
        fs::create_dir(&cache).unwrap();
        fs::set_permissions(&cache, fs::Permissions::from_mode(0o555)).unwrap();
        // Permission bits do not bind a privileged user.
        let bypassed = check_writable(&cache).is_ok();
        let paths = ToolPaths {
            font,
            output_dir: dir.path().join("out"),
            cache_dir: cache.clone(),
        };
        let result = paths.validate(ReportKind::SixCardLetter);
        fs::set_permissions(&cache, fs::Permissions::from_mode(0o755)).unwrap();
        if !bypassed {
            assert!(matches!(
                result,
                Err(CardError::DirectoryUnusable { ref path, .. }) if *path == cache
            ));
        }
    }

    #[test]
    fn file_in_place_of_output_dir_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"not a dir").unwrap();
        let paths = ToolPaths {
            font: dir.path().join("f.ttf"),
            output_dir: blocker,
            cache_dir: dir.path().join("gen"),
        };
        assert!(matches!(
            paths.validate(ReportKind::RawVector),
            Err(CardError::DirectoryUnusable { .. })
        ));
    }
}
