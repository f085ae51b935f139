//! Core library for composing Code 39 membership cards into printable documents.

mod cache;
mod compositor;
mod encoding;
mod error;
mod geometry;
mod layout;
mod renderer;
mod report;
mod surface;

pub use cache::BarcodeArtifactCache;
pub use compositor::{CardCompositor, CardContent, CardHeader, FIXED_PITCH_FONT};
pub use encoding::{BarcodeSpec, CODE39_ALPHABET, EncodeError, checksum_symbol, safe_filename, symbol_value};
pub use error::{CardError, Result};
pub use geometry::{CardGeometry, PT_PER_MM, PageSize, mm};
pub use layout::{BarcodeVariant, LayoutEngine, LayoutPlan, LayoutSlot, PageLayout, Placement};
pub use renderer::{ArtifactFormat, BarcodeRenderer, RenderOptions, ZintRenderer};
pub use report::{
    RasterOptions, RasterSize, ReportDispatcher, ReportKind, ReportOutcome, ReportRequest,
    TIMESTAMP_FORMAT, ToolPaths, choose_output_path, current_timestamp,
};
pub use surface::{EmbeddedFont, FilledShape, FontHandle, PdfSurface, Segment, StandardFont, Surface, VectorGraphic};

/// Produce one report with the given renderer, returning what was written.
pub fn generate_report<R: BarcodeRenderer>(
    paths: ToolPaths,
    renderer: R,
    request: &ReportRequest,
) -> Result<ReportOutcome> {
    ReportDispatcher::new(paths, renderer).dispatch(request)
}
