//! Drawing surfaces the card compositor paints onto.

mod fonts;
mod graphic;
mod pdf;

use std::path::Path;

use crate::error::Result;

pub use fonts::{EmbeddedFont, FontHandle, StandardFont};
pub use graphic::{FilledShape, Segment, VectorGraphic};
pub use pdf::PdfSurface;

/// Primitive drawing operations on one open page. Coordinates are PDF
/// points with the origin at the bottom-left of the page.
pub trait Surface {
    /// Register a font file under `name`. Registering a name twice is a
    /// no-op returning the same handle.
    fn register_font(&mut self, name: &str, path: &Path) -> Result<FontHandle>;

    fn set_line_width(&mut self, width: f32);

    /// Stroke a rectangle with corner radius `radius`; `(x, y)` is bottom-left.
    fn rounded_rect(&mut self, x: f32, y: f32, width: f32, height: f32, radius: f32);

    /// Stroke a circle.
    fn circle(&mut self, cx: f32, cy: f32, radius: f32);

    /// Draw `text` horizontally centred on `cx` with its baseline at `baseline`.
    fn centered_text(
        &mut self,
        font: &FontHandle,
        size: f32,
        cx: f32,
        baseline: f32,
        text: &str,
    ) -> Result<()>;

    /// Place the vector artifact at `artifact` so that it exactly fills the
    /// box, scaling each axis independently.
    fn place_graphic(
        &mut self,
        artifact: &Path,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<()>;
}
