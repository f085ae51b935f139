//! Draws one fixed-geometry card onto a [`Surface`].

use std::path::Path;

use crate::error::Result;
use crate::geometry::CardGeometry;
use crate::surface::{FontHandle, StandardFont, Surface};

/// Name the fixed-pitch bottom-line font is registered under.
pub const FIXED_PITCH_FONT: &str = "OCRB";
pub const URL_FONT: StandardFont = StandardFont::Helvetica;
pub const TITLE_FONT: StandardFont = StandardFont::HelveticaBold;

/// The two header lines printed at the top of every card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHeader {
    pub url: String,
    pub title: String,
}

impl Default for CardHeader {
    fn default() -> Self {
        Self {
            url: "ymca.org".to_string(),
            title: "YMCA".to_string(),
        }
    }
}

impl CardHeader {
    /// Fail with [`CardError::Unencodable`](crate::CardError::Unencodable) if
    /// either line cannot be set in its font.
    pub fn check_encodable(&self) -> Result<()> {
        URL_FONT.text_width(&self.url, 1.0)?;
        TITLE_FONT.text_width(&self.title, 1.0)?;
        Ok(())
    }
}

/// Everything that varies from one card to the next.
#[derive(Debug, Clone, Copy)]
pub struct CardContent<'a> {
    pub artifact: &'a Path,
    pub display: &'a str,
    pub header: &'a CardHeader,
    pub holes: bool,
}

pub struct CardCompositor<'g> {
    geometry: &'g CardGeometry,
}

impl<'g> CardCompositor<'g> {
    pub fn new(geometry: &'g CardGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &CardGeometry {
        self.geometry
    }

    /// Register the fixed-pitch font with `surface`; repeat calls are no-ops.
    pub fn register_font<S: Surface + ?Sized>(&self, surface: &mut S, path: &Path) -> Result<FontHandle> {
        surface.register_font(FIXED_PITCH_FONT, path)
    }

    /// Draw a full card with its bottom-left corner at `(x, y)`.
    pub fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        x: f32,
        y: f32,
        font: &FontHandle,
        card: &CardContent<'_>,
    ) -> Result<()> {
        let g = self.geometry;
        let cx = x + g.card_width / 2.0;
        let top = y + g.card_height;

        surface.set_line_width(g.border_line_width);
        surface.rounded_rect(x, y, g.card_width, g.card_height, g.corner_radius);

        surface.centered_text(
            &FontHandle::Standard(URL_FONT),
            g.url_font_size,
            cx,
            top - g.url_baseline_from_top,
            &card.header.url,
        )?;
        surface.centered_text(
            &FontHandle::Standard(TITLE_FONT),
            g.title_font_size,
            cx,
            top - g.title_baseline_from_top,
            &card.header.title,
        )?;

        if card.holes {
            surface.set_line_width(g.hole_line_width);
            let r = g.hole_diameter / 2.0;
            for (hx, hy) in g.hole_centers() {
                surface.circle(x + hx, y + hy, r);
            }
        }

        let (bx, by) = g.barcode_origin();
        surface.place_graphic(card.artifact, x + bx, y + by, g.barcode_width, g.barcode_height)?;

        surface.centered_text(font, g.bottom_text_size, cx, y + g.bottom_text_baseline, card.display)
    }
}
