//! Locked print geometry for the card template, in PDF points.

/// Points per millimetre (72 pt per 25.4 mm).
pub const PT_PER_MM: f32 = 72.0 / 25.4;

pub fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

/// Physical page size in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, 8.5 x 11 in.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
}

/// Every fixed measurement of the card and of the multi-up grid.
///
/// Offsets are relative to the card's bottom-left corner, except where the
/// field name says `from_top`, which is measured down from the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct CardGeometry {
    pub card_width: f32,
    pub card_height: f32,
    pub corner_radius: f32,
    pub border_line_width: f32,

    pub url_baseline_from_top: f32,
    pub title_baseline_from_top: f32,
    pub url_font_size: f32,
    pub title_font_size: f32,

    pub barcode_bottom: f32,
    pub barcode_width: f32,
    pub barcode_height: f32,

    pub bottom_text_baseline: f32,
    pub bottom_text_size: f32,

    pub hole_diameter: f32,
    pub hole_y_from_top: f32,
    pub hole_x_from_left: [f32; 2],
    pub hole_line_width: f32,

    pub columns: usize,
    pub rows: usize,
    pub margin_left: f32,
    pub margin_top: f32,
    pub gap_x: f32,
    pub gap_y: f32,
}

impl CardGeometry {
    /// ISO/IEC 7810 ID-1 (CR80) card with the YMCA header/barcode placement.
    pub fn cr80() -> Self {
        Self {
            card_width: mm(85.60),
            card_height: mm(53.98),
            corner_radius: mm(3.0),
            border_line_width: 0.5,

            url_baseline_from_top: mm(11.5),
            title_baseline_from_top: mm(18.5),
            url_font_size: 12.0,
            title_font_size: 12.0,

            barcode_bottom: mm(5.5),
            barcode_width: mm(59.2),
            barcode_height: mm(13.0),

            bottom_text_baseline: mm(3.0),
            bottom_text_size: 6.0,

            hole_diameter: mm(6.0),
            hole_y_from_top: mm(24.0),
            hole_x_from_left: [mm(17.0), mm(30.0)],
            hole_line_width: 0.8,

            columns: 2,
            rows: 3,
            margin_left: mm(12.0),
            margin_top: mm(12.0),
            gap_x: mm(12.0),
            gap_y: mm(18.0),
        }
    }

    /// Page exactly the size of one card.
    pub fn card_page(&self) -> PageSize {
        PageSize {
            width: self.card_width,
            height: self.card_height,
        }
    }

    /// Horizontal distance between neighbouring slot origins.
    pub fn column_stride(&self) -> f32 {
        self.card_width + self.gap_x
    }

    /// Vertical distance between neighbouring slot origins.
    pub fn row_stride(&self) -> f32 {
        self.card_height + self.gap_y
    }

    /// Bottom-left corner of the barcode box relative to the card origin.
    pub fn barcode_origin(&self) -> (f32, f32) {
        ((self.card_width - self.barcode_width) / 2.0, self.barcode_bottom)
    }

    /// Hole centres relative to the card origin.
    pub fn hole_centers(&self) -> [(f32, f32); 2] {
        let cy = self.card_height - self.hole_y_from_top;
        [
            (self.hole_x_from_left[0], cy),
            (self.hole_x_from_left[1], cy),
        ]
    }
}

impl Default for CardGeometry {
    fn default() -> Self {
        Self::cr80()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn cr80_in_points() {
        let g = CardGeometry::cr80();
        assert!(close(g.card_width, 242.646));
        assert!(close(g.card_height, 153.014));
        assert!(close(mm(25.4), 72.0));
    }

    #[test]
    fn barcode_box_is_centred() {
        let g = CardGeometry::cr80();
        let (bx, by) = g.barcode_origin();
        assert!(close(bx * 2.0 + g.barcode_width, g.card_width));
        assert!(close(by, mm(5.5)));
    }

    #[test]
    fn grid_fits_on_letter() {
        let g = CardGeometry::cr80();
        let page = PageSize::LETTER;
        let width = g.margin_left + g.columns as f32 * g.card_width + (g.columns - 1) as f32 * g.gap_x;
        let height = g.margin_top + g.rows as f32 * g.card_height + (g.rows - 1) as f32 * g.gap_y;
        assert!(width < page.width);
        assert!(height < page.height);
    }
}
