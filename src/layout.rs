//! Slot arithmetic for single-card and multi-up pages.

use crate::geometry::{CardGeometry, PageSize};

/// Which encoding of the input a slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeVariant {
    Plain,
    Checksum,
}

impl BarcodeVariant {
    pub fn from_checksum(checksum: bool) -> Self {
        if checksum { Self::Checksum } else { Self::Plain }
    }

    pub fn is_checksum(self) -> bool {
        matches!(self, Self::Checksum)
    }
}

/// Target page arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// One card on a page cut to the card's own size.
    CardSized,
    /// One card in the top-left grid slot of a letter page.
    LetterSingle,
    /// Full grid on a letter page, every slot the requested variant.
    LetterGrid,
    /// Full grid, column 0 plain and the remaining columns checksum.
    LetterGridMixed,
}

/// One card position on the page. `x`/`y` is the card's bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSlot {
    pub index: usize,
    pub row: usize,
    pub column: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub slot: LayoutSlot,
    pub variant: BarcodeVariant,
}

/// Page size plus ordered card placements.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub page: PageSize,
    pub placements: Vec<Placement>,
}

impl LayoutPlan {
    /// Variants used anywhere on the page, in first-use order.
    pub fn variants(&self) -> Vec<BarcodeVariant> {
        let mut out = Vec::new();
        for p in &self.placements {
            if !out.contains(&p.variant) {
                out.push(p.variant);
            }
        }
        out
    }
}

pub struct LayoutEngine<'g> {
    geometry: &'g CardGeometry,
}

impl<'g> LayoutEngine<'g> {
    pub fn new(geometry: &'g CardGeometry) -> Self {
        Self { geometry }
    }

    pub fn page_size(&self, layout: PageLayout) -> PageSize {
        match layout {
            PageLayout::CardSized => self.geometry.card_page(),
            _ => PageSize::LETTER,
        }
    }

    /// Slot `index` of the grid on `page`, counted row-major from the top-left.
    pub fn grid_slot(&self, page: PageSize, index: usize) -> LayoutSlot {
        let g = self.geometry;
        let columns = g.columns.max(1);
        let row = index / columns;
        let column = index % columns;
        let top_y = page.height - g.margin_top - g.card_height;
        LayoutSlot {
            index,
            row,
            column,
            x: g.margin_left + column as f32 * g.column_stride(),
            y: top_y - row as f32 * g.row_stride(),
        }
    }

    /// Resolve every slot for `layout`. `checksum` is ignored by the mixed grid.
    pub fn plan(&self, layout: PageLayout, checksum: bool) -> LayoutPlan {
        let page = self.page_size(layout);
        let requested = BarcodeVariant::from_checksum(checksum);
        let placements = match layout {
            PageLayout::CardSized => vec![Placement {
                slot: LayoutSlot {
                    index: 0,
                    row: 0,
                    column: 0,
                    x: 0.0,
                    y: 0.0,
                },
                variant: requested,
            }],
            PageLayout::LetterSingle => vec![Placement {
                slot: self.grid_slot(page, 0),
                variant: requested,
            }],
            PageLayout::LetterGrid | PageLayout::LetterGridMixed => {
                let count = self.geometry.columns * self.geometry.rows;
                (0..count)
                    .map(|i| {
                        let slot = self.grid_slot(page, i);
                        let variant = if layout == PageLayout::LetterGridMixed {
                            BarcodeVariant::from_checksum(slot.column >= 1)
                        } else {
                            requested
                        };
                        Placement { slot, variant }
                    })
                    .collect()
            }
        };
        LayoutPlan { page, placements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn card_sized_page_has_one_slot_at_origin() {
        let g = CardGeometry::cr80();
        let plan = LayoutEngine::new(&g).plan(PageLayout::CardSized, true);
        assert_eq!(plan.page, g.card_page());
        assert_eq!(plan.placements.len(), 1);
        assert_eq!(plan.placements[0].slot.x, 0.0);
        assert_eq!(plan.placements[0].slot.y, 0.0);
        assert_eq!(plan.placements[0].variant, BarcodeVariant::Checksum);
    }

    #[test]
    fn letter_single_uses_top_left_slot() {
        let g = CardGeometry::cr80();
        let plan = LayoutEngine::new(&g).plan(PageLayout::LetterSingle, false);
        let slot = plan.placements[0].slot;
        assert_eq!(plan.page, PageSize::LETTER);
        assert!(close(slot.x, g.margin_left));
        assert!(close(slot.y, 792.0 - g.margin_top - g.card_height));
        assert_eq!(plan.placements[0].variant, BarcodeVariant::Plain);
    }

    #[test]
    fn grid_slots_follow_row_major_order() {
        let g = CardGeometry::cr80();
        let plan = LayoutEngine::new(&g).plan(PageLayout::LetterGrid, false);
        assert_eq!(plan.placements.len(), 6);

        let first = plan.placements[0].slot;
        assert!(close(first.x, g.margin_left));
        assert!(close(first.y, PageSize::LETTER.height - g.margin_top - g.card_height));

        let last = plan.placements[5].slot;
        assert_eq!((last.row, last.column), (2, 1));
        assert!(close(first.y - last.y, 2.0 * (g.card_height + g.gap_y)));
        assert!(close(last.x - first.x, g.card_width + g.gap_x));

        assert!(plan.placements.iter().all(|p| p.variant == BarcodeVariant::Plain));
        assert_eq!(plan.variants(), vec![BarcodeVariant::Plain]);
    }

    #[test]
    fn grid_slots_stay_on_page() {
        let g = CardGeometry::cr80();
        let plan = LayoutEngine::new(&g).plan(PageLayout::LetterGrid, true);
        for p in &plan.placements {
            assert!(p.slot.x >= 0.0 && p.slot.y >= 0.0);
            assert!(p.slot.x + g.card_width <= plan.page.width);
            assert!(p.slot.y + g.card_height <= plan.page.height);
        }
    }

    #[test]
    fn mixed_grid_splits_variants_by_column() {
        let g = CardGeometry::cr80();
        let engine = LayoutEngine::new(&g);
        for checksum in [false, true] {
            let plan = engine.plan(PageLayout::LetterGridMixed, checksum);
            for p in &plan.placements {
                let expected = if p.slot.column == 0 {
                    BarcodeVariant::Plain
                } else {
                    BarcodeVariant::Checksum
                };
                assert_eq!(p.variant, expected, "slot {}", p.slot.index);
            }
            assert_eq!(
                plan.variants(),
                vec![BarcodeVariant::Plain, BarcodeVariant::Checksum]
            );
        }
    }
}
