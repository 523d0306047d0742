use crate::error::{RentalError, Result};

/// How one page draws the scaled source image.
///
/// The whole image is drawn at `vertical_offset` (measured down from the page
/// top, so later pages get negative offsets) with height `slice_height`. The
/// page clips whatever falls outside its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    pub page_index: usize,
    pub vertical_offset: f64,
    pub slice_height: f64,
}

impl PagePlacement {
    /// Height of the image that actually lands on a page of `page_height`
    pub fn visible_height(&self, page_height: f64) -> f64 {
        let bottom = self.vertical_offset + self.slice_height;
        bottom.min(page_height) - self.vertical_offset.max(0.0)
    }
}

const RATIO_TOLERANCE: f64 = 1e-9;

fn check_dimension(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RentalError::invalid(format!(
            "{name} must be a positive number (got {value})"
        )))
    }
}

/// `ceil(height / page_height)`, treating a ratio within rounding error of a
/// whole number as that number
fn page_count(height: f64, page_height: f64) -> usize {
    let ratio = height / page_height;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= RATIO_TOLERANCE * nearest.max(1.0) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

/// Lay a `source_width × source_height` image across pages of
/// `page_width × page_height`, scaling it to the page width.
///
/// Offsets run from the top: page `n` draws the image at `-n × page_height`.
/// An image whose scaled height is an exact multiple of the page height does
/// not produce a trailing blank page.
pub fn plan(
    source_width: f64,
    source_height: f64,
    page_width: f64,
    page_height: f64,
) -> Result<Vec<PagePlacement>> {
    check_dimension("source width", source_width)?;
    check_dimension("source height", source_height)?;
    check_dimension("page width", page_width)?;
    check_dimension("page height", page_height)?;

    let scale = page_width / source_width;
    let scaled_height = source_height * scale;

    if scaled_height <= page_height {
        return Ok(vec![PagePlacement {
            page_index: 0,
            vertical_offset: 0.0,
            slice_height: scaled_height,
        }]);
    }

    let placements = (0..page_count(scaled_height, page_height))
        .map(|page_index| PagePlacement {
            page_index,
            vertical_offset: -(page_index as f64) * page_height,
            slice_height: scaled_height,
        })
        .collect();

    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4_WIDTH: f64 = 210.0;
    const A4_HEIGHT: f64 = 297.0;

    #[test]
    fn short_source_fits_on_one_page() {
        let placements = plan(794.0, 1000.0, A4_WIDTH, A4_HEIGHT).unwrap();

        assert_eq!(placements.len(), 1);
        let only = placements[0];
        assert_eq!(only.page_index, 0);
        assert_eq!(only.vertical_offset, 0.0);
        assert!((only.slice_height - 1000.0 * A4_WIDTH / 794.0).abs() < 1e-9);
    }

    #[test]
    fn source_exactly_one_page_tall_is_single_page() {
        let placements = plan(210.0, 297.0, A4_WIDTH, A4_HEIGHT).unwrap();
        assert_eq!(placements.len(), 1);
    }

    #[test]
    fn tall_invoice_spans_two_pages() {
        let placements = plan(794.0, 2200.0, A4_WIDTH, A4_HEIGHT).unwrap();

        let scaled = 2200.0 * (A4_WIDTH / 794.0);
        assert!((scaled - 581.86).abs() < 0.01);
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0].vertical_offset, 0.0);
        assert_eq!(placements[1].vertical_offset, -297.0);
        assert_eq!(placements[1].page_index, 1);
        assert!(placements.iter().all(|p| (p.slice_height - scaled).abs() < 1e-9));
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let placements = plan(100.0, 3.0 * 297.0, 100.0, 297.0).unwrap();

        assert_eq!(placements.len(), 3);
        let offsets: Vec<f64> = placements.iter().map(|p| p.vertical_offset).collect();
        assert_eq!(offsets, vec![0.0, -297.0, -594.0]);
    }

    #[test]
    fn page_count_is_ceiling_of_scaled_height() {
        for source_height in [298.0, 400.0, 593.0, 595.0, 1000.0, 2970.5, 10_000.0] {
            let placements = plan(210.0, source_height, 210.0, 297.0).unwrap();
            let expected = (source_height / 297.0_f64).ceil() as usize;
            assert_eq!(placements.len(), expected, "source height {source_height}");

            for (index, placement) in placements.iter().enumerate() {
                assert_eq!(placement.page_index, index);
                assert_eq!(placement.vertical_offset, -(index as f64) * 297.0);
            }
        }
    }

    #[test]
    fn exact_multiple_of_fractional_page_height_has_no_trailing_page() {
        let a4_pt = 841.89;
        let placements = plan(595.28, 3.0 * a4_pt, 595.28, a4_pt).unwrap();

        assert_eq!(placements.len(), 3);
        assert_eq!(placements[2].vertical_offset, -2.0 * a4_pt);
        assert!(placements[2].visible_height(a4_pt) > 0.0);
    }

    #[test]
    fn page_count_holds_for_fractional_page_heights() {
        for tenths in 1..400 {
            let page_height = f64::from(tenths) / 10.0;
            for pages in 2..60 {
                let placements = plan(10.0, f64::from(pages) * page_height, 10.0, page_height).unwrap();
                assert_eq!(
                    placements.len(),
                    pages as usize,
                    "page height {page_height}, {pages} pages"
                );
                let last = placements[placements.len() - 1];
                assert!(last.visible_height(page_height) > 0.0);
            }
        }
    }

    #[test]
    fn visible_heights_cover_image_without_overlap() {
        let placements = plan(794.0, 2200.0, A4_WIDTH, A4_HEIGHT).unwrap();
        let covered: f64 = placements.iter().map(|p| p.visible_height(A4_HEIGHT)).sum();

        assert!((covered - placements[0].slice_height).abs() < 1e-9);
        assert_eq!(placements[0].visible_height(A4_HEIGHT), A4_HEIGHT);
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(plan(0.0, 100.0, A4_WIDTH, A4_HEIGHT).is_err());
        assert!(plan(100.0, 0.0, A4_WIDTH, A4_HEIGHT).is_err());
        assert!(plan(100.0, 100.0, -1.0, A4_HEIGHT).is_err());
        assert!(plan(100.0, 100.0, A4_WIDTH, 0.0).is_err());
        assert!(plan(f64::NAN, 100.0, A4_WIDTH, A4_HEIGHT).is_err());
        assert!(plan(100.0, f64::INFINITY, A4_WIDTH, A4_HEIGHT).is_err());
    }
}
