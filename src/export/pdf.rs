use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfPageIndex, Px,
};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Capture, DocumentWriter, PageDocument, Unit};
use crate::error::{RentalError, Result};

/// Document writer backed by printpdf
pub struct PdfWriter {
    title: String,
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl DocumentWriter for PdfWriter {
    type Document = PdfPages;

    fn new_document(&self, page_width: f64, page_height: f64, unit: Unit) -> Result<PdfPages> {
        let width_mm = unit.to_mm(page_width);
        let height_mm = unit.to_mm(page_height);
        let (doc, page, layer) = PdfDocument::new(
            &self.title,
            Mm(width_mm as f32),
            Mm(height_mm as f32),
            "Page 1",
        );

        Ok(PdfPages {
            doc,
            current: (page, layer),
            unit,
            width_mm,
            height_mm,
            pages: 1,
            decoded: None,
        })
    }
}

/// A printpdf document being filled page by page
pub struct PdfPages {
    doc: PdfDocumentReference,
    current: (PdfPageIndex, PdfLayerIndex),
    unit: Unit,
    width_mm: f64,
    height_mm: f64,
    pages: usize,
    /// Last capture drawn and its decoded pixels
    decoded: Option<(Vec<u8>, RgbImage)>,
}

impl PdfPages {
    /// Decoded pixels of `image`, decoding only when it differs from the last capture drawn
    fn decoded(&mut self, image: &Capture) -> Result<&RgbImage> {
        let cached = matches!(&self.decoded, Some((source, _)) if *source == image.image_data);
        if !cached {
            let rgb_image = image::load_from_memory(&image.image_data)
                .map_err(|e| RentalError::Pdf(format!("invalid capture image: {e}")))?
                .to_rgb8();
            if rgb_image.width() == 0 || rgb_image.height() == 0 {
                return Err(RentalError::Pdf("capture image is empty".to_string()));
            }
            self.decoded = Some((image.image_data.clone(), rgb_image));
        }
        match &self.decoded {
            Some((_, rgb_image)) => Ok(rgb_image),
            None => Err(RentalError::Pdf("capture image is missing".to_string())),
        }
    }
}

/// Pixel rows `first..end` of a `rows`-tall image drawn `height` tall at `top`
/// that fall inside a page of `page_height`. `None` when nothing is visible.
fn visible_rows(top: f64, height: f64, page_height: f64, rows: u32) -> Option<(u32, u32)> {
    let rows_per_unit = f64::from(rows) / height;
    let visible_top = (-top).max(0.0);
    let visible_bottom = (page_height - top).min(height);
    if visible_bottom <= visible_top {
        return None;
    }

    let first = ((visible_top * rows_per_unit).floor() as u32).min(rows);
    let end = ((visible_bottom * rows_per_unit).ceil() as u32).min(rows);
    (end > first).then_some((first, end))
}

impl PageDocument for PdfPages {
    fn add_page(&mut self) -> Result<()> {
        self.pages += 1;
        self.current = self.doc.add_page(
            Mm(self.width_mm as f32),
            Mm(self.height_mm as f32),
            format!("Page {}", self.pages),
        );
        Ok(())
    }

    fn draw_image(&mut self, image: &Capture, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        let x = self.unit.to_mm(x);
        let y = self.unit.to_mm(y);
        let width = self.unit.to_mm(width);
        let height = self.unit.to_mm(height);
        if width <= 0.0 || height <= 0.0 {
            return Err(RentalError::Pdf(format!(
                "cannot draw a {width}x{height}mm image"
            )));
        }

        let height_mm = self.height_mm;
        let rgb_image = self.decoded(image)?;
        let (width_px, height_px) = rgb_image.dimensions();

        // Only the rows that land on this page are embedded
        let Some((first_row, end_row)) = visible_rows(y, height, height_mm, height_px) else {
            return Ok(());
        };
        let mm_per_row = height / f64::from(height_px);
        let strip_top = y + f64::from(first_row) * mm_per_row;
        let strip_height = f64::from(end_row - first_row) * mm_per_row;
        let strip = image::imageops::crop_imm(rgb_image, 0, first_row, width_px, end_row - first_row)
            .to_image();
        let strip_rows = strip.height();

        let xobject = Image::from(ImageXObject {
            width: Px(width_px as usize),
            height: Px(strip_rows as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: strip.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // DPI that makes the natural width equal `width`; height is then scaled to fit
        let dpi = f64::from(width_px) / (width / 25.4);
        let natural_height = f64::from(strip_rows) / dpi * 25.4;
        // PDF origin is the bottom-left corner; `y` is measured down from the top
        let bottom = height_mm - (strip_top + strip_height);

        let layer = self.doc.get_page(self.current.0).get_layer(self.current.1);
        xobject.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(x as f32)),
                translate_y: Some(Mm(bottom as f32)),
                scale_y: Some((strip_height / natural_height) as f32),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn save(self, path: &Path) -> Result<()> {
        let pages = self.pages;
        let bytes = self
            .doc
            .save_to_bytes()
            .map_err(|e| RentalError::Pdf(format!("{e:?}")))?;
        write_atomically(path, &bytes)?;
        debug!(pages, bytes = bytes.len(), path = %path.display(), "wrote pdf");
        Ok(())
    }
}

/// Write to a sibling file first so `path` only ever holds a complete document
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
