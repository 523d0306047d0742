mod pagination;
mod pdf;
mod pipeline;
mod typst;
mod view;

pub use pagination::{plan, PagePlacement};
pub use pdf::PdfWriter;
pub use pipeline::InvoiceExportPipeline;
pub use typst::TypstRenderer;
pub use view::{format_money, InvoiceView, InvoiceViewItem};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::CaptureSettings;
use crate::error::Result;
use crate::order::Order;

/// Raster image of a rendered invoice
#[derive(Debug, Clone)]
pub struct Capture {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded pixels
    pub image_data: Vec<u8>,
}

/// Turns an invoice into a bitmap
pub trait Renderer {
    fn capture(&self, view: &InvoiceView, settings: &CaptureSettings) -> Result<Capture>;
}

/// Physical unit for page geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Pt,
}

impl Unit {
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            Unit::Mm => value,
            Unit::Pt => value * 25.4 / 72.0,
        }
    }
}

/// Creates paged documents
pub trait DocumentWriter {
    type Document: PageDocument;

    /// Start a document whose first page already exists
    fn new_document(&self, page_width: f64, page_height: f64, unit: Unit)
        -> Result<Self::Document>;
}

/// A document under construction. Coordinates use the document's unit with
/// the origin at the top-left corner of the current page.
pub trait PageDocument {
    fn add_page(&mut self) -> Result<()>;

    fn draw_image(&mut self, image: &Capture, x: f64, y: f64, width: f64, height: f64)
        -> Result<()>;

    /// Write the finished document. Nothing exists at `path` unless this succeeds.
    fn save(self, path: &Path) -> Result<()>;
}

/// `Invoice-<SHORTID>.pdf`
pub fn invoice_filename(order: &Order) -> String {
    format!("Invoice-{}.pdf", order.short_id())
}
