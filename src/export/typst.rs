use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

use super::{Capture, InvoiceView, Renderer, Unit};
use crate::config::CaptureSettings;
use crate::error::{RentalError, Result};

/// Embedded Typst template for the invoice.
/// The page is as tall as its content so the whole invoice comes out as one image.
const INVOICE_TEMPLATE: &str = r##"// Rental invoice
// Data is loaded from JSON file

#let data = json("data.json")

#set page(
  width: PAGE_WIDTH,
  height: auto,
  margin: (x: 16mm, y: 14mm),
  fill: rgb("BACKGROUND_COLOR"),
)

#set text(font: "Helvetica", size: 10pt)

#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #if data.company.logo != none [
      #image(data.company.logo, height: 14mm)
      #v(0.3em)
    ]
    #text(size: 18pt, weight: "bold")[#data.company.name]
    #v(0.3em)
    #data.company.address \
    #data.company.city
    #if data.company.phone != none [
      \ #data.company.phone
    ]
    #if data.company.email != none [
      \ #data.company.email
    ]
  ],
  [
    #text(size: 24pt, weight: "bold")[INVOICE]
    #v(0.5em)
    #table(
      columns: (auto, auto),
      stroke: none,
      align: (right, left),
      inset: 2pt,
      [*Invoice \#:*], [#data.number],
      [*Order date:*], [#data.order_date],
      [*Rental from:*], [#data.rental_start_date],
      [*Rental until:*], [#data.rental_end_date],
    )
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

#text(weight: "bold", size: 11pt)[Customer:]
#v(0.3em)
#text(weight: "bold")[#data.customer_name] \
#data.customer_phone
#if data.customer_address != none [
  \ #data.customer_address
]

#v(1.5em)

#table(
  columns: (auto, 1fr, auto, auto, auto, auto),
  align: (center, left, right, right, right, right),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
  inset: 8pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  [*\#*], [*Car type*], [*Qty*], [*Days*], [*Daily rate*], [*Subtotal*],

  ..data.items.map(item => (
    str(item.number),
    item.car_type,
    str(item.quantity),
    str(item.days),
    item.daily_rate,
    item.subtotal,
  )).flatten()
)

#v(1em)

#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 6pt,
    table.hline(stroke: 1pt),
    [*Total:*], [*#data.total*],
  )
]

#if data.notes != none [
  #v(1.5em)
  #text(weight: "bold")[Notes:] #data.notes
]

#if data.payment_note != none [
  #v(1em)
  #text(size: 9pt, fill: gray)[#data.payment_note]
]
"##;

/// Rasterises invoices with the Typst CLI
pub struct TypstRenderer {
    binary: PathBuf,
    page_width: f64,
    unit: Unit,
}

impl TypstRenderer {
    pub fn new(page_width: f64, unit: Unit) -> Self {
        Self {
            binary: PathBuf::from("typst"),
            page_width,
            unit,
        }
    }

    /// Use a specific typst executable instead of the one on PATH
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    fn page_width_literal(&self) -> String {
        match self.unit {
            Unit::Mm => format!("{}mm", self.page_width),
            Unit::Pt => format!("{}pt", self.page_width),
        }
    }
}

/// Scratch directory holding the template and data for one capture.
/// Removed when dropped, whichever way the capture ends.
struct RenderWorkspace {
    dir: TempDir,
}

impl RenderWorkspace {
    fn prepare(template: &str, view: &InvoiceView) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("rental-invoice-")
            .tempdir()?;

        let json_data =
            serde_json::to_string(view).map_err(|e| RentalError::Render(e.to_string()))?;
        fs::write(dir.path().join("data.json"), json_data)?;
        fs::write(dir.path().join("invoice.typ"), template)?;

        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn template_path(&self) -> PathBuf {
        self.dir.path().join("invoice.typ")
    }

    fn image_path(&self) -> PathBuf {
        self.dir.path().join("invoice.png")
    }
}

impl Renderer for TypstRenderer {
    fn capture(&self, view: &InvoiceView, settings: &CaptureSettings) -> Result<Capture> {
        // Check if typst is available
        if Command::new(&self.binary).arg("--version").output().is_err() {
            return Err(RentalError::TypstNotFound);
        }

        let template = INVOICE_TEMPLATE
            .replace("PAGE_WIDTH", &self.page_width_literal())
            .replace("BACKGROUND_COLOR", &settings.background_color);
        let workspace = RenderWorkspace::prepare(&template, view)?;

        // Sandboxed to the workspace unless external assets are allowed
        let root = if settings.allow_external_assets {
            workspace
                .path()
                .ancestors()
                .last()
                .unwrap_or(workspace.path())
                .to_path_buf()
        } else {
            workspace.path().to_path_buf()
        };

        let ppi = settings.ppi();
        debug!(ppi, root = %root.display(), "capturing invoice with typst");

        let output = Command::new(&self.binary)
            .arg("compile")
            .arg("--root")
            .arg(&root)
            .arg("--format")
            .arg("png")
            .arg("--ppi")
            .arg(ppi.to_string())
            .arg(workspace.template_path())
            .arg(workspace.image_path())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RentalError::Render(stderr.trim().to_string()));
        }

        let image_path = workspace.image_path();
        let (width, height) = image::image_dimensions(&image_path)
            .map_err(|e| RentalError::Render(format!("unreadable capture: {e}")))?;
        let image_data = fs::read(&image_path)?;

        debug!(width, height, "captured invoice");
        Ok(Capture {
            width,
            height,
            image_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CONFIG_TEMPLATE};
    use crate::order::fixtures::{details, item};
    use crate::order::Order;

    fn view() -> InvoiceView {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        let order = Order::new(details("2026-01-05"), vec![item("Avanza:2:150000:3")]).unwrap();
        InvoiceView::from_order(&order, &config).unwrap()
    }

    #[test]
    fn workspace_is_removed_on_drop() {
        let workspace = RenderWorkspace::prepare(INVOICE_TEMPLATE, &view()).unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.join("data.json").exists());
        assert!(workspace.template_path().exists());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn workspace_data_matches_view() {
        let workspace = RenderWorkspace::prepare(INVOICE_TEMPLATE, &view()).unwrap();
        let json = fs::read_to_string(workspace.path().join("data.json")).unwrap();
        let data: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(data["items"][0]["car_type"], "Avanza");
        assert_eq!(data["total"], "Rp 900,000.00");
        assert!(data["notes"].is_null());
    }

    #[test]
    fn missing_binary_is_reported() {
        let renderer = TypstRenderer::new(210.0, Unit::Mm).with_binary("/nonexistent/typst-binary");
        assert!(matches!(
            renderer.capture(&view(), &CaptureSettings::default()),
            Err(RentalError::TypstNotFound)
        ));
    }

    #[test]
    fn page_width_uses_configured_unit() {
        assert_eq!(TypstRenderer::new(210.0, Unit::Mm).page_width_literal(), "210mm");
        assert_eq!(TypstRenderer::new(595.5, Unit::Pt).page_width_literal(), "595.5pt");
    }
}
