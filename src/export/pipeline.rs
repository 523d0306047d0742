use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{invoice_filename, plan, DocumentWriter, InvoiceView, PageDocument, Renderer};
use crate::config::Config;
use crate::error::{RentalError, Result};
use crate::order::Order;

/// Renders an order's invoice, paginates the capture onto fixed-size pages
/// and saves the document as `Invoice-<SHORTID>.pdf`.
pub struct InvoiceExportPipeline<R, W> {
    renderer: R,
    writer: W,
}

impl<R: Renderer, W: DocumentWriter> InvoiceExportPipeline<R, W> {
    pub fn new(renderer: R, writer: W) -> Self {
        Self { renderer, writer }
    }

    /// Export `order` into `output_dir`, returning the written path.
    ///
    /// Any failure is reported as `ExportFailed`; no file is left behind.
    pub fn export(&self, order: &Order, config: &Config, output_dir: &Path) -> Result<PathBuf> {
        let short_id = order.short_id();
        self.run(order, config, output_dir)
            .map_err(|e| RentalError::export_failed(&short_id, e))
    }

    fn run(&self, order: &Order, config: &Config, output_dir: &Path) -> Result<PathBuf> {
        let settings = &config.export;
        let view = InvoiceView::from_order(order, config)?;

        let capture = self.renderer.capture(&view, &settings.capture)?;
        if capture.width == 0 || capture.height == 0 {
            return Err(RentalError::Render(format!(
                "capture has no area ({}x{})",
                capture.width, capture.height
            )));
        }

        let placements = plan(
            f64::from(capture.width),
            f64::from(capture.height),
            settings.page_width,
            settings.page_height,
        )?;
        debug!(
            width = capture.width,
            height = capture.height,
            pages = placements.len(),
            "planned invoice pages"
        );

        let mut document = self.writer.new_document(
            settings.page_width,
            settings.page_height,
            settings.unit,
        )?;
        for placement in &placements {
            if placement.page_index > 0 {
                document.add_page()?;
            }
            document.draw_image(
                &capture,
                0.0,
                placement.vertical_offset,
                settings.page_width,
                placement.slice_height,
            )?;
        }

        let path = output_dir.join(invoice_filename(order));
        document.save(&path)?;

        info!(
            order = %order.short_id(),
            pages = placements.len(),
            path = %path.display(),
            "exported invoice"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaptureSettings, CONFIG_TEMPLATE};
    use crate::export::{Capture, PdfWriter, Unit};
    use crate::order::fixtures::{details, item};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        NewDocument(f64, f64, Unit),
        AddPage,
        Draw { x: f64, y: f64, width: f64, height: f64 },
        Save(PathBuf),
    }

    struct FakeRenderer {
        result: std::result::Result<(u32, u32), String>,
        seen_scale: RefCell<Option<f64>>,
    }

    impl FakeRenderer {
        fn ok(width: u32, height: u32) -> Self {
            Self {
                result: Ok((width, height)),
                seen_scale: RefCell::new(None),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                result: Err(message.to_string()),
                seen_scale: RefCell::new(None),
            }
        }
    }

    impl Renderer for FakeRenderer {
        fn capture(&self, view: &InvoiceView, settings: &CaptureSettings) -> Result<Capture> {
            assert!(!view.number.is_empty());
            *self.seen_scale.borrow_mut() = Some(settings.scale);
            match &self.result {
                Ok((width, height)) => Ok(Capture {
                    width: *width,
                    height: *height,
                    image_data: vec![0; 4],
                }),
                Err(message) => Err(RentalError::Render(message.clone())),
            }
        }
    }

    #[derive(Default, Clone)]
    struct RecordingWriter {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    struct RecordingDocument {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl DocumentWriter for RecordingWriter {
        type Document = RecordingDocument;

        fn new_document(&self, page_width: f64, page_height: f64, unit: Unit) -> Result<RecordingDocument> {
            self.calls
                .borrow_mut()
                .push(Call::NewDocument(page_width, page_height, unit));
            Ok(RecordingDocument {
                calls: Rc::clone(&self.calls),
            })
        }
    }

    impl PageDocument for RecordingDocument {
        fn add_page(&mut self) -> Result<()> {
            self.calls.borrow_mut().push(Call::AddPage);
            Ok(())
        }

        fn draw_image(&mut self, _image: &Capture, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
            self.calls.borrow_mut().push(Call::Draw { x, y, width, height });
            Ok(())
        }

        fn save(self, path: &Path) -> Result<()> {
            self.calls.borrow_mut().push(Call::Save(path.to_path_buf()));
            Ok(())
        }
    }

    fn config() -> Config {
        toml::from_str(CONFIG_TEMPLATE).unwrap()
    }

    fn order() -> Order {
        let mut order = Order::new(details("2026-01-05"), vec![item("Avanza:2:150000:3")]).unwrap();
        order.id = uuid::Uuid::parse_str("3f2a9c1e-7b4d-4e8a-9c2f-0123456789ab").unwrap();
        order
    }

    #[test]
    fn tall_capture_is_drawn_on_two_pages() {
        let config = config();
        let writer = RecordingWriter::default();
        let pipeline = InvoiceExportPipeline::new(FakeRenderer::ok(794, 2200), writer.clone());

        let path = pipeline.export(&order(), &config, Path::new("/out")).unwrap();

        assert_eq!(path, PathBuf::from("/out/Invoice-3F2A9C1E.pdf"));
        let scaled = 2200.0 * (210.0 / 794.0);
        assert_eq!(
            *writer.calls.borrow(),
            vec![
                Call::NewDocument(210.0, 297.0, Unit::Mm),
                Call::Draw { x: 0.0, y: 0.0, width: 210.0, height: scaled },
                Call::AddPage,
                Call::Draw { x: 0.0, y: -297.0, width: 210.0, height: scaled },
                Call::Save(PathBuf::from("/out/Invoice-3F2A9C1E.pdf")),
            ]
        );
    }

    #[test]
    fn short_capture_adds_no_pages() {
        let config = config();
        let writer = RecordingWriter::default();
        let pipeline = InvoiceExportPipeline::new(FakeRenderer::ok(794, 900), writer.clone());

        pipeline.export(&order(), &config, Path::new("/out")).unwrap();

        let calls = writer.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(!calls.contains(&Call::AddPage));
    }

    #[test]
    fn capture_uses_configured_scale() {
        let mut config = config();
        config.export.capture.scale = 3.0;
        let renderer = FakeRenderer::ok(794, 900);
        let pipeline = InvoiceExportPipeline::new(renderer, RecordingWriter::default());

        pipeline.export(&order(), &config, Path::new("/out")).unwrap();
        assert_eq!(*pipeline.renderer.seen_scale.borrow(), Some(3.0));
    }

    #[test]
    fn capture_failure_aborts_before_writing() {
        let config = config();
        let writer = RecordingWriter::default();
        let pipeline = InvoiceExportPipeline::new(FakeRenderer::failing("image blocked by sandbox"), writer.clone());

        let err = pipeline.export(&order(), &config, Path::new("/out")).unwrap_err();

        match err {
            RentalError::ExportFailed { order, source } => {
                assert_eq!(order, "3F2A9C1E");
                assert!(source.to_string().contains("image blocked by sandbox"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(writer.calls.borrow().is_empty());
    }

    #[test]
    fn zero_sized_capture_is_an_export_failure() {
        let config = config();
        for (width, height) in [(0, 100), (100, 0)] {
            let writer = RecordingWriter::default();
            let pipeline = InvoiceExportPipeline::new(FakeRenderer::ok(width, height), writer.clone());
            assert!(matches!(
                pipeline.export(&order(), &config, Path::new("/out")),
                Err(RentalError::ExportFailed { .. })
            ));
            assert!(writer.calls.borrow().is_empty());
        }
    }

    #[test]
    fn real_writer_leaves_no_file_when_capture_fails() {
        let config = config();
        let dir = TempDir::new().unwrap();
        let pipeline = InvoiceExportPipeline::new(FakeRenderer::failing("boom"), PdfWriter::new("Invoice"));

        assert!(pipeline.export(&order(), &config, dir.path()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
