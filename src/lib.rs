pub mod config;
pub mod error;
pub mod export;
pub mod order;

pub use config::{CaptureSettings, Company, Config, ExportSettings, State};
pub use error::{RentalError, Result};
pub use export::{plan, InvoiceExportPipeline, PagePlacement, PdfWriter, TypstRenderer};
pub use order::{summarize, total, LineItem, MonthlyReportRow, Order, OrderDetails};
