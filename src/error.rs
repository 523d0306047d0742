use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RentalError {
    #[error("Config directory not found at {0}. Run 'rental init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Failed to write state: {0}")]
    StateSerialize(#[from] toml::ser::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid item format '{0}'. Expected 'car_type:quantity:daily_rate:days' (e.g., 'Avanza:2:150000:3')")]
    InvalidItemFormat(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Rental ends ({end}) before it starts ({start})")]
    InvalidRentalPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Order '{0}' not found")]
    OrderNotFound(String),

    #[error("Order reference '{0}' matches more than one order. Use more characters of the id.")]
    AmbiguousOrder(String),

    #[error("Invalid order index '{0}'. Use 'rental list' to see available orders.")]
    InvalidOrderIndex(String),

    #[error("Item {index} not found on order {order} ({count} item(s))")]
    ItemNotFound {
        order: String,
        index: usize,
        count: usize,
    },

    #[error("Order {0} has no items to invoice")]
    NoItems(String),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to render invoice: {0}")]
    Render(String),

    #[error("Failed to write PDF: {0}")]
    Pdf(String),

    #[error("Export of order {order} failed: {source}")]
    ExportFailed {
        order: String,
        #[source]
        source: Box<RentalError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RentalError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RentalError::InvalidInput(message.into())
    }

    pub(crate) fn export_failed(order: &str, source: RentalError) -> Self {
        RentalError::ExportFailed {
            order: order.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
