pub mod error;
pub mod labels;
pub mod value;

pub use error::{Result, StarError};
pub use labels::{KNOWN_LABELS, LabelCatalog};
pub use value::{CastError, CellValue, ColumnType, format_real};
