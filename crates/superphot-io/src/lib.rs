//! File I/O, validation, and serialization for the superphot workflow.

mod domain;
mod error;
mod reader;
mod table;
mod writer;

pub use domain::ObservationTable;
pub use error::IoError;
pub use reader::{DEFAULT_METADATA_COLUMNS, GROUP_ID_COLUMN, ROW_ID_COLUMN, TYPE_COLUMN, TableReader};
pub use table::{format_bordered, format_two_line, parse_two_line, read_sweep_table, write_sweep_table};
pub use writer::{RESULTS_FILE, ResultWriter, VALIDATION_FILE, read_json, write_json};
