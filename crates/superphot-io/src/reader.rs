//! CSV observation-table reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ObservationTable;

/// Column holding the unique row identifier.
pub const ROW_ID_COLUMN: &str = "row_id";
/// Column holding the group (object) identifier.
pub const GROUP_ID_COLUMN: &str = "group_id";
/// Column holding the class name; an empty cell marks an unlabeled row.
pub const TYPE_COLUMN: &str = "type";
/// Metadata columns carried through to the results table when present.
pub const DEFAULT_METADATA_COLUMNS: [&str; 4] = ["hostz", "flag0", "flag1", "flag2"];

/// Loads one observation table from CSV.
///
/// The header names the columns. `row_id` and `group_id` must be present;
/// `type` may be absent, in which case no row is labeled. Columns listed as
/// metadata are kept verbatim as strings and every other column must hold
/// finite numbers.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | the file cannot be opened |
/// | [`IoError::CsvParse`] | the csv parser rejects a record |
/// | [`IoError::MissingColumn`] | `row_id` or `group_id` is missing |
/// | [`IoError::NoFeatureColumns`] | no column is left for features |
/// | [`IoError::EmptyTable`] | the header is followed by nothing |
/// | [`IoError::InconsistentRowLength`] | a row is wider or narrower than the header |
/// | [`IoError::NonFiniteValue`] | a feature cell is not a finite float |
/// | [`IoError::DuplicateRowId`] | two rows share a `row_id` |
pub struct TableReader {
    path: PathBuf,
    metadata_columns: Vec<String>,
}

enum Role {
    RowId,
    GroupId,
    Type,
    Metadata,
    Feature,
}

impl TableReader {
    /// Reader for `path` with the default metadata columns.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            metadata_columns: DEFAULT_METADATA_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the set of metadata column names.
    #[must_use]
    pub fn with_metadata_columns(mut self, columns: Vec<String>) -> Self {
        self.metadata_columns = columns;
        self
    }

    /// Parse the whole file into an [`ObservationTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<ObservationTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets InconsistentRowLength fire instead of a bare CsvParse.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();

        let roles: Vec<Role> = header
            .iter()
            .map(|name| match name {
                ROW_ID_COLUMN => Role::RowId,
                GROUP_ID_COLUMN => Role::GroupId,
                TYPE_COLUMN => Role::Type,
                other if self.metadata_columns.iter().any(|m| m == other) => Role::Metadata,
                _ => Role::Feature,
            })
            .collect();

        for required in [ROW_ID_COLUMN, GROUP_ID_COLUMN] {
            if !header.iter().any(|h| h == required) {
                return Err(IoError::MissingColumn {
                    path: self.path.clone(),
                    column: required.to_string(),
                });
            }
        }

        let columns_with = |wanted: fn(&Role) -> bool| -> Vec<String> {
            header
                .iter()
                .zip(&roles)
                .filter(|(_, r)| wanted(r))
                .map(|(h, _)| h.to_string())
                .collect()
        };
        let metadata_names = columns_with(|r| matches!(r, Role::Metadata));
        let feature_names = columns_with(|r| matches!(r, Role::Feature));
        if feature_names.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        debug!(
            expected_cols,
            n_metadata = metadata_names.len(),
            n_features = feature_names.len(),
            "read CSV header"
        );

        let mut row_ids = Vec::new();
        let mut group_ids = Vec::new();
        let mut types = Vec::new();
        let mut metadata = Vec::new();
        let mut features = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row_id = String::new();
            let mut group_id = String::new();
            let mut row_type = None;
            let mut row_meta = Vec::with_capacity(metadata_names.len());
            let mut row_features = Vec::with_capacity(feature_names.len());

            for ((raw, role), column) in record.iter().zip(&roles).zip(header.iter()) {
                match role {
                    Role::RowId => row_id = raw.to_string(),
                    Role::GroupId => group_id = raw.to_string(),
                    Role::Type => row_type = (!raw.is_empty()).then(|| raw.to_string()),
                    Role::Metadata => row_meta.push(raw.to_string()),
                    Role::Feature => {
                        let value = raw
                            .parse::<f64>()
                            .ok()
                            .filter(|v| v.is_finite())
                            .ok_or_else(|| IoError::NonFiniteValue {
                                path: self.path.clone(),
                                row_index,
                                column: column.to_string(),
                                raw: raw.to_string(),
                            })?;
                        row_features.push(value);
                    }
                }
            }

            if let Some(&first_row) = seen.get(&row_id) {
                return Err(IoError::DuplicateRowId {
                    path: self.path.clone(),
                    row_id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(row_id.clone(), row_index);

            row_ids.push(row_id);
            group_ids.push(group_id);
            types.push(row_type);
            metadata.push(row_meta);
            features.push(row_features);
        }

        if row_ids.is_empty() {
            return Err(IoError::EmptyTable {
                path: self.path.clone(),
            });
        }

        let n_labeled = types.iter().filter(|t| t.is_some()).count();
        info!(
            n_rows = row_ids.len(),
            n_labeled,
            n_features = feature_names.len(),
            "observation table loaded"
        );

        Ok(ObservationTable::new(
            row_ids,
            group_ids,
            types,
            metadata_names,
            metadata,
            feature_names,
            features,
        ))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
