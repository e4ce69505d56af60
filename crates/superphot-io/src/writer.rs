//! Result writer for classification outputs, and JSON load/save helpers for
//! pipelines and parameter grids.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use superphot_classify::{ClassSet, Evaluation, GroupPrediction};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ObservationTable;
use crate::reader::{GROUP_ID_COLUMN, TYPE_COLUMN};
use crate::table::format_bordered;

/// File name of the per-group classification table.
pub const RESULTS_FILE: &str = "results.txt";
/// File name of the validation summary.
pub const VALIDATION_FILE: &str = "validation.json";

/// Writes classification and validation results into an output directory.
///
/// Creates the output directory on construction if it does not exist.
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write per-group mean class probabilities to `results.txt`.
    ///
    /// One row per group with its id, type, the metadata of its first row and
    /// one `%.3f` column per class. Unlabeled groups get an empty type.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n_groups = groups.len()))]
    pub fn write_classification(
        &self,
        table: &ObservationTable,
        groups: &[GroupPrediction],
        classes: &ClassSet,
    ) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(RESULTS_FILE);

        let header: Vec<String> = [GROUP_ID_COLUMN, TYPE_COLUMN]
            .into_iter()
            .map(String::from)
            .chain(table.metadata_names().iter().cloned())
            .chain(classes.names().iter().cloned())
            .collect();

        let rows: Vec<Vec<String>> = groups
            .iter()
            .map(|g| {
                let type_name = g
                    .label
                    .and_then(|l| classes.name(l))
                    .unwrap_or_default()
                    .to_string();
                [g.group.clone(), type_name]
                    .into_iter()
                    .chain(table.metadata()[g.first_row].iter().cloned())
                    .chain(g.probabilities.iter().map(|p| format!("{p:.3}")))
                    .collect()
            })
            .collect();

        fs::write(&path, format_bordered(&header, &rows)).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "classification results written");
        Ok(path)
    }

    /// Write a validation summary to `validation.json`.
    ///
    /// Undefined completeness or purity is written as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_evaluation(&self, evaluation: &Evaluation, n_folds: usize) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(VALIDATION_FILE);

        let class_metrics: Vec<ClassEntry<'_>> = evaluation
            .per_class
            .iter()
            .map(|m| ClassEntry {
                class: &m.class,
                completeness: defined(m.completeness),
                purity: defined(m.purity),
                f1: m.f1,
                support: m.support,
            })
            .collect();

        let artifact = EvaluateArtifact {
            n_folds,
            accuracy: evaluation.accuracy,
            f1_score: evaluation.f1_macro,
            confusion_matrix: evaluation.confusion.as_rows(),
            class_metrics,
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), "validation results written");
        Ok(path)
    }
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Deserialize a JSON file, e.g. a pipeline or a parameter grid.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::Json`] | Content is not valid JSON for `T` |
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoError> {
    let text = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Serialize `value` as pretty-printed JSON into `path`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::Json`] | `value` cannot be represented as JSON |
/// | [`IoError::WriteFile`] | File cannot be written |
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    n_folds: usize,
    accuracy: f64,
    f1_score: f64,
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassEntry<'a>>,
}

#[derive(Serialize)]
struct ClassEntry<'a> {
    class: &'a str,
    completeness: Option<f64>,
    purity: Option<f64>,
    f1: f64,
    support: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn evaluation_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path()).unwrap();
        let classes = ClassSet::new(["SNII", "SNIa", "SNIbc"]).unwrap();
        let evaluation = Evaluation::new(&[0, 1, 1], &[0, 1, 0], &classes).unwrap();

        let path = writer.write_evaluation(&evaluation, 3).unwrap();
        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(content["n_folds"], 3);
        assert!(content["accuracy"].is_number());
        assert_eq!(content["confusion_matrix"].as_array().unwrap().len(), 3);
        let metrics = content["class_metrics"].as_array().unwrap();
        assert_eq!(metrics[2]["class"], "SNIbc");
        assert!(metrics[2]["completeness"].is_null());
        assert!(metrics[2]["purity"].is_null());
        assert_eq!(metrics[1]["support"], 2);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        ResultWriter::new(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn json_round_trip_of_parameter_grid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.json");
        let grid = serde_json::json!({"classifier__n_estimators": [10, 50]});
        write_json(&path, &grid).unwrap();
        let back: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn invalid_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, IoError::Json { .. }));
    }
}
