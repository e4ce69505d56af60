//! Hyperparameter sweep over leave-one-group-out validation.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde_json::{Map, Value};
use tracing::{error, info, instrument};

use crate::aggregate::aggregate_by_group;
use crate::classes::ClassSet;
use crate::cv::CrossValidator;
use crate::dataset::Dataset;
use crate::error::ClassifyError;
use crate::metrics::Evaluation;
use crate::params::ParamSet;
use crate::pipeline::Pipeline;

/// Parameters and metrics of one evaluated combination.
///
/// Holds only the parameters when the combination failed.
pub type SweepRecord = Map<String, Value>;

/// Evaluates parameter combinations of a pipeline, optionally in parallel.
///
/// Each combination clones the base pipeline, forces single-threaded forest
/// training, applies its parameters, then runs cross-validation and scores
/// the per-group aggregated predictions.
#[derive(Debug, Clone)]
pub struct Sweep {
    pipeline: Pipeline,
    classes: ClassSet,
    n_jobs: Option<usize>,
    artifact_dir: Option<PathBuf>,
}

impl Sweep {
    /// Create a sequential sweep without per-combination artifacts.
    #[must_use]
    pub fn new(pipeline: Pipeline, classes: ClassSet) -> Self {
        Self {
            pipeline,
            classes,
            n_jobs: None,
            artifact_dir: None,
        }
    }

    /// Set the worker count. `None` runs in the calling thread.
    #[must_use]
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Write one JSON file per combination into `dir`.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Evaluate every parameter set and return one record per set, in order.
    ///
    /// Failures of individual combinations are logged and yield a record
    /// with only the parameters; they never abort the sweep.
    ///
    /// # Errors
    ///
    /// | Variant                         | When                                       |
    /// |---------------------------------|--------------------------------------------|
    /// | [`ClassifyError::ThreadPool`]   | the worker pool cannot be built            |
    /// | [`ClassifyError::Artifact`]     | the artifact directory cannot be created   |
    #[instrument(skip_all, fields(n_sets = param_sets.len(), n_jobs = ?self.n_jobs))]
    pub fn run(
        &self,
        param_sets: &[ParamSet],
        train: &Dataset,
        validation: &Dataset,
    ) -> Result<Vec<SweepRecord>, ClassifyError> {
        if let Some(dir) = &self.artifact_dir {
            fs::create_dir_all(dir).map_err(|source| ClassifyError::Artifact {
                path: dir.clone(),
                source,
            })?;
        }

        let evaluate = |params: &ParamSet| self.evaluate_one(params, train, validation);
        let records: Vec<SweepRecord> = match self.n_jobs {
            None => param_sets.iter().map(evaluate).collect(),
            Some(n_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .build()
                    .map_err(|source| ClassifyError::ThreadPool { source })?;
                pool.install(|| param_sets.par_iter().map(evaluate).collect())
            }
        };

        info!(n_records = records.len(), "sweep complete");
        Ok(records)
    }

    fn evaluate_one(&self, params: &ParamSet, train: &Dataset, validation: &Dataset) -> SweepRecord {
        let mut record: SweepRecord = params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        match self.score(params, train, validation) {
            Ok(evaluation) => {
                for (key, value) in evaluation.to_record() {
                    // NaN has no JSON form; undefined metrics become null.
                    let value = serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number);
                    record.insert(key, value);
                }
            }
            Err(e) => {
                let params = Value::Object(record.clone());
                error!(%params, error = %e, "problem testing parameter set");
            }
        }

        if let Some(dir) = &self.artifact_dir {
            let path = dir.join(artifact_name(params));
            if let Err(e) = write_artifact(&path, &record) {
                error!(path = %path.display(), error = %e, "failed to write sweep artifact");
            }
        }
        record
    }

    fn score(
        &self,
        params: &ParamSet,
        train: &Dataset,
        validation: &Dataset,
    ) -> Result<Evaluation, ClassifyError> {
        let mut pipeline = self.pipeline.clone();
        pipeline.set_param("classifier__n_jobs", &Value::from(1))?;
        for (name, value) in params {
            pipeline.set_param(name, value)?;
        }

        let cv = CrossValidator::new(self.classes.clone()).validate(&pipeline, train, validation)?;
        let groups = aggregate_by_group(validation.groups(), validation.labels(), &cv.probabilities)?;

        let (truth, probabilities): (Vec<usize>, Vec<Vec<f64>>) = groups
            .into_iter()
            .filter_map(|g| g.label.map(|label| (label, g.probabilities)))
            .unzip();
        Evaluation::from_probabilities(&truth, &probabilities, &self.classes)
    }
}

/// File name for a combination: its values joined by `_` in key order.
#[must_use]
pub fn artifact_name(params: &ParamSet) -> String {
    let stem: Vec<String> = params
        .values()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let stem = stem.join("_").replace(['/', '\\'], "-");
    format!("{stem}.json")
}

fn write_artifact(path: &Path, record: &SweepRecord) -> Result<(), ClassifyError> {
    let text = serde_json::to_string_pretty(record)?;
    fs::write(path, text).map_err(|source| ClassifyError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn artifact_name_joins_sorted_values() {
        let mut params = ParamSet::new();
        params.insert("sampler".into(), json!("mvg"));
        params.insert("classifier__max_depth".into(), json!(null));
        params.insert("classifier__n_estimators".into(), json!(50));
        assert_eq!(artifact_name(&params), "null_50_mvg.json");
    }

    #[test]
    fn artifact_name_strips_path_separators() {
        let mut params = ParamSet::new();
        params.insert("x".into(), json!("a/b"));
        assert_eq!(artifact_name(&params), "a-b.json");
    }
}
