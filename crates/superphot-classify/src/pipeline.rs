//! Scale, oversample, then fit a forest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use superphot_resample::{Oversampler, Sampler};
use superphot_rf::{RandomForest, RandomForestConfig};
use tracing::{debug, instrument};

use crate::classes::ClassSet;
use crate::error::ClassifyError;
use crate::scaler::StandardScaler;

/// The trainable classification pipeline.
///
/// Serialized as JSON with the fields `scale`, `sampler` and `classifier`.
///
/// # Defaults
///
/// | Field        | Default                                        |
/// |--------------|------------------------------------------------|
/// | `scale`      | `true`                                         |
/// | `sampler`    | `mvg` with 1000 samples per class              |
/// | `classifier` | [`RandomForestConfig::default`]                |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    scale: bool,
    sampler: Sampler,
    classifier: RandomForestConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            scale: true,
            sampler: Sampler::default(),
            classifier: RandomForestConfig::default(),
        }
    }
}

impl Pipeline {
    /// Create a pipeline from a sampler and a forest configuration, with scaling on.
    #[must_use]
    pub fn new(sampler: Sampler, classifier: RandomForestConfig) -> Self {
        Self {
            scale: true,
            sampler,
            classifier,
        }
    }

    /// Enable or disable the standardization stage.
    #[must_use]
    pub fn with_scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Replace the sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Replace the forest configuration.
    #[must_use]
    pub fn with_classifier(mut self, classifier: RandomForestConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Return whether features are standardized before oversampling.
    #[must_use]
    pub fn scale(&self) -> bool {
        self.scale
    }

    /// Return the sampler.
    #[must_use]
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Return the forest configuration.
    #[must_use]
    pub fn classifier(&self) -> &RandomForestConfig {
        &self.classifier
    }

    /// Copy of this pipeline with the forest seed and any sampler seed
    /// advanced by `offset`.
    #[must_use]
    pub fn reseeded(&self, offset: u64) -> Self {
        let classifier = self
            .classifier
            .clone()
            .with_seed(self.classifier.seed().wrapping_add(offset));
        let sampler_seed = self.sampler.seed().map(|s| s.wrapping_add(offset));
        Self {
            scale: self.scale,
            sampler: self.sampler.clone().with_seed(sampler_seed),
            classifier,
        }
    }

    /// Set one parameter by name, as found in a parameter grid.
    ///
    /// Names are `scale`, `sampler`, `sampler__<field>` or
    /// `classifier__<field>`. The scikit-learn spellings `n_estimators` and
    /// `random_state` are accepted for `n_trees` and `seed`. Numeric
    /// shorthands are normalized: `max_features` accepts an integer count, a
    /// float fraction or `null`, `class_weight` accepts `null`, and
    /// `sampling_strategy` accepts an integer per-class count, a float ratio
    /// or `"auto"`.
    ///
    /// # Errors
    ///
    /// | Variant                                  | When                                   |
    /// |------------------------------------------|----------------------------------------|
    /// | [`ClassifyError::UnknownParameter`]      | the name does not address a field      |
    /// | [`ClassifyError::InvalidParameterValue`] | the value has the wrong type or range  |
    pub fn set_param(&mut self, name: &str, value: &Value) -> Result<(), ClassifyError> {
        let invalid = |reason: String| ClassifyError::InvalidParameterValue {
            name: name.to_string(),
            value: value.to_string(),
            reason,
        };

        if name == "scale" {
            self.scale = value
                .as_bool()
                .ok_or_else(|| invalid("expected a boolean".into()))?;
            return Ok(());
        }
        if name == "sampler" {
            let kind = value
                .as_str()
                .ok_or_else(|| invalid("expected a sampler name".into()))?;
            let seed = self.sampler.seed();
            self.sampler = kind
                .parse::<Sampler>()
                .map_err(|e| invalid(e.to_string()))?
                .with_seed(seed);
            return Ok(());
        }

        if let Some(field) = name.strip_prefix("classifier__") {
            let field = match field {
                "n_estimators" => "n_trees",
                "random_state" => "seed",
                other => other,
            };
            let value = normalize_classifier_value(field, value);
            let mut object = to_object(&self.classifier)?;
            replace_field(&mut object, name, field, value)?;
            let updated: RandomForestConfig = serde_json::from_value(Value::Object(object))
                .map_err(|e| invalid(e.to_string()))?;
            updated.validate().map_err(|e| invalid(e.to_string()))?;
            self.classifier = updated;
            return Ok(());
        }

        if let Some(field) = name.strip_prefix("sampler__") {
            let field = match field {
                "random_state" => "seed",
                "sampling_strategy" => "strategy",
                other => other,
            };
            let value = normalize_sampler_value(field, value);
            let mut object = to_object(&self.sampler)?;
            replace_field(&mut object, name, field, value)?;
            let updated: Sampler = serde_json::from_value(Value::Object(object))
                .map_err(|e| invalid(e.to_string()))?;
            let strategy = updated.strategy();
            self.sampler = updated
                .with_strategy(strategy)
                .map_err(|e| invalid(e.to_string()))?;
            return Ok(());
        }

        Err(ClassifyError::UnknownParameter {
            name: name.to_string(),
        })
    }

    /// Fit the pipeline on labeled rows.
    ///
    /// Standardization and oversampling see only these rows.
    ///
    /// # Errors
    ///
    /// | Variant                       | When                                          |
    /// |-------------------------------|-----------------------------------------------|
    /// | [`ClassifyError::NoLabeledRows`] | `features` is empty                        |
    /// | [`ClassifyError::RowWidth`]   | rows have ragged widths and scaling is on     |
    /// | [`ClassifyError::Resample`]   | oversampling rejects the data or strategy     |
    /// | [`ClassifyError::Forest`]     | the forest rejects the data, e.g. a class without rows |
    #[instrument(skip_all, fields(n_samples = features.len(), sampler = %self.sampler))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        classes: &ClassSet,
        feature_names: &[String],
    ) -> Result<FittedPipeline, ClassifyError> {
        let scaler = if self.scale {
            Some(StandardScaler::fit(features)?)
        } else {
            None
        };
        let scaled;
        let training = match &scaler {
            Some(scaler) => {
                scaled = scaler.transform(features)?;
                scaled.as_slice()
            }
            None => features,
        };

        let resampled = self.sampler.fit_resample(training, labels, classes.len())?;
        debug!(
            n_synthetic = resampled.total_synthetic(),
            n_rows = resampled.features.len(),
            "training set oversampled"
        );

        let forest = self
            .classifier
            .fit(
                &resampled.features,
                &resampled.labels,
                classes.len(),
                feature_names,
            )?;

        Ok(FittedPipeline {
            scaler,
            forest,
            classes: classes.clone(),
            n_synthetic: resampled.n_synthetic,
        })
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, ClassifyError> {
    match serde_json::to_value(value)? {
        Value::Object(object) => Ok(object),
        _ => Ok(Map::new()),
    }
}

fn replace_field(
    object: &mut Map<String, Value>,
    name: &str,
    field: &str,
    value: Value,
) -> Result<(), ClassifyError> {
    match object.get_mut(field) {
        Some(slot) if field != "kind" => {
            *slot = value;
            Ok(())
        }
        _ => Err(ClassifyError::UnknownParameter {
            name: name.to_string(),
        }),
    }
}

fn normalize_classifier_value(field: &str, value: &Value) -> Value {
    match (field, value) {
        ("max_features", Value::Null) => Value::from("all"),
        ("max_features", Value::Number(n)) if n.is_u64() => serde_json::json!({ "fixed": n }),
        ("max_features", Value::Number(n)) => serde_json::json!({ "fraction": n }),
        ("class_weight", Value::Null) => Value::from("uniform"),
        _ => value.clone(),
    }
}

fn normalize_sampler_value(field: &str, value: &Value) -> Value {
    match (field, value) {
        ("strategy", Value::Number(n)) if n.is_u64() => {
            serde_json::json!({ "samples_per_class": n })
        }
        ("strategy", Value::Number(n)) => serde_json::json!({ "ratio": n }),
        ("strategy", Value::String(s)) if s == "auto" || s == "not majority" => {
            Value::from("not_majority")
        }
        _ => value.clone(),
    }
}

/// A trained pipeline: the fitted scaler (if any) and forest.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    scaler: Option<StandardScaler>,
    forest: RandomForest,
    classes: ClassSet,
    n_synthetic: Vec<usize>,
}

impl FittedPipeline {
    /// Per-class probabilities for every row, in class-set order.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::RowWidth`] when a row is not as wide as the
    /// training rows and scaling is on, [`ClassifyError::Forest`] when scaling is off.
    pub fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ClassifyError> {
        let scaled;
        let input = match &self.scaler {
            Some(scaler) => {
                scaled = scaler.transform(features)?;
                scaled.as_slice()
            }
            None => features,
        };
        Ok(self.forest.predict_proba_batch(input)?)
    }

    /// Most probable class for every row.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::RowWidth`] when a row is not as wide as the
    /// training rows and scaling is on, [`ClassifyError::Forest`] when scaling is off.
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, ClassifyError> {
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(|p| crate::aggregate::argmax(p))
            .collect())
    }

    /// Return the class set the pipeline was trained with.
    #[must_use]
    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Return the number of synthetic rows added per class during training.
    #[must_use]
    pub fn n_synthetic(&self) -> &[usize] {
        &self.n_synthetic
    }

    /// Return the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use superphot_resample::SamplingStrategy;
    use superphot_rf::{ClassWeight, MaxFeatures};

    use super::*;

    #[test]
    fn classifier_params_by_name() {
        let mut p = Pipeline::default();
        p.set_param("classifier__n_estimators", &json!(25)).unwrap();
        p.set_param("classifier__max_depth", &json!(7)).unwrap();
        p.set_param("classifier__max_features", &json!("sqrt")).unwrap();
        p.set_param("classifier__class_weight", &json!(null)).unwrap();
        assert_eq!(p.classifier().n_trees(), 25);
        assert_eq!(p.classifier().max_depth(), Some(7));
        assert_eq!(p.classifier().max_features(), MaxFeatures::Sqrt);
        assert_eq!(p.classifier().class_weight(), ClassWeight::Uniform);

        p.set_param("classifier__max_features", &json!(0.5)).unwrap();
        assert_eq!(p.classifier().max_features(), MaxFeatures::Fraction(0.5));
        p.set_param("classifier__max_features", &json!(3)).unwrap();
        assert_eq!(p.classifier().max_features(), MaxFeatures::Fixed(3));
    }

    #[test]
    fn sampler_params_by_name() {
        let mut p = Pipeline::default();
        p.set_param("sampler__sampling_strategy", &json!(200)).unwrap();
        assert_eq!(p.sampler().strategy(), SamplingStrategy::SamplesPerClass(200));
        p.set_param("sampler", &json!("smote")).unwrap();
        p.set_param("sampler__k_neighbors", &json!(2)).unwrap();
        p.set_param("sampler__sampling_strategy", &json!(0.5)).unwrap();
        assert_eq!(p.sampler().name(), "smote");
        assert_eq!(p.sampler().strategy(), SamplingStrategy::Ratio(0.5));
    }

    #[test]
    fn unknown_and_invalid_params_rejected() {
        let mut p = Pipeline::default();
        assert!(matches!(
            p.set_param("classifier__learning_rate", &json!(0.1)),
            Err(ClassifyError::UnknownParameter { .. })
        ));
        assert!(matches!(
            p.set_param("sampler__k_neighbors", &json!(3)),
            Err(ClassifyError::UnknownParameter { .. })
        ));
        assert!(matches!(
            p.set_param("classifier__n_trees", &json!("many")),
            Err(ClassifyError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            p.set_param("classifier__n_trees", &json!(0)),
            Err(ClassifyError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            p.set_param("sampler", &json!("adasyn")),
            Err(ClassifyError::InvalidParameterValue { .. })
        ));
        assert!(matches!(
            p.set_param("bogus", &json!(1)),
            Err(ClassifyError::UnknownParameter { .. })
        ));
        // A rejected value leaves the pipeline untouched.
        assert_eq!(p, Pipeline::default());
    }

    #[test]
    fn reseeded_offsets_both_seeds() {
        let p = Pipeline::default().with_sampler(Sampler::default().with_seed(Some(10)));
        let q = p.reseeded(3);
        assert_eq!(q.classifier().seed(), 45);
        assert_eq!(q.sampler().seed(), Some(13));
    }

    #[test]
    fn json_round_trip() {
        let p = Pipeline::default().with_scale(false);
        let text = serde_json::to_string(&p).unwrap();
        let back: Pipeline = serde_json::from_str(&text).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn fit_and_predict_separable_blobs() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![5.0, 5.0],
            vec![5.0, 6.0],
        ];
        let labels = vec![0, 0, 1, 1];
        let classes = ClassSet::new(["a", "b"]).unwrap();
        let pipeline = Pipeline::default()
            .with_sampler(
                Sampler::default()
                    .with_strategy(SamplingStrategy::SamplesPerClass(3))
                    .unwrap()
                    .with_seed(Some(1)),
            )
            .with_classifier(RandomForestConfig::new(20).unwrap());
        let names = vec!["x".to_string(), "y".to_string()];
        let fitted = pipeline.fit(&features, &labels, &classes, &names).unwrap();
        assert_eq!(fitted.n_synthetic(), &[1, 1]);
        assert_eq!(fitted.predict(&features).unwrap(), labels);
        for p in fitted.predict_proba(&features).unwrap() {
            assert_eq!(p.len(), 2);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn predicting_rows_of_another_width_fails() {
        let features = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![5.0, 5.0], vec![5.0, 6.0]];
        let labels = vec![0, 0, 1, 1];
        let classes = ClassSet::new(["a", "b"]).unwrap();
        let names = vec!["x".to_string(), "y".to_string()];
        let wide = [vec![5.0, 5.0, 999.0]];

        let scaled = Pipeline::default()
            .with_classifier(RandomForestConfig::new(5).unwrap())
            .fit(&features, &labels, &classes, &names)
            .unwrap();
        assert!(matches!(
            scaled.predict_proba(&wide),
            Err(ClassifyError::RowWidth {
                row: 0,
                expected: 2,
                got: 3
            })
        ));
        assert!(scaled.predict(&wide).is_err());

        let unscaled = Pipeline::default()
            .with_scale(false)
            .with_classifier(RandomForestConfig::new(5).unwrap())
            .fit(&features, &labels, &classes, &names)
            .unwrap();
        assert!(matches!(
            unscaled.predict_proba(&wide),
            Err(ClassifyError::Forest(_))
        ));
    }
}
