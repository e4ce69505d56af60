//! Confusion matrix and per-class completeness/purity.

use std::collections::BTreeMap;
use std::fmt;

use crate::aggregate::argmax;
use crate::classes::ClassSet;
use crate::error::ClassifyError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClassifyError::EmptyEvaluation`] | Zero labels provided |
    /// | [`ClassifyError::LengthMismatch`] | `predicted.len() != true_labels.len()` |
    /// | [`ClassifyError::Forest`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ClassifyError> {
        if true_labels.is_empty() {
            return Err(ClassifyError::EmptyEvaluation);
        }
        if predicted.len() != true_labels.len() {
            return Err(ClassifyError::LengthMismatch {
                what: "predictions",
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            let label = t.max(p);
            if label >= n_classes {
                return Err(superphot_rf::RfError::LabelOutOfRange {
                    sample_index,
                    label,
                    n_classes,
                }
                .into());
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        correct as f64 / self.total() as f64
    }

    /// Number of true members of `class` (row sum).
    #[must_use]
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Number of predictions of `class` (column sum).
    #[must_use]
    pub fn predicted_count(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;
        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Per-class scores. Undefined ratios are `NaN`.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    /// The class name.
    pub class: String,
    /// Fraction of true members predicted as this class (recall).
    pub completeness: f64,
    /// Fraction of predictions of this class that are true members (precision).
    pub purity: f64,
    /// Harmonic mean of completeness and purity; 0.0 when either is 0 or undefined.
    pub f1: f64,
    /// Number of true members.
    pub support: usize,
}

/// Summary statistics of one set of predictions.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// Unweighted mean F1 over the classes present in truth or prediction.
    pub f1_macro: f64,
    /// The confusion matrix.
    pub confusion: ConfusionMatrix,
    /// Scores for every class of the class set, in label order.
    pub per_class: Vec<ClassMetrics>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        f64::NAN
    } else {
        num as f64 / den as f64
    }
}

impl Evaluation {
    /// Score hard predictions against the truth.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::from_labels`].
    pub fn new(
        true_labels: &[usize],
        predicted: &[usize],
        classes: &ClassSet,
    ) -> Result<Self, ClassifyError> {
        let confusion = ConfusionMatrix::from_labels(true_labels, predicted, classes.len())?;

        let per_class: Vec<ClassMetrics> = classes
            .names()
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let tp = confusion.as_rows()[c][c];
                let support = confusion.support(c);
                let completeness = ratio(tp, support);
                let purity = ratio(tp, confusion.predicted_count(c));
                let (p, r) = (nan_to_zero(purity), nan_to_zero(completeness));
                let f1 = if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) };
                ClassMetrics {
                    class: name.clone(),
                    completeness,
                    purity,
                    f1,
                    support,
                }
            })
            .collect();

        let present: Vec<&ClassMetrics> = per_class
            .iter()
            .enumerate()
            .filter(|(c, m)| m.support > 0 || confusion.predicted_count(*c) > 0)
            .map(|(_, m)| m)
            .collect();
        let f1_macro = present.iter().map(|m| m.f1).sum::<f64>() / present.len() as f64;

        Ok(Self {
            accuracy: confusion.accuracy(),
            f1_macro,
            confusion,
            per_class,
        })
    }

    /// Score probability vectors, predicting the most probable class.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::from_labels`].
    pub fn from_probabilities(
        true_labels: &[usize],
        probabilities: &[Vec<f64>],
        classes: &ClassSet,
    ) -> Result<Self, ClassifyError> {
        let predicted: Vec<usize> = probabilities.iter().map(|p| argmax(p)).collect();
        Self::new(true_labels, &predicted, classes)
    }

    /// Flatten into `accuracy`, `f1_score`, `<class>_completeness` and
    /// `<class>_purity` entries.
    #[must_use]
    pub fn to_record(&self) -> BTreeMap<String, f64> {
        let mut record = BTreeMap::new();
        record.insert("accuracy".to_string(), self.accuracy);
        record.insert("f1_score".to_string(), self.f1_macro);
        for m in &self.per_class {
            record.insert(format!("{}_completeness", m.class), m.completeness);
            record.insert(format!("{}_purity", m.class), m.purity);
        }
        record
    }
}

fn nan_to_zero(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .per_class
            .iter()
            .map(|m| m.class.len())
            .max()
            .unwrap_or(0)
            .max(6);
        writeln!(f, "accuracy = {:.3}, macro F1 = {:.3}", self.accuracy, self.f1_macro)?;
        write!(f, "{:>width$}", "")?;
        for m in &self.per_class {
            write!(f, " {:>width$}", m.class)?;
        }
        writeln!(f)?;
        for (m, row) in self.per_class.iter().zip(self.confusion.as_rows()) {
            write!(f, "{:>width$}", m.class)?;
            for val in row {
                write!(f, " {val:>width$}")?;
            }
            writeln!(f)?;
        }
        write!(f, "{:>width$}", "")?;
        writeln!(f, " {:>12} {:>12} {:>8}", "completeness", "purity", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>width$} {:>12.3} {:>12.3} {:>8}",
                m.class, m.completeness, m.purity, m.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> ClassSet {
        ClassSet::new(["a", "b", "c"]).unwrap()
    }

    #[test]
    fn perfect_predictions() {
        let labels = vec![0, 0, 1, 1, 2, 2];
        let eval = Evaluation::new(&labels, &labels, &classes()).unwrap();
        assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
        assert!((eval.f1_macro - 1.0).abs() < f64::EPSILON);
        for m in &eval.per_class {
            assert!((m.completeness - 1.0).abs() < f64::EPSILON);
            assert!((m.purity - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        // True: [0,0,0, 1,1,1, 2,2,2]
        // Pred: [0,0,1, 1,1,2, 2,2,0]
        let truth = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let pred = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let eval = Evaluation::new(&truth, &pred, &classes()).unwrap();
        assert!((eval.per_class[0].purity - 2.0 / 3.0).abs() < 1e-10);
        assert!((eval.per_class[0].completeness - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(eval.per_class[0].support, 3);
        assert!((eval.accuracy - 6.0 / 9.0).abs() < 1e-10);
        assert!((eval.f1_macro - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(eval.confusion.as_rows()[2], vec![1, 0, 2]);
    }

    #[test]
    fn absent_class_is_nan_and_excluded_from_macro_f1() {
        let truth = vec![0, 0, 1, 1];
        let pred = vec![0, 1, 1, 1];
        let eval = Evaluation::new(&truth, &pred, &classes()).unwrap();
        assert!(eval.per_class[2].completeness.is_nan());
        assert!(eval.per_class[2].purity.is_nan());
        // F1(a) = 2/3, F1(b) = 0.8; class c is neither true nor predicted.
        assert!((eval.f1_macro - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-10);
    }

    #[test]
    fn never_predicted_class_has_nan_purity() {
        let eval = Evaluation::new(&[0, 1], &[0, 0], &classes()).unwrap();
        assert!(eval.per_class[1].purity.is_nan());
        assert_eq!(eval.per_class[1].completeness, 0.0);
        assert_eq!(eval.per_class[1].f1, 0.0);
    }

    #[test]
    fn from_probabilities_uses_argmax() {
        let probs = vec![vec![0.1, 0.8, 0.1], vec![0.6, 0.2, 0.2]];
        let eval = Evaluation::from_probabilities(&[1, 0], &probs, &classes()).unwrap();
        assert_eq!(eval.accuracy, 1.0);
    }

    #[test]
    fn record_keys() {
        let eval = Evaluation::new(&[0, 1], &[0, 1], &classes()).unwrap();
        let record = eval.to_record();
        assert!(record.contains_key("accuracy"));
        assert!(record.contains_key("f1_score"));
        assert!(record.contains_key("b_completeness"));
        assert!(record["c_purity"].is_nan());
    }

    #[test]
    fn empty_is_an_error() {
        let err = Evaluation::new(&[], &[], &classes()).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyEvaluation));
    }

    #[test]
    fn display_lists_classes() {
        let eval = Evaluation::new(&[0, 1], &[0, 1], &classes()).unwrap();
        let text = format!("{eval}");
        assert!(text.contains("completeness"));
        assert!(text.contains("accuracy = 1.000"));
    }

    #[test]
    fn matrix_display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }
}
