//! Forest training: input checks, class weights, bootstrap draws and
//! tree growth on a configurable thread pool.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{ClassWeight, RandomForestConfig};
use crate::error::RfError;
use crate::split::SplitContext;
use crate::tree::{DecisionTree, TreeGrower};

/// What the forest was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Training rows given to `fit`.
    pub n_samples: usize,
    /// Class counts of the training rows, indexed by class.
    pub class_counts: Vec<usize>,
    /// Weight applied to every row of a class while growing trees.
    pub class_weights: Vec<f64>,
    /// Candidate features per split after resolving `max_features`.
    pub max_features: usize,
    /// Bootstrap draws per tree.
    pub draws_per_tree: usize,
}

/// A fitted random forest classifier.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) summary: TrainingSummary,
}

/// Validate a row-major matrix against its labels; returns the row width.
pub(crate) fn validate_matrix(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    let n_features = features.first().ok_or(RfError::EmptyDataset)?.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Count rows per class, rejecting labels outside `0..n_classes`.
pub(crate) fn count_classes(labels: &[usize], n_classes: usize) -> Result<Vec<usize>, RfError> {
    let mut counts = vec![0usize; n_classes];
    for (sample_index, &label) in labels.iter().enumerate() {
        let slot = counts.get_mut(label).ok_or(RfError::LabelOutOfRange {
            sample_index,
            label,
            n_classes,
        })?;
        *slot += 1;
    }
    Ok(counts)
}

/// `columns[feature][sample]` from row-major input.
pub(crate) fn to_column_major(features: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    (0..n_features)
        .map(|feature| features.iter().map(|row| row[feature]).collect())
        .collect()
}

pub(crate) fn class_weights(policy: ClassWeight, class_counts: &[usize]) -> Vec<f64> {
    match policy {
        ClassWeight::Uniform => vec![1.0; class_counts.len()],
        ClassWeight::Balanced => {
            let total = class_counts.iter().sum::<usize>() as f64;
            let n_classes = class_counts.len() as f64;
            class_counts
                .iter()
                .map(|&count| total / (n_classes * count as f64))
                .collect()
        }
    }
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    feature_names: &[String],
) -> Result<RandomForest, RfError> {
    config.validate()?;
    let n_features = validate_matrix(features, labels)?;
    let class_counts = count_classes(labels, n_classes)?;
    if let Some(class) = class_counts.iter().position(|&c| c == 0) {
        return Err(RfError::MissingClass { class });
    }

    let n_samples = features.len();
    let summary = TrainingSummary {
        n_samples,
        class_weights: class_weights(config.class_weight, &class_counts),
        class_counts,
        max_features: config.max_features.resolve(n_features)?,
        draws_per_tree: (n_samples as f64 * config.bootstrap_fraction).ceil() as usize,
    };

    info!(
        n_features,
        n_classes,
        max_features = summary.max_features,
        n_jobs = ?config.n_jobs,
        "training random forest"
    );

    let columns = to_column_major(features, n_features);

    // Seeds are drawn up front so the forest does not depend on thread scheduling.
    let mut seeder = ChaCha8Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.n_trees).map(|_| seeder.r#gen()).collect();

    let grow_one = |seed: u64| -> DecisionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let draws: Vec<usize> = (0..summary.draws_per_tree)
            .map(|_| rng.gen_range(0..n_samples))
            .collect();
        let ctx = SplitContext {
            features: &columns,
            labels,
            class_weights: &summary.class_weights,
            criterion: config.criterion,
            max_features: summary.max_features,
            min_samples_leaf: config.min_samples_leaf,
        };
        TreeGrower::new(ctx, config.max_depth, config.min_samples_split, rng).grow(&draws)
    };

    let trees: Vec<DecisionTree> = match config.n_jobs {
        Some(1) => seeds.into_iter().map(grow_one).collect(),
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|source| RfError::ThreadPool { source })?
            .install(|| seeds.into_par_iter().map(grow_one).collect()),
        None => seeds.into_par_iter().map(grow_one).collect(),
    };

    debug!(
        n_nodes = trees.iter().map(|t| t.nodes().len()).sum::<usize>(),
        "trees grown"
    );

    Ok(RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
        summary,
    })
}
