//! End-to-end integration tests: CSV -> train/validate/sweep -> text and JSON outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use superphot_classify::{
    CrossValidator, Evaluation, ParameterGrid, Pipeline, Sweep, aggregate_by_group,
};
use superphot_io::{
    ObservationTable, RESULTS_FILE, ResultWriter, TableReader, read_json, read_sweep_table,
    write_json, write_sweep_table,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture() -> ObservationTable {
    TableReader::new(&fixture_path("observations.csv"))
        .read()
        .expect("fixture should parse")
}

fn small_pipeline() -> Pipeline {
    let mut pipeline = Pipeline::default();
    for (name, value) in [
        ("classifier__n_estimators", json!(10)),
        ("classifier__random_state", json!(5)),
        ("sampler__sampling_strategy", json!("auto")),
        ("sampler__random_state", json!(6)),
    ] {
        pipeline.set_param(name, &value).unwrap();
    }
    pipeline
}

#[test]
fn classify_round_trip() {
    let table = read_fixture();
    assert_eq!(table.n_rows(), 30);
    assert_eq!(table.metadata_names().len(), 4);

    let classes = table.class_set().unwrap();
    assert_eq!(classes.names(), &["SLSNe", "SNII", "SNIa"]);
    let dataset = table.to_dataset(&classes).unwrap();

    let labeled = dataset.labeled_indices();
    assert_eq!(labeled.len(), 28);
    let features: Vec<Vec<f64>> = labeled.iter().map(|&i| dataset.features()[i].clone()).collect();
    let labels: Vec<usize> = labeled.iter().filter_map(|&i| dataset.labels()[i]).collect();

    let fitted = small_pipeline()
        .fit(&features, &labels, &classes, dataset.feature_names())
        .unwrap();
    let proba = fitted.predict_proba(dataset.features()).unwrap();
    let groups = aggregate_by_group(dataset.groups(), dataset.labels(), &proba).unwrap();
    assert_eq!(groups.len(), 15);

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path()).unwrap();
    let path = writer.write_classification(&table, &groups, &classes).unwrap();
    assert_eq!(path, dir.path().join(RESULTS_FILE));

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 16);
    let header: Vec<&str> = lines[0].trim_matches('|').split('|').map(str::trim).collect();
    assert_eq!(
        header,
        vec!["group_id", "type", "hostz", "flag0", "flag1", "flag2", "SLSNe", "SNII", "SNIa"]
    );

    let unlabeled: Vec<&str> = lines[15].trim_matches('|').split('|').map(str::trim).collect();
    assert_eq!(unlabeled[0], "PS1-014");
    assert_eq!(unlabeled[1], "");
    assert_eq!(unlabeled[3], "x");
    let total: f64 = unlabeled[6..].iter().map(|p| p.parse::<f64>().unwrap()).sum();
    assert!((total - 1.0).abs() < 0.01, "probabilities sum to {total}");
}

#[test]
fn validate_round_trip() {
    let table = read_fixture().labeled();
    let classes = table.class_set().unwrap();
    let dataset = table.to_dataset(&classes).unwrap();

    let cv = CrossValidator::new(classes.clone())
        .validate(&small_pipeline(), &dataset, &dataset)
        .unwrap();
    assert_eq!(cv.n_folds, 14);

    let groups = aggregate_by_group(dataset.groups(), dataset.labels(), &cv.probabilities).unwrap();
    let truth: Vec<usize> = groups.iter().filter_map(|g| g.label).collect();
    let predicted: Vec<usize> = groups.iter().map(|g| g.predicted()).collect();
    let evaluation = Evaluation::new(&truth, &predicted, &classes).unwrap();
    assert!(evaluation.accuracy > 0.8, "accuracy = {}", evaluation.accuracy);

    let dir = TempDir::new().unwrap();
    let path = ResultWriter::new(dir.path())
        .unwrap()
        .write_evaluation(&evaluation, cv.n_folds)
        .unwrap();
    let content: Value = read_json(&path).unwrap();
    assert_eq!(content["n_folds"], 14);
    assert_eq!(content["class_metrics"].as_array().unwrap().len(), 3);
}

#[test]
fn validation_folds_only_labeled_groups() {
    let table = read_fixture();
    let n_labeled_groups = {
        let labeled = table.labeled();
        let mut groups = labeled.group_ids().to_vec();
        groups.sort();
        groups.dedup();
        groups.len()
    };
    assert_eq!(n_labeled_groups, 14);

    let (classes, train, test) = table.validation_datasets(None).unwrap();
    assert_eq!(test.len(), table.n_rows() - 2);
    assert!(!test.groups().iter().any(|g| g == "PS1-014"));

    let cv = CrossValidator::new(classes)
        .validate(&small_pipeline(), &train, &test)
        .unwrap();
    assert_eq!(cv.n_folds, n_labeled_groups);
    assert_eq!(cv.probabilities.len(), test.len());
}

#[test]
fn sweep_round_trip() {
    let table = read_fixture();
    let train = table.labeled();
    let classes = train.class_set().unwrap();
    let train_ds = train.to_dataset(&classes).unwrap();
    let test_ds = table.to_dataset(&classes).unwrap();

    let dir = TempDir::new().unwrap();
    let pipeline_path = dir.path().join("pipeline.json");
    write_json(&pipeline_path, &small_pipeline()).unwrap();
    let pipeline: Pipeline = read_json(&pipeline_path).unwrap();
    assert_eq!(pipeline, small_pipeline());

    let grid_path = dir.path().join("grid.json");
    write_json(&grid_path, &json!({"classifier__max_depth": [2, null], "sampler": ["mvg", "smote"]})).unwrap();
    let grid = ParameterGrid::from_json(&read_json::<Value>(&grid_path).unwrap()).unwrap();

    let records = Sweep::new(pipeline, classes)
        .with_artifact_dir(dir.path().join("artifacts"))
        .with_n_jobs(Some(2))
        .run(&grid.combinations(), &train_ds, &test_ds)
        .unwrap();
    assert_eq!(records.len(), 4);
    assert!(dir.path().join("artifacts").join("null_smote.json").exists());

    let table_path = dir.path().join("hyperparameters.txt");
    assert_eq!(write_sweep_table(&table_path, &records, true).unwrap(), 4);
    assert_eq!(write_sweep_table(&table_path, &records, true).unwrap(), 8);

    let reread = read_sweep_table(&table_path).unwrap();
    assert_eq!(reread.len(), 8);
    assert_eq!(reread[1]["sampler"], json!("smote"));
    assert_eq!(reread[0]["classifier__max_depth"], json!(2));
    assert!(reread.iter().all(|r| r.contains_key("accuracy")));
}
