//! End-to-end integration tests: CSV -> summary/sweep/search -> JSON/CSV -> read back.

use std::fs;
use std::path::Path;

use satscan_io::{CustomerReader, ExperimentName, ResultWriter, SweepSettings};
use satscan_model::{
    DepthSearch, SweepConfig, VarianceThreshold, cumulative_distribution, rank_importances,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn summary_round_trip() {
    let dataset = CustomerReader::new(&fixture_path("train_100.csv"))
        .read_labeled()
        .expect("fixture should parse");
    assert_eq!(dataset.n_samples(), 100);
    assert_eq!(dataset.n_features(), 6);

    let summary = dataset.summary().unwrap();
    assert_eq!(summary.class_balance.counts, [80, 20]);
    assert_eq!(summary.constant_features, vec!["ind_var1".to_string()]);
    assert!(summary.id.is_some());

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("eda".into()).unwrap()).unwrap();
    let path = writer.write_summary(&summary).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "eda");
    assert_eq!(content["n_rows"], 100);
    assert_eq!(content["class_balance"]["counts"][1], 20);
    assert_eq!(content["constant_features"][0], "ind_var1");
}

#[test]
fn sweep_round_trip() {
    let dataset = CustomerReader::new(&fixture_path("train_100.csv"))
        .read_labeled()
        .unwrap();

    let selection = VarianceThreshold::default().select(dataset.columns());
    let candidates = selection.apply(dataset.feature_names());
    assert!(!candidates.contains(&"ind_var1".to_string()));

    let config = SweepConfig::new().with_seed(42);
    let result = config
        .run(dataset.columns(), dataset.labels(), dataset.feature_names(), &candidates)
        .unwrap();

    let top = &result.table.rows()[0];
    assert_eq!(top.feature, "var15");
    let cutoff = top.cutoff.expect("var15 stump must split");
    assert!((40.0..=70.0).contains(&cutoff), "cutoff {cutoff}");

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("sweep_rt".into()).unwrap()).unwrap();
    let settings = SweepSettings {
        seed: config.seed(),
        test_fraction: config.test_fraction(),
        max_depth: config.max_depth(),
        n_train: result.partition.train.len(),
        n_test: result.partition.test.len(),
    };
    writer.write_sweep(&result.table, settings).unwrap();

    let json_path = dir.path().join("sweep_rt_sweep.json");
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(content["n_test"], 25);
    assert_eq!(content["n_train"], 75);
    let rows = content["rows"].as_array().unwrap();
    assert_eq!(rows.len(), candidates.len());
    assert_eq!(rows[0]["feature"], "var15");
    for row in rows {
        for key in ["sensitivity", "specificity", "roc_auc", "cutoff"] {
            assert!(row.get(key).is_some(), "row missing {key}");
        }
    }
}

#[test]
fn train_and_submit_round_trip() {
    let train = CustomerReader::new(&fixture_path("train_100.csv"))
        .read_labeled()
        .unwrap();
    let test = CustomerReader::new(&fixture_path("test_20.csv"))
        .read_unlabeled()
        .unwrap();

    let selection = VarianceThreshold::default().select(train.columns());
    let selected = selection.apply(train.feature_names());
    let columns = train.select(&selected).unwrap();

    let search = DepthSearch::new(2, 4).unwrap().with_folds(5).with_seed(42);
    let result = search.run(&columns, train.labels()).unwrap();
    assert_eq!(result.scores.len(), 3);

    let importances = rank_importances(&result.tree.feature_importances(), &selected);
    assert_eq!(importances[0].name, "var15");
    assert_eq!(importances[0].rank, 1);

    let test_columns = test.select(&selected).unwrap();
    let predictions = result.tree.predict_columns(&test_columns).unwrap();
    assert_eq!(predictions.len(), 20);

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("final".into()).unwrap()).unwrap();
    writer.write_search(&result, &selected, &importances).unwrap();
    writer
        .write_submission("ID", test.ids(), &predictions)
        .unwrap();

    let search_json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("final_search.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(search_json["best_depth"], result.best_depth);
    assert_eq!(search_json["scores"].as_array().unwrap().len(), 3);
    assert_eq!(search_json["feature_importances"][0]["name"], "var15");

    let submission = fs::read_to_string(dir.path().join("final_submission.csv")).unwrap();
    let lines: Vec<&str> = submission.lines().collect();
    assert_eq!(lines[0], "ID,TARGET");
    assert_eq!(lines.len(), 21);
    // First test customer has var15 = 68, second has var15 = 21.
    assert_eq!(lines[1], "400,1");
    assert_eq!(lines[2], "437,0");
    for (line, id) in lines[1..].iter().zip(test.ids()) {
        assert!(line.starts_with(&format!("{},", id.as_str())));
    }
}

#[test]
fn cumulative_round_trip() {
    let dataset = CustomerReader::new(&fixture_path("train_100.csv"))
        .read_labeled()
        .unwrap();
    let values = dataset.column("var15").unwrap();
    let points = cumulative_distribution(values, dataset.labels()).unwrap();

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("cum".into()).unwrap()).unwrap();
    writer.write_cumulative("var15", &points).unwrap();

    let mut rdr = csv::Reader::from_path(dir.path().join("cum_cumulative.csv")).unwrap();
    let header = rdr.headers().unwrap().clone();
    assert_eq!(header.iter().collect::<Vec<_>>(), vec!["var15", "0", "1"]);
    let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), points.len());
    let last = records.last().unwrap();
    assert_eq!(&last[1], "1");
    assert_eq!(&last[2], "1");
    // Every negative sits below 40, so the class-0 curve is complete before any positive.
    let at_39 = points.iter().rfind(|p| p.value < 40.0).unwrap();
    assert_eq!(at_39.class_0, 1.0);
    assert_eq!(at_39.class_1, 0.0);
}

#[test]
fn schema_mismatch_is_reported() {
    let test = CustomerReader::new(&fixture_path("test_20.csv"))
        .read_unlabeled()
        .unwrap();
    let err = test.select(&["var99".to_string()]).unwrap_err();
    assert!(matches!(err, satscan_io::IoError::UnknownFeature { .. }));
}
