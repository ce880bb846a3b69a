//! Integration tests for the batch driver over run folders on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tl_app::{
    BatchConfig, BatchProgressEvent, BatchStage, ErrorKind, run_batch, run_batch_with_progress,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after epoch")
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

/// Constant-force run over `t = 0..=25`: drawbar `f_x / f_z`.
fn write_run(root: &Path, name: &str, params: &str, f_x: f64, f_z: f64) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("params.json"), params).unwrap();
    let mut csv = String::from("t, f_x, f_y, f_z\n");
    for t in 0..=25 {
        csv.push_str(&format!("{t}, {f_x}, 0.0, {f_z}\n"));
    }
    fs::write(dir.join("output.csv"), csv).unwrap();
}

fn mixed_root() -> PathBuf {
    let root = unique_temp_dir("tl_batch_mixed");
    write_run(&root, "run_1", r#"{"slip": 30}"#, 3.0, 10.0);
    write_run(&root, "run_2", r#"{"slip": 10}"#, 1.0, 10.0);
    // no params.json
    let missing = root.join("run_3");
    fs::create_dir_all(&missing).unwrap();
    fs::write(missing.join("output.csv"), "t,f_x,f_y,f_z\n0,1,0,1\n").unwrap();
    write_run(&root, "run_4", r#"{"slip": 20}"#, 2.0, 10.0);
    // no output.csv
    let params_only = root.join("run_5");
    fs::create_dir_all(&params_only).unwrap();
    fs::write(params_only.join("params.json"), r#"{"slip": 40}"#).unwrap();
    root
}

#[test]
fn invalid_runs_are_skipped_not_fatal() {
    let root = mixed_root();
    let report = run_batch(&BatchConfig::for_root(&root)).unwrap();

    assert_eq!(report.run_count(), 5);
    let rows = report.rows();
    assert_eq!(rows.len(), 3);
    let slips: Vec<f64> = rows.iter().map(|r| r.order_key).collect();
    assert_eq!(slips, vec![30.0, 10.0, 20.0], "rows keep discovery order");

    let skipped = report.skipped();
    assert_eq!(skipped.len(), 2);
    assert_eq!(skipped[0].run_id, "run_3");
    assert_eq!(skipped[0].kind, ErrorKind::MissingArtifact);
    assert!(skipped[0].message.contains("params.json"), "{}", skipped[0].message);
    assert_eq!(skipped[1].run_id, "run_5");
    assert_eq!(skipped[1].kind, ErrorKind::MissingArtifact);
    assert!(skipped[1].message.contains("output.csv"), "{}", skipped[1].message);

    let grouped = report.grouped();
    assert_eq!(grouped.group_keys(), vec![1.0]);
    let ordered: Vec<f64> = grouped.group(1.0).unwrap().iter().map(|p| p.0).collect();
    assert_eq!(ordered, vec![10.0, 20.0, 30.0]);
}

#[test]
fn window_past_the_data_skips_every_run() {
    let root = mixed_root();
    let config = BatchConfig {
        window: tl_core::WindowSpec::new(100.0, 200.0),
        ..BatchConfig::for_root(&root)
    };
    let report = run_batch(&config).unwrap();
    assert!(report.rows().is_empty());
    assert!(report.grouped().is_empty());
    assert_eq!(
        report
            .skipped()
            .iter()
            .filter(|s| s.kind == ErrorKind::WindowOutOfRange)
            .count(),
        3
    );
}

#[test]
fn zero_normal_force_skips_only_that_run() {
    let root = unique_temp_dir("tl_batch_degenerate");
    write_run(&root, "run_1", r#"{"slip": 10}"#, 1.0, 10.0);
    write_run(&root, "run_2", r#"{"slip": 40}"#, 1.0, 0.0);

    let report = run_batch(&BatchConfig::for_root(&root)).unwrap();
    assert_eq!(report.rows().len(), 1);
    let skipped = report.skipped();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].run_id, "run_2");
    assert_eq!(skipped[0].kind, ErrorKind::DegenerateWindow);
}

#[test]
fn non_finite_order_key_is_skipped_and_not_persisted() {
    let root = unique_temp_dir("tl_batch_nan_key");
    write_run(&root, "a", r#"{"slip": "nan"}"#, 1.0, 2.0);
    write_run(&root, "b", r#"{"slip": 10}"#, 1.0, 2.0);
    write_run(&root, "c", r#"{"slip": "inf"}"#, 1.0, 2.0);
    let out_dir = root.join("out");

    let config = BatchConfig {
        window: tl_core::WindowSpec::full(),
        persist: true,
        output_dir: out_dir,
        ..BatchConfig::for_root(&root)
    };
    let report = run_batch(&config).unwrap();
    let kinds: Vec<ErrorKind> = report.skipped().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![ErrorKind::MalformedMetadata, ErrorKind::MalformedMetadata]
    );

    let path = report.output_path.clone().expect("table should be written");
    let table = tl_results::read_table(&path).unwrap();
    assert_eq!(table.rows, vec![vec![10.0, 0.5]]);
}

#[test]
fn parallel_mode_matches_sequential() {
    let root = mixed_root();
    let sequential = run_batch(&BatchConfig::for_root(&root)).unwrap();
    let parallel = run_batch(&BatchConfig {
        parallel: true,
        ..BatchConfig::for_root(&root)
    })
    .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn grouped_batch_persists_triples() {
    let root = unique_temp_dir("tl_batch_grouped");
    write_run(&root, "a", r#"{"slip": 20, "scale": 2}"#, 2.0, 10.0);
    write_run(&root, "b", r#"{"slip": 10, "scale": 1}"#, 1.0, 10.0);
    write_run(&root, "c", r#"{"slip": 5, "scale": 2}"#, 5.0, 10.0);
    let out_dir = root.join("SimulatedData");

    let config = BatchConfig {
        group_parameter: Some("scale".into()),
        persist: true,
        output_dir: out_dir.clone(),
        ..BatchConfig::for_root(&root)
    };
    let report = run_batch(&config).unwrap();
    let path = report.output_path.clone().expect("table should be written");
    assert_eq!(path, out_dir.join("slip_drawbar.txt"));

    let table = tl_results::read_table(&path).unwrap();
    assert_eq!(table.labels, vec!["Scale", "Slip", "Drawbar"]);
    assert_eq!(
        table.rows,
        vec![
            vec![1.0, 10.0, 0.1],
            vec![2.0, 5.0, 0.5],
            vec![2.0, 20.0, 0.2],
        ]
    );
}

#[test]
fn progress_events_cover_every_run() {
    let root = mixed_root();
    let mut events: Vec<BatchProgressEvent> = Vec::new();
    let report = run_batch_with_progress(
        &BatchConfig::for_root(&root),
        Some(&mut |event| events.push(event)),
    )
    .unwrap();

    assert!(matches!(events.first().map(|e| e.stage), Some(BatchStage::Discovering)));
    assert!(matches!(events.last().map(|e| e.stage), Some(BatchStage::Completed)));
    let finished: Vec<&BatchProgressEvent> = events
        .iter()
        .filter(|e| matches!(e.stage, BatchStage::RunCompleted | BatchStage::RunSkipped))
        .collect();
    assert_eq!(finished.len(), report.run_count());
    assert_eq!(
        finished
            .iter()
            .filter(|e| e.stage == BatchStage::RunSkipped)
            .count(),
        2
    );
    assert_eq!(finished.last().map(|e| e.fraction_complete()), Some(1.0));
}

#[test]
fn invalid_config_fails_before_reading_runs() {
    let config = BatchConfig {
        smoothing: tl_core::Smoothing::MovingAverage { window: 0 },
        ..BatchConfig::for_root("/nonexistent/tractionlab")
    };
    let err = run_batch(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}
