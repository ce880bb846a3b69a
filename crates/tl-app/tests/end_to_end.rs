//! End-to-end: run folders on disk to a persisted slip/drawbar table.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tl_app::{BatchConfig, StatisticKind, run_batch};
use tl_core::WindowSpec;

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

#[test]
fn drawbar_from_forces_is_exact() {
    let root = unique_temp_dir("tl_e2e_forces");
    let run = root.join("run_slip_20");
    fs::create_dir_all(&run).unwrap();
    fs::write(run.join("params.json"), r#"{"slip": 20.0}"#).unwrap();
    fs::write(
        run.join("output.csv"),
        "t,f_x,f_y,f_z\n0,3,4,10\n1,3,4,10\n2,3,4,10\n3,3,4,10\n4,3,4,10\n",
    )
    .unwrap();

    let out_dir = root.join("out");
    let config = BatchConfig {
        window: WindowSpec::new(1.0, 3.0),
        persist: true,
        output_dir: out_dir.clone(),
        ..BatchConfig::for_root(&root)
    };
    let report = run_batch(&config).unwrap();

    let rows = report.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_key, 20.0);
    assert_eq!(rows[0].value, 0.5);

    let table = tl_results::read_table(&out_dir.join("slip_drawbar.txt")).unwrap();
    assert_eq!(table.labels, vec!["Slip", "Drawbar"]);
    assert_eq!(table.rows, vec![vec![20.0, 0.5]]);
}

#[test]
fn precomputed_drawbar_column_is_averaged() {
    let root = unique_temp_dir("tl_e2e_dc");
    for (name, slip, d_c) in [("b_run", 10.0, 0.3), ("a_run", 5.0, 0.1)] {
        let run = root.join(name);
        fs::create_dir_all(&run).unwrap();
        fs::write(run.join("params.json"), format!("{{\"slip\": {slip}}}")).unwrap();
        let mut csv = String::from("t, d_c\n");
        for t in 0..30 {
            // outside the default [10, 20] window the column is noise
            let value = if (10..=20).contains(&t) { d_c } else { 99.0 };
            csv.push_str(&format!("{t}, {value}\n"));
        }
        fs::write(run.join("output.csv"), csv).unwrap();
    }

    let config = BatchConfig {
        statistic: StatisticKind::ChannelMean {
            channel: "d_c".into(),
        },
        ..BatchConfig::for_root(&root)
    };
    let report = run_batch(&config).unwrap();
    let pairs: Vec<(f64, f64)> = report.rows().iter().map(|r| (r.order_key, r.value)).collect();
    assert_eq!(pairs, vec![(5.0, 0.1), (10.0, 0.3)]);
}

#[test]
fn yaml_config_drives_the_batch() {
    let root = unique_temp_dir("tl_e2e_yaml");
    let run = root.join("run");
    fs::create_dir_all(&run).unwrap();
    fs::write(run.join("params.json"), r#"{"slip": 50}"#).unwrap();
    fs::write(run.join("output.csv"), "t,velX\n0,5\n1,0.009\n2,0.009\n").unwrap();

    let config_path = root.join("batch.yaml");
    fs::write(
        &config_path,
        format!(
            "root_dir: {}\nwindow:\n  start: 1.0\nstatistic:\n  kind: slip\n",
            root.display()
        ),
    )
    .unwrap();

    let config = BatchConfig::load_yaml(&config_path).unwrap();
    let report = run_batch(&config).unwrap();
    let rows = report.rows();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].value - 50.0).abs() < 1e-9);
    // the config file itself is not a run folder
    assert!(report.skipped().is_empty());
}
