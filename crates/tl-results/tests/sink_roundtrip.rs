//! Integration tests for persisted result tables.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tl_results::{AggregationRow, ResultSink, read_table};

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
fn grouped_rows_survive_write_and_read() {
    let dir = unique_temp_dir("tl_sink_roundtrip");
    let path = dir.join("nested").join("slip_drawbar.txt");
    let rows = [
        AggregationRow {
            group_key: 0.5,
            order_key: 10.0,
            value: 0.123456789012345,
        },
        AggregationRow {
            group_key: 0.5,
            order_key: 20.0,
            value: -1.0 / 3.0,
        },
        AggregationRow {
            group_key: 2.0,
            order_key: 5.0,
            value: 1e-7,
        },
    ];
    let triples: Vec<[f64; 3]> = rows.iter().map(|r| r.to_triple()).collect();

    let sink = ResultSink::File {
        path: path.clone(),
        labels: vec!["Scale".into(), "Slip".into(), "Drawbar".into()],
    };
    assert_eq!(sink.write(&triples).unwrap(), Some(path.clone()));

    let table = read_table(&path).unwrap();
    assert_eq!(table.labels, vec!["Scale", "Slip", "Drawbar"]);
    assert_eq!(table.rows.len(), rows.len());
    for (read, row) in table.rows.iter().zip(&rows) {
        for (a, b) in read.iter().zip(row.to_triple()) {
            assert!((a - b).abs() <= 1e-15 * b.abs().max(1.0), "{a} vs {b}");
        }
    }
}

#[test]
fn rewrite_replaces_previous_table() {
    let dir = unique_temp_dir("tl_sink_rewrite");
    let path = dir.join("out.txt");
    let sink = ResultSink::File {
        path: path.clone(),
        labels: vec!["Slip".into(), "Drawbar".into()],
    };

    sink.write(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
    sink.write(&[[5.0, 6.0]]).unwrap();

    let table = read_table(&path).unwrap();
    assert_eq!(table.rows, vec![vec![5.0, 6.0]]);
}

#[test]
fn empty_table_has_only_header() {
    let dir = unique_temp_dir("tl_sink_empty");
    let path = dir.join("out.txt");
    let sink = ResultSink::File {
        path: path.clone(),
        labels: vec!["Slip".into(), "Drawbar".into()],
    };
    let rows: Vec<[f64; 2]> = Vec::new();
    sink.write(&rows).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "# Slip, Drawbar\n");
    assert!(read_table(&path).unwrap().rows.is_empty());
}
