use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use medreport_ingest::{IngestError, read_rows, read_rows_from_reader, subject_ids};
use medreport_model::Value;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("medreport_ingest_{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write file");
    path
}

fn cleanup(path: &PathBuf) {
    let _ = fs::remove_file(path);
    if let Some(parent) = path.parent() {
        let _ = fs::remove_dir_all(parent);
    }
}

#[test]
fn reads_typed_rows() {
    let contents = "\u{feff}subject_id, stroke_type ,occlusion_left_mca_m1,door_to_needle,ivt_dose,onset_timestamp,discharge_date,notes\n\
        2,ischemic,t,14.0,50.0,2023-03-14 08:05:00,2023-03-20,first\n\
        1,intracerebral hemorrhage,f,NA,,2023-04-01 22:40:00,NaN,\n";
    let path = temp_file("rows.csv", contents);
    let rows = read_rows(&path).expect("read rows");
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    assert_eq!(first.subject_id(), Some(2));
    assert_eq!(first.get("stroke_type"), &Value::from("ischemic"));
    assert_eq!(first.get("occlusion_left_mca_m1"), &Value::Bool(true));
    assert_eq!(first.get("door_to_needle"), &Value::Int(14));
    assert_eq!(first.get("ivt_dose"), &Value::Float(50.0));
    let onset = NaiveDate::from_ymd_opt(2023, 3, 14)
        .expect("valid date")
        .and_time(NaiveTime::from_hms_opt(8, 5, 0).expect("valid time"));
    assert_eq!(first.get("onset_timestamp"), &Value::DateTime(onset));
    assert_eq!(
        first.get("discharge_date"),
        &Value::Date(NaiveDate::from_ymd_opt(2023, 3, 20).expect("valid date"))
    );
    assert_eq!(first.get("notes"), &Value::from("first"));

    let second = &rows[1];
    assert_eq!(second.get("occlusion_left_mca_m1"), &Value::Bool(false));
    assert_eq!(second.get("door_to_needle"), &Value::Null);
    assert_eq!(second.get("ivt_dose"), &Value::Null);
    assert_eq!(second.get("discharge_date"), &Value::Null);
    assert_eq!(second.get("notes"), &Value::Null);
    assert_eq!(second.get("not_a_column"), &Value::Null);

    assert_eq!(subject_ids(&rows), vec![1, 2]);
    cleanup(&path);
}

#[test]
fn skips_blank_rows_and_pads_short_rows() {
    let contents = "subject_id,age,sex\n1,67,male\n,,\n2,71\n";
    let rows = read_rows_from_reader(contents.as_bytes()).expect("read rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("age"), &Value::Int(71));
    assert_eq!(rows[1].get("sex"), &Value::Null);
}

#[test]
fn invalid_value_is_reported() {
    let contents = "subject_id,thrombolysis\n1,t\n2,perhaps\n";
    let err = read_rows_from_reader(contents.as_bytes()).unwrap_err();
    match err {
        IngestError::InvalidValue {
            row,
            column,
            value,
            ..
        } => {
            assert_eq!(row, 2);
            assert_eq!(column, "thrombolysis");
            assert_eq!(value, "perhaps");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_a_csv_error() {
    let path = std::env::temp_dir().join("medreport_ingest_missing").join("none.csv");
    let err = read_rows(&path).unwrap_err();
    assert!(matches!(err, IngestError::Csv { .. }));
}
