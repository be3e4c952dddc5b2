//! Tests for decoded records

use serde_json::json;

use crate::record::{CompactRecord, FullRecord, Record};
use crate::schema::Format;

#[test]
fn test_full_record_json_names() {
    let record = Record::from(FullRecord {
        saddr: "10.0.0.1".into(),
        daddr: "10.0.0.2".into(),
        dport: 443,
        srtt: 1200,
        pid: 42,
        ..Default::default()
    });

    let value = record.to_json().unwrap();
    assert_eq!(value["SAddr"], "10.0.0.1");
    assert_eq!(value["DAddr"], "10.0.0.2");
    assert_eq!(value["DPort"], 443);
    assert_eq!(value["SRTT"], 1200);
    assert_eq!(value["PID"], 42);
    assert_eq!(value["TotalRetrans"], 0);
    assert_eq!(record.format(), Format::Full);
}

#[test]
fn test_compact_record_is_flat() {
    let record = Record::from(CompactRecord {
        hostname: "edge-1".into(),
        ..Default::default()
    });

    let line = record.to_json_line().unwrap();
    assert!(line.starts_with('{'));
    assert!(line.contains(r#""Hostname":"edge-1""#));
    assert!(!line.contains('\n'));
}

#[test]
fn test_dynamic_record_passthrough() {
    let map = json!({"RTT": 15, "SAddr": "::1"})
        .as_object()
        .cloned()
        .unwrap();
    let record = Record::from(map);

    assert_eq!(record.format(), Format::Dynamic);
    assert_eq!(record.to_json().unwrap(), json!({"RTT": 15, "SAddr": "::1"}));
}
