//! Integration tests for zone files: keyed records, rendering and plain form.

use corefile::domain::{PlainZoneFile, Record, RecordType, ZoneFile};

fn example_zone() -> ZoneFile {
    let mut zonefile = ZoneFile::new();
    zonefile.add_record(
        None,
        "example.io",
        "SOA",
        [
            "ns1.example.io.",
            "admin.example.io.",
            "2024010101",
            "7200",
            "3600",
            "1209600",
            "3600",
        ],
        true,
    );
    zonefile.add_record(Some("ns"), "example.io", "NS", ["ns1.example.io."], true);
    zonefile.add_record(None, "ns1.example.io", "A", ["10.0.0.53"], true);
    zonefile.add_record(None, "www.example.io", "cname", ["example.io."], true);
    zonefile
}

#[test]
fn given_records_when_render_then_one_line_each_in_insertion_order() {
    let rendered = example_zone().render();

    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "example.io.\tIN\tSOA\tns1.example.io. admin.example.io. 2024010101 7200 3600 1209600 3600"
    );
    assert_eq!(lines[1], "example.io.\tIN\tNS\tns1.example.io.");
    assert_eq!(lines[2], "ns1.example.io.\tIN\tA\t10.0.0.53");
    assert_eq!(lines[3], "www.example.io.\tIN\tCNAME\texample.io.");
}

#[test]
fn given_same_hostname_with_explicit_name_when_added_then_both_kept() {
    let zonefile = example_zone();

    assert_eq!(zonefile.record("example.io").unwrap().record_type, RecordType::Soa);
    assert_eq!(zonefile.record("ns").unwrap().record_type, RecordType::Ns);
}

#[test]
fn given_existing_key_when_add_with_replace_then_overwritten_in_place() {
    let mut zonefile = example_zone();

    let added = zonefile
        .add_record(None, "ns1.example.io", "A", ["10.0.0.54"], true)
        .unwrap();
    assert_eq!(added.args, ["10.0.0.54"]);

    let keys: Vec<&str> = zonefile.records().keys().map(String::as_str).collect();
    assert_eq!(keys, ["example.io", "ns", "ns1.example.io", "www.example.io"]);
}

#[test]
fn given_record_instance_when_added_then_keyed_by_hostname() {
    let mut zonefile = ZoneFile::new();
    let record = Record::new("mail.example.io", RecordType::Mx, ["10", "mx.example.io."]);

    zonefile.add_record_from_instance(record.clone(), None, true);

    assert_eq!(zonefile.record("mail.example.io"), Some(&record));
}

#[test]
fn given_missing_record_when_remove_then_none_and_unchanged() {
    let mut zonefile = example_zone();

    assert!(zonefile.remove_record("ftp.example.io").is_none());
    assert_eq!(zonefile, example_zone());
}

#[test]
fn given_present_record_when_remove_then_returned() {
    let mut zonefile = example_zone();

    let removed = zonefile.remove_record("ns").unwrap();

    assert_eq!(removed.render(), "example.io.\tIN\tNS\tns1.example.io.");
    assert!(zonefile.record("ns").is_none());
}

#[test]
fn given_zonefile_when_plain_round_trip_through_toml_then_equal() {
    let zonefile = example_zone();

    let text = toml::to_string(&zonefile.to_plain()).unwrap();
    let plain: PlainZoneFile = toml::from_str(&text).unwrap();

    assert_eq!(ZoneFile::from_plain(&plain), zonefile);
}

#[test]
fn given_unknown_type_when_round_trip_then_text_preserved() {
    let mut zonefile = ZoneFile::new();
    zonefile.add_record(None, "host.example.io", "HINFO", ["\"x86\"", "\"linux\""], true);

    let restored = ZoneFile::from_plain(&zonefile.to_plain());

    assert_eq!(
        restored.record("host.example.io").unwrap().record_type,
        RecordType::Other("HINFO".to_string())
    );
    assert_eq!(restored, zonefile);
}
