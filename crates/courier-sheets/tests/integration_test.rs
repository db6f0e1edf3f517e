use courier_sheets::{lookup, LookupOutcome, ReferenceRecord, ReferenceStore};
use tempfile::TempDir;

#[test]
fn test_reference_records_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = ReferenceStore::new(tmp.path().join("couriers.csv"));
    store.ensure_exists().unwrap();

    let records: Vec<ReferenceRecord> = (0..25)
        .map(|i| {
            ReferenceRecord::new(
                format!("Courier {i}"),
                if i % 2 == 0 { "Curitiba" } else { "Pinhais" },
                if i % 3 == 0 { String::new() } else { format!("District \"{i}\"") },
                if i % 5 == 0 { format!("8{i:04}") } else { String::new() },
            )
        })
        .collect();

    for record in &records {
        store.append(record.clone()).unwrap();
    }

    assert_eq!(store.read_all().unwrap(), records);
}

#[test]
fn test_lookup_before_first_run() {
    let tmp = TempDir::new().unwrap();
    let output_dir = tmp.path().join("deliveries");
    std::fs::create_dir_all(&output_dir).unwrap();
    std::fs::write(output_dir.join("deliveries.csv"), "CODIGO1\n1\n").unwrap();

    for code in ["br1029", "BR1029", "A1029"] {
        let outcome = lookup(&output_dir, code, "BR");
        assert!(
            matches!(outcome, LookupOutcome::NotFound { .. }),
            "{code}: {outcome:?}"
        );
    }
}
