use proptest::prelude::*;
use proptest::{prop_assert_eq, proptest};
use tempfile::tempdir;

use super::*;

fn config_in(dir: &std::path::Path) -> Config {
    Config::builder()
        .data_dir(dir.to_path_buf())
        .buffer_pool_pages(8)
        .build()
}

#[test]
fn create_yields_one_empty_data_page() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t1.heap").unwrap();

    let hf = HeapFile::open(&config, "t1.heap").unwrap();
    let hdr = hf.header().unwrap();
    assert_eq!(hdr.rec_cnt, 0);
    assert_eq!(hdr.page_cnt, 1);
    assert_eq!(hdr.first_page, hdr.last_page);
    assert_ne!(hdr.first_page, -1);
}

#[test]
fn create_on_existing_name_fails() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "dup.heap").unwrap();
    let err = create_heap_file(&config, "dup.heap").unwrap_err();
    assert!(matches!(err, DbError::FileExists(_)));
}

#[test]
fn insert_then_unfiltered_scan_yields_insertion_order() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t2.heap").unwrap();

    {
        let mut ins = InsertFileScan::open(&config, "t2.heap").unwrap();
        ins.insert_record(b"alpha").unwrap();
        ins.insert_record(b"beta").unwrap();
        ins.insert_record(b"gamma").unwrap();
    }

    let mut scan = HeapFileScan::open(&config, "t2.heap").unwrap();
    scan.start_scan(None).unwrap();

    let mut seen = Vec::new();
    loop {
        match scan.scan_next() {
            Ok(_) => seen.push(scan.get_record().unwrap()),
            Err(DbError::FileEof) => break,
            Err(e) => panic!("unexpected scan error: {e}"),
        }
    }

    assert_eq!(scan.get_rec_cnt().unwrap(), 3);
    assert_eq!(seen, vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()]);
}

#[test]
fn insert_then_get_record_round_trips_bytes() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t3.heap").unwrap();

    let mut ins = InsertFileScan::open(&config, "t3.heap").unwrap();
    let rid = ins.insert_record(b"payload").unwrap();
    assert_eq!(ins.get_record(rid).unwrap(), b"payload");
}

#[test]
fn many_records_span_multiple_pages_and_are_all_retrievable() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t4.heap").unwrap();

    let payload = vec![7u8; common::PAGE_SIZE / 4];
    let mut rids = Vec::new();
    {
        let mut ins = InsertFileScan::open(&config, "t4.heap").unwrap();
        for _ in 0..500 {
            rids.push(ins.insert_record(&payload).unwrap());
        }
    }

    let mut hf = HeapFile::open(&config, "t4.heap").unwrap();
    assert!(hf.header().unwrap().page_cnt > 1);

    for rid in rids {
        assert_eq!(hf.get_record(rid).unwrap(), payload);
    }
}

fn four_byte_int_record(value: i32) -> Vec<u8> {
    let mut buf = value.to_ne_bytes().to_vec();
    buf.extend_from_slice(b"padding");
    buf
}

#[test]
fn integer_filter_selects_matching_records() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t5.heap").unwrap();

    {
        let mut ins = InsertFileScan::open(&config, "t5.heap").unwrap();
        for v in [5, 10, 15, 20] {
            ins.insert_record(&four_byte_int_record(v)).unwrap();
        }
    }

    let mut scan = HeapFileScan::open(&config, "t5.heap").unwrap();
    scan.start_scan(Some(ScanFilterSpec {
        offset: 0,
        length: 4,
        column_type: ColumnType::Integer,
        filter_bytes: 10i32.to_ne_bytes().to_vec(),
        op: Op::Gte,
    }))
    .unwrap();

    let mut values = Vec::new();
    loop {
        match scan.scan_next() {
            Ok(_) => {
                let rec = scan.get_record().unwrap();
                let v = i32::from_ne_bytes(rec[0..4].try_into().unwrap());
                values.push(v);
            }
            Err(DbError::FileEof) => break,
            Err(e) => panic!("unexpected scan error: {e}"),
        }
    }

    assert_eq!(values, vec![10, 15, 20]);
}

#[test]
fn mark_and_reset_reproduce_the_same_record() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t6.heap").unwrap();

    {
        let mut ins = InsertFileScan::open(&config, "t6.heap").unwrap();
        for i in 0..6 {
            ins.insert_record(format!("rec-{i}").as_bytes()).unwrap();
        }
    }

    let mut unmarked = HeapFileScan::open(&config, "t6.heap").unwrap();
    unmarked.start_scan(None).unwrap();
    for _ in 0..4 {
        unmarked.scan_next().unwrap();
    }
    let fourth = unmarked.scan_next().unwrap();

    let mut scan = HeapFileScan::open(&config, "t6.heap").unwrap();
    scan.start_scan(None).unwrap();
    for _ in 0..3 {
        scan.scan_next().unwrap();
    }
    scan.mark_scan().unwrap();
    for _ in 0..2 {
        scan.scan_next().unwrap();
    }
    scan.reset_scan().unwrap();
    let replayed = scan.scan_next().unwrap();

    assert_eq!(replayed, fourth);
}

#[test]
fn delete_via_scan_persists_after_reopen() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t7.heap").unwrap();

    let middle = {
        let mut ins = InsertFileScan::open(&config, "t7.heap").unwrap();
        ins.insert_record(b"first").unwrap();
        let middle = ins.insert_record(b"second").unwrap();
        ins.insert_record(b"third").unwrap();
        middle
    };

    {
        let mut scan = HeapFileScan::open(&config, "t7.heap").unwrap();
        scan.start_scan(None).unwrap();
        loop {
            match scan.scan_next() {
                Ok(rid) if rid == middle => {
                    scan.delete_record().unwrap();
                    break;
                }
                Ok(_) => {}
                Err(DbError::FileEof) => panic!("middle record not found"),
                Err(e) => panic!("unexpected scan error: {e}"),
            }
        }
    }

    let hf = HeapFile::open(&config, "t7.heap").unwrap();
    assert_eq!(hf.get_rec_cnt().unwrap(), 2);

    let mut scan = HeapFileScan::open(&config, "t7.heap").unwrap();
    scan.start_scan(None).unwrap();
    let mut remaining = Vec::new();
    loop {
        match scan.scan_next() {
            Ok(rid) => remaining.push(rid),
            Err(DbError::FileEof) => break,
            Err(e) => panic!("unexpected scan error: {e}"),
        }
    }
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&middle));
}

#[test]
fn bad_scan_parameters_are_rejected() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t8.heap").unwrap();

    let mut scan = HeapFileScan::open(&config, "t8.heap").unwrap();
    let err = scan
        .start_scan(Some(ScanFilterSpec {
            offset: -1,
            length: 4,
            column_type: ColumnType::Integer,
            filter_bytes: 0i32.to_ne_bytes().to_vec(),
            op: Op::Eq,
        }))
        .unwrap_err();
    assert!(matches!(err, DbError::BadScanParm(_)));
}

#[test]
fn oversized_record_is_rejected() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t9.heap").unwrap();

    let mut ins = InsertFileScan::open(&config, "t9.heap").unwrap();
    let payload = vec![0u8; common::PAGE_SIZE];
    let err = ins.insert_record(&payload).unwrap_err();
    assert!(matches!(err, DbError::InvalidRecLen { .. }));
}

#[test]
fn end_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t10.heap").unwrap();

    let mut ins = InsertFileScan::open(&config, "t10.heap").unwrap();
    ins.insert_record(b"one").unwrap();
    drop(ins);

    let mut scan = HeapFileScan::open(&config, "t10.heap").unwrap();
    scan.start_scan(None).unwrap();
    scan.scan_next().unwrap();
    scan.end_scan().unwrap();
    scan.end_scan().unwrap();
}

#[test]
fn destroy_removes_the_file_from_disk() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    create_heap_file(&config, "t11.heap").unwrap();
    destroy_heap_file(&config, "t11.heap").unwrap();
    assert!(!dir.path().join("t11.heap").exists());
}

proptest! {
    /// P2: for any sequence of inserts, a full unfiltered scan yields
    /// exactly that multiset of records back, regardless of size or
    /// content of each record.
    #[test]
    fn scan_yields_exactly_the_inserted_multiset(
        records in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..200), 0..50)
    ) {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        create_heap_file(&config, "prop.heap").unwrap();

        {
            let mut ins = InsertFileScan::open(&config, "prop.heap").unwrap();
            for rec in &records {
                ins.insert_record(rec).unwrap();
            }
        }

        let mut scan = HeapFileScan::open(&config, "prop.heap").unwrap();
        scan.start_scan(None).unwrap();
        let mut seen = Vec::new();
        loop {
            match scan.scan_next() {
                Ok(_) => seen.push(scan.get_record().unwrap()),
                Err(DbError::FileEof) => break,
                Err(e) => panic!("unexpected scan error: {e}"),
            }
        }

        prop_assert_eq!(seen, records);
        destroy_heap_file(&config, "prop.heap").ok();
    }
}
