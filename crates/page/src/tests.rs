use super::*;

#[test]
fn fresh_page_has_no_records_and_no_next() {
    let page = Page::init(3);
    assert_eq!(page.get_next_page().unwrap(), -1);
    assert_eq!(page.first_record().unwrap(), RecordCursor::NoRecords);
}

#[test]
fn insert_then_get_round_trips_bytes() {
    let mut page = Page::init(0);
    let outcome = page.insert_record(b"alpha").unwrap();
    let rid = match outcome {
        InsertOutcome::Inserted(rid) => rid,
        InsertOutcome::NoSpace => panic!("expected space on a fresh page"),
    };
    assert_eq!(page.get_record(rid).unwrap(), b"alpha");
}

#[test]
fn first_and_next_record_walk_in_slot_order() {
    let mut page = Page::init(0);
    let InsertOutcome::Inserted(r0) = page.insert_record(b"a").unwrap() else {
        panic!()
    };
    let InsertOutcome::Inserted(r1) = page.insert_record(b"bb").unwrap() else {
        panic!()
    };
    let InsertOutcome::Inserted(r2) = page.insert_record(b"ccc").unwrap() else {
        panic!()
    };

    assert_eq!(page.first_record().unwrap(), RecordCursor::Found(r0));
    assert_eq!(page.next_record(r0).unwrap(), AdvanceOutcome::Found(r1));
    assert_eq!(page.next_record(r1).unwrap(), AdvanceOutcome::Found(r2));
    assert_eq!(page.next_record(r2).unwrap(), AdvanceOutcome::EndOfPage);
}

#[test]
fn next_record_skips_deleted_slots() {
    let mut page = Page::init(0);
    let InsertOutcome::Inserted(r0) = page.insert_record(b"a").unwrap() else {
        panic!()
    };
    let InsertOutcome::Inserted(r1) = page.insert_record(b"b").unwrap() else {
        panic!()
    };
    let InsertOutcome::Inserted(r2) = page.insert_record(b"c").unwrap() else {
        panic!()
    };

    page.delete_record(r1).unwrap();
    assert_eq!(page.next_record(r0).unwrap(), AdvanceOutcome::Found(r2));

    // Resuming from a just-deleted slot must still work.
    assert_eq!(page.next_record(r1).unwrap(), AdvanceOutcome::Found(r2));
}

#[test]
fn insert_fails_with_no_space_once_full() {
    let mut page = Page::init(0);
    let payload = vec![0u8; Page::max_record_len()];
    assert_eq!(
        page.insert_record(&payload).unwrap(),
        InsertOutcome::Inserted(Rid::new(0, 0))
    );
    assert_eq!(page.insert_record(b"x").unwrap(), InsertOutcome::NoSpace);
}

#[test]
fn delete_twice_is_an_error() {
    let mut page = Page::init(0);
    let InsertOutcome::Inserted(rid) = page.insert_record(b"a").unwrap() else {
        panic!()
    };
    page.delete_record(rid).unwrap();
    let err = page.delete_record(rid).unwrap_err();
    assert!(matches!(err, DbError::RecordNotFound(_)));
}

#[test]
fn get_record_rejects_out_of_range_slot() {
    let page = Page::init(0);
    let err = page.get_record(Rid::new(0, 9)).unwrap_err();
    assert!(matches!(err, DbError::RecordNotFound(_)));
}

#[test]
fn set_next_page_persists_through_raw_round_trip() {
    let mut page = Page::init(5);
    page.set_next_page(9).unwrap();
    let raw = page.into_raw();

    let reloaded = Page::from_raw(5, raw);
    assert_eq!(reloaded.get_next_page().unwrap(), 9);
}
