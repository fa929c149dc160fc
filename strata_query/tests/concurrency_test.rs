use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use basalt::{DbError, Field, PageId, Permission};
use rand::Rng;
use serial_test::serial;

mod common;

#[test]
#[serial]
fn shared_locks_coexist_on_one_page() {
    let (_dir, engine) = common::setup_engine(10);
    let table = common::int_table(&engine, "t");
    let pid = PageId { table, page_no: 0 };

    let t1 = engine.begin();
    let t2 = engine.begin();
    engine
        .coordinator()
        .get_page(t1, pid, Permission::ReadOnly)
        .unwrap();
    engine
        .coordinator()
        .get_page(t2, pid, Permission::ReadOnly)
        .unwrap();

    assert!(engine.coordinator().holds_lock(t1, pid));
    assert!(engine.coordinator().holds_lock(t2, pid));

    engine.coordinator().transaction_complete(t1, true).unwrap();
    assert!(!engine.coordinator().holds_lock(t1, pid));
    assert!(engine.coordinator().holds_lock(t2, pid));
    engine.coordinator().transaction_complete(t2, true).unwrap();
}

#[test]
#[serial]
fn exclusive_blocks_shared_until_commit() {
    let (_dir, engine) = common::setup_engine(10);
    let engine = Arc::new(engine);
    let table = common::int_table(&engine, "t");

    let t1 = engine.begin();
    let mut tuple = common::int_tuple(&engine, table, 5);
    engine
        .coordinator()
        .insert_tuple(t1, table, &mut tuple)
        .unwrap();
    let pid = tuple.record_id().unwrap().page;

    let (tx, rx) = mpsc::channel();
    let worker = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let t2 = engine.begin();
            let handle = engine
                .coordinator()
                .get_page(t2, pid, Permission::ReadOnly)
                .unwrap();
            let desc = engine.catalog().tuple_desc(table).unwrap();
            let seen = handle.read().tuple_at(&desc, 0).unwrap().field(0).clone();
            tx.send(seen).unwrap();
            engine.coordinator().transaction_complete(t2, true).unwrap();
        })
    };

    // While T1 still holds the exclusive lock the reader cannot return.
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

    engine.coordinator().transaction_complete(t1, true).unwrap();
    let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(seen, Field::Int(5));
    worker.join().unwrap();
}

#[test]
#[serial]
fn sole_reader_upgrades_without_blocking() {
    let (_dir, engine) = common::setup_engine(10);
    let table = common::int_table(&engine, "t");
    let pid = PageId { table, page_no: 0 };

    let t1 = engine.begin();
    engine
        .coordinator()
        .get_page(t1, pid, Permission::ReadOnly)
        .unwrap();
    let handle = engine
        .coordinator()
        .get_page(t1, pid, Permission::ReadWrite)
        .unwrap();

    let desc = engine.catalog().tuple_desc(table).unwrap();
    handle
        .write(t1)
        .insert_tuple(&desc, &common::int_tuple(&engine, table, 1))
        .unwrap();
    assert!(engine.coordinator().holds_lock(t1, pid));

    engine.coordinator().transaction_complete(t1, false).unwrap();
    assert!(!engine.coordinator().holds_lock(t1, pid));
}

#[test]
#[serial]
fn deadlock_aborts_the_later_requester() {
    let (_dir, engine) = common::setup_engine(10);
    let engine = Arc::new(engine);
    let table = common::int_table(&engine, "t");
    let page_a = PageId { table, page_no: 0 };
    let page_b = PageId { table, page_no: 1 };

    let t1 = engine.begin();
    let t2 = engine.begin();
    engine
        .coordinator()
        .get_page(t1, page_a, Permission::ReadWrite)
        .unwrap();
    engine
        .coordinator()
        .get_page(t2, page_b, Permission::ReadWrite)
        .unwrap();

    // T1 blocks waiting for B while we still hold this thread.
    let worker = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let res = engine.coordinator().get_page(t1, page_b, Permission::ReadOnly);
            assert!(res.is_ok(), "survivor proceeds once the victim unwinds");
            engine.coordinator().transaction_complete(t1, true).unwrap();
        })
    };
    thread::sleep(Duration::from_millis(300));

    // The second outer request closes the cycle; its caller is the victim.
    let err = engine
        .coordinator()
        .get_page(t2, page_a, Permission::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, DbError::Aborted));

    // The victim still holds its earlier lock until it formally aborts.
    assert!(engine.coordinator().holds_lock(t2, page_b));
    engine.coordinator().transaction_complete(t2, false).unwrap();

    worker.join().unwrap();
}

#[test]
#[serial]
fn abort_restores_the_committed_image() {
    let (_dir, engine) = common::setup_engine(10);
    let table = common::int_table(&engine, "t");

    let t1 = engine.begin();
    let mut keep = common::int_tuple(&engine, table, 10);
    engine
        .coordinator()
        .insert_tuple(t1, table, &mut keep)
        .unwrap();
    engine.coordinator().transaction_complete(t1, true).unwrap();

    let t2 = engine.begin();
    let mut gone = common::int_tuple(&engine, table, 20);
    engine
        .coordinator()
        .insert_tuple(t2, table, &mut gone)
        .unwrap();
    engine.coordinator().transaction_complete(t2, false).unwrap();

    let t3 = engine.begin();
    let pid = keep.record_id().unwrap().page;
    let handle = engine
        .coordinator()
        .get_page(t3, pid, Permission::ReadOnly)
        .unwrap();
    let desc = engine.catalog().tuple_desc(table).unwrap();
    let page = handle.read();
    assert_eq!(page.tuple_at(&desc, 0).unwrap().field(0), &Field::Int(10));
    assert!(page.tuple_at(&desc, 1).is_none());
    drop(page);
    engine.coordinator().transaction_complete(t3, true).unwrap();
}

#[test]
#[serial]
fn randomized_workload_keeps_committed_count() {
    const THREADS: usize = 4;
    const OPS: usize = 40;

    let (_dir, engine) = common::setup_engine(32);
    let engine = Arc::new(engine);
    let table = common::int_table(&engine, "t");
    let committed = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let committed = Arc::clone(&committed);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..OPS {
                    let tid = engine.begin();
                    let mut tuple = common::int_tuple(&engine, table, rng.gen_range(0..1000));
                    match engine.coordinator().insert_tuple(tid, table, &mut tuple) {
                        Ok(_) => {
                            let commit = rng.gen_bool(0.7);
                            engine
                                .coordinator()
                                .transaction_complete(tid, commit)
                                .unwrap();
                            if commit {
                                committed.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                        Err(_) => {
                            engine.coordinator().transaction_complete(tid, false).unwrap();
                        }
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let tid = engine.begin();
    let file = engine.catalog().heap_file(table).unwrap();
    let mut iter = file.iter(engine.coordinator(), tid);
    iter.open().unwrap();
    let mut stored = 0;
    while iter.next().unwrap().is_some() {
        stored += 1;
    }
    engine.coordinator().transaction_complete(tid, true).unwrap();

    assert_eq!(stored, committed.load(Ordering::SeqCst));
}
