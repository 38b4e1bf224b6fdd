//! Concurrent store access tests
//!
//! Uploads and dashboard reads share one store. Readers must only ever see a
//! whole snapshot, never a half-replaced one.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use salesdash_core::adapters::duckdb::DuckDbSalesStore;
use salesdash_core::ports::{SalesStore, INSERT_CHUNK_SIZE};
use salesdash_core::{SalesFilter, SalesTransaction};

/// Number of concurrent threads
const THREAD_COUNT: usize = 6;

/// Number of iterations per thread
const ITERATIONS_PER_THREAD: usize = 4;

fn batch(size: usize, customer: &str) -> Vec<SalesTransaction> {
    (0..size)
        .map(|i| SalesTransaction {
            invoice_number: i as i64,
            transaction_type: "INV".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 17),
            customer: customer.to_string(),
            product: "Whole Bird".to_string(),
            mass: 10,
            sales_value: Decimal::from(100),
            ..Default::default()
        })
        .collect()
}

/// Writers alternate between a small and a multi-chunk snapshot while
/// readers count rows. Every read must match one snapshot exactly.
#[test]
fn test_readers_never_see_partial_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let store = DuckDbSalesStore::new(&temp_dir.path().join("test_concurrent.duckdb")).unwrap();
    store.ensure_schema().unwrap();
    let store = Arc::new(store);

    let small = Arc::new(batch(3, "Small"));
    let large = Arc::new(batch(INSERT_CHUNK_SIZE + 500, "Large"));
    store.replace_all(&small).unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let torn_reads = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        let torn_reads = Arc::clone(&torn_reads);
        let small = Arc::clone(&small);
        let large = Arc::clone(&large);

        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..ITERATIONS_PER_THREAD {
                if thread_id % 2 == 0 {
                    let records = if i % 2 == 0 { &large } else { &small };
                    store.replace_all(records).unwrap();
                } else {
                    let rows = store.query(&SalesFilter::default()).unwrap();
                    let consistent = match rows.len() {
                        n if n == small.len() => rows.iter().all(|r| r.customer == "Small"),
                        n if n == large.len() => rows.iter().all(|r| r.customer == "Large"),
                        _ => false,
                    };
                    if !consistent {
                        eprintln!("Thread {}: torn read of {} rows", thread_id, rows.len());
                        torn_reads.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(torn_reads.load(Ordering::SeqCst), 0);
    let final_count = store.count().unwrap() as usize;
    assert!(final_count == small.len() || final_count == large.len());
}

/// A store reopened on the same file after the first handle is dropped
/// sees the committed snapshot
#[test]
fn test_sequential_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_reopen.duckdb");

    for round in 1..=3 {
        let store = DuckDbSalesStore::new(&db_path).unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count().unwrap() as usize, if round == 1 { 0 } else { round - 1 });
        store.replace_all(&batch(round, "Reopen")).unwrap();
    }
}
