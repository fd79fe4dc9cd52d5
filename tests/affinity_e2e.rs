//! Delivery onto the process-wide affinity executor.
//!
//! The affinity executor is global state, so these tests live in their own
//! binary and run one after another under a shared lock.

#[macro_use]
mod common;

use common::*;
use parking_lot::Mutex;
use promissory::exec::{self, Executor};
use promissory::future::completed;
use promissory::lab::ManualExecutor;
use promissory::Promise;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

#[test]
fn affinity_without_executor_is_identity() {
    let _serial = SERIAL.lock();
    init_test_logging();
    exec::clear_affinity_executor();

    let promise: Promise<i32> = Promise::new();
    let future = promise.future();
    assert!(future.on_affinity().ptr_eq(&future));
    assert!(!exec::on_affinity_thread());
}

#[test]
fn affinity_delivery_is_pumped_by_the_loop() {
    let _serial = SERIAL.lock();
    init_test_logging();
    test_phase!("affinity_delivery_is_pumped_by_the_loop");

    let ui = Arc::new(ManualExecutor::new());
    exec::set_affinity_executor(ui.clone() as Arc<dyn Executor>);

    let promise: Promise<String> = Promise::new();
    let on_ui = promise.future().on_affinity();
    let deliveries = Deliveries::new();
    deliveries.watch(&on_ui, 1);

    let p = promise.clone();
    thread::spawn(move || p.complete(String::from("rendered")))
        .join()
        .expect("worker");
    assert_eq!(deliveries.count(), 0);

    ui.run_pending();
    assert_eq!(deliveries.tags(), vec![1]);

    test_section!("settled future observed on the loop");
    let settled = completed::completed(1_u8);
    let ui_for_task = Arc::clone(&ui);
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    ui.execute(Box::new(move || {
        assert!(ui_for_task.is_current());
        *s.lock() = Some(settled.on_affinity().ptr_eq(&settled));
    }))
    .expect("queued");
    ui.run_pending();
    assert_eq!(*seen.lock(), Some(true));

    exec::clear_affinity_executor();
    test_complete!("affinity_delivery_is_pumped_by_the_loop");
}

#[test]
fn affinity_on_a_worker_thread() {
    let _serial = SERIAL.lock();
    init_test_logging();

    let event_loop = WorkerThread::spawn("affinity-loop");
    exec::set_affinity_executor(event_loop.clone() as Arc<dyn Executor>);

    let promise: Promise<u32> = Promise::new();
    let names = Arc::new(Mutex::new(Vec::new()));
    let n = Arc::clone(&names);
    let done = promise.future().on_affinity().map(move |v| {
        n.lock().push(thread::current().name().map(String::from));
        assert!(exec::on_affinity_thread());
        v * 2
    });

    promise.complete(21);
    assert_eq!(done.get_timeout(Duration::from_secs(10)).unwrap(), 42);
    assert_eq!(*names.lock(), vec![Some(String::from("affinity-loop"))]);

    exec::clear_affinity_executor();
    event_loop.shutdown();
}
