//! # Synchronization Tests
//!
//! Testes das primitivas que todo o resto usa para dormir.
//!
//! ## 🎯 Objetivo
//! - `wait` solta o lock enquanto dorme e o readquire antes de voltar.
//! - Nenhum wakeup se perde entre registrar e dormir.
//! - `wait_timeout` expira e sai da fila sozinho.
//!
//! Rodam sobre threads do host, sem kernel.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::{CondVar, Mutex};

#[derive(Default)]
struct Shared {
    ready: bool,
    cv: CondVar,
}

fn wait_for_waiters(lock: &Mutex<Shared>, n: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while lock.lock().cv.waiters() != n {
        assert!(Instant::now() < deadline, "waiters nunca chegou a {}", n);
        thread::sleep(Duration::from_millis(1));
    }
}

fn spawn_waiter(lock: &Arc<Mutex<Shared>>) -> thread::JoinHandle<()> {
    let lock = Arc::clone(lock);
    thread::spawn(move || {
        let mut guard = lock.lock();
        while !guard.ready {
            guard = CondVar::wait(guard, |s| Some(&mut s.cv));
        }
    })
}

#[test]
fn notify_all_wakes_every_waiter() {
    let lock = Arc::new(Mutex::new(Shared::default()));
    let a = spawn_waiter(&lock);
    let b = spawn_waiter(&lock);
    wait_for_waiters(&lock, 2);

    {
        let mut guard = lock.lock();
        guard.ready = true;
        assert_eq!(guard.cv.notify_all(), 2);
    }
    a.join().unwrap();
    b.join().unwrap();
    assert_eq!(lock.lock().cv.waiters(), 0);
}

#[test]
fn notify_one_wakes_a_single_waiter() {
    let lock = Arc::new(Mutex::new(Shared::default()));
    let a = spawn_waiter(&lock);
    let b = spawn_waiter(&lock);
    wait_for_waiters(&lock, 2);

    // Sem mudar o predicado: o acordado volta a dormir.
    assert!(lock.lock().cv.notify_one());
    wait_for_waiters(&lock, 2);

    {
        let mut guard = lock.lock();
        guard.ready = true;
        guard.cv.notify_all();
    }
    a.join().unwrap();
    b.join().unwrap();
}

#[test]
fn wait_releases_the_lock_while_sleeping() {
    let lock = Arc::new(Mutex::new(Shared::default()));
    let waiter = spawn_waiter(&lock);
    wait_for_waiters(&lock, 1);

    // O waiter dorme sem segurar o lock.
    let guard = lock.try_lock();
    assert!(guard.is_some());
    drop(guard);

    let mut guard = lock.lock();
    guard.ready = true;
    guard.cv.notify_all();
    drop(guard);
    waiter.join().unwrap();
}

#[test]
fn wait_timeout_expires_and_leaves_the_queue() {
    let lock = Mutex::new(Shared::default());
    let start = Instant::now();
    let (guard, timed_out) =
        CondVar::wait_timeout(lock.lock(), |s| Some(&mut s.cv), Duration::from_millis(20));

    assert!(timed_out);
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(guard.cv.waiters(), 0);
}

#[test]
fn wait_timeout_reports_notification() {
    let lock = Arc::new(Mutex::new(Shared::default()));
    let notifier = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            wait_for_waiters(&lock, 1);
            lock.lock().cv.notify_all();
        })
    };

    let (_guard, timed_out) =
        CondVar::wait_timeout(lock.lock(), |s| Some(&mut s.cv), Duration::from_secs(10));
    assert!(!timed_out);
    notifier.join().unwrap();
}

#[test]
fn wait_on_vanished_variable_returns_immediately() {
    let lock = Mutex::new(None::<CondVar>);
    let guard = CondVar::wait(lock.lock(), |cv| cv.as_mut());
    assert!(guard.is_none());
}

#[test]
fn try_lock_fails_while_held() {
    let lock = Mutex::new(0u32);
    let held = lock.lock();
    assert!(lock.try_lock().is_none());
    drop(held);
    *lock.try_lock().unwrap() += 1;
    assert_eq!(*lock.lock(), 1);
}
