//! Condition Variable
//!
//! Monitor no estilo Mesa sobre o lock grosso. A variável mora dentro do estado
//! protegido; `wait` recebe o guard e um seletor que encontra a variável no
//! estado, registra o contexto na `WaitQueue`, solta o lock, dorme e readquire.
//!
//! Wakeups são broadcast e podem ser espúrios: todo chamador re-testa o
//! predicado em loop.

use super::super::mutex::MutexGuard;
use crate::sched::sync::waitqueue::WaitQueue;
use std::time::{Duration, Instant};

/// Condition Variable
#[derive(Default)]
pub struct CondVar {
    queue: WaitQueue,
}

impl CondVar {
    pub const fn new() -> Self {
        Self {
            queue: WaitQueue::new(),
        }
    }

    /// Espera pela condição selecionada por `select`.
    ///
    /// Libera o lock atomicamente em relação a `notify_*` e o readquire antes de
    /// retornar. Se o objeto dono da variável já sumiu (`select` devolve `None`)
    /// retorna na hora; o loop do chamador percebe a mudança de estado.
    pub fn wait<'a, T>(
        mut guard: MutexGuard<'a, T>,
        select: impl FnOnce(&mut T) -> Option<&mut CondVar>,
    ) -> MutexGuard<'a, T> {
        let mutex = guard.mutex();
        let waiter = match select(&mut *guard) {
            Some(cv) => cv.queue.enqueue_current(),
            None => return guard,
        };
        drop(guard);
        waiter.sleep();
        mutex.lock()
    }

    /// Como `wait`, mas desiste após `timeout`.
    ///
    /// Retorna o guard e `true` se o prazo expirou sem notificação. Em caso de
    /// expiração o waiter é retirado da fila, se a variável ainda existir.
    pub fn wait_timeout<'a, T>(
        mut guard: MutexGuard<'a, T>,
        select: impl Fn(&mut T) -> Option<&mut CondVar>,
        timeout: Duration,
    ) -> (MutexGuard<'a, T>, bool) {
        let mutex = guard.mutex();
        let waiter = match select(&mut *guard) {
            Some(cv) => cv.queue.enqueue_current(),
            None => return (guard, false),
        };
        drop(guard);

        let deadline = Instant::now() + timeout;
        let woken = waiter.sleep_until(deadline);

        let mut guard = mutex.lock();
        if !woken {
            if let Some(cv) = select(&mut *guard) {
                cv.queue.remove(&waiter);
            }
        }
        (guard, !woken)
    }

    /// Acorda uma thread esperando.
    pub fn notify_one(&mut self) -> bool {
        self.queue.wake_one()
    }

    /// Acorda todas as threads esperando.
    pub fn notify_all(&mut self) -> usize {
        self.queue.wake_all()
    }

    /// Número de contextos dormindo nesta variável.
    pub fn waiters(&self) -> usize {
        self.queue.len()
    }
}
