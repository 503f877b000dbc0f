//! Wait queues para bloqueio e sincronização
//!
//! Permite que contextos durmam aguardando eventos e sejam acordados
//! posteriormente. A fila vive dentro do estado protegido pelo lock grosso:
//! registrar e acordar acontecem sempre sob o lock, então nenhum wakeup se perde
//! entre "checar predicado" e "dormir".

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Instant;

/// Um contexto estacionado numa fila.
pub struct Waiter {
    thread: Thread,
    woken: AtomicBool,
}

impl Waiter {
    fn current() -> Arc<Self> {
        Arc::new(Self {
            thread: thread::current(),
            woken: AtomicBool::new(false),
        })
    }

    fn wake(&self) {
        self.woken.store(true, Ordering::Release);
        self.thread.unpark();
    }

    /// Dorme até ser acordado. Deve ser chamado SEM o lock grosso.
    pub fn sleep(&self) {
        while !self.woken.load(Ordering::Acquire) {
            thread::park();
        }
    }

    /// Dorme até ser acordado ou até `deadline`.
    ///
    /// Retorna `true` se foi acordado.
    pub fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.woken.load(Ordering::Acquire) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return self.woken.load(Ordering::Acquire);
            }
            thread::park_timeout(deadline - now);
        }
    }
}

/// Wait queue - fila FIFO de contextos bloqueados aguardando um evento.
#[derive(Default)]
pub struct WaitQueue {
    waiters: VecDeque<Arc<Waiter>>,
}

impl WaitQueue {
    /// Cria nova waitqueue vazia
    pub const fn new() -> Self {
        Self {
            waiters: VecDeque::new(),
        }
    }

    /// Registra o contexto atual. O chamador solta o lock e chama `sleep`.
    pub fn enqueue_current(&mut self) -> Arc<Waiter> {
        let waiter = Waiter::current();
        self.waiters.push_back(Arc::clone(&waiter));
        waiter
    }

    /// Retira um waiter específico (timeout expirado).
    pub fn remove(&mut self, waiter: &Arc<Waiter>) {
        self.waiters.retain(|w| !Arc::ptr_eq(w, waiter));
    }

    /// Acorda um contexto desta fila.
    ///
    /// Retorna true se acordou alguém.
    pub fn wake_one(&mut self) -> bool {
        match self.waiters.pop_front() {
            Some(waiter) => {
                waiter.wake();
                true
            }
            None => false,
        }
    }

    /// Acorda todos os contextos desta fila.
    ///
    /// Retorna número de contextos acordados.
    pub fn wake_all(&mut self) -> usize {
        let mut count = 0;
        while let Some(waiter) = self.waiters.pop_front() {
            waiter.wake();
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
