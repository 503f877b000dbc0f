//! Mutex - o lock grosso do kernel
//!
//! Envolve `spin::Mutex` com relax por yield. O guard lembra de qual mutex
//! veio, o que permite à `CondVar` soltar e readquirir o lock em volta de uma
//! espera.

use std::ops::{Deref, DerefMut};

type RawMutex<T> = spin::mutex::Mutex<T, spin::relax::Yield>;
type RawGuard<'a, T> = spin::mutex::MutexGuard<'a, T>;

/// Mutex - exclusão mútua sobre todo o estado mutável do núcleo.
pub struct Mutex<T> {
    inner: RawMutex<T>,
}

impl<T> Mutex<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: RawMutex::new(data),
        }
    }

    /// Adquire o lock.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        MutexGuard {
            lock: self,
            guard: self.inner.lock(),
        }
    }

    /// Tenta adquirir sem bloquear
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner
            .try_lock()
            .map(|guard| MutexGuard { lock: self, guard })
    }
}

pub struct MutexGuard<'a, T> {
    lock: &'a Mutex<T>,
    guard: RawGuard<'a, T>,
}

impl<'a, T> MutexGuard<'a, T> {
    /// Mutex de origem (para readquirir após dormir).
    pub fn mutex(&self) -> &'a Mutex<T> {
        self.lock
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
