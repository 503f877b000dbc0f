//! Drivers
//!
//! Só a serial: destino dos logs do kernel.

pub mod serial;
