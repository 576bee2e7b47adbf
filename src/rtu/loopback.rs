// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory implementation of the [`super::hal`] traits, wiring two
//! [`super::RtuTransport`]s to each other so the engine is exercisable in
//! tests and demos without real UART hardware.
//!
//! This is illustrative reference material, not a hardware driver: the
//! real UART/timer/GPIO bindings are out of scope for this crate (see the
//! crate-level documentation).

use std::{
    collections::VecDeque,
    sync::Arc,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

use super::{
    hal::{ByteRing, IdleLock, TimerService, Uart},
    RtuConfig, RtuTransport,
};

/// A shared, condvar-gated byte queue standing in for a ring buffer fed by
/// a UART receive interrupt.
#[derive(Clone)]
pub struct LoopbackRing {
    state: Arc<(Mutex<VecDeque<u8>>, Condvar)>,
}

impl LoopbackRing {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new((Mutex::new(VecDeque::new()), Condvar::new())),
        }
    }

    fn push(&self, byte: u8) {
        let (queue, cvar) = &*self.state;
        queue.lock().push_back(byte);
        cvar.notify_all();
    }
}

impl Default for LoopbackRing {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteRing for LoopbackRing {
    fn write_one(&self, byte: u8) -> bool {
        self.push(byte);
        true
    }

    fn read_timeout(&self, buf: &mut [u8], timeout: Option<Duration>) -> Result<()> {
        let (queue, cvar) = &*self.state;
        for slot in buf.iter_mut() {
            let mut queue = queue.lock();
            loop {
                if let Some(byte) = queue.pop_front() {
                    *slot = byte;
                    break;
                }
                match timeout {
                    None => cvar.wait(&mut queue),
                    Some(d) => {
                        let timed_out = cvar.wait_for(&mut queue, d).timed_out();
                        if timed_out && queue.is_empty() {
                            return Err(Error::Timeout);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn clear(&self) {
        self.state.0.lock().clear();
    }
}

/// A line driver that hands every written byte directly to the peer's
/// [`LoopbackRing`], as if propagation were instantaneous.
#[derive(Clone)]
pub struct LoopbackUart {
    peer_ring: LoopbackRing,
}

impl LoopbackUart {
    #[must_use]
    pub fn new(peer_ring: LoopbackRing) -> Self {
        Self { peer_ring }
    }
}

impl Uart for LoopbackUart {
    fn write(&self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.peer_ring.write_one(byte);
        }
        Ok(())
    }
}

/// An idle/busy flag a test can drive directly to simulate bus contention.
#[derive(Clone)]
pub struct LoopbackIdle {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl LoopbackIdle {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }
}

impl Default for LoopbackIdle {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleLock for LoopbackIdle {
    fn try_lock_for(&self, timeout: Duration) -> bool {
        let (busy, cvar) = &*self.state;
        let mut busy = busy.lock();
        if *busy && cvar.wait_for(&mut busy, timeout).timed_out() && *busy {
            return false;
        }
        *busy = true;
        true
    }

    fn lock(&self) {
        *self.state.0.lock() = true;
    }

    fn force_unlock(&self) {
        let (busy, cvar) = &*self.state;
        *busy.lock() = false;
        cvar.notify_all();
    }
}

/// A no-op idle timer: this illustrative transport pair never needs to
/// synthesize idle detection, since [`LoopbackRing::read_timeout`] already
/// enforces per-byte gaps directly.
#[derive(Clone, Default)]
pub struct LoopbackTimer;

impl TimerService for LoopbackTimer {
    fn arm(&self, _delay: Duration) {}
    fn cancel(&self) {}
}

/// A fully wired [`RtuTransport`] pair sharing an in-memory bus, one side
/// conventionally playing the client and the other the server.
pub type LoopbackTransport =
    RtuTransport<LoopbackUart, LoopbackRing, LoopbackTimer, LoopbackIdle>;

/// Build a connected pair of loopback transports at the given configuration.
#[must_use]
pub fn pair(config: RtuConfig) -> (LoopbackTransport, LoopbackTransport) {
    let ring_a = LoopbackRing::new();
    let ring_b = LoopbackRing::new();

    let uart_a = LoopbackUart::new(ring_b.clone());
    let uart_b = LoopbackUart::new(ring_a.clone());

    let a = RtuTransport::new(uart_a, ring_a, LoopbackTimer, LoopbackIdle::new(), config);
    let b = RtuTransport::new(uart_b, ring_b, LoopbackTimer, LoopbackIdle::new(), config);
    (a, b)
}
