// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus-RTU: serial framing, timing, CRC, and half-duplex arbitration
//! over the [`hal`] traits.

pub mod crc;
pub mod hal;
pub mod loopback;

use std::cell::Cell;
use std::time::Duration;

use log::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    transport::{RecvPhase, SendKind, Transport},
};

use self::{
    crc::Crc,
    hal::{ByteRing, IdleLock, NoRts, RtsLine, TimerService, Uart},
};

/// One character time, `byte_timeout`, and `frame_timeout`, precomputed
/// once for a given baud rate rather than on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub char_time: Duration,
    pub byte_timeout: Duration,
    pub frame_timeout: Duration,
}

impl Timing {
    /// Derive timing from a baud rate, per the 11-bit-frame assumption (1
    /// start bit, 8 data bits, 1 parity/stop, 1 stop — approximated here,
    /// as the original driver does, as 10 bit times per character).
    #[must_use]
    pub fn from_baud_rate(baud: u32) -> Self {
        let char_us = 10_000_000u64.div_ceil(u64::from(baud));
        let char_time = Duration::from_micros(char_us);

        let (byte_timeout, frame_timeout) = if baud <= 19_200 {
            let byte = char_us.saturating_mul(3).div_ceil(2) + char_us;
            let frame = char_us.saturating_mul(7).div_ceil(2) + char_us;
            (Duration::from_micros(byte), Duration::from_micros(frame))
        } else {
            (
                Duration::from_micros(750 + char_us),
                Duration::from_micros(1750 + char_us),
            )
        };

        Self {
            char_time,
            byte_timeout,
            frame_timeout,
        }
    }
}

/// Construction-time configuration for an [`RtuTransport`].
#[derive(Debug, Clone, Copy)]
pub struct RtuConfig {
    pub baud_rate: u32,
    pub response_timeout: Duration,
}

impl RtuConfig {
    #[must_use]
    pub fn new(baud_rate: u32, response_timeout: Duration) -> Self {
        Self {
            baud_rate,
            response_timeout,
        }
    }
}

/// A Modbus-RTU transport over a UART, byte ring, idle timer, and idle
/// lock, optionally driving an RTS line for half-duplex transceivers.
///
/// Generic over its hardware bindings so the same logic serves both real
/// hardware and the in-memory [`loopback`] implementation used in tests and
/// demos.
pub struct RtuTransport<U, R, T, L, G = NoRts> {
    uart: U,
    ring: R,
    timer: T,
    idle_lock: L,
    rts: G,
    timing: Timing,
    response_timeout: Duration,
    crc: Cell<Crc>,
}

impl<U, R, T, L> RtuTransport<U, R, T, L, NoRts>
where
    U: Uart,
    R: ByteRing,
    T: TimerService,
    L: IdleLock,
{
    /// Build a transport with no RTS line (transceivers that switch
    /// direction automatically, or a direct wired connection).
    pub fn new(uart: U, ring: R, timer: T, idle_lock: L, config: RtuConfig) -> Self {
        Self::with_rts(uart, ring, timer, idle_lock, NoRts, config)
    }
}

impl<U, R, T, L, G> RtuTransport<U, R, T, L, G>
where
    U: Uart,
    R: ByteRing,
    T: TimerService,
    L: IdleLock,
    G: RtsLine,
{
    pub fn with_rts(uart: U, ring: R, timer: T, idle_lock: L, rts: G, config: RtuConfig) -> Self {
        let timing = Timing::from_baud_rate(config.baud_rate);
        debug!(
            "RTU transport initialized at {} bps: char={:?} byte_timeout={:?} frame_timeout={:?}",
            config.baud_rate, timing.char_time, timing.byte_timeout, timing.frame_timeout
        );
        Self {
            uart,
            ring,
            timer,
            idle_lock,
            rts,
            timing,
            response_timeout: config.response_timeout,
            crc: Cell::new(Crc::new()),
        }
    }

    #[must_use]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// The ISR-context entry point: a byte has arrived on the wire. Pushes
    /// it into the ring, marks the bus busy, and (re-)arms the idle timer
    /// for `frame_timeout`.
    pub fn on_byte_received(&self, byte: u8) {
        if !self.ring.write_one(byte) {
            warn!("RTU receive ring full, dropping byte 0x{byte:02X}");
        }
        self.idle_lock.lock();
        self.timer.arm(self.timing.frame_timeout);
    }

    /// The idle-timer expiry callback: the bus has been silent for
    /// `frame_timeout`. Clears the ring and marks the bus idle.
    pub fn on_idle_timeout(&self) {
        self.ring.clear();
        self.idle_lock.force_unlock();
        trace!("RTU bus idle");
    }

    fn update_crc(&self, bytes: &[u8]) {
        let mut crc = self.crc.get();
        crc.update_slice(bytes);
        self.crc.set(crc);
    }
}

impl<U, R, T, L, G> Transport for RtuTransport<U, R, T, L, G>
where
    U: Uart,
    R: ByteRing,
    T: TimerService,
    L: IdleLock,
    G: RtsLine,
{
    fn send(&self, id: u8, pdu: &[u8], _kind: SendKind) -> Result<()> {
        if !self.idle_lock.try_lock_for(self.timing.frame_timeout) {
            return Err(Error::BusBusy);
        }

        let mut crc = Crc::new();
        crc.update(id);
        crc.update_slice(pdu);

        let mut frame = Vec::with_capacity(1 + pdu.len() + 2);
        frame.push(id);
        frame.extend_from_slice(pdu);
        frame.extend_from_slice(&crc.finish());

        self.rts.assert();
        let result = self.uart.write(&frame);
        self.rts.deassert();

        self.timer.arm(self.timing.frame_timeout);
        result
    }

    fn recv(&self, buf: &mut [u8], phase: RecvPhase) -> Result<()> {
        match phase {
            RecvPhase::StartRequest => {
                assert_eq!(buf.len(), 1, "start phase reads exactly the id byte");
                self.ring.read_timeout(buf, None)?;
                self.crc.set(Crc::new());
                self.update_crc(buf);
            }
            RecvPhase::StartResponse => {
                assert_eq!(buf.len(), 1, "start phase reads exactly the id byte");
                self.ring
                    .read_timeout(buf, Some(self.response_timeout))?;
                self.crc.set(Crc::new());
                self.update_crc(buf);
            }
            RecvPhase::More => {
                self.ring
                    .read_timeout(buf, Some(self.timing.byte_timeout))?;
                self.update_crc(buf);
            }
            RecvPhase::Stop => {
                if !buf.is_empty() {
                    self.ring
                        .read_timeout(buf, Some(self.timing.byte_timeout))?;
                    self.update_crc(buf);
                }
                let mut wire_crc = [0u8; 2];
                self.ring
                    .read_timeout(&mut wire_crc, Some(self.timing.byte_timeout))?;
                let computed = self.crc.get().finish();
                if wire_crc != computed {
                    return Err(Error::BadMessage("CRC mismatch"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_at_9600_baud() {
        let t = Timing::from_baud_rate(9600);
        // char_time = 10_000_000 / 9600 ~= 1042 us
        assert_eq!(t.char_time, Duration::from_micros(1042));
    }

    #[test]
    fn timing_above_19200_is_fixed() {
        let t = Timing::from_baud_rate(115_200);
        let char_us = 10_000_000u64.div_ceil(115_200);
        assert_eq!(t.byte_timeout, Duration::from_micros(750 + char_us));
        assert_eq!(t.frame_timeout, Duration::from_micros(1750 + char_us));
    }
}
