// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus CRC16 (polynomial 0xA001, LSB-first, initial value 0xFFFF).
//!
//! The transmitted CRC is the final register value in little-endian byte
//! order, with no byte swap. This differs from some Modbus codec
//! implementations that emit the CRC big-endian; RTU wire captures and the
//! Modbus specification agree the low byte goes out first.

/// An incremental CRC16 accumulator, fed one frame's bytes at a time across
/// multiple transport reads.
#[derive(Debug, Clone, Copy)]
pub struct Crc {
    reg: u16,
}

impl Crc {
    #[must_use]
    pub const fn new() -> Self {
        Self { reg: 0xFFFF }
    }

    pub fn update(&mut self, byte: u8) {
        self.reg ^= u16::from(byte);
        for _ in 0..8 {
            if self.reg & 0x0001 != 0 {
                self.reg = (self.reg >> 1) ^ 0xA001;
            } else {
                self.reg >>= 1;
            }
        }
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// The two wire bytes for the current register value, little-endian.
    #[must_use]
    pub const fn finish(self) -> [u8; 2] {
        self.reg.to_le_bytes()
    }
}

impl Default for Crc {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC16 computation over a complete buffer, returned as the two
/// little-endian wire bytes.
#[must_use]
pub fn crc16(bytes: &[u8]) -> [u8; 2] {
    let mut crc = Crc::new();
    crc.update_slice(bytes);
    crc.finish()
}
