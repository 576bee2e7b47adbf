// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bit-packing helpers for server callbacks.
//!
//! These mirror the original driver's `modbus_copy_bits`/`modbus_copy_bit`
//! family: packing and unpacking coil/discrete-input bitfields to and from
//! the byte-oriented wire representation, LSB of the first byte first. The
//! PDU codec itself does not use them — it reads and writes
//! [`crate::frame::Message::data`] as an already byte-packed buffer
//! directly — but a server callback building or inspecting a response in
//! terms of individual coils/registers rather than raw bytes will want
//! them, the same way the original's application-level examples do.

/// Pack `count` booleans into Modbus's little-endian-bit byte layout.
///
/// The returned `Vec` has length `ceil(count / 8)`; unused high bits of the
/// final byte are zero, matching the convention every PDU response uses for
/// its trailing partial byte.
#[must_use]
pub fn pack_coils(coils: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; (coils.len() + 7) / 8];
    for (i, &bit) in coils.iter().enumerate() {
        if bit {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

/// Unpack up to `count` booleans from a Modbus bitfield byte slice.
#[must_use]
pub fn unpack_coils(bytes: &[u8], count: u16) -> Vec<bool> {
    (0..count as usize)
        .map(|i| bytes.get(i / 8).is_some_and(|byte| byte & (1 << (i % 8)) != 0))
        .collect()
}

/// Read a single coil's value out of a packed bitfield at bit offset `bit`.
#[must_use]
pub fn copy_bit(bytes: &[u8], bit: usize) -> bool {
    bytes
        .get(bit / 8)
        .is_some_and(|byte| byte & (1 << (bit % 8)) != 0)
}

/// Copy `count` bits from `src` (starting at bit offset `src_bit`) into
/// `dst` (starting at bit offset `dst_bit`), zeroing the destination bytes
/// touched first. This mirrors the original driver's
/// padded-destination copy used when assembling a read response into a
/// buffer that was not pre-zeroed by the caller.
pub fn copy_bits(dst: &mut [u8], dst_bit: usize, src: &[u8], src_bit: usize, count: usize) {
    let dst_bytes = (dst_bit + count + 7) / 8;
    for byte in dst.iter_mut().take(dst_bytes) {
        *byte = 0;
    }
    for i in 0..count {
        if copy_bit(src, src_bit + i) {
            dst[(dst_bit + i) / 8] |= 1 << ((dst_bit + i) % 8);
        }
    }
}

/// Read a big-endian 16-bit register at register index `reg` (not byte
/// offset) from a packed register byte slice.
#[must_use]
pub fn copy_reg(bytes: &[u8], reg: usize) -> u16 {
    let off = reg * 2;
    u16::from_be_bytes([bytes[off], bytes[off + 1]])
}

/// Copy `count` 16-bit big-endian registers from `src` into `dst`.
pub fn copy_regs(dst: &mut [u8], src: &[u8], count: usize) {
    dst[..count * 2].copy_from_slice(&src[..count * 2]);
}
