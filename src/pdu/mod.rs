// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol data unit encoding and decoding.
//!
//! A PDU starts at the byte immediately following the transport's id byte.
//! Multi-byte integers are big-endian on the wire. See the crate
//! documentation for the per-function-code layout table.

pub mod client;
pub mod server;

use crate::frame::FunctionCode;

/// Exception responses: `func | 0x80` followed by the exception byte.
pub const EXCEPTION_BIT: u8 = 0x80;

/// How many bytes a frame occupies, used by the receive orchestration to
/// know how many bytes to ask the transport for before it can tell whether
/// more bytes remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLen {
    /// The frame (after the function code byte) has exactly this many more
    /// bytes, independent of its contents.
    Fixed(usize),
    /// `prefix` more bytes must be read first; the last of those bytes (at
    /// index `size_at`, counted from the function code byte at index 0) is
    /// itself a count of further bytes still to come.
    SizePrefixed { prefix: usize, size_at: usize },
}

/// Bytes remaining after the function code for a normal (non-exception)
/// response to `function`, not counting the function code byte itself.
#[must_use]
pub fn response_len(function: FunctionCode) -> FrameLen {
    if function.is_read() {
        FrameLen::SizePrefixed {
            prefix: 1,
            size_at: 0,
        }
    } else {
        // WriteSingleCoil/WriteSingleHoldingRegister echo addr+value (4
        // bytes); WriteMultipleCoils/WriteMultipleHoldingRegisters reply
        // with addr+count (4 bytes). Both are fixed-length.
        FrameLen::Fixed(4)
    }
}

/// Bytes remaining after the function code for a request of `function`, not
/// counting the function code byte itself.
#[must_use]
pub fn request_len(function: FunctionCode) -> FrameLen {
    if function.is_write_multiple() {
        FrameLen::SizePrefixed {
            prefix: 4,
            size_at: 4,
        }
    } else {
        // addr(2) + count-or-value(2), for every other code.
        FrameLen::Fixed(4)
    }
}
