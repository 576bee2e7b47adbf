// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Modbus data model: function codes, exceptions, and the [`Message`]
//! type shared by client requests, server requests, and responses.

use std::fmt;

use bytes::Bytes;

use crate::id::Id;

/// A Modbus function code.
///
/// Only the ten codes below are recognized by the PDU codec; any other
/// on-wire function code decodes to an [`crate::error::Error::ProtocolError`]
/// on the client side, or is handed to the registry as an opaque code on the
/// server side so a callback can reply with `IllegalFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleHoldingRegister,
    WriteMultipleCoils,
    WriteMultipleHoldingRegisters,
}

impl FunctionCode {
    /// The raw on-wire function code byte (bit 7 clear).
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleHoldingRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleHoldingRegisters => 0x10,
        }
    }

    /// Resolve a raw on-wire function code byte (exception bit already
    /// stripped) to a known [`FunctionCode`].
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::ReadCoils,
            0x02 => Self::ReadDiscreteInputs,
            0x03 => Self::ReadHoldingRegisters,
            0x04 => Self::ReadInputRegisters,
            0x05 => Self::WriteSingleCoil,
            0x06 => Self::WriteSingleHoldingRegister,
            0x0F => Self::WriteMultipleCoils,
            0x10 => Self::WriteMultipleHoldingRegisters,
            _ => return None,
        })
    }

    /// Whether this code addresses single-bit coils/discrete inputs.
    #[must_use]
    pub const fn is_bit_oriented(self) -> bool {
        matches!(
            self,
            Self::ReadCoils | Self::ReadDiscreteInputs | Self::WriteMultipleCoils
        )
    }

    /// Whether the request for this code carries a variable-length payload
    /// (the "write multiple" codes).
    #[must_use]
    pub const fn is_write_multiple(self) -> bool {
        matches!(
            self,
            Self::WriteMultipleCoils | Self::WriteMultipleHoldingRegisters
        )
    }

    /// Whether this code is a read request (response carries a byte-count
    /// prefixed data block).
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadCoils
                | Self::ReadDiscreteInputs
                | Self::ReadHoldingRegisters
                | Self::ReadInputRegisters
        )
    }

    /// The inclusive legal range for a request's `count` field.
    #[must_use]
    pub const fn count_range(self) -> (u16, u16) {
        match self {
            Self::ReadCoils | Self::ReadDiscreteInputs => (1, 2000),
            Self::ReadHoldingRegisters | Self::ReadInputRegisters => (1, 125),
            Self::WriteMultipleCoils => (1, 1968),
            Self::WriteMultipleHoldingRegisters => (1, 123),
            Self::WriteSingleCoil | Self::WriteSingleHoldingRegister => (1, 1),
        }
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (0x{:02X})", self.raw())
    }
}

/// A Modbus exception code, returned by a server in place of a normal
/// response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exception {
    /// No exception: this is a normal response.
    None,
    IllegalFunction,
    IllegalAddress,
    IllegalValue,
    ServerFailure,
    Acknowledge,
    ServerBusy,
    NegativeAcknowledge,
    MemoryParityError,
}

impl Exception {
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::IllegalFunction => 0x01,
            Self::IllegalAddress => 0x02,
            Self::IllegalValue => 0x03,
            Self::ServerFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::ServerBusy => 0x06,
            Self::NegativeAcknowledge => 0x07,
            Self::MemoryParityError => 0x08,
        }
    }

    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => Self::None,
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalAddress,
            0x03 => Self::IllegalValue,
            0x04 => Self::ServerFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::ServerBusy,
            0x07 => Self::NegativeAcknowledge,
            0x08 => Self::MemoryParityError,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::None => "no exception",
            Self::IllegalFunction => "illegal function",
            Self::IllegalAddress => "illegal data address",
            Self::IllegalValue => "illegal data value",
            Self::ServerFailure => "server device failure",
            Self::Acknowledge => "acknowledge",
            Self::ServerBusy => "server device busy",
            Self::NegativeAcknowledge => "negative acknowledge",
            Self::MemoryParityError => "memory parity error",
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The unit of logical exchange between a client and a server: the same
/// shape is used for requests, responses, and server callback arguments.
///
/// `data` may be a zero-copy view into the engine's scratch buffer (see the
/// crate-level documentation for why `Bytes` is used instead of a borrowed
/// pointer) or an independently owned buffer.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Id,
    pub function: FunctionCode,
    pub address: u16,
    pub count: u16,
    pub exception: Exception,
    pub data: Bytes,
}

impl Message {
    /// Build a bare request with no payload (reads, and the prefix of
    /// writes) ready for the validator and PDU encoder.
    #[must_use]
    pub fn request(id: Id, function: FunctionCode, address: u16, count: u16) -> Self {
        Self {
            id,
            function,
            address,
            count,
            exception: Exception::None,
            data: Bytes::new(),
        }
    }

    /// Build a request carrying a payload (`WriteSingleCoil`,
    /// `WriteSingleHoldingRegister`, or one of the write-multiple codes).
    #[must_use]
    pub fn request_with_data(
        id: Id,
        function: FunctionCode,
        address: u16,
        count: u16,
        data: Bytes,
    ) -> Self {
        Self {
            id,
            function,
            address,
            count,
            exception: Exception::None,
            data,
        }
    }

    /// Number of bytes needed to hold `count` coils: `ceil(count / 8)`.
    #[must_use]
    pub const fn bit_count_to_size(count: u16) -> u16 {
        (count + 7) / 8
    }

    /// Number of bytes needed to hold `count` 16-bit registers: `count * 2`.
    #[must_use]
    pub const fn reg_count_to_size(count: u16) -> u16 {
        count * 2
    }

    /// Whether this message represents an exception response.
    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.exception != Exception::None
    }
}
