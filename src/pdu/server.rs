// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side PDU decoding (requests) and encoding (responses).

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::{Error, Result},
    frame::{Exception, FunctionCode, Message},
    id::Id,
};

use super::EXCEPTION_BIT;

/// The result of decoding an inbound request PDU.
///
/// A request naming a function code outside the closed set this crate
/// implements cannot be represented as a [`Message`] (there is no
/// [`FunctionCode`] variant for it), but a conforming server must still
/// reply with an `IllegalFunction` exception carrying the *original* raw
/// function byte. [`Unrecognized`](DecodedRequest::Unrecognized) carries
/// just enough to do that.
#[derive(Debug)]
pub enum DecodedRequest {
    Known(Message),
    Unrecognized { id: Id, raw_function: u8 },
}

/// Decode an inbound request PDU (function code onward) received for `id`.
///
/// `pdu` is expected to be a [`Bytes`] view frozen from the engine's scratch
/// buffer; for write-multiple requests the returned [`Message::data`]
/// shares that allocation, pointing a server callback directly at the
/// request payload without a copy.
pub fn decode_request(id: Id, pdu: &Bytes) -> Result<DecodedRequest> {
    if pdu.is_empty() {
        return Err(Error::BadMessage("empty request PDU"));
    }
    let raw_func = pdu[0];
    if raw_func & EXCEPTION_BIT != 0 {
        return Err(Error::ProtocolError(
            "inbound request has the exception bit set",
        ));
    }

    let Some(function) = FunctionCode::from_raw(raw_func) else {
        return Ok(DecodedRequest::Unrecognized {
            id,
            raw_function: raw_func,
        });
    };

    let message = match function {
        FunctionCode::ReadCoils
        | FunctionCode::ReadDiscreteInputs
        | FunctionCode::ReadHoldingRegisters
        | FunctionCode::ReadInputRegisters => {
            if pdu.len() < 5 {
                return Err(Error::BadMessage("read request too short"));
            }
            let address = u16::from_be_bytes([pdu[1], pdu[2]]);
            let count = u16::from_be_bytes([pdu[3], pdu[4]]);
            Message::request(id, function, address, count)
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister => {
            if pdu.len() < 5 {
                return Err(Error::BadMessage("write-single request too short"));
            }
            let address = u16::from_be_bytes([pdu[1], pdu[2]]);
            let data = pdu.slice(3..5);
            Message::request_with_data(id, function, address, 0, data)
        }
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleHoldingRegisters => {
            if pdu.len() < 6 {
                return Err(Error::BadMessage("write-multiple request too short"));
            }
            let address = u16::from_be_bytes([pdu[1], pdu[2]]);
            let count = u16::from_be_bytes([pdu[3], pdu[4]]);
            let size = pdu[5] as usize;
            if pdu.len() < 6 + size {
                return Err(Error::BadMessage(
                    "write-multiple request shorter than its size byte",
                ));
            }
            let data = pdu.slice(6..6 + size);
            Message::request_with_data(id, function, address, count, data)
        }
    };
    Ok(DecodedRequest::Known(message))
}

/// Encode a server response for a decoded, known [`Message`].
///
/// If `message.exception` is set, emits the two-byte exception form;
/// otherwise emits the normal response layout for `message.function`.
pub fn encode_response(message: &Message, buf: &mut BytesMut) {
    if message.exception != Exception::None {
        encode_exception(message.function.raw(), message.exception, buf);
        return;
    }

    buf.put_u8(message.function.raw());
    match message.function {
        FunctionCode::ReadCoils
        | FunctionCode::ReadDiscreteInputs
        | FunctionCode::ReadHoldingRegisters
        | FunctionCode::ReadInputRegisters => {
            let size = if message.function.is_bit_oriented() {
                Message::bit_count_to_size(message.count)
            } else {
                Message::reg_count_to_size(message.count)
            } as usize;
            buf.put_u8(size as u8);
            buf.put_slice(&message.data[..size]);
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister => {
            buf.put_u16(message.address);
            buf.put_slice(&message.data[..2]);
        }
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleHoldingRegisters => {
            buf.put_u16(message.address);
            buf.put_u16(message.count);
        }
    }
}

/// Encode a bare exception response from a raw, possibly-unrecognized
/// function code byte — the only response an
/// [`DecodedRequest::Unrecognized`] request can ever receive.
pub fn encode_exception(raw_function: u8, exception: Exception, buf: &mut BytesMut) {
    debug_assert_ne!(exception, Exception::None, "refusing to emit exception=None");
    buf.put_u8(raw_function | EXCEPTION_BIT);
    buf.put_u8(exception.raw());
}
