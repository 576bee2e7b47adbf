// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side PDU encoding (requests) and decoding (responses).

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    error::{Error, Result},
    frame::{Exception, FunctionCode, Message},
    validate,
};

use super::EXCEPTION_BIT;

/// Serialize a client request's PDU (function code onward) into `buf`.
///
/// The caller is responsible for validating `message` first; this function
/// does not re-validate.
pub fn encode_request(message: &Message, buf: &mut BytesMut) {
    buf.put_u8(message.function.raw());
    match message.function {
        FunctionCode::ReadCoils
        | FunctionCode::ReadDiscreteInputs
        | FunctionCode::ReadHoldingRegisters
        | FunctionCode::ReadInputRegisters => {
            buf.put_u16(message.address);
            buf.put_u16(message.count);
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister => {
            buf.put_u16(message.address);
            buf.put_slice(&message.data[..2]);
        }
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleHoldingRegisters => {
            let size = if message.function.is_bit_oriented() {
                Message::bit_count_to_size(message.count)
            } else {
                Message::reg_count_to_size(message.count)
            } as usize;
            buf.put_u16(message.address);
            buf.put_u16(message.count);
            buf.put_u8(size as u8);
            buf.put_slice(&message.data[..size]);
        }
    }
}

/// Validate `message`, then serialize its request PDU into `buf`.
pub fn prepare_request(message: &Message, buf: &mut BytesMut) -> Result<()> {
    validate::validate(message)?;
    encode_request(message, buf);
    Ok(())
}

/// Decode a server's response `pdu` (function-or-exception byte onward)
/// against the `request` that elicited it.
///
/// `pdu` is expected to be a [`Bytes`] view frozen from the engine's scratch
/// buffer; the returned [`Message::data`] shares that allocation rather than
/// copying, giving the zero-copy behavior the scratch buffer is for.
pub fn decode_response(request: &Message, pdu: &Bytes) -> Result<Message> {
    if pdu.is_empty() {
        return Err(Error::BadMessage("empty response PDU"));
    }
    let raw_func = pdu[0];

    if raw_func & EXCEPTION_BIT != 0 {
        if raw_func & !EXCEPTION_BIT != request.function.raw() {
            return Err(Error::ProtocolError(
                "exception response function code mismatch",
            ));
        }
        if pdu.len() < 2 {
            return Err(Error::BadMessage("exception response missing code"));
        }
        let exception = Exception::from_raw(pdu[1])
            .filter(|e| *e != Exception::None)
            .ok_or(Error::ProtocolError("exception code is None or unknown"))?;
        return Ok(Message {
            id: request.id,
            function: request.function,
            address: request.address,
            count: request.count,
            exception,
            data: Bytes::new(),
        });
    }

    if raw_func != request.function.raw() {
        return Err(Error::ProtocolError("response function code mismatch"));
    }

    match request.function {
        FunctionCode::ReadCoils
        | FunctionCode::ReadDiscreteInputs
        | FunctionCode::ReadHoldingRegisters
        | FunctionCode::ReadInputRegisters => {
            if pdu.len() < 2 {
                return Err(Error::BadMessage("read response missing size byte"));
            }
            let size = pdu[1] as usize;
            let expected = if request.function.is_bit_oriented() {
                Message::bit_count_to_size(request.count)
            } else {
                Message::reg_count_to_size(request.count)
            } as usize;
            if size != expected {
                return Err(Error::ProtocolError("read response size disagrees with count"));
            }
            if pdu.len() < 2 + size {
                return Err(Error::BadMessage("read response shorter than its size byte"));
            }
            let data = pdu.slice(2..2 + size);
            Ok(Message {
                id: request.id,
                function: request.function,
                address: request.address,
                count: request.count,
                exception: Exception::None,
                data,
            })
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleHoldingRegister => {
            if pdu.len() < 5 {
                return Err(Error::BadMessage("write-single echo too short"));
            }
            let address = u16::from_be_bytes([pdu[1], pdu[2]]);
            if address != request.address {
                return Err(Error::ProtocolError("write-single echoed wrong address"));
            }
            let data = pdu.slice(3..5);
            if data[..] != request.data[..2] {
                return Err(Error::ProtocolError("write-single echoed wrong value"));
            }
            Ok(Message {
                id: request.id,
                function: request.function,
                address,
                count: request.count,
                exception: Exception::None,
                data,
            })
        }
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleHoldingRegisters => {
            if pdu.len() < 5 {
                return Err(Error::BadMessage("write-multiple response too short"));
            }
            let address = u16::from_be_bytes([pdu[1], pdu[2]]);
            let count = u16::from_be_bytes([pdu[3], pdu[4]]);
            if address != request.address || count != request.count {
                return Err(Error::ProtocolError(
                    "write-multiple response echoed wrong address/count",
                ));
            }
            Ok(Message {
                id: request.id,
                function: request.function,
                address,
                count,
                exception: Exception::None,
                data: Bytes::new(),
            })
        }
    }
}
