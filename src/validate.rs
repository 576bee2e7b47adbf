// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message validator: a pure, side-effect-free check that a
//! [`Message`] is internally consistent for its function code.

use crate::{
    error::{Error, Result},
    frame::{Exception, FunctionCode, Message},
    id::Id,
};

/// Validate a [`Message`] before it is encoded onto the wire.
///
/// Applies the rules in order, returning the first violation found as
/// [`Error::InvalidArgument`].
pub fn validate(message: &Message) -> Result<()> {
    if message.id.0 > Id::max_device().0 && !message.id.is_broadcast() {
        return Err(Error::InvalidArgument("id out of range"));
    }

    if message.function.raw() & 0x80 != 0 {
        return Err(Error::InvalidArgument("function code exception bit set"));
    }

    if message.exception != Exception::None {
        if message.id.is_broadcast() {
            return Err(Error::InvalidArgument("broadcast message has exception"));
        }
        return Ok(());
    }

    let (min, max) = message.function.count_range();

    match message.function {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            check_count(message.count, min, max)?;
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            check_count(message.count, min, max)?;
        }
        FunctionCode::WriteMultipleCoils => {
            check_count(message.count, min, max)?;
            let need = Message::bit_count_to_size(message.count) as usize;
            if message.data.len() < need {
                return Err(Error::InvalidArgument("coil data shorter than count"));
            }
        }
        FunctionCode::WriteMultipleHoldingRegisters => {
            check_count(message.count, min, max)?;
            let need = Message::reg_count_to_size(message.count) as usize;
            if message.data.len() < need {
                return Err(Error::InvalidArgument("register data shorter than count"));
            }
        }
        FunctionCode::WriteSingleCoil => {
            if message.data.len() < 2 {
                return Err(Error::InvalidArgument("single coil payload too short"));
            }
            match (message.data[0], message.data[1]) {
                (0xFF, 0x00) | (0x00, 0x00) => {}
                _ => return Err(Error::InvalidArgument("single coil value must be ON/OFF")),
            }
        }
        FunctionCode::WriteSingleHoldingRegister => {
            if message.data.len() < 2 {
                return Err(Error::InvalidArgument("single register payload too short"));
            }
        }
    }

    Ok(())
}

fn check_count(count: u16, min: u16, max: u16) -> Result<()> {
    if count < min || count > max {
        return Err(Error::InvalidArgument("count out of range for function"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn read_coils_in_range() {
        let m = Message::request(Id(1), FunctionCode::ReadCoils, 0x001D, 31);
        assert!(validate(&m).is_ok());
    }

    #[test]
    fn read_coils_zero_count_rejected() {
        let m = Message::request(Id(1), FunctionCode::ReadCoils, 0, 0);
        assert!(validate(&m).is_err());
    }

    #[test]
    fn write_multiple_holding_registers_cap_is_123() {
        let m = Message::request_with_data(
            Id(1),
            FunctionCode::WriteMultipleHoldingRegisters,
            0,
            124,
            Bytes::from(vec![0u8; 248]),
        );
        assert!(validate(&m).is_err());

        let m = Message::request_with_data(
            Id(1),
            FunctionCode::WriteMultipleHoldingRegisters,
            0,
            123,
            Bytes::from(vec![0u8; 246]),
        );
        assert!(validate(&m).is_ok());
    }

    #[test]
    fn write_single_coil_values() {
        let on = Message::request_with_data(
            Id(1),
            FunctionCode::WriteSingleCoil,
            0x00BF,
            0,
            Bytes::from_static(&[0xFF, 0x00]),
        );
        assert!(validate(&on).is_ok());

        let off = Message::request_with_data(
            Id(1),
            FunctionCode::WriteSingleCoil,
            0x00BF,
            0,
            Bytes::from_static(&[0x00, 0x00]),
        );
        assert!(validate(&off).is_ok());

        let bad = Message::request_with_data(
            Id(1),
            FunctionCode::WriteSingleCoil,
            0x00BF,
            0,
            Bytes::from_static(&[0x12, 0x34]),
        );
        assert!(validate(&bad).is_err());
    }

    #[test]
    fn broadcast_with_exception_rejected() {
        let mut m = Message::request(Id::broadcast(), FunctionCode::ReadCoils, 0, 1);
        m.exception = Exception::IllegalFunction;
        assert!(validate(&m).is_err());
    }
}
