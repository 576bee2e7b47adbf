// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end exercises of [`modbus_engine::engine::Engine`] against a
//! scripted [`Transport`], covering the concrete scenarios from the
//! crate's wire-format documentation byte-for-byte.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bytes::Bytes;

use modbus_engine::{
    engine::Engine,
    error::Error,
    frame::{Exception, FunctionCode, Message},
    id::Id,
    server::ServerFlags,
    transport::{RecvPhase, SendKind, Transport},
};

/// A scripted transport: `recv` drains a pre-loaded byte stream in order,
/// ignoring the phase's timeout discipline; `send` records every frame
/// transmitted for later assertions. Good enough to drive [`Engine`]
/// through a full exchange without real framing or timing.
struct FakeTransport {
    inbound: RefCell<VecDeque<u8>>,
    sent: Rc<RefCell<Vec<(u8, Vec<u8>)>>>,
}

impl FakeTransport {
    fn with_inbound(bytes: &[u8]) -> Self {
        Self {
            inbound: RefCell::new(bytes.iter().copied().collect()),
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A handle onto the frames this transport has sent, kept by the test
    /// after the transport itself has been moved into an [`Engine`].
    fn sent_handle(&self) -> Rc<RefCell<Vec<(u8, Vec<u8>)>>> {
        Rc::clone(&self.sent)
    }
}

impl Transport for FakeTransport {
    fn send(&self, id: u8, pdu: &[u8], _kind: SendKind) -> modbus_engine::error::Result<()> {
        self.sent.borrow_mut().push((id, pdu.to_vec()));
        Ok(())
    }

    fn recv(&self, buf: &mut [u8], _phase: RecvPhase) -> modbus_engine::error::Result<()> {
        let mut inbound = self.inbound.borrow_mut();
        if inbound.len() < buf.len() {
            return Err(Error::Timeout);
        }
        for slot in buf.iter_mut() {
            *slot = inbound.pop_front().unwrap();
        }
        Ok(())
    }
}

#[test]
fn read_coils_round_trip() {
    // Request PDU `01 00 1D 00 1F`, server reply id=1, PDU `01 04 CD 6B B2 7F`.
    let transport =
        FakeTransport::with_inbound(&[0x01, 0x01, 0x04, 0xCD, 0x6B, 0xB2, 0x7F]);
    let engine = Engine::new(transport);

    let request = Message::request(Id(1), FunctionCode::ReadCoils, 0x001D, 31);
    let response = engine.client_request(request).unwrap();

    assert_eq!(response.exception, Exception::None);
    assert_eq!(&response.data[..], &[0xCD, 0x6B, 0xB2, 0x7F]);
}

#[test]
fn read_holding_registers_round_trip() {
    let transport = FakeTransport::with_inbound(&[
        0x01, 0x03, 0x06, 0xAE, 0x41, 0x56, 0x52, 0x43, 0x40,
    ]);
    let engine = Engine::new(transport);

    let request = Message::request(Id(1), FunctionCode::ReadHoldingRegisters, 0x006F, 3);
    let response = engine.client_request(request).unwrap();

    assert_eq!(&response.data[..], &[0xAE, 0x41, 0x56, 0x52, 0x43, 0x40]);
}

#[test]
fn write_single_coil_echo() {
    let transport = FakeTransport::with_inbound(&[0x01, 0x05, 0x00, 0xBF, 0xFF, 0x00]);
    let engine = Engine::new(transport);

    let request = Message::request_with_data(
        Id(1),
        FunctionCode::WriteSingleCoil,
        0x00BF,
        0,
        Bytes::from_static(&[0xFF, 0x00]),
    );
    let response = engine.client_request(request).unwrap();

    assert_eq!(response.address, 0x00BF);
    assert_eq!(&response.data[..], &[0xFF, 0x00]);
}

#[test]
fn write_multiple_holding_registers_round_trip() {
    let transport = FakeTransport::with_inbound(&[0x01, 0x10, 0x00, 0x12, 0x00, 0x02]);
    let engine = Engine::new(transport);

    let request = Message::request_with_data(
        Id(1),
        FunctionCode::WriteMultipleHoldingRegisters,
        0x0012,
        2,
        Bytes::from_static(&[0x0B, 0x0A, 0xC1, 0x02]),
    );
    let response = engine.client_request(request).unwrap();

    assert_eq!(response.address, 0x0012);
    assert_eq!(response.count, 2);
}

#[test]
fn exception_response_surfaces_as_data_not_error() {
    let transport = FakeTransport::with_inbound(&[0x01, 0x81, 0x02]);
    let engine = Engine::new(transport);

    let request = Message::request(Id(1), FunctionCode::ReadCoils, 0x0100, 10);
    let response = engine.client_request(request).unwrap();

    assert_eq!(response.exception, Exception::IllegalAddress);
}

#[test]
fn client_sees_mismatched_response_id_as_protocol_error() {
    // The frame claims to come from id 2, but the request went to id 1.
    let transport = FakeTransport::with_inbound(&[0x02, 0x01, 0x04, 0xCD, 0x6B, 0xB2, 0x7F]);
    let engine = Engine::new(transport);

    let request = Message::request(Id(1), FunctionCode::ReadCoils, 0x001D, 31);
    let err = engine.client_request(request).unwrap_err();
    assert!(matches!(err, Error::ProtocolError(_)));
}

#[test]
fn unknown_function_code_gets_illegal_function_exception() {
    // A server sees a raw function byte this crate has no FunctionCode
    // variant for; a conforming server still owes it an exception
    // response carrying the original raw byte.
    let transport = FakeTransport::with_inbound(&[0x01, 0x2B]);
    let sent = transport.sent_handle();
    let engine = Engine::new(transport);

    engine
        .server_add(Id(1), ServerFlags::default(), Box::new(|_| Ok(false)))
        .unwrap();

    engine.server_listen().unwrap();

    assert_eq!(*sent.borrow(), vec![(0x01, vec![0xAB, 0x01])]);
}

#[test]
fn broadcast_request_elicits_no_wire_reply() {
    let transport = FakeTransport::with_inbound(&[0x00, 0x01, 0x00, 0x1D, 0x00, 0x1F]);
    let sent = transport.sent_handle();
    let engine = Engine::new(transport);

    engine
        .server_add(
            Id(9),
            ServerFlags {
                receive_broadcast: true,
                receive_any: false,
            },
            Box::new(|message| {
                message.data = Bytes::from_static(&[0xCD]);
                Ok(true)
            }),
        )
        .unwrap();

    engine.server_listen().unwrap();

    assert!(sent.borrow().is_empty());
}

#[test]
fn no_registered_server_returns_not_found_but_drains_the_frame() {
    let transport = FakeTransport::with_inbound(&[0x01, 0x01, 0x00, 0x1D, 0x00, 0x1F]);
    let engine = Engine::new(transport);

    let err = engine.server_listen().unwrap_err();
    assert!(matches!(err, Error::NotFound));
}

#[test]
fn reply_from_exact_match_does_not_skip_receive_any_entry() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let exact_ran = Arc::new(AtomicBool::new(false));
    let any_ran = Arc::new(AtomicBool::new(false));
    let exact_ran_in_callback = Arc::clone(&exact_ran);
    let any_ran_in_callback = Arc::clone(&any_ran);

    let transport = FakeTransport::with_inbound(&[0x01, 0x01, 0x00, 0x1D, 0x00, 0x1F]);
    let sent = transport.sent_handle();
    let engine = Engine::new(transport);

    // Exact match on id 1, asking to reply.
    engine
        .server_add(
            Id(1),
            ServerFlags::default(),
            Box::new(move |message| {
                exact_ran_in_callback.store(true, Ordering::SeqCst);
                message.data = Bytes::from_static(&[0xCD, 0x6B, 0xB2, 0x7F]);
                Ok(true)
            }),
        )
        .unwrap();
    // A promiscuous entry that also sees this request and must still run
    // even though the entry above already asked to reply.
    engine
        .server_add(
            Id(2),
            ServerFlags {
                receive_broadcast: false,
                receive_any: true,
            },
            Box::new(move |_message| {
                any_ran_in_callback.store(true, Ordering::SeqCst);
                Ok(false)
            }),
        )
        .unwrap();

    engine.server_listen().unwrap();

    assert!(exact_ran.load(Ordering::SeqCst));
    assert!(
        any_ran.load(Ordering::SeqCst),
        "a reply requested by the exact-id entry must not short-circuit dispatch to the receive_any entry"
    );
    assert_eq!(
        *sent.borrow(),
        vec![(0x01, vec![0x01, 0x04, 0xCD, 0x6B, 0xB2, 0x7F])]
    );
}

#[test]
fn callback_error_propagates_to_server_listen_caller() {
    #[derive(Debug)]
    struct Boom;
    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }
    impl std::error::Error for Boom {}

    let transport = FakeTransport::with_inbound(&[0x01, 0x01, 0x00, 0x1D, 0x00, 0x1F]);
    let engine = Engine::new(transport);

    engine
        .server_add(Id(1), ServerFlags::default(), Box::new(|_| Err(Box::new(Boom))))
        .unwrap();

    let err = engine.server_listen().unwrap_err();
    assert!(matches!(err, Error::Callback(_)));
}
