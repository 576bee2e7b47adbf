// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Engine`]: the process-wide state tying one [`Transport`] to a
//! [`Registry`] of servers and a reusable scratch buffer.

use bytes::{BufMut, BytesMut};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    frame::Message,
    id::Id,
    pdu::{self, client as pdu_client, server as pdu_server, FrameLen},
    server::{CallbackOutcome, Registry, ServerFlags},
    transport::{RecvPhase, SendKind, Transport},
    validate,
};

/// Scratch state guarded by the engine's coarse lock: the PDU buffer and
/// the server registry. Both are mutated only while a single exchange is
/// in flight.
struct EngineState {
    registry: Registry,
}

/// Modbus engine state for one transport.
///
/// At most one exchange (`client_request`, `client_broadcast`, or
/// `server_listen`) may be in flight at a time; [`Engine`] serializes them
/// with an internal lock rather than requiring the caller to do so. The
/// lock is held across the transport send/recv calls *and* across server
/// callback invocation — see the crate-level documentation for why this
/// differs from the original driver, which releases it before dispatch.
pub struct Engine<T> {
    transport: T,
    state: Mutex<EngineState>,
}

impl<T: Transport> Engine<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(EngineState {
                registry: Registry::new(),
            }),
        }
    }

    /// Register a new server on this engine.
    pub fn server_add(
        &self,
        id: Id,
        flags: ServerFlags,
        callback: Box<dyn FnMut(&mut Message) -> CallbackOutcome + Send>,
    ) -> Result<()> {
        self.state.lock().registry.add(id, flags, callback)
    }

    /// Unregister the server with this exact `id`.
    pub fn server_remove(&self, id: Id) -> Result<()> {
        self.state.lock().registry.remove(id)
    }

    /// Send `message` as a client request and block for the matching
    /// response. Returns [`Error::InvalidArgument`] without touching the
    /// wire if `message` fails validation.
    pub fn client_request(&self, message: Message) -> Result<Message> {
        if message.id.is_broadcast() {
            return Err(Error::InvalidArgument(
                "client_request on broadcast id; use client_broadcast",
            ));
        }
        validate::validate(&message)?;

        let state = self.state.lock();
        let mut pdu = BytesMut::with_capacity(253);
        pdu_client::encode_request(&message, &mut pdu);
        self.transport
            .send(message.id.0, &pdu, SendKind::Request)?;
        let response = self.read_response(&message)?;
        drop(state);
        Ok(response)
    }

    /// Send `message` as a broadcast (id 0) request. No response is read;
    /// the transport only transmits.
    pub fn client_broadcast(&self, mut message: Message) -> Result<()> {
        message.id = Id::broadcast();
        validate::validate(&message)?;

        let _state = self.state.lock();
        let mut pdu = BytesMut::with_capacity(253);
        pdu_client::encode_request(&message, &mut pdu);
        self.transport
            .send(Id::broadcast().0, &pdu, SendKind::Request)
    }

    fn read_response(&self, request: &Message) -> Result<Message> {
        let mut id_byte = [0u8; 1];
        self.transport
            .recv(&mut id_byte, RecvPhase::StartResponse)?;
        if id_byte[0] != request.id.0 {
            return Err(Error::ProtocolError(
                "response id does not match request id",
            ));
        }

        let mut func_byte = [0u8; 1];
        self.transport.recv(&mut func_byte, RecvPhase::More)?;

        let mut buf = BytesMut::with_capacity(253);
        buf.put_u8(func_byte[0]);

        if func_byte[0] & pdu::EXCEPTION_BIT != 0 {
            let mut exc = [0u8; 1];
            self.transport.recv(&mut exc, RecvPhase::Stop)?;
            buf.put_u8(exc[0]);
        } else {
            read_frame_len(&self.transport, &mut buf, pdu::response_len(request.function))?;
        }

        let response = pdu_client::decode_response(request, &buf.freeze())?;
        debug!(
            "client_request {} -> exception={:?}",
            request.function, response.exception
        );
        Ok(response)
    }

    /// Block for one inbound request, dispatch it to matching registered
    /// servers, and transmit whichever response (if any) a callback
    /// requested.
    ///
    /// Returns [`Error::NotFound`] if no server is registered for the
    /// inbound id; the frame is still fully read and CRC-checked first, so
    /// the transport stays byte-aligned for the next frame.
    pub fn server_listen(&self) -> Result<()> {
        let mut id_byte = [0u8; 1];
        self.transport
            .recv(&mut id_byte, RecvPhase::StartRequest)?;
        let id = Id(id_byte[0]);

        let has_match = self.state.lock().registry.has_match(id);

        let mut func_byte = [0u8; 1];
        self.transport.recv(&mut func_byte, RecvPhase::More)?;

        if func_byte[0] & pdu::EXCEPTION_BIT != 0 {
            return Err(Error::ProtocolError(
                "inbound request has the exception bit set",
            ));
        }

        let mut buf = BytesMut::with_capacity(253);
        buf.put_u8(func_byte[0]);

        let request_len = crate::frame::FunctionCode::from_raw(func_byte[0])
            .map(pdu::request_len)
            .unwrap_or(FrameLen::Fixed(0));
        read_frame_len(&self.transport, &mut buf, request_len)?;
        let pdu_bytes = buf.freeze();

        if !has_match {
            warn!("no server registered for id {id}, dropping request");
            return Err(Error::NotFound);
        }

        let decoded = pdu_server::decode_request(id, &pdu_bytes)?;

        match decoded {
            pdu_server::DecodedRequest::Unrecognized { raw_function, .. } => {
                if id.is_broadcast() {
                    return Ok(());
                }
                let mut response = BytesMut::with_capacity(2);
                pdu_server::encode_exception(
                    raw_function,
                    crate::frame::Exception::IllegalFunction,
                    &mut response,
                );
                self.transport.send(id.0, &response, SendKind::Response)
            }
            pdu_server::DecodedRequest::Known(mut message) => {
                let replied = self.state.lock().registry.dispatch(&mut message)?;
                if !replied {
                    return Ok(());
                }
                if id.is_broadcast() {
                    warn!("server callback requested a reply to a broadcast request; suppressing it");
                    return Ok(());
                }
                let mut response = BytesMut::with_capacity(253);
                pdu_server::encode_response(&message, &mut response);
                self.transport.send(id.0, &response, SendKind::Response)
            }
        }
    }
}

/// Drive the `More`/`Stop` recv phases needed to fill out the remainder of
/// a frame once its function code byte is already in `buf`, per `len`.
fn read_frame_len<T: Transport>(transport: &T, buf: &mut BytesMut, len: FrameLen) -> Result<()> {
    match len {
        FrameLen::Fixed(n) => {
            let mut rest = vec![0u8; n];
            transport.recv(&mut rest, RecvPhase::Stop)?;
            buf.put_slice(&rest);
        }
        FrameLen::SizePrefixed { prefix, size_at } => {
            let mut pre = vec![0u8; prefix];
            transport.recv(&mut pre, RecvPhase::More)?;
            let size = pre[size_at] as usize;
            buf.put_slice(&pre);
            let mut data = vec![0u8; size];
            transport.recv(&mut data, RecvPhase::Stop)?;
            buf.put_slice(&data);
        }
    }
    Ok(())
}
