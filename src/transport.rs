// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transport seam between the PDU engine and a concrete bus.
//!
//! [`RtuTransport`](crate::rtu::RtuTransport) is the one shipped
//! implementation; the trait exists so the engine and its tests do not
//! depend on it directly.

use crate::error::Result;

/// Whether a send is carrying a client request or a server response. Some
/// transports (RTU) treat the two identically; others may need to
/// distinguish them (e.g. to decide whether a reply is expected at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendKind {
    Request,
    Response,
}

/// The phase of a (possibly multi-step) receive operation.
///
/// The PDU layer does not know up front how many bytes a frame will occupy
/// — write-multiple requests and read responses carry a byte count inside
/// the frame — so it reads a frame in up to four phases, each carrying its
/// own timeout discipline:
///
/// - [`RecvPhase::StartRequest`] / [`RecvPhase::StartResponse`] read the
///   first byte (the id). A server waits indefinitely for a request; a
///   client waits up to its configured response timeout.
/// - [`RecvPhase::More`] reads interior bytes, each within the
///   inter-character byte timeout of the previous one.
/// - [`RecvPhase::Stop`] reads the final bytes of the PDU (if any) the same
///   way as `More`, then additionally consumes and validates the trailing
///   CRC, or equivalent framing trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvPhase {
    StartRequest,
    StartResponse,
    More,
    Stop,
}

/// The narrow interface the PDU engine uses to move bytes on and off the
/// wire. Implementations own their own framing (address byte, CRC, length
/// prefixes) and timing.
pub trait Transport {
    /// Frame and transmit `pdu`, prefixed by `id`. Returns
    /// [`crate::error::Error::BusBusy`] if the bus did not become idle
    /// within the transport's arbitration timeout.
    fn send(&self, id: u8, pdu: &[u8], kind: SendKind) -> Result<()>;

    /// Read `buf.len()` bytes for the given `phase`, applying that phase's
    /// timeout discipline. For [`RecvPhase::StartRequest`] and
    /// [`RecvPhase::StartResponse`], `buf` must have length 1 and receives
    /// the id byte. [`RecvPhase::Stop`] additionally validates the framing
    /// trailer accumulated since the preceding start phase.
    fn recv(&self, buf: &mut [u8], phase: RecvPhase) -> Result<()>;
}
