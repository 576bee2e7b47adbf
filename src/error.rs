// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Library error type.

use thiserror::Error;

/// A specialized [`Result`] type for Modbus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A callback-supplied error, opaque to the engine.
///
/// Server callbacks return their own error type through a boxed
/// [`std::error::Error`] so a failure in user code can be propagated to the
/// caller of [`crate::engine::Engine::server_listen`] without forcing every
/// callback into the crate's own error type.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Modbus engine errors.
///
/// Exception responses are *not* represented here: a successful exchange
/// whose outcome happens to be a Modbus exception is surfaced through
/// [`crate::frame::Message::exception`], not through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A [`crate::frame::Message`] failed validation before being sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The bus did not become idle within the inter-frame timeout.
    #[error("bus busy")]
    BusBusy,

    /// No byte arrived within the configured timeout.
    #[error("timeout waiting for response")]
    Timeout,

    /// The CRC did not match, or the frame was otherwise malformed.
    #[error("bad message: {0}")]
    BadMessage(&'static str),

    /// The response was well-formed but inconsistent with the request.
    #[error("protocol error: {0}")]
    ProtocolError(&'static str),

    /// A server with this id is already registered.
    #[error("server already registered")]
    Exists,

    /// No server or registration matched.
    #[error("not found")]
    NotFound,

    /// The transport could not be initialized.
    #[error("no device")]
    NoDevice,

    /// The underlying byte transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A server callback returned an application-defined error.
    #[error("callback error: {0}")]
    Callback(#[source] CallbackError),
}
