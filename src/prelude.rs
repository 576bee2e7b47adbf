// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types re-exported for convenient `use modbus_engine::prelude::*;`.

///////////////////////////////////////////////////////////////////
/// Data model
///////////////////////////////////////////////////////////////////
pub use crate::frame::{Exception, FunctionCode, Message};
pub use crate::id::Id;

///////////////////////////////////////////////////////////////////
/// Errors
///////////////////////////////////////////////////////////////////
pub use crate::error::{CallbackError, Error, Result};

///////////////////////////////////////////////////////////////////
/// Engine, transport and registry
///////////////////////////////////////////////////////////////////
pub use crate::engine::Engine;
pub use crate::server::{CallbackOutcome, Registry, ServerFlags};
pub use crate::transport::{RecvPhase, SendKind, Transport};

///////////////////////////////////////////////////////////////////
/// RTU transport
///////////////////////////////////////////////////////////////////
pub use crate::rtu::{RtuConfig, RtuTransport, Timing};
