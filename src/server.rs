// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The server registry: which logical Modbus servers are listening on this
//! engine, and the dispatch rules for routing an inbound request to them.

use crate::{
    error::{CallbackError, Error, Result},
    frame::Message,
    id::Id,
};

/// Which requests, besides ones addressed exactly to its own id, a server
/// entry additionally wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerFlags {
    /// Also receive broadcast (id 0) requests.
    pub receive_broadcast: bool,
    /// Receive every request regardless of id (promiscuous/gateway mode).
    pub receive_any: bool,
}

/// A callback's reply decision. Returning `true` tells the engine to
/// transmit the (possibly callback-modified) response; `false` declines to
/// reply at all, which is mandatory for broadcast requests.
pub type CallbackOutcome = std::result::Result<bool, CallbackError>;

/// A registered logical Modbus server.
pub struct ServerEntry {
    id: Id,
    flags: ServerFlags,
    callback: Box<dyn FnMut(&mut Message) -> CallbackOutcome + Send>,
}

impl std::fmt::Debug for ServerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerEntry")
            .field("id", &self.id)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

fn matches(entry: &ServerEntry, id: Id) -> bool {
    entry.id == id
        || (id.is_broadcast() && entry.flags.receive_broadcast)
        || entry.flags.receive_any
}

/// The set of servers registered on one [`crate::engine::Engine`].
///
/// Backed by a `Vec` with head-prepend insertion rather than the original
/// driver's intrusive singly linked list: the observable contract (no
/// central allocation owned by the registry beyond the entries themselves,
/// duplicate-id rejection, head-first/insertion-order-reversed iteration)
/// is unchanged, and callers no longer need to keep the node storage alive
/// themselves.
#[derive(Default)]
pub struct Registry {
    entries: Vec<ServerEntry>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new server. Rejects a duplicate `id` with
    /// [`Error::Exists`].
    pub fn add(
        &mut self,
        id: Id,
        flags: ServerFlags,
        callback: Box<dyn FnMut(&mut Message) -> CallbackOutcome + Send>,
    ) -> Result<()> {
        if self.get(id).is_some() {
            return Err(Error::Exists);
        }
        self.entries.insert(
            0,
            ServerEntry {
                id,
                flags,
                callback,
            },
        );
        Ok(())
    }

    /// Unregister the server with this exact `id`.
    pub fn remove(&mut self, id: Id) -> Result<()> {
        let pos = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::NotFound)?;
        self.entries.remove(pos);
        Ok(())
    }

    /// Direct, non-iterating lookup by exact id — distinct from the
    /// broadcast/promiscuous-aware matching [`Registry::dispatch`] performs.
    #[must_use]
    pub fn get(&self, id: Id) -> Option<&ServerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Whether any registered entry would receive a request addressed to
    /// `id`, without invoking any callback. Used to decide, before the rest
    /// of an inbound frame has even been parsed, whether it is worth
    /// parsing at all.
    #[must_use]
    pub fn has_match(&self, id: Id) -> bool {
        self.entries.iter().any(|entry| matches(entry, id))
    }

    /// Route `message` to every matching server's callback, in registry
    /// order. Every matching entry is called; only a callback error
    /// short-circuits the remaining iteration. Returns whether any
    /// callback asked to reply (always `false` for broadcast, since a
    /// well-behaved callback never asks to reply to one, but this function
    /// does not itself special-case broadcast — validation upstream does).
    pub fn dispatch(&mut self, message: &mut Message) -> Result<bool> {
        let id = message.id;
        let mut reply = false;
        for entry in self.entries.iter_mut().filter(|entry| matches(entry, id)) {
            match (entry.callback)(message) {
                Ok(true) => reply = true,
                Ok(false) => {}
                Err(err) => return Err(Error::Callback(err)),
            }
        }
        Ok(reply)
    }
}
