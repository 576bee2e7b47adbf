// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus device identifiers.

use std::{fmt, num::ParseIntError, str::FromStr};

/// The raw byte representation of a Modbus identifier.
pub type RawId = u8;

/// A single byte addressing a Modbus client or server on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Id(pub RawId);

impl Id {
    /// The special address for sending a broadcast request. Broadcasts are
    /// one-way: the transport sends but never waits for a reply, and a
    /// conforming server callback must not reply to one.
    #[must_use]
    pub const fn broadcast() -> Self {
        Id(0)
    }

    /// The minimum address of a single unicast device.
    #[must_use]
    pub const fn min_device() -> Self {
        Id(1)
    }

    /// The maximum address of a single unicast device.
    #[must_use]
    pub const fn max_device() -> Self {
        Id(247)
    }

    /// Check whether this id is the broadcast address.
    #[must_use]
    pub fn is_broadcast(self) -> bool {
        self == Self::broadcast()
    }

    /// Check whether this id addresses a single unicast device.
    #[must_use]
    pub fn is_single_device(self) -> bool {
        self >= Self::min_device() && self <= Self::max_device()
    }

    /// Check whether this id falls in the reserved range (248..=255).
    #[must_use]
    pub fn is_reserved(self) -> bool {
        self > Self::max_device()
    }
}

impl From<RawId> for Id {
    fn from(from: RawId) -> Self {
        Id(from)
    }
}

impl From<Id> for RawId {
    fn from(from: Id) -> Self {
        from.0
    }
}

impl FromStr for Id {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = match s.parse::<u8>() {
            Ok(id) => Ok(id),
            Err(err) => {
                if let Some(stripped) = s.strip_prefix("0x") {
                    u8::from_str_radix(stripped, 16)
                } else {
                    Err(err)
                }
            }
        }?;
        Ok(Id(id))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:0>2X})", self.0, self.0)
    }
}
