// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads a sensor value over Modbus-RTU.
//!
//! There is no real UART in this crate (see the crate-level documentation
//! for why), so this demo wires up an in-memory loopback pair and runs a
//! minimal server on a background thread to stand in for the physical
//! device a real deployment would dial out to over `/dev/ttyUSB0`.

use std::{thread, time::Duration};

use bytes::Bytes;

use modbus_engine::prelude::*;
use modbus_engine::rtu;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let slave = Id(0x17);
    let config = RtuConfig::new(19_200, Duration::from_secs(1));
    let (client_transport, server_transport) = rtu::loopback::pair(config);

    let server = Engine::new(server_transport);
    server.server_add(
        slave,
        ServerFlags::default(),
        Box::new(|message| {
            // A fixed two-register reading, standing in for a live sensor.
            message.data = Bytes::from_static(&[0x00, 0x2A, 0x01, 0x18]);
            Ok(true)
        }),
    )?;
    let server_thread = thread::spawn(move || {
        if let Err(err) = server.server_listen() {
            eprintln!("server: {err}");
        }
    });

    let client = Engine::new(client_transport);
    println!("Reading a sensor value");
    let request = Message::request(slave, FunctionCode::ReadHoldingRegisters, 0x082B, 2);
    let response = client.client_request(request)?;
    println!("Sensor value is: {:?}", &response.data[..]);

    server_thread.join().expect("server thread panicked");
    Ok(())
}
