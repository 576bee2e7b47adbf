// SPDX-FileCopyrightText: Copyright (c) 2017-2023 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RTU server demo: a device that answers `ReadInputRegisters` with a
//! fixed register bank, driven over the in-memory loopback transport (see
//! `rtu-client.rs` for why there is no real UART here).

use std::{thread, time::Duration};

use bytes::Bytes;

use modbus_engine::prelude::*;
use modbus_engine::rtu;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let slave = Id(1);
    let config = RtuConfig::new(19_200, Duration::from_secs(1));
    let (client_transport, server_transport) = rtu::loopback::pair(config);

    println!("Starting up server...");
    let server = Engine::new(server_transport);
    server.server_add(
        slave,
        ServerFlags::default(),
        Box::new(|message| {
            let mut registers = vec![0u8; message.count as usize * 2];
            registers[2 * 2 + 1] = 0x77; // registers[2] = 0x77
            message.data = Bytes::from(registers);
            Ok(true)
        }),
    )?;
    let _server_thread = thread::spawn(move || {
        if let Err(err) = server.server_listen() {
            eprintln!("server: {err}");
        }
    });

    // Give the server some time for starting up.
    thread::sleep(Duration::from_millis(100));

    println!("Connecting client...");
    let client = Engine::new(client_transport);
    println!("Reading input registers...");
    let request = Message::request(slave, FunctionCode::ReadInputRegisters, 0x00, 7);
    let response = client.client_request(request)?;
    println!("The result is '{:#x?}'", &response.data[..]);

    Ok(())
}
