// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::scp::{handle_association, StoreHandler};
use dicom_object::DefaultDicomObject;
use std::net::{SocketAddr, TcpListener};

struct AcceptAll;

impl StoreHandler for AcceptAll {
    fn on_store(&self, _dataset: DefaultDicomObject) -> u16 {
        command::STATUS_SUCCESS
    }
}

fn spawn_scp() -> (SocketAddr, std::thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let _ = handle_association(stream, "DLB_TEST", &AcceptAll);
        }
    });
    (addr, handle)
}

#[test]
fn echo_against_a_running_scp_succeeds() {
    let (addr, handle) = spawn_scp();
    let scu = EchoScu {
        calling_ae_title: "PROBE".to_string(),
        called_ae_title: "DLB_TEST".to_string(),
        address: addr.ip().to_string(),
        port: addr.port(),
    };
    scu.ping().unwrap();
    handle.join().unwrap();
}

#[test]
fn echo_against_a_closed_port_fails() {
    // Bind then drop to get a port nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let scu = EchoScu {
        calling_ae_title: "PROBE".to_string(),
        called_ae_title: "NOBODY".to_string(),
        address: "127.0.0.1".to_string(),
        port,
    };
    assert!(scu.ping().is_err());
}
