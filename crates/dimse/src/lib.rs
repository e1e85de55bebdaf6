// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dlb-dimse: DICOM wire adapters for the load balancer.
//!
//! Wraps the `dicom-rs` upper-layer protocol: inbound C-STORE / C-ECHO
//! association handling, outbound C-STORE sending, and the C-ECHO probe
//! used by liveness checking. All association I/O in this crate is
//! blocking; callers bridge it onto the async runtime with
//! `spawn_blocking`.

pub mod command;
pub mod echo;
pub mod error;
pub mod routable;
pub mod scp;
pub mod scu;
pub mod transfer;

pub use dicom_object::DefaultDicomObject;
pub use echo::EchoScu;
pub use error::DimseError;
pub use routable::Routable;
pub use scp::{handle_association, StoreHandler};
pub use scu::{StoreScu, StoreScuConfig, StoreSession};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
