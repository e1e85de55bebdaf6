// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from DICOM association handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DimseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("client association error: {0}")]
    Client(#[from] dicom_ul::association::client::Error),

    #[error("server association error: {0}")]
    Server(#[from] dicom_ul::association::server::Error),

    #[error("failed to read dataset: {0}")]
    Read(#[from] dicom_object::ReadError),

    #[error("failed to write dataset: {0}")]
    Write(#[from] dicom_object::WriteError),

    #[error("failed to build file meta table: {0}")]
    Meta(String),

    #[error("command object is missing tag {0}")]
    MissingCommandTag(dicom_core::Tag),

    #[error("unknown transfer syntax {0}")]
    UnknownTransferSyntax(String),

    #[error("no accepted presentation context for {0}")]
    NoPresentationContext(String),

    #[error("peer answered C-STORE with status {status:#06x}")]
    StoreRejected { status: u16 },

    #[error("peer answered C-ECHO with status {status:#06x}")]
    EchoRejected { status: u16 },

    #[error("unexpected PDU: {0}")]
    UnexpectedPdu(String),
}
