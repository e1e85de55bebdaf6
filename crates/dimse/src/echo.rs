// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C-ECHO probe against a downstream peer.

use dicom_dictionary_std::uids;
use dicom_ul::association::ClientAssociationOptions;
use tracing::debug;

use crate::command;
use crate::error::DimseError;

/// Verification SCU: opens an association, exchanges one C-ECHO, releases.
#[derive(Debug, Clone)]
pub struct EchoScu {
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub address: String,
    pub port: u16,
}

impl EchoScu {
    /// One echo round-trip. Connection and negotiation failures and
    /// non-success statuses are all errors.
    pub fn ping(&self) -> Result<(), DimseError> {
        let address = format!("{}:{}", self.address, self.port);
        let mut association = ClientAssociationOptions::new()
            .calling_ae_title(self.calling_ae_title.as_str())
            .called_ae_title(self.called_ae_title.as_str())
            .with_abstract_syntax(uids::VERIFICATION)
            .establish_with(&address)?;

        let pc = association
            .presentation_contexts()
            .first()
            .cloned()
            .ok_or_else(|| DimseError::NoPresentationContext(uids::VERIFICATION.to_string()))?;

        association.send(&command::command_pdata(pc.id, &command::echo_rq(1))?)?;
        let rsp = association.receive()?;
        let rsp_command = command::read_command_pdata(&rsp)?;
        let status = command::status(&rsp_command)?;

        let _ = association.release();
        if status != command::STATUS_SUCCESS {
            return Err(DimseError::EchoRejected { status });
        }
        debug!(peer = %address, "echo succeeded");
        Ok(())
    }
}

#[cfg(test)]
#[path = "echo_tests.rs"]
mod tests;
