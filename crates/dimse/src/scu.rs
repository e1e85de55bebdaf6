// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound C-STORE: one association per send batch.

use std::io::Write as _;
use std::net::TcpStream;

use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_object::DefaultDicomObject;
use dicom_transfer_syntax_registry::TransferSyntaxRegistry;
use dicom_ul::association::ClientAssociationOptions;
use dicom_ul::ClientAssociation;
use tracing::debug;

use crate::command;
use crate::error::DimseError;
use crate::transfer::{STORAGE_ABSTRACT_SYNTAXES, TRANSFER_SYNTAXES};

const DEFAULT_MAX_PDU_LENGTH: u32 = 16384;

/// Connection settings for one downstream store peer.
#[derive(Debug, Clone)]
pub struct StoreScuConfig {
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub address: String,
    pub port: u16,
}

/// Factory for store sessions against a fixed peer.
#[derive(Debug, Clone)]
pub struct StoreScu {
    config: StoreScuConfig,
}

impl StoreScu {
    pub fn new(config: StoreScuConfig) -> Self {
        Self { config }
    }

    /// Open an association with presentation contexts for every supported
    /// storage SOP class.
    pub fn open(&self) -> Result<StoreSession, DimseError> {
        let mut options = ClientAssociationOptions::new()
            .calling_ae_title(self.config.calling_ae_title.as_str())
            .called_ae_title(self.config.called_ae_title.as_str())
            .max_pdu_length(DEFAULT_MAX_PDU_LENGTH);
        for uid in STORAGE_ABSTRACT_SYNTAXES {
            options = options.with_presentation_context(*uid, TRANSFER_SYNTAXES.to_vec());
        }

        let address = format!("{}:{}", self.config.address, self.config.port);
        let association = options.establish_with(&address)?;
        debug!(peer = %address, "association established");
        Ok(StoreSession { association, message_id: 1 })
    }
}

/// An open association ready to stream instances.
pub struct StoreSession {
    association: ClientAssociation<TcpStream>,
    message_id: u16,
}

impl StoreSession {
    /// Send one instance and wait for its C-STORE-RSP.
    pub fn store(&mut self, object: &DefaultDicomObject) -> Result<(), DimseError> {
        let meta = object.meta();
        let sop_class_uid = meta.media_storage_sop_class_uid.trim_end_matches(['\0', ' ']);
        let sop_instance_uid = meta.media_storage_sop_instance_uid.trim_end_matches(['\0', ' ']);
        let file_ts = meta.transfer_syntax.trim_end_matches('\0');

        // Prefer the instance's own transfer syntax; fall back to any other
        // negotiated syntax the registry can encode.
        let pc = {
            let pcs = self.association.presentation_contexts();
            pcs.iter()
                .find(|pc| pc.transfer_syntax == file_ts)
                .or_else(|| {
                    pcs.iter().find(|pc| TransferSyntaxRegistry.get(&pc.transfer_syntax).is_some())
                })
                .cloned()
                .ok_or_else(|| DimseError::NoPresentationContext(sop_class_uid.to_string()))?
        };
        let ts = TransferSyntaxRegistry
            .get(&pc.transfer_syntax)
            .ok_or_else(|| DimseError::UnknownTransferSyntax(pc.transfer_syntax.clone()))?;

        let rq = command::store_rq(self.message_id, sop_class_uid, sop_instance_uid);
        self.association.send(&command::command_pdata(pc.id, &rq)?)?;

        let mut object_data = Vec::with_capacity(2048);
        object.write_dataset_with_ts(&mut object_data, ts)?;
        {
            // Fragmentation into PData PDUs happens in the writer; the
            // final fragment goes out when it drops.
            let mut pdata = self.association.send_pdata(pc.id);
            pdata.write_all(&object_data)?;
        }

        let rsp = self.association.receive()?;
        let rsp_command = command::read_command_pdata(&rsp)?;
        let status = command::status(&rsp_command)?;
        if status != command::STATUS_SUCCESS {
            return Err(DimseError::StoreRejected { status });
        }

        self.message_id = self.message_id.wrapping_add(1);
        debug!(sop_instance_uid, "instance stored");
        Ok(())
    }

    /// Release the association.
    pub fn release(self) -> Result<(), DimseError> {
        self.association.release()?;
        Ok(())
    }

    /// Abort the association without the release handshake.
    pub fn abort(self) {
        let _ = self.association.abort();
    }
}

#[cfg(test)]
#[path = "scu_tests.rs"]
mod tests;
