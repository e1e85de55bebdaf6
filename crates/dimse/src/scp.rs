// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound association handling: C-STORE and C-ECHO provider.
//!
//! [`handle_association`] drives one accepted TCP connection to completion.
//! It performs blocking I/O and is expected to run under `spawn_blocking`
//! (or a dedicated thread).

use std::net::TcpStream;

use dicom_encoding::transfer_syntax::TransferSyntaxIndex;
use dicom_object::{mem::InMemDicomObject, DefaultDicomObject, FileMetaTableBuilder};
use dicom_transfer_syntax_registry::{entries, TransferSyntaxRegistry};
use dicom_ul::pdu::PDataValueType;
use dicom_ul::{association::ServerAssociationOptions, Pdu};
use tracing::{debug, info, trace, warn};

use crate::command::{self, command_pdata};
use crate::error::DimseError;
use crate::transfer::{ABSTRACT_SYNTAXES, TRANSFER_SYNTAXES};

/// Receives the instances stored over an association.
///
/// The returned value is the DIMSE status for the C-STORE-RSP, so the
/// handler decides between acknowledging (`0x0000`) and refusing
/// (`0xA700`).
pub trait StoreHandler: Send + Sync {
    fn on_store(&self, dataset: DefaultDicomObject) -> u16;
}

/// Drive one inbound association: negotiate, then answer C-ECHO and
/// C-STORE messages until the peer releases or disconnects.
pub fn handle_association(
    stream: TcpStream,
    ae_title: &str,
    handler: &dyn StoreHandler,
) -> Result<(), DimseError> {
    let mut options =
        ServerAssociationOptions::new().accept_any().ae_title(ae_title).strict(false);
    for uid in ABSTRACT_SYNTAXES {
        options = options.with_abstract_syntax(*uid);
    }
    for uid in TRANSFER_SYNTAXES {
        options = options.with_transfer_syntax(*uid);
    }

    let mut association = options.establish(stream)?;
    debug!(
        peer_ae_title = association.client_ae_title(),
        presentation_contexts = ?association.presentation_contexts(),
        "association established"
    );

    // C-STORE state carried between the command and its data set.
    let mut command_buffer: Vec<u8> = Vec::new();
    let mut instance_buffer: Vec<u8> = Vec::with_capacity(1024 * 1024);
    let mut message_id: u16 = 1;
    let mut sop_class_uid = String::new();
    let mut sop_instance_uid = String::new();

    loop {
        match association.receive() {
            Ok(Pdu::PData { mut data }) => {
                for data_value in data.drain(..) {
                    let pc_id = data_value.presentation_context_id;
                    if data_value.value_type == PDataValueType::Command {
                        command_buffer.extend(data_value.data);
                        if !data_value.is_last {
                            continue;
                        }
                        // Command sets are always in Implicit VR LE.
                        let ts = entries::IMPLICIT_VR_LITTLE_ENDIAN.erased();
                        let obj = InMemDicomObject::read_dataset_with_ts(
                            command_buffer.as_slice(),
                            &ts,
                        )?;
                        command_buffer.clear();

                        match command::command_field(&obj)? {
                            command::C_ECHO_RQ => {
                                trace!("answering C-ECHO");
                                let rsp = command::echo_rsp(
                                    command::message_id(&obj)?,
                                    command::STATUS_SUCCESS,
                                );
                                association.send(&command_pdata(pc_id, &rsp)?)?;
                            }
                            command::C_STORE_RQ => {
                                message_id = command::message_id(&obj)?;
                                sop_class_uid = command::affected_sop_class_uid(&obj)?;
                                sop_instance_uid = command::affected_sop_instance_uid(&obj)?;
                                instance_buffer.clear();
                            }
                            other => {
                                warn!(command_field = other, "unsupported DIMSE command");
                            }
                        }
                    } else {
                        instance_buffer.extend(data_value.data);
                        if !data_value.is_last {
                            continue;
                        }

                        let ts_uid = association
                            .presentation_contexts()
                            .iter()
                            .find(|pc| pc.id == pc_id)
                            .map(|pc| pc.transfer_syntax.clone())
                            .ok_or_else(|| {
                                DimseError::NoPresentationContext(sop_class_uid.clone())
                            })?;
                        let ts = TransferSyntaxRegistry
                            .get(&ts_uid)
                            .ok_or_else(|| DimseError::UnknownTransferSyntax(ts_uid.clone()))?;

                        let obj =
                            InMemDicomObject::read_dataset_with_ts(instance_buffer.as_slice(), ts)?;
                        instance_buffer.clear();

                        let meta = FileMetaTableBuilder::new()
                            .media_storage_sop_class_uid(sop_class_uid.as_str())
                            .media_storage_sop_instance_uid(sop_instance_uid.as_str())
                            .transfer_syntax(ts_uid.as_str())
                            .build()
                            .map_err(|e| DimseError::Meta(e.to_string()))?;
                        let file_obj = obj.with_exact_meta(meta);

                        let status = handler.on_store(file_obj);
                        let rsp = command::store_rsp(
                            message_id,
                            &sop_class_uid,
                            &sop_instance_uid,
                            status,
                        );
                        association.send(&command_pdata(pc_id, &rsp)?)?;
                    }
                }
            }
            Ok(Pdu::ReleaseRQ) => {
                if let Err(e) = association.send(&Pdu::ReleaseRP) {
                    warn!("failed to answer association release: {}", e);
                }
                info!(peer_ae_title = association.client_ae_title(), "association released");
                break;
            }
            Ok(Pdu::AbortRQ { .. }) => {
                debug!("association aborted by peer");
                break;
            }
            Ok(other) => {
                warn!("unexpected PDU: {}", other.short_description());
            }
            Err(err @ dicom_ul::association::server::Error::Receive { .. }) => {
                debug!("{}", err);
                break;
            }
            Err(err) => {
                warn!("association error: {}", err);
                break;
            }
        }
    }

    debug!(peer_ae_title = association.client_ae_title(), "connection closed");
    Ok(())
}

