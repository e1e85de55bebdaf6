// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DIMSE command objects: builders for requests and responses, and field
//! readers for received commands. Command sets are always encoded in
//! Implicit VR Little Endian.

use dicom_core::{dicom_value, DataElement, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{mem::InMemDicomObject, StandardDataDictionary};
use dicom_transfer_syntax_registry::entries;
use dicom_ul::pdu::{PDataValue, PDataValueType};
use dicom_ul::Pdu;

use crate::error::DimseError;

/// Command Field values.
pub const C_STORE_RQ: u16 = 0x0001;
pub const C_STORE_RSP: u16 = 0x8001;
pub const C_ECHO_RQ: u16 = 0x0030;
pub const C_ECHO_RSP: u16 = 0x8030;

/// Command Data Set Type marker for "no data set present".
pub const NO_DATA_SET: u16 = 0x0101;
/// Command Data Set Type marker for "data set follows".
pub const DATA_SET_FOLLOWS: u16 = 0x0000;

/// DIMSE status: success.
pub const STATUS_SUCCESS: u16 = 0x0000;
/// DIMSE status: refused, out of resources.
pub const STATUS_OUT_OF_RESOURCES: u16 = 0xA700;

/// Build a C-STORE-RQ command set.
pub fn store_rq(
    message_id: u16,
    sop_class_uid: &str,
    sop_instance_uid: &str,
) -> InMemDicomObject<StandardDataDictionary> {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(tags::AFFECTED_SOP_CLASS_UID, VR::UI, dicom_value!(Str, sop_class_uid)),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_STORE_RQ])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        DataElement::new(tags::PRIORITY, VR::US, dicom_value!(U16, [0x0000])),
        DataElement::new(tags::COMMAND_DATA_SET_TYPE, VR::US, dicom_value!(U16, [DATA_SET_FOLLOWS])),
        DataElement::new(
            tags::AFFECTED_SOP_INSTANCE_UID,
            VR::UI,
            dicom_value!(Str, sop_instance_uid),
        ),
    ])
}

/// Build a C-STORE-RSP command set with the given status.
pub fn store_rsp(
    message_id: u16,
    sop_class_uid: &str,
    sop_instance_uid: &str,
    status: u16,
) -> InMemDicomObject<StandardDataDictionary> {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(tags::AFFECTED_SOP_CLASS_UID, VR::UI, dicom_value!(Str, sop_class_uid)),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_STORE_RSP])),
        DataElement::new(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            VR::US,
            dicom_value!(U16, [message_id]),
        ),
        DataElement::new(tags::COMMAND_DATA_SET_TYPE, VR::US, dicom_value!(U16, [NO_DATA_SET])),
        DataElement::new(tags::STATUS, VR::US, dicom_value!(U16, [status])),
        DataElement::new(
            tags::AFFECTED_SOP_INSTANCE_UID,
            VR::UI,
            dicom_value!(Str, sop_instance_uid),
        ),
    ])
}

/// Build a C-ECHO-RQ command set.
pub fn echo_rq(message_id: u16) -> InMemDicomObject<StandardDataDictionary> {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(tags::AFFECTED_SOP_CLASS_UID, VR::UI, dicom_value!(Str, uids::VERIFICATION)),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_ECHO_RQ])),
        DataElement::new(tags::MESSAGE_ID, VR::US, dicom_value!(U16, [message_id])),
        DataElement::new(tags::COMMAND_DATA_SET_TYPE, VR::US, dicom_value!(U16, [NO_DATA_SET])),
    ])
}

/// Build a C-ECHO-RSP command set.
pub fn echo_rsp(message_id: u16, status: u16) -> InMemDicomObject<StandardDataDictionary> {
    InMemDicomObject::command_from_element_iter([
        DataElement::new(tags::AFFECTED_SOP_CLASS_UID, VR::UI, dicom_value!(Str, uids::VERIFICATION)),
        DataElement::new(tags::COMMAND_FIELD, VR::US, dicom_value!(U16, [C_ECHO_RSP])),
        DataElement::new(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            VR::US,
            dicom_value!(U16, [message_id]),
        ),
        DataElement::new(tags::COMMAND_DATA_SET_TYPE, VR::US, dicom_value!(U16, [NO_DATA_SET])),
        DataElement::new(tags::STATUS, VR::US, dicom_value!(U16, [status])),
    ])
}

/// Read a required u16 field from a command set.
fn required_u16(
    command: &InMemDicomObject<StandardDataDictionary>,
    tag: dicom_core::Tag,
) -> Result<u16, DimseError> {
    command
        .element(tag)
        .ok()
        .and_then(|element| element.to_int::<u16>().ok())
        .ok_or(DimseError::MissingCommandTag(tag))
}

/// Read a required string field from a command set, with padding trimmed.
fn required_str(
    command: &InMemDicomObject<StandardDataDictionary>,
    tag: dicom_core::Tag,
) -> Result<String, DimseError> {
    command
        .element(tag)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim_end_matches(['\0', ' ']).to_string())
        .ok_or(DimseError::MissingCommandTag(tag))
}

pub fn command_field(
    command: &InMemDicomObject<StandardDataDictionary>,
) -> Result<u16, DimseError> {
    required_u16(command, tags::COMMAND_FIELD)
}

pub fn message_id(command: &InMemDicomObject<StandardDataDictionary>) -> Result<u16, DimseError> {
    required_u16(command, tags::MESSAGE_ID)
}

pub fn status(command: &InMemDicomObject<StandardDataDictionary>) -> Result<u16, DimseError> {
    required_u16(command, tags::STATUS)
}

pub fn affected_sop_class_uid(
    command: &InMemDicomObject<StandardDataDictionary>,
) -> Result<String, DimseError> {
    required_str(command, tags::AFFECTED_SOP_CLASS_UID)
}

pub fn affected_sop_instance_uid(
    command: &InMemDicomObject<StandardDataDictionary>,
) -> Result<String, DimseError> {
    required_str(command, tags::AFFECTED_SOP_INSTANCE_UID)
}

/// Encode a command set as a single-value command PData PDU.
pub fn command_pdata(
    presentation_context_id: u8,
    command: &InMemDicomObject<StandardDataDictionary>,
) -> Result<Pdu, DimseError> {
    let ts = entries::IMPLICIT_VR_LITTLE_ENDIAN.erased();
    let mut data = Vec::new();
    command.write_dataset_with_ts(&mut data, &ts)?;
    Ok(Pdu::PData {
        data: vec![PDataValue {
            presentation_context_id,
            value_type: PDataValueType::Command,
            is_last: true,
            data,
        }],
    })
}

/// Decode the command set out of a received PData PDU.
pub fn read_command_pdata(pdu: &Pdu) -> Result<InMemDicomObject<StandardDataDictionary>, DimseError> {
    match pdu {
        Pdu::PData { data } => {
            let value = data
                .first()
                .ok_or_else(|| DimseError::UnexpectedPdu("empty PData".to_string()))?;
            let ts = entries::IMPLICIT_VR_LITTLE_ENDIAN.erased();
            Ok(InMemDicomObject::read_dataset_with_ts(value.data.as_slice(), &ts)?)
        }
        other => Err(DimseError::UnexpectedPdu(other.short_description().to_string())),
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
