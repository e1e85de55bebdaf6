// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders for in-memory datasets and routables used across crate tests.

#![allow(clippy::expect_used)]

use dicom_core::{dicom_value, DataElement, Tag, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{mem::InMemDicomObject, DefaultDicomObject, FileMetaTableBuilder};

use crate::Routable;
use dlb_core::ScpId;

/// A minimal CT instance with the given Patient ID and SOP Instance UID,
/// plus any extra string-valued tags.
pub fn dataset_with_tags(
    patient_id: Option<&str>,
    sop_instance_uid: &str,
    extra: &[((u16, u16), &str)],
) -> DefaultDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        dicom_value!(Str, uids::CT_IMAGE_STORAGE),
    ));
    obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, dicom_value!(Str, sop_instance_uid)));
    if let Some(patient_id) = patient_id {
        obj.put(DataElement::new(tags::PATIENT_ID, VR::LO, dicom_value!(Str, patient_id)));
    }
    for ((group, element), value) in extra {
        obj.put(DataElement::new(Tag(*group, *element), VR::LO, dicom_value!(Str, *value)));
    }

    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
        .media_storage_sop_instance_uid(sop_instance_uid)
        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        .build()
        .expect("file meta table from complete inputs");
    obj.with_exact_meta(meta)
}

/// A minimal CT instance with the given Patient ID and SOP Instance UID.
pub fn dataset(patient_id: Option<&str>, sop_instance_uid: &str) -> DefaultDicomObject {
    dataset_with_tags(patient_id, sop_instance_uid, &[])
}

/// A routable wrapping [`dataset`].
pub fn routable(scp_id: &str, patient_id: Option<&str>, sop_instance_uid: &str) -> Routable {
    Routable::new(ScpId::new(scp_id), dataset(patient_id, sop_instance_uid))
}

/// A routable wrapping [`dataset_with_tags`].
pub fn routable_with_tags(
    scp_id: &str,
    patient_id: Option<&str>,
    sop_instance_uid: &str,
    extra: &[((u16, u16), &str)],
) -> Routable {
    Routable::new(ScpId::new(scp_id), dataset_with_tags(patient_id, sop_instance_uid, extra))
}
