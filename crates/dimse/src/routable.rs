// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The routable envelope: a received instance plus its ingress SCP id.

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::DefaultDicomObject;

use dlb_core::ScpId;

/// One DICOM instance travelling through the pipeline.
///
/// Created in the C-STORE handler and never mutated afterwards; consumed
/// when a terminal worker has sent it downstream or written it to disk.
#[derive(Debug, Clone)]
pub struct Routable {
    scp_id: ScpId,
    dataset: DefaultDicomObject,
}

impl Routable {
    pub fn new(scp_id: ScpId, dataset: DefaultDicomObject) -> Self {
        Self { scp_id, dataset }
    }

    /// The ingress SCP that accepted this instance.
    pub fn scp_id(&self) -> &ScpId {
        &self.scp_id
    }

    pub fn dataset(&self) -> &DefaultDicomObject {
        &self.dataset
    }

    pub fn has_tag(&self, tag: (u16, u16)) -> bool {
        self.dataset.element(Tag(tag.0, tag.1)).is_ok()
    }

    /// Canonical string form of a tag value: the element's string
    /// conversion (multi-valued strings joined by `\`), with trailing NUL
    /// and space padding trimmed. `None` when the tag is absent.
    pub fn tag_string(&self, tag: (u16, u16)) -> Option<String> {
        self.element_string(Tag(tag.0, tag.1))
    }

    /// Patient ID (0010,0020); the affinity key.
    pub fn patient_id(&self) -> Option<String> {
        self.element_string(tags::PATIENT_ID)
    }

    /// SOP Instance UID (0008,0018); the local-storage file name.
    pub fn sop_instance_uid(&self) -> Option<String> {
        self.element_string(tags::SOP_INSTANCE_UID)
    }

    fn element_string(&self, tag: Tag) -> Option<String> {
        self.dataset
            .element(tag)
            .ok()
            .and_then(|element| element.to_str().ok())
            .map(|value| value.trim_end_matches(['\0', ' ']).to_string())
    }
}

#[cfg(test)]
#[path = "routable_tests.rs"]
mod tests;
