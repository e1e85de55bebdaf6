// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract and transfer syntaxes supported on the wire.

use dicom_dictionary_std::uids;

/// Storage SOP classes the pipeline routes.
pub const STORAGE_ABSTRACT_SYNTAXES: &[&str] = &[
    uids::CT_IMAGE_STORAGE,
    uids::MR_IMAGE_STORAGE,
    uids::ENHANCED_CT_IMAGE_STORAGE,
    uids::ENHANCED_MR_IMAGE_STORAGE,
];

/// Everything an ingress listener offers: the storage classes plus
/// Verification for C-ECHO.
pub const ABSTRACT_SYNTAXES: &[&str] = &[
    uids::VERIFICATION,
    uids::CT_IMAGE_STORAGE,
    uids::MR_IMAGE_STORAGE,
    uids::ENHANCED_CT_IMAGE_STORAGE,
    uids::ENHANCED_MR_IMAGE_STORAGE,
];

/// Transfer syntaxes negotiated for every presentation context. Explicit VR
/// Little Endian is preferred; Implicit VR Little Endian is the DICOM
/// default and always offered.
pub const TRANSFER_SYNTAXES: &[&str] =
    &[uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN];
