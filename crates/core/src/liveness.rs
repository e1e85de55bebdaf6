// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness status of a downstream destination.
//!
//! One checker task owns the writes; any number of tasks may read. The
//! status is observational in this revision: dispatch does not consult it.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Health of a destination as last observed by its liveness checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LivenessStatus {
    Live = 0,
    Unknown = 1,
    /// Transient failure. Reserved; the echo strategy does not produce it.
    SoftFail = 2,
    HardFail = 3,
}

impl LivenessStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Live,
            2 => Self::SoftFail,
            3 => Self::HardFail,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Unknown => "unknown",
            Self::SoftFail => "soft-fail",
            Self::HardFail => "hard-fail",
        })
    }
}

/// Shared cell holding a [`LivenessStatus`]. Starts out `Unknown`.
#[derive(Debug)]
pub struct LivenessCell(AtomicU8);

impl LivenessCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(LivenessStatus::Unknown as u8))
    }

    pub fn get(&self) -> LivenessStatus {
        LivenessStatus::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// Replace the status, returning the previous value.
    pub fn set(&self, status: LivenessStatus) -> LivenessStatus {
        LivenessStatus::from_u8(self.0.swap(status as u8, Ordering::Relaxed))
    }
}

impl Default for LivenessCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
