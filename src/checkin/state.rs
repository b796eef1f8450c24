//! States of a single check-in.
//!
//! Each variant carries exactly the data that exists at that point, so a
//! check-in can never be "scanning" and "submitting" at once, and a
//! submission can never be built without a photo.

use crate::camera::Photo;
use crate::model::{DeliveryConfirmation, Employee, ValidatedCheckIn};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInState {
    /// Nothing in progress.
    Idle,

    /// Waiting for the scanner to produce a code.
    Scanning,

    /// Token decoded; waiting for the backend to accept or reject it.
    Validating { token: crate::token::CheckInToken },

    /// Backend accepted the token; the employee is known.
    Valid { check_in: ValidatedCheckIn },

    /// Waiting for the camera.
    CapturingPhoto {
        check_in: ValidatedCheckIn,
        /// Kept across a retake.
        notes: Option<String>,
    },

    /// Photo taken; waiting for the guard to confirm.
    ReadyToSubmit {
        check_in: ValidatedCheckIn,
        photo: Photo,
        notes: Option<String>,
        /// Message from the last failed submission, if any.
        last_error: Option<String>,
    },

    /// Delivery sent; waiting for the backend.
    Submitting {
        check_in: ValidatedCheckIn,
        photo: Photo,
        notes: Option<String>,
    },

    /// Delivery recorded. The machine is finished.
    Done {
        employee: Employee,
        confirmation: DeliveryConfirmation,
    },

    /// Something failed. Left only by an explicit guard action.
    Error {
        message: String,
        /// Set when the token was already validated (photo capture failed),
        /// so the photo can be retried without scanning again.
        retained: Option<RetainedCheckIn>,
    },
}

/// What a failed photo capture keeps for the retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedCheckIn {
    pub check_in: ValidatedCheckIn,
    pub notes: Option<String>,
}

impl From<ValidatedCheckIn> for RetainedCheckIn {
    fn from(check_in: ValidatedCheckIn) -> Self {
        RetainedCheckIn {
            check_in,
            notes: None,
        }
    }
}

impl CheckInState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckInState::Idle => "idle",
            CheckInState::Scanning => "scanning",
            CheckInState::Validating { .. } => "validating",
            CheckInState::Valid { .. } => "valid",
            CheckInState::CapturingPhoto { .. } => "capturing_photo",
            CheckInState::ReadyToSubmit { .. } => "ready_to_submit",
            CheckInState::Submitting { .. } => "submitting",
            CheckInState::Done { .. } => "done",
            CheckInState::Error { .. } => "error",
        }
    }

    /// True while a device or server call is outstanding.
    pub fn is_awaiting_response(&self) -> bool {
        matches!(
            self,
            CheckInState::Scanning
                | CheckInState::Validating { .. }
                | CheckInState::CapturingPhoto { .. }
                | CheckInState::Submitting { .. }
        )
    }

    pub fn is_done(&self) -> bool {
        matches!(self, CheckInState::Done { .. })
    }

    /// The employee being served, once the token has been validated.
    pub fn employee(&self) -> Option<&Employee> {
        match self {
            CheckInState::Valid { check_in }
            | CheckInState::CapturingPhoto { check_in, .. }
            | CheckInState::ReadyToSubmit { check_in, .. }
            | CheckInState::Submitting { check_in, .. } => Some(&check_in.employee),
            CheckInState::Error {
                retained: Some(retained),
                ..
            } => Some(&retained.check_in.employee),
            CheckInState::Done { employee, .. } => Some(employee),
            _ => None,
        }
    }

    pub fn photo(&self) -> Option<&Photo> {
        match self {
            CheckInState::ReadyToSubmit { photo, .. } | CheckInState::Submitting { photo, .. } => {
                Some(photo)
            }
            _ => None,
        }
    }

    /// Message to show the guard, from an error or a failed submission.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            CheckInState::Error { message, .. } => Some(message),
            CheckInState::ReadyToSubmit {
                last_error: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for CheckInState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
