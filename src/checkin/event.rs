//! Events that drive the check-in machine.
//!
//! Events come from two places: the guard (start, photo, retake, notes,
//! confirm, reset) and the result of a call the machine asked for.

use crate::camera::Photo;
use crate::error::CheckInError;
use crate::model::{DeliveryConfirmation, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInEvent {
    // =========================================================================
    // Guard actions
    // =========================================================================
    /// Guard asked to scan. Carries the outcome of the device permission
    /// check made just before.
    ScanStarted { permission_granted: bool },

    /// Guard stopped the scan before a code was read.
    ScanCancelled,

    /// Guard asked for the employee's photo (or to try again after a
    /// failed capture).
    PhotoRequested,

    /// Guard discarded the photo to take another.
    Retake,

    /// Guard typed or cleared the delivery notes.
    NotesEdited { notes: Option<String> },

    /// Guard confirmed the delivery.
    Confirm,

    /// Guard abandoned the check-in.
    Reset,

    // =========================================================================
    // Call results
    // =========================================================================
    /// Scanner produced content.
    CodeRead { raw: String },

    /// Scanner failed while reading.
    ScanFailed { error: CheckInError },

    /// Backend answered the validation request.
    ValidationReceived { result: ValidationResult },

    /// Validation request failed (transport, session, or server error).
    ValidationFailed { error: CheckInError },

    PhotoCaptured { photo: Photo },

    PhotoFailed { error: CheckInError },

    /// Backend recorded the delivery.
    SubmissionAccepted { confirmation: DeliveryConfirmation },

    SubmissionFailed { error: CheckInError },
}

impl CheckInEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CheckInEvent::ScanStarted { .. } => "scan_started",
            CheckInEvent::ScanCancelled => "scan_cancelled",
            CheckInEvent::PhotoRequested => "photo_requested",
            CheckInEvent::Retake => "retake",
            CheckInEvent::NotesEdited { .. } => "notes_edited",
            CheckInEvent::Confirm => "confirm",
            CheckInEvent::Reset => "reset",
            CheckInEvent::CodeRead { .. } => "code_read",
            CheckInEvent::ScanFailed { .. } => "scan_failed",
            CheckInEvent::ValidationReceived { .. } => "validation_received",
            CheckInEvent::ValidationFailed { .. } => "validation_failed",
            CheckInEvent::PhotoCaptured { .. } => "photo_captured",
            CheckInEvent::PhotoFailed { .. } => "photo_failed",
            CheckInEvent::SubmissionAccepted { .. } => "submission_accepted",
            CheckInEvent::SubmissionFailed { .. } => "submission_failed",
        }
    }
}
