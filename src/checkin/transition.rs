//! The transition function.
//!
//! `transition` is pure: given the current state, one event and the
//! read-only context, it returns the next state and the calls to make. Any
//! event that does not apply to the current state leaves it untouched and
//! asks for nothing.

use super::effect::Effect;
use super::event::CheckInEvent;
use super::state::{CheckInState, RetainedCheckIn};
use crate::error::CheckInError;
use crate::model::{DeliverySubmission, ValidatedCheckIn, ValidationResult};
use crate::session::CheckInContext;
use crate::token;
use tracing::debug;

const PERMISSION_DENIED: &str = "permission denied";
const INVALID_FORMAT: &str = "invalid format";
const SCAN_FAILED: &str = "scan failed";
const CAPTURE_FAILED: &str = "capture failed";
const TOKEN_REJECTED: &str = "token rejected";
const INCOMPLETE_VALIDATION: &str = "incomplete validation response";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub state: CheckInState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: CheckInState, effects: Vec<Effect>) -> Self {
        TransitionResult { state, effects }
    }

    pub fn state_only(state: CheckInState) -> Self {
        TransitionResult {
            state,
            effects: Vec::new(),
        }
    }

    fn error(message: impl Into<String>, retained: Option<RetainedCheckIn>) -> Self {
        TransitionResult::state_only(CheckInState::Error {
            message: message.into(),
            retained,
        })
    }
}

pub fn transition(
    state: CheckInState,
    event: CheckInEvent,
    context: &CheckInContext,
) -> TransitionResult {
    use CheckInEvent as E;
    use CheckInState as S;

    match (state, event) {
        // Reset discards everything, from anywhere
        (_, E::Reset) => TransitionResult::state_only(S::Idle),

        (S::Idle, E::ScanStarted { permission_granted: true }) => {
            TransitionResult::new(S::Scanning, vec![Effect::ReadCode])
        }
        (S::Idle, E::ScanStarted { permission_granted: false }) => {
            TransitionResult::error(PERMISSION_DENIED, None)
        }

        (S::Scanning, E::CodeRead { raw }) => match token::decode(&raw) {
            Ok(token) => TransitionResult::new(
                S::Validating {
                    token: token.clone(),
                },
                vec![Effect::Validate {
                    token,
                    period_id: context.period.id,
                }],
            ),
            Err(e) => {
                debug!("scanned content rejected: {}", e);
                TransitionResult::error(INVALID_FORMAT, None)
            }
        },
        (S::Scanning, E::ScanCancelled) => TransitionResult::state_only(S::Idle),
        (S::Scanning, E::ScanFailed { error }) => {
            let message = match error {
                CheckInError::Permission(_) => PERMISSION_DENIED,
                CheckInError::Format(_) => INVALID_FORMAT,
                _ => SCAN_FAILED,
            };
            TransitionResult::error(message, None)
        }

        (S::Validating { token }, E::ValidationReceived { result }) => {
            validation_outcome(token, result)
        }
        (S::Validating { .. }, E::ValidationFailed { error }) => {
            TransitionResult::error(error.user_message(), None)
        }

        (S::Valid { check_in }, E::PhotoRequested) => TransitionResult::new(
            S::CapturingPhoto {
                check_in,
                notes: None,
            },
            vec![Effect::CapturePhoto],
        ),
        (
            S::Error {
                retained: Some(RetainedCheckIn { check_in, notes }),
                ..
            },
            E::PhotoRequested,
        ) => TransitionResult::new(
            S::CapturingPhoto { check_in, notes },
            vec![Effect::CapturePhoto],
        ),

        (S::CapturingPhoto { check_in, notes }, E::PhotoCaptured { photo }) => {
            TransitionResult::state_only(S::ReadyToSubmit {
                check_in,
                photo,
                notes,
                last_error: None,
            })
        }
        // Denied, cancelled and hardware failures all look the same to the guard
        (S::CapturingPhoto { check_in, notes }, E::PhotoFailed { .. }) => {
            TransitionResult::error(CAPTURE_FAILED, Some(RetainedCheckIn { check_in, notes }))
        }

        (S::ReadyToSubmit { check_in, notes, .. }, E::Retake) => TransitionResult::new(
            S::CapturingPhoto { check_in, notes },
            vec![Effect::CapturePhoto],
        ),
        (
            S::ReadyToSubmit {
                check_in,
                photo,
                last_error,
                ..
            },
            E::NotesEdited { notes },
        ) => TransitionResult::state_only(S::ReadyToSubmit {
            check_in,
            photo,
            notes: normalize_notes(notes),
            last_error,
        }),
        (
            S::ReadyToSubmit {
                check_in,
                photo,
                notes,
                ..
            },
            E::Confirm,
        ) => {
            let submission = DeliverySubmission {
                validation_id: check_in.validation_id,
                employee_id: check_in.employee.id,
                guard_id: context.guard.guard_id,
                period_id: check_in.period_id,
                photo: photo.clone(),
                notes: notes.clone(),
                device_id: context.device_id.clone(),
            };
            TransitionResult::new(
                S::Submitting {
                    check_in,
                    photo,
                    notes,
                },
                vec![Effect::Submit { submission }],
            )
        }

        (S::Submitting { check_in, .. }, E::SubmissionAccepted { confirmation }) => {
            TransitionResult::state_only(S::Done {
                employee: check_in.employee,
                confirmation,
            })
        }
        // Back to ReadyToSubmit, photo kept, so the guard can confirm again
        (
            S::Submitting {
                check_in,
                photo,
                notes,
            },
            E::SubmissionFailed { error },
        ) => TransitionResult::state_only(S::ReadyToSubmit {
            check_in,
            photo,
            notes,
            last_error: Some(error.user_message()),
        }),

        (state, event) => {
            debug!(
                state = state.name(),
                event = event.name(),
                "event does not apply, ignored"
            );
            TransitionResult::state_only(state)
        }
    }
}

fn validation_outcome(token: token::CheckInToken, result: ValidationResult) -> TransitionResult {
    if !result.valid {
        let message = result
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| TOKEN_REJECTED.to_owned());
        return TransitionResult::error(message, None);
    }
    match (result.employee, result.validation_id) {
        (Some(employee), Some(validation_id)) => {
            TransitionResult::state_only(CheckInState::Valid {
                check_in: ValidatedCheckIn {
                    token,
                    validation_id,
                    period_id: result.period_id,
                    employee,
                },
            })
        }
        _ => TransitionResult::error(INCOMPLETE_VALIDATION, None),
    }
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
}
