//! Calls the check-in machine asks to have made.
//!
//! Each effect produces exactly one result event.

use crate::model::{DeliverySubmission, PeriodId};
use crate::token::CheckInToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Read one code from the scanner.
    ReadCode,

    /// Ask the backend whether `token` may be redeemed in `period_id`.
    Validate {
        token: CheckInToken,
        period_id: PeriodId,
    },

    /// Take one still of the employee.
    CapturePhoto,

    /// Record the delivery. Sent once per confirm, never automatically
    /// repeated.
    Submit { submission: DeliverySubmission },
}
