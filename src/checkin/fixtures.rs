//! Shared test data for the check-in machine.

use super::state::CheckInState;
use crate::camera::Photo;
use crate::model::{
    BenefitCategory, DeliveryConfirmation, Employee, EmployeeId, GuardId, GuardSession, Period,
    PeriodId, ValidatedCheckIn, ValidationId, ValidationResult,
};
use crate::session::CheckInContext;
use crate::token::{self, CheckInToken};
use chrono::NaiveDate;

pub fn context() -> CheckInContext {
    CheckInContext {
        guard: GuardSession {
            guard_id: GuardId(4),
            username: "guardia1".to_owned(),
            full_name: "Pedro Soto".to_owned(),
            role: "guardia".to_owned(),
            branch_id: None,
        },
        period: Period {
            id: PeriodId(7),
            name: "Marzo".to_owned(),
            description: None,
            starts_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            active: true,
        },
        benefit: BenefitCategory::BimonthlyBox,
        device_id: Some("porteria-norte".to_owned()),
    }
}

pub fn employee() -> Employee {
    Employee {
        id: EmployeeId(12),
        full_name: "Ana Rojas".to_owned(),
        national_id: "12.345.678-9".to_owned(),
        contract_type: "PLANTA".to_owned(),
        box_type: "PLANTA".to_owned(),
    }
}

pub fn scanned_token() -> CheckInToken {
    token::decode("CLIPCONTROL:abc123:0").unwrap()
}

pub fn validating() -> CheckInState {
    CheckInState::Validating {
        token: scanned_token(),
    }
}

pub fn accepted_validation() -> ValidationResult {
    ValidationResult {
        valid: true,
        employee: Some(employee()),
        validation_id: Some(ValidationId(55)),
        period_id: PeriodId(7),
        message: Some("QR válido - Puede proceder con el registro".to_owned()),
        code: Some("OK".to_owned()),
    }
}

pub fn validated() -> ValidatedCheckIn {
    ValidatedCheckIn {
        token: scanned_token(),
        validation_id: ValidationId(55),
        period_id: PeriodId(7),
        employee: employee(),
    }
}

pub fn photo() -> Photo {
    Photo::from_jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9]).unwrap()
}

pub fn confirmation() -> DeliveryConfirmation {
    DeliveryConfirmation {
        delivery_id: Some(99),
        message: Some("Entrega registrada exitosamente".to_owned()),
        timestamp: None,
    }
}
