//! Data exchanged with the backend and carried through a check-in.
//!
//! Field names on the wire are the backend's (Spanish) names; the Rust side
//! uses English names and maps them with `serde(rename)`.

use crate::camera::Photo;
use crate::token::CheckInToken;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

id_newtype!(EmployeeId);
id_newtype!(GuardId);
id_newtype!(PeriodId);
id_newtype!(BranchId);
id_newtype!(
    /// Identifier of the validated QR token record; a submission must quote it.
    ValidationId
);

/// Read-only projection of an employee, as returned by token validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    #[serde(rename = "rut")]
    pub national_id: String,
    #[serde(rename = "tipo_contrato")]
    pub contract_type: String,
    #[serde(rename = "tipo_caja")]
    pub box_type: String,
}

/// Outcome of asking the backend whether a token may be redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub employee: Option<Employee>,
    pub validation_id: Option<ValidationId>,
    pub period_id: PeriodId,
    pub message: Option<String>,
    /// Backend reason code such as `TOKEN_USADO`; informational only.
    pub code: Option<String>,
}

/// A token the backend accepted, with everything a submission needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheckIn {
    pub token: CheckInToken,
    pub validation_id: ValidationId,
    pub period_id: PeriodId,
    pub employee: Employee,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySubmission {
    pub validation_id: ValidationId,
    pub employee_id: EmployeeId,
    pub guard_id: GuardId,
    pub period_id: PeriodId,
    pub photo: Photo,
    pub notes: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryConfirmation {
    #[serde(rename = "entrega_id", default)]
    pub delivery_id: Option<i64>,
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

/// The logged-in guard. Loaded at start-up, never modified by a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSession {
    #[serde(rename = "id")]
    pub guard_id: GuardId,
    pub username: String,
    #[serde(rename = "nombre_completo", default)]
    pub full_name: String,
    #[serde(rename = "rol", default)]
    pub role: String,
    #[serde(rename = "sucursal_id", default)]
    pub branch_id: Option<BranchId>,
}

impl GuardSession {
    pub fn is_guard(&self) -> bool {
        self.role.eq_ignore_ascii_case("guardia")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "fecha_inicio")]
    pub starts_on: NaiveDate,
    #[serde(rename = "fecha_fin")]
    pub ends_on: NaiveDate,
    #[serde(rename = "activo", default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardStats {
    #[serde(rename = "total_hoy")]
    pub total_today: u32,
    #[serde(rename = "planta")]
    pub permanent: u32,
    #[serde(rename = "plazo_fijo")]
    pub fixed_term: u32,
    #[serde(rename = "ultima_entrega", default)]
    pub last_delivery: Option<LastDelivery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LastDelivery {
    #[serde(rename = "fecha")]
    pub at: String,
    #[serde(rename = "minutos_atras")]
    pub minutes_ago: i64,
}

/// Benefit being handed out, chosen by the guard and remembered between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BenefitCategory {
    #[default]
    #[serde(rename = "caja_bimensual")]
    BimonthlyBox,
    #[serde(rename = "cajas_navidad")]
    ChristmasBoxes,
    #[serde(rename = "fiestas_patrias")]
    NationalHolidays,
    #[serde(rename = "fin_año")]
    YearEndGift,
    #[serde(rename = "general")]
    General,
}

impl BenefitCategory {
    pub const ALL: [BenefitCategory; 5] = [
        BenefitCategory::BimonthlyBox,
        BenefitCategory::ChristmasBoxes,
        BenefitCategory::NationalHolidays,
        BenefitCategory::YearEndGift,
        BenefitCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BenefitCategory::BimonthlyBox => "caja_bimensual",
            BenefitCategory::ChristmasBoxes => "cajas_navidad",
            BenefitCategory::NationalHolidays => "fiestas_patrias",
            BenefitCategory::YearEndGift => "fin_año",
            BenefitCategory::General => "general",
        }
    }
}

impl fmt::Display for BenefitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenefitCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenefitCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = BenefitCategory::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown benefit category {:?} (expected one of {})", s, known.join(", "))
            })
    }
}
