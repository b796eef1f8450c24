//! HTTP client for the ClipControl backend.
//!
//! Every call is a single request/response. Nothing here retries, and no
//! timeout is imposed: a hung call blocks until the transport itself gives
//! up.

use crate::error::CheckInError;
use crate::model::{
    BenefitCategory, Branch, DeliveryConfirmation, DeliverySubmission, Employee, GuardId,
    GuardSession, GuardStats, Period, PeriodId, ValidationId, ValidationResult,
};
use crate::session::StoredSession;
use crate::token::CheckInToken;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const UNEXPECTED_RESPONSE: &str = "unexpected response from server";

/// The server calls a check-in makes. Split out so the workflow can run
/// against something other than the real server.
pub trait Backend {
    /// Fetched again before every check-in, so a long-running session picks
    /// up a new period.
    fn active_period(&self) -> Result<Period, CheckInError>;

    fn validate(
        &self,
        token: &CheckInToken,
        period_id: PeriodId,
    ) -> Result<ValidationResult, CheckInError>;

    /// Not idempotent: each call records a delivery.
    fn submit(
        &self,
        submission: &DeliverySubmission,
    ) -> Result<DeliveryConfirmation, CheckInError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    access_token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    user: GuardSession,
}

#[derive(Deserialize)]
struct ValidateResponse {
    #[serde(rename = "valido")]
    valid: bool,
    #[serde(rename = "codigo", default)]
    code: Option<String>,
    #[serde(rename = "mensaje", default)]
    message: Option<String>,
    #[serde(rename = "empleado", default)]
    employee: Option<Employee>,
    #[serde(default)]
    token_id: Option<i64>,
}

impl ValidateResponse {
    fn into_result(self, period_id: PeriodId) -> ValidationResult {
        ValidationResult {
            valid: self.valid,
            employee: self.employee,
            validation_id: self.token_id.map(ValidationId),
            period_id,
            message: self.message,
            code: self.code,
        }
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CheckInError> {
        let http = Client::builder()
            .timeout(None::<Duration>)
            .user_agent(concat!("clipcontrol-guard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CheckInError::Network(e.to_string()))?;
        Ok(ApiClient {
            base_url: base_url.into(),
            http,
            access_token: None,
        })
    }

    pub fn with_session(mut self, session: &StoredSession) -> Self {
        self.access_token = Some(session.access_token.clone());
        self
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CheckInError> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| CheckInError::Network(e.to_string()))?;
        read_json(response)
    }

    /// Exchange credentials for a session. Only guards may use this client.
    pub fn login(&self, username: &str, password: &str) -> Result<StoredSession, CheckInError> {
        let request = self
            .http
            .post(self.url("auth/login"))
            .json(&LoginRequest { username, password });
        let response: LoginResponse = self.send(request)?;
        if !response.user.is_guard() {
            warn!(username, role = %response.user.role, "refusing non-guard login");
            return Err(CheckInError::Auth(
                "only guards may use this app".to_owned(),
            ));
        }
        info!(username, "logged in");
        Ok(StoredSession {
            access_token: response.access_token,
            guard: response.user,
            benefit: BenefitCategory::default(),
        })
    }

    pub fn branches(&self) -> Result<Vec<Branch>, CheckInError> {
        self.send(self.http.get(self.url("sucursales")))
    }

    pub fn guard_stats(&self, guard_id: GuardId) -> Result<GuardStats, CheckInError> {
        let path = format!("entregas/estadisticas-guardia/{}", guard_id);
        self.send(self.http.get(self.url(&path)))
    }
}

impl Backend for ApiClient {
    fn active_period(&self) -> Result<Period, CheckInError> {
        self.send(self.http.get(self.url("periodos/activo")))
    }

    fn validate(
        &self,
        token: &CheckInToken,
        period_id: PeriodId,
    ) -> Result<ValidationResult, CheckInError> {
        debug!(%period_id, "validating token");
        let request = self.http.post(self.url("qr/validar")).query(&[
            ("token", token.secret().to_owned()),
            ("periodo_id", period_id.to_string()),
        ]);
        let response: ValidateResponse = self.send(request)?;
        Ok(response.into_result(period_id))
    }

    fn submit(
        &self,
        submission: &DeliverySubmission,
    ) -> Result<DeliveryConfirmation, CheckInError> {
        debug!(
            validation_id = %submission.validation_id,
            employee_id = %submission.employee_id,
            photo_bytes = submission.photo.len(),
            "submitting delivery"
        );
        let photo = multipart::Part::bytes(submission.photo.bytes().to_vec())
            .file_name("foto.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| CheckInError::Network(e.to_string()))?;
        let mut form = multipart::Form::new()
            .text("qr_token_id", submission.validation_id.to_string())
            .text("empleado_id", submission.employee_id.to_string())
            .text("usuario_id", submission.guard_id.to_string())
            .text("periodo_id", submission.period_id.to_string())
            .part("foto", photo)
            .text(
                "observaciones",
                submission.notes.clone().unwrap_or_default(),
            );
        if let Some(device_id) = &submission.device_id {
            form = form.text("dispositivo_id", device_id.clone());
        }
        self.send(self.http.post(self.url("entregas/registrar-seguro")).multipart(form))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CheckInError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().map_err(|e| {
            if e.is_decode() {
                warn!("undecodable response body: {}", e);
                CheckInError::Server(Some(UNEXPECTED_RESPONSE.to_owned()))
            } else {
                CheckInError::Network(e.to_string())
            }
        });
    }
    let body = response.text().unwrap_or_default();
    let err = status_error(status, &body);
    debug!(%status, error = %err, "request rejected");
    Err(err)
}

fn status_error(status: StatusCode, body: &str) -> CheckInError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CheckInError::Auth(detail.unwrap_or_default())
        }
        _ => CheckInError::Server(detail),
    }
}

/// Pull the human-readable message out of an error body. The backend uses
/// `{"detail": ...}`, where detail is usually a string but is a list of
/// field errors for malformed requests.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("mensaje"))?;
    match detail {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
