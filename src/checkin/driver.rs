//! Runs a check-in against real (or fake) capabilities.
//!
//! Guard actions become events; the effects the machine returns are
//! performed one at a time, in order, and each result is fed back before
//! the next effect runs. A call that never returns leaves the driver
//! blocked on it.

use super::effect::Effect;
use super::event::CheckInEvent;
use super::machine::CheckInMachine;
use super::state::CheckInState;
use crate::api::Backend;
use crate::camera::{Camera, CaptureConfig};
use crate::error::CheckInError;
use crate::scanner::{CodeScanner, ScanOutcome};
use crate::session::CheckInContext;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

pub struct CheckInDriver<B> {
    machine: CheckInMachine,
    backend: B,
    scanner: Box<dyn CodeScanner>,
    camera: Box<dyn Camera>,
    capture: CaptureConfig,
}

impl<B: Backend> CheckInDriver<B> {
    pub fn new(
        context: CheckInContext,
        backend: B,
        scanner: Box<dyn CodeScanner>,
        camera: Box<dyn Camera>,
        capture: CaptureConfig,
    ) -> Self {
        CheckInDriver {
            machine: CheckInMachine::new(context),
            backend,
            scanner,
            camera,
            capture,
        }
    }

    pub fn state(&self) -> &CheckInState {
        self.machine.state()
    }

    pub fn context(&self) -> &CheckInContext {
        self.machine.context()
    }

    /// Start scanning. Ignored unless the machine is idle, so only one
    /// check-in is ever in flight.
    pub fn start_scan(&mut self) -> &CheckInState {
        let state = self.machine.state();
        if *state != CheckInState::Idle {
            if state.is_awaiting_response() {
                debug!(%state, "check-in already in progress, ignoring start");
            } else {
                debug!(%state, "reset or start the next check-in before scanning");
            }
            return self.machine.state();
        }
        // Only a refusal blocks the scan; any other scanner fault surfaces
        // when the read is attempted
        let permission_granted = match self.scanner.check_permission() {
            Ok(()) => true,
            Err(e @ CheckInError::Permission(_)) => {
                warn!("scanner permission denied: {}", e);
                false
            }
            Err(e) => {
                warn!("scanner check failed: {}", e);
                true
            }
        };
        self.dispatch(CheckInEvent::ScanStarted { permission_granted })
    }

    pub fn take_photo(&mut self) -> &CheckInState {
        self.dispatch(CheckInEvent::PhotoRequested)
    }

    pub fn retake(&mut self) -> &CheckInState {
        self.dispatch(CheckInEvent::Retake)
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> &CheckInState {
        self.dispatch(CheckInEvent::NotesEdited { notes })
    }

    pub fn confirm(&mut self) -> &CheckInState {
        self.dispatch(CheckInEvent::Confirm)
    }

    pub fn reset(&mut self) -> &CheckInState {
        self.dispatch(CheckInEvent::Reset)
    }

    /// Replace a finished machine with a fresh one for the next employee,
    /// using the period that is active now. Returns `Ok(false)` if the
    /// current check-in is not done. If the period cannot be fetched the
    /// finished machine is kept and the error returned.
    pub fn start_next(&mut self) -> Result<bool, CheckInError> {
        if !self.machine.state().is_done() {
            return Ok(false);
        }
        let period = self.backend.active_period()?;
        let mut context = self.machine.context().clone();
        if period.id != context.period.id {
            info!(from = %context.period.id, to = %period.id, "active period changed");
        }
        context.period = period;
        self.machine = CheckInMachine::new(context);
        Ok(true)
    }

    /// Feed one event and run every effect that follows from it.
    pub fn dispatch(&mut self, event: CheckInEvent) -> &CheckInState {
        let mut pending: VecDeque<Effect> = self.machine.handle(event).into();
        while let Some(effect) = pending.pop_front() {
            let result = self.perform(effect);
            pending.extend(self.machine.handle(result));
        }
        self.machine.state()
    }

    fn perform(&mut self, effect: Effect) -> CheckInEvent {
        match effect {
            Effect::ReadCode => match self.scanner.read_code() {
                Ok(ScanOutcome::Content(raw)) => CheckInEvent::CodeRead { raw },
                Ok(ScanOutcome::Cancelled) => CheckInEvent::ScanCancelled,
                Err(error) => {
                    warn!("scanner failed: {}", error);
                    CheckInEvent::ScanFailed { error }
                }
            },
            Effect::Validate { token, period_id } => {
                match self.backend.validate(&token, period_id) {
                    Ok(result) => CheckInEvent::ValidationReceived { result },
                    Err(error) => {
                        warn!("validation failed: {}", error);
                        CheckInEvent::ValidationFailed { error }
                    }
                }
            }
            Effect::CapturePhoto => match self.camera.capture(&self.capture) {
                Ok(photo) => {
                    debug!(bytes = photo.len(), "photo captured");
                    CheckInEvent::PhotoCaptured { photo }
                }
                Err(error) => {
                    warn!("photo capture failed: {}", error);
                    CheckInEvent::PhotoFailed { error }
                }
            },
            Effect::Submit { submission } => match self.backend.submit(&submission) {
                Ok(confirmation) => {
                    info!(
                        employee_id = %submission.employee_id,
                        delivery_id = ?confirmation.delivery_id,
                        "delivery recorded"
                    );
                    CheckInEvent::SubmissionAccepted { confirmation }
                }
                Err(error) => {
                    warn!("delivery submission failed: {}", error);
                    CheckInEvent::SubmissionFailed { error }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Photo;
    use crate::checkin::fixtures::*;
    use crate::error::CheckInError;
    use crate::model::{
        DeliveryConfirmation, DeliverySubmission, Period, PeriodId, ValidationResult,
    };
    use crate::token::CheckInToken;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        validations: Vec<(CheckInToken, PeriodId)>,
        submissions: Vec<DeliverySubmission>,
        captures: usize,
        scans: usize,
    }

    #[derive(Clone)]
    struct FakeBackend {
        calls: Rc<RefCell<Calls>>,
        validation: Result<ValidationResult, CheckInError>,
        submit_results: Rc<RefCell<VecDeque<Result<DeliveryConfirmation, CheckInError>>>>,
        periods: Rc<RefCell<VecDeque<Result<Period, CheckInError>>>>,
    }

    impl Backend for FakeBackend {
        fn active_period(&self) -> Result<Period, CheckInError> {
            self.periods
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(context().period))
        }

        fn validate(
            &self,
            token: &CheckInToken,
            period_id: PeriodId,
        ) -> Result<ValidationResult, CheckInError> {
            self.calls
                .borrow_mut()
                .validations
                .push((token.clone(), period_id));
            self.validation.clone()
        }

        fn submit(
            &self,
            submission: &DeliverySubmission,
        ) -> Result<DeliveryConfirmation, CheckInError> {
            self.calls.borrow_mut().submissions.push(submission.clone());
            self.submit_results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(confirmation()))
        }
    }

    struct FakeScanner {
        calls: Rc<RefCell<Calls>>,
        permission: Result<(), CheckInError>,
        codes: VecDeque<ScanOutcome>,
    }

    impl CodeScanner for FakeScanner {
        fn check_permission(&mut self) -> Result<(), CheckInError> {
            self.permission.clone()
        }

        fn read_code(&mut self) -> Result<ScanOutcome, CheckInError> {
            self.calls.borrow_mut().scans += 1;
            Ok(self.codes.pop_front().unwrap_or(ScanOutcome::Cancelled))
        }
    }

    struct FakeCamera {
        calls: Rc<RefCell<Calls>>,
        results: VecDeque<Result<Photo, CheckInError>>,
    }

    impl Camera for FakeCamera {
        fn capture(&mut self, _config: &CaptureConfig) -> Result<Photo, CheckInError> {
            self.calls.borrow_mut().captures += 1;
            self.results.pop_front().unwrap_or_else(|| Ok(photo()))
        }
    }

    struct Setup {
        permission: Result<(), CheckInError>,
        codes: Vec<&'static str>,
        validation: Result<ValidationResult, CheckInError>,
        photos: Vec<Result<Photo, CheckInError>>,
        submits: Vec<Result<DeliveryConfirmation, CheckInError>>,
        periods: Vec<Result<Period, CheckInError>>,
    }

    impl Default for Setup {
        fn default() -> Self {
            Setup {
                permission: Ok(()),
                codes: vec!["CLIPCONTROL:abc123:0"],
                validation: Ok(accepted_validation()),
                photos: Vec::new(),
                submits: Vec::new(),
                periods: Vec::new(),
            }
        }
    }

    fn driver(setup: Setup) -> (CheckInDriver<FakeBackend>, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let backend = FakeBackend {
            calls: calls.clone(),
            validation: setup.validation,
            submit_results: Rc::new(RefCell::new(setup.submits.into())),
            periods: Rc::new(RefCell::new(setup.periods.into())),
        };
        let scanner = FakeScanner {
            calls: calls.clone(),
            permission: setup.permission,
            codes: setup
                .codes
                .into_iter()
                .map(|c| ScanOutcome::Content(c.to_owned()))
                .collect(),
        };
        let camera = FakeCamera {
            calls: calls.clone(),
            results: setup.photos.into(),
        };
        let driver = CheckInDriver::new(
            context(),
            backend,
            Box::new(scanner),
            Box::new(camera),
            CaptureConfig::default(),
        );
        (driver, calls)
    }

    #[test]
    fn full_check_in() {
        let (mut driver, calls) = driver(Setup::default());
        assert_eq!(
            driver.start_scan(),
            &CheckInState::Valid {
                check_in: validated()
            }
        );
        assert_eq!(
            calls.borrow().validations,
            vec![(scanned_token(), PeriodId(7))]
        );

        assert!(matches!(
            driver.take_photo(),
            CheckInState::ReadyToSubmit { .. }
        ));
        driver.set_notes(Some("sin novedad".to_owned()));
        assert!(driver.confirm().is_done());

        let calls = calls.borrow();
        assert_eq!(calls.submissions.len(), 1);
        assert_eq!(calls.submissions[0].notes.as_deref(), Some("sin novedad"));
        assert_eq!(calls.captures, 1);
    }

    #[test]
    fn denied_permission_never_scans() {
        let (mut driver, calls) = driver(Setup {
            permission: Err(CheckInError::Permission("camera".to_owned())),
            ..Setup::default()
        });
        assert_eq!(driver.start_scan().error_message(), Some("permission denied"));
        assert_eq!(calls.borrow().scans, 0);
    }

    #[test]
    fn unavailable_scanner_is_not_a_permission_error() {
        let (mut driver, calls) = driver(Setup {
            permission: Err(CheckInError::Capture("/dev/ttyACM0 not found".to_owned())),
            ..Setup::default()
        });
        // The read is still attempted and reports its own outcome
        assert!(matches!(driver.start_scan(), CheckInState::Valid { .. }));
        assert_eq!(calls.borrow().scans, 1);
    }

    #[test]
    fn scan_is_ignored_after_an_error_until_reset() {
        let (mut driver, calls) = driver(Setup {
            codes: vec!["BADSCHEME:abc123:0", "CLIPCONTROL:abc123:0"],
            ..Setup::default()
        });
        driver.start_scan();
        assert_eq!(driver.start_scan().error_message(), Some("invalid format"));
        assert_eq!(calls.borrow().scans, 1);

        driver.reset();
        assert!(matches!(driver.start_scan(), CheckInState::Valid { .. }));
        assert_eq!(calls.borrow().scans, 2);
    }

    #[test]
    fn second_start_is_ignored_while_in_flight() {
        let (mut driver, calls) = driver(Setup::default());
        driver.start_scan();
        driver.start_scan();
        assert_eq!(calls.borrow().scans, 1);
        assert_eq!(calls.borrow().validations.len(), 1);
    }

    #[test]
    fn bad_code_never_reaches_backend() {
        let (mut driver, calls) = driver(Setup {
            codes: vec!["BADSCHEME:abc123:0"],
            ..Setup::default()
        });
        assert_eq!(driver.start_scan().error_message(), Some("invalid format"));
        assert!(calls.borrow().validations.is_empty());
    }

    #[test]
    fn capture_retry_does_not_rescan() {
        let (mut driver, calls) = driver(Setup {
            photos: vec![Err(CheckInError::Capture("cancelled".to_owned()))],
            ..Setup::default()
        });
        driver.start_scan();
        assert_eq!(driver.take_photo().error_message(), Some("capture failed"));
        assert!(matches!(
            driver.take_photo(),
            CheckInState::ReadyToSubmit { .. }
        ));
        let calls = calls.borrow();
        assert_eq!(calls.scans, 1);
        assert_eq!(calls.validations.len(), 1);
        assert_eq!(calls.captures, 2);
    }

    #[test]
    fn failed_submit_is_retried_only_on_confirm() {
        let (mut driver, calls) = driver(Setup {
            submits: vec![Err(CheckInError::Server(Some("duplicate".to_owned())))],
            ..Setup::default()
        });
        driver.start_scan();
        driver.take_photo();

        let state = driver.confirm();
        assert!(matches!(state, CheckInState::ReadyToSubmit { .. }));
        assert_eq!(state.error_message(), Some("duplicate"));
        assert_eq!(state.photo(), Some(&photo()));
        assert_eq!(calls.borrow().submissions.len(), 1);

        assert!(driver.confirm().is_done());
        let calls = calls.borrow();
        assert_eq!(calls.submissions.len(), 2);
        assert_eq!(calls.submissions[0], calls.submissions[1]);
        assert_eq!(calls.captures, 1);
    }

    #[test]
    fn next_check_in_starts_fresh() {
        let (mut driver, _calls) = driver(Setup::default());
        assert!(!driver.start_next().unwrap());
        driver.start_scan();
        driver.take_photo();
        driver.confirm();
        assert!(driver.start_next().unwrap());
        assert_eq!(driver.state(), &CheckInState::Idle);
        assert_eq!(driver.context(), &context());
    }

    fn period(id: i64) -> Period {
        Period {
            id: PeriodId(id),
            ..context().period
        }
    }

    #[test]
    fn next_check_in_uses_current_period() {
        let (mut driver, calls) = driver(Setup {
            codes: vec!["CLIPCONTROL:abc123:0", "CLIPCONTROL:def456:0"],
            periods: vec![Ok(period(8))],
            ..Setup::default()
        });
        driver.start_scan();
        driver.take_photo();
        driver.confirm();
        assert!(driver.start_next().unwrap());
        assert_eq!(driver.context().period.id, PeriodId(8));

        driver.start_scan();
        let calls = calls.borrow();
        let periods: Vec<PeriodId> = calls.validations.iter().map(|(_, p)| *p).collect();
        assert_eq!(periods, vec![PeriodId(7), PeriodId(8)]);
    }

    #[test]
    fn period_fetch_failure_keeps_finished_check_in() {
        let (mut driver, _calls) = driver(Setup {
            periods: vec![Err(CheckInError::Network("refused".to_owned()))],
            ..Setup::default()
        });
        driver.start_scan();
        driver.take_photo();
        driver.confirm();

        let err = driver.start_next().unwrap_err();
        assert_eq!(err.user_message(), "could not reach the server");
        assert!(driver.state().is_done());

        // Next attempt succeeds with the default period
        assert!(driver.start_next().unwrap());
        assert_eq!(driver.state(), &CheckInState::Idle);
    }

    #[test]
    fn cancelled_scan_is_idle_again() {
        let (mut driver, calls) = driver(Setup {
            codes: Vec::new(),
            ..Setup::default()
        });
        assert_eq!(driver.start_scan(), &CheckInState::Idle);
        assert_eq!(calls.borrow().scans, 1);
    }
}
