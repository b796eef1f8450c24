use super::effect::Effect;
use super::event::CheckInEvent;
use super::state::CheckInState;
use super::transition::transition;
use crate::session::CheckInContext;
use tracing::info;

/// One check-in. Holds exactly one state at a time; a finished machine is
/// thrown away and a new one created for the next employee.
#[derive(Debug)]
pub struct CheckInMachine {
    context: CheckInContext,
    state: CheckInState,
}

impl CheckInMachine {
    pub fn new(context: CheckInContext) -> Self {
        CheckInMachine {
            context,
            state: CheckInState::Idle,
        }
    }

    pub fn state(&self) -> &CheckInState {
        &self.state
    }

    pub fn context(&self) -> &CheckInContext {
        &self.context
    }

    /// Apply one event and return the calls it asks for.
    pub fn handle(&mut self, event: CheckInEvent) -> Vec<Effect> {
        let from = self.state.name();
        let event_name = event.name();
        let state = std::mem::replace(&mut self.state, CheckInState::Idle);
        let result = transition(state, event, &self.context);
        if result.state.name() != from {
            info!(
                from,
                to = result.state.name(),
                event = event_name,
                "check-in transition"
            );
        }
        self.state = result.state;
        result.effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::fixtures::*;

    #[test]
    fn starts_idle() {
        let machine = CheckInMachine::new(context());
        assert_eq!(machine.state(), &CheckInState::Idle);
        assert_eq!(machine.context().period.id, context().period.id);
    }

    #[test]
    fn walks_the_happy_path() {
        let mut machine = CheckInMachine::new(context());
        machine.handle(CheckInEvent::ScanStarted {
            permission_granted: true,
        });
        machine.handle(CheckInEvent::CodeRead {
            raw: "CLIPCONTROL:abc123:0".to_owned(),
        });
        machine.handle(CheckInEvent::ValidationReceived {
            result: accepted_validation(),
        });
        assert_eq!(machine.state().employee(), Some(&employee()));

        let effects = machine.handle(CheckInEvent::PhotoRequested);
        assert_eq!(effects, vec![Effect::CapturePhoto]);
        machine.handle(CheckInEvent::PhotoCaptured { photo: photo() });
        assert_eq!(machine.state().photo(), Some(&photo()));

        machine.handle(CheckInEvent::Confirm);
        machine.handle(CheckInEvent::SubmissionAccepted {
            confirmation: confirmation(),
        });
        assert!(machine.state().is_done());
    }

    #[test]
    fn reset_drops_accumulated_data() {
        let mut machine = CheckInMachine::new(context());
        machine.handle(CheckInEvent::ScanStarted {
            permission_granted: true,
        });
        machine.handle(CheckInEvent::CodeRead {
            raw: "CLIPCONTROL:abc123:0".to_owned(),
        });
        machine.handle(CheckInEvent::ValidationReceived {
            result: accepted_validation(),
        });
        machine.handle(CheckInEvent::PhotoRequested);
        machine.handle(CheckInEvent::PhotoCaptured { photo: photo() });

        assert!(machine.handle(CheckInEvent::Reset).is_empty());
        assert_eq!(machine.state(), &CheckInState::Idle);
        assert!(machine.state().employee().is_none());
        assert!(machine.state().photo().is_none());
    }
}
