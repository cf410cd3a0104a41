//! Kiosk-facing check-in state machine.
//!
//! A `CheckInSession` is an explicit value owned by whoever drives the kiosk.
//! It snapshots the button and workflow at start and walks the resolved steps;
//! admin edits made afterwards only affect later sessions. Deleting the button
//! revokes the session's lease, which ends it with `ConfigRemoved`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buttons::{ButtonConfig, ButtonId, ButtonLease, VisitType};
use crate::error::SessionError;
use crate::session::validation::{validate_step, ValidationErrors};
use crate::workflow::resolver::effective_visit_type;
use crate::workflow::{FieldKey, NotifyPolicy, Step, WorkflowConfig, WorkflowOptions, WorkflowResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Visitor,
    IdleTimeout,
    /// A new session was started on the same kiosk
    Superseded,
    ConfigRemoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled(CancelReason),
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// Result of a successful `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { index: usize },
    Completed,
}

/// Render model for the current screen
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepView<'a> {
    pub step: &'a Step,
    pub index: usize,
    pub total: usize,
    pub errors: &'a ValidationErrors,
    pub status: SessionStatus,
}

/// Everything the completion side effects need, frozen at the moment of success
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub session_id: SessionId,
    pub button: ButtonConfig,
    pub options: WorkflowOptions,
    pub notify: NotifyPolicy,
    pub visit_type: Option<VisitType>,
    pub values: BTreeMap<FieldKey, String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRequest {
    pub fn value(&self, key: &FieldKey) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug)]
pub struct CheckInSession {
    id: SessionId,
    button: ButtonConfig,
    workflow: WorkflowConfig,
    lease: ButtonLease,
    steps: Vec<Step>,
    step_index: usize,
    status: SessionStatus,
    values: HashMap<FieldKey, String>,
    visit_type: Option<VisitType>,
    invalid_choices: Vec<FieldKey>,
    validation_errors: ValidationErrors,
    completion_pending: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl CheckInSession {
    /// Resolve the steps once and begin at the first of them
    pub fn start(
        button: ButtonConfig,
        workflow: WorkflowConfig,
        lease: ButtonLease,
        resolver: &WorkflowResolver,
    ) -> Self {
        let steps = resolver.resolve(&button, &workflow);
        let mut session = Self {
            id: SessionId::generate(),
            button,
            workflow,
            lease,
            steps,
            step_index: 0,
            status: SessionStatus::Active,
            values: HashMap::new(),
            visit_type: None,
            invalid_choices: Vec::new(),
            validation_errors: ValidationErrors::new(),
            completion_pending: false,
            started_at: Utc::now(),
            completed_at: None,
        };
        info!(
            session_id = %session.id,
            button_id = %session.button.id,
            steps = session.steps.len(),
            "Check-in session started"
        );
        // A workflow with nothing to ask resolves to `[Success]` alone
        if session.current().is_success() {
            session.complete();
        }
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn button_id(&self) -> ButtonId {
        self.button.id
    }

    pub fn button(&self) -> &ButtonConfig {
        &self.button
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn value(&self, key: &FieldKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn visit_type(&self) -> Option<VisitType> {
        effective_visit_type(&self.button, self.visit_type)
    }

    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    fn current(&self) -> &Step {
        &self.steps[self.step_index]
    }

    pub fn current_step(&self) -> StepView<'_> {
        StepView {
            step: self.current(),
            index: self.step_index,
            total: self.steps.len(),
            errors: &self.validation_errors,
            status: self.status,
        }
    }

    /// Gate for every mutating input: the session must be active and its button still configured
    fn ensure_live(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Cancelled(CancelReason::ConfigRemoved) => {
                return Err(SessionError::ConfigRemoved {
                    button_id: self.button.id,
                })
            }
            SessionStatus::Completed | SessionStatus::Cancelled(_) => {
                return Err(SessionError::SessionFinished)
            }
            SessionStatus::Active => {}
        }
        if self.lease.is_revoked() {
            warn!(
                session_id = %self.id,
                button_id = %self.button.id,
                "Button removed during session"
            );
            self.cancel(CancelReason::ConfigRemoved);
            return Err(SessionError::ConfigRemoved {
                button_id: self.button.id,
            });
        }
        Ok(())
    }

    /// Record a value for any field, on this step or another
    pub fn set_value(&mut self, key: FieldKey, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_live()?;
        let value = value.into();

        if key == FieldKey::VisitType {
            self.visit_type = value.parse().ok();
            self.invalid_choices.retain(|k| k != &key);
            if self.visit_type.is_none() && !value.trim().is_empty() {
                self.invalid_choices.push(key.clone());
            }
        }

        self.validation_errors.remove(&key);
        debug!(session_id = %self.id, field = %key, "Field value set");
        self.values.insert(key, value);
        Ok(())
    }

    /// Input event for the `TypeSelect` screen
    pub fn set_visit_type(&mut self, visit_type: VisitType) -> Result<(), SessionError> {
        self.set_value(FieldKey::VisitType, visit_type.as_str())
    }

    /// Validate the current step and move to the next one.
    ///
    /// On failure the step index is unchanged and collected values are kept.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_live()?;

        let errors = validate_step(self.current(), &self.values, &self.invalid_choices);
        if !errors.is_empty() {
            debug!(
                session_id = %self.id,
                step = ?self.current().kind,
                errors = %errors,
                "Step validation failed"
            );
            self.validation_errors = errors.clone();
            return Err(SessionError::Validation(errors));
        }

        self.validation_errors.clear();
        self.step_index += 1;
        if self.current().is_success() {
            self.complete();
            return Ok(Advance::Completed);
        }
        debug!(
            session_id = %self.id,
            index = self.step_index,
            step = ?self.current().kind,
            "Advanced to next step"
        );
        Ok(Advance::Moved {
            index: self.step_index,
        })
    }

    /// Step back without validating; does nothing on the first step or once finished
    pub fn retreat(&mut self) -> StepView<'_> {
        if self.status == SessionStatus::Active && self.step_index > 0 {
            self.step_index -= 1;
            self.validation_errors.clear();
            debug!(session_id = %self.id, index = self.step_index, "Retreated to previous step");
        }
        self.current_step()
    }

    /// End an unfinished session, discarding everything collected.
    ///
    /// A completed or already cancelled session is left as it is.
    pub fn cancel(&mut self, reason: CancelReason) {
        if self.status.is_terminal() {
            return;
        }
        self.status = SessionStatus::Cancelled(reason);
        self.values.clear();
        self.visit_type = None;
        self.invalid_choices.clear();
        self.validation_errors.clear();
        self.completion_pending = false;
        info!(session_id = %self.id, reason = ?reason, "Check-in session cancelled");
    }

    fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.completion_pending = true;
        self.completed_at = Some(Utc::now());
        info!(
            session_id = %self.id,
            button_id = %self.button.id,
            "Check-in session completed"
        );
    }

    /// Hand out the completion payload; returns `Some` exactly once per completed session
    pub fn take_completion(&mut self) -> Option<CompletionRequest> {
        if !std::mem::take(&mut self.completion_pending) {
            return None;
        }
        Some(CompletionRequest {
            session_id: self.id,
            button: self.button.clone(),
            options: self.workflow.options,
            notify: self.workflow.notify.clone(),
            visit_type: self.visit_type(),
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            started_at: self.started_at,
            completed_at: self.completed_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::{ButtonConfigStore, ButtonType, NewButton};
    use crate::session::validation::FieldError;
    use crate::workflow::{FieldFlags, StandardField, StepKind, WorkflowConfigStore};
    use std::sync::Arc;

    fn fixture(button_type: ButtonType) -> (ButtonConfigStore, ButtonId) {
        let store = ButtonConfigStore::new(Arc::new(WorkflowConfigStore::new()));
        let button = store.add(NewButton::new("Front desk", button_type)).unwrap();
        (store, button.id)
    }

    fn start(store: &ButtonConfigStore, id: &ButtonId) -> CheckInSession {
        let (button, workflow, lease) = store.checkout(id).unwrap();
        CheckInSession::start(button, workflow, lease, &WorkflowResolver::default())
    }

    fn full_name() -> FieldKey {
        FieldKey::Standard(StandardField::FullName)
    }

    #[test]
    fn test_advance_blocks_on_missing_required_field() {
        let (store, id) = fixture(ButtonType::VisitEmployee);
        store
            .workflows()
            .set_field_flags(&id, StandardField::FullName, FieldFlags::REQUIRED)
            .unwrap();
        let mut session = start(&store, &id);
        assert_eq!(session.current_step().step.kind, StepKind::ContactInfo);

        let err = session.advance().unwrap_err();
        match err {
            SessionError::Validation(errors) => {
                assert_eq!(errors.missing_fields(), vec![full_name()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.step_index(), 0);
        assert_eq!(
            session.validation_errors().get(&full_name()),
            Some(FieldError::Missing)
        );

        session.set_value(full_name(), "Grace Hopper").unwrap();
        assert!(session.validation_errors().is_empty());
        assert_eq!(session.advance().unwrap(), Advance::Moved { index: 1 });
        assert_eq!(session.current_step().step.kind, StepKind::HostSearch);
    }

    #[test]
    fn test_values_survive_validation_failure_and_retreat() {
        let (store, id) = fixture(ButtonType::VisitEmployee);
        store
            .workflows()
            .set_field_flags(&id, StandardField::Host, FieldFlags::REQUIRED)
            .unwrap();
        let mut session = start(&store, &id);

        session.set_value(full_name(), "Grace Hopper").unwrap();
        session.advance().unwrap();
        assert!(session.advance().is_err());

        let view = session.retreat();
        assert_eq!(view.index, 0);
        assert_eq!(session.value(&full_name()), Some("Grace Hopper"));
    }

    #[test]
    fn test_retreat_at_first_step_is_noop() {
        let (store, id) = fixture(ButtonType::Other);
        let mut session = start(&store, &id);

        let first = session.retreat().index;
        let second = session.retreat().index;
        assert_eq!((first, second), (0, 0));
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[test]
    fn test_type_select_rejects_unknown_choice() {
        let (store, id) = fixture(ButtonType::Other);
        let mut session = start(&store, &id);
        assert_eq!(session.current_step().step.kind, StepKind::TypeSelect);

        session.set_value(FieldKey::VisitType, "sightseeing").unwrap();
        match session.advance().unwrap_err() {
            SessionError::Validation(errors) => assert_eq!(
                errors.get(&FieldKey::VisitType),
                Some(FieldError::InvalidChoice)
            ),
            other => panic!("unexpected error: {other:?}"),
        }

        session.set_visit_type(VisitType::Interview).unwrap();
        session.advance().unwrap();
        assert_eq!(session.visit_type(), Some(VisitType::Interview));
    }

    #[test]
    fn test_completion_is_handed_out_once() {
        let (store, id) = fixture(ButtonType::Delivery);
        let mut session = start(&store, &id);

        session.set_value(FieldKey::Courier, "UPS").unwrap();
        session.advance().unwrap();
        session.set_value(FieldKey::Recipient, "Katherine Johnson").unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Completed);
        assert_eq!(session.status(), SessionStatus::Completed);

        let request = session.take_completion().unwrap();
        assert_eq!(request.value(&FieldKey::Recipient), Some("Katherine Johnson"));
        assert!(session.take_completion().is_none());
        assert_eq!(session.advance().unwrap_err(), SessionError::SessionFinished);
    }

    #[test]
    fn test_cancel_after_completion_keeps_completion() {
        let (store, id) = fixture(ButtonType::Delivery);
        let mut session = start(&store, &id);
        session.set_value(FieldKey::Courier, "FedEx").unwrap();
        session.advance().unwrap();
        session.set_value(FieldKey::Recipient, "Dorothy Vaughan").unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Completed);

        session.cancel(CancelReason::IdleTimeout);
        assert_eq!(session.status(), SessionStatus::Completed);
        let request = session.take_completion().unwrap();
        assert_eq!(request.value(&FieldKey::Courier), Some("FedEx"));
    }

    #[test]
    fn test_nothing_to_ask_completes_immediately() {
        let (store, id) = fixture(ButtonType::Event);
        for field in StandardField::ALL {
            store.workflows().set_field_flags(&id, field, FieldFlags::OFF).unwrap();
        }
        let mut session = start(&store, &id);

        assert_eq!(session.status(), SessionStatus::Completed);
        let request = session.take_completion().unwrap();
        assert_eq!(request.visit_type, Some(VisitType::Event));
    }

    #[test]
    fn test_cancel_discards_values() {
        let (store, id) = fixture(ButtonType::VisitEmployee);
        let mut session = start(&store, &id);
        session.set_value(full_name(), "Grace Hopper").unwrap();

        session.cancel(CancelReason::Visitor);
        assert_eq!(session.status(), SessionStatus::Cancelled(CancelReason::Visitor));
        assert_eq!(session.value(&full_name()), None);
        assert_eq!(
            session.set_value(full_name(), "again").unwrap_err(),
            SessionError::SessionFinished
        );
        assert!(session.take_completion().is_none());
    }

    #[test]
    fn test_removed_button_ends_session() {
        let (store, id) = fixture(ButtonType::VisitEmployee);
        let mut session = start(&store, &id);
        store.remove(&id).unwrap();

        assert_eq!(
            session.set_value(full_name(), "Grace").unwrap_err(),
            SessionError::ConfigRemoved { button_id: id }
        );
        assert_eq!(
            session.status(),
            SessionStatus::Cancelled(CancelReason::ConfigRemoved)
        );
        assert_eq!(
            session.advance().unwrap_err(),
            SessionError::ConfigRemoved { button_id: id }
        );
    }

    #[test]
    fn test_session_keeps_snapshot_after_admin_edit() {
        let (store, id) = fixture(ButtonType::VisitEmployee);
        let mut session = start(&store, &id);
        let before = session.steps().to_vec();

        store
            .workflows()
            .set_field_flags(&id, StandardField::Host, FieldFlags::OFF)
            .unwrap();
        session.set_value(full_name(), "Grace").unwrap();
        assert_eq!(session.steps(), before.as_slice());
    }
}
