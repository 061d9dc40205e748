use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{LeadId, PersonalInfo, SharedFields};
use crate::domain::service::ServiceKind;
use crate::errors::DomainError;
use crate::flows::aggregator::ServiceDataAggregator;
use crate::flows::catalog::StepId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "service", rename_all = "snake_case")]
pub enum WizardMode {
    Guided,
    PreSelected(ServiceKind),
}

impl WizardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guided => "guided",
            Self::PreSelected(_) => "pre_selected",
        }
    }

    pub fn pre_selected(&self) -> Option<ServiceKind> {
        match self {
            Self::PreSelected(kind) => Some(*kind),
            Self::Guided => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    NotSubmitted,
    InFlight {
        attempt: u32,
    },
    Succeeded {
        lead_id: LeadId,
    },
    Failed {
        reason: String,
    },
}

impl SubmissionState {
    pub fn can_transition_to(&self, next: &SubmissionState) -> bool {
        matches!(
            (self, next),
            (Self::NotSubmitted, Self::InFlight { .. })
                | (Self::Failed { .. }, Self::InFlight { .. })
                | (Self::InFlight { .. }, Self::Succeeded { .. })
                | (Self::InFlight { .. }, Self::Failed { .. })
        )
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// State of one wizard visit. Only the wizard engine mutates it; hosts read
/// it through the accessors.
#[derive(Clone, Debug, PartialEq)]
pub struct WizardSession {
    pub(crate) id: SessionId,
    pub(crate) mode: WizardMode,
    pub(crate) selected_services: BTreeSet<ServiceKind>,
    pub(crate) current_step: StepId,
    pub(crate) personal_info: PersonalInfo,
    pub(crate) service_data: ServiceDataAggregator,
    pub(crate) completed_services: BTreeSet<ServiceKind>,
    pub(crate) shared_fields: SharedFields,
    pub(crate) submission: SubmissionState,
    pub(crate) attempts: u32,
    pub(crate) started_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn guided() -> Self {
        Self::with_mode(WizardMode::Guided, BTreeSet::new(), StepId::Services)
    }

    pub fn pre_selected(kind: ServiceKind) -> Self {
        Self::with_mode(
            WizardMode::PreSelected(kind),
            BTreeSet::from([kind]),
            StepId::Service(kind),
        )
    }

    fn with_mode(
        mode: WizardMode,
        selected_services: BTreeSet<ServiceKind>,
        current_step: StepId,
    ) -> Self {
        Self {
            id: SessionId::new(),
            mode,
            selected_services,
            current_step,
            personal_info: PersonalInfo::default(),
            service_data: ServiceDataAggregator::default(),
            completed_services: BTreeSet::new(),
            shared_fields: SharedFields::default(),
            submission: SubmissionState::NotSubmitted,
            attempts: 0,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    pub fn selected_services(&self) -> &BTreeSet<ServiceKind> {
        &self.selected_services
    }

    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    pub fn personal_info(&self) -> &PersonalInfo {
        &self.personal_info
    }

    pub fn service_data(&self) -> &ServiceDataAggregator {
        &self.service_data
    }

    pub fn is_service_complete(&self, kind: ServiceKind) -> bool {
        self.completed_services.contains(&kind)
    }

    pub fn shared_fields(&self) -> &SharedFields {
        &self.shared_fields
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub(crate) fn transition_submission(
        &mut self,
        next: SubmissionState,
    ) -> Result<(), DomainError> {
        if self.submission.can_transition_to(&next) {
            self.submission = next;
            return Ok(());
        }

        Err(DomainError::InvalidSubmissionTransition { from: self.submission.clone(), to: next })
    }

    /// Drops everything recorded for a service that is no longer selected.
    pub(crate) fn forget_service(&mut self, kind: ServiceKind) {
        self.service_data.remove(kind);
        self.completed_services.remove(&kind);
    }
}
