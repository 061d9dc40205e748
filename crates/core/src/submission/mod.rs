//! Final step of the wizard: turning a session into one lead submission.
//!
//! A submit marks the session `InFlight` under the wizard lock before the
//! request is awaited. Any submit that arrives while that request is
//! outstanding subscribes to its result instead of issuing a second request.

pub mod payload;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::lead::LeadId;
use crate::domain::session::SubmissionState;
use crate::errors::{ApplicationError, DomainError, InterfaceError};
use crate::flows::engine::{LeadWizard, WizardHandle};

pub use payload::{ClientContext, LeadSubmission, SubmissionMetadata};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadReceipt {
    pub lead_id: Option<String>,
}

#[async_trait]
pub trait LeadsGateway: Send + Sync {
    async fn submit_lead(
        &self,
        submission: &LeadSubmission,
    ) -> Result<LeadReceipt, ApplicationError>;
}

#[async_trait]
impl<G> LeadsGateway for Arc<G>
where
    G: LeadsGateway + ?Sized,
{
    async fn submit_lead(
        &self,
        submission: &LeadSubmission,
    ) -> Result<LeadReceipt, ApplicationError> {
        (**self).submit_lead(submission).await
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Succeeded { lead_id: LeadId },
    Failed { error: InterfaceError },
    /// Preconditions not met; no request was made.
    Blocked { error: DomainError },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn lead_id(&self) -> Option<&LeadId> {
        match self {
            Self::Succeeded { lead_id } => Some(lead_id),
            _ => None,
        }
    }

    /// Text the host can show next to the submit button.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error } => Some(error.user_message().to_string()),
            Self::Blocked { error } => Some(error.to_string()),
        }
    }
}

pub(crate) enum SubmissionStart {
    Settled(SubmissionOutcome),
    Pending { receiver: watch::Receiver<Option<SubmissionOutcome>>, correlation_id: String },
    Started { payload: Box<LeadSubmission>, publisher: watch::Sender<Option<SubmissionOutcome>> },
}

pub struct SubmissionCoordinator<G> {
    gateway: G,
    client: ClientContext,
}

impl<G> SubmissionCoordinator<G>
where
    G: LeadsGateway,
{
    pub fn new(gateway: G, client: ClientContext) -> Self {
        Self { gateway, client }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn submit(&self, handle: &WizardHandle) -> SubmissionOutcome {
        let start = handle.update(|wizard| begin_submission(wizard, &self.client));
        let (payload, publisher) = match start {
            SubmissionStart::Settled(outcome) => return outcome,
            SubmissionStart::Pending { receiver, correlation_id } => {
                return await_pending(receiver, correlation_id).await;
            }
            SubmissionStart::Started { payload, publisher } => (payload, publisher),
        };

        let correlation_id = payload.metadata.session_id.to_string();
        info!(
            event_name = "submission.started",
            correlation_id = %correlation_id,
            attempt = payload.metadata.attempt,
            services = ?payload.services,
            "submitting lead"
        );

        let outcome = match self.gateway.submit_lead(&payload).await {
            Ok(receipt) => {
                let lead_id = receipt
                    .lead_id
                    .filter(|id| !id.trim().is_empty())
                    .map(LeadId)
                    .unwrap_or_else(LeadId::local_fallback);
                info!(
                    event_name = "submission.succeeded",
                    correlation_id = %correlation_id,
                    lead_id = %lead_id,
                    "lead accepted"
                );
                SubmissionOutcome::Succeeded { lead_id }
            }
            Err(error) => {
                warn!(
                    event_name = "submission.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "lead submission failed"
                );
                SubmissionOutcome::Failed { error: error.into_interface(correlation_id) }
            }
        };

        handle.update(|wizard| finish_submission(wizard, &outcome));
        publisher.send_replace(Some(outcome.clone()));
        outcome
    }
}

/// Payload the next submit would send, without sending it or touching the
/// session. Fails the same way a real submit would be blocked.
pub fn preview(wizard: &LeadWizard, client: &ClientContext) -> Result<LeadSubmission, DomainError> {
    if wizard.is_closed() {
        return Err(DomainError::WizardClosed);
    }
    if let SubmissionState::Succeeded { .. } = wizard.session().submission() {
        return Err(DomainError::SubmissionNotAllowed { current: wizard.current_step() });
    }
    wizard.validator().check_submit(wizard.session())?;

    let mut payload = LeadSubmission::from_session(wizard.session(), client, Utc::now());
    payload.metadata.attempt = wizard.session().attempts() + 1;
    Ok(payload)
}

pub(crate) fn begin_submission(wizard: &mut LeadWizard, client: &ClientContext) -> SubmissionStart {
    let correlation_id = wizard.session().id().to_string();

    if wizard.is_closed() {
        info!(
            event_name = "submission.blocked",
            correlation_id = %correlation_id,
            error = %DomainError::WizardClosed,
            "submit after the wizard was closed"
        );
        return SubmissionStart::Settled(SubmissionOutcome::Blocked {
            error: DomainError::WizardClosed,
        });
    }

    match wizard.session().submission().clone() {
        SubmissionState::Succeeded { lead_id } => {
            return SubmissionStart::Settled(SubmissionOutcome::Succeeded { lead_id });
        }
        SubmissionState::InFlight { attempt } => {
            let live = wizard.pending.as_ref().filter(|receiver| receiver.has_changed().is_ok());
            if let Some(receiver) = live {
                return SubmissionStart::Pending { receiver: receiver.clone(), correlation_id };
            }

            // The task driving this attempt went away without reporting back.
            warn!(
                event_name = "submission.abandoned",
                correlation_id = %correlation_id,
                attempt,
                "previous submission never resolved, allowing a new attempt"
            );
            wizard.pending = None;
            let interrupted =
                SubmissionState::Failed { reason: "submission was interrupted".to_string() };
            if let Err(error) = wizard.session_mut().transition_submission(interrupted) {
                return SubmissionStart::Settled(SubmissionOutcome::Blocked { error });
            }
        }
        SubmissionState::NotSubmitted | SubmissionState::Failed { .. } => {}
    }

    if let Err(error) = wizard.validator().check_submit(wizard.session()) {
        info!(
            event_name = "submission.blocked",
            correlation_id = %correlation_id,
            error = %error,
            "submit rejected before sending"
        );
        return SubmissionStart::Settled(SubmissionOutcome::Blocked { error });
    }

    let session = wizard.session_mut();
    let attempt = session.attempts + 1;
    if let Err(error) = session.transition_submission(SubmissionState::InFlight { attempt }) {
        return SubmissionStart::Settled(SubmissionOutcome::Blocked { error });
    }
    session.attempts = attempt;

    let payload = LeadSubmission::from_session(session, client, Utc::now());
    let (publisher, receiver) = watch::channel(None);
    wizard.pending = Some(receiver);

    SubmissionStart::Started { payload: Box::new(payload), publisher }
}

pub(crate) fn finish_submission(wizard: &mut LeadWizard, outcome: &SubmissionOutcome) {
    wizard.pending = None;
    let correlation_id = wizard.session().id().to_string();

    if wizard.is_closed() {
        info!(
            event_name = "submission.result_discarded",
            correlation_id = %correlation_id,
            success = outcome.is_success(),
            "wizard closed before the submission resolved"
        );
        return;
    }

    let next = match outcome {
        SubmissionOutcome::Succeeded { lead_id } => {
            SubmissionState::Succeeded { lead_id: lead_id.clone() }
        }
        SubmissionOutcome::Failed { error } => {
            SubmissionState::Failed { reason: error.user_message().to_string() }
        }
        SubmissionOutcome::Blocked { .. } => return,
    };

    if let Err(error) = wizard.session_mut().transition_submission(next) {
        warn!(
            event_name = "submission.state_conflict",
            correlation_id = %correlation_id,
            error = %error,
            "could not record submission result"
        );
    }
}

async fn await_pending(
    mut receiver: watch::Receiver<Option<SubmissionOutcome>>,
    correlation_id: String,
) -> SubmissionOutcome {
    let settled = match receiver.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone(),
        Err(_) => None,
    };

    settled.unwrap_or_else(|| SubmissionOutcome::Failed {
        error: InterfaceError::ServiceUnavailable {
            message: "submission was interrupted before the endpoint answered".to_string(),
            correlation_id,
        },
    })
}

/// Gateway that keeps submissions in memory and answers from a script,
/// falling back to generated lead ids once the script runs out.
#[derive(Clone, Default)]
pub struct InMemoryLeadsGateway {
    submissions: Arc<Mutex<Vec<LeadSubmission>>>,
    responses: Arc<Mutex<VecDeque<Result<LeadReceipt, ApplicationError>>>>,
}

impl InMemoryLeadsGateway {
    pub fn with_responses(
        responses: impl IntoIterator<Item = Result<LeadReceipt, ApplicationError>>,
    ) -> Self {
        Self {
            submissions: Arc::default(),
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
        }
    }

    pub fn submissions(&self) -> Vec<LeadSubmission> {
        match self.submissions.lock() {
            Ok(submissions) => submissions.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LeadsGateway for InMemoryLeadsGateway {
    async fn submit_lead(
        &self,
        submission: &LeadSubmission,
    ) -> Result<LeadReceipt, ApplicationError> {
        let count = match self.submissions.lock() {
            Ok(mut submissions) => {
                submissions.push(submission.clone());
                submissions.len()
            }
            Err(poisoned) => {
                let mut submissions = poisoned.into_inner();
                submissions.push(submission.clone());
                submissions.len()
            }
        };

        let scripted = match self.responses.lock() {
            Ok(mut responses) => responses.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        scripted.unwrap_or_else(|| Ok(LeadReceipt { lead_id: Some(format!("LEAD-{count:04}")) }))
    }
}
