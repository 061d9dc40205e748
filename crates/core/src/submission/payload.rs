use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::BudgetTier;
use crate::domain::service::ServiceKind;
use crate::domain::session::{SessionId, WizardSession};
use crate::flows::aggregator::ServiceDataSnapshot;

/// Where the submission came from, forwarded to the leads endpoint as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub source: String,
    pub channel: String,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub attempt: u32,
    pub mode: String,
    pub pre_selected: Option<ServiceKind>,
    #[serde(flatten)]
    pub client: ClientContext,
}

/// Flat JSON body posted to the leads endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub origin_city: Option<String>,
    pub services: Vec<ServiceKind>,
    pub service_data: ServiceDataSnapshot,
    pub budget: Option<BudgetTier>,
    pub notes: Option<String>,
    pub urgent: bool,
    pub flexible_dates: bool,
    pub metadata: SubmissionMetadata,
}

impl LeadSubmission {
    pub fn from_session(
        session: &WizardSession,
        client: &ClientContext,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let personal = session.personal_info();
        let shared = session.shared_fields();
        let origin_city = personal.origin_city.trim();

        Self {
            name: personal.name.trim().to_string(),
            email: personal.email.trim().to_string(),
            phone: personal.phone.trim().to_string(),
            origin_city: (!origin_city.is_empty()).then(|| origin_city.to_string()),
            services: session.selected_services().iter().copied().collect(),
            service_data: session.service_data().snapshot(),
            budget: shared.budget,
            notes: shared.notes.clone(),
            urgent: shared.urgent,
            flexible_dates: shared.flexible_dates,
            metadata: SubmissionMetadata {
                session_id: session.id(),
                started_at: session.started_at(),
                submitted_at,
                attempt: session.attempts(),
                mode: session.mode().as_str().to_string(),
                pre_selected: session.mode().pre_selected(),
                client: client.clone(),
            },
        }
    }
}
