use crate::domain::lead::PersonalInfo;
use crate::domain::session::WizardSession;
use crate::errors::DomainError;
use crate::flows::catalog::StepId;

#[derive(Clone, Copy, Debug, Default)]
pub struct StepValidator;

impl StepValidator {
    pub fn can_advance(&self, step: StepId, session: &WizardSession) -> bool {
        self.missing_fields(step, session).is_empty()
    }

    pub fn check(&self, step: StepId, session: &WizardSession) -> Result<(), DomainError> {
        let missing_fields = self.missing_fields(step, session);
        if missing_fields.is_empty() {
            return Ok(());
        }

        Err(DomainError::ValidationBlocked { step, missing_fields })
    }

    /// Field names that keep the wizard on `step`, for inline prompts.
    pub fn missing_fields(&self, step: StepId, session: &WizardSession) -> Vec<String> {
        match step {
            StepId::Services => {
                if session.selected_services().is_empty() {
                    vec!["services".to_string()]
                } else {
                    Vec::new()
                }
            }
            StepId::Personal => missing_personal_fields(session.personal_info()),
            StepId::Service(kind) => {
                if session.is_service_complete(kind) {
                    Vec::new()
                } else {
                    vec![kind.as_str().to_string()]
                }
            }
            StepId::BudgetNotes | StepId::Finalizacao => Vec::new(),
        }
    }

    /// Submitting is a separate action from advancing: the final step must be
    /// active, personal details must still hold and no request may be pending.
    pub fn check_submit(&self, session: &WizardSession) -> Result<(), DomainError> {
        if session.current_step() != StepId::Finalizacao || session.submission().is_in_flight() {
            return Err(DomainError::SubmissionNotAllowed { current: session.current_step() });
        }

        self.check(StepId::Personal, session)
    }
}

fn missing_personal_fields(info: &PersonalInfo) -> Vec<String> {
    let mut missing = Vec::new();
    if info.name.trim().is_empty() {
        missing.push("name".to_string());
    }
    if !is_valid_email(&info.email) {
        missing.push("email".to_string());
    }
    if info.phone.trim().is_empty() {
        missing.push("phone".to_string());
    }
    missing
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain
/// with text on both sides of it.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
