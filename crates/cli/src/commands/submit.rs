use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use wayfare_core::config::{AppConfig, LoadOptions};
use wayfare_core::submission::{self, SubmissionCoordinator, SubmissionOutcome};
use wayfare_core::{
    DomainError, InterfaceError, LeadWizard, Navigation, PersonalInfoPatch, ServiceKind,
    SharedFieldsPatch, StepId, SubFormReport, WizardHandle,
};
use wayfare_leads::HttpLeadsGateway;

use crate::commands::CommandResult;

/// Scripted answers for one wizard visit, as a host UI would enter them.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Answers {
    #[serde(default)]
    pub preselected: Option<ServiceKind>,
    #[serde(default)]
    pub services: Vec<ServiceKind>,
    #[serde(default)]
    pub personal: PersonalInfoPatch,
    #[serde(default)]
    pub service_data: BTreeMap<String, Value>,
    #[serde(default)]
    pub shared: SharedFieldsPatch,
}

pub fn run(options: LoadOptions, answers_path: &Path, dry_run: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let answers = match load_answers(answers_path) {
        Ok(answers) => answers,
        Err(error) => {
            return CommandResult::failure("submit", "invalid_input", format!("{error:#}"), 2);
        }
    };

    let wizard = match replay(answers) {
        Ok(wizard) => wizard,
        Err(DomainError::ValidationBlocked { step, missing_fields }) => {
            return CommandResult::failure_with_data(
                "submit",
                "validation_blocked",
                format!("answers do not get past step `{step}`"),
                2,
                Some(json!({ "step": step.as_str(), "missingFields": missing_fields })),
            );
        }
        Err(error) => {
            return CommandResult::failure("submit", "invalid_input", error.to_string(), 2);
        }
    };

    info!(
        event_name = "cli.submit.replayed",
        correlation_id = %wizard.session().id(),
        steps = wizard.sequence().len(),
        dry_run,
        "answers replayed up to the final step"
    );

    let client = config.client_context();
    if dry_run {
        return match submission::preview(&wizard, &client) {
            Ok(payload) => match serde_json::to_value(&payload) {
                Ok(data) => CommandResult::success_with_data(
                    "submit",
                    "dry run: payload validated, nothing was sent",
                    data,
                ),
                Err(error) => {
                    CommandResult::failure("submit", "serialization", error.to_string(), 3)
                }
            },
            Err(error) => {
                CommandResult::failure("submit", "submission_blocked", error.to_string(), 2)
            }
        };
    }

    let gateway = match HttpLeadsGateway::from_config(&config.leads) {
        Ok(gateway) => gateway,
        Err(error) => {
            return CommandResult::failure("submit", "gateway_init", error.to_string(), 3);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let coordinator = SubmissionCoordinator::new(gateway, client);
    let handle = WizardHandle::new(wizard);
    let outcome = runtime.block_on(coordinator.submit(&handle));
    let session_id = handle.read(|wizard| wizard.session().id().to_string());

    match outcome {
        SubmissionOutcome::Succeeded { lead_id } => CommandResult::success_with_data(
            "submit",
            format!("lead registered as {lead_id}"),
            json!({ "leadId": lead_id.as_str(), "sessionId": session_id }),
        ),
        SubmissionOutcome::Failed { error } => {
            let error_class = match &error {
                InterfaceError::Rejected { .. } => "submission_rejected",
                InterfaceError::ServiceUnavailable { .. } => "submission_unavailable",
                InterfaceError::BadRequest { .. } | InterfaceError::Internal { .. } => {
                    "submission_failed"
                }
            };
            CommandResult::failure_with_data(
                "submit",
                error_class,
                error.user_message(),
                4,
                Some(json!({
                    "sessionId": error.correlation_id(),
                    "retryable": error.is_retryable(),
                    "detail": error.to_string(),
                })),
            )
        }
        SubmissionOutcome::Blocked { error } => {
            CommandResult::failure("submit", "submission_blocked", error.to_string(), 2)
        }
    }
}

fn load_answers(path: &Path) -> Result<Answers> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read answers file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse answers file `{}`", path.display()))
}

/// Feeds the answers into a fresh wizard and advances it step by step, so the
/// same validation a user would hit applies here.
fn replay(answers: Answers) -> Result<LeadWizard, DomainError> {
    let mut wizard = match answers.preselected {
        Some(kind) => LeadWizard::pre_selected(kind),
        None => LeadWizard::guided(),
    };
    for kind in answers.services {
        wizard.select_service(kind);
    }

    wizard.update_personal_info(answers.personal);
    for (raw, payload) in answers.service_data {
        let kind = raw.parse::<ServiceKind>()?;
        wizard.update_service_data(kind, SubFormReport::complete(payload))?;
    }
    wizard.update_shared_fields(answers.shared);

    for _ in 0..wizard.sequence().len() {
        if wizard.current_step() == StepId::Finalizacao {
            break;
        }
        if let Navigation::Blocked { step, missing_fields } = wizard.go_next() {
            return Err(DomainError::ValidationBlocked { step, missing_fields });
        }
    }

    Ok(wizard)
}
