use serde_json::json;
use wayfare_core::{DomainError, LeadWizard, ServiceKind};

use crate::commands::CommandResult;

pub fn run(services: &[String], preselected: Option<&str>) -> CommandResult {
    let wizard = match build_wizard(services, preselected) {
        Ok(wizard) => wizard,
        Err(message) => return CommandResult::failure("plan", "invalid_input", message, 2),
    };

    let progress = wizard.progress();
    let steps: Vec<&str> = progress.steps.iter().map(|step| step.as_str()).collect();
    let services: Vec<&str> =
        wizard.session().selected_services().iter().map(|kind| kind.as_str()).collect();

    CommandResult::success_with_data(
        "plan",
        format!("{} steps, starting at `{}`", progress.total, progress.current),
        json!({
            "mode": wizard.session().mode().as_str(),
            "services": services,
            "steps": steps,
            "start": progress.current.as_str(),
        }),
    )
}

fn build_wizard(services: &[String], preselected: Option<&str>) -> Result<LeadWizard, String> {
    let services = services
        .iter()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.parse::<ServiceKind>())
        .collect::<Result<Vec<_>, DomainError>>()
        .map_err(|error| error.to_string())?;

    match preselected {
        Some(raw) => {
            if !services.is_empty() {
                return Err("--services cannot be combined with --preselected".to_string());
            }
            let kind = raw.parse::<ServiceKind>().map_err(|error| error.to_string())?;
            Ok(LeadWizard::pre_selected(kind))
        }
        None => {
            let mut wizard = LeadWizard::guided();
            for kind in services {
                wizard.select_service(kind);
            }
            Ok(wizard)
        }
    }
}
