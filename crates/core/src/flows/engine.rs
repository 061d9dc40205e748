use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::lead::{PersonalInfoPatch, SharedFieldsPatch};
use crate::domain::service::{ServiceKind, SubFormReport};
use crate::domain::session::{WizardMode, WizardSession};
use crate::errors::DomainError;
use crate::flows::aggregator::ServiceDataSnapshot;
use crate::flows::catalog::StepId;
use crate::flows::sequencer::{position, Reconciliation, StepSequencer};
use crate::flows::states::{Navigation, Progress, SelectionChange};
use crate::flows::validator::StepValidator;
use crate::submission::SubmissionOutcome;

/// Owns one [`WizardSession`] and exposes the actions a host UI triggers.
#[derive(Debug)]
pub struct LeadWizard {
    session: WizardSession,
    sequencer: StepSequencer,
    validator: StepValidator,
    pub(crate) pending: Option<watch::Receiver<Option<SubmissionOutcome>>>,
    closed: bool,
}

impl LeadWizard {
    pub fn new(session: WizardSession) -> Self {
        Self {
            session,
            sequencer: StepSequencer,
            validator: StepValidator,
            pending: None,
            closed: false,
        }
    }

    pub fn guided() -> Self {
        Self::new(WizardSession::guided())
    }

    pub fn pre_selected(kind: ServiceKind) -> Self {
        Self::new(WizardSession::pre_selected(kind))
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut WizardSession {
        &mut self.session
    }

    pub fn validator(&self) -> &StepValidator {
        &self.validator
    }

    pub fn sequence(&self) -> Vec<StepId> {
        self.sequencer.sequence(&self.session.selected_services, &self.session.mode)
    }

    pub fn current_step(&self) -> StepId {
        self.session.current_step
    }

    pub fn can_advance(&self) -> bool {
        self.validator.can_advance(self.session.current_step, &self.session)
    }

    /// Adding a service whose step lies behind the current one rewinds to that
    /// step, so its sub-form is filled before the wizard can reach submission.
    pub fn select_service(&mut self, kind: ServiceKind) -> SelectionChange {
        if let WizardMode::PreSelected(pre_selected) = self.session.mode {
            return SelectionChange::Locked { pre_selected };
        }

        let previous = self.sequence();
        if !self.session.selected_services.insert(kind) {
            return SelectionChange::Unchanged;
        }

        debug!(
            event_name = "wizard.selection.added",
            correlation_id = %self.session.id,
            service = %kind,
            "service selected"
        );
        let change = self.resequence(&previous);

        let added = StepId::Service(kind);
        let sequence = self.sequence();
        match (position(added, &sequence), position(self.session.current_step, &sequence)) {
            (Some(added_at), Some(current_at)) if added_at < current_at => {
                info!(
                    event_name = "wizard.sequence.rewound",
                    correlation_id = %self.session.id,
                    from = %self.session.current_step,
                    to = %added,
                    "new service step sits behind the current step"
                );
                self.session.current_step = added;
                SelectionChange::Changed { sequence, current: added }
            }
            _ => change,
        }
    }

    pub fn deselect_service(&mut self, kind: ServiceKind) -> SelectionChange {
        if let WizardMode::PreSelected(pre_selected) = self.session.mode {
            return SelectionChange::Locked { pre_selected };
        }

        let previous = self.sequence();
        if !self.session.selected_services.remove(&kind) {
            return SelectionChange::Unchanged;
        }

        self.session.forget_service(kind);
        debug!(
            event_name = "wizard.selection.removed",
            correlation_id = %self.session.id,
            service = %kind,
            "service deselected and its data discarded"
        );
        self.resequence(&previous)
    }

    fn resequence(&mut self, previous: &[StepId]) -> SelectionChange {
        let sequence = self.sequence();
        let reconciliation =
            self.sequencer.reconcile(self.session.current_step, previous, &sequence);

        match reconciliation {
            Reconciliation::Kept(_) => {}
            Reconciliation::Clamped { from, to } => {
                info!(
                    event_name = "wizard.sequence.clamped",
                    correlation_id = %self.session.id,
                    from = %from,
                    to = %to,
                    "active step left the sequence, moved to nearest earlier step"
                );
            }
            Reconciliation::Reset { from, to } => {
                let error = DomainError::InvalidSequenceState { step: from };
                warn!(
                    event_name = "wizard.sequence.invalid_state",
                    correlation_id = %self.session.id,
                    error = %error,
                    to = %to,
                    "current step was not part of the previous sequence"
                );
            }
        }

        self.session.current_step = reconciliation.step();
        SelectionChange::Changed { sequence, current: self.session.current_step }
    }

    pub fn go_next(&mut self) -> Navigation {
        let current = self.session.current_step;
        if let Err(DomainError::ValidationBlocked { step, missing_fields }) =
            self.validator.check(current, &self.session)
        {
            debug!(
                event_name = "wizard.navigation.blocked",
                correlation_id = %self.session.id,
                step = %step,
                missing_fields = ?missing_fields,
                "advance rejected by step validation"
            );
            return Navigation::Blocked { step, missing_fields };
        }

        match self.sequencer.next(current, &self.sequence()) {
            Some(to) => self.move_to(current, to),
            None => Navigation::Stayed { step: current },
        }
    }

    pub fn go_back(&mut self) -> Navigation {
        let current = self.session.current_step;
        match self.sequencer.previous(current, &self.sequence()) {
            Some(to) => self.move_to(current, to),
            None => Navigation::Stayed { step: current },
        }
    }

    /// Jumps back to an earlier step of the current sequence, as the review
    /// step's edit links do. Forward jumps would skip validation, so they
    /// stay put.
    pub fn go_to(&mut self, target: StepId) -> Navigation {
        let current = self.session.current_step;
        let sequence = self.sequence();
        match (position(target, &sequence), position(current, &sequence)) {
            (Some(target_index), Some(current_index)) if target_index < current_index => {
                self.move_to(current, target)
            }
            _ => Navigation::Stayed { step: current },
        }
    }

    fn move_to(&mut self, from: StepId, to: StepId) -> Navigation {
        self.session.current_step = to;
        debug!(
            event_name = "wizard.navigation.moved",
            correlation_id = %self.session.id,
            from = %from,
            to = %to,
            "step changed"
        );
        Navigation::Moved { from, to }
    }

    pub fn update_personal_info(&mut self, patch: PersonalInfoPatch) {
        self.session.personal_info.apply(patch);
    }

    pub fn update_service_data(
        &mut self,
        kind: ServiceKind,
        report: SubFormReport,
    ) -> Result<(), DomainError> {
        if !self.session.selected_services.contains(&kind) {
            return Err(DomainError::ServiceNotSelected(kind));
        }

        self.session.service_data.record(kind, report.payload);
        if report.complete {
            self.session.completed_services.insert(kind);
        } else {
            self.session.completed_services.remove(&kind);
        }
        Ok(())
    }

    pub fn update_shared_fields(&mut self, patch: SharedFieldsPatch) {
        self.session.shared_fields.apply(patch);
    }

    pub fn service_data(&self) -> ServiceDataSnapshot {
        self.session.service_data.snapshot()
    }

    pub fn progress(&self) -> Progress {
        let steps = self.sequence();
        let current = self.session.current_step;
        Progress {
            current_index: position(current, &steps).unwrap_or(0),
            total: steps.len(),
            current,
            steps,
        }
    }

    /// Marks the wizard as torn down. A submission still in flight resolves,
    /// but its result is no longer applied to the session.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Shared owner of a [`LeadWizard`] so a pending submission can report back
/// after the request resolves. The lock is never held across an await.
#[derive(Clone, Debug)]
pub struct WizardHandle {
    inner: Arc<Mutex<LeadWizard>>,
}

impl WizardHandle {
    pub fn new(wizard: LeadWizard) -> Self {
        Self { inner: Arc::new(Mutex::new(wizard)) }
    }

    pub fn update<R>(&self, apply: impl FnOnce(&mut LeadWizard) -> R) -> R {
        match self.inner.lock() {
            Ok(mut wizard) => apply(&mut *wizard),
            Err(poisoned) => {
                let mut wizard = poisoned.into_inner();
                apply(&mut *wizard)
            }
        }
    }

    pub fn read<R>(&self, inspect: impl FnOnce(&LeadWizard) -> R) -> R {
        self.update(|wizard| inspect(wizard))
    }

    pub fn close(&self) {
        self.update(LeadWizard::close);
    }
}

impl From<LeadWizard> for WizardHandle {
    fn from(wizard: LeadWizard) -> Self {
        Self::new(wizard)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::lead::{PersonalInfoPatch, SharedFieldsPatch};
    use crate::domain::service::{ServiceKind, SubFormReport};
    use crate::errors::DomainError;
    use crate::flows::catalog::StepId;
    use crate::flows::engine::LeadWizard;
    use crate::flows::states::{Navigation, SelectionChange};

    fn ana() -> PersonalInfoPatch {
        PersonalInfoPatch {
            name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            phone: Some("+1234567890".to_string()),
            origin_city: Some("São Paulo".to_string()),
        }
    }

    #[test]
    fn services_step_blocks_until_something_is_selected() {
        let mut wizard = LeadWizard::guided();

        let blocked = wizard.go_next();
        assert_eq!(
            blocked,
            Navigation::Blocked { step: StepId::Services, missing_fields: vec!["services".into()] }
        );
        assert_eq!(wizard.current_step(), StepId::Services);

        wizard.select_service(ServiceKind::Tour);
        assert_eq!(
            wizard.go_next(),
            Navigation::Moved { from: StepId::Services, to: StepId::Personal }
        );
    }

    #[test]
    fn personal_step_with_empty_email_never_moves() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Flight);
        wizard.go_next();
        wizard.update_personal_info(PersonalInfoPatch { email: Some(String::new()), ..ana() });

        for _ in 0..3 {
            assert!(wizard.go_next().is_blocked());
            assert_eq!(wizard.current_step(), StepId::Personal);
        }
    }

    #[test]
    fn personal_step_with_valid_details_advances_to_next_element() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Hotel);
        wizard.go_next();
        wizard.update_personal_info(ana());

        assert_eq!(
            wizard.go_next(),
            Navigation::Moved {
                from: StepId::Personal,
                to: StepId::Service(ServiceKind::Hotel),
            }
        );
    }

    #[test]
    fn selecting_service_from_final_step_rewinds_to_its_sub_form() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Tour);
        wizard.go_next();
        wizard.update_personal_info(ana());
        wizard.go_next();
        wizard
            .update_service_data(ServiceKind::Tour, SubFormReport::complete(json!({ "people": 2 })))
            .expect("tour is selected");
        wizard.go_next();
        wizard.go_next();
        assert_eq!(wizard.current_step(), StepId::Finalizacao);

        let change = wizard.select_service(ServiceKind::Car);

        assert!(matches!(
            change,
            SelectionChange::Changed { current: StepId::Service(ServiceKind::Car), .. }
        ));
        assert_eq!(wizard.current_step(), StepId::Service(ServiceKind::Car));
        assert!(wizard.go_next().is_blocked());
    }

    #[test]
    fn selecting_service_ahead_of_current_step_keeps_position() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Flight);
        wizard.go_next();

        wizard.select_service(ServiceKind::Insurance);

        assert_eq!(wizard.current_step(), StepId::Personal);
    }

    #[test]
    fn deselecting_active_service_clamps_to_nearest_earlier_step() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Flight);
        wizard.select_service(ServiceKind::Hotel);
        wizard.go_next();
        wizard.update_personal_info(ana());
        wizard.go_next();
        wizard
            .update_service_data(
                ServiceKind::Flight,
                SubFormReport::complete(json!({ "to": "REC" })),
            )
            .expect("flight is selected");
        wizard.go_next();
        assert_eq!(wizard.current_step(), StepId::Service(ServiceKind::Hotel));

        let change = wizard.deselect_service(ServiceKind::Hotel);

        assert_eq!(
            change,
            SelectionChange::Changed {
                sequence: vec![
                    StepId::Services,
                    StepId::Personal,
                    StepId::Service(ServiceKind::Flight),
                    StepId::BudgetNotes,
                    StepId::Finalizacao,
                ],
                current: StepId::Service(ServiceKind::Flight),
            }
        );
        assert!(wizard.sequence().contains(&wizard.current_step()));
    }

    #[test]
    fn deselecting_service_discards_its_data_through_the_wizard() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Hotel);
        wizard.select_service(ServiceKind::Car);
        wizard
            .update_service_data(
                ServiceKind::Hotel,
                SubFormReport::complete(json!({ "nights": 3 })),
            )
            .expect("hotel is selected");
        wizard
            .update_service_data(ServiceKind::Car, SubFormReport::partial(json!({})))
            .expect("car is selected");

        wizard.deselect_service(ServiceKind::Hotel);

        let snapshot = wizard.service_data();
        assert!(!snapshot.contains_key(ServiceKind::Hotel));
        assert!(snapshot.contains_key(ServiceKind::Car));
        assert!(!wizard.session().is_service_complete(ServiceKind::Hotel));

        wizard.select_service(ServiceKind::Hotel);
        assert!(!wizard.service_data().contains_key(ServiceKind::Hotel));
    }

    #[test]
    fn service_data_for_unselected_service_is_refused() {
        let mut wizard = LeadWizard::guided();
        let error = wizard
            .update_service_data(ServiceKind::Insurance, SubFormReport::complete(json!({})))
            .expect_err("insurance is not selected");

        assert_eq!(error, DomainError::ServiceNotSelected(ServiceKind::Insurance));
        assert!(wizard.service_data().is_empty());
    }

    #[test]
    fn service_step_needs_complete_report_and_partial_report_revokes_it() {
        let mut wizard = LeadWizard::pre_selected(ServiceKind::Car);
        assert!(wizard.go_next().is_blocked());

        wizard
            .update_service_data(ServiceKind::Car, SubFormReport::complete(json!({ "age": 30 })))
            .expect("car is pre-selected");
        wizard
            .update_service_data(ServiceKind::Car, SubFormReport::partial(json!({ "age": null })))
            .expect("car is pre-selected");
        assert!(wizard.go_next().is_blocked());

        wizard
            .update_service_data(ServiceKind::Car, SubFormReport::complete(json!({ "age": 31 })))
            .expect("car is pre-selected");
        assert!(wizard.go_next().moved());
        assert_eq!(wizard.current_step(), StepId::Personal);
    }

    #[test]
    fn pre_selected_mode_locks_selection() {
        let mut wizard = LeadWizard::pre_selected(ServiceKind::Insurance);

        assert_eq!(
            wizard.select_service(ServiceKind::Flight),
            SelectionChange::Locked { pre_selected: ServiceKind::Insurance }
        );
        assert_eq!(
            wizard.deselect_service(ServiceKind::Insurance),
            SelectionChange::Locked { pre_selected: ServiceKind::Insurance }
        );
        assert_eq!(
            wizard.sequence(),
            vec![
                StepId::Service(ServiceKind::Insurance),
                StepId::Personal,
                StepId::BudgetNotes,
                StepId::Finalizacao,
            ]
        );
    }

    #[test]
    fn repeated_selection_is_unchanged() {
        let mut wizard = LeadWizard::guided();
        let first = wizard.select_service(ServiceKind::Tour);
        assert!(matches!(first, SelectionChange::Changed { .. }));
        assert_eq!(wizard.select_service(ServiceKind::Tour), SelectionChange::Unchanged);
        assert_eq!(wizard.deselect_service(ServiceKind::Car), SelectionChange::Unchanged);
    }

    #[test]
    fn back_navigation_is_never_blocked_and_stops_at_first_step() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Flight);
        wizard.go_next();

        assert_eq!(
            wizard.go_back(),
            Navigation::Moved { from: StepId::Personal, to: StepId::Services }
        );
        assert_eq!(wizard.go_back(), Navigation::Stayed { step: StepId::Services });
    }

    #[test]
    fn jumps_only_go_backwards() {
        let mut wizard = LeadWizard::pre_selected(ServiceKind::Tour);
        wizard
            .update_service_data(ServiceKind::Tour, SubFormReport::complete(json!({ "people": 2 })))
            .expect("tour is pre-selected");
        wizard.go_next();
        wizard.update_personal_info(ana());
        wizard.go_next();
        wizard.update_shared_fields(SharedFieldsPatch {
            urgent: Some(true),
            ..SharedFieldsPatch::default()
        });
        wizard.go_next();
        assert_eq!(wizard.current_step(), StepId::Finalizacao);
        assert_eq!(wizard.go_next(), Navigation::Stayed { step: StepId::Finalizacao });

        assert_eq!(
            wizard.go_to(StepId::Personal),
            Navigation::Moved { from: StepId::Finalizacao, to: StepId::Personal }
        );
        assert_eq!(
            wizard.go_to(StepId::Finalizacao),
            Navigation::Stayed { step: StepId::Personal }
        );
        assert_eq!(wizard.go_to(StepId::Services), Navigation::Stayed { step: StepId::Personal });
    }

    #[test]
    fn progress_reports_position_within_current_sequence() {
        let mut wizard = LeadWizard::guided();
        wizard.select_service(ServiceKind::Flight);
        wizard.select_service(ServiceKind::Hotel);
        wizard.go_next();

        let progress = wizard.progress();
        assert_eq!(progress.current_index, 1);
        assert_eq!(progress.total, 6);
        assert_eq!(progress.current, StepId::Personal);
        assert_eq!(progress.steps, wizard.sequence());
    }
}
