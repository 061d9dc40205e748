use std::collections::BTreeSet;

use crate::domain::service::ServiceKind;
use crate::domain::session::WizardMode;
use crate::flows::catalog::{StepCatalog, StepId};

/// Result of re-checking the current step against a recomputed sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    Kept(StepId),
    /// The step was dropped; moved to the nearest earlier surviving step.
    Clamped { from: StepId, to: StepId },
    /// The step was not in the previous sequence either.
    Reset { from: StepId, to: StepId },
}

impl Reconciliation {
    pub fn step(&self) -> StepId {
        match self {
            Self::Kept(step) => *step,
            Self::Clamped { to, .. } | Self::Reset { to, .. } => *to,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StepSequencer;

impl StepSequencer {
    pub fn sequence(&self, selected: &BTreeSet<ServiceKind>, mode: &WizardMode) -> Vec<StepId> {
        match mode {
            WizardMode::PreSelected(kind) => vec![
                StepId::Service(*kind),
                StepId::Personal,
                StepId::BudgetNotes,
                StepId::Finalizacao,
            ],
            WizardMode::Guided => {
                let mut steps = Vec::with_capacity(4 + selected.len());
                steps.push(StepId::Services);
                steps.push(StepId::Personal);
                steps.extend(StepCatalog::service_steps().filter(|step| {
                    step.service().map(|kind| selected.contains(&kind)).unwrap_or(false)
                }));
                steps.push(StepId::BudgetNotes);
                steps.push(StepId::Finalizacao);
                steps
            }
        }
    }

    pub fn next(&self, current: StepId, sequence: &[StepId]) -> Option<StepId> {
        let index = position(current, sequence)?;
        sequence.get(index + 1).copied()
    }

    pub fn previous(&self, current: StepId, sequence: &[StepId]) -> Option<StepId> {
        let index = position(current, sequence)?;
        index.checked_sub(1).and_then(|previous| sequence.get(previous)).copied()
    }

    pub fn reconcile(
        &self,
        current: StepId,
        previous: &[StepId],
        recomputed: &[StepId],
    ) -> Reconciliation {
        if recomputed.contains(&current) {
            return Reconciliation::Kept(current);
        }

        let fallback = recomputed.first().copied().unwrap_or(StepId::Finalizacao);
        let Some(index) = position(current, previous) else {
            return Reconciliation::Reset { from: current, to: fallback };
        };

        previous[..index]
            .iter()
            .rev()
            .find(|step| recomputed.contains(step))
            .map(|to| Reconciliation::Clamped { from: current, to: *to })
            .unwrap_or(Reconciliation::Reset { from: current, to: fallback })
    }
}

pub(crate) fn position(step: StepId, sequence: &[StepId]) -> Option<usize> {
    sequence.iter().position(|candidate| *candidate == step)
}
