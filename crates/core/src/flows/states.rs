use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceKind;
use crate::flows::catalog::StepId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Navigation {
    Moved { from: StepId, to: StepId },
    /// The current step failed validation; nothing moved.
    Blocked { step: StepId, missing_fields: Vec<String> },
    /// Already on the first or last step, or the target is not reachable.
    Stayed { step: StepId },
}

impl Navigation {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SelectionChange {
    Changed { sequence: Vec<StepId>, current: StepId },
    Unchanged,
    Locked { pre_selected: ServiceKind },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current_index: usize,
    pub total: usize,
    pub current: StepId,
    pub steps: Vec<StepId>,
}

impl Progress {
    /// Share of steps already left behind, for progress bars.
    pub fn percent_complete(&self) -> u8 {
        if self.total <= 1 {
            return 100;
        }
        let percent = self.current_index * 100 / (self.total - 1);
        percent.min(100) as u8
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.total
    }
}
