//! Registry of every step the lead wizard knows about.
//!
//! Step identifiers are the wire strings the web front end already uses
//! (`services`, `personal`, one per service, `budget-notes`, `finalizacao`),
//! so they round-trip through serde as plain strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceKind;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepId {
    Services,
    Personal,
    Service(ServiceKind),
    BudgetNotes,
    Finalizacao,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepCategory {
    SharedIntro,
    SharedBudget,
    SharedFinal,
    PerService,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepEntry {
    pub id: StepId,
    pub category: StepCategory,
}

impl StepEntry {
    pub fn service(&self) -> Option<ServiceKind> {
        self.id.service()
    }
}

impl StepId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Services => "services",
            Self::Personal => "personal",
            Self::Service(kind) => kind.as_str(),
            Self::BudgetNotes => "budget-notes",
            Self::Finalizacao => "finalizacao",
        }
    }

    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            Self::Service(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn category(&self) -> StepCategory {
        StepCatalog::entry(*self).category
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        StepCatalog::lookup(value).ok_or_else(|| DomainError::UnknownStep(value.to_string()))
    }
}

impl TryFrom<String> for StepId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StepId> for String {
    fn from(value: StepId) -> Self {
        value.as_str().to_string()
    }
}

pub struct StepCatalog;

impl StepCatalog {
    pub const ENTRIES: [StepEntry; 9] = [
        StepEntry { id: StepId::Services, category: StepCategory::SharedIntro },
        StepEntry { id: StepId::Personal, category: StepCategory::SharedIntro },
        StepEntry { id: StepId::Service(ServiceKind::Flight), category: StepCategory::PerService },
        StepEntry { id: StepId::Service(ServiceKind::Hotel), category: StepCategory::PerService },
        StepEntry { id: StepId::Service(ServiceKind::Car), category: StepCategory::PerService },
        StepEntry { id: StepId::Service(ServiceKind::Tour), category: StepCategory::PerService },
        StepEntry {
            id: StepId::Service(ServiceKind::Insurance),
            category: StepCategory::PerService,
        },
        StepEntry { id: StepId::BudgetNotes, category: StepCategory::SharedBudget },
        StepEntry { id: StepId::Finalizacao, category: StepCategory::SharedFinal },
    ];

    pub fn all() -> &'static [StepEntry] {
        &Self::ENTRIES
    }

    pub fn entry(id: StepId) -> StepEntry {
        match id {
            StepId::Services | StepId::Personal => {
                StepEntry { id, category: StepCategory::SharedIntro }
            }
            StepId::Service(_) => StepEntry { id, category: StepCategory::PerService },
            StepId::BudgetNotes => StepEntry { id, category: StepCategory::SharedBudget },
            StepId::Finalizacao => StepEntry { id, category: StepCategory::SharedFinal },
        }
    }

    pub fn lookup(raw: &str) -> Option<StepId> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ENTRIES.iter().map(|entry| entry.id).find(|id| id.as_str() == normalized)
    }

    /// Per-service steps in canonical order.
    pub fn service_steps() -> impl Iterator<Item = StepId> {
        Self::ENTRIES
            .iter()
            .filter(|entry| entry.category == StepCategory::PerService)
            .map(|entry| entry.id)
    }
}
