use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    /// Identifier used when the leads endpoint accepts a submission without
    /// returning one of its own.
    pub fn local_fallback() -> Self {
        Self(format!("local-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub origin_city: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PersonalInfoPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub origin_city: Option<String>,
}

impl PersonalInfo {
    pub fn apply(&mut self, patch: PersonalInfoPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(origin_city) = patch.origin_city {
            self.origin_city = origin_city;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Economy,
    Standard,
    Premium,
    Luxury,
}

/// Budget step fields. None of them is required, and `urgent` and
/// `flexible_dates` are independent of each other.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedFields {
    pub budget: Option<BudgetTier>,
    pub notes: Option<String>,
    pub urgent: bool,
    pub flexible_dates: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SharedFieldsPatch {
    pub budget: Option<BudgetTier>,
    pub notes: Option<String>,
    pub urgent: Option<bool>,
    pub flexible_dates: Option<bool>,
}

impl SharedFields {
    pub fn apply(&mut self, patch: SharedFieldsPatch) {
        if let Some(budget) = patch.budget {
            self.budget = Some(budget);
        }
        if let Some(notes) = patch.notes {
            let trimmed = notes.trim();
            self.notes = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(urgent) = patch.urgent {
            self.urgent = urgent;
        }
        if let Some(flexible_dates) = patch.flexible_dates {
            self.flexible_dates = flexible_dates;
        }
    }
}
