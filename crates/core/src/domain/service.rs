use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

/// Bookable service offered by the wizard. Declaration order is the canonical
/// display order, so `Ord` and `BTreeSet` iteration follow it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Flight,
    Hotel,
    Car,
    Tour,
    Insurance,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] =
        [Self::Flight, Self::Hotel, Self::Car, Self::Tour, Self::Insurance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Hotel => "hotel",
            Self::Car => "car",
            Self::Tour => "tour",
            Self::Insurance => "insurance",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flight" => Ok(Self::Flight),
            "hotel" => Ok(Self::Hotel),
            "car" => Ok(Self::Car),
            "tour" => Ok(Self::Tour),
            "insurance" => Ok(Self::Insurance),
            other => Err(DomainError::UnknownService(other.to_string())),
        }
    }
}

/// Output of a service sub-form. The wizard never looks inside it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServicePayload(pub Value);

impl From<Value> for ServicePayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// What a sub-form hands back on every change: its current field bag and
/// whether its own required fields are filled in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubFormReport {
    pub payload: ServicePayload,
    #[serde(default)]
    pub complete: bool,
}

impl SubFormReport {
    pub fn complete(payload: impl Into<ServicePayload>) -> Self {
        Self { payload: payload.into(), complete: true }
    }

    pub fn partial(payload: impl Into<ServicePayload>) -> Self {
        Self { payload: payload.into(), complete: false }
    }
}
