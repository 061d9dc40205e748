use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::service::{ServiceKind, ServicePayload};

/// Per-service sub-form output keyed by service. Payloads are stored exactly
/// as the sub-form produced them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceDataAggregator {
    entries: BTreeMap<ServiceKind, ServicePayload>,
}

/// Immutable copy of the aggregated service data, serialized as a JSON object
/// keyed by service identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceDataSnapshot(BTreeMap<ServiceKind, ServicePayload>);

impl ServiceDataAggregator {
    pub fn record(&mut self, kind: ServiceKind, payload: ServicePayload) {
        self.entries.insert(kind, payload);
    }

    pub fn remove(&mut self, kind: ServiceKind) -> Option<ServicePayload> {
        self.entries.remove(&kind)
    }

    pub fn get(&self, kind: ServiceKind) -> Option<&ServicePayload> {
        self.entries.get(&kind)
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> ServiceDataSnapshot {
        ServiceDataSnapshot(self.entries.clone())
    }
}

impl ServiceDataSnapshot {
    pub fn get(&self, kind: ServiceKind) -> Option<&ServicePayload> {
        self.0.get(&kind)
    }

    pub fn contains_key(&self, kind: ServiceKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn keys(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
