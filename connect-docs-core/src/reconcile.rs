//! Reconciliation of connector inventories self-reported by the OSS, Cloud
//! and cgo builds of the binary.
//!
//! A connector requires cgo exactly when the cgo build lists it and the
//! standard OSS build does not.

use crate::identity::{component_groups, name_of, ComponentKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

const DEFAULT_STATUS: &str = "stable";

/// One connector from a binary inventory, in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedConnector {
    pub key: ComponentKey,
    pub definition: Value,
}

impl IndexedConnector {
    pub fn status(&self) -> &str {
        self.definition
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_STATUS)
    }
}

/// Identity index over a raw binary inventory (`{type: [connector, ...]}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorIndex {
    connectors: Vec<IndexedConnector>,
    keys: HashSet<String>,
}

impl ConnectorIndex {
    pub fn from_inventory(inventory: &Value) -> Self {
        let mut index = ConnectorIndex::default();
        for (component_type, connectors) in component_groups(inventory) {
            for connector in connectors {
                let Some(name) = name_of(connector) else {
                    debug!(component_type = %component_type, "Skipping unnamed inventory entry");
                    continue;
                };
                let key = ComponentKey::new(component_type, name);
                if index.keys.insert(key.to_string()) {
                    index.connectors.push(IndexedConnector {
                        key,
                        definition: connector.clone(),
                    });
                }
            }
        }
        index
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.keys.contains(&key.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedConnector> {
        self.connectors.iter()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvailabilityReason {
    SelfHostedOnly,
    CloudOnly,
}

/// A classified connector. Connectors with no OSS counterpart carry the rest
/// of their definition flattened alongside, like [`CgoOnlyConnector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedConnector {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<AvailabilityReason>,
    /// Remaining properties of the source definition; empty for OSS connectors.
    #[serde(flatten)]
    pub definition: Map<String, Value>,
}

impl ClassifiedConnector {
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(&self.component_type, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudComparison {
    pub in_cloud: Vec<ClassifiedConnector>,
    pub not_in_cloud: Vec<ClassifiedConnector>,
    pub cloud_only: Vec<ClassifiedConnector>,
    pub total_oss: usize,
    pub total_cloud: usize,
}

/// Classifies every OSS connector as in-cloud or self-hosted-only, and lists
/// the connectors only the cloud build has.
pub fn compare_oss_with_cloud(oss: &ConnectorIndex, cloud: &ConnectorIndex) -> CloudComparison {
    let mut comparison = CloudComparison {
        total_oss: oss.len(),
        total_cloud: cloud.len(),
        ..Default::default()
    };

    for connector in oss.iter() {
        let in_cloud = cloud.contains(&connector.key);
        let classified = ClassifiedConnector {
            component_type: connector.key.component_type.clone(),
            name: connector.key.name.clone(),
            status: connector.status().to_string(),
            reason: (!in_cloud).then_some(AvailabilityReason::SelfHostedOnly),
            definition: Map::new(),
        };
        if in_cloud {
            comparison.in_cloud.push(classified);
        } else {
            comparison.not_in_cloud.push(classified);
        }
    }

    for connector in cloud.iter().filter(|c| !oss.contains(&c.key)) {
        comparison.cloud_only.push(ClassifiedConnector {
            component_type: connector.key.component_type.clone(),
            name: connector.key.name.clone(),
            status: connector.status().to_string(),
            reason: Some(AvailabilityReason::CloudOnly),
            definition: remaining_properties(&connector.definition, &["type", "name", "status", "reason"]),
        });
    }

    info!(
        total_oss = comparison.total_oss,
        total_cloud = comparison.total_cloud,
        in_cloud = comparison.in_cloud.len(),
        not_in_cloud = comparison.not_in_cloud.len(),
        cloud_only = comparison.cloud_only.len(),
        "Compared OSS and Cloud inventories"
    );
    comparison
}

/// Properties of `definition` other than the `reserved` keys, which the
/// entry carries as typed fields.
fn remaining_properties(definition: &Value, reserved: &[&str]) -> Map<String, Value> {
    let mut rest = definition.as_object().cloned().unwrap_or_default();
    for key in reserved {
        rest.remove(*key);
    }
    rest
}

/// A connector that only the cgo build provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgoOnlyConnector {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    pub requires_cgo: bool,
    /// Remaining properties of the cgo definition.
    #[serde(flatten)]
    pub definition: Map<String, Value>,
}

impl CgoOnlyConnector {
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(&self.component_type, &self.name)
    }
}

/// Connectors listed by the cgo build but absent from the OSS build.
pub fn find_cgo_only_connectors(oss: &ConnectorIndex, cgo: &ConnectorIndex) -> Vec<CgoOnlyConnector> {
    let cgo_only: Vec<CgoOnlyConnector> = cgo
        .iter()
        .filter(|c| !oss.contains(&c.key))
        .map(|c| CgoOnlyConnector {
            component_type: c.key.component_type.clone(),
            name: c.key.name.clone(),
            requires_cgo: true,
            definition: remaining_properties(&c.definition, &["type", "name", "requiresCgo"]),
        })
        .collect();
    info!(cgo_only = cgo_only.len(), "Identified cgo-only connectors");
    cgo_only
}
