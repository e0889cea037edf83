//! Classification -> flow lookup.
//!
//! The mapping file is loaded once at startup into a [`FlowTable`] and
//! indexed by a [`FlowResolver`]. The resolver is immutable after
//! construction and is shared between concurrent runs via `Arc`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default location of the flow mapping file.
pub const DEFAULT_FLOW_MAPPING_PATH: &str = "flow_details.yml";

/// A resolved flow: which script collection to run and where to send the
/// ticket if the run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    /// Name of the script collection (a directory under the use-case root).
    pub flow_name: String,
    /// Routing group the ticket is reassigned to on failure.
    pub fallback_group: String,
}

/// One raw entry of the mapping file. Fields are optional here so that a
/// malformed entry can be reported instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowEntry {
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub flow_name: Option<String>,
    #[serde(default)]
    pub reassignment_group: Option<String>,
}

/// The deserialized mapping file (`flows: [...]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowTable {
    #[serde(default)]
    pub flows: Vec<FlowEntry>,
}

impl FlowTable {
    /// Parse a mapping table from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CoreError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::ConfigInvalid(format!("cannot parse flow mapping: {e}")))
    }

    /// Read and parse the mapping file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigInvalid(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }
}

/// Exact-match lookup from ticket classification to [`FlowDefinition`].
#[derive(Debug, Default)]
pub struct FlowResolver {
    flows: HashMap<String, FlowDefinition>,
    /// First structural defect found in the table, if any. A defective
    /// table fails every lookup.
    defect: Option<String>,
}

impl FlowResolver {
    /// Index a mapping table. Never fails; defects surface on lookup.
    pub fn new(table: FlowTable) -> Self {
        let mut flows = HashMap::with_capacity(table.flows.len());
        let mut defect = None;

        for (index, entry) in table.flows.into_iter().enumerate() {
            let fields = (
                required(entry.short_description),
                required(entry.flow_name),
                required(entry.reassignment_group),
            );
            let (classification, flow_name, fallback_group) = match fields {
                (Some(c), Some(f), Some(g)) => (c, f, g),
                (c, f, _) => {
                    let missing = if c.is_none() {
                        "short_description"
                    } else if f.is_none() {
                        "flow_name"
                    } else {
                        "reassignment_group"
                    };
                    defect.get_or_insert_with(|| {
                        format!("flow entry #{index} is missing required field '{missing}'")
                    });
                    continue;
                }
            };

            if flows.contains_key(&classification) {
                tracing::warn!(
                    classification = %classification,
                    "Duplicate flow mapping ignored; first entry wins",
                );
                continue;
            }
            flows.insert(
                classification,
                FlowDefinition {
                    flow_name,
                    fallback_group,
                },
            );
        }

        Self { flows, defect }
    }

    /// Load and index the mapping file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        Ok(Self::new(FlowTable::load(path)?))
    }

    /// Resolve a ticket classification to its flow.
    pub fn resolve(&self, classification: &str) -> Result<FlowDefinition, CoreError> {
        if let Some(defect) = &self.defect {
            return Err(CoreError::ConfigInvalid(defect.clone()));
        }
        self.flows
            .get(classification)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(classification.to_string()))
    }

    /// Number of usable mappings.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
