//! Explicit decisions of a configuration, and their portable form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use configurator_core::{Attribute, AttributeDecision, Configuration};

/// Schema version written by [`StoredConfiguration::from_configuration`].
pub const STORED_CONFIGURATION_VERSION: u32 = 1;

/// Whether any attribute, or any value of a choice attribute, carries an
/// explicit decision.
pub fn has_explicit_decisions(configuration: &Configuration) -> bool {
    configuration.attributes.values().any(|attribute| match attribute {
        Attribute::Boolean(a) => a.decision.is_some_and(|d| d.is_explicit()),
        Attribute::Numeric(a) => a.decision.is_some_and(|d| d.is_explicit()),
        Attribute::Choice(a) => a
            .values
            .values()
            .any(|v| v.decision.is_some_and(|d| d.is_explicit())),
        Attribute::Component(a) => a.decision.is_some_and(|d| d.is_explicit()),
    })
}

/// One decision per explicitly decided attribute or choice value, in
/// attribute id order.
pub fn explicit_decisions(configuration: &Configuration) -> Vec<AttributeDecision> {
    let mut decisions = Vec::new();

    for attribute in configuration.attributes.values() {
        match attribute {
            Attribute::Boolean(a) => {
                if let Some(d) = a.decision.filter(|d| d.is_explicit()) {
                    decisions.push(AttributeDecision::Boolean {
                        attribute_id: a.id.clone(),
                        state: Some(d.state),
                    });
                }
            }
            Attribute::Numeric(a) => {
                if let Some(d) = a.decision.filter(|d| d.is_explicit()) {
                    decisions.push(AttributeDecision::Numeric {
                        attribute_id: a.id.clone(),
                        state: Some(d.state),
                    });
                }
            }
            Attribute::Choice(a) => {
                for value in a.values.values() {
                    if let Some(d) = value.decision.filter(|d| d.is_explicit()) {
                        decisions.push(AttributeDecision::ChoiceValue {
                            attribute_id: a.id.clone(),
                            choice_value_id: value.id.clone(),
                            state: Some(d.state),
                        });
                    }
                }
            }
            Attribute::Component(a) => {
                if let Some(d) = a.decision.filter(|d| d.is_explicit()) {
                    decisions.push(AttributeDecision::Component {
                        attribute_id: a.id.clone(),
                        state: Some(d.state),
                    });
                }
            }
        }
    }

    decisions
}

#[derive(Error, Debug)]
pub enum StoredConfigurationError {
    #[error("Failed to parse stored configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported stored configuration version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Portable record of the caller's explicit decisions.
///
/// Restoring it into a fresh session reproduces the configuration as far as
/// the model still permits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfiguration {
    pub schema_version: u32,
    pub explicit_decisions: Vec<AttributeDecision>,
}

impl StoredConfiguration {
    pub fn new(explicit_decisions: Vec<AttributeDecision>) -> Self {
        Self {
            schema_version: STORED_CONFIGURATION_VERSION,
            explicit_decisions,
        }
    }

    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::new(explicit_decisions(configuration))
    }

    pub fn is_supported(&self) -> bool {
        self.schema_version == STORED_CONFIGURATION_VERSION
    }

    pub fn to_json(&self) -> Result<String, StoredConfigurationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoredConfigurationError> {
        let stored: Self = serde_json::from_str(json)?;
        if !stored.is_supported() {
            return Err(StoredConfigurationError::UnsupportedVersion {
                found: stored.schema_version,
                supported: STORED_CONFIGURATION_VERSION,
            });
        }
        Ok(stored)
    }
}
