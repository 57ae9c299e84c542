// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closed, industry-keyed guideline table.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use strum::IntoEnumIterator;
use switchboard_core::SwitchboardError;
use switchboard_core::types::Industry;

/// Guideline text for every supported industry.
///
/// Construction fails unless every [`Industry`] has a non-empty entry, so
/// lookups never fall back to an empty block.
#[derive(Debug, Clone)]
pub struct GuidelineTable {
    entries: HashMap<Industry, String>,
}

impl GuidelineTable {
    /// Builds the table from the `[guidelines]` config map.
    pub fn from_config(raw: &BTreeMap<String, String>) -> Result<Self, SwitchboardError> {
        let mut entries = HashMap::new();
        for (key, text) in raw {
            let industry = Industry::from_str(key).map_err(|_| {
                SwitchboardError::Config(format!("guideline for unknown industry `{key}`"))
            })?;
            if text.trim().is_empty() {
                return Err(SwitchboardError::Config(format!(
                    "guideline for `{industry}` is empty"
                )));
            }
            entries.insert(industry, text.trim().to_string());
        }

        let missing: Vec<String> = Industry::iter()
            .filter(|i| !entries.contains_key(i))
            .map(|i| i.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SwitchboardError::Config(format!(
                "missing guidelines for: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { entries })
    }

    /// Guideline block for `industry`.
    pub fn get(&self, industry: Industry) -> &str {
        self.entries
            .get(&industry)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
