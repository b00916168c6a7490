//! Shared rule types for the moderation console and the reglas backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamic::DynamicValue;

/// Moderation status of a rule.
///
/// A rule arrives from the extraction pipeline as `Proposed`; every other
/// status is the result of an admin action. Lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    /// Machine-extracted, awaiting review.
    Proposed,
    /// Accepted as-is by an admin.
    Approved,
    /// Marked for deletion by an admin.
    Rejected,
    /// Hand-edited by an admin.
    Modified,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Modified => "modified",
        }
    }
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown rule status: {0}")]
pub struct ParseStatusError(String);

impl std::str::FromStr for RuleStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposed" => Ok(Self::Proposed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "modified" => Ok(Self::Modified),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// An urbanistic rule extracted from a normative document.
///
/// `id` is the stable identity used as the map key everywhere; the rest is
/// what the console displays and edits. camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Empty or absent categories group under [`UNCATEGORIZED`](crate::UNCATEGORIZED).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub status: RuleStatus,
    /// Display-only parameter names, in extraction order.
    #[serde(default)]
    pub key_parameters: Vec<String>,
    /// Opaque version tag of the source document.
    #[serde(default)]
    pub document_version: String,
    /// Free-form condition/formula object, edited as raw text in the console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<DynamicValue>,
}

/// Edit-form payload merged into a rule by `edit_and_save`.
///
/// `None` fields leave the rule untouched; the merge never changes `id` or
/// `status` (the caller forces status to `Modified`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub key_parameters: Option<Vec<String>>,
    pub document_version: Option<String>,
    pub condition: Option<DynamicValue>,
}

impl Rule {
    /// Merge an edit-form payload into this rule, field by field.
    pub fn apply_patch(&mut self, patch: RulePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(key_parameters) = patch.key_parameters {
            self.key_parameters = key_parameters;
        }
        if let Some(document_version) = patch.document_version {
            self.document_version = document_version;
        }
        if let Some(condition) = patch.condition {
            self.condition = Some(condition);
        }
    }
}
