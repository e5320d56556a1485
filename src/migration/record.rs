//! Migration records: an operation tag plus an operation-specific payload.
//!
//! On disk each record is `{"operation": "...", "details": {...}, "note": "..."}`.
//! `details` is kept as a generic JSON value until the record is applied, then
//! decoded into the struct selected by `operation`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::MigrationError;
use crate::gmail::types::{
    FilterAction, FilterCriteria, LabelColor, LabelListVisibility, LabelPatch,
    MessageListVisibility,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTag {
    UpdateMessages,
    CreateFilter,
    DeleteFilter,
    DeleteFilters,
    CreateLabel,
    UpdateLabel,
    UpdateLabels,
    DeleteLabel,
    ReplaceFilters,
}

impl OperationTag {
    pub const ALL: [OperationTag; 9] = [
        OperationTag::UpdateMessages,
        OperationTag::CreateFilter,
        OperationTag::DeleteFilter,
        OperationTag::DeleteFilters,
        OperationTag::CreateLabel,
        OperationTag::UpdateLabel,
        OperationTag::UpdateLabels,
        OperationTag::DeleteLabel,
        OperationTag::ReplaceFilters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationTag::UpdateMessages => "update-messages",
            OperationTag::CreateFilter => "create-filter",
            OperationTag::DeleteFilter => "delete-filter",
            OperationTag::DeleteFilters => "delete-filters",
            OperationTag::CreateLabel => "create-label",
            OperationTag::UpdateLabel => "update-label",
            OperationTag::UpdateLabels => "update-labels",
            OperationTag::DeleteLabel => "delete-label",
            OperationTag::ReplaceFilters => "replace-filters",
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationTag {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| MigrationError::UnknownOperation(s.to_string()))
    }
}

// --- Details payloads ---

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessages {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub message_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<FilterCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FilterAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteFilters {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Replace filters sharing one criteria with a single filter.
///
/// Without an explicit action, the union of the replaced filters' actions is used.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplaceFilters {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<FilterAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateLabel {
    #[serde(flatten)]
    pub label: LabelPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub patch: LabelPatch,
}

/// One visibility/color patch applied to several labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabels {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<LabelListVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<MessageListVisibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<LabelColor>,
}

impl UpdateLabels {
    pub fn patch(&self) -> LabelPatch {
        LabelPatch {
            name: None,
            label_list_visibility: self.label_list_visibility,
            message_list_visibility: self.message_list_visibility,
            color: self.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A decoded record payload, one variant per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Migration {
    UpdateMessages(UpdateMessages),
    CreateFilter(CreateFilter),
    DeleteFilter(DeleteFilter),
    DeleteFilters(DeleteFilters),
    CreateLabel(CreateLabel),
    UpdateLabel(UpdateLabel),
    UpdateLabels(UpdateLabels),
    DeleteLabel(DeleteLabel),
    ReplaceFilters(ReplaceFilters),
}

impl Migration {
    pub fn tag(&self) -> OperationTag {
        match self {
            Migration::UpdateMessages(_) => OperationTag::UpdateMessages,
            Migration::CreateFilter(_) => OperationTag::CreateFilter,
            Migration::DeleteFilter(_) => OperationTag::DeleteFilter,
            Migration::DeleteFilters(_) => OperationTag::DeleteFilters,
            Migration::CreateLabel(_) => OperationTag::CreateLabel,
            Migration::UpdateLabel(_) => OperationTag::UpdateLabel,
            Migration::UpdateLabels(_) => OperationTag::UpdateLabels,
            Migration::DeleteLabel(_) => OperationTag::DeleteLabel,
            Migration::ReplaceFilters(_) => OperationTag::ReplaceFilters,
        }
    }

    fn details(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Migration::UpdateMessages(d) => serde_json::to_value(d),
            Migration::CreateFilter(d) => serde_json::to_value(d),
            Migration::DeleteFilter(d) => serde_json::to_value(d),
            Migration::DeleteFilters(d) => serde_json::to_value(d),
            Migration::CreateLabel(d) => serde_json::to_value(d),
            Migration::UpdateLabel(d) => serde_json::to_value(d),
            Migration::UpdateLabels(d) => serde_json::to_value(d),
            Migration::DeleteLabel(d) => serde_json::to_value(d),
            Migration::ReplaceFilters(d) => serde_json::to_value(d),
        }
    }
}

/// A record as stored in a migration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub operation: String,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MigrationRecord {
    pub fn encode(migration: &Migration, note: Option<String>) -> serde_json::Result<Self> {
        Ok(Self {
            operation: migration.tag().as_str().to_string(),
            details: migration.details()?,
            note,
        })
    }

    /// Decode `details` into the payload selected by `operation`.
    pub fn decode(&self) -> Result<Migration, MigrationError> {
        let tag: OperationTag = self.operation.parse()?;
        Ok(match tag {
            OperationTag::UpdateMessages => Migration::UpdateMessages(self.details_as(tag)?),
            OperationTag::CreateFilter => Migration::CreateFilter(self.details_as(tag)?),
            OperationTag::DeleteFilter => Migration::DeleteFilter(self.details_as(tag)?),
            OperationTag::DeleteFilters => Migration::DeleteFilters(self.details_as(tag)?),
            OperationTag::CreateLabel => Migration::CreateLabel(self.details_as(tag)?),
            OperationTag::UpdateLabel => Migration::UpdateLabel(self.details_as(tag)?),
            OperationTag::UpdateLabels => Migration::UpdateLabels(self.details_as(tag)?),
            OperationTag::DeleteLabel => Migration::DeleteLabel(self.details_as(tag)?),
            OperationTag::ReplaceFilters => Migration::ReplaceFilters(self.details_as(tag)?),
        })
    }

    fn details_as<T: DeserializeOwned>(&self, tag: OperationTag) -> Result<T, MigrationError> {
        // A missing payload decodes like an empty one, so absent ids surface as preconditions.
        let details = match &self.details {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(details).map_err(|source| MigrationError::Decode {
            operation: tag.as_str().to_string(),
            source,
        })
    }
}
