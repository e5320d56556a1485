//! Group filters that share identical criteria and union their actions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::gmail::types::{Filter, FilterAction, FilterCriteria};

/// Filters sharing one criteria value, with the union of their actions.
///
/// Derived on every export; never read back as authoritative state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedFilter {
    pub key: String,
    pub criteria: FilterCriteria,
    pub ids: Vec<String>,
    #[serde(default)]
    pub add_label_ids: Vec<String>,
    #[serde(default)]
    pub remove_label_ids: Vec<String>,
    #[serde(default)]
    pub forward: BTreeSet<String>,
}

impl ConsolidatedFilter {
    fn new(key: String, criteria: FilterCriteria) -> Self {
        Self {
            key,
            criteria,
            ids: Vec::new(),
            add_label_ids: Vec::new(),
            remove_label_ids: Vec::new(),
            forward: BTreeSet::new(),
        }
    }

    fn absorb(&mut self, filter: &Filter) {
        if let Some(id) = &filter.id {
            push_unique(&mut self.ids, id);
        }
        for id in &filter.action.add_label_ids {
            push_unique(&mut self.add_label_ids, id);
        }
        for id in &filter.action.remove_label_ids {
            push_unique(&mut self.remove_label_ids, id);
        }
        if !filter.action.forward.is_empty() {
            self.forward.insert(filter.action.forward.clone());
        }
    }

    /// The union as a single action. `None` when members forward to different addresses.
    pub fn merged_action(&self) -> Option<FilterAction> {
        if self.forward.len() > 1 {
            return None;
        }
        Some(FilterAction {
            add_label_ids: self.add_label_ids.clone(),
            remove_label_ids: self.remove_label_ids.clone(),
            forward: self.forward.iter().next().cloned().unwrap_or_default(),
        })
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Canonical grouping key over every criteria field.
///
/// Encoded as a JSON array so no field value can collide with the separator.
pub fn criteria_key(criteria: &FilterCriteria) -> String {
    serde_json::json!([
        criteria.from,
        criteria.to,
        criteria.subject,
        criteria.query,
        criteria.negated_query,
        criteria.size,
        criteria.size_comparison.map(|c| c.as_str()).unwrap_or(""),
        criteria.has_attachment,
        criteria.exclude_chats,
    ])
    .to_string()
}

/// Group filters by criteria, sorted by key.
pub fn consolidate(filters: &[Filter]) -> Vec<ConsolidatedFilter> {
    let mut groups: BTreeMap<String, ConsolidatedFilter> = BTreeMap::new();
    for filter in filters {
        let key = criteria_key(&filter.criteria);
        groups
            .entry(key.clone())
            .or_insert_with(|| ConsolidatedFilter::new(key, filter.criteria.clone()))
            .absorb(filter);
    }
    groups.into_values().collect()
}
