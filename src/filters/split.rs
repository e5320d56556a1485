//! Split one logical filter into the physical filters Gmail will accept.
//!
//! Gmail rejects a filter action that adds more than one user label. System
//! labels can be mixed freely, so a logical action becomes one filter with
//! every system label plus the first user label, then one filter per
//! remaining user label. Remove ids are carried into every physical filter.

use std::collections::HashMap;

use crate::gmail::types::{Filter, FilterAction, FilterCriteria, Label, LabelType};

/// Label id → type lookup built from the current remote labels.
#[derive(Debug, Clone, Default)]
pub struct LabelTypes(HashMap<String, LabelType>);

impl LabelTypes {
    pub fn from_labels(labels: &[Label]) -> Self {
        Self(
            labels
                .iter()
                .map(|l| (l.id.clone(), l.label_type))
                .collect(),
        )
    }

    /// Unknown ids are treated as system labels.
    pub fn is_user(&self, id: &str) -> bool {
        self.0.get(id) == Some(&LabelType::User)
    }
}

/// First remove id that names a user label, if any.
pub fn user_label_removal<'a>(action: &'a FilterAction, types: &LabelTypes) -> Option<&'a str> {
    action
        .remove_label_ids
        .iter()
        .find(|id| types.is_user(id))
        .map(|id| id.as_str())
}

/// Split `action` so that no physical action carries two user labels.
///
/// System labels are ordered before user labels with a stable sort, so the
/// relative input order within each type is kept. The forward address stays
/// on the first physical action only.
pub fn split_action(action: &FilterAction, types: &LabelTypes) -> Vec<FilterAction> {
    let mut add_ids = action.add_label_ids.clone();
    add_ids.sort_by_key(|id| types.is_user(id));

    let mut actions = Vec::new();
    let mut current = FilterAction {
        add_label_ids: Vec::new(),
        remove_label_ids: action.remove_label_ids.clone(),
        forward: action.forward.clone(),
    };
    let mut user_count = 0;

    for id in add_ids {
        let is_user = types.is_user(&id);
        if is_user && user_count >= 1 {
            actions.push(current);
            current = FilterAction {
                add_label_ids: vec![id],
                remove_label_ids: action.remove_label_ids.clone(),
                forward: String::new(),
            };
            user_count = 1;
        } else {
            current.add_label_ids.push(id);
            if is_user {
                user_count += 1;
            }
        }
    }
    actions.push(current);
    actions
}

/// Physical filters for one logical (criteria, action) pair.
pub fn physical_filters(
    criteria: &FilterCriteria,
    action: &FilterAction,
    types: &LabelTypes,
) -> Vec<Filter> {
    split_action(action, types)
        .into_iter()
        .map(|action| Filter {
            id: None,
            criteria: criteria.clone(),
            action,
            meta: None,
        })
        .collect()
}
