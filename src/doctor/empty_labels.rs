//! Detect labels with no messages that can safely be deleted.

use std::collections::HashMap;

use crate::gmail::types::Label;
use crate::migration::record::{DeleteLabel, Migration, MigrationRecord};

/// Empty labels split into deletion candidates and skipped parents.
#[derive(Debug, Default)]
pub struct EmptyLabelScan<'a> {
    pub deletable: Vec<&'a Label>,
    /// Empty by their own counters but with descendants; counters on
    /// container labels are not reliable.
    pub parents: Vec<&'a Label>,
}

/// Every `/`-separated prefix of every label name → labels under it.
fn prefix_lookup(labels: &[Label]) -> HashMap<String, Vec<&Label>> {
    let mut lookup: HashMap<String, Vec<&Label>> = HashMap::new();
    for label in labels {
        let parts: Vec<&str> = label.name.split('/').collect();
        for i in 1..=parts.len() {
            lookup.entry(parts[..i].join("/")).or_default().push(label);
        }
    }
    lookup
}

pub fn scan(labels: &[Label]) -> EmptyLabelScan<'_> {
    let lookup = prefix_lookup(labels);
    let mut result = EmptyLabelScan::default();
    for label in labels.iter().filter(|l| l.is_empty()) {
        let sharing = lookup.get(&label.name).map_or(0, |v| v.len());
        if sharing == 1 {
            result.deletable.push(label);
        } else {
            result.parents.push(label);
        }
    }
    result
}

pub fn delete_record(label: &Label) -> serde_json::Result<MigrationRecord> {
    MigrationRecord::encode(
        &Migration::DeleteLabel(DeleteLabel {
            id: Some(label.id.clone()),
        }),
        Some(format!("{}: Empty Label identified by the doctor", label.name)),
    )
}
