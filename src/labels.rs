//! Label snapshots and the `labels` listing command.

use anyhow::Result;

use crate::gmail::types::Label;
use crate::gmail::{MailService, RemoteResult};

/// List labels, then fetch each one for its counters (the list omits them).
///
/// Sorted by name.
pub fn fetch_labels(service: &dyn MailService) -> RemoteResult<Vec<Label>> {
    let listed = service.list_labels()?;
    let mut labels = Vec::with_capacity(listed.len());
    for label in listed {
        labels.push(service.get_label(&label.id)?);
    }
    labels.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(labels)
}

/// One display line: `name - type (labelListVisibility - messageListVisibility)`.
pub fn describe(label: &Label) -> String {
    let list = label
        .label_list_visibility
        .map(|v| v.as_str())
        .unwrap_or_default();
    let message = label
        .message_list_visibility
        .map(|v| v.as_str())
        .unwrap_or_default();
    format!(
        "{} - {} ({} - {})",
        label.name,
        label.label_type.as_str(),
        list,
        message
    )
}

/// mailtidy labels [--all]
pub fn run(service: &dyn MailService, all: bool) -> Result<()> {
    let mut labels = service.list_labels()?;
    labels.sort_by(|a, b| a.name.cmp(&b.name));
    if !all {
        labels.retain(|l| l.is_user());
    }
    if labels.is_empty() {
        println!("No labels found.");
        return Ok(());
    }
    println!("Labels:");
    for label in &labels {
        println!("  {}", describe(label));
    }
    Ok(())
}
