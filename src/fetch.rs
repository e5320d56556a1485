//! mailtidy fetch: refresh the local label and filter snapshots.

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::filters;
use crate::gmail::MailService;
use crate::labels::fetch_labels;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Target {
    Labels,
    Filters,
    #[default]
    All,
}

impl Target {
    fn labels(&self) -> bool {
        matches!(self, Target::Labels | Target::All)
    }

    fn filters(&self) -> bool {
        matches!(self, Target::Filters | Target::All)
    }
}

pub fn refresh_labels(service: &dyn MailService, store: &Store) -> Result<usize> {
    let labels = fetch_labels(service).context("fetching labels")?;
    store.save_labels(&labels)?;
    Ok(labels.len())
}

/// Labels are read from the local snapshot for filter metadata, so refresh them first.
pub fn refresh_filters(service: &dyn MailService, store: &Store) -> Result<usize> {
    let mut list = filters::fetch_filters(service).context("fetching filters")?;
    filters::save_filters(store, &mut list)?;
    Ok(list.len())
}

/// mailtidy fetch [labels|filters|all]
pub fn run(service: &dyn MailService, store: &Store, target: Target) -> Result<()> {
    if target.labels() {
        let n = refresh_labels(service, store)?;
        println!("Saved {} labels to {}", n, crate::resolve::LABELS_JSON);
    }
    if target.filters() {
        let n = refresh_filters(service, store)?;
        println!(
            "Saved {} filters to {} (consolidated: {})",
            n,
            crate::resolve::FILTERS_JSON,
            crate::resolve::CONSOLIDATED_FILTERS_JSON
        );
    }
    Ok(())
}
