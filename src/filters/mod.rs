//! Filter snapshots: fetch, sort, annotate with label metadata, export.

pub mod consolidate;
pub mod split;

use std::collections::HashMap;
use tracing::warn;

use crate::gmail::types::{Filter, FilterMeta, Label};
use crate::gmail::{MailService, RemoteResult};
use crate::store::{Store, StoreError, StoreResult};

use self::consolidate::consolidate;

/// Sort by from + query + to, stable.
pub fn sort_filters(filters: &mut [Filter]) {
    filters.sort_by_cached_key(|f| {
        format!("{}{}{}", f.criteria.from, f.criteria.query, f.criteria.to)
    });
}

/// List remote filters in export order.
pub fn fetch_filters(service: &dyn MailService) -> RemoteResult<Vec<Filter>> {
    let mut filters = service.list_filters()?;
    sort_filters(&mut filters);
    Ok(filters)
}

/// Resolve each filter's add/remove label ids into `meta.labels`.
///
/// Ids missing from `labels` are skipped.
pub fn attach_meta(filters: &mut [Filter], labels: &[Label]) {
    let by_id: HashMap<&str, &Label> = labels.iter().map(|l| (l.id.as_str(), l)).collect();
    for filter in filters.iter_mut() {
        let resolved = filter
            .action
            .add_label_ids
            .iter()
            .chain(filter.action.remove_label_ids.iter())
            .filter_map(|id| by_id.get(id.as_str()).map(|l| (*l).clone()))
            .collect();
        filter.meta = Some(FilterMeta { labels: resolved });
    }
}

/// Write `filters` (with label metadata) and the consolidated view.
pub fn save_filters(store: &Store, filters: &mut [Filter]) -> StoreResult<()> {
    let labels = match store.read_labels() {
        Ok(labels) => labels,
        Err(StoreError::NotFound(path)) => {
            warn!(path = %path.display(), "no label snapshot; filter metadata left empty");
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    attach_meta(filters, &labels);
    store.save_filters(filters)?;
    store.save_consolidated_filters(&consolidate(filters))
}
