//! Apply migration files against the remote mailbox.
//!
//! Files run one at a time, records in file order. Any error aborts the run
//! and leaves the current file in place; records already applied from it stay
//! applied remotely.

use std::collections::HashSet;

use tracing::{debug, info};

use super::error::{MigrationError, MigrationResult};
use super::loader::{self, MigrationKind};
use super::record::{
    CreateFilter, CreateLabel, DeleteFilter, DeleteFilters, DeleteLabel, Migration,
    MigrationRecord, ReplaceFilters, UpdateLabel, UpdateLabels, UpdateMessages,
};
use super::retry::RetryPolicy;
use crate::filters::consolidate::consolidate;
use crate::filters::split::{LabelTypes, physical_filters, user_label_removal};
use crate::gmail::types::{Filter, FilterAction, FilterCriteria};
use crate::gmail::{MailService, RemoteError};
use crate::messages::{batch_requests, list_all_message_ids};
use crate::resolve::MIGRATIONS_DIR;
use crate::store::Store;
use crate::util::indent;

pub struct Migrator<'a> {
    service: &'a dyn MailService,
    store: &'a Store,
    retry: RetryPolicy,
}

impl<'a> Migrator<'a> {
    pub fn new(service: &'a dyn MailService, store: &'a Store, retry: RetryPolicy) -> Self {
        Self {
            service,
            store,
            retry,
        }
    }

    /// Apply every pending file of `kind`. Returns the applied file names.
    pub fn run(&self, kind: MigrationKind) -> MigrationResult<Vec<String>> {
        let files = loader::pending_files(self.store, kind)?;
        for file_name in &files {
            self.apply_file(file_name, kind)?;
        }
        Ok(files)
    }

    pub fn apply_file(&self, file_name: &str, kind: MigrationKind) -> MigrationResult<()> {
        println!("Migrating {}", file_name);
        let records = loader::read_file(self.store, file_name)?;
        for record in &records {
            self.apply(record, 1)?;
        }
        if kind == MigrationKind::OneOff {
            let done = loader::completed_name(file_name);
            self.store.rename(
                std::path::Path::new(MIGRATIONS_DIR).join(file_name),
                std::path::Path::new(MIGRATIONS_DIR).join(&done),
            )?;
            info!(file = file_name, renamed = %done, "migration complete");
        }
        Ok(())
    }

    /// Decode and apply one record.
    pub fn apply(&self, record: &MigrationRecord, depth: usize) -> MigrationResult<()> {
        let migration = record.decode()?;
        match &record.note {
            Some(note) => println!("{}{}: {}", indent(depth), record.operation, note),
            None => println!("{}{}", indent(depth), record.operation),
        }
        let depth = depth + 1;
        match &migration {
            Migration::UpdateMessages(d) => self.update_messages(d, depth),
            Migration::CreateFilter(d) => self.create_filter(d, depth),
            Migration::DeleteFilter(d) => self.delete_filter(d, depth),
            Migration::DeleteFilters(d) => self.delete_filters(d, depth),
            Migration::CreateLabel(d) => self.create_label(d, depth),
            Migration::UpdateLabel(d) => self.update_label(d, depth),
            Migration::UpdateLabels(d) => self.update_labels(d, depth),
            Migration::DeleteLabel(d) => self.delete_label(d, depth),
            Migration::ReplaceFilters(d) => self.replace_filters(d, depth),
        }
    }

    fn call<T>(
        &self,
        context: &str,
        op: impl FnMut() -> Result<T, RemoteError>,
    ) -> MigrationResult<T> {
        self.retry.run(context, RemoteError::is_transient, op)
    }

    // --- Messages ---

    fn update_messages(&self, d: &UpdateMessages, depth: usize) -> MigrationResult<()> {
        if d.add_label_ids.is_empty() && d.remove_label_ids.is_empty() {
            return Err(MigrationError::precondition(
                "update-messages needs addLabelIds or removeLabelIds",
            ));
        }

        let mut ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |id: String| {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        };
        for id in &d.message_ids {
            push(id.clone());
        }
        if !d.query_label_ids.is_empty() || d.query.is_some() {
            let found = self.call("list messages", || {
                list_all_message_ids(self.service, &d.query_label_ids, d.query.as_deref())
            })?;
            debug!(count = found.len(), query = ?d.query, "messages matched");
            for id in found {
                push(id);
            }
        }

        if ids.is_empty() {
            println!("{}no matching messages", indent(depth));
            return Ok(());
        }

        let batches = batch_requests(&ids, &d.add_label_ids, &d.remove_label_ids);
        for request in &batches {
            self.call("batch modify messages", || self.service.batch_modify(request))?;
            println!(
                "{}modified {} messages (+{:?} -{:?})",
                indent(depth),
                request.ids.len(),
                request.add_label_ids,
                request.remove_label_ids
            );
        }
        Ok(())
    }

    // --- Filters ---

    fn create_filter(&self, d: &CreateFilter, depth: usize) -> MigrationResult<()> {
        let criteria = d
            .criteria
            .as_ref()
            .ok_or_else(|| MigrationError::precondition("create-filter needs criteria"))?;
        let action = d
            .action
            .as_ref()
            .ok_or_else(|| MigrationError::precondition("create-filter needs an action"))?;
        let filters = self.prepare_filters(criteria, action)?;
        self.create_filters(&filters, depth)
    }

    /// Check the action against current labels and split it into physical filters.
    fn prepare_filters(
        &self,
        criteria: &FilterCriteria,
        action: &FilterAction,
    ) -> MigrationResult<Vec<Filter>> {
        let labels = self.call("list labels", || self.service.list_labels())?;
        let types = LabelTypes::from_labels(&labels);
        if let Some(id) = user_label_removal(action, &types) {
            return Err(MigrationError::precondition(format!(
                "filters cannot remove user label {}",
                id
            )));
        }
        Ok(physical_filters(criteria, action, &types))
    }

    fn create_filters(&self, filters: &[Filter], depth: usize) -> MigrationResult<()> {
        if filters.len() > 1 {
            println!("{}split into {} filters", indent(depth), filters.len());
        }
        for filter in filters {
            let created = self.retry.run(
                "create filter",
                RemoteError::is_transient_for_filter_create,
                || self.service.create_filter(filter),
            )?;
            println!(
                "{}created filter {} (+{:?} -{:?})",
                indent(depth),
                created.id.as_deref().unwrap_or("?"),
                filter.action.add_label_ids,
                filter.action.remove_label_ids
            );
        }
        Ok(())
    }

    fn delete_filter(&self, d: &DeleteFilter, depth: usize) -> MigrationResult<()> {
        let id = d
            .id
            .as_deref()
            .ok_or_else(|| MigrationError::precondition("delete-filter needs an id"))?;
        self.delete_filter_id(id, depth)
    }

    fn delete_filters(&self, d: &DeleteFilters, depth: usize) -> MigrationResult<()> {
        if d.ids.is_empty() {
            return Err(MigrationError::precondition("delete-filters needs ids"));
        }
        for id in &d.ids {
            self.delete_filter_id(id, depth)?;
        }
        Ok(())
    }

    fn delete_filter_id(&self, id: &str, depth: usize) -> MigrationResult<()> {
        self.call("delete filter", || self.service.delete_filter(id))?;
        println!("{}deleted filter {}", indent(depth), id);
        Ok(())
    }

    fn replace_filters(&self, d: &ReplaceFilters, depth: usize) -> MigrationResult<()> {
        if d.ids.is_empty() {
            return Err(MigrationError::precondition("replace-filters needs ids"));
        }
        let mut existing = Vec::with_capacity(d.ids.len());
        for id in &d.ids {
            existing.push(self.call("get filter", || self.service.get_filter(id))?);
        }

        let groups = consolidate(&existing);
        let [group] = groups.as_slice() else {
            return Err(MigrationError::precondition(format!(
                "filters {:?} do not share one criteria",
                d.ids
            )));
        };
        let action = match &d.action {
            Some(action) => action.clone(),
            None => group.merged_action().ok_or_else(|| {
                MigrationError::precondition("replaced filters forward to different addresses")
            })?,
        };

        let replacements = self.prepare_filters(&group.criteria, &action)?;
        println!(
            "{}replacing {} filters with {}",
            indent(depth),
            d.ids.len(),
            replacements.len()
        );
        for id in &d.ids {
            self.delete_filter_id(id, depth + 1)?;
        }
        self.create_filters(&replacements, depth + 1)
    }

    // --- Labels ---

    fn create_label(&self, d: &CreateLabel, depth: usize) -> MigrationResult<()> {
        let name = d
            .label
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MigrationError::precondition("create-label needs a name"))?;
        let created = self.call("create label", || self.service.create_label(&d.label))?;
        println!("{}created label {} ({})", indent(depth), name, created.id);
        Ok(())
    }

    fn update_label(&self, d: &UpdateLabel, depth: usize) -> MigrationResult<()> {
        let id = d
            .id
            .as_deref()
            .ok_or_else(|| MigrationError::precondition("update-label needs an id"))?;
        let updated = self.call("update label", || self.service.patch_label(id, &d.patch))?;
        println!("{}updated label {} ({})", indent(depth), updated.name, id);
        Ok(())
    }

    fn update_labels(&self, d: &UpdateLabels, depth: usize) -> MigrationResult<()> {
        if d.ids.is_empty() {
            return Err(MigrationError::precondition("update-labels needs ids"));
        }
        let patch = d.patch();
        for id in &d.ids {
            let updated = self.call("update label", || self.service.patch_label(id, &patch))?;
            println!("{}updated label {} ({})", indent(depth), updated.name, id);
        }
        Ok(())
    }

    fn delete_label(&self, d: &DeleteLabel, depth: usize) -> MigrationResult<()> {
        let id = d
            .id
            .as_deref()
            .ok_or_else(|| MigrationError::precondition("delete-label needs an id"))?;
        self.call("delete label", || self.service.delete_label(id))?;
        println!("{}deleted label {}", indent(depth), id);
        Ok(())
    }
}
