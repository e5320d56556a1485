//! mailtidy doctor: suggest migrations from the current mailbox state.
//!
//! Two heuristics feed the suggestions: labels with no messages, and senders
//! whose recent inbox mail carries an unsubscribe link. Every suggestion is
//! confirmed interactively before it becomes a record in a new migration file.

pub mod empty_labels;
pub mod prompt;
pub mod unsubscribe;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, TimeDelta, Utc};

use crate::fetch;
use crate::gmail::MailService;
use crate::gmail::types::{FilterAction, Label, Message};
use crate::messages::criteria_query;
use crate::migration::loader;
use crate::migration::record::{CreateFilter, Migration, MigrationRecord, UpdateMessages};
use crate::store::Store;

use self::prompt::Prompter;
use self::unsubscribe::CriteriaAndSampleMessage;

const CREATE_FILTER: &str = "Create filter";
const SKIP: &str = "Skip";
const NEVER_IMPORTANT: &str = "Never mark it as important";
const ALWAYS_IMPORTANT: &str = "Always mark it as important";

#[derive(Debug, Clone)]
pub struct DoctorOptions {
    pub since_hours: i64,
    /// Accept refresh and empty-label suggestions without asking.
    pub yes: bool,
    pub fetch: bool,
}

/// Refresh snapshots, gather suggestions, and write accepted ones to a new
/// migration file. Returns the file name, if one was written.
pub fn run(
    service: &dyn MailService,
    store: &Store,
    prompter: &mut dyn Prompter,
    options: &DoctorOptions,
) -> Result<Option<String>> {
    if options.fetch {
        if options.yes || prompter.confirm("Update labels?")? {
            fetch::refresh_labels(service, store)?;
        }
        if options.yes || prompter.confirm("Update filters?")? {
            fetch::refresh_filters(service, store)?;
        }
    }

    println!("Analyzing results...");
    let records = suggest(service, store, prompter, options)?;
    if records.is_empty() {
        println!("Nothing to migrate.");
        return Ok(None);
    }
    let file_name = loader::write_file(store, &records, Local::now())?;
    println!(
        "Wrote {} record(s) to {}/{}",
        records.len(),
        crate::resolve::MIGRATIONS_DIR,
        file_name
    );
    Ok(Some(file_name))
}

/// Accepted suggestions, empty labels first.
pub fn suggest(
    service: &dyn MailService,
    store: &Store,
    prompter: &mut dyn Prompter,
    options: &DoctorOptions,
) -> Result<Vec<MigrationRecord>> {
    let since = lookback_start(Utc::now(), options.since_hours)?;
    let labels = store
        .read_labels()
        .context("Reading the label snapshot (run `mailtidy fetch labels` first)")?;

    let mut records = empty_label_records(&labels, prompter, options.yes)?;

    let mined = unsubscribe::mine(service, since).context("Searching for unsubscribe links")?;
    records.extend(unsubscribe_records(&mined, &labels, prompter)?);
    Ok(records)
}

/// `now` minus `hours`, rejecting negative or out-of-range windows.
fn lookback_start(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    if hours < 0 {
        bail!("Look-back window must not be negative (got {} hours)", hours);
    }
    match TimeDelta::try_hours(hours).and_then(|d| now.checked_sub_signed(d)) {
        Some(since) => Ok(since),
        None => bail!("Look-back window of {} hours is out of range", hours),
    }
}

fn empty_label_records(
    labels: &[Label],
    prompter: &mut dyn Prompter,
    yes: bool,
) -> Result<Vec<MigrationRecord>> {
    let scan = empty_labels::scan(labels);
    for parent in &scan.parents {
        println!("Skipping parent label {}", parent.name);
    }
    let mut records = Vec::new();
    for label in scan.deletable {
        if yes || prompter.confirm(&format!("Delete label {}?", label.name))? {
            records.push(empty_labels::delete_record(label)?);
        }
    }
    Ok(records)
}

fn print_sample(found: &CriteriaAndSampleMessage) {
    let header = |m: &Message, name: &str| m.header(name).unwrap_or("").to_string();
    println!();
    println!("Message filtered by");
    println!("  {}", found.key);
    println!("  From: {}", header(&found.sample, "From"));
    println!("  To: {}", header(&found.sample, "To"));
    println!("  Sample subject: {}", header(&found.sample, "Subject"));
}

fn find_label<'a>(labels: &'a [Label], name: &str) -> Option<&'a Label> {
    labels.iter().find(|l| l.name.eq_ignore_ascii_case(name))
}

fn unsubscribe_records(
    mined: &[CriteriaAndSampleMessage],
    labels: &[Label],
    prompter: &mut dyn Prompter,
) -> Result<Vec<MigrationRecord>> {
    let mut records = Vec::new();
    for found in mined {
        print_sample(found);
        if prompter.choose("Select action", &[CREATE_FILTER, SKIP])? != 0 {
            continue;
        }

        let Some(action) = prompt_action(labels, prompter)? else {
            println!("No action selected, skipping.");
            continue;
        };
        let apply_existing =
            prompter.confirm("Apply to matching messages already in the inbox?")?;

        records.push(MigrationRecord::encode(
            &Migration::CreateFilter(CreateFilter {
                criteria: Some(found.criteria.clone()),
                action: Some(action.clone()),
            }),
            Some("Unsubscribed by the doctor".to_string()),
        )?);

        if apply_existing {
            if let Some(query) = criteria_query(&found.criteria, false) {
                records.push(MigrationRecord::encode(
                    &Migration::UpdateMessages(UpdateMessages {
                        query_label_ids: vec!["INBOX".to_string()],
                        query: Some(query),
                        add_label_ids: action.add_label_ids.clone(),
                        remove_label_ids: action.remove_label_ids.clone(),
                        ..Default::default()
                    }),
                    Some(format!("Inbox messages matching {}", found.key)),
                )?);
            }
        }
    }
    Ok(records)
}

/// Label, archive and importance choices. `None` when nothing was chosen.
fn prompt_action(labels: &[Label], prompter: &mut dyn Prompter) -> Result<Option<FilterAction>> {
    let validate = |input: &str| {
        if input.is_empty() || find_label(labels, input).is_some() {
            Ok(())
        } else {
            Err(format!("Unable to find the label: {}", input))
        }
    };
    let name = prompter.ask("Apply the label name (empty for none)", &validate)?;

    let mut action = FilterAction::default();
    if let Some(label) = find_label(labels, &name).filter(|_| !name.is_empty()) {
        action.add_label_ids.push(label.id.clone());
    }
    if prompter.confirm("Skip the Inbox (archive it)?")? {
        action.remove_label_ids.push("INBOX".to_string());
    }
    match prompter.choose(
        "Should this be important",
        &[NEVER_IMPORTANT, ALWAYS_IMPORTANT, SKIP],
    )? {
        0 => action.remove_label_ids.push("IMPORTANT".to_string()),
        1 => action.add_label_ids.push("IMPORTANT".to_string()),
        _ => {}
    }

    if action.add_label_ids.is_empty() && action.remove_label_ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(action))
}
