//! Shared test fixtures: an in-memory mail service, a scripted prompter, temp stores.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use tempfile::TempDir;

use mailtidy::doctor::prompt::Prompter;
use mailtidy::gmail::types::{
    BatchModifyRequest, Filter, FilterAction, FilterCriteria, Header, Label, LabelPatch,
    LabelType, Message, MessagePage, MessagePart, MessagePartBody, MessageRef,
};
use mailtidy::gmail::{MailService, RemoteError, RemoteResult};
use mailtidy::store::Store;

/// A remote call as the fake saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListLabels,
    GetLabel(String),
    CreateLabel(LabelPatch),
    PatchLabel(String, LabelPatch),
    DeleteLabel(String),
    ListFilters,
    GetFilter(String),
    CreateFilter(Filter),
    DeleteFilter(String),
    ListMessages {
        query: Option<String>,
        label_ids: Vec<String>,
        page_token: Option<String>,
    },
    GetMessage(String),
    BatchModify(BatchModifyRequest),
}

/// In-memory mailbox recording every call in order.
#[derive(Default)]
pub struct FakeMailService {
    pub labels: RefCell<Vec<Label>>,
    pub filters: RefCell<Vec<Filter>>,
    /// Ids returned by message listings, whatever the query.
    pub message_ids: Vec<String>,
    pub messages: HashMap<String, Message>,
    pub calls: RefCell<Vec<Call>>,
    pub failures: RefCell<HashMap<&'static str, VecDeque<RemoteError>>>,
    pub next_id: Cell<u32>,
}

impl FakeMailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: Vec<Label>) -> Self {
        let fake = Self::default();
        *fake.labels.borrow_mut() = labels;
        fake
    }

    /// Queue an error for the next call to `method`.
    pub fn fail_next(&self, method: &'static str, err: RemoteError) {
        self.failures
            .borrow_mut()
            .entry(method)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls other than listings and reads.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::CreateLabel(..)
                        | Call::PatchLabel(..)
                        | Call::DeleteLabel(_)
                        | Call::CreateFilter(_)
                        | Call::DeleteFilter(_)
                        | Call::BatchModify(_)
                )
            })
            .collect()
    }

    fn record(&self, method: &'static str, call: Call) -> RemoteResult<()> {
        self.calls.borrow_mut().push(call);
        match self
            .failures
            .borrow_mut()
            .get_mut(method)
            .and_then(|q| q.pop_front())
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("{}{}", prefix, n)
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::api(404, format!("{} not found", what))
}

impl MailService for FakeMailService {
    fn list_labels(&self) -> RemoteResult<Vec<Label>> {
        self.record("list_labels", Call::ListLabels)?;
        Ok(self.labels.borrow().clone())
    }

    fn get_label(&self, id: &str) -> RemoteResult<Label> {
        self.record("get_label", Call::GetLabel(id.to_string()))?;
        self.labels
            .borrow()
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn create_label(&self, label: &LabelPatch) -> RemoteResult<Label> {
        self.record("create_label", Call::CreateLabel(label.clone()))?;
        let created = Label {
            id: self.fresh_id("Label_new"),
            name: label.name.clone().unwrap_or_default(),
            label_type: LabelType::User,
            label_list_visibility: label.label_list_visibility,
            message_list_visibility: label.message_list_visibility,
            color: label.color.clone(),
            ..Default::default()
        };
        self.labels.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn patch_label(&self, id: &str, patch: &LabelPatch) -> RemoteResult<Label> {
        self.record("patch_label", Call::PatchLabel(id.to_string(), patch.clone()))?;
        let mut labels = self.labels.borrow_mut();
        let label = labels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(name) = &patch.name {
            label.name = name.clone();
        }
        if patch.label_list_visibility.is_some() {
            label.label_list_visibility = patch.label_list_visibility;
        }
        if patch.message_list_visibility.is_some() {
            label.message_list_visibility = patch.message_list_visibility;
        }
        if patch.color.is_some() {
            label.color = patch.color.clone();
        }
        Ok(label.clone())
    }

    fn delete_label(&self, id: &str) -> RemoteResult<()> {
        self.record("delete_label", Call::DeleteLabel(id.to_string()))?;
        self.labels.borrow_mut().retain(|l| l.id != id);
        Ok(())
    }

    fn list_filters(&self) -> RemoteResult<Vec<Filter>> {
        self.record("list_filters", Call::ListFilters)?;
        Ok(self.filters.borrow().clone())
    }

    fn get_filter(&self, id: &str) -> RemoteResult<Filter> {
        self.record("get_filter", Call::GetFilter(id.to_string()))?;
        self.filters
            .borrow()
            .iter()
            .find(|f| f.id.as_deref() == Some(id))
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn create_filter(&self, filter: &Filter) -> RemoteResult<Filter> {
        self.record("create_filter", Call::CreateFilter(filter.clone()))?;
        let mut created = filter.clone();
        created.id = Some(self.fresh_id("filter-"));
        created.meta = None;
        self.filters.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn delete_filter(&self, id: &str) -> RemoteResult<()> {
        self.record("delete_filter", Call::DeleteFilter(id.to_string()))?;
        let mut filters = self.filters.borrow_mut();
        let before = filters.len();
        filters.retain(|f| f.id.as_deref() != Some(id));
        if filters.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list_messages(
        &self,
        query: Option<&str>,
        label_ids: &[String],
        page_token: Option<&str>,
        max_results: u32,
    ) -> RemoteResult<MessagePage> {
        self.record(
            "list_messages",
            Call::ListMessages {
                query: query.map(str::to_string),
                label_ids: label_ids.to_vec(),
                page_token: page_token.map(str::to_string),
            },
        )?;
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + max_results as usize).min(self.message_ids.len());
        let messages = self.message_ids[start..end]
            .iter()
            .map(|id| MessageRef {
                id: id.clone(),
                thread_id: id.clone(),
            })
            .collect();
        let next_page_token = (end < self.message_ids.len()).then(|| end.to_string());
        Ok(MessagePage {
            messages,
            next_page_token,
        })
    }

    fn get_message(&self, id: &str) -> RemoteResult<Message> {
        self.record("get_message", Call::GetMessage(id.to_string()))?;
        self.messages.get(id).cloned().ok_or_else(|| not_found(id))
    }

    fn batch_modify(&self, request: &BatchModifyRequest) -> RemoteResult<()> {
        self.record("batch_modify", Call::BatchModify(request.clone()))
    }
}

// --- Prompts ---

#[derive(Debug, Clone)]
pub enum Answer {
    Confirm(bool),
    Choose(usize),
    Ask(String),
}

/// Replays answers in order; panics when a question does not match the script.
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            questions: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, question: &str) -> Answer {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted question: {}", question))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        match self.next(question) {
            Answer::Confirm(b) => Ok(b),
            other => panic!("{:?} given for confirm {:?}", other, question),
        }
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> anyhow::Result<usize> {
        match self.next(question) {
            Answer::Choose(i) if i < options.len() => Ok(i),
            other => panic!("{:?} given for choose {:?}", other, question),
        }
    }

    fn ask(
        &mut self,
        question: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> anyhow::Result<String> {
        match self.next(question) {
            Answer::Ask(s) => {
                if let Err(msg) = validate(&s) {
                    panic!("scripted answer {:?} rejected: {}", s, msg);
                }
                Ok(s)
            }
            other => panic!("{:?} given for ask {:?}", other, question),
        }
    }
}

// --- Fixtures ---

pub fn temp_store() -> (TempDir, Store) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let store = Store::new(tmp.path());
    (tmp, store)
}

pub fn write_migration(root: &Path, name: &str, json: &str) {
    let dir = root.join("migrations");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), json).unwrap();
}

pub fn label(id: &str, name: &str, label_type: LabelType) -> Label {
    Label {
        id: id.to_string(),
        name: name.to_string(),
        label_type,
        ..Default::default()
    }
}

pub fn user_label(id: &str, name: &str, messages: u64) -> Label {
    Label {
        messages_total: messages,
        threads_total: messages,
        ..label(id, name, LabelType::User)
    }
}

pub fn system_labels() -> Vec<Label> {
    ["INBOX", "IMPORTANT", "STARRED", "SPAM"]
        .iter()
        .map(|id| Label {
            messages_total: 10,
            threads_total: 10,
            ..label(id, id, LabelType::System)
        })
        .collect()
}

pub fn filter(id: &str, criteria: FilterCriteria, add: &[&str], remove: &[&str]) -> Filter {
    Filter {
        id: Some(id.to_string()),
        criteria,
        action: FilterAction {
            add_label_ids: add.iter().map(|s| s.to_string()).collect(),
            remove_label_ids: remove.iter().map(|s| s.to_string()).collect(),
            forward: String::new(),
        },
        meta: None,
    }
}

pub fn from_criteria(from: &str) -> FilterCriteria {
    FilterCriteria {
        from: from.to_string(),
        ..Default::default()
    }
}

/// A message with top-level headers and one text/html part.
pub fn html_message(id: &str, headers: &[(&str, &str)], html: &str) -> Message {
    use base64::Engine as _;
    Message {
        id: id.to_string(),
        thread_id: id.to_string(),
        payload: Some(MessagePart {
            mime_type: "multipart/alternative".to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| Header {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            parts: vec![MessagePart {
                mime_type: "text/html".to_string(),
                body: Some(MessagePartBody {
                    size: html.len() as i64,
                    data: Some(base64::engine::general_purpose::URL_SAFE.encode(html)),
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub const UNSUBSCRIBE_HTML: &str =
    r#"<html><body><p>Hi</p><a href="https://lists.example/u?id=1">Unsubscribe</a></body></html>"#;
