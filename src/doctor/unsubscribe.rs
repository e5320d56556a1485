//! Mine filter criteria from recent inbox mail that carries an unsubscribe link.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::gmail::types::{FilterCriteria, Message, MessagePart};
use crate::gmail::{MailService, RemoteResult};
use crate::messages::list_all_message_ids;

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b.*?</a>").unwrap());
static LIST_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^>]*)>\s*$").unwrap());
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r".*<([^>]*)>\s*$").unwrap());

/// A mined criteria with one message it matched, for review.
#[derive(Debug, Clone)]
pub struct CriteriaAndSampleMessage {
    /// `Query: ...`, `From: ...` or `To: ...`.
    pub key: String,
    pub criteria: FilterCriteria,
    pub sample: Message,
}

pub fn search_query(since: DateTime<Utc>) -> String {
    format!("+unsubscribe in:INBOX after:{}", since.timestamp())
}

/// Search the inbox since `since`, fetch each hit, and collect criteria.
pub fn mine(
    service: &dyn MailService,
    since: DateTime<Utc>,
) -> RemoteResult<Vec<CriteriaAndSampleMessage>> {
    let query = search_query(since);
    let ids = list_all_message_ids(service, &[], Some(&query))?;
    debug!(%query, count = ids.len(), "unsubscribe candidates");
    let mut messages = Vec::with_capacity(ids.len());
    for id in &ids {
        messages.push(service.get_message(id)?);
    }
    Ok(collect(messages))
}

/// Deduplicate messages with an unsubscribe link by criteria, keeping the
/// first message seen for each key. Sorted by key.
pub fn collect(messages: impl IntoIterator<Item = Message>) -> Vec<CriteriaAndSampleMessage> {
    let mut by_key: BTreeMap<String, CriteriaAndSampleMessage> = BTreeMap::new();
    for message in messages {
        if !has_unsubscribe_link(&message) {
            continue;
        }
        let Some((key, criteria)) = criteria_for(&message) else {
            debug!(id = %message.id, "no usable header");
            continue;
        };
        by_key
            .entry(key.clone())
            .or_insert(CriteriaAndSampleMessage {
                key,
                criteria,
                sample: message,
            });
    }
    by_key.into_values().collect()
}

pub fn has_unsubscribe_link(message: &Message) -> bool {
    let Some(payload) = &message.payload else {
        return false;
    };
    let mut html = Vec::new();
    html_bodies(payload, &mut html);
    html.iter().any(|body| {
        ANCHOR_RE
            .find_iter(body)
            .any(|m| m.as_str().to_lowercase().contains("unsubscribe"))
    })
}

fn html_bodies(part: &MessagePart, out: &mut Vec<String>) {
    if part.mime_type.eq_ignore_ascii_case("text/html") {
        if let Some(text) = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .and_then(decode_body)
        {
            out.push(text);
        }
    }
    for child in &part.parts {
        html_bodies(child, out);
    }
}

/// Body data is base64url; tolerate padding variants and plain base64.
fn decode_body(data: &str) -> Option<String> {
    let data = data.trim();
    let bytes = general_purpose::URL_SAFE
        .decode(data)
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(data))
        .or_else(|_| general_purpose::STANDARD.decode(data))
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// One criteria field from the headers: List-Id, else From, else To.
pub fn criteria_for(message: &Message) -> Option<(String, FilterCriteria)> {
    let present = |name: &str| message.header(name).filter(|v| !v.trim().is_empty());

    if let Some(list_id) = present("List-Id") {
        let id = capture(&LIST_ID_RE, list_id);
        let query = format!("list:\"{}\"", id);
        let criteria = FilterCriteria {
            query: query.clone(),
            ..Default::default()
        };
        return Some((format!("Query: {}", query), criteria));
    }
    if let Some(from) = present("From") {
        let from = capture(&ADDRESS_RE, from);
        let criteria = FilterCriteria {
            from: from.clone(),
            ..Default::default()
        };
        return Some((format!("From: {}", from), criteria));
    }
    if let Some(to) = present("To") {
        let to = to.trim().to_string();
        let criteria = FilterCriteria {
            to: to.clone(),
            ..Default::default()
        };
        return Some((format!("To: {}", to), criteria));
    }
    None
}

fn capture(re: &Regex, value: &str) -> String {
    re.captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(value)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::types::{Header, MessagePartBody};
    use chrono::TimeZone;

    fn html(body: &str) -> MessagePart {
        MessagePart {
            mime_type: "text/html".to_string(),
            body: Some(MessagePartBody {
                size: body.len() as i64,
                data: Some(general_purpose::URL_SAFE.encode(body)),
            }),
            ..Default::default()
        }
    }

    fn message(id: &str, headers: &[(&str, &str)], parts: Vec<MessagePart>) -> Message {
        Message {
            id: id.to_string(),
            payload: Some(MessagePart {
                mime_type: "multipart/alternative".to_string(),
                headers: headers
                    .iter()
                    .map(|(n, v)| Header {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
                parts,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    const LINK: &str = r#"<p>Bye</p><a href="https://x.example/u"><span>Unsubscribe</span></a>"#;

    #[test]
    fn test_search_query() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(search_query(since), "+unsubscribe in:INBOX after:1704067200");
    }

    #[test]
    fn test_link_detection() {
        let plain = MessagePart {
            mime_type: "text/plain".to_string(),
            body: Some(MessagePartBody {
                size: 0,
                data: Some(general_purpose::URL_SAFE.encode("unsubscribe here")),
            }),
            ..Default::default()
        };
        assert!(!has_unsubscribe_link(&message("1", &[], vec![plain])));
        assert!(has_unsubscribe_link(&message("2", &[], vec![html(LINK)])));
        assert!(!has_unsubscribe_link(&message(
            "3",
            &[],
            vec![html("<a href=\"/x\">Manage</a> unsubscribe")]
        )));
    }

    #[test]
    fn test_nested_html_part() {
        let inner = MessagePart {
            mime_type: "multipart/related".to_string(),
            parts: vec![html(LINK)],
            ..Default::default()
        };
        assert!(has_unsubscribe_link(&message("1", &[], vec![inner])));
    }

    #[test]
    fn test_criteria_precedence() {
        let m = message(
            "1",
            &[
                ("From", "News <news@example.com>"),
                ("List-Id", "Weekly news <weekly.example.com>"),
            ],
            vec![],
        );
        let (key, criteria) = criteria_for(&m).unwrap();
        assert_eq!(key, "Query: list:\"weekly.example.com\"");
        assert_eq!(criteria.query, "list:\"weekly.example.com\"");
        assert!(criteria.from.is_empty());

        let m = message("2", &[("from", "News <news@example.com>")], vec![]);
        assert_eq!(criteria_for(&m).unwrap().0, "From: news@example.com");

        let m = message("3", &[("From", "bare@example.com"), ("To", "me@example.com")], vec![]);
        assert_eq!(criteria_for(&m).unwrap().1.from, "bare@example.com");

        let m = message("4", &[("To", "me@example.com")], vec![]);
        assert_eq!(criteria_for(&m).unwrap().1.to, "me@example.com");

        assert!(criteria_for(&message("5", &[("Subject", "hi")], vec![])).is_none());
    }

    #[test]
    fn test_collect_dedupes_by_key() {
        let a = message(
            "a",
            &[("From", "a@example.com"), ("Subject", "One")],
            vec![html(LINK)],
        );
        let b = message(
            "b",
            &[("From", "a@example.com"), ("Subject", "Two")],
            vec![html(LINK)],
        );
        let c = message("c", &[("From", "z@example.com")], vec![]);
        let mined = collect(vec![a, b, c]);
        assert_eq!(mined.len(), 1);
        assert_eq!(mined[0].key, "From: a@example.com");
        assert_eq!(mined[0].sample.id, "a");
    }
}
