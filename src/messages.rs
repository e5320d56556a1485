//! Message listing, batch label requests, and criteria → search query rendering.

use tracing::debug;

use crate::gmail::types::{BatchModifyRequest, FilterCriteria, SizeComparison};
use crate::gmail::{BATCH_MODIFY_LIMIT, MAX_PAGE_SIZE, MailService, RemoteResult};

/// Every message id matching `label_ids` and `query`, following page tokens.
pub fn list_all_message_ids(
    service: &dyn MailService,
    label_ids: &[String],
    query: Option<&str>,
) -> RemoteResult<Vec<String>> {
    let mut ids = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = service.list_messages(query, label_ids, page_token.as_deref(), MAX_PAGE_SIZE)?;
        debug!(count = page.messages.len(), "message page");
        ids.extend(page.messages.into_iter().map(|m| m.id));
        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }
    Ok(ids)
}

/// Batch-modify requests applying the same add/remove lists to `message_ids`,
/// at most 1000 ids per request, in input order.
pub fn batch_requests(
    message_ids: &[String],
    add_label_ids: &[String],
    remove_label_ids: &[String],
) -> Vec<BatchModifyRequest> {
    message_ids
        .chunks(BATCH_MODIFY_LIMIT)
        .map(|chunk| BatchModifyRequest {
            ids: chunk.to_vec(),
            add_label_ids: add_label_ids.to_vec(),
            remove_label_ids: remove_label_ids.to_vec(),
        })
        .collect()
}

type Formatter = fn(&FilterCriteria) -> Option<String>;

/// Criteria fields in query order, each with its search-operator rendering.
const QUERY_TERMS: &[(&str, Formatter)] = &[
    ("from", from_term),
    ("to", to_term),
    ("subject", subject_term),
    ("query", query_term),
    ("negatedQuery", negated_query_term),
    ("hasAttachment", attachment_term),
    ("size", size_term),
];

fn from_term(c: &FilterCriteria) -> Option<String> {
    quoted("from", &c.from)
}

fn to_term(c: &FilterCriteria) -> Option<String> {
    quoted("to", &c.to)
}

fn subject_term(c: &FilterCriteria) -> Option<String> {
    quoted("subject", &c.subject)
}

fn query_term(c: &FilterCriteria) -> Option<String> {
    grouped("", &c.query)
}

fn negated_query_term(c: &FilterCriteria) -> Option<String> {
    grouped("-", &c.negated_query)
}

fn attachment_term(c: &FilterCriteria) -> Option<String> {
    c.has_attachment.then(|| "has:attachment".to_string())
}

fn size_term(c: &FilterCriteria) -> Option<String> {
    match (c.size_comparison, c.size) {
        (_, 0) => None,
        (Some(SizeComparison::Larger), n) => Some(format!("larger:{}", n)),
        (Some(SizeComparison::Smaller), n) => Some(format!("smaller:{}", n)),
        _ => None,
    }
}

fn quoted(operator: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(format!("{}:\"{}\"", operator, value.replace('"', "")))
    }
}

fn grouped(prefix: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(format!("{}({})", prefix, value))
    }
}

/// Render criteria as a message search query.
///
/// `unlabelled_only` prefixes `has:nouserlabels`. Returns `None` when no
/// field would narrow the search.
pub fn criteria_query(criteria: &FilterCriteria, unlabelled_only: bool) -> Option<String> {
    let terms: Vec<String> = QUERY_TERMS
        .iter()
        .filter_map(|(_, render)| render(criteria))
        .collect();
    if terms.is_empty() {
        return None;
    }
    let mut query = String::new();
    if unlabelled_only {
        query.push_str("has:nouserlabels ");
    }
    query.push_str(&terms.join(" "));
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_requests_chunking() {
        let ids: Vec<String> = (0..2500).map(|i| format!("m{}", i)).collect();
        let add = vec!["IMPORTANT".to_string()];
        let remove = vec!["INBOX".to_string()];
        let batches = batch_requests(&ids, &add, &remove);
        let sizes: Vec<usize> = batches.iter().map(|b| b.ids.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(batches[2].ids[0], "m2000");
        for b in &batches {
            assert_eq!(b.add_label_ids, add);
            assert_eq!(b.remove_label_ids, remove);
        }
        assert!(batch_requests(&[], &add, &remove).is_empty());
    }

    #[test]
    fn test_query_from_only() {
        let criteria = FilterCriteria {
            from: "a@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(
            criteria_query(&criteria, false).unwrap(),
            "from:\"a@example.com\""
        );
        assert_eq!(
            criteria_query(&criteria, true).unwrap(),
            "has:nouserlabels from:\"a@example.com\""
        );
    }

    #[test]
    fn test_query_field_order() {
        let criteria = FilterCriteria {
            subject: "Weekly".to_string(),
            from: "news@example.com".to_string(),
            query: "list:\"news.example.com\"".to_string(),
            negated_query: "urgent".to_string(),
            has_attachment: true,
            size: 1000,
            size_comparison: Some(SizeComparison::Larger),
            ..Default::default()
        };
        assert_eq!(
            criteria_query(&criteria, false).unwrap(),
            "from:\"news@example.com\" subject:\"Weekly\" (list:\"news.example.com\") -(urgent) has:attachment larger:1000"
        );
    }

    #[test]
    fn test_query_empty_criteria() {
        assert!(criteria_query(&FilterCriteria::default(), true).is_none());
        let only_chats = FilterCriteria {
            exclude_chats: true,
            ..Default::default()
        };
        assert!(criteria_query(&only_chats, false).is_none());
    }
}
