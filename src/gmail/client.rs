//! Blocking Gmail REST v1 client over `ureq`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::types::{
    BatchModifyRequest, Filter, FilterList, Label, LabelList, LabelPatch, Message, MessagePage,
};
use super::{MailService, RemoteError, RemoteResult};

pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GmailClient {
    agent: ureq::Agent,
    api_base: String,
    token: String,
}

impl GmailClient {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = self.url(path);
        debug!(%method, %url, "gmail request");
        self.agent
            .request(method, &url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
    }

    fn read_json<T: DeserializeOwned>(
        result: Result<ureq::Response, ureq::Error>,
    ) -> RemoteResult<T> {
        let response = result.map_err(map_error)?;
        response
            .into_json::<T>()
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn expect_empty(result: Result<ureq::Response, ureq::Error>) -> RemoteResult<()> {
        result.map(|_| ()).map_err(map_error)
    }
}

fn map_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            RemoteError::api(status, message)
        }
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

impl MailService for GmailClient {
    fn list_labels(&self) -> RemoteResult<Vec<Label>> {
        let list: LabelList = Self::read_json(self.request("GET", "labels").call())?;
        Ok(list.labels)
    }

    fn get_label(&self, id: &str) -> RemoteResult<Label> {
        Self::read_json(self.request("GET", &format!("labels/{}", id)).call())
    }

    fn create_label(&self, label: &LabelPatch) -> RemoteResult<Label> {
        Self::read_json(self.request("POST", "labels").send_json(label))
    }

    fn patch_label(&self, id: &str, patch: &LabelPatch) -> RemoteResult<Label> {
        Self::read_json(
            self.request("PATCH", &format!("labels/{}", id))
                .send_json(patch),
        )
    }

    fn delete_label(&self, id: &str) -> RemoteResult<()> {
        Self::expect_empty(self.request("DELETE", &format!("labels/{}", id)).call())
    }

    fn list_filters(&self) -> RemoteResult<Vec<Filter>> {
        let list: FilterList = Self::read_json(self.request("GET", "settings/filters").call())?;
        Ok(list.filter)
    }

    fn get_filter(&self, id: &str) -> RemoteResult<Filter> {
        Self::read_json(
            self.request("GET", &format!("settings/filters/{}", id))
                .call(),
        )
    }

    fn create_filter(&self, filter: &Filter) -> RemoteResult<Filter> {
        // The API rejects unknown fields, so local metadata never leaves the machine.
        let body = Filter {
            id: None,
            criteria: filter.criteria.clone(),
            action: filter.action.clone(),
            meta: None,
        };
        Self::read_json(self.request("POST", "settings/filters").send_json(&body))
    }

    fn delete_filter(&self, id: &str) -> RemoteResult<()> {
        Self::expect_empty(
            self.request("DELETE", &format!("settings/filters/{}", id))
                .call(),
        )
    }

    fn list_messages(
        &self,
        query: Option<&str>,
        label_ids: &[String],
        page_token: Option<&str>,
        max_results: u32,
    ) -> RemoteResult<MessagePage> {
        let mut req = self
            .request("GET", "messages")
            .query("maxResults", &max_results.to_string());
        for label_id in label_ids {
            req = req.query("labelIds", label_id);
        }
        if let Some(q) = query {
            req = req.query("q", q);
        }
        if let Some(token) = page_token {
            req = req.query("pageToken", token);
        }
        Self::read_json(req.call())
    }

    fn get_message(&self, id: &str) -> RemoteResult<Message> {
        Self::read_json(
            self.request("GET", &format!("messages/{}", id))
                .query("format", "full")
                .call(),
        )
    }

    fn batch_modify(&self, request: &BatchModifyRequest) -> RemoteResult<()> {
        Self::expect_empty(
            self.request("POST", "messages/batchModify")
                .send_json(request),
        )
    }
}
