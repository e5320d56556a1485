//! Remote mail service: the `MailService` contract and its Gmail REST client.

pub mod client;
pub mod error;
pub mod types;

pub use self::client::GmailClient;
pub use self::error::RemoteError;

use self::types::{BatchModifyRequest, Filter, Label, LabelPatch, Message, MessagePage};

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Largest page the message listing endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Largest id list a single batch-modify call accepts.
pub const BATCH_MODIFY_LIMIT: usize = 1000;

/// Operations consumed from the remote mailbox.
///
/// Calls are issued one at a time; implementations need not be `Sync`.
pub trait MailService {
    fn list_labels(&self) -> RemoteResult<Vec<Label>>;
    fn get_label(&self, id: &str) -> RemoteResult<Label>;
    fn create_label(&self, label: &LabelPatch) -> RemoteResult<Label>;
    fn patch_label(&self, id: &str, patch: &LabelPatch) -> RemoteResult<Label>;
    fn delete_label(&self, id: &str) -> RemoteResult<()>;

    fn list_filters(&self) -> RemoteResult<Vec<Filter>>;
    fn get_filter(&self, id: &str) -> RemoteResult<Filter>;
    fn create_filter(&self, filter: &Filter) -> RemoteResult<Filter>;
    fn delete_filter(&self, id: &str) -> RemoteResult<()>;

    fn list_messages(
        &self,
        query: Option<&str>,
        label_ids: &[String],
        page_token: Option<&str>,
        max_results: u32,
    ) -> RemoteResult<MessagePage>;
    /// Fetch a message with `format=full`.
    fn get_message(&self, id: &str) -> RemoteResult<Message>;
    fn batch_modify(&self, request: &BatchModifyRequest) -> RemoteResult<()>;
}
