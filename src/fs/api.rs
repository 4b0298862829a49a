//! The remote content surface the core is written against.

use thiserror::Error;
use tracing::debug;

use dokuwiki_rpc::RpcError;

/// A remote call failure, classified for retry purposes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport hiccup; the same call may succeed if reissued.
    #[error("transient remote fault: {0}")]
    Transient(String),

    /// Hard failure; retrying will not help.
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl ApiError {
    /// True when the caller should surface a retry signal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<RpcError> for ApiError {
    fn from(e: RpcError) -> Self {
        if e.is_transient() {
            Self::Transient(e.to_string())
        } else {
            Self::Remote(e.to_string())
        }
    }
}

/// One row of a remote namespace listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Full colon-delimited id, e.g. `team:proj:design`.
    pub id: String,
    /// Last modification, seconds since the epoch.
    pub mtime: u64,
    /// Content size in bytes.
    pub size: u64,
}

/// Remote content operations the filesystem depends on.
///
/// Documents are text, attachments are raw bytes; both live in the same
/// colon-delimited namespace.
pub trait ContentApi {
    /// List document ids under `namespace`, descending `depth` levels.
    fn list_documents(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError>;

    /// List attachment ids under `namespace`, descending `depth` levels.
    fn list_attachments(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError>;

    /// Fetch a document's text. Missing documents come back empty.
    fn get_document(&self, id: &str) -> Result<String, ApiError>;

    /// Overwrite a document's text.
    fn set_document(&self, id: &str, text: &str) -> Result<(), ApiError>;

    /// Remove a document from the remote store.
    fn delete_document(&self, id: &str) -> Result<(), ApiError>;

    /// Fetch an attachment's bytes.
    fn get_attachment(&self, id: &str) -> Result<Vec<u8>, ApiError>;

    /// Store an attachment's bytes.
    fn set_attachment(&self, id: &str, data: &[u8], overwrite: bool) -> Result<(), ApiError>;

    /// Remove an attachment from the remote store.
    fn delete_attachment(&self, id: &str) -> Result<(), ApiError>;
}

/// [`ContentApi`] backed by a live wiki over JSON-RPC.
pub struct WikiApi {
    client: dokuwiki_rpc::Client,
}

impl WikiApi {
    /// Wrap a configured RPC client.
    pub fn new(client: dokuwiki_rpc::Client) -> Self {
        Self { client }
    }
}

impl ContentApi for WikiApi {
    fn list_documents(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError> {
        let rows = self.client.pages().list(namespace, depth)?;
        Ok(rows
            .into_iter()
            .map(|p| RemoteItem {
                id: p.id,
                mtime: p.revision,
                size: p.size,
            })
            .collect())
    }

    fn list_attachments(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError> {
        let rows = self.client.media().list(namespace, depth)?;
        Ok(rows
            .into_iter()
            .map(|m| RemoteItem {
                id: m.id,
                mtime: m.revision,
                size: m.size,
            })
            .collect())
    }

    fn get_document(&self, id: &str) -> Result<String, ApiError> {
        Ok(self.client.pages().get(id)?)
    }

    fn set_document(&self, id: &str, text: &str) -> Result<(), ApiError> {
        Ok(self.client.pages().save(id, text)?)
    }

    fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        // The wire protocol has no page-delete method; an empty page is
        // the deleted state.
        debug!(id, "deleting document by saving empty text");
        Ok(self.client.pages().save(id, "")?)
    }

    fn get_attachment(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        Ok(self.client.media().get(id)?)
    }

    fn set_attachment(&self, id: &str, data: &[u8], overwrite: bool) -> Result<(), ApiError> {
        Ok(self.client.media().save(id, data, overwrite)?)
    }

    fn delete_attachment(&self, id: &str) -> Result<(), ApiError> {
        Ok(self.client.media().delete(id)?)
    }
}
