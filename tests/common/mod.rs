#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dokufs::fs::WikiFs;
use dokufs::fs::api::{ApiError, ContentApi, RemoteItem};

/// Modification stamp every mock listing row reports.
pub const MOCK_MTIME: u64 = 1_700_000_000;

/// Shared state backing [`MockApi`].
#[derive(Default)]
pub struct MockState {
    /// `document id -> text`
    pages: Mutex<BTreeMap<String, String>>,
    /// `attachment id -> bytes`
    media: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Every listing call: `(result set, namespace, depth)`, including
    /// calls that failed with an injected fault.
    list_calls: Mutex<Vec<(&'static str, String, u32)>>,
    /// Overwrite flags passed to `set_attachment`, in call order.
    overwrite_flags: Mutex<Vec<bool>>,
    /// Remaining calls that fail with a transient fault before the mock
    /// starts answering again.
    transient_fuses: AtomicU64,
    document_fetches: AtomicU64,
    document_saves: AtomicU64,
    document_deletes: AtomicU64,
    attachment_fetches: AtomicU64,
    attachment_saves: AtomicU64,
    attachment_deletes: AtomicU64,
}

/// A clonable in-memory wiki. Listings are derived from the stored
/// content, the way a live server derives them from its page index.
#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, id: &str, text: &str) -> Self {
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(id.to_owned(), text.to_owned());
        self
    }

    pub fn with_attachment(self, id: &str, data: &[u8]) -> Self {
        self.state
            .media
            .lock()
            .unwrap()
            .insert(id.to_owned(), data.to_vec());
        self
    }

    /// Make the next `calls` remote calls fail with a transient fault.
    pub fn trip_transient(&self, calls: u64) {
        self.state.transient_fuses.store(calls, Ordering::SeqCst);
    }

    pub fn document(&self, id: &str) -> Option<String> {
        self.state.pages.lock().unwrap().get(id).cloned()
    }

    pub fn attachment(&self, id: &str) -> Option<Vec<u8>> {
        self.state.media.lock().unwrap().get(id).cloned()
    }

    pub fn list_calls(&self) -> Vec<(&'static str, String, u32)> {
        self.state.list_calls.lock().unwrap().clone()
    }

    pub fn overwrite_flags(&self) -> Vec<bool> {
        self.state.overwrite_flags.lock().unwrap().clone()
    }

    pub fn document_fetches(&self) -> u64 {
        self.state.document_fetches.load(Ordering::SeqCst)
    }

    pub fn document_saves(&self) -> u64 {
        self.state.document_saves.load(Ordering::SeqCst)
    }

    pub fn document_deletes(&self) -> u64 {
        self.state.document_deletes.load(Ordering::SeqCst)
    }

    pub fn attachment_fetches(&self) -> u64 {
        self.state.attachment_fetches.load(Ordering::SeqCst)
    }

    pub fn attachment_saves(&self) -> u64 {
        self.state.attachment_saves.load(Ordering::SeqCst)
    }

    pub fn attachment_deletes(&self) -> u64 {
        self.state.attachment_deletes.load(Ordering::SeqCst)
    }

    fn blow_fuse(&self) -> Result<(), ApiError> {
        let remaining = self.state.transient_fuses.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state
                .transient_fuses
                .store(remaining - 1, Ordering::SeqCst);
            return Err(ApiError::Transient("injected transport fault".to_owned()));
        }
        Ok(())
    }

    fn in_namespace(namespace: &str, id: &str) -> bool {
        namespace.is_empty() || id == namespace || id.starts_with(&format!("{namespace}:"))
    }
}

impl ContentApi for MockApi {
    fn list_documents(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError> {
        self.state
            .list_calls
            .lock()
            .unwrap()
            .push(("documents", namespace.to_owned(), depth));
        self.blow_fuse()?;
        Ok(self
            .state
            .pages
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| Self::in_namespace(namespace, id))
            .map(|(id, text)| RemoteItem {
                id: id.clone(),
                mtime: MOCK_MTIME,
                size: text.len() as u64,
            })
            .collect())
    }

    fn list_attachments(&self, namespace: &str, depth: u32) -> Result<Vec<RemoteItem>, ApiError> {
        self.state
            .list_calls
            .lock()
            .unwrap()
            .push(("attachments", namespace.to_owned(), depth));
        self.blow_fuse()?;
        Ok(self
            .state
            .media
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| Self::in_namespace(namespace, id))
            .map(|(id, data)| RemoteItem {
                id: id.clone(),
                mtime: MOCK_MTIME,
                size: data.len() as u64,
            })
            .collect())
    }

    fn get_document(&self, id: &str) -> Result<String, ApiError> {
        self.blow_fuse()?;
        self.state.document_fetches.fetch_add(1, Ordering::SeqCst);
        // A wiki answers requests for unknown pages with empty text.
        Ok(self
            .state
            .pages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn set_document(&self, id: &str, text: &str) -> Result<(), ApiError> {
        self.blow_fuse()?;
        self.state.document_saves.fetch_add(1, Ordering::SeqCst);
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(id.to_owned(), text.to_owned());
        Ok(())
    }

    fn delete_document(&self, id: &str) -> Result<(), ApiError> {
        self.blow_fuse()?;
        self.state.document_deletes.fetch_add(1, Ordering::SeqCst);
        self.state.pages.lock().unwrap().remove(id);
        Ok(())
    }

    fn get_attachment(&self, id: &str) -> Result<Vec<u8>, ApiError> {
        self.blow_fuse()?;
        self.state.attachment_fetches.fetch_add(1, Ordering::SeqCst);
        self.state
            .media
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Remote(format!("no such attachment: {id}")))
    }

    fn set_attachment(&self, id: &str, data: &[u8], overwrite: bool) -> Result<(), ApiError> {
        self.blow_fuse()?;
        self.state.attachment_saves.fetch_add(1, Ordering::SeqCst);
        self.state.overwrite_flags.lock().unwrap().push(overwrite);
        self.state
            .media
            .lock()
            .unwrap()
            .insert(id.to_owned(), data.to_vec());
        Ok(())
    }

    fn delete_attachment(&self, id: &str) -> Result<(), ApiError> {
        self.blow_fuse()?;
        self.state.attachment_deletes.fetch_add(1, Ordering::SeqCst);
        self.state.media.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Mount helper: a filesystem over a clone of `api` with an empty chroot.
pub fn mount(api: &MockApi) -> WikiFs<MockApi> {
    WikiFs::new(api.clone(), "", (1000, 1000))
}
