//! Wire models for listing responses.

use serde::Deserialize;

/// One row of a `core.listPages` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    /// Full colon-delimited page id, e.g. `team:proj:design`.
    pub id: String,
    /// Last modification, seconds since the epoch.
    #[serde(default)]
    pub revision: u64,
    /// Page size in bytes.
    #[serde(default)]
    pub size: u64,
    /// First heading of the page, when the wiki indexes it.
    #[serde(default)]
    pub title: Option<String>,
}

/// One row of a `core.listMedia` response.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaInfo {
    /// Full colon-delimited media id.
    pub id: String,
    /// Last modification, seconds since the epoch.
    #[serde(default)]
    pub revision: u64,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Whether the wiki recognizes the file as an image.
    #[serde(default, rename = "isimg")]
    pub is_image: bool,
}
