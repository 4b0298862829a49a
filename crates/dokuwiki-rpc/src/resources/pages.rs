//! Page resource.

use serde::Serialize;

use crate::client::Client;
use crate::error::RpcError;
use crate::models::PageInfo;

/// Operations on wiki pages.
pub struct PagesResource<'c> {
    client: &'c Client,
}

impl<'c> PagesResource<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List pages under `namespace`, descending `depth` levels.
    pub fn list(&self, namespace: &str, depth: u32) -> Result<Vec<PageInfo>, RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            namespace: &'a str,
            depth: u32,
        }
        self.client
            .call("core.listPages", &Params { namespace, depth })
    }

    /// Fetch the full text of a page. Missing pages come back empty.
    pub fn get(&self, page: &str) -> Result<String, RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            page: &'a str,
        }
        self.client.call("core.getPage", &Params { page })
    }

    /// Overwrite a page's text. Saving empty text deletes the page.
    pub fn save(&self, page: &str, text: &str) -> Result<(), RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            page: &'a str,
            text: &'a str,
        }
        // Return shape varies across server versions; discard it.
        let _: serde_json::Value = self.client.call("core.savePage", &Params { page, text })?;
        Ok(())
    }
}
