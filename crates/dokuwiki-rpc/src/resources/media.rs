//! Media resource.
//!
//! Media bodies travel base64-encoded inside the JSON envelope.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::client::Client;
use crate::error::RpcError;
use crate::models::MediaInfo;

/// Operations on media files.
pub struct MediaResource<'c> {
    client: &'c Client,
}

impl<'c> MediaResource<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List media under `namespace`, descending `depth` levels.
    pub fn list(&self, namespace: &str, depth: u32) -> Result<Vec<MediaInfo>, RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            namespace: &'a str,
            depth: u32,
        }
        self.client
            .call("core.listMedia", &Params { namespace, depth })
    }

    /// Fetch a media file's bytes.
    pub fn get(&self, media: &str) -> Result<Vec<u8>, RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            media: &'a str,
        }
        let encoded: String = self.client.call("core.getMedia", &Params { media })?;
        Ok(BASE64.decode(encoded.as_bytes())?)
    }

    /// Store a media file's bytes.
    pub fn save(&self, media: &str, data: &[u8], overwrite: bool) -> Result<(), RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            media: &'a str,
            base64: String,
            overwrite: bool,
        }
        // Return shape varies across server versions; discard it.
        let _: serde_json::Value = self.client.call(
            "core.saveMedia",
            &Params {
                media,
                base64: BASE64.encode(data),
                overwrite,
            },
        )?;
        Ok(())
    }

    /// Delete a media file.
    pub fn delete(&self, media: &str) -> Result<(), RpcError> {
        #[derive(Serialize)]
        struct Params<'a> {
            media: &'a str,
        }
        let _: serde_json::Value = self.client.call("core.deleteMedia", &Params { media })?;
        Ok(())
    }
}
