//! The blocking JSON-RPC client.

use std::io::Read as _;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::RpcError;
use crate::resources::{MediaResource, PagesResource};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How calls authenticate against the wiki.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// No `Authorization` header; the wiki must allow anonymous reads.
    Anonymous,
    /// HTTP Basic authentication.
    Basic {
        /// Login name.
        user: String,
        /// Login password.
        password: String,
    },
    /// A pre-issued API token, sent as a bearer token.
    Token(String),
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl ClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: Credentials::Anonymous,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the credentials used on every call.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the global request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration and construct the client.
    pub fn build(self) -> Result<Client, RpcError> {
        let base_url = self.base_url.trim_end_matches('/').to_owned();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RpcError::InvalidUrl(base_url));
        }

        let authorization = match &self.credentials {
            Credentials::Anonymous => None,
            Credentials::Basic { user, password } => Some(format!(
                "Basic {}",
                BASE64.encode(format!("{user}:{password}"))
            )),
            Credentials::Token(token) => Some(format!("Bearer {token}")),
        };

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            // We read non-2xx bodies ourselves; they carry rpc fault objects.
            .http_status_as_error(false)
            .build()
            .new_agent();

        Ok(Client {
            agent,
            base_url,
            authorization,
        })
    }
}

/// A blocking client for one wiki's JSON-RPC endpoint.
pub struct Client {
    agent: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl Client {
    /// Start building a client for the wiki at `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Operations on wiki pages.
    pub fn pages(&self) -> PagesResource<'_> {
        PagesResource::new(self)
    }

    /// Operations on media files.
    pub fn media(&self) -> MediaResource<'_> {
        MediaResource::new(self)
    }

    /// Issue one JSON-RPC call and decode its result.
    pub(crate) fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError> {
        let url = format!("{}/lib/exe/jsonrpc.php/{method}", self.base_url);
        let body = serde_json::to_vec(params)?;

        let mut builder = http::Request::builder()
            .method(http::Method::POST)
            .uri(&url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::ACCEPT, "application/json");
        if let Some(auth) = &self.authorization {
            builder = builder.header(http::header::AUTHORIZATION, auth);
        }
        let request = builder
            .body(body)
            .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;

        trace!(method, "dispatching rpc call");
        let response = match self.agent.run(request) {
            Ok(resp) => resp,
            Err(ureq::Error::Timeout(_)) => return Err(RpcError::Timeout),
            Err(ureq::Error::HostNotFound) => {
                return Err(RpcError::Connection("host not found".to_owned()));
            }
            Err(ureq::Error::Io(e)) => return Err(RpcError::Connection(e.to_string())),
            Err(e) => return Err(RpcError::Transport(Box::new(e))),
        };

        let (parts, body) = response.into_parts();
        let mut bytes = Vec::new();
        body.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| RpcError::Connection(e.to_string()))?;

        if !parts.status.is_success() {
            return Err(RpcError::Status {
                status: parts.status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        decode_envelope(&bytes)
    }
}

/// Unpack a `{"result": ...}` / `{"error": {...}}` response body.
///
/// A `"result"` key holding `null` is a valid answer (several write
/// methods return nothing), so the key's presence is what matters.
fn decode_envelope<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, RpcError> {
    #[derive(serde::Deserialize)]
    struct Fault {
        code: i64,
        message: String,
    }

    let mut object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes)?;
    if let Some(fault_value) = object.remove("error")
        && !fault_value.is_null()
    {
        let fault: Fault = serde_json::from_value(fault_value)?;
        return Err(RpcError::Rpc {
            code: fault.code,
            message: fault.message,
        });
    }
    let value = object.remove("result").ok_or(RpcError::EmptyResponse)?;
    Ok(serde_json::from_value(value)?)
}
