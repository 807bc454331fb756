use std::time::Duration;

use serde_json::{json, Value};

use crate::config::RemoteConfig;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Transport(String),
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("remote returned malformed payload: {0}")]
    Decode(String),
}

/// One write inside a batch commit.
#[derive(Debug, Clone)]
pub struct BatchWrite {
    pub collection: String,
    pub id: String,
    pub doc: Value,
}

/// Remote document store seen as collections of JSON documents keyed by id.
/// Implementations must be safe to call from the push worker and realtime
/// watcher threads.
pub trait RemoteStore: Send + Sync {
    fn list_all(&self, collection: &str) -> Result<Vec<Value>, RemoteError>;
    fn get_doc(&self, collection: &str, id: &str) -> Result<Option<Value>, RemoteError>;
    fn put(&self, collection: &str, id: &str, doc: &Value) -> Result<(), RemoteError>;
    fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;
    fn commit_batch(&self, writes: &[BatchWrite]) -> Result<(), RemoteError>;
}

/// HTTP implementation of the document-store contract:
///
///   GET    {base}/collections/{name}           -> [doc, ...]
///   GET    {base}/collections/{name}/{id}      -> doc (404 when absent)
///   PUT    {base}/collections/{name}/{id}      <- doc
///   DELETE {base}/collections/{name}/{id}
///   POST   {base}/batch                        <- {"writes": [...]}
pub struct HttpRemote {
    client: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<HttpRemote, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(HttpRemote {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::blocking::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn send(
        &self,
        builder: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, RemoteError> {
        let resp = builder
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(RemoteError::Status(status.as_u16()))
        }
    }
}

impl RemoteStore for HttpRemote {
    fn list_all(&self, collection: &str) -> Result<Vec<Value>, RemoteError> {
        let resp = self.send(self.request(
            reqwest::Method::GET,
            &format!("collections/{collection}"),
        ))?;
        let docs: Vec<Value> = resp
            .json()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(docs)
    }

    fn get_doc(&self, collection: &str, id: &str) -> Result<Option<Value>, RemoteError> {
        let builder = self.request(
            reqwest::Method::GET,
            &format!("collections/{collection}/{id}"),
        );
        match self.send(builder) {
            Ok(resp) => {
                let doc: Value = resp
                    .json()
                    .map_err(|e| RemoteError::Decode(e.to_string()))?;
                Ok(Some(doc))
            }
            Err(RemoteError::Status(404)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, collection: &str, id: &str, doc: &Value) -> Result<(), RemoteError> {
        self.send(
            self.request(
                reqwest::Method::PUT,
                &format!("collections/{collection}/{id}"),
            )
            .json(doc),
        )?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        self.send(self.request(
            reqwest::Method::DELETE,
            &format!("collections/{collection}/{id}"),
        ))?;
        Ok(())
    }

    fn commit_batch(&self, writes: &[BatchWrite]) -> Result<(), RemoteError> {
        let body = json!({
            "writes": writes
                .iter()
                .map(|w| json!({
                    "collection": w.collection,
                    "id": w.id,
                    "doc": w.doc,
                }))
                .collect::<Vec<Value>>(),
        });
        self.send(self.request(reqwest::Method::POST, "batch").json(&body))?;
        Ok(())
    }
}
