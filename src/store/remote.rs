use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

use super::error::StorageError;
use super::SnapshotStore;

/// HTTP client for a remote draft service.
///
/// Speaks the protocol served by `store::http::router`:
///
/// - `GET    {endpoint}/drafts/{key}` - 200 with the payload, 404 if absent
/// - `PUT    {endpoint}/drafts/{key}` - store the JSON body
/// - `DELETE {endpoint}/drafts/{key}` - 204 if removed, 404 if absent
///
/// 413 and 507 responses mean the server is out of room; every other
/// failure (connect, auth, 5xx) is reported as `Unavailable`.
#[derive(Debug, Clone)]
pub struct RemoteSnapshotStore {
    client: Client,
    endpoint: Url,
}

impl RemoteSnapshotStore {
    pub fn new(endpoint: impl AsRef<str>, timeout: Duration) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint.as_ref()).map_err(|e| {
            StorageError::Unavailable(format!("endpoint {}: {e}", endpoint.as_ref()))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::Unavailable(format!(
                "endpoint {endpoint} cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Unavailable(format!("http client: {e}")))?;
        Ok(RemoteSnapshotStore { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// `{endpoint}/drafts/{key}` with the key as one percent-encoded segment.
    fn url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("drafts").push(key);
        }
        url
    }
}

fn status_error(status: StatusCode, body: String) -> StorageError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE | StatusCode::INSUFFICIENT_STORAGE => {
            StorageError::QuotaExceeded(format!("{status}: {body}"))
        }
        _ => StorageError::Unavailable(format!("{status}: {body}")),
    }
}

fn transport_error(err: reqwest::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

impl SnapshotStore for RemoteSnapshotStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let resp = self
            .client
            .get(self.url(key))
            .send()
            .map_err(transport_error)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp.text().map(Some).map_err(transport_error),
            status => Err(status_error(status, resp.text().unwrap_or_default())),
        }
    }

    fn write_raw(&self, key: &str, payload: String) -> Result<(), StorageError> {
        let resp = self
            .client
            .put(self.url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .map_err(transport_error)?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, resp.text().unwrap_or_default()))
        }
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let resp = self
            .client
            .delete(self.url(key))
            .send()
            .map_err(transport_error)?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(status_error(status, resp.text().unwrap_or_default())),
        }
    }
}
