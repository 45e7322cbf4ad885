//! Dataset Fetcher Module
//! Makes sure the CSV exists on local disk, downloading it at most once.

use reqwest::blocking::Client;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Some dataset hosts answer 403 to clients without a browser-like agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Download of {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Download of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to write dataset to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// True for local filesystem failures, false for network ones.
    pub fn is_write(&self) -> bool {
        matches!(self, FetchError::Write { .. })
    }
}

/// Downloads the dataset with a bounded timeout. No retries.
pub struct DatasetFetcher {
    client: Client,
}

impl DatasetFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Return `local_path`, downloading `url` into it first if it is absent.
    ///
    /// An existing file is trusted as-is and no request is made. The body is
    /// written byte for byte to a uniquely named file in the same directory
    /// and renamed into place. Concurrent first calls each stage their own
    /// copy; a reader never sees a partial dataset.
    pub fn ensure_local(&self, url: &str, local_path: &Path) -> Result<PathBuf, FetchError> {
        if local_path.exists() {
            debug!(path = %local_path.display(), "dataset already cached locally");
            return Ok(local_path.to_path_buf());
        }

        let write_err = |source: io::Error| FetchError::Write {
            path: local_path.to_path_buf(),
            source,
        };

        let dir = match local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(write_err)?;
                parent
            }
            None => Path::new("."),
        };

        info!(url, path = %local_path.display(), "downloading dataset");
        let bytes = self.download(url)?;

        let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(&bytes).map_err(write_err)?;
        staged.flush().map_err(write_err)?;
        if let Err(e) = staged.persist(local_path) {
            // another caller finished the same download first
            if !local_path.exists() {
                return Err(write_err(e.error));
            }
            debug!(path = %local_path.display(), "dataset written concurrently");
        }

        info!(bytes = bytes.len(), path = %local_path.display(), "dataset saved");
        Ok(local_path.to_path_buf())
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_err = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(request_err)?;
        Ok(body.to_vec())
    }
}
