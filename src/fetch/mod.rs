//! Retrieval of raw open-data responses.
//!
//! Each source is queried with a single GET request, decoded as JSON and
//! written verbatim (pretty-printed) to the raw data directory.

mod basic;
mod client;
pub mod sources;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use sources::{fetch_enterprise, fetch_pollution, fetch_population};

use reqwest::blocking::Request;
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("error decoding JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    /// `true` for JSON decoding failures, which are reported apart from
    /// transport errors.
    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }
}

/// Builds a GET request for `url` with `params` appended as query pairs.
pub fn build_request(url: &str, params: &[(&str, String)]) -> Result<Request, FetchError> {
    let url = Url::parse_with_params(url, params).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Request::new(Method::GET, url))
}

/// Sends a GET request and decodes the body as JSON.
///
/// Non-2xx responses are reported as [`FetchError::Http`].
pub fn fetch_json<C: HttpClient>(
    client: &C,
    url: &str,
    params: &[(&str, String)],
) -> Result<Value, FetchError> {
    let req = build_request(url, params)?;
    debug!(url = %req.url(), "Sending request");

    let resp = client.execute(req)?.error_for_status()?;
    let bytes = resp.bytes()?;
    debug!(bytes = bytes.len(), "Response received");

    decode_json(&bytes)
}

pub fn decode_json(bytes: &[u8]) -> Result<Value, FetchError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Writes `value` to `path` as UTF-8 JSON indented by four spaces.
///
/// Non-ASCII characters are written as-is. Any previous file is replaced.
pub fn save_raw(path: &Path, value: &Value) -> Result<(), FetchError> {
    let persist = |source: std::io::Error| FetchError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(persist)?;
    }

    let file = File::create(path).map_err(persist)?;
    let mut writer = BufWriter::new(file);
    let mut ser = Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut ser)
        .map_err(|e| persist(e.into()))?;
    writer.flush().map_err(persist)?;

    Ok(())
}
