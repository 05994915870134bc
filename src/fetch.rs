// src/fetch.rs

use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use std::{path::Path, time::Instant};
use tracing::{info, instrument};
use url::Url;

/// GET the dataset and return the raw CSV bytes. Anything but `200 OK` is an error.
#[instrument(level = "info", skip(client))]
pub async fn download_dataset(client: &Client, url: &str) -> Result<Vec<u8>> {
    let parsed = Url::parse(url).map_err(|e| Error::download(url, format!("invalid URL: {}", e)))?;

    let start = Instant::now();
    let resp = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| Error::download(url, e))?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(Error::download(url, format!("status {}", status)));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| Error::download(url, format!("reading body: {}", e)))?;
    info!(bytes = bytes.len(), elapsed = ?start.elapsed(), "downloaded dataset");
    Ok(bytes.to_vec())
}

/// Read a dataset that was saved to disk beforehand.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub async fn read_dataset_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io(format!("reading dataset {}", path.display()), e))?;
    info!(bytes = data.len(), "read dataset file");
    Ok(data)
}
