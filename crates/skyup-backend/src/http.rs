//! HTTP helpers shared by the device and self-update backends

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use skyup_api::DownloadEvent;

use crate::error::BackendError;

const USER_AGENT: &str = concat!("skyup/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used for all backend requests
///
/// # Errors
/// Returns `BackendError::Network` if the TLS backend cannot be initialised
pub fn build_client() -> Result<Client, BackendError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| BackendError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send a GET request and fail on non-success status
async fn get(client: &Client, url: &str) -> Result<Response, BackendError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(BackendError::Network(format!(
            "GET {url} returned {}",
            response.status()
        )));
    }

    Ok(response)
}

/// Fetch a small text document
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, BackendError> {
    let response = get(client, url).await?;
    Ok(response.text().await?)
}

/// Download into memory, calling `on_chunk(total, downloaded)` after every chunk
///
/// `total` is 0 when the server sends no content length.
pub async fn download_bytes(
    client: &Client,
    url: &str,
    mut on_chunk: impl FnMut(u64, u64),
) -> Result<Vec<u8>, BackendError> {
    let response = get(client, url).await?;
    let total = response.content_length().unwrap_or(0);
    let mut buffer = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut downloaded = 0u64;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.extend_from_slice(&chunk);
        downloaded += chunk.len() as u64;
        on_chunk(total, downloaded);
    }

    debug!(url, bytes = downloaded, "download finished");
    Ok(buffer)
}

/// Stream a download into `path`, reporting chunk-level events
pub async fn download_to_file(
    client: &Client,
    url: &str,
    path: &Path,
    mut on_event: impl FnMut(DownloadEvent),
) -> Result<u64, BackendError> {
    let response = get(client, url).await?;
    on_event(DownloadEvent::Started {
        content_length: response.content_length(),
    });

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        on_event(DownloadEvent::Progress {
            chunk_length: chunk.len() as u64,
        });
    }

    file.flush().await?;
    on_event(DownloadEvent::Finished);

    debug!(url, path = %path.display(), bytes = written, "download written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_text_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/app.ver").with_status(404).create_async().await;

        let client = build_client().unwrap();
        let result = fetch_text(&client, &format!("{}/app.ver", server.url())).await;

        assert!(matches!(result, Err(BackendError::Network(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_bytes_reports_progress() {
        let mut server = mockito::Server::new_async().await;
        let body = vec![7u8; 4096];
        server
            .mock("GET", "/bundle.tar")
            .with_status(200)
            .with_body(body.clone())
            .create_async()
            .await;

        let client = build_client().unwrap();
        let mut samples = Vec::new();
        let bytes = download_bytes(&client, &format!("{}/bundle.tar", server.url()), |t, d| {
            samples.push((t, d));
        })
        .await
        .unwrap();

        assert_eq!(bytes, body);
        let (total, downloaded) = *samples.last().unwrap();
        assert_eq!(total, 4096);
        assert_eq!(downloaded, 4096);
        assert!(samples.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[tokio::test]
    async fn test_download_to_file_events() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/skyup")
            .with_status(200)
            .with_body("new binary")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skyup.new");
        let client = build_client().unwrap();
        let mut events = Vec::new();

        let written = download_to_file(&client, &format!("{}/skyup", server.url()), &path, |e| {
            events.push(e);
        })
        .await
        .unwrap();

        assert_eq!(written, 10);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new binary");
        assert_eq!(
            events.first(),
            Some(&DownloadEvent::Started {
                content_length: Some(10)
            })
        );
        assert_eq!(events.last(), Some(&DownloadEvent::Finished));
        let chunked: u64 = events
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::Progress { chunk_length } => Some(*chunk_length),
                _ => None,
            })
            .sum();
        assert_eq!(chunked, 10);
    }
}
