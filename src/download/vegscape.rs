//! VegScape NDVI retrieval: the GetFile API and the per-county tile cache.

use crate::error::Result;
use crate::utils::constants::{DOWNLOAD_CHUNK_SIZE, VEGSCAPE_GETFILE_URL, VEGSCAPE_NDVI_CACHE_URL};
use crate::utils::progress::ProgressReporter;
use futures_util::StreamExt;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

/// GetFile answers with single-quoted pseudo-JSON such as
/// `{'success':'true','url':'https://...'}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetFileResponse {
    #[serde(default)]
    pub success: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl GetFileResponse {
    pub fn is_success(&self) -> bool {
        self.success == "true"
    }
}

pub fn parse_getfile_response(body: &str) -> Result<GetFileResponse> {
    let corrected = body.replace('\'', "\"");
    Ok(serde_json::from_str(&corrected)?)
}

/// `{cache}/{weekly}_{dates}_{fips}.tif`
pub fn ndvi_cache_url(base_url: &str, weekly_ndvi: &str, date_range: &str, fips: &str) -> String {
    format!(
        "{}/{}_{}_{}.tif",
        base_url.trim_end_matches('/'),
        weekly_ndvi,
        date_range,
        fips
    )
}

/// Local name for a cached tile: `{weekly}_{fips}_{dates}.tif`
pub fn ndvi_file_name(weekly_ndvi: &str, fips: &str, date_range: &str) -> String {
    format!("{}_{}_{}.tif", weekly_ndvi, fips, date_range)
}

/// Request failures, grouped the way they are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Status(u16),
    Connection,
    Timeout,
    Decode,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Status(code) => write!(f, "HTTP Error {}", code),
            FailureKind::Connection => write!(f, "Connection Error"),
            FailureKind::Timeout => write!(f, "Timeout Error"),
            FailureKind::Decode => write!(f, "Error decoding JSON"),
            FailureKind::Other => write!(f, "Request Error"),
        }
    }
}

pub fn classify(err: &reqwest::Error) -> FailureKind {
    if let Some(status) = err.status() {
        FailureKind::Status(status.as_u16())
    } else if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() {
        FailureKind::Connection
    } else {
        FailureKind::Other
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Saved { path: PathBuf, bytes: u64 },
    /// GetFile answered but reported no data for the request
    Unavailable,
    Failed { kind: FailureKind, message: String },
}

impl DownloadOutcome {
    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        error!("{}: {}", kind, message);
        DownloadOutcome::Failed { kind, message }
    }

    fn from_request_error(err: reqwest::Error) -> Self {
        Self::failed(classify(&err), err.to_string())
    }
}

/// Thin reqwest client over the two VegScape endpoints. Failed requests are
/// reported once and never retried.
pub struct VegScapeClient {
    client: reqwest::Client,
    getfile_url: String,
    cache_url: String,
}

impl VegScapeClient {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            getfile_url: VEGSCAPE_GETFILE_URL.to_string(),
            cache_url: VEGSCAPE_NDVI_CACHE_URL.to_string(),
        })
    }

    pub fn with_base_urls(mut self, getfile_url: &str, cache_url: &str) -> Self {
        self.getfile_url = getfile_url.to_string();
        self.cache_url = cache_url.to_string();
        self
    }

    /// Ask GetFile for the product of `fips` over `date` and save it into `output_dir`.
    pub async fn fetch_getfile(
        &self,
        fips: &str,
        date: &str,
        output_dir: &Path,
        progress: &ProgressReporter,
    ) -> Result<DownloadOutcome> {
        let response = match self
            .client
            .get(&self.getfile_url)
            .query(&[("fips", fips), ("date", date)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(DownloadOutcome::from_request_error(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Ok(DownloadOutcome::failed(
                FailureKind::Status(status.as_u16()),
                format!("Failed to retrieve data: {}", status),
            ));
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(DownloadOutcome::from_request_error(e)),
        };

        let parsed = match parse_getfile_response(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(DownloadOutcome::failed(
                    FailureKind::Decode,
                    format!("{} (corrected text: {})", e, body.replace('\'', "\"")),
                ))
            }
        };

        let success = parsed.is_success();
        match parsed.url.filter(|_| success) {
            Some(url) => {
                info!("Downloading file from: {}", url);
                let name = url
                    .rsplit('/')
                    .next()
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{}_{}.tif", fips, date));
                self.download(&url, &output_dir.join(name), progress).await
            }
            None => {
                warn!("Data retrieval was not successful.");
                Ok(DownloadOutcome::Unavailable)
            }
        }
    }

    /// Fetch a cached weekly NDVI tile directly.
    pub async fn fetch_ndvi_tile(
        &self,
        weekly_ndvi: &str,
        date_range: &str,
        fips: &str,
        output_dir: &Path,
        progress: &ProgressReporter,
    ) -> Result<DownloadOutcome> {
        let url = ndvi_cache_url(&self.cache_url, weekly_ndvi, date_range, fips);
        let path = output_dir.join(ndvi_file_name(weekly_ndvi, fips, date_range));
        self.download(&url, &path, progress).await
    }

    /// Stream `url` to `path`. Local I/O errors propagate; request errors
    /// become a `Failed` outcome.
    pub async fn download(
        &self,
        url: &str,
        path: &Path,
        progress: &ProgressReporter,
    ) -> Result<DownloadOutcome> {
        let response = match self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => return Ok(DownloadOutcome::from_request_error(e)),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, File::create(path).await?);
        let mut stream = response.bytes_stream();
        let mut bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(writer);
                    let _ = tokio::fs::remove_file(path).await;
                    return Ok(DownloadOutcome::from_request_error(e));
                }
            };
            writer.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
            progress.set_message(&format!("{} bytes", bytes));
        }
        writer.flush().await?;

        info!(
            "Download completed successfully. File saved to {}",
            path.display()
        );
        Ok(DownloadOutcome::Saved {
            path: path.to_path_buf(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned responses, one per accepted connection, in order.
    async fn serve(responses: Vec<(u16, Vec<u8>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                socket.write_all(head.as_bytes()).await.unwrap();
                socket.write_all(&body).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        format!("http://{}", addr)
    }

    fn client(base: &str) -> VegScapeClient {
        VegScapeClient::new(Duration::from_secs(5), false)
            .unwrap()
            .with_base_urls(&format!("{}/VegService/GetFile", base), &format!("{}/cache", base))
    }

    #[test]
    fn test_single_quoted_response() {
        let parsed =
            parse_getfile_response("{'success':'true','url':'https://host/files/ndvi.tif'}").unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.url.as_deref(), Some("https://host/files/ndvi.tif"));

        let failed = parse_getfile_response("{'success':'false'}").unwrap();
        assert!(!failed.is_success());
        assert!(parse_getfile_response("<html>").is_err());
    }

    #[test]
    fn test_cache_url_and_name() {
        assert_eq!(
            ndvi_cache_url(VEGSCAPE_NDVI_CACHE_URL, "weekly_ndvi_28", "2012.07.09_2012.07.15", "19015"),
            "https://nassgeo.csiss.gmu.edu/ndvi_data_cache/byfips/weekly_ndvi_28_2012.07.09_2012.07.15_19015.tif"
        );
        assert_eq!(
            ndvi_file_name("weekly_ndvi_28", "19015", "2012.07.09_2012.07.15"),
            "weekly_ndvi_28_19015_2012.07.09_2012.07.15.tif"
        );
    }

    #[tokio::test]
    async fn test_getfile_then_download() {
        let tile = b"II*\0fake-tiff".to_vec();
        let file_base = serve(vec![(200, tile.clone())]).await;
        let getfile = serve(vec![(
            200,
            format!("{{'success':'true','url':'{}/files/ndvi_19015.tif'}}", file_base).into_bytes(),
        )])
        .await;

        let temp_dir = TempDir::new().unwrap();
        let outcome = client(&getfile)
            .fetch_getfile("19015", "2012.07.09", temp_dir.path(), &ProgressReporter::silent())
            .await
            .unwrap();

        let path = temp_dir.path().join("ndvi_19015.tif");
        assert_eq!(
            outcome,
            DownloadOutcome::Saved {
                path: path.clone(),
                bytes: tile.len() as u64
            }
        );
        assert_eq!(std::fs::read(path).unwrap(), tile);
    }

    #[tokio::test]
    async fn test_unsuccessful_getfile() {
        let base = serve(vec![(200, b"{'success':'false'}".to_vec())]).await;
        let temp_dir = TempDir::new().unwrap();
        let outcome = client(&base)
            .fetch_getfile("19015", "2012.07.09", temp_dir.path(), &ProgressReporter::silent())
            .await
            .unwrap();
        assert_eq!(outcome, DownloadOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_http_status_is_reported_not_raised() {
        let base = serve(vec![(404, Vec::new())]).await;
        let temp_dir = TempDir::new().unwrap();
        let outcome = client(&base)
            .fetch_ndvi_tile("weekly_ndvi_28", "2012.07.09_2012.07.15", "19015", temp_dir.path(), &ProgressReporter::silent())
            .await
            .unwrap();

        match outcome {
            DownloadOutcome::Failed { kind, .. } => assert_eq!(kind, FailureKind::Status(404)),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!temp_dir
            .path()
            .join("weekly_ndvi_28_19015_2012.07.09_2012.07.15.tif")
            .exists());
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let temp_dir = TempDir::new().unwrap();
        let outcome = client(&format!("http://{}", addr))
            .download(
                &format!("http://{}/x.tif", addr),
                &temp_dir.path().join("x.tif"),
                &ProgressReporter::silent(),
            )
            .await
            .unwrap();
        match outcome {
            DownloadOutcome::Failed { kind, .. } => assert_eq!(kind, FailureKind::Connection),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
