//! Release archive download with an on-disk cache keyed by file name

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::error::{Result, ShimError};

/// Outcome of [`fetch_archive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Archive was already present in the cache
    Cached(PathBuf),
    /// Archive was downloaded in this run
    Downloaded(PathBuf),
}

impl Fetched {
    pub fn path(&self) -> &Path {
        match self {
            Fetched::Cached(p) | Fetched::Downloaded(p) => p,
        }
    }
}

/// HTTP client settings for release downloads
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    inactivity_timeout: Duration,
}

impl Downloader {
    pub fn new(connect_timeout: Duration, inactivity_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("binshim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ShimError::fetch("<client>", e))?;
        Ok(Self {
            client,
            inactivity_timeout,
        })
    }

    /// Download `url` to `dest` unless `dest` already exists.
    ///
    /// Bytes go to `<dest>.part` first; the partial file is removed on any
    /// failure so a broken download never poisons the cache.
    pub async fn fetch_archive(&self, url: &str, dest: &Path) -> Result<Fetched> {
        if tokio::fs::try_exists(dest).await? {
            debug!("Using cached archive {}", dest.display());
            return Ok(Fetched::Cached(dest.to_path_buf()));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(dest);
        match self.stream_to(url, &partial).await {
            Ok(()) => {
                tokio::fs::rename(&partial, dest).await?;
                Ok(Fetched::Downloaded(dest.to_path_buf()))
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<()> {
        info!("Downloading {url}");
        // The inactivity limit also covers the wait for response headers
        let response = match timeout(self.inactivity_timeout, self.client.get(url).send()).await {
            Ok(response) => response.map_err(|e| ShimError::fetch(url, e))?,
            Err(_) => {
                return Err(ShimError::fetch(
                    url,
                    format!("no response within {:?}", self.inactivity_timeout),
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ShimError::fetch(url, format!("HTTP {status}")));
        }

        let total_bytes = response.content_length();
        let progress = progress_bar(total_bytes);

        let mut file = tokio::fs::File::create(path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            // Inactivity, not total duration: large archives on slow links are fine
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => {
                    progress.abandon();
                    return Err(ShimError::fetch(url, e));
                }
                Ok(None) => break,
                Err(_) => {
                    progress.abandon();
                    return Err(ShimError::fetch(
                        url,
                        format!(
                            "no data received for {:?} after {downloaded} bytes",
                            self.inactivity_timeout
                        ),
                    ));
                }
            };

            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.set_position(downloaded);
        }

        file.flush().await?;
        progress.finish_and_clear();

        if let Some(total) = total_bytes
            && downloaded != total
        {
            return Err(ShimError::fetch(
                url,
                format!("truncated body: {downloaded} of {total} bytes"),
            ));
        }
        debug!("Fetched {downloaded} bytes from {url}");
        Ok(())
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::with_template(
                "  {bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})",
            ) {
                bar.set_style(style);
            }
            bar
        }
        None => ProgressBar::new_spinner(),
    }
}
