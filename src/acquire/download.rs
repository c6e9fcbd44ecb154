//! Direct download of a pre-converted model, falling back through a list of
//! mirrors until one delivers a plausibly sized file.

use std::error::Error as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::{parent_dir, require_dir, MIN_DOWNLOAD_BYTES};
use crate::error::AcquireError;
use crate::report;
use crate::stage::{stage_artifact, Staged};
use crate::Result;

#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// Writes the body of `url` to `dest`, returning the bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self { client: builder.build()?, show_progress: true })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, show_progress: true }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) if len > 0 => {
                let bar = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
                ) {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            // Unknown length: count bytes without a bar.
            _ => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec})") {
                    bar.set_style(style);
                }
                bar
            }
        }
    }
}

fn describe(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let fetch_err = |reason: String| AcquireError::Fetch { url: url.to_string(), reason };

        let mut resp = self.client.get(url).send().await.map_err(|e| fetch_err(describe(&e)))?;
        if !resp.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", resp.status())));
        }

        let bar = self.progress_bar(resp.content_length());
        let mut file = fs::File::create(dest).map_err(|e| AcquireError::io(dest, e))?;
        let mut written: u64 = 0;
        while let Some(chunk) = resp.chunk().await.map_err(|e| fetch_err(describe(&e)))? {
            file.write_all(&chunk).map_err(|e| AcquireError::io(dest, e))?;
            written += chunk.len() as u64;
            bar.set_position(written);
        }
        file.flush().map_err(|e| AcquireError::io(dest, e))?;
        bar.finish_and_clear();

        debug!(url, written, "fetch complete");
        Ok(written)
    }
}

/// Where downloads land before they are accepted.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn discard(part: &Path) {
    if part.exists() {
        if let Err(e) = fs::remove_file(part) {
            warn!(path = %part.display(), error = %e, "could not remove partial download");
        }
    }
}

/// Tries each URL in order and stages the first download larger than
/// [`MIN_DOWNLOAD_BYTES`] at `dest`.
///
/// Rejected or failed attempts leave nothing behind; `dest` is only touched
/// once a download has been accepted.
pub async fn acquire_via_download<F: Fetcher>(
    fetcher: &F,
    urls: &[String],
    dest: &Path,
) -> Result<Staged> {
    require_dir(parent_dir(dest))?;

    let part = partial_path(dest);
    for (i, url) in urls.iter().enumerate() {
        report::step(&format!("[{}/{}] trying {url}", i + 1, urls.len()));
        if let Err(e) = fetcher.fetch(url, &part).await {
            warn!(url = %url, error = %e, "download failed");
            report::warn(&format!("failed: {e}"));
            discard(&part);
            continue;
        }

        let size = fs::metadata(&part).map(|m| m.len()).unwrap_or(0);
        if size > MIN_DOWNLOAD_BYTES {
            info!(url = %url, size, "download accepted");
            report::ok(&format!("downloaded {}", report::megabytes(size)));
            let staged = stage_artifact(&part, dest);
            discard(&part);
            return staged;
        }

        report::warn(&format!("file too small ({}), trying next source", report::megabytes(size)));
        discard(&part);
    }

    Err(AcquireError::SourcesExhausted { attempted: urls.len() })
}
