//! Random-access byte sources for remote and local files
//!
//! The indexed variant file, its index and the chromosome sizes file are all
//! read through [`ByteSource`], so the tile pipeline never cares whether the
//! bytes come from an HTTP server or the local disk.

use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{Result, TrackError};

pub trait ByteSource: Send + Sync {
    fn url(&self) -> &str;

    /// Read up to `len` bytes starting at `start`. Fewer bytes are returned
    /// when the range runs past the end of the file.
    fn read_range(&self, start: u64, len: u64) -> BoxFuture<'_, Result<Bytes>>;

    fn read_all(&self) -> BoxFuture<'_, Result<Bytes>>;
}

/// Pick an implementation from the URL scheme.
pub fn open_byte_source(url: &str) -> Arc<dyn ByteSource> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Arc::new(HttpFile::new(url))
    } else {
        Arc::new(LocalFile::new(url))
    }
}

/// Fetch a whole text file (chromosome sizes) from a URL or path.
pub async fn read_text(url: &str) -> Result<String> {
    let bytes = open_byte_source(url).read_all().await?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| TrackError::source_unavailable(url, format!("not UTF-8 text: {}", e)))
}

/// File served over HTTP(S), read with `Range` requests.
pub struct HttpFile {
    url: String,
    client: reqwest::Client,
}

impl HttpFile {
    pub fn new(url: &str) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: &str, client: reqwest::Client) -> Self {
        Self {
            url: url.to_string(),
            client,
        }
    }

    fn unavailable<E: std::fmt::Display>(&self, err: E) -> TrackError {
        TrackError::source_unavailable(&self.url, err.to_string())
    }

    async fn fetch_range(&self, start: u64, len: u64) -> Result<Bytes> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={}-{}", start, start + len - 1))
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => response.bytes().await.map_err(|e| self.unavailable(e)),
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(Bytes::new()),
            StatusCode::OK => {
                // Server ignored the range header
                let body = response.bytes().await.map_err(|e| self.unavailable(e))?;
                let from = (start as usize).min(body.len());
                let to = (start.saturating_add(len) as usize).min(body.len());
                Ok(body.slice(from..to))
            }
            status => Err(self.unavailable(format!("HTTP {}", status))),
        }
    }

    async fn fetch_all(&self) -> Result<Bytes> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(e))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("HTTP {}", response.status())));
        }
        response.bytes().await.map_err(|e| self.unavailable(e))
    }
}

impl ByteSource for HttpFile {
    fn url(&self) -> &str {
        &self.url
    }

    fn read_range(&self, start: u64, len: u64) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.fetch_range(start, len))
    }

    fn read_all(&self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.fetch_all())
    }
}

/// File on the local filesystem; accepts plain paths and `file://` URLs.
pub struct LocalFile {
    url: String,
    path: PathBuf,
}

impl LocalFile {
    pub fn new(url: &str) -> Self {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Self {
            url: url.to_string(),
            path: PathBuf::from(path),
        }
    }

    fn unavailable(&self, err: std::io::Error) -> TrackError {
        TrackError::source_unavailable(&self.url, err.to_string())
    }

    async fn read_at(&self, start: u64, len: u64) -> Result<Bytes> {
        let mut file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| self.unavailable(e))?;
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| self.unavailable(e))?;

        let mut buf = Vec::with_capacity(len.min(1 << 24) as usize);
        file.take(len)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| self.unavailable(e))?;
        Ok(Bytes::from(buf))
    }

    async fn read_whole(&self) -> Result<Bytes> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| self.unavailable(e))
    }
}

impl ByteSource for LocalFile {
    fn url(&self) -> &str {
        &self.url
    }

    fn read_range(&self, start: u64, len: u64) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.read_at(start, len))
    }

    fn read_all(&self) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(self.read_whole())
    }
}

/// In-memory file, mostly useful for fixtures and embedding.
pub struct MemoryFile {
    url: String,
    data: Bytes,
}

impl MemoryFile {
    pub fn new<B: Into<Bytes>>(url: &str, data: B) -> Self {
        Self {
            url: url.to_string(),
            data: data.into(),
        }
    }
}

impl ByteSource for MemoryFile {
    fn url(&self) -> &str {
        &self.url
    }

    fn read_range(&self, start: u64, len: u64) -> BoxFuture<'_, Result<Bytes>> {
        let from = (start as usize).min(self.data.len());
        let to = (start.saturating_add(len) as usize).min(self.data.len());
        let slice = self.data.slice(from..to);
        Box::pin(async move { Ok(slice) })
    }

    fn read_all(&self) -> BoxFuture<'_, Result<Bytes>> {
        let data = self.data.clone();
        Box::pin(async move { Ok(data) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_local_file_ranges() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        let source = LocalFile::new(file.path().to_str().unwrap());

        assert_eq!(&source.read_range(2, 3).await.unwrap()[..], b"234");
        assert_eq!(&source.read_range(8, 10).await.unwrap()[..], b"89");
        assert!(source.read_range(20, 4).await.unwrap().is_empty());
        assert_eq!(source.read_all().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_file_url_prefix() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"chr1\t100\n").unwrap();
        let url = format!("file://{}", file.path().display());

        assert_eq!(read_text(&url).await.unwrap(), "chr1\t100\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let err = read_text("/definitely/not/here.sizes").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_memory_file() {
        let source = MemoryFile::new("mem://a", &b"abcdef"[..]);
        assert_eq!(&source.read_range(4, 10).await.unwrap()[..], b"ef");
    }
}
