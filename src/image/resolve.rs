//! Turning image targets into bytes.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;

/// Timeout for fetching a remote image.
pub const REMOTE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Largest remote image body accepted, in bytes.
pub const MAX_REMOTE_BYTES: usize = 20 * 1024 * 1024;

#[cfg(feature = "remote")]
static HTTP_CLIENT: std::sync::LazyLock<Option<reqwest::Client>> = std::sync::LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(REMOTE_TIMEOUT)
        .build()
        .map_err(|e| log::warn!("cannot build HTTP client: {e}"))
        .ok()
});

/// Host callback mapping a local path to bytes.
///
/// `None` means the resource is unavailable; it is never an error.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn load(&self, path: &str) -> Option<Vec<u8>>;
}

/// Loads resources from the filesystem relative to a base directory.
///
/// Paths that resolve outside the base directory, whether absolute, through
/// `..` or through a symlink, are treated as unavailable.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
}

impl FsLoader {
    /// An empty `base_dir` means the current directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = if base_dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            base_dir
        };
        Self { base_dir }
    }
}

#[async_trait]
impl ResourceLoader for FsLoader {
    async fn load(&self, path: &str) -> Option<Vec<u8>> {
        let base = tokio::fs::canonicalize(&self.base_dir).await.ok()?;
        let full = match tokio::fs::canonicalize(self.base_dir.join(path)).await {
            Ok(full) => full,
            Err(e) => {
                log::debug!("cannot resolve {path}: {e}");
                return None;
            }
        };
        if !full.starts_with(&base) {
            log::warn!("refusing to load {path}: outside {}", base.display());
            return None;
        }
        match tokio::fs::read(&full).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("cannot read {}: {e}", full.display());
                None
            }
        }
    }
}

/// Where an image target points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// A `data:` URI.
    Data(&'a str),
    /// An absolute http or https URL.
    Remote(&'a str),
    /// A local path, already unwrapped and percent-decoded.
    Local(String),
}

impl<'a> ImageSource<'a> {
    pub fn classify(target: &'a str) -> Self {
        let target = target.trim();
        let target = target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .unwrap_or(target);

        let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
        if lower.starts_with("data:") {
            ImageSource::Data(target)
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Remote(target)
        } else {
            let path = target.strip_prefix("file://").unwrap_or(target);
            let decoded = percent_decode_str(path)
                .decode_utf8()
                .map(|p| p.into_owned())
                .unwrap_or_else(|_| path.to_string());
            ImageSource::Local(decoded)
        }
    }
}

/// Decode a `data:` URI payload. Base64 and percent-encoded forms are accepted.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.get(5..)?;
    let (meta, payload) = rest.split_once(',')?;
    if meta.to_ascii_lowercase().ends_with(";base64") {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).ok()
    } else {
        Some(percent_decode_str(payload).collect())
    }
}

/// Fetch the bytes behind an image target.
pub async fn load_bytes(target: &str, loader: Option<&dyn ResourceLoader>) -> Option<Vec<u8>> {
    let bytes = match ImageSource::classify(target) {
        ImageSource::Data(uri) => decode_data_uri(uri),
        ImageSource::Remote(url) => fetch_remote(url).await,
        ImageSource::Local(path) => match loader {
            Some(loader) => loader.load(&path).await,
            None => {
                log::debug!("no resource loader for {path}");
                None
            }
        },
    };
    bytes.filter(|b| !b.is_empty())
}

#[cfg(feature = "remote")]
async fn fetch_remote(url: &str) -> Option<Vec<u8>> {
    let client = HTTP_CLIENT.as_ref()?;
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            log::debug!("fetch {url} failed: {e}");
            return None;
        }
    };
    let mut response = response.error_for_status().ok()?;
    if response
        .content_length()
        .is_some_and(|len| len > MAX_REMOTE_BYTES as u64)
    {
        log::debug!("{url} exceeds {MAX_REMOTE_BYTES} bytes");
        return None;
    }

    let mut data = Vec::new();
    while let Some(chunk) = response.chunk().await.ok()? {
        if !within_limit(data.len(), chunk.len()) {
            log::debug!("{url} exceeds {MAX_REMOTE_BYTES} bytes");
            return None;
        }
        data.extend_from_slice(&chunk);
    }
    Some(data)
}

/// Whether `incoming` more bytes still fit the remote body limit.
#[cfg_attr(not(feature = "remote"), allow(dead_code))]
fn within_limit(received: usize, incoming: usize) -> bool {
    received.saturating_add(incoming) <= MAX_REMOTE_BYTES
}

#[cfg(not(feature = "remote"))]
async fn fetch_remote(url: &str) -> Option<Vec<u8>> {
    log::debug!("remote images disabled, skipping {url}");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(ImageSource::classify("data:image/png;base64,AAAA"), ImageSource::Data("data:image/png;base64,AAAA"));
        assert_eq!(ImageSource::classify("HTTPS://x.org/a.png"), ImageSource::Remote("HTTPS://x.org/a.png"));
        assert_eq!(ImageSource::classify("<my file.png>"), ImageSource::Local("my file.png".into()));
        assert_eq!(ImageSource::classify("img/a%20b.png"), ImageSource::Local("img/a b.png".into()));
        assert_eq!(ImageSource::classify("file://pic.gif"), ImageSource::Local("pic.gif".into()));
    }

    #[test]
    fn test_remote_body_limit() {
        assert!(within_limit(0, MAX_REMOTE_BYTES));
        assert!(within_limit(MAX_REMOTE_BYTES - 10, 10));
        assert!(!within_limit(MAX_REMOTE_BYTES - 10, 11));
        assert!(!within_limit(usize::MAX, 1));
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(decode_data_uri("data:image/png;base64,aGVs bG8="), Some(b"hello".to_vec()));
        assert_eq!(decode_data_uri("data:image/svg+xml,%3Csvg%3E"), Some(b"<svg>".to_vec()));
        assert_eq!(decode_data_uri("data:image/png;base64,!!!"), None);
        assert_eq!(decode_data_uri("data:nocomma"), None);
    }

    #[tokio::test]
    async fn test_fs_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"bytes").unwrap();
        let loader = FsLoader::new(dir.path());

        assert_eq!(loader.load("a.png").await, Some(b"bytes".to_vec()));
        assert_eq!(loader.load("missing.png").await, None);
        assert_eq!(load_bytes("a.png", Some(&loader)).await, Some(b"bytes".to_vec()));
        assert_eq!(load_bytes("a.png", None).await, None);
    }

    #[tokio::test]
    async fn test_fs_loader_stays_inside_base() {
        let root = tempfile::tempdir().unwrap();
        let base = root.path().join("docs");
        std::fs::create_dir_all(base.join("img")).unwrap();
        std::fs::write(base.join("img/in.png"), b"inside").unwrap();
        std::fs::write(root.path().join("secret.txt"), b"secret").unwrap();
        let loader = FsLoader::new(&base);

        assert_eq!(loader.load("img/../img/in.png").await, Some(b"inside".to_vec()));
        assert_eq!(loader.load("../secret.txt").await, None);
        let absolute = root.path().join("secret.txt");
        assert_eq!(loader.load(&absolute.to_string_lossy()).await, None);
    }
}
