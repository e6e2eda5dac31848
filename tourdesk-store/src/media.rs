//! On-disk storage for uploaded profile pictures and package images.
//!
//! Files live under the configured uploads root and are served back by the
//! API at `{public_url}/upload/...`.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_config::UploadConfig;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/svg+xml",
    "image/gif",
    "image/webp",
    "image/avif",
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
];

const PUBLIC_PREFIX: &str = "/upload/";
const PACKAGE_DIR: &str = "package";
const PACKAGE_STEM_CHARS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
    #[error("Media storage failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Profile,
    Package,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_url: String,
    max_profile_bytes: usize,
    max_package_image_bytes: usize,
    max_package_images: usize,
}

impl MediaStore {
    pub fn new(config: &UploadConfig, public_url: &str) -> Self {
        Self {
            root: config.root.clone(),
            public_url: public_url.trim_end_matches('/').to_string(),
            max_profile_bytes: config.max_profile_bytes,
            max_package_image_bytes: config.max_package_image_bytes,
            max_package_images: config.max_package_images,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_package_images(&self) -> usize {
        self.max_package_images
    }

    pub fn limit_for(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Profile => self.max_profile_bytes,
            MediaKind::Package => self.max_package_image_bytes,
        }
    }

    /// Writes an upload to disk and returns its public URL.
    pub async fn save(
        &self,
        kind: MediaKind,
        original_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
            return Err(MediaError::UnsupportedType(content_type));
        }
        let limit = self.limit_for(kind);
        if bytes.len() > limit {
            return Err(MediaError::TooLarge { limit });
        }

        let millis = Utc::now().timestamp_millis();
        let (dir, relative_dir, mut file_name) = match kind {
            MediaKind::Profile => (self.root.clone(), "", profile_file_name(original_name, millis)),
            MediaKind::Package => (
                self.root.join(PACKAGE_DIR),
                "package/",
                package_file_name(original_name, millis),
            ),
        };
        tokio::fs::create_dir_all(&dir).await?;

        if tokio::fs::try_exists(dir.join(&file_name)).await? {
            file_name = format!("{}_{}", Uuid::new_v4().simple(), file_name);
        }
        tokio::fs::write(dir.join(&file_name), bytes).await?;
        debug!(file = %file_name, size = bytes.len(), "Stored upload");

        Ok(format!("{}{}{}{}", self.public_url, PUBLIC_PREFIX, relative_dir, file_name))
    }

    /// Maps a URL previously returned by [`MediaStore::save`] back to a path
    /// under the root. Foreign URLs and traversal attempts yield `None`.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.public_url).unwrap_or(url);
        let relative = rest.strip_prefix(PUBLIC_PREFIX)?;
        let relative = Path::new(relative);
        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Removes a stored file. Missing files and foreign URLs are logged and
    /// otherwise ignored.
    pub async fn delete_url(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        let Some(path) = self.path_for_url(url) else {
            debug!(url, "Not a locally stored upload, skipping delete");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Deleted upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Upload already gone");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete upload"),
        }
    }

    pub async fn delete_all(&self, urls: &[String]) {
        for url in urls {
            self.delete_url(url).await;
        }
    }
}

fn base_name(original: &str) -> &str {
    original.rsplit(['/', '\\']).next().unwrap_or(original)
}

/// `{millis}_{name}` with whitespace runs collapsed and URL-hostile
/// characters replaced by underscores.
fn profile_file_name(original: &str, millis: i64) -> String {
    let collapsed = base_name(original).split_whitespace().collect::<Vec<_>>().join(" ");
    let sanitized: String = collapsed
        .chars()
        .map(|c| if "&/\\#, +()$~%'\":=*?<>{}@-".contains(c) { '_' } else { c })
        .collect();
    let sanitized = if sanitized.is_empty() { "upload".to_string() } else { sanitized };
    format!("{}_{}", millis, sanitized)
}

/// First ten characters of the stem (spaces as underscores), the timestamp,
/// then the original extension.
fn package_file_name(original: &str, millis: i64) -> String {
    let name = base_name(original);
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };
    let stem: String = stem
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '.'))
        .map(|c| if c == ' ' { '_' } else { c })
        .take(PACKAGE_STEM_CHARS)
        .collect();
    let ext: String = ext.chars().filter(|c| c.is_alphanumeric() || *c == '.').collect();
    format!("{}{}{}", stem, millis, ext.to_ascii_lowercase())
}
