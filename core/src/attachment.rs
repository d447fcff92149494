//! Attachment Service (C3) — issues opaque handles for uploaded blobs and
//! returns time-limited fetch URLs. The real object-storage primitive is an
//! external collaborator (spec §1); this module only specifies the
//! contract the engine consumes and a local-disk implementation good
//! enough to exercise it in tests and single-box deployments.

use crate::types::AttachmentHandle;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub trait AttachmentStore: Send + Sync {
    /// Persist raw bytes and return an opaque handle. The handle is never
    /// parsed by the engine — only round-tripped.
    fn put(&self, bytes: &[u8], content_type: &str) -> anyhow::Result<AttachmentHandle>;

    /// A time-limited URL a client can use to fetch the blob.
    fn fetch_url(&self, handle: &AttachmentHandle, ttl: Duration) -> anyhow::Result<String>;
}

/// Local-disk reference implementation. Production deployments swap this
/// for the real object-storage client; the trait boundary is the contract.
pub struct LocalDiskAttachmentStore {
    root: PathBuf,
}

impl LocalDiskAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl AttachmentStore for LocalDiskAttachmentStore {
    fn put(&self, bytes: &[u8], content_type: &str) -> anyhow::Result<AttachmentHandle> {
        let ext = match content_type {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            _ => "bin",
        };
        let handle = format!("{}.{ext}", uuid::Uuid::new_v4());
        std::fs::write(self.root.join(&handle), bytes)?;
        Ok(handle)
    }

    fn fetch_url(&self, handle: &AttachmentHandle, ttl: Duration) -> anyhow::Result<String> {
        let expires = chrono::Utc::now() + chrono::Duration::from_std(ttl)?;
        Ok(format!(
            "file://{}?expires={}",
            Path::new(&self.root).join(handle).display(),
            expires.timestamp()
        ))
    }
}
