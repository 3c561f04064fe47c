//! File-backed storage: `<base>/<owner>/<identity>` with a JSON body per page.

use async_trait::async_trait;
use metrics::counter;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{is_identity, owner_dir, Page, Storage, StorageError};

#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn page_path(&self, page: &Page, owner: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_path.join(owner_dir(owner)?).join(page.hash()?))
    }

    async fn decode_page(&self, path: &Path) -> Result<Page, StorageError> {
        let context = || format!("can't decode page {}", path.display());
        let raw = fs::read(path)
            .await
            .map_err(|e| StorageError::io(context(), e))?;
        serde_json::from_slice(&raw).map_err(|source| StorageError::Codec {
            context: context(),
            source,
        })
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save(&self, page: &Page) -> Result<(), StorageError> {
        const CTX: &str = "can't save page";

        let dir = self.base_path.join(owner_dir(&page.user_name)?);
        let identity = page.hash()?;

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::raw_io(CTX, e))?;
        let body = serde_json::to_vec(page).map_err(|source| StorageError::Codec {
            context: CTX.to_string(),
            source,
        })?;

        // Write aside and rename so a crash never leaves a truncated page behind.
        let tmp = dir.join(format!("{identity}.tmp"));
        fs::write(&tmp, &body)
            .await
            .map_err(|e| StorageError::raw_io(CTX, e))?;
        if let Err(e) = fs::rename(&tmp, dir.join(&identity)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::raw_io(CTX, e));
        }

        counter!("storage_pages_saved_total").increment(1);
        tracing::debug!(target: "storage", user = %page.user_name, %identity, "page saved");
        Ok(())
    }

    async fn pick_random(&self, user_name: &str) -> Result<Page, StorageError> {
        const CTX: &str = "can't pick random page";

        let dir = self.base_path.join(owner_dir(user_name)?);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NoSavedPages),
            Err(e) => return Err(StorageError::io(CTX, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(CTX, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if is_identity(name) {
                    names.push(name.to_string());
                }
            }
        }

        if names.is_empty() {
            return Err(StorageError::NoSavedPages);
        }

        let n = rand::rng().random_range(0..names.len());
        self.decode_page(&dir.join(&names[n])).await
    }

    async fn remove(&self, page: &Page, user_name: &str) -> Result<(), StorageError> {
        let path = self.page_path(page, user_name)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(format!("can't remove file {}", path.display()), e))?;

        counter!("storage_pages_removed_total").increment(1);
        tracing::debug!(target: "storage", user = %user_name, path = %path.display(), "page removed");
        Ok(())
    }

    async fn is_exists(&self, page: &Page, user_name: &str) -> Result<bool, StorageError> {
        let path = self.page_path(page, user_name)?;
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(
                format!("can't check if file {} exists", path.display()),
                e,
            )),
        }
    }
}
