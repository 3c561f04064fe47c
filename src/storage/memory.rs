//! In-process storage. Each owner keeps a dense roster plus an identity index,
//! updated on every save/remove, so random picks never scan.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::io;
use tokio::sync::Mutex;

use super::{owner_dir, Page, Storage, StorageError};

#[derive(Debug, Default)]
struct Collection {
    roster: Vec<(String, Page)>,
    index: HashMap<String, usize>,
}

impl Collection {
    fn insert(&mut self, identity: String, page: Page) {
        match self.index.get(&identity) {
            Some(&pos) => self.roster[pos].1 = page,
            None => {
                self.index.insert(identity.clone(), self.roster.len());
                self.roster.push((identity, page));
            }
        }
    }

    fn remove(&mut self, identity: &str) -> bool {
        let Some(pos) = self.index.remove(identity) else {
            return false;
        };
        self.roster.swap_remove(pos);
        if let Some((moved, _)) = self.roster.get(pos) {
            self.index.insert(moved.clone(), pos);
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    owners: Mutex<HashMap<String, Collection>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages currently held for `owner`.
    pub async fn len(&self, owner: &str) -> usize {
        self.owners
            .lock()
            .await
            .get(owner)
            .map(|c| c.roster.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, page: &Page) -> Result<(), StorageError> {
        owner_dir(&page.user_name)?;
        let identity = page.hash()?;
        self.owners
            .lock()
            .await
            .entry(page.user_name.clone())
            .or_default()
            .insert(identity, page.clone());
        Ok(())
    }

    async fn pick_random(&self, user_name: &str) -> Result<Page, StorageError> {
        owner_dir(user_name)?;
        let owners = self.owners.lock().await;
        let roster = match owners.get(user_name) {
            Some(c) if !c.roster.is_empty() => &c.roster,
            _ => return Err(StorageError::NoSavedPages),
        };
        let n = rand::rng().random_range(0..roster.len());
        Ok(roster[n].1.clone())
    }

    async fn remove(&self, page: &Page, user_name: &str) -> Result<(), StorageError> {
        owner_dir(user_name)?;
        let identity = page.hash()?;
        let removed = self
            .owners
            .lock()
            .await
            .get_mut(user_name)
            .is_some_and(|c| c.remove(&identity));
        if !removed {
            return Err(StorageError::NotFound {
                context: format!("can't remove page {identity}"),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }

    async fn is_exists(&self, page: &Page, user_name: &str) -> Result<bool, StorageError> {
        owner_dir(user_name)?;
        let identity = page.hash()?;
        Ok(self
            .owners
            .lock()
            .await
            .get(user_name)
            .is_some_and(|c| c.index.contains_key(&identity)))
    }
}
