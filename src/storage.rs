//! Flat JSON documents on disk, one per guild and concern.
//!
//! Every document is guarded by its own async mutex so that read-modify-write
//! sequences coming from different tasks (batch fetches, retry loops, commands)
//! never interleave. Writes land in a sibling temporary file that is renamed
//! over the document, readers never observe a half-written file.

pub mod cache;
pub mod registry;
pub mod retry_queue;

use crate::error::{BotError, BotResult};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::sync::Mutex as DocumentLock;
use tracing::warn;

type Locks = Arc<Mutex<HashMap<PathBuf, Arc<DocumentLock<()>>>>>;

#[derive(Clone)]
pub struct JsonStore {
    root: PathBuf,
    locks: Locks,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> JsonStore {
        JsonStore {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{subdir}/{guild}{suffix}`. Guild ids end up in file names, so
    /// only ASCII alphanumerics, '-' and '_' are accepted.
    pub fn guild_path(&self, subdir: Option<&str>, guild: &str, suffix: &str) -> BotResult<PathBuf> {
        validate_guild(guild)?;
        let dir = match subdir {
            Some(subdir) => self.root.join(subdir),
            None => self.root.clone(),
        };
        Ok(dir.join(format!("{guild}{suffix}")))
    }

    fn lock_for(&self, path: &Path) -> Arc<DocumentLock<()>> {
        // Poisoning only means another thread panicked while inserting,
        // the map itself is still usable.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(DocumentLock::new(())))
            .clone()
    }

    /// Reads a document. Missing, unreadable or corrupt documents read as
    /// the default value.
    pub async fn load<T>(&self, path: &Path) -> T
    where
        T: DeserializeOwned + Default,
    {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;
        read_document(path).await
    }

    /// Locked read-modify-write of a single document. The document is
    /// written back once `modify` returns; write failures are returned.
    /// Dropping the returned future does not abort a write already started.
    pub async fn update<T, R, F>(&self, path: &Path, modify: F) -> BotResult<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        let guard = self.lock_for(path).lock_owned().await;

        let mut document: T = read_document(path).await;
        let result = modify(&mut document);
        let json = serde_json::to_vec_pretty(&document)?;

        // The write runs to completion even if the caller is dropped, and
        // keeps the document locked until it is renamed into place.
        let path = path.to_path_buf();
        tokio::spawn(async move {
            let _guard = guard;
            write_document(&path, json).await
        })
        .await
        .map_err(|e| BotError::Storage(format!("Document write aborted. {e}")))??;
        Ok(result)
    }

    /// Guild ids of the documents named `{guild}{suffix}` in `subdir`.
    pub async fn list_guilds(&self, subdir: Option<&str>, suffix: &str) -> Vec<String> {
        let dir = match subdir {
            Some(subdir) => self.root.join(subdir),
            None => self.root.clone(),
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return vec![],
            Err(e) => {
                warn!("Could not list documents in {}. {e}", dir.display());
                return vec![];
            }
        };

        let mut guilds = vec![];
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if let Some(guild) = name.strip_suffix(suffix) {
                        if validate_guild(guild).is_ok() {
                            guilds.push(guild.to_string());
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not list documents in {}. {e}", dir.display());
                    break;
                }
            }
        }
        guilds.sort();
        guilds
    }
}

pub fn validate_guild(guild: &str) -> BotResult<()> {
    let valid = !guild.is_empty()
        && guild
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    match valid {
        true => Ok(()),
        false => Err(BotError::Storage(format!("Invalid guild id '{guild}'"))),
    }
}

async fn read_document<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!("Could not read {}, using empty document. {e}", path.display());
            return T::default();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!("Corrupt document {}, using empty document. {e}", path.display());
        T::default()
    })
}

async fn write_document(path: &Path, json: Vec<u8>) -> BotResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
