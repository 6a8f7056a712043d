use std::{collections::HashMap, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Summary record from the sermon store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SermonRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub outline: Vec<String>,
    pub date: String,
}

/// Note record from the per-user notes store collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Read-only source of recent sermon metadata.
#[async_trait]
pub trait SermonStore: Send + Sync {
    /// A bounded, recency-ordered page of sermon records.
    async fn recent_sermons(&self, limit: usize) -> Result<Vec<SermonRecord>>;
}

/// Read-only, per-user source of note records.
///
/// Implementations must scope strictly by the supplied user id; a caller
/// can never reach another user's notes through this trait.
#[async_trait]
pub trait NotesStore: Send + Sync {
    /// A bounded page of the given user's most recent notes.
    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<NoteRecord>>;
}

/// Sermon store backed by a JSON file holding an array of records.
#[derive(Debug, Clone)]
pub struct FileSermonStore {
    path: PathBuf,
}

impl FileSermonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SermonStore for FileSermonStore {
    async fn recent_sermons(&self, limit: usize) -> Result<Vec<SermonRecord>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let mut sermons: Vec<SermonRecord> = serde_json::from_str(&raw)?;
        sermons.truncate(limit);
        Ok(sermons)
    }
}

/// Notes store backed by a JSON file mapping user id to an array of notes.
#[derive(Debug, Clone)]
pub struct FileNotesStore {
    path: PathBuf,
}

impl FileNotesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NotesStore for FileNotesStore {
    async fn recent_notes(&self, user_id: &str, limit: usize) -> Result<Vec<NoteRecord>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let mut by_user: HashMap<String, Vec<NoteRecord>> = serde_json::from_str(&raw)?;
        let mut notes = by_user.remove(user_id).unwrap_or_default();
        notes.truncate(limit);
        Ok(notes)
    }
}

/// Sermon store with no sermons; stands in when no backend is configured.
#[derive(Debug, Clone, Default)]
pub struct EmptySermonStore;

#[async_trait]
impl SermonStore for EmptySermonStore {
    async fn recent_sermons(&self, _limit: usize) -> Result<Vec<SermonRecord>> {
        Ok(Vec::new())
    }
}

/// Notes store with no notes; stands in when no backend is configured.
#[derive(Debug, Clone, Default)]
pub struct EmptyNotesStore;

#[async_trait]
impl NotesStore for EmptyNotesStore {
    async fn recent_notes(&self, _user_id: &str, _limit: usize) -> Result<Vec<NoteRecord>> {
        Ok(Vec::new())
    }
}
