//! JSON file storage for stories and learning statistics.
//!
//! Both files are rewritten in full on every save. Writes land in a sibling
//! temp file first and are renamed over the target.

use crate::models::{LearningStats, Story, StoryId};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const STORIES_FILE: &str = "stories.json";
pub const STATS_FILE: &str = "learning_stats.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Stories and stats living side by side in one data directory.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn stories_path(&self) -> PathBuf {
        self.dir.join(STORIES_FILE)
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    // Story operations

    /// All stories in saved order. Unreadable files and malformed entries are skipped.
    pub fn list_stories(&self) -> Vec<Story> {
        let path = self.stories_path();
        let Some(content) = read_optional(&path) else {
            return Vec::new();
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "story file is not a JSON array, treating as empty");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<Story>(value) {
                Ok(story) => Some(story),
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed story record");
                    None
                }
            })
            .collect()
    }

    pub fn get_story(&self, id: StoryId) -> Option<Story> {
        self.list_stories().into_iter().find(|s| s.id == id)
    }

    pub fn insert_story(&self, story: &Story) -> StoreResult<()> {
        let mut stories = self.list_stories();
        stories.push(story.clone());
        write_json(&self.stories_path(), &stories)?;
        debug!(id = %story.id, title = %story.title, "story saved");
        Ok(())
    }

    /// Remove a story. Returns `false` when no story had that id.
    pub fn delete_story(&self, id: StoryId) -> StoreResult<bool> {
        let mut stories = self.list_stories();
        let before = stories.len();
        stories.retain(|s| s.id != id);
        if stories.len() == before {
            return Ok(false);
        }
        write_json(&self.stories_path(), &stories)?;
        Ok(true)
    }

    /// Replace one page's text. Returns `false` when the story or page does not exist.
    pub fn update_page(&self, id: StoryId, index: usize, en: &str, ko: &str) -> StoreResult<bool> {
        let mut stories = self.list_stories();
        let Some(page) = stories
            .iter_mut()
            .find(|s| s.id == id)
            .and_then(|s| s.pages.get_mut(index))
        else {
            return Ok(false);
        };
        page.en = en.to_string();
        page.ko = ko.to_string();
        write_json(&self.stories_path(), &stories)?;
        Ok(true)
    }

    // Statistics

    /// Load statistics, falling back to zeroed defaults when missing or unreadable.
    ///
    /// Fields are read one at a time and list entries one entry at a time, so
    /// a single malformed record only drops that record.
    pub fn load_stats(&self) -> LearningStats {
        let path = self.stats_path();
        let Some(content) = read_optional(&path) else {
            return LearningStats::default();
        };
        let mut map = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %path.display(), "stats file is not a JSON object, using defaults");
                return LearningStats::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "stats file unreadable, using defaults");
                return LearningStats::default();
            }
        };

        let completions = map
            .remove("completed_items")
            .or_else(|| map.remove("completed_stories"));
        let mut stats = LearningStats {
            total_pages_read: stats_field(&mut map, "total_pages_read"),
            total_speaking_practice: stats_field(&mut map, "total_speaking_practice"),
            total_quiz_attempts: stats_field(&mut map, "total_quiz_attempts"),
            total_quiz_correct: stats_field(&mut map, "total_quiz_correct"),
            completed_items: stats_entries(completions, "completed_items"),
            last_study_date: stats_field(&mut map, "last_study_date"),
            study_streak: stats_field(&mut map, "study_streak"),
            study_dates: stats_entries::<NaiveDate>(map.remove("study_dates"), "study_dates")
                .into_iter()
                .collect(),
        };
        stats.dedup_completions();
        stats
    }

    pub fn save_stats(&self, stats: &LearningStats) -> StoreResult<()> {
        write_json(&self.stats_path(), stats)
    }
}

fn stats_field<T: DeserializeOwned + Default>(map: &mut Map<String, Value>, key: &str) -> T {
    match map.remove(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            warn!(field = key, error = %err, "malformed stats field, using default");
            T::default()
        }),
    }
}

fn stats_entries<T: DeserializeOwned>(value: Option<Value>, key: &str) -> Vec<T> {
    let entries = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            warn!(field = key, "stats field is not a list, using default");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(field = key, index, error = %err, "skipping malformed stats entry");
                None
            }
        })
        .collect()
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read data file");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
