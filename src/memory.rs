//! Per-user memory records and their persistence
//!
//! A record is created on first contact and rewritten once per turn. Decoding is
//! defensive: a missing, unreadable or corrupt record always yields the default
//! record for that user, never a partially filled one.

use crate::divination::DivinationMethod;
use crate::error::StoreError;
use crate::logging;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub const MEMORY_VERSION: u32 = 1;

fn current_version() -> u32 {
    MEMORY_VERSION
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DivinationPreference {
    pub preferred_method: Option<DivinationMethod>,
    pub api_triggered: bool,
    pub count: u64,
    /// Method of the most recent reading, whichever path served it
    pub last_method: Option<DivinationMethod>,
    /// Only consulted under the per-method escalation policy
    pub escalated_methods: Vec<DivinationMethod>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UserMemory {
    #[serde(default = "current_version")]
    pub version: u32,
    pub user_id: String,
    pub name: Option<String>,
    pub name_confirmed: bool,
    pub last_seen: Option<NaiveDate>,
    pub timezone: Option<String>,
    pub timezone_offset: Option<f64>,
    pub close_mode_count: u64,
    pub divination: DivinationPreference,
}

impl Default for UserMemory {
    fn default() -> Self {
        Self {
            version: MEMORY_VERSION,
            user_id: String::new(),
            name: None,
            name_confirmed: false,
            last_seen: None,
            timezone: None,
            timezone_offset: None,
            close_mode_count: 0,
            divination: DivinationPreference::default(),
        }
    }
}

impl UserMemory {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    /// Record a name only when none is on file yet
    pub fn remember_name(&mut self, name: &str) -> bool {
        if self.name.is_some() || name.trim().is_empty() {
            return false;
        }
        self.name = Some(name.trim().to_string());
        self.name_confirmed = false;
        true
    }

    /// Overwrite locale hints with whatever the client supplied this turn
    pub fn update_locale(&mut self, timezone: Option<&str>, offset: Option<f64>) {
        if let Some(tz) = timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
            self.timezone = Some(tz.to_string());
        }
        if let Some(offset) = offset {
            self.timezone_offset = Some(offset);
        }
    }

    pub fn is_first_visit_on(&self, today: NaiveDate) -> bool {
        self.last_seen != Some(today)
    }
}

/// Durable per-user record storage
pub trait MemoryStore: Send + Sync {
    /// Load a record, returning a fresh default when none exists or it cannot be decoded
    fn load(&self, user_id: &str) -> UserMemory;

    fn save(&self, user_id: &str, memory: &UserMemory) -> Result<(), StoreError>;
}

/// Save and log on failure; persistence errors never reach the user.
pub fn save_or_log(store: &dyn MemoryStore, memory: &UserMemory) {
    match store.save(&memory.user_id, memory) {
        Ok(()) => logging::log_memory(Some(&memory.user_id), "Memory saved"),
        Err(e) => logging::log_error(Some(&memory.user_id), &format!("Memory save failed: {}", e)),
    }
}

// ============ File store ============

/// One pretty-printed JSON file per user inside a directory
pub struct FileMemoryStore {
    dir: PathBuf,
}

impl FileMemoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(user_id)))
    }
}

/// Map a user id onto a safe file name
fn file_stem(user_id: &str) -> String {
    let stem: String = user_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "anonymous".to_string()
    } else {
        stem
    }
}

impl MemoryStore for FileMemoryStore {
    fn load(&self, user_id: &str) -> UserMemory {
        let path = self.path_for(user_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return UserMemory::new(user_id),
        };

        match serde_json::from_str::<UserMemory>(&raw) {
            Ok(mut memory) => {
                memory.user_id = user_id.to_string();
                memory
            }
            Err(e) => {
                logging::log_error(Some(user_id), &format!("Corrupt memory record, using defaults: {}", e));
                UserMemory::new(user_id)
            }
        }
    }

    fn save(&self, user_id: &str, memory: &UserMemory) -> Result<(), StoreError> {
        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        let encoded = serde_json::to_string_pretty(memory)?;
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// ============ In-memory store ============

/// Process-local store, used when nothing should touch the disk
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, UserMemory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn load(&self, user_id: &str) -> UserMemory {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserMemory::new(user_id))
    }

    fn save(&self, user_id: &str, memory: &UserMemory) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(user_id.to_string(), memory.clone());
        Ok(())
    }
}
