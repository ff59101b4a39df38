use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token counts shown in the configuration window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub total: u64,
    pub today: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct UsageData {
    #[serde(default)]
    total: u64,
    /// Keyed by `YYYY-MM-DD`.
    #[serde(default)]
    daily: BTreeMap<String, u64>,
}

/// Running token totals, overall and per calendar day, kept in a JSON file.
pub struct UsageLedger {
    path: PathBuf,
    data: UsageData,
}

impl UsageLedger {
    /// Missing files start a fresh ledger; unreadable ones are logged and
    /// replaced on the next save.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "Token usage file {} is corrupt ({}), starting from zero",
                    path.display(),
                    e
                );
                UsageData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => UsageData::default(),
            Err(e) => {
                log::warn!("Failed to read token usage file {}: {}", path.display(), e);
                UsageData::default()
            }
        };
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot_on(Local::now().date_naive())
    }

    pub fn snapshot_on(&self, day: NaiveDate) -> UsageSnapshot {
        UsageSnapshot {
            total: self.data.total,
            today: self.data.daily.get(&day_key(day)).copied().unwrap_or(0),
        }
    }

    /// Add `tokens` to today's bucket and save.
    pub fn record(&mut self, tokens: u64) -> UsageSnapshot {
        self.record_on(Local::now().date_naive(), tokens)
    }

    pub fn record_on(&mut self, day: NaiveDate, tokens: u64) -> UsageSnapshot {
        self.data.total = self.data.total.saturating_add(tokens);
        let today = self.data.daily.entry(day_key(day)).or_insert(0);
        *today = today.saturating_add(tokens);

        if let Err(e) = self.save() {
            log::error!(
                "Failed to save token usage to {}: {}",
                self.path.display(),
                e
            );
        }
        self.snapshot_on(day)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
