//! Round-robin API key pool persisted to a flat text file.
//!
//! The file keeps the last used position on its first line so that rotation
//! survives restarts:
//!
//! ```text
//! # cursor: 1
//! AIza-first-key
//! AIza-second-key
//! ```
//!
//! `# cursor: none` (or a file without a header) means no key has been handed
//! out yet. Other `#` lines and blank lines are ignored.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const CURSOR_HEADER: &str = "# cursor:";
const CURSOR_NONE: &str = "none";

/// An opaque API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self)
    }
}

/// Keys of this length or shorter are printed without any characters.
const REDACT_BELOW: usize = 8;
const VISIBLE_TAIL: usize = 4;

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.0.chars().count();
        if len <= REDACT_BELOW {
            return f.write_str("…");
        }
        let tail: String = self.0.chars().skip(len - VISIBLE_TAIL).collect();
        write!(f, "…{tail}")
    }
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: Vec<Credential>,
    /// `None` until the first rotation.
    cursor: Option<usize>,
}

impl CredentialStore {
    /// Load the pool from `path`.
    ///
    /// A stored cursor that no longer fits the list (keys were removed by
    /// hand) is treated as "nothing used yet".
    pub fn initialize(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!(
                "API key file '{}' could not be read: {}",
                path.display(),
                e
            ))
        })?;

        let (cursor, credentials) = parse(&content);
        if credentials.is_empty() {
            return Err(Error::Configuration(format!(
                "API key file '{}' contains no API keys",
                path.display()
            )));
        }

        let cursor = match cursor {
            Some(index) if index >= credentials.len() => {
                log::warn!(
                    "Stored key cursor {} is out of range for {} keys, starting from the first key",
                    index,
                    credentials.len()
                );
                None
            }
            other => other,
        };

        log::info!(
            "Loaded {} API key(s) from {}",
            credentials.len(),
            path.display()
        );

        Ok(Self {
            path,
            credentials,
            cursor,
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The key most recently handed out, or the first key if none was.
    pub fn current(&self) -> &Credential {
        &self.credentials[self.cursor.unwrap_or(0)]
    }

    /// Advance to the next key and persist the new position before
    /// returning it.
    ///
    /// A failed write is logged and the in-memory rotation stands; the next
    /// restart resumes from the last position that did reach the disk.
    pub fn rotate(&mut self) -> Credential {
        let next = next_index(self.cursor, self.credentials.len());
        self.cursor = Some(next);

        if let Err(e) = self.persist() {
            log::error!(
                "Failed to persist key cursor to {}: {}",
                self.path.display(),
                e
            );
        }

        let credential = self.credentials[next].clone();
        log::info!(
            "Using API key {}/{} ({})",
            next + 1,
            self.credentials.len(),
            credential
        );
        credential
    }

    fn persist(&self) -> std::io::Result<()> {
        let content = render(self.cursor, &self.credentials);
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)
    }
}

fn next_index(cursor: Option<usize>, len: usize) -> usize {
    match cursor {
        Some(index) => (index + 1) % len,
        None => 0,
    }
}

fn parse(content: &str) -> (Option<usize>, Vec<Credential>) {
    // Notepad saves with a byte order mark.
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut lines = content.lines().peekable();

    let cursor = match lines.peek().and_then(|line| parse_header(line)) {
        Some(cursor) => {
            lines.next();
            cursor
        }
        None => None,
    };

    let credentials = lines
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Credential::new)
        .collect();

    (cursor, credentials)
}

/// `Some(cursor)` when `line` is a cursor header. An unreadable value counts
/// as the sentinel.
fn parse_header(line: &str) -> Option<Option<usize>> {
    let value = line.trim().strip_prefix(CURSOR_HEADER)?.trim();
    if value.eq_ignore_ascii_case(CURSOR_NONE) {
        return Some(None);
    }
    Some(value.parse().ok())
}

fn render(cursor: Option<usize>, credentials: &[Credential]) -> String {
    let mut out = match cursor {
        Some(index) => format!("{CURSOR_HEADER} {index}\n"),
        None => format!("{CURSOR_HEADER} {CURSOR_NONE}\n"),
    };
    for credential in credentials {
        out.push_str(credential.expose());
        out.push('\n');
    }
    out
}
