//! Numbered token files on disk
//!
//! Each token lives in `token<N>.txt` as:
//!
//! ```text
//! Token: <token>
//! Timestamp: <RFC 3339>
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ReupcastError, Result, StoreError};

const PREFIX: &str = "token";
const SUFFIX: &str = ".txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredToken {
    pub name: String,
    pub number: u64,
    pub saved_at: DateTime<Utc>,
}

pub struct TokenStore {
    dir: PathBuf,
}

/// Number encoded in a `token<N>.txt` file name
fn parse_number(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(PREFIX)?
        .strip_suffix(SUFFIX)?
        .parse()
        .ok()
}

fn file_name_for(number: u64) -> String {
    format!("{}{}{}", PREFIX, number, SUFFIX)
}

/// Split file content into token and timestamp
fn parse_content(file: &str, content: &str) -> std::result::Result<(String, DateTime<Utc>), StoreError> {
    let malformed = |reason: &str| StoreError::Malformed {
        file: file.to_string(),
        reason: reason.to_string(),
    };

    let mut lines = content.lines();
    let token = lines
        .next()
        .and_then(|l| l.strip_prefix("Token: "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| malformed("missing Token line"))?;
    let timestamp = lines
        .next()
        .and_then(|l| l.strip_prefix("Timestamp: "))
        .ok_or_else(|| malformed("missing Timestamp line"))?;
    let saved_at = DateTime::parse_from_rfc3339(timestamp.trim())
        .map_err(|e| malformed(&format!("bad timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok((token.to_string(), saved_at))
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Accepts `token3.txt`, `token3` or `3`
    fn resolve(&self, name: &str) -> Result<(String, PathBuf)> {
        let name = name.trim();
        let number = name
            .parse::<u64>()
            .ok()
            .or_else(|| parse_number(name))
            .or_else(|| name.strip_prefix(PREFIX).and_then(|n| n.parse().ok()))
            .ok_or_else(|| {
                ReupcastError::InvalidInput(format!(
                    "Invalid token name '{}': expected token<N>.txt",
                    name
                ))
            })?;
        let file_name = file_name_for(number);
        let path = self.dir.join(&file_name);
        Ok((file_name, path))
    }

    fn numbers(&self) -> Result<Vec<u64>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e).into()),
        };

        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::Io)?;
            if let Some(number) = entry.file_name().to_str().and_then(parse_number) {
                numbers.push(number);
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// File name the next `save` will use
    pub fn next_name(&self) -> Result<String> {
        let next = match self.numbers()?.last() {
            None => 1,
            Some(n) => n.checked_add(1).ok_or_else(|| {
                ReupcastError::InvalidInput(format!(
                    "No token number left after {}",
                    file_name_for(*n)
                ))
            })?,
        };
        Ok(file_name_for(next))
    }

    /// Persist `token` under the next free number and return the file name
    pub fn save(&self, token: &str) -> Result<String> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ReupcastError::InvalidInput("Token is required".to_string()));
        }

        std::fs::create_dir_all(&self.dir).map_err(StoreError::Io)?;

        let file_name = self.next_name()?;
        let path = self.dir.join(&file_name);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let content = format!("Token: {}\nTimestamp: {}", token, timestamp);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path).map_err(StoreError::Io)?;
        file.write_all(content.as_bytes()).map_err(StoreError::Io)?;

        debug!("Saved token to {}", path.display());
        Ok(file_name)
    }

    /// Stored tokens in numeric order; unreadable files are skipped with a warning
    pub fn list(&self) -> Result<Vec<StoredToken>> {
        let mut tokens = Vec::new();
        for number in self.numbers()? {
            let name = file_name_for(number);
            match self.read(&name, &self.dir.join(&name)) {
                Ok((_, saved_at)) => tokens.push(StoredToken {
                    name,
                    number,
                    saved_at,
                }),
                Err(e) => warn!("Skipping {}: {}", name, e),
            }
        }
        Ok(tokens)
    }

    fn read(&self, file_name: &str, path: &Path) -> std::result::Result<(String, DateTime<Utc>), StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(file_name.to_string()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        parse_content(file_name, &content)
    }

    pub fn load(&self, name: &str) -> Result<SecretString> {
        let (file_name, path) = self.resolve(name)?;
        let (token, _) = self.read(&file_name, &path)?;
        Ok(SecretString::from(token))
    }

    /// Load several tokens, keeping the order given
    pub fn load_all(&self, names: &[String]) -> Result<Vec<SecretString>> {
        names.iter().map(|name| self.load(name)).collect()
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let (file_name, path) = self.resolve(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(file_name).into())
            }
            Err(e) => Err(StoreError::Io(e).into()),
        }
    }
}
