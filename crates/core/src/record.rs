//! File records and the safe-name grammar.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifespan sentinel meaning "never expires by time".
pub const LIFESPAN_UNLIMITED: i64 = -1;

/// A validated file name, the unique key for a stored file.
///
/// Names are restricted to `[A-Za-z0-9._-]+`, with no path separators and no
/// control characters, so a name can be joined onto the blob root without
/// any possibility of path traversal. `FileName` is the only key type the
/// blob store accepts, which keeps the check ahead of every filesystem
/// operation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileName(String);

impl FileName {
    /// Create from a string, validating the grammar.
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidName("name cannot be empty".into()));
        }
        // "." and ".." pass the character check but are path components.
        if name == "." || name == ".." {
            return Err(crate::Error::InvalidName(format!(
                "name cannot be a dot path: {name}"
            )));
        }
        for c in name.chars() {
            if !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-') {
                return Err(crate::Error::InvalidName(format!(
                    "invalid character in name: {c:?}"
                )));
            }
        }
        Ok(Self(name))
    }

    /// Get the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileName({self})")
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileName {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}

/// Validate a lifespan value: -1 (unlimited) or at least one second.
pub fn validate_lifespan(lifespan_secs: i64) -> crate::Result<()> {
    if lifespan_secs == LIFESPAN_UNLIMITED || lifespan_secs >= 1 {
        Ok(())
    } else {
        Err(crate::Error::InvalidLifespan(lifespan_secs))
    }
}

/// Validate a download quota: at least one download.
///
/// There is no "infinite" sentinel for quotas; a very large integer plays
/// that role.
pub fn validate_quota(quota: i64) -> crate::Result<()> {
    if quota >= 1 {
        Ok(())
    } else {
        Err(crate::Error::InvalidQuota(quota))
    }
}

/// Metadata record for one uploaded file.
///
/// A record exists in the metadata store iff the corresponding blob exists
/// on disk, except during the narrow window between a quota decrement to
/// zero and the paired delete of both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique key, also the blob file name.
    pub name: FileName,
    /// Client-supplied display name returned to downloaders.
    pub original_filename: String,
    /// Unix timestamp of creation, set once.
    pub uploaded_at: i64,
    /// Seconds until time-based expiry, or -1 for unlimited.
    pub lifespan_secs: i64,
    /// Downloads left before the record is exhausted. Only ever decreases.
    pub remaining_downloads: i64,
    /// Byte count of the stored blob, from the bytes actually written.
    pub size: u64,
}

impl FileRecord {
    /// Unix timestamp at which this record expires by time, if it does.
    pub fn expires_at(&self) -> Option<i64> {
        if self.lifespan_secs == LIFESPAN_UNLIMITED {
            None
        } else {
            Some(self.uploaded_at.saturating_add(self.lifespan_secs))
        }
    }

    /// Whether the record is past its time limit at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at() {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}
