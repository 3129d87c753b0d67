//! Record value encoding.
//!
//! The metadata store persists `FileRecord`s as JSON strings. The encoding
//! is internal to this crate (nothing else reads store values), so it only
//! has to round-trip all record attributes losslessly, not stay stable
//! across versions.

use crate::error::{MetadataError, MetadataResult};
use ember_core::FileRecord;

/// Encode a record for storage.
pub fn encode(record: &FileRecord) -> MetadataResult<String> {
    serde_json::to_string(record).map_err(|e| MetadataError::Serialization(e.to_string()))
}

/// Decode a stored record value.
pub fn decode(value: &str) -> MetadataResult<FileRecord> {
    serde_json::from_str(value).map_err(|e| MetadataError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{FileName, LIFESPAN_UNLIMITED};

    #[test]
    fn roundtrip_preserves_all_fields() {
        let record = FileRecord {
            name: FileName::new("report-2026.pdf").unwrap(),
            original_filename: "Q2 report (final).pdf".to_string(),
            uploaded_at: 1_754_000_000,
            lifespan_secs: 3600,
            remaining_downloads: 5,
            size: 123_456,
        };

        let encoded = encode(&record).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn roundtrip_unlimited_lifespan() {
        let record = FileRecord {
            name: FileName::new("keep").unwrap(),
            original_filename: "keep.bin".to_string(),
            uploaded_at: 0,
            lifespan_secs: LIFESPAN_UNLIMITED,
            remaining_downloads: i64::MAX,
            size: 0,
        };

        let decoded = decode(&encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode("{}").is_err());
    }
}
