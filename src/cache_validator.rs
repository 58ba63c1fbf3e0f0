//! Checksummed cache values.
//!
//! The moka backend stores every value together with its SHA-256 digest and
//! re-checks it on read. A mismatch reads as a miss and the entry is dropped.

use sha2::{Digest, Sha256};

/// Cached value plus the hex digest it was written with.
#[derive(Debug, Clone)]
pub struct ValidatedCacheEntry {
    /// JSON text of a Steam response, or a raw Steam ID.
    data: String,
    checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = checksum(&data);
        Self { data, checksum }
    }

    pub fn is_valid(&self) -> bool {
        checksum(&self.data) == self.checksum
    }

    /// The stored value, or `None` if it no longer matches its digest.
    pub fn into_data(self) -> Option<String> {
        if self.is_valid() {
            return Some(self.data);
        }

        tracing::warn!(
            "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
            self.checksum,
            self.data.len()
        );
        None
    }

    #[cfg(test)]
    pub(crate) fn corrupt(mut self, data: &str) -> Self {
        self.data = data.to_string();
        self
    }
}

fn checksum(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_valid() {
        let entry = ValidatedCacheEntry::new("76561197960287930".to_string());

        assert!(entry.is_valid());
        assert_eq!(entry.into_data().as_deref(), Some("76561197960287930"));
    }

    #[test]
    fn test_known_digest() {
        let entry = ValidatedCacheEntry::new(String::new());
        assert_eq!(
            entry.checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_tampered_entry_is_rejected() {
        let entry = ValidatedCacheEntry::new(r#"{"gameName":"Team Fortress 2"}"#.to_string())
            .corrupt(r#"{"gameName":"Half-Life 3"}"#);

        assert!(!entry.is_valid());
        assert_eq!(entry.into_data(), None);
    }
}
