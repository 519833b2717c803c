use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`; the content hash stored in metadata.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
