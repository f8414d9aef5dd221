//! Feed fingerprinting.

use sha2::{Digest, Sha256};

/// Length of the hex fingerprint tag.
pub const FINGERPRINT_LEN: usize = 16;

/// Short content tag for a raw feed body. Diagnostic only, never used for equality.
pub fn fingerprint(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut tag = hex::encode(digest);
    tag.truncate(FINGERPRINT_LEN);
    tag
}
