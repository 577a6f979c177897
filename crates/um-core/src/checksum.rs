//! Hex SHA-256 digests used for change detection.

use sha2::{Digest, Sha256};

/// Hex SHA-256 over `lines`, each terminated by `\n`.
///
/// Order matters; callers sort first when it should not.
pub fn checksum_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
