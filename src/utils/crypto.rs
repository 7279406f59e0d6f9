//! Password hashing and token generation.
//!
//! Everything here is unsalted MD5. It is weak on purpose.

use md5::{Digest, Md5};

use crate::config::JWT_SECRET;

/// Algorithm prefix of tagged password hashes
pub const MD5_TAG: &str = "md5:";

/// Hex-encoded MD5 digest of `input`
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Tagged password hash, e.g. `md5:482c811d...`
pub fn hash_password(password: &str) -> String {
    format!("{}{}", MD5_TAG, md5_hex(password))
}

/// Session token derived from the username and the hard-coded secret
pub fn generate_insecure_token(username: &str) -> String {
    md5_hex(&format!("{}{}", username, JWT_SECRET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_vector() {
        assert_eq!(md5_hex("password123"), "482c811da5d5b4bc6d497ffa98491e38");
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_hash_password_is_tagged_and_deterministic() {
        let first = hash_password("password123");
        let second = hash_password("password123");

        assert_eq!(first, second);
        assert_eq!(first, "md5:482c811da5d5b4bc6d497ffa98491e38");
        assert_ne!(first, "password123");
    }

    #[test]
    fn test_token_depends_on_username() {
        assert_eq!(generate_insecure_token("alice"), generate_insecure_token("alice"));
        assert_ne!(generate_insecure_token("alice"), generate_insecure_token("bob"));
        assert_eq!(generate_insecure_token("alice").len(), 32);
    }
}
