//! Utility functions for the services.

mod crypto;
mod files;

pub use crypto::{generate_insecure_token, hash_password, md5_hex, MD5_TAG};
pub use files::{log_to_file, read_file, run_shell, save_upload, ShellOutput};
