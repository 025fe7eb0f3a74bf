use anyhow::{Result, anyhow};
use unicode_normalization::UnicodeNormalization;

/// Longest file name accepted by common filesystems
const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size > max_size {
        return Err(anyhow!(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size,
                max_size,
                max_size / 1024 / 1024
            ),
        }));
    }
    Ok(())
}

/// Sanitizes filename to prevent path traversal and injection attacks.
///
/// The name is NFKD-normalised and reduced to ASCII, so accented letters keep
/// their base letter. Path separators (`/` and `\`) count as whitespace and
/// whitespace runs become `_`, so `../etc/passwd` turns into `etc_passwd`.
/// Anything outside `[A-Za-z0-9._-]` is dropped and leading/trailing `.`/`_`
/// are stripped, so the name can never address a parent or hidden entry.
pub fn sanitize_filename(filename: &str) -> Result<String> {
    if filename.contains(['/', '\\']) || filename.contains("..") {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    let joined = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if matches!(c, '/' | '\\') { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let sanitized: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let mut sanitized = sanitized.trim_matches(['.', '_']).to_string();

    // ASCII only, so any byte offset is a char boundary
    if sanitized.len() > MAX_FILENAME_LEN {
        sanitized.truncate(MAX_FILENAME_LEN);
    }

    if sanitized.is_empty() {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILENAME",
            message: format!("Filename '{}' has no usable characters", filename),
        }));
    }

    Ok(sanitized)
}
