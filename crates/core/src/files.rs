use std::path::Path;

use tokio::fs;

/// Size of `path` if it is a regular file with at least one byte.
pub async fn non_empty_len(path: &Path) -> Option<u64> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}
