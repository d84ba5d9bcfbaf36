use std::path::PathBuf;

use tracing::debug;

/// Default location of the flat connection-limit file.
pub const DEFAULT_LIMITS_PATH: &str = "/root/usuarios.db";

/// Looks up per-user connection caps in a flat `username limit` file.
/// The file is tiny and mutated out-of-band, so every lookup is a fresh
/// linear scan with no caching.
pub struct LimitStore {
    path: PathBuf,
}

impl LimitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Connection cap for `username`, or `-1` when the file is missing,
    /// no line matches, or the first matching line is malformed.
    pub async fn limit(&self, username: &str) -> i64 {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) => {
                debug!("limit file {} unavailable: {}", self.path.display(), e);
                return -1;
            }
        };

        for line in contents.lines() {
            let mut fields = line.split_whitespace();
            if let (Some(user), Some(limit), None) = (fields.next(), fields.next(), fields.next())
            {
                if user == username {
                    return limit.parse().unwrap_or(-1);
                }
            }
        }

        -1
    }
}
