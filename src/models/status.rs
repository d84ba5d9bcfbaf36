use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Wire format for expiration dates, kept compatible with existing
/// consumers of the `/check` endpoint.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Snapshot of a user's session and account state. Built fresh per
/// request, never cached.
///
/// `-1` in `limit_connection` or `expiration_days` means "could not be
/// determined", which callers must not conflate with a real zero.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserStatus {
    pub username: String,
    pub count_connection: i64,
    pub limit_connection: i64,
    #[serde(serialize_with = "serialize_date")]
    pub expiration_date: Option<NaiveDate>,
    pub expiration_days: i64,
    pub time_online: Option<String>,
}

fn serialize_date<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "username: {}", self.username)?;
        writeln!(f, "count_connection: {}", self.count_connection)?;
        writeln!(f, "limit_connection: {}", self.limit_connection)?;
        match self.expiration_date {
            Some(date) => writeln!(f, "expiration_date: {}", date.format(DATE_FORMAT))?,
            None => writeln!(f, "expiration_date: never")?,
        }
        writeln!(f, "expiration_days: {}", self.expiration_days)?;
        match &self.time_online {
            Some(time) => write!(f, "time_online: {}", time),
            None => write!(f, "time_online: none"),
        }
    }
}

/// Where a raw connection count came from. Sources share no state; each
/// one turns a text blob into a match count for a username.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSource {
    ManagementSocket { host: String, port: u16 },
    StatusLog { path: PathBuf },
    ProcessList { protocol: String },
}

impl ConnectionSource {
    /// Raw matches for `username` within `blob`.
    ///
    /// Process listings are already filtered to one user, so there the
    /// match is a line mentioning the protocol's daemon; the other
    /// sources count plain substring occurrences of the username.
    pub fn raw_matches(&self, blob: &str, username: &str) -> usize {
        match self {
            ConnectionSource::ProcessList { protocol } => blob
                .lines()
                .filter(|line| line.contains(protocol.as_str()))
                .count(),
            ConnectionSource::ManagementSocket { .. } | ConnectionSource::StatusLog { .. } => {
                blob.matches(username).count()
            }
        }
    }
}

impl fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionSource::ManagementSocket { host, port } => {
                write!(f, "management socket {}:{}", host, port)
            }
            ConnectionSource::StatusLog { path } => write!(f, "status log {}", path.display()),
            ConnectionSource::ProcessList { protocol } => {
                write!(f, "process list ({})", protocol)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_serializes_as_dd_mm_yyyy() {
        let status = UserStatus {
            username: "alice".to_string(),
            count_connection: 2,
            limit_connection: 3,
            expiration_date: NaiveDate::from_ymd_opt(2026, 9, 9),
            expiration_days: 10,
            time_online: Some("01:23".to_string()),
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["expiration_date"], "09/09/2026");
        assert_eq!(value["count_connection"], 2);
    }

    #[test]
    fn test_missing_date_serializes_as_null() {
        let status = UserStatus {
            username: "bob".to_string(),
            count_connection: 0,
            limit_connection: -1,
            expiration_date: None,
            expiration_days: -1,
            time_online: None,
        };

        let value = serde_json::to_value(&status).unwrap();
        assert!(value["expiration_date"].is_null());
        assert_eq!(value["expiration_days"], -1);
    }

    #[test]
    fn test_process_list_counts_matching_lines() {
        let source = ConnectionSource::ProcessList {
            protocol: "sshd".to_string(),
        };
        let listing = "  PID TTY          TIME CMD\n 1201 ?        00:00:00 sshd\n 1202 pts/0    00:00:00 bash\n 1307 ?        00:00:01 sshd\n";

        assert_eq!(source.raw_matches(listing, "alice"), 2);
    }

    #[test]
    fn test_status_log_counts_substring_occurrences() {
        let source = ConnectionSource::StatusLog {
            path: PathBuf::from("/tmp/openvpn-status.log"),
        };
        let blob = "alice,10.8.0.2:1194\nbob,10.8.0.3:1194\nalice,10.8.0.2\n";

        assert_eq!(source.raw_matches(blob, "alice"), 2);
        assert_eq!(source.raw_matches(blob, "carol"), 0);
    }
}
