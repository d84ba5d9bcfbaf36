use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::facts::SystemFacts;
use crate::models::ConnectionSource;

const DEFAULT_CONFIG_PATH: &str = "/etc/openvpn/server.conf";
const DEFAULT_MANAGEMENT_HOST: &str = "localhost";
const DEFAULT_MANAGEMENT_PORT: u16 = 7505;
const DEFAULT_LOG_CANDIDATES: [&str; 2] = [
    "/var/log/openvpn/openvpn.log",
    "/etc/openvpn/openvpn-status.log",
];

const STATUS_QUERY: &[u8] = b"status\n";
const MAX_STATUS_BYTES: usize = 64 * 1024;

/// OpenVPN status output lists each session once per traffic direction,
/// so raw username matches are halved (floor) to get a session count.
/// This is a textual heuristic over an unstructured blob; if the
/// upstream format ever reports sessions once, the pinned test below is
/// what breaks first.
pub fn sessions_from_matches(matches: usize) -> i64 {
    (matches / 2) as i64
}

/// Counts a user's VPN sessions, preferring a live management-interface
/// query and falling back to the status log.
pub struct OpenVpnCounter {
    facts: Arc<dyn SystemFacts>,
    config_path: PathBuf,
    host: String,
    port: u16,
    log_candidates: Vec<PathBuf>,
    query_timeout: Duration,
}

impl OpenVpnCounter {
    pub fn new(facts: Arc<dyn SystemFacts>) -> Self {
        Self {
            facts,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            host: DEFAULT_MANAGEMENT_HOST.to_string(),
            port: DEFAULT_MANAGEMENT_PORT,
            log_candidates: DEFAULT_LOG_CANDIDATES.iter().map(PathBuf::from).collect(),
            query_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_management(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_log_candidates(mut self, candidates: Vec<PathBuf>) -> Self {
        self.log_candidates = candidates;
        self
    }

    /// Number of VPN sessions for `username`. Never negative on this
    /// surface: a failed live query escalates to the status log, and a
    /// missing log reads as zero sessions.
    pub async fn count(&self, username: &str) -> i64 {
        self.ensure_management_directive().await;

        match self.count_from_manager(username).await {
            Ok(count) => count,
            Err(e) => {
                debug!("live query failed ({}), falling back to status log", e);
                self.count_from_log(username).await
            }
        }
    }

    /// Makes sure the server config exposes a management interface,
    /// inserting the directive as the second line and restarting the
    /// service when it was missing. Re-checked on every call so repeated
    /// invocations never stack duplicate directives; an operator-set
    /// directive with a different address is left alone.
    async fn ensure_management_directive(&self) {
        let contents = match tokio::fs::read_to_string(&self.config_path).await {
            Ok(contents) => contents,
            Err(_) => return,
        };

        if contents
            .lines()
            .any(|line| line.trim_start().starts_with("management "))
        {
            return;
        }

        let directive = format!("management {} {}", self.host, self.port);
        let mut lines: Vec<&str> = contents.lines().collect();
        let insert_at = lines.len().min(1);
        lines.insert(insert_at, &directive);
        let mut updated = lines.join("\n");
        updated.push('\n');

        if let Err(e) = tokio::fs::write(&self.config_path, updated).await {
            warn!(
                "could not enable management interface in {}: {}",
                self.config_path.display(),
                e
            );
            return;
        }

        info!(
            "enabled management interface on {}:{}, restarting openvpn",
            self.host, self.port
        );
        if let Err(e) = self.facts.service_control(&["restart", "openvpn"]).await {
            warn!("openvpn restart failed: {}", e);
        }
    }

    /// Live session count from the management interface. Any connect,
    /// write, read, or timeout failure errors out so the caller can
    /// escalate to the status log instead of misreading it as zero.
    async fn count_from_manager(&self, username: &str) -> Result<i64, String> {
        let addr = format!("{}:{}", self.host, self.port);

        let exchange = async {
            let mut stream = TcpStream::connect(&addr).await?;
            stream.write_all(STATUS_QUERY).await?;

            let mut data = vec![0u8; MAX_STATUS_BYTES];
            let mut filled = 0;
            loop {
                let n = stream.read(&mut data[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
                // The status reply is terminated by an END line; the
                // interface keeps the connection open afterwards.
                if filled == data.len()
                    || data[..filled].ends_with(b"END\n")
                    || data[..filled].ends_with(b"END\r\n")
                {
                    break;
                }
            }
            data.truncate(filled);
            Ok::<_, std::io::Error>(data)
        };

        let data = timeout(self.query_timeout, exchange)
            .await
            .map_err(|_| format!("management query to {} timed out", addr))?
            .map_err(|e| format!("management query to {} failed: {}", addr, e))?;

        let blob = String::from_utf8_lossy(&data);
        let source = ConnectionSource::ManagementSocket {
            host: self.host.clone(),
            port: self.port,
        };
        let sessions = sessions_from_matches(source.raw_matches(&blob, username));

        debug!("{} vpn sessions for {} via {}", sessions, username, source);
        Ok(sessions)
    }

    /// Session count from the first status log candidate that exists.
    /// No log at all reads as zero sessions.
    async fn count_from_log(&self, username: &str) -> i64 {
        let Some(path) = self.log_candidates.iter().find(|p| p.exists()).cloned() else {
            debug!("no status log found, counting zero vpn sessions");
            return 0;
        };

        let blob = match tokio::fs::read_to_string(&path).await {
            Ok(blob) => blob,
            Err(e) => {
                debug!("status log {} unreadable: {}", path.display(), e);
                return 0;
            }
        };

        let source = ConnectionSource::StatusLog { path };
        let sessions = sessions_from_matches(source.raw_matches(&blob, username));

        debug!("{} vpn sessions for {} via {}", sessions, username, source);
        sessions
    }
}
