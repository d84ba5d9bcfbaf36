use std::sync::Arc;

use tracing::debug;

use crate::facts::SystemFacts;
use crate::models::ConnectionSource;

/// Command name of the SSH daemon as it appears in process listings.
pub const SSHD_PROCESS: &str = "sshd";

/// Counts a user's live SSH sessions from the OS process table.
pub struct SshCounter {
    facts: Arc<dyn SystemFacts>,
}

impl SshCounter {
    pub fn new(facts: Arc<dyn SystemFacts>) -> Self {
        Self { facts }
    }

    /// Number of SSH sessions owned by `username`. A failed process
    /// listing counts as zero sessions; this query never errors.
    pub async fn count(&self, username: &str) -> i64 {
        let listing = match self.facts.processes_for_user(username).await {
            Ok(listing) => listing,
            Err(e) => {
                debug!("process listing for {} unavailable: {}", username, e);
                return 0;
            }
        };

        let source = ConnectionSource::ProcessList {
            protocol: SSHD_PROCESS.to_string(),
        };
        let count = source.raw_matches(&listing, username) as i64;

        debug!("{} ssh sessions for {} via {}", count, username, source);
        count
    }
}
