// Connection accounting and account-status aggregation.

pub mod expiry;
pub mod limits;
pub mod openvpn;
pub mod ssh;

pub use expiry::ExpiryInspector;
pub use limits::{LimitStore, DEFAULT_LIMITS_PATH};
pub use openvpn::{sessions_from_matches, OpenVpnCounter};
pub use ssh::SshCounter;

use std::sync::Arc;

use tracing::debug;

use crate::facts::SystemFacts;
use crate::models::UserStatus;

/// Merges the individual counters and inspectors into one best-effort
/// status record per username.
pub struct UserChecker {
    ssh: SshCounter,
    openvpn: OpenVpnCounter,
    expiry: ExpiryInspector,
    limits: LimitStore,
}

impl UserChecker {
    pub fn new(facts: Arc<dyn SystemFacts>) -> Self {
        Self {
            ssh: SshCounter::new(facts.clone()),
            openvpn: OpenVpnCounter::new(facts.clone()),
            expiry: ExpiryInspector::new(facts),
            limits: LimitStore::new(DEFAULT_LIMITS_PATH),
        }
    }

    pub fn with_openvpn(mut self, openvpn: OpenVpnCounter) -> Self {
        self.openvpn = openvpn;
        self
    }

    pub fn with_limits(mut self, limits: LimitStore) -> Self {
        self.limits = limits;
        self
    }

    /// Builds the status record for one user. Every sub-query degrades
    /// to a sentinel or absent field on its own; the error arm is only
    /// for failures the aggregation itself cannot absorb.
    ///
    /// The five queries are independent and order-insensitive.
    pub async fn check(&self, username: &str) -> Result<UserStatus, String> {
        let ssh_count = self.ssh.count(username).await;
        let vpn_count = self.openvpn.count(username).await;
        let expiration_date = self.expiry.expiration_date(username).await;
        let expiration_days = self.expiry.expiration_days(expiration_date);
        let limit_connection = self.limits.limit(username).await;
        let time_online = self.expiry.time_online(username).await;

        // The VPN counter folds its could-not-determine sentinel into
        // the log fallback, so this clamp only guards the invariant that
        // the combined count is never negative.
        let count_connection = ssh_count + vpn_count.max(0);

        debug!(
            "status for {}: {} connections ({} ssh, {} vpn), limit {}",
            username, count_connection, ssh_count, vpn_count, limit_connection
        );

        Ok(UserStatus {
            username: username.to_string(),
            count_connection,
            limit_connection,
            expiration_date,
            expiration_days,
            time_online,
        })
    }
}
