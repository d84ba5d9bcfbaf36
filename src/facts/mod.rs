// System facts seam: everything the checker learns by shelling out goes
// through this trait, so tests can substitute canned text.

pub mod canned;
pub mod shell;

pub use canned::CannedFacts;
pub use shell::ShellFacts;

use async_trait::async_trait;

#[async_trait]
pub trait SystemFacts: Send + Sync {
    /// Process listing for a user, one process per line (`ps -u <user>`).
    async fn processes_for_user(&self, username: &str) -> Result<String, String>;

    /// Elapsed-time column for the user's processes
    /// (`ps -u <user> -o etime --no-headers`).
    async fn process_etimes(&self, username: &str) -> Result<String, String>;

    /// Account aging report for a user (`chage -l <user>`),
    /// line-oriented `field: value` output.
    async fn account_info(&self, username: &str) -> Result<String, String>;

    /// Run a service-control action (`systemctl <args>`) and return the
    /// combined output.
    async fn service_control(&self, args: &[&str]) -> Result<String, String>;
}
