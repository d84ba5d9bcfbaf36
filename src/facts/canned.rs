use std::sync::Mutex;

use async_trait::async_trait;

use super::SystemFacts;

/// Facts source backed by canned text, for tests and dry runs. Each
/// field holds exactly what the corresponding shell invocation would
/// have printed; `None` behaves like the command being unavailable.
#[derive(Debug, Default)]
pub struct CannedFacts {
    pub processes: Option<String>,
    pub etimes: Option<String>,
    pub account: Option<String>,
    pub service_status: Option<String>,
    service_calls: Mutex<Vec<String>>,
}

impl CannedFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processes(mut self, listing: impl Into<String>) -> Self {
        self.processes = Some(listing.into());
        self
    }

    pub fn with_etimes(mut self, listing: impl Into<String>) -> Self {
        self.etimes = Some(listing.into());
        self
    }

    pub fn with_account(mut self, report: impl Into<String>) -> Self {
        self.account = Some(report.into());
        self
    }

    pub fn with_service_status(mut self, status: impl Into<String>) -> Self {
        self.service_status = Some(status.into());
        self
    }

    /// Every `service_control` invocation so far, args joined by spaces.
    pub fn service_calls(&self) -> Vec<String> {
        self.service_calls.lock().unwrap().clone()
    }
}

fn canned(field: &Option<String>, what: &str) -> Result<String, String> {
    field
        .clone()
        .ok_or_else(|| format!("no canned output for {}", what))
}

#[async_trait]
impl SystemFacts for CannedFacts {
    async fn processes_for_user(&self, _username: &str) -> Result<String, String> {
        canned(&self.processes, "process listing")
    }

    async fn process_etimes(&self, _username: &str) -> Result<String, String> {
        canned(&self.etimes, "process elapsed times")
    }

    async fn account_info(&self, _username: &str) -> Result<String, String> {
        canned(&self.account, "account info")
    }

    async fn service_control(&self, args: &[&str]) -> Result<String, String> {
        self.service_calls.lock().unwrap().push(args.join(" "));

        if args.first() == Some(&"status") {
            return canned(&self.service_status, "service status");
        }
        Ok(String::new())
    }
}
