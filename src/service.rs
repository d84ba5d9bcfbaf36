use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::facts::SystemFacts;

pub const UNIT_NAME: &str = "user-check.service";
const UNIT_DIR: &str = "/etc/systemd/system";

/// Manages the systemd unit that keeps the HTTP listener running in the
/// background. All systemctl invocations go through `SystemFacts`.
pub struct ServiceManager {
    facts: Arc<dyn SystemFacts>,
    unit_dir: PathBuf,
}

impl ServiceManager {
    pub fn new(facts: Arc<dyn SystemFacts>) -> Self {
        Self {
            facts,
            unit_dir: PathBuf::from(UNIT_DIR),
        }
    }

    pub fn with_unit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unit_dir = dir.into();
        self
    }

    fn unit_path(&self) -> PathBuf {
        self.unit_dir.join(UNIT_NAME)
    }

    fn unit_template(executable: &Path) -> String {
        format!(
            "[Unit]\n\
             Description=User check service\n\
             After=network.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={} --run\n\
             Restart=always\n\
             User=root\n\
             Group=root\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            executable.display()
        )
    }

    /// Writes the unit file pointing at the current executable and
    /// reloads systemd. Already-installed units are left untouched.
    pub async fn install(&self) -> Result<(), String> {
        let unit_path = self.unit_path();
        if unit_path.exists() {
            return Ok(());
        }

        let executable = std::env::current_exe()
            .map_err(|e| format!("Failed to resolve current executable: {}", e))?;

        fs::create_dir_all(&self.unit_dir)
            .map_err(|e| format!("Failed to create '{}': {}", self.unit_dir.display(), e))?;
        fs::write(&unit_path, Self::unit_template(&executable))
            .map_err(|e| format!("Failed to write '{}': {}", unit_path.display(), e))?;

        self.facts.service_control(&["daemon-reload"]).await?;
        info!("installed systemd unit {}", unit_path.display());
        Ok(())
    }

    pub async fn status(&self) -> Result<String, String> {
        self.facts.service_control(&["status", UNIT_NAME]).await
    }

    /// Starts the service unless it is already active. Returns whether a
    /// start was actually issued.
    pub async fn start(&self) -> Result<bool, String> {
        self.install().await?;

        let status = self.status().await?;
        if status.contains("Active: active") {
            info!("service is already running");
            return Ok(false);
        }

        self.facts.service_control(&["start", UNIT_NAME]).await?;
        Ok(true)
    }

    /// Stops the service unless it is already inactive. Returns whether
    /// a stop was actually issued.
    pub async fn stop(&self) -> Result<bool, String> {
        let status = self.status().await?;
        if status.contains("Active: inactive") {
            info!("service is already stopped");
            return Ok(false);
        }

        self.facts.service_control(&["stop", UNIT_NAME]).await?;
        Ok(true)
    }

    pub async fn restart(&self) -> Result<(), String> {
        self.facts.service_control(&["restart", UNIT_NAME]).await?;
        Ok(())
    }

    /// Stops, disables, and deletes the unit, then reloads systemd.
    pub async fn remove(&self) -> Result<(), String> {
        self.facts.service_control(&["stop", UNIT_NAME]).await?;
        self.facts.service_control(&["disable", UNIT_NAME]).await?;

        let unit_path = self.unit_path();
        if unit_path.exists() {
            fs::remove_file(&unit_path)
                .map_err(|e| format!("Failed to remove '{}': {}", unit_path.display(), e))?;
        }

        self.facts.service_control(&["daemon-reload"]).await?;
        info!("removed systemd unit {}", unit_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::CannedFacts;

    #[test]
    fn test_unit_template_runs_the_server() {
        let unit = ServiceManager::unit_template(Path::new("/usr/bin/checker"));

        assert!(unit.contains("ExecStart=/usr/bin/checker --run"));
        assert!(unit.contains("Restart=always"));
        assert!(unit.contains("WantedBy=multi-user.target"));
    }

    #[tokio::test]
    async fn test_start_skipped_when_already_active() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(UNIT_NAME), "[Unit]\n").unwrap();

        let facts = Arc::new(
            CannedFacts::new().with_service_status("   Active: active (running)\n"),
        );
        let service = ServiceManager::new(facts.clone()).with_unit_dir(dir.path());

        assert!(!service.start().await.unwrap());
        assert_eq!(facts.service_calls(), vec![format!("status {}", UNIT_NAME)]);
    }

    #[tokio::test]
    async fn test_start_issued_when_inactive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(UNIT_NAME), "[Unit]\n").unwrap();

        let facts = Arc::new(
            CannedFacts::new().with_service_status("   Active: inactive (dead)\n"),
        );
        let service = ServiceManager::new(facts.clone()).with_unit_dir(dir.path());

        assert!(service.start().await.unwrap());
        assert_eq!(
            facts.service_calls(),
            vec![
                format!("status {}", UNIT_NAME),
                format!("start {}", UNIT_NAME)
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_deletes_unit_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let unit = dir.path().join(UNIT_NAME);
        std::fs::write(&unit, "[Unit]\n").unwrap();

        let facts = Arc::new(CannedFacts::new());
        let service = ServiceManager::new(facts.clone()).with_unit_dir(dir.path());

        service.remove().await.unwrap();

        assert!(!unit.exists());
        assert_eq!(
            facts.service_calls(),
            vec![
                format!("stop {}", UNIT_NAME),
                format!("disable {}", UNIT_NAME),
                "daemon-reload".to_string()
            ]
        );
    }
}
