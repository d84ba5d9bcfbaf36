use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::SystemFacts;

/// Production facts source: shells out to the usual system utilities.
#[derive(Debug, Clone, Default)]
pub struct ShellFacts;

impl ShellFacts {
    async fn run(program: &str, args: &[&str]) -> Result<String, String> {
        debug!("running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {}", program, e))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SystemFacts for ShellFacts {
    async fn processes_for_user(&self, username: &str) -> Result<String, String> {
        Self::run("ps", &["-u", username]).await
    }

    async fn process_etimes(&self, username: &str) -> Result<String, String> {
        Self::run("ps", &["-u", username, "-o", "etime", "--no-headers"]).await
    }

    async fn account_info(&self, username: &str) -> Result<String, String> {
        Self::run("chage", &["-l", username]).await
    }

    async fn service_control(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("systemctl")
            .args(args)
            .output()
            .await
            .map_err(|e| format!("failed to run systemctl: {}", e))?;

        // systemctl reports state on stdout and complaints on stderr;
        // callers inspect the combined text.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}
