//! Self-update from the project's published releases.

use std::cmp::Ordering;
use std::env::consts::{ARCH, OS};

use reqwest::Client;
use serde::Deserialize;
use tracing::info;

const RELEASE_API: &str =
    "https://api.github.com/repos/DuTra01/user-checker/releases/latest";
const USER_AGENT: &str = concat!("user-checker/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

fn parse_version(v: &str) -> &str {
    v.strip_prefix('v').unwrap_or(v)
}

/// Piecewise numeric comparison of dotted version strings.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts: Vec<u32> = parse_version(a)
        .split('.')
        .filter_map(|s| s.parse().ok())
        .collect();
    let b_parts: Vec<u32> = parse_version(b)
        .split('.')
        .filter_map(|s| s.parse().ok())
        .collect();

    for (a, b) in a_parts.iter().zip(b_parts.iter()) {
        match a.cmp(b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a_parts.len().cmp(&b_parts.len())
}

async fn fetch_latest(client: &Client) -> Result<Release, String> {
    let response = client
        .get(RELEASE_API)
        .send()
        .await
        .map_err(|e| format!("Failed to reach release endpoint: {}", e))?;

    if !response.status().is_success() {
        return Err(format!(
            "Failed to fetch latest release: {}",
            response.status()
        ));
    }

    response
        .json()
        .await
        .map_err(|e| format!("Failed to parse release metadata: {}", e))
}

/// Returns the newer remote version, or `None` when already up to date.
pub async fn check_update() -> Result<Option<String>, String> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let release = fetch_latest(&client).await?;
    let current = env!("CARGO_PKG_VERSION");

    match compare_versions(current, &release.tag_name) {
        Ordering::Less => Ok(Some(release.tag_name)),
        _ => Ok(None),
    }
}

/// Downloads the platform binary for the latest release and swaps it in
/// for the running executable. Returns `false` when there was nothing
/// newer to install.
pub async fn update() -> Result<bool, String> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

    let release = fetch_latest(&client).await?;
    let current = env!("CARGO_PKG_VERSION");

    if compare_versions(current, &release.tag_name) != Ordering::Less {
        return Ok(false);
    }

    let asset_name = format!("checker-{}-{}", OS, ARCH);
    let asset = release
        .assets
        .iter()
        .find(|a| a.name == asset_name)
        .ok_or_else(|| format!("No release asset named {}", asset_name))?;

    info!("downloading {} {}", asset.name, release.tag_name);

    let binary = client
        .get(&asset.browser_download_url)
        .send()
        .await
        .map_err(|e| format!("Download failed: {}", e))?
        .bytes()
        .await
        .map_err(|e| format!("Download failed: {}", e))?;

    let staging = tempfile::tempdir().map_err(|e| format!("Failed to stage download: {}", e))?;
    let staged = staging.path().join(&asset.name);
    std::fs::write(&staged, &binary).map_err(|e| format!("Failed to stage download: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&staged)
            .map_err(|e| format!("Failed to stat staged binary: {}", e))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&staged, perms)
            .map_err(|e| format!("Failed to mark staged binary executable: {}", e))?;
    }

    self_replace::self_replace(&staged)
        .map_err(|e| format!("Failed to replace running executable: {}", e))?;

    info!("updated to {}", release.tag_name);
    Ok(true)
}
