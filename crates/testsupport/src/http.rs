use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

/// Poll `url` until it answers 200 or the timeout elapses. Containers take a
/// moment between start and bind, so tests probe instead of sleeping blind.
pub async fn wait_for_http_ok(url: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                return Ok(resp.text().await?);
            }
            _ if tokio::time::Instant::now() >= deadline => {
                anyhow::bail!("no successful response from {} within {:?}", url, timeout);
            }
            _ => sleep(Duration::from_millis(250)).await,
        }
    }
}
