use anyhow::Result;
use swiss_tracker::dashboard::{ApiClient, render};
use swiss_tracker::tracker_config::TrackerConfig;
use tracing::warn;

#[tracing::instrument(skip_all)]
pub async fn handle_dashboard(config: TrackerConfig, refresh_first: bool) -> Result<()> {
    let api = ApiClient::new(config.api_base_url())?;

    if refresh_first {
        match api.refresh().await {
            Ok(response) => println!("[{}] {}", response.status, response.message),
            // The dashboard still shows whatever is stored
            Err(e) => warn!("Refresh failed: {:#}", e),
        }
    }

    let latest = api.latest().await?;
    print!("{}", render(&latest));

    Ok(())
}
