use std::time::Duration;

use reqwest::Client;

use crate::config::{FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::Result;

pub fn build_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// Fetch one product page as decoded text. Non-2xx statuses are errors so the
/// caller can skip the product and move on.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let res = client.get(url).send().await?.error_for_status()?;
    Ok(res.text().await?)
}
