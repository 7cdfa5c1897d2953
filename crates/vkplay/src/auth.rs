use {
    secrecy::Secret,
    tracing::debug,
};

use crate::{
    config::VkPlayEndpoints,
    error::{Context, Error, Result},
};

/// Header carrying the per-request correlation id on the token call.
pub const FROM_ID_HEADER: &str = "X-From-Id";

/// Obtain an anonymous pub/sub session token.
///
/// Every call is tagged with a fresh UUID. Anything but a 200 with a string
/// `token` field is a connection error; nothing is retried here.
pub async fn fetch_ws_token(
    client: &reqwest::Client,
    endpoints: &VkPlayEndpoints,
) -> Result<Secret<String>> {
    let from_id = uuid::Uuid::new_v4().to_string();
    debug!(from_id = %from_id, "requesting vkplay websocket token");

    let resp = client
        .get(endpoints.token_url())
        .header(FROM_ID_HEADER, &from_id)
        .send()
        .await
        .context("token request failed")?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::connection(format!(
            "token request returned {status}: {body}"
        )));
    }

    let body: serde_json::Value = resp.json().await.context("token response is not JSON")?;
    let token = body
        .get("token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error::connection("token not found in response"))?;
    Ok(Secret::new(token.to_string()))
}
