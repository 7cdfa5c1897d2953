use {serde::Deserialize, tracing::debug};

use crate::{
    config::VkPlayEndpoints,
    error::{Context, Error, Result},
};

/// Subset of `GET /v1/blog/{channel}` the client relies on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogResponse {
    #[serde(default)]
    pub public_web_socket_channel: Option<String>,
    #[serde(default)]
    pub blog_url: Option<String>,
}

/// Extract the subscription key from a `prefix:key` channel descriptor.
///
/// Takes the segment between the first and second colon, so
/// `"channel:123:x"` yields `"123"`.
pub fn channel_key(descriptor: &str) -> Result<&str> {
    let mut parts = descriptor.split(':');
    let _prefix = parts.next();
    match parts.next() {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(Error::connection(format!(
            "malformed pub/sub channel descriptor '{descriptor}'"
        ))),
    }
}

/// Resolve a blog name to the key used in `public-chat:{key}`.
pub async fn resolve_channel_key(
    client: &reqwest::Client,
    endpoints: &VkPlayEndpoints,
    channel: &str,
) -> Result<String> {
    let resp = client
        .get(endpoints.blog_url(channel))
        .send()
        .await
        .with_context(|| format!("blog lookup for '{channel}' failed"))?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::connection(format!(
            "blog lookup for '{channel}' returned {status}"
        )));
    }

    let blog: BlogResponse = resp
        .json()
        .await
        .with_context(|| format!("blog response for '{channel}' is not valid JSON"))?;
    let descriptor = blog
        .public_web_socket_channel
        .as_deref()
        .with_context(|| format!("blog '{channel}' has no publicWebSocketChannel"))?;
    let key = channel_key(descriptor)?;
    debug!(channel, key, "resolved vkplay pub/sub channel");
    Ok(key.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("channel_chat:12345", "12345")]
    #[case("a:b:c", "b")]
    fn extracts_key(#[case] descriptor: &str, #[case] key: &str) {
        assert_eq!(channel_key(descriptor).unwrap(), key);
    }

    #[rstest]
    #[case("no-colon")]
    #[case("trailing:")]
    #[case("")]
    fn rejects_malformed_descriptor(#[case] descriptor: &str) {
        assert!(matches!(channel_key(descriptor), Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn resolves_key_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/blog/streamer")
            .with_status(200)
            .with_body(r#"{"publicWebSocketChannel":"channel_chat:777","blogUrl":"streamer"}"#)
            .create_async()
            .await;
        let endpoints = VkPlayEndpoints {
            api_base: server.url(),
            ..Default::default()
        };

        let key = resolve_channel_key(&reqwest::Client::new(), &endpoints, "streamer")
            .await
            .unwrap();
        assert_eq!(key, "777");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_blog_is_connection_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/blog/ghost")
            .with_status(404)
            .create_async()
            .await;
        let endpoints = VkPlayEndpoints {
            api_base: server.url(),
            ..Default::default()
        };

        let err = resolve_channel_key(&reqwest::Client::new(), &endpoints, "ghost")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn missing_descriptor_is_connection_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/blog/empty")
            .with_status(200)
            .with_body(r#"{"blogUrl":"empty"}"#)
            .create_async()
            .await;
        let endpoints = VkPlayEndpoints {
            api_base: server.url(),
            ..Default::default()
        };

        let err = resolve_channel_key(&reqwest::Client::new(), &endpoints, "empty")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
