use {
    async_trait::async_trait,
    combchats_channels::{ChannelRef, ChatSink, Lifecycle, SenderIdentity},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::{
    config::VkPlayEndpoints,
    error::{Context, Result},
    protocol::encode_text_blocks,
};

/// Posts into a VK Play Live chat with a user bearer token.
///
/// Uses only REST; no websocket is opened.
pub struct VkPlaySink {
    channel: ChannelRef,
    token: Secret<String>,
    http: reqwest::Client,
    endpoints: VkPlayEndpoints,
    lifecycle: Lifecycle,
}

impl VkPlaySink {
    pub fn new(
        channel: ChannelRef,
        identity: &SenderIdentity,
        endpoints: VkPlayEndpoints,
    ) -> Result<Self> {
        Ok(Self {
            http: endpoints.http_client()?,
            channel,
            token: identity.token.clone(),
            endpoints,
            lifecycle: Lifecycle::new(),
        })
    }

    /// POST one text message.
    ///
    /// The platform's own acknowledgement is not checked: any HTTP response
    /// means "submitted". Non-2xx statuses are only logged.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let data = encode_text_blocks(text)?;
        let resp = self
            .http
            .post(self.endpoints.chat_url(&self.channel.name))
            .bearer_auth(self.token.expose_secret())
            .form(&[("data", data.as_str())])
            .send()
            .await
            .with_context(|| format!("posting to {} failed", self.channel))?;

        let status = resp.status();
        if status.is_success() {
            #[cfg(feature = "metrics")]
            combchats_metrics::counter!(
                combchats_metrics::sink::MESSAGES_SENT,
                combchats_metrics::labels::PLATFORM => "vkplay"
            )
            .increment(1);
            debug!(channel = %self.channel, "vkplay message submitted");
        } else {
            let body = resp.text().await.unwrap_or_default();
            warn!(channel = %self.channel, %status, body = %body, "vkplay chat post not accepted");
        }
        Ok(())
    }
}

impl std::fmt::Debug for VkPlaySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkPlaySink")
            .field("channel", &self.channel)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatSink for VkPlaySink {
    fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    async fn send(&self, text: &str) -> combchats_channels::Result<()> {
        if self.lifecycle.is_stopped() {
            return Err(combchats_channels::Error::unavailable(format!(
                "{} sink is stopped",
                self.channel
            )));
        }
        if text.is_empty() {
            return Err(combchats_channels::Error::invalid_input(
                "cannot send an empty message",
            ));
        }
        Ok(self.send_message(text).await?)
    }

    fn stop(&self) {
        if self.lifecycle.stop() {
            debug!(channel = %self.channel, "vkplay sink stopped");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher};

    fn sink(server: &mockito::Server) -> VkPlaySink {
        let identity = SenderIdentity::new("relay", Secret::new("user-token".into()));
        VkPlaySink::new(ChannelRef::vkplay("streamer"), &identity, VkPlayEndpoints {
            api_base: server.url(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_form_encoded_blocks_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/blog/streamer/public_video_stream/chat")
            .match_header("authorization", "Bearer user-token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::UrlEncoded(
                "data".into(),
                r#"[{"type":"text","content":"[\"alice: \\\"hi\\\"\",\"unstyled\",[]]"}]"#.into(),
            ))
            .with_status(200)
            .create_async()
            .await;

        sink(&server).send(r#"alice: "hi""#).await.unwrap();
        mock.assert_async().await;
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn accepted_post_is_counted_as_sent() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let rendered = recorder.handle();
        // The current-thread test runtime polls everything on this thread.
        let _guard = metrics::set_default_local_recorder(&recorder);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/blog/streamer/public_video_stream/chat")
            .with_status(200)
            .create_async()
            .await;
        let sink = sink(&server);
        sink.send("one").await.unwrap();
        sink.send("two").await.unwrap();

        let text = rendered.render();
        assert!(
            text.contains(r#"combchats_sink_messages_sent_total{platform="vkplay"} 2"#),
            "{text}"
        );
    }

    #[tokio::test]
    async fn rejected_post_still_counts_as_submitted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/blog/streamer/public_video_stream/chat")
            .with_status(403)
            .with_body(r#"{"error":"forbidden"}"#)
            .create_async()
            .await;

        assert!(sink(&server).send("hello").await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = sink(&server).send("").await.unwrap_err();
        assert!(matches!(err, combchats_channels::Error::InvalidInput { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_after_stop_is_unavailable() {
        let server = mockito::Server::new_async().await;
        let sink = sink(&server);
        sink.stop();
        sink.stop();
        let err = sink.send("late").await.unwrap_err();
        assert!(matches!(err, combchats_channels::Error::Unavailable { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let identity = SenderIdentity::new("relay", Secret::new("t".into()));
        let sink = VkPlaySink::new(ChannelRef::vkplay("x"), &identity, VkPlayEndpoints {
            api_base: "http://127.0.0.1:1".into(),
            request_timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(sink.send("hi").await.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let identity = SenderIdentity::new("relay", Secret::new("super-secret".into()));
        let sink =
            VkPlaySink::new(ChannelRef::vkplay("x"), &identity, VkPlayEndpoints::default()).unwrap();
        assert!(!format!("{sink:?}").contains("super-secret"));
    }
}
