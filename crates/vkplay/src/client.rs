use {
    combchats_channels::{MessageSender, lifecycle},
    futures::{SinkExt, StreamExt},
    secrecy::ExposeSecret,
    tokio::{net::TcpStream, sync::watch},
    tokio_tungstenite::{
        MaybeTlsStream, WebSocketStream, connect_async,
        tungstenite::{
            Message,
            client::IntoClientRequest,
            http::{HeaderValue, header::ORIGIN},
        },
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    auth::fetch_ws_token,
    blog::resolve_channel_key,
    config::VkPlayEndpoints,
    error::{Error, Result},
    protocol::{RpcRequest, decode_message},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Observable progress of a pub/sub connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    TokenRequested,
    TokenAcquired,
    ChannelResolved,
    Subscribed,
    Streaming,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

/// Per-connection RPC id counter, starting at 1.
#[derive(Debug)]
struct RequestIds(u64);

impl RequestIds {
    fn new() -> Self {
        Self(1)
    }

    fn next(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// Anonymous read-side client for one VK Play Live chat.
///
/// A client drives a single connection: token, blog lookup, websocket
/// subscription, then the read loop. It is not reconnected.
#[derive(Debug)]
pub struct PubSubClient {
    http: reqwest::Client,
    endpoints: VkPlayEndpoints,
    channel: String,
    state: watch::Sender<ConnectionState>,
}

impl PubSubClient {
    pub fn new(channel: impl Into<String>, endpoints: VkPlayEndpoints) -> Result<Self> {
        let http = endpoints.http_client()?;
        let (state, _) = watch::channel(ConnectionState::Idle);
        Ok(Self {
            http,
            endpoints,
            channel: channel.into(),
            state,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        debug!(channel = %self.channel, state = ?next, "vkplay connection state");
        self.state.send_replace(next);
    }

    /// Run the connection until `cancel` fires or the transport fails.
    ///
    /// Returns `Ok(())` on cancellation or when `emit` is closed. The state
    /// always ends at [`ConnectionState::Closed`].
    pub async fn run(&self, cancel: CancellationToken, emit: MessageSender) -> Result<()> {
        let result = self.drive(&cancel, &emit).await;
        self.set_state(ConnectionState::Closed);
        result
    }

    async fn drive(&self, cancel: &CancellationToken, emit: &MessageSender) -> Result<()> {
        self.set_state(ConnectionState::TokenRequested);
        let Some(token) = cancel
            .run_until_cancelled(fetch_ws_token(&self.http, &self.endpoints))
            .await
        else {
            return Ok(());
        };
        let token = token?;
        self.set_state(ConnectionState::TokenAcquired);

        let Some(key) = cancel
            .run_until_cancelled(resolve_channel_key(
                &self.http,
                &self.endpoints,
                &self.channel,
            ))
            .await
        else {
            return Ok(());
        };
        let key = key?;
        self.set_state(ConnectionState::ChannelResolved);

        let Some(ws) = cancel
            .run_until_cancelled(self.subscribe(token.expose_secret(), &key))
            .await
        else {
            return Ok(());
        };
        let mut ws = ws?;
        self.set_state(ConnectionState::Subscribed);
        info!(channel = %self.channel, key = %key, "subscribed to vkplay chat");

        self.set_state(ConnectionState::Streaming);
        let result = self.read_loop(&mut ws, cancel, emit).await;

        self.set_state(ConnectionState::Closing);
        if let Err(e) = ws.close(None).await {
            debug!(channel = %self.channel, error = %e, "websocket close failed");
        }
        result
    }

    async fn subscribe(&self, token: &str, key: &str) -> Result<WsStream> {
        let mut request = self.endpoints.ws_url.as_str().into_client_request()?;
        let origin = HeaderValue::from_str(&self.endpoints.origin)
            .map_err(|e| Error::connection(format!("invalid origin header: {e}")))?;
        request.headers_mut().insert(ORIGIN, origin);

        let (mut ws, _) = connect_async(request).await?;

        let mut ids = RequestIds::new();
        let connect = serde_json::to_string(&RpcRequest::connect(ids.next(), token))?;
        ws.send(Message::Text(connect.into())).await?;
        let subscribe = serde_json::to_string(&RpcRequest::subscribe(ids.next(), key))?;
        ws.send(Message::Text(subscribe.into())).await?;
        Ok(ws)
    }

    async fn read_loop(
        &self,
        ws: &mut WsStream,
        cancel: &CancellationToken,
        emit: &MessageSender,
    ) -> Result<()> {
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                frame = ws.next() => frame,
            };

            match frame {
                None => return Err(Error::connection("websocket stream ended")),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => {
                    // The server may batch several replies into one frame.
                    for line in text.as_str().lines().filter(|l| !l.trim().is_empty()) {
                        match decode_message(line) {
                            Ok(Some(msg)) => {
                                #[cfg(feature = "metrics")]
                                combchats_metrics::counter!(
                                    combchats_metrics::source::MESSAGES_RECEIVED,
                                    combchats_metrics::labels::PLATFORM => "vkplay"
                                )
                                .increment(1);
                                if !lifecycle::emit(cancel, emit, msg.into_chat_message()).await {
                                    return Ok(());
                                }
                            },
                            Ok(None) => {},
                            Err(e) => {
                                #[cfg(feature = "metrics")]
                                combchats_metrics::counter!(
                                    combchats_metrics::source::DECODE_ERRORS,
                                    combchats_metrics::labels::PLATFORM => "vkplay"
                                )
                                .increment(1);
                                warn!(channel = %self.channel, error = %e, "skipping malformed vkplay frame");
                            },
                        }
                    }
                },
                Some(Ok(Message::Ping(payload))) => ws.send(Message::Pong(payload)).await?,
                Some(Ok(Message::Close(frame))) => {
                    return Err(Error::connection(format!(
                        "server closed the connection: {frame:?}"
                    )));
                },
                Some(Ok(_)) => {},
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_start_at_one() {
        let mut ids = RequestIds::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
    }

    #[test]
    fn new_client_is_idle() {
        let client = PubSubClient::new("streamer", VkPlayEndpoints::default()).unwrap();
        assert_eq!(client.current_state(), ConnectionState::Idle);
        assert!(!client.current_state().is_terminal());
        assert_eq!(client.channel(), "streamer");
    }
}
