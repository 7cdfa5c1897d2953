//! Pub/sub wire format: outbound RPC envelopes and inbound chat events.

use {
    chrono::{DateTime, Utc},
    combchats_channels::ChatMessage,
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// RPC method number for channel subscription. Connect omits the method.
pub const METHOD_SUBSCRIBE: u32 = 1;

/// Client name reported in the connect call.
pub const CLIENT_NAME: &str = "js";

/// Prefix of the public chat subscription channel.
pub const PUBLIC_CHAT_PREFIX: &str = "public-chat:";

const STYLE_UNSTYLED: &str = "unstyled";

// ── Outbound ────────────────────────────────────────────────

/// `{id, method?, params}` request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<P> {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<u32>,
    pub params: P,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectParams<'a> {
    pub token: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeParams {
    pub channel: String,
}

impl<'a> RpcRequest<ConnectParams<'a>> {
    pub fn connect(id: u64, token: &'a str) -> Self {
        Self {
            id,
            method: None,
            params: ConnectParams {
                token,
                name: CLIENT_NAME,
            },
        }
    }
}

impl RpcRequest<SubscribeParams> {
    pub fn subscribe(id: u64, channel_key: &str) -> Self {
        Self {
            id,
            method: Some(METHOD_SUBSCRIBE),
            params: SubscribeParams {
                channel: format!("{PUBLIC_CHAT_PREFIX}{channel_key}"),
            },
        }
    }
}

/// Block shape accepted by the chat POST endpoint.
#[derive(Debug, Clone, Serialize)]
struct OutboundBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    content: String,
}

/// Serialize `text` as the `data` form field of a chat POST.
///
/// The inner `["text","unstyled",[]]` array is itself JSON-encoded into the
/// block's `content` string.
pub fn encode_text_blocks(text: &str) -> Result<String> {
    let content = serde_json::to_string(&(text, STYLE_UNSTYLED, [(); 0]))?;
    let blocks = [OutboundBlock {
        kind: "text",
        content,
    }];
    Ok(serde_json::to_string(&blocks)?)
}

// ── Inbound ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Layer<Layer<Layer<RawEvent>>>>,
}

#[derive(Debug, Default, Deserialize)]
struct Layer<T> {
    #[serde(default = "Option::default")]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    author: Option<RawAuthor>,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    data: Vec<RawBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuthor {
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: Option<String>,
}

/// One decoded piece of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    Emote(String),
    Link(String),
}

impl ContentBlock {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Emote(s) | Self::Link(s) => s,
        }
    }
}

/// A chat event pulled out of a pub/sub frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkMessage {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub blocks: Vec<ContentBlock>,
}

impl VkMessage {
    /// Block contents concatenated in order.
    pub fn text(&self) -> String {
        self.blocks.iter().map(ContentBlock::as_str).collect()
    }

    pub fn into_chat_message(self) -> ChatMessage {
        let text = self.text();
        ChatMessage::new(self.author, text, self.created_at)
    }
}

/// Decode one inbound frame.
///
/// `Ok(None)` is a control frame: no nested event, or `createdAt == 0`.
pub fn decode_message(frame: &str) -> Result<Option<VkMessage>> {
    let envelope: Envelope = serde_json::from_str(frame)
        .map_err(|e| Error::decode(format!("invalid envelope: {e}")))?;

    let Some(event) = envelope
        .result
        .and_then(|r| r.data)
        .and_then(|d| d.data)
        .and_then(|d| d.data)
    else {
        return Ok(None);
    };
    if event.created_at == 0 {
        return Ok(None);
    }

    let created_at = combchats_common::time::from_unix_secs(event.created_at)
        .ok_or_else(|| Error::decode(format!("timestamp {} out of range", event.created_at)))?;

    let mut blocks = Vec::with_capacity(event.data.len());
    for raw in event.data {
        if let Some(block) = decode_block(raw)? {
            blocks.push(block);
        }
    }

    Ok(Some(VkMessage {
        author: event.author.map(|a| a.display_name).unwrap_or_default(),
        created_at,
        blocks,
    }))
}

fn decode_block(raw: RawBlock) -> Result<Option<ContentBlock>> {
    match raw.kind.as_str() {
        "text" => Ok(decode_styled_text(&raw.content)?.map(ContentBlock::Text)),
        "smile" => {
            if raw.name.is_empty() {
                return Err(Error::decode("smile block without a name"));
            }
            Ok(Some(ContentBlock::Emote(raw.name)))
        },
        "link" => match raw.url {
            Some(url) if !url.is_empty() => Ok(Some(ContentBlock::Link(url))),
            _ => Ok(decode_styled_text(&raw.content)?.map(ContentBlock::Link)),
        },
        _ => Ok(None),
    }
}

/// Second decode pass: `content` holds `["<text>", "<style>", [...]]`.
fn decode_styled_text(content: &str) -> Result<Option<String>> {
    if content.is_empty() {
        return Ok(None);
    }
    let parts: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| Error::decode(format!("invalid block content: {e}")))?;
    match parts.into_iter().next() {
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        _ => Err(Error::decode("block content does not start with a string")),
    }
}
