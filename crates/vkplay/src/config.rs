use {
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

const DEFAULT_API_BASE: &str = "https://api.live.vkplay.ru";
const DEFAULT_WS_URL: &str = "wss://pubsub.live.vkplay.ru/connection/websocket";
const DEFAULT_ORIGIN: &str = "https://live.vkplay.ru";

/// Where the VK Play Live client connects.
///
/// Defaults point at production; tests and staging override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VkPlayEndpoints {
    /// REST API root, without trailing `/v1`.
    pub api_base: String,

    /// Pub/sub websocket endpoint.
    pub ws_url: String,

    /// `Origin` header sent on the websocket upgrade.
    pub origin: String,

    /// Timeout for every REST call.
    pub request_timeout_secs: u64,
}

impl Default for VkPlayEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            ws_url: DEFAULT_WS_URL.into(),
            origin: DEFAULT_ORIGIN.into(),
            request_timeout_secs: 15,
        }
    }
}

impl VkPlayEndpoints {
    fn api(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn token_url(&self) -> String {
        format!("{}/v1/ws/connect", self.api())
    }

    pub fn blog_url(&self, channel: &str) -> String {
        format!("{}/v1/blog/{}", self.api(), urlencoding::encode(channel))
    }

    pub fn chat_url(&self, channel: &str) -> String {
        format!(
            "{}/v1/blog/{}/public_video_stream/chat",
            self.api(),
            urlencoding::encode(channel)
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
    }
}
