//! Per-chat dialogue.
//!
//! [`step`] is pure: it maps the current stage and an incoming text to the
//! next stage plus the actions the bot has to perform. Talking to Telegram
//! and starting sessions happens in [`crate::handlers`].

use combchats_channels::{ChannelRef, Platform};

pub const WELCOME: &str = "I can show the chat of a Twitch or VK Play Live stream right here.";
pub const WORK_HINT: &str = "To watch a chat, send /work";
pub const ASK_NAME: &str = "Enter the name of the channel whose chat you want to see.";
pub const STARTING: &str = "Starting...";
pub const READY: &str = "Ready!";
pub const STOPPED: &str = "Chat stopped.";
pub const CANCELLED: &str = "Cancelled.";
pub const STOP_HINT: &str = "To stop the chat, send /stop";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    PendingPlatform,
    PendingName(Platform),
    Working,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Reply(String),
    /// Start a combine session for the chat; replaces any running one.
    Start(ChannelRef),
    /// Stop the chat's running session.
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: Stage,
    pub actions: Vec<Action>,
}

impl Step {
    fn reply(next: Stage, text: impl Into<String>) -> Self {
        Self {
            next,
            actions: vec![Action::Reply(text.into())],
        }
    }
}

pub fn ask_platform() -> String {
    format!("Choose a platform: {}", platform_list())
}

pub fn unknown_platform() -> String {
    format!("Unknown platform. Available: {}", platform_list())
}

fn platform_list() -> String {
    Platform::ALL
        .iter()
        .map(Platform::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command name of a `/command` or `/command@botname args` message.
fn command(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix('/')?;
    rest.split(['@', ' ']).next()
}

pub fn step(stage: Stage, text: &str) -> Step {
    let cmd = command(text);
    match (stage, cmd) {
        (Stage::Idle, Some("start")) => Step {
            next: Stage::Idle,
            actions: vec![
                Action::Reply(WELCOME.into()),
                Action::Reply(WORK_HINT.into()),
            ],
        },
        (Stage::Idle, Some("work")) => Step::reply(Stage::PendingPlatform, ask_platform()),
        (Stage::Idle, _) => Step::reply(Stage::Idle, WORK_HINT),

        (Stage::PendingPlatform | Stage::PendingName(_), Some("stop")) => {
            Step::reply(Stage::Idle, CANCELLED)
        },
        (Stage::PendingPlatform, _) => match text.trim().parse::<Platform>() {
            Ok(platform) => Step::reply(Stage::PendingName(platform), ASK_NAME),
            Err(_) => Step::reply(Stage::PendingPlatform, unknown_platform()),
        },
        (Stage::PendingName(_), Some(_)) => Step::reply(stage, ASK_NAME),
        (Stage::PendingName(platform), None) => {
            let name = text.trim();
            if name.is_empty() {
                return Step::reply(stage, ASK_NAME);
            }
            Step {
                next: Stage::Working,
                actions: vec![
                    Action::Reply(STARTING.into()),
                    Action::Start(ChannelRef::new(platform, name)),
                ],
            }
        },

        (Stage::Working, Some("stop")) => Step {
            next: Stage::Idle,
            actions: vec![Action::Stop, Action::Reply(STOPPED.into())],
        },
        (Stage::Working, _) => Step::reply(Stage::Working, STOP_HINT),
    }
}
