//! Twitch chat over IRC.
//!
//! The source joins anonymously; the sink logs in with the sender's OAuth
//! token. Both wrap one `twitch-irc` client each.

pub mod error;
pub mod sink;
pub mod source;

pub use {
    error::{Error, Result},
    sink::TwitchSink,
    source::{TwitchSource, privmsg_to_message},
};

/// Twitch logins are lowercase ASCII; channel names typed by people often
/// are not.
pub(crate) fn login_name(name: &str) -> String {
    name.trim().trim_start_matches('#').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_login_names() {
        assert_eq!(login_name(" #Pajlada "), "pajlada");
        assert_eq!(login_name("forsen"), "forsen");
    }
}
