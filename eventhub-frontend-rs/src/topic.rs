use std::fmt;
use std::str::FromStr;

/// Notification streams on the client's channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    /// The stored token changed (login, registration or logout). No payload.
    Auth,
    /// The full event list was refreshed.
    Events,
    /// The signed-in user's own events were refreshed.
    MyEvents,
    /// The local joined set changed.
    Joined,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Auth => "authChange",
            Topic::Events => "events",
            Topic::MyEvents => "myEvents",
            Topic::Joined => "joined",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic `{0}`")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Topic::Auth, Topic::Events, Topic::MyEvents, Topic::Joined]
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

pub type Channel = herald::Channel<Topic>;
