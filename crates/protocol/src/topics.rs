//! Topic layout
//!
//! Every message travels on a `{prefix}/{room}/{channel}` topic. Even with
//! in-process channels the logical names matter: they scope rooms apart,
//! make logs readable, and keep the door open for a networked transport.

/// Builds the topics for one room.
#[derive(Debug, Clone)]
pub struct Topics {
    prefix: String,
    room: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            room: room.into(),
        }
    }

    fn channel(&self, channel: &str) -> String {
        format!("{}/{}/{}", self.prefix, self.room, channel)
    }

    /// Client join requests: `{prefix}/{room}/join`
    pub fn join(&self) -> String {
        self.channel("join")
    }

    /// Client order/loan/chat intents: `{prefix}/{room}/action`
    pub fn action(&self) -> String {
        self.channel("action")
    }

    /// Periodic state snapshots: `{prefix}/{room}/sync`
    pub fn sync(&self) -> String {
        self.channel("sync")
    }

    /// Phase changes and announcements: `{prefix}/{room}/broadcast`
    pub fn broadcast(&self) -> String {
        self.channel("broadcast")
    }

    /// Full-state setup snapshots: `{prefix}/{room}/broadcast_setup`
    pub fn broadcast_setup(&self) -> String {
        self.channel("broadcast_setup")
    }

    /// Private channel for one player: `{prefix}/{room}/p/{player_id}`
    pub fn private(&self, player_id: &str) -> String {
        self.channel(&format!("p/{player_id}"))
    }

    /// Everything a client needs to listen to.
    pub fn client_subscriptions(&self, player_id: &str) -> Vec<String> {
        vec![
            self.sync(),
            self.broadcast(),
            self.broadcast_setup(),
            self.private(player_id),
        ]
    }

    /// Everything the host needs to listen to.
    pub fn host_subscriptions(&self) -> Vec<String> {
        vec![self.join(), self.action()]
    }
}

/// Exact match, or a trailing `/*` matching any suffix.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => topic
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/')),
        None => pattern == topic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_layout() {
        let topics = Topics::new("openbell", "room-7");
        assert_eq!(topics.join(), "openbell/room-7/join");
        assert_eq!(topics.sync(), "openbell/room-7/sync");
        assert_eq!(topics.private("alice"), "openbell/room-7/p/alice");
    }

    #[test]
    fn test_topic_matching() {
        assert!(topic_matches("a/b/sync", "a/b/sync"));
        assert!(!topic_matches("a/b/sync", "a/b/join"));
        assert!(topic_matches("a/b/*", "a/b/p/alice"));
        assert!(topic_matches("a/b/*", "a/b/sync"));
        assert!(!topic_matches("a/b/*", "a/bc/sync"));
        assert!(!topic_matches("a/b/*", "a/b"));
    }

    #[test]
    fn test_rooms_do_not_overlap() {
        let a = Topics::new("openbell", "room-1");
        let b = Topics::new("openbell", "room-2");
        assert!(!topic_matches(&a.sync(), &b.sync()));
    }
}
