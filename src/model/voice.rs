use crate::model::events::{Event, VoiceUpdate};
use crate::types::{ChannelId, GuildId, UserId};

/// Voice state update of a user, as delivered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceStateUpdate {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// `None` when the user left voice (or was kicked out of it).
    pub channel_id: Option<ChannelId>,
    pub session_id: String,
}

/// Voice server update of a guild, as delivered by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceServerUpdate {
    pub guild_id: GuildId,
    pub token: String,
    /// `None` while Discord is reallocating the voice server.
    pub endpoint: Option<String>,
}

/// Collects both halves of the voice handshake and hands out the combined
/// `voiceUpdate` once per distinct pair.
#[derive(Debug, Clone, Default)]
pub struct VoiceSessionState {
    session_id: Option<String>,
    event: Option<Event>,
    dispatched: Option<VoiceUpdate>,
}

impl VoiceSessionState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_server_update(&mut self, guild: GuildId, update: &VoiceServerUpdate) -> Option<VoiceUpdate> {
        let endpoint = update.endpoint.clone()?;

        self.event = Some(Event {
            token: update.token.clone(),
            endpoint,
            guild_id: guild.0.to_string(),
        });

        self.ready()
    }

    /// Returns `None` and forgets everything if the update carries no channel.
    pub fn on_state_update(&mut self, update: &VoiceStateUpdate) -> Option<VoiceUpdate> {
        if update.channel_id.is_none() {
            self.clear();
            return None;
        }

        self.session_id = Some(update.session_id.clone());

        self.ready()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        self.session_id.is_some() && self.event.is_some()
    }

    pub fn dispatched(&self) -> Option<&VoiceUpdate> {
        self.dispatched.as_ref()
    }

    fn ready(&mut self) -> Option<VoiceUpdate> {
        let update = VoiceUpdate {
            session_id: self.session_id.clone()?,
            event: self.event.clone()?,
        };

        if self.dispatched.as_ref() == Some(&update) {
            return None;
        }

        self.dispatched = Some(update.clone());

        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(10);

    fn state(session: &str, channel: Option<u64>) -> VoiceStateUpdate {
        VoiceStateUpdate {
            guild_id: GUILD,
            user_id: UserId(1),
            channel_id: channel.map(ChannelId),
            session_id: session.to_string(),
        }
    }

    fn server(token: &str) -> VoiceServerUpdate {
        VoiceServerUpdate {
            guild_id: GUILD,
            token: token.to_string(),
            endpoint: Some("eu.discord.media".to_string()),
        }
    }

    #[test]
    fn repeated_state_halves_do_not_dispatch() {
        let mut voice = VoiceSessionState::new();

        assert!(voice.on_state_update(&state("s1", Some(5))).is_none());
        assert!(voice.on_state_update(&state("s1", Some(5))).is_none());
        assert!(!voice.is_complete());
    }

    #[test]
    fn one_of_each_dispatches_exactly_once() {
        let mut voice = VoiceSessionState::new();

        assert!(voice.on_state_update(&state("s1", Some(5))).is_none());
        let update = voice.on_server_update(GUILD, &server("t1")).unwrap();

        assert_eq!(update.session_id, "s1");
        assert_eq!(update.event.token, "t1");
        assert_eq!(update.event.guild_id, "10");

        assert!(voice.on_state_update(&state("s1", Some(5))).is_none());
        assert!(voice.on_server_update(GUILD, &server("t1")).is_none());
    }

    #[test]
    fn changed_half_dispatches_new_pair() {
        let mut voice = VoiceSessionState::new();
        voice.on_server_update(GUILD, &server("t1"));
        voice.on_state_update(&state("s1", Some(5))).unwrap();

        let moved = voice.on_state_update(&state("s2", Some(6))).unwrap();
        assert_eq!(moved.session_id, "s2");
        assert_eq!(moved.event.token, "t1");

        let rotated = voice.on_server_update(GUILD, &server("t2")).unwrap();
        assert_eq!(rotated.session_id, "s2");
        assert_eq!(voice.dispatched(), Some(&rotated));
    }

    #[test]
    fn leaving_channel_clears_everything() {
        let mut voice = VoiceSessionState::new();
        voice.on_server_update(GUILD, &server("t1"));
        voice.on_state_update(&state("s1", Some(5))).unwrap();

        assert!(voice.on_state_update(&state("s1", None)).is_none());
        assert!(!voice.is_complete());
        assert!(voice.dispatched().is_none());

        assert!(voice.on_server_update(GUILD, &server("t1")).is_none());
        assert!(voice.on_state_update(&state("s1", Some(5))).is_some());
    }

    #[test]
    fn server_update_without_endpoint_is_held_back() {
        let mut voice = VoiceSessionState::new();
        voice.on_state_update(&state("s1", Some(5)));

        let pending = VoiceServerUpdate { endpoint: None, ..server("t1") };
        assert!(voice.on_server_update(GUILD, &pending).is_none());
        assert!(!voice.is_complete());
    }
}
