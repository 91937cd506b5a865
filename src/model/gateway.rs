use serde::{Serialize, Deserialize};
use serde_aux::prelude::*;

use crate::types::GuildId;

/// Every message the node sends over the websocket, keyed by `op`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum IncomingMessage {
    Stats(Stats),
    PlayerUpdate(PlayerUpdate),
    Event(NodeEvent),
    #[serde(other)]
    Unknown,
}

/// Player scoped events, keyed by `type`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    TrackStartEvent(TrackStart),
    TrackEndEvent(TrackFinish),
    TrackExceptionEvent(TrackException),
    TrackStuckEvent(TrackStuck),
    WebSocketClosedEvent(WebSocketClosed),
    #[serde(other)]
    Unknown,
}

impl NodeEvent {
    pub fn guild_id(&self) -> Option<GuildId> {
        let id = match self {
            Self::TrackStartEvent(e) => e.guild_id,
            Self::TrackEndEvent(e) => e.guild_id,
            Self::TrackExceptionEvent(e) => e.guild_id,
            Self::TrackStuckEvent(e) => e.guild_id,
            Self::WebSocketClosedEvent(e) => e.guild_id,
            Self::Unknown => return None,
        };

        Some(GuildId(id))
    }
}

/// What a player reacts to: its own position reports and events.
#[derive(Clone, Debug)]
pub enum PlayerEvent {
    Update(State),
    Event(NodeEvent),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Cpu {
    pub cores: i64,
    #[serde(rename = "systemLoad")]
    pub system_load: f64,
    #[serde(rename = "lavalinkLoad")]
    pub lavalink_load: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FrameStats {
    pub sent: i64,
    pub deficit: i64,
    pub nulled: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Memory {
    pub reservable: i64,
    pub used: i64,
    pub free: i64,
    pub allocated: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct State {
    #[serde(default)]
    pub position: u64,
    pub time: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Stats {
    #[serde(rename = "playingPlayers")]
    pub playing_players: i64,
    pub memory: Memory,
    #[serde(rename = "frameStats")]
    pub frame_stats: Option<FrameStats>,
    pub players: i64,
    pub cpu: Cpu,
    pub uptime: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerUpdate {
    pub state: State,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackStart {
    pub track: String,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
    #[serde(other)]
    Unknown,
}

impl TrackEndReason {
    /// Whether the track played through on its own rather than being cut off.
    pub fn is_natural(self) -> bool {
        self == Self::Finished
    }

    /// Ends the player already accounted for when it sent `play` or `stop`.
    pub fn is_local(self) -> bool {
        matches!(self, Self::Replaced | Self::Stopped)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackFinish {
    pub reason: TrackEndReason,
    pub track: String,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExceptionInfo {
    pub message: Option<String>,
    pub severity: Option<String>,
    pub cause: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackException {
    pub track: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub exception: Option<ExceptionInfo>,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

impl TrackException {
    /// Older nodes send a plain `error`, newer ones an `exception` object.
    pub fn message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.exception.as_ref().and_then(|e| e.message.clone()))
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrackStuck {
    pub track: String,
    #[serde(rename = "thresholdMs")]
    pub threshold_ms: u64,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WebSocketClosed {
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
    pub code: u16,
    pub reason: String,
    #[serde(rename = "byRemote")]
    pub by_remote: bool
}

impl WebSocketClosed {
    /// Discord closed the voice connection for good (kicked, channel deleted, ...).
    pub const DISCONNECTED: u16 = 4014;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> IncomingMessage {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn player_update_with_string_guild() {
        match decode(r#"{"op":"playerUpdate","guildId":"1234","state":{"position":5000,"time":1600000000000}}"#) {
            IncomingMessage::PlayerUpdate(update) => {
                assert_eq!(update.guild_id, 1234);
                assert_eq!(update.state.position, 5000);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn track_events_by_type() {
        let end = decode(r#"{"op":"event","type":"TrackEndEvent","guildId":"1","track":"QAAA","reason":"REPLACED"}"#);
        match end {
            IncomingMessage::Event(NodeEvent::TrackEndEvent(e)) => {
                assert_eq!(e.reason, TrackEndReason::Replaced);
                assert!(!e.reason.is_natural());
            },
            other => panic!("unexpected {:?}", other),
        }

        let odd = decode(r#"{"op":"event","type":"TrackEndEvent","guildId":"1","track":"QAAA","reason":"EVICTED"}"#);
        match odd {
            IncomingMessage::Event(NodeEvent::TrackEndEvent(e)) => {
                assert_eq!(e.reason, TrackEndReason::Unknown);
                assert!(!e.reason.is_natural());
            },
            other => panic!("unexpected {:?}", other),
        }

        let stuck = decode(r#"{"op":"event","type":"TrackStuckEvent","guildId":"1","track":"QAAA","thresholdMs":10000}"#);
        assert!(matches!(stuck, IncomingMessage::Event(NodeEvent::TrackStuckEvent(TrackStuck { threshold_ms: 10000, .. }))));
    }

    #[test]
    fn exception_message_from_either_shape() {
        let old = decode(r#"{"op":"event","type":"TrackExceptionEvent","guildId":"1","track":"QAAA","error":"boom"}"#);
        let new = decode(r#"{"op":"event","type":"TrackExceptionEvent","guildId":"1","track":"QAAA","exception":{"message":"video unavailable","severity":"COMMON","cause":"x"}}"#);

        for (message, expected) in vec![(old, "boom"), (new, "video unavailable")] {
            match message {
                IncomingMessage::Event(NodeEvent::TrackExceptionEvent(e)) => assert_eq!(e.message(), expected),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn unknown_discriminants_decode_to_unknown() {
        assert!(matches!(decode(r#"{"op":"ready","resumed":false}"#), IncomingMessage::Unknown));

        let event = decode(r#"{"op":"event","type":"SegmentSkipped","guildId":"1"}"#);
        match event {
            IncomingMessage::Event(e) => {
                assert!(matches!(e, NodeEvent::Unknown));
                assert_eq!(e.guild_id(), None);
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn stats_payload() {
        let raw = r#"{"op":"stats","playingPlayers":1,"players":2,"uptime":1000,
            "memory":{"reservable":1,"used":1,"free":1,"allocated":1},
            "cpu":{"cores":4,"systemLoad":0.1,"lavalinkLoad":0.05}}"#;

        match decode(raw) {
            IncomingMessage::Stats(stats) => {
                assert_eq!(stats.players, 2);
                assert!(stats.frame_stats.is_none());
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
