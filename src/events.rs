use async_trait::async_trait;

use crate::{
    node::Node,
    model::gateway::*,
    types::{ChannelId, GuildId},
};
use std::{fmt, sync::Arc, time::Duration};

#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Periodic event that returns the statistics of the server.
    async fn stats(&self, _node: Arc<Node>, _event: Stats) {}
    /// Event that triggers when a player updates.
    async fn player_update(&self, _node: Arc<Node>, _event: PlayerUpdate) {}
    /// Event that triggers when a track starts playing.
    async fn track_start(&self, _node: Arc<Node>, _event: TrackStart) {}
    /// Event that triggers when a track finishes playing.
    async fn track_finish(&self, _node: Arc<Node>, _event: TrackFinish) {}
    /// Event triggered when there is an exception playing the track.
    async fn track_exception(&self, _node: Arc<Node>, _event: TrackException) {}
    /// Event triggered when a track gets stuck.
    async fn track_stuck(&self, _node: Arc<Node>, _event: TrackStuck) {}
    ///Event triggered when an audio web socket is disconnected from discord
    async fn socket_closed(&self, _node: Arc<Node>, _event: WebSocketClosed) {}
    /// Something a player wants to tell the channel it was asked to reply to.
    /// `channel` is `None` when the player has no text channel.
    async fn player_notice(&self, _node: Arc<Node>, _guild: GuildId, _channel: Option<ChannelId>, _notice: PlayerNotice) {}
}

/// User facing outcomes of the playback loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotice {
    IdleTimeout(Duration),
    ResolutionFailed { title: String, reason: String },
    PlaybackFailed { title: String },
    TrackException { title: String, message: String },
    TrackStuck { title: String, threshold_ms: u64 },
    CommandFailed { reason: String },
    ForcedDisconnect,
}

impl fmt::Display for PlayerNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout(idle) => write!(f, "No tracks have been added to the queue for {} seconds, I am leaving the voice channel.", idle.as_secs()),
            Self::ResolutionFailed { title, reason } => write!(f, "Could not find a playable version of `{}`: {}", title, reason),
            Self::PlaybackFailed { title } => write!(f, "Something went wrong while playing `{}`, maybe try playing it again.", title),
            Self::TrackException { title, message } => write!(f, "`{}` could not be played: {}", title, message),
            Self::TrackStuck { title, threshold_ms } => write!(f, "`{}` got stuck for {}ms, skipping it.", title, threshold_ms),
            Self::CommandFailed { reason } => write!(f, "{}", reason),
            Self::ForcedDisconnect => write!(f, "I was disconnected from the voice channel."),
        }
    }
}

pub(crate) fn process(node: Arc<Node>, handler: Arc<dyn EventHandler>, event_type: EventType) {
    match event_type {
        EventType::Stats(e) => {
            tokio::spawn(async move {
                handler.stats(node, e).await;
            });
        },
        EventType::PlayerUpdate(e) => {
            tokio::spawn(async move {
                handler.player_update(node, e).await;
            });
        },
        EventType::Node(NodeEvent::TrackStartEvent(e)) => {
            tokio::spawn(async move {
                handler.track_start(node, e).await;
            });
        },
        EventType::Node(NodeEvent::TrackEndEvent(e)) => {
            tokio::spawn(async move {
                handler.track_finish(node, e).await;
            });
        },
        EventType::Node(NodeEvent::TrackExceptionEvent(e)) => {
            tokio::spawn(async move {
                handler.track_exception(node, e).await;
            });
        },
        EventType::Node(NodeEvent::TrackStuckEvent(e)) => {
            tokio::spawn(async move {
                handler.track_stuck(node, e).await;
            });
        },
        EventType::Node(NodeEvent::WebSocketClosedEvent(e)) => {
            tokio::spawn(async move {
                handler.socket_closed(node, e).await;
            });
        },
        EventType::Node(NodeEvent::Unknown) => (),
        EventType::Notice { guild, channel, notice } => {
            tokio::spawn(async move {
                handler.player_notice(node, guild, channel, notice).await;
            });
        }
    }
}

pub(crate) enum EventType {
    Stats(Stats),
    PlayerUpdate(PlayerUpdate),
    Node(NodeEvent),
    Notice {
        guild: GuildId,
        channel: Option<ChannelId>,
        notice: PlayerNotice,
    },
}
