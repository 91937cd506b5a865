//! Fakes for the collaborators, shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    builder::{NodeBuilder, PlayerSettings, ReconnectPolicy},
    error::{LinkError, LinkResult},
    events::{EventHandler, PlayerNotice},
    model::track::{tests::track, Track, TrackRequester},
    node::{Node, NodeContext},
    resolver::TrackResolver,
    types::{ChannelId, GuildId, UserId},
    voice::VoiceGateway,
};

pub(crate) const BOT: UserId = UserId(1000);

#[derive(Default)]
pub(crate) struct RecordingHandler {
    notices: Mutex<Vec<(Option<ChannelId>, PlayerNotice)>>,
}

impl RecordingHandler {
    pub(crate) fn notices(&self) -> Vec<(Option<ChannelId>, PlayerNotice)> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn player_notice(&self, _node: Arc<Node>, _guild: GuildId, channel: Option<ChannelId>, notice: PlayerNotice) {
        self.notices.lock().push((channel, notice));
    }
}

#[derive(Default)]
pub(crate) struct RecordingGateway {
    joined: Mutex<Vec<(GuildId, ChannelId)>>,
    left: Mutex<Vec<GuildId>>,
}

impl RecordingGateway {
    pub(crate) fn joined(&self) -> Vec<(GuildId, ChannelId)> {
        self.joined.lock().clone()
    }

    pub(crate) fn left(&self) -> Vec<GuildId> {
        self.left.lock().clone()
    }
}

#[async_trait]
impl VoiceGateway for RecordingGateway {
    async fn join(&self, guild: GuildId, channel: ChannelId) {
        self.joined.lock().push((guild, channel));
    }

    async fn leave(&self, guild: GuildId) {
        self.left.lock().push(guild);
    }
}

pub(crate) struct FailingResolver;

#[async_trait]
impl TrackResolver for FailingResolver {
    async fn search(&self, query: &str, _requester: Option<TrackRequester>, _context: Option<ChannelId>) -> LinkResult<Vec<Track>> {
        Err(LinkError::SearchError(format!("no matches for `{}`", query)))
    }

    async fn resolve(&self, _reference: &Track) -> LinkResult<Vec<Track>> {
        Err(LinkError::ResolutionFailure("catalog unavailable".to_string()))
    }
}

/// Resolves everything to a single track with the given id.
pub(crate) struct FixedResolver(pub(crate) &'static str);

#[async_trait]
impl TrackResolver for FixedResolver {
    async fn search(&self, _query: &str, requester: Option<TrackRequester>, context: Option<ChannelId>) -> LinkResult<Vec<Track>> {
        Ok(vec![Track { requester, context, ..track(self.0, 10_000) }])
    }

    async fn resolve(&self, reference: &Track) -> LinkResult<Vec<Track>> {
        Ok(vec![Track { requester: reference.requester.clone(), context: reference.context, ..track(self.0, 10_000) }])
    }
}

pub(crate) type TestNode = (Arc<Node>, UnboundedReceiver<Message>, Arc<RecordingHandler>, Arc<RecordingGateway>);

pub(crate) fn context(handler: Arc<RecordingHandler>, gateway: Arc<RecordingGateway>, resolver: Option<Arc<dyn TrackResolver>>) -> NodeContext {
    NodeContext {
        handler,
        gateway,
        resolver,
        settings: PlayerSettings::default(),
        reconnect: ReconnectPolicy::default(),
    }
}

/// A node whose connection is a channel the test reads from.
pub(crate) fn test_node() -> TestNode {
    build(None)
}

pub(crate) fn test_node_with_resolver(resolver: Arc<dyn TrackResolver>) -> TestNode {
    build(Some(resolver))
}

fn build(resolver: Option<Arc<dyn TrackResolver>>) -> TestNode {
    let handler = Arc::new(RecordingHandler::default());
    let gateway = Arc::new(RecordingGateway::default());

    let node = Node::new(1, &NodeBuilder::default(), BOT, context(Arc::clone(&handler), Arc::clone(&gateway), resolver));
    let (tx, rx) = mpsc::unbounded_channel();
    node.attach(tx);

    (node, rx, handler, gateway)
}

/// Everything sent so far, decoded.
pub(crate) fn frames(rx: &mut UnboundedReceiver<Message>) -> Vec<Value> {
    let mut sent = Vec::new();

    while let Ok(message) = rx.try_recv() {
        let text = message.into_text().unwrap();
        sent.push(serde_json::from_str(&text).unwrap());
    }

    sent
}

pub(crate) fn ops(frames: &[Value]) -> Vec<String> {
    frames.iter().map(|f| f["op"].as_str().unwrap_or_default().to_string()).collect()
}

/// Lets spawned tasks run until they park.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
