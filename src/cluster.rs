use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use dashmap::DashMap;
use tracing::info;
use crate::{
    builder::{NodeBuilder, PlayerSettings, ReconnectPolicy},
    error::{ClusterError, ClusterResult},
    events::EventHandler,
    model::{
        player::Player,
        voice::{VoiceServerUpdate, VoiceStateUpdate},
    },
    node::{Node, NodeContext},
    resolver::TrackResolver,
    types::{ChannelId, GuildId, UserId},
    voice::VoiceGateway,
};

/// Every node the bot talks to, and the players spread over them.
#[non_exhaustive]
pub struct Cluster {
    pub nodes: DashMap<u8, Arc<Node>>,
    user_id: UserId,
    context: NodeContext,
    node_counter: AtomicU8,
}

impl Cluster {
    pub fn builder<H: EventHandler, G: VoiceGateway>(user_id: impl Into<UserId>, handler: H, gateway: G) -> ClusterBuilder {
        ClusterBuilder::new(user_id, handler, gateway)
    }

    fn new(builder: ClusterBuilder) -> Arc<Self> {
        let cluster = Arc::new(Self {
            nodes: DashMap::new(),
            user_id: builder.user_id,
            context: builder.context,
            node_counter: AtomicU8::new(0),
        });

        for node in builder.nodes.iter() {
            cluster.insert_node(node);
        }

        cluster
    }

    fn insert_node(&self, builder: &NodeBuilder) -> Arc<Node> {
        let id = self.get_id();
        let node = Node::new(id, builder, self.user_id, self.context.clone());

        self.nodes.insert(id, Arc::clone(&node));

        info!("Node id {} added to cluster successfully", id);

        node
    }

    /// Adds a node at runtime and starts connecting it.
    pub fn add_node<F>(&self, func: F) -> Arc<Node>
    where
        F: FnOnce(&mut NodeBuilder) -> &mut NodeBuilder {
            let mut builder = NodeBuilder::default();

            func(&mut builder);

            let node = self.insert_node(&builder);
            Node::run(Arc::clone(&node));

            node
        }

    /// Removes a node, destroying its players and closing its connection.
    pub async fn remove_node(&self, id: u8) -> Option<Arc<Node>> {
        let (_, node) = self.nodes.remove(&id)?;

        node.shutdown().await;

        info!("Node id {} removed from cluster successfully", id);

        Some(node)
    }

    /// The connected node with the fewest players.
    pub fn best_node(&self) -> ClusterResult<Arc<Node>> {
        self.nodes
            .iter()
            .filter(|item| item.value().is_connected())
            .min_by_key(|item| (item.value().player_count(), *item.key()))
            .map(|item| Arc::clone(item.value()))
            .ok_or(ClusterError::CannotFindBestNode)
    }

    /// The node hosting the guild's player.
    pub fn player_node(&self, guild: impl Into<GuildId>) -> ClusterResult<Arc<Node>> {
        let guild = guild.into();

        self.nodes
            .iter()
            .find(|item| item.value().player(guild).is_some())
            .map(|item| Arc::clone(item.value()))
            .ok_or(ClusterError::CannotFindNode)
    }

    pub fn player(&self, guild: impl Into<GuildId>) -> Option<Arc<Player>> {
        let guild = guild.into();

        self.nodes.iter().find_map(|item| item.value().player(guild))
    }

    /// Returns the guild's player, creating it on the best node if needed.
    pub fn create_player(&self, guild: impl Into<GuildId>, text_channel: Option<ChannelId>) -> ClusterResult<Arc<Player>> {
        let guild = guild.into();

        if let Some(player) = self.player(guild) {
            return Ok(player);
        }

        Ok(self.best_node()?.create_player(guild, text_channel))
    }

    /// Creates the guild's player if needed and joins `voice_channel`.
    pub async fn connect(&self, guild: impl Into<GuildId>, voice_channel: ChannelId, text_channel: Option<ChannelId>) -> ClusterResult<Arc<Player>> {
        let player = self.create_player(guild, text_channel)?;

        player.connect(voice_channel).await?;

        Ok(player)
    }

    pub async fn disconnect(&self, guild: impl Into<GuildId>) -> ClusterResult<()> {
        let player = self.player(guild).ok_or(ClusterError::CannotFindNode)?;

        player.disconnect().await?;

        Ok(())
    }

    /// Feeds a voice state update from the gateway.
    pub fn voice_state_update(&self, update: &VoiceStateUpdate) {
        if let Ok(node) = self.player_node(update.guild_id) {
            node.voice_state_update(update);
        }
    }

    /// Feeds a voice server update from the gateway.
    pub fn voice_server_update(&self, update: &VoiceServerUpdate) {
        if let Ok(node) = self.player_node(update.guild_id) {
            node.voice_server_update(update);
        }
    }

    fn get_id(&self) -> u8 {
        self.node_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }
}

impl typemap_rev::TypeMapKey for Cluster {
    type Value = Arc<Cluster>;
}

pub struct ClusterBuilder {
    user_id: UserId,
    context: NodeContext,
    nodes: Vec<NodeBuilder>,
}

impl ClusterBuilder {
    pub fn new<H: EventHandler, G: VoiceGateway>(user_id: impl Into<UserId>, handler: H, gateway: G) -> Self {
        Self {
            user_id: user_id.into(),
            context: NodeContext {
                handler: Arc::new(handler),
                gateway: Arc::new(gateway),
                resolver: None,
                settings: PlayerSettings::default(),
                reconnect: ReconnectPolicy::default(),
            },
            nodes: Vec::new(),
        }
    }

    pub fn add_node<F>(&mut self, func: F) -> &mut Self
    where
        F: FnOnce(&mut NodeBuilder) -> &mut NodeBuilder {
            let mut builder = NodeBuilder::default();

            func(&mut builder);

            self.nodes.push(builder);

            self
        }

    pub fn reconnect_attempts(&mut self, attempts: u8) -> &mut Self {
        self.context.reconnect.attempts = attempts;

        self
    }

    pub fn reconnect_policy(&mut self, policy: ReconnectPolicy) -> &mut Self {
        self.context.reconnect = policy;

        self
    }

    pub fn player_settings(&mut self, settings: PlayerSettings) -> &mut Self {
        self.context.settings = settings;

        self
    }

    /// Replaces the node search used to resolve foreign references.
    pub fn resolver<R: TrackResolver>(&mut self, resolver: R) -> &mut Self {
        self.context.resolver = Some(Arc::new(resolver));

        self
    }

    /// Builds the cluster and starts connecting every node.
    pub fn build(self) -> Arc<Cluster> {
        let cluster = Cluster::new(self);

        for item in cluster.nodes.iter() {
            Node::run(Arc::clone(item.value()));
        }

        cluster
    }
}
