use lazy_static::lazy_static;
use reqwest::{Client as HttpClient, Url};
use crate::{
    builder::{NodeBuilder, PlayerSettings, ReconnectPolicy},
    error::{LinkError, LinkResult},
    events::{process, EventHandler, EventType},
    model::{
        Codes,
        gateway::{IncomingMessage, PlayerEvent, Stats},
        player::Player,
        track::{LoadType, Tracks},
        voice::{VoiceServerUpdate, VoiceStateUpdate},
    },
    resolver::TrackResolver,
    types::{ChannelId, GuildId, UserId},
    voice::VoiceGateway,
};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, trace, warn};
use tracing_futures::Instrument;
use http::Request;
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    task::JoinHandle,
};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use regex::Regex;

lazy_static!(
    static ref URL_REGEX: Regex = Regex::new(r"https?://(?:www\.)?.+").unwrap();
);

/// Collaborators and settings every node of a cluster shares.
#[derive(Clone)]
pub(crate) struct NodeContext {
    pub(crate) handler: Arc<dyn EventHandler>,
    pub(crate) gateway: Arc<dyn VoiceGateway>,
    pub(crate) resolver: Option<Arc<dyn TrackResolver>>,
    pub(crate) settings: PlayerSettings,
    pub(crate) reconnect: ReconnectPolicy,
}

/// One control connection to an audio node and the players living on it.
pub struct Node {
    id: u8,
    user_id: UserId,
    rest_url: String,
    socket_url: String,
    pass: String,
    shards: u64,
    http: HttpClient,
    sender: RwLock<Option<UnboundedSender<TungsteniteMessage>>>,
    players: DashMap<GuildId, Arc<Player>>,
    stats: RwLock<Option<Stats>>,
    task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) context: NodeContext,
}

impl Node {
    pub(crate) fn new(id: u8, builder: &NodeBuilder, user_id: UserId, context: NodeContext) -> Arc<Self> {
        Arc::new(Self {
            id,
            user_id: builder.id.unwrap_or(user_id),
            rest_url: builder.rest_url(),
            socket_url: builder.socket_url(),
            pass: builder.pass.clone(),
            shards: builder.shards,
            http: HttpClient::new(),
            sender: RwLock::new(None),
            players: DashMap::new(),
            stats: RwLock::new(None),
            task: Mutex::new(None),
            context,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether there is a live connection; while there isn't, every command fails fast.
    pub fn is_connected(&self) -> bool {
        self.sender.read().as_ref().map_or(false, |tx| !tx.is_closed())
    }

    /// Last statistics reported by the node.
    pub fn stats(&self) -> Option<Stats> {
        self.stats.read().clone()
    }

    pub fn player(&self, guild: impl Into<GuildId>) -> Option<Arc<Player>> {
        self.players.get(&guild.into()).map(|p| Arc::clone(p.value()))
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|p| Arc::clone(p.value())).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Returns the guild's player, creating it on this node if there is none yet.
    pub fn create_player(self: &Arc<Self>, guild: impl Into<GuildId>, text_channel: Option<ChannelId>) -> Arc<Player> {
        let guild = guild.into();

        let player = self.players
            .entry(guild)
            .or_insert_with(|| Player::new(Arc::clone(self), guild, text_channel));

        Arc::clone(player.value())
    }

    /// Forgets `player`, unless the guild already has a newer one.
    pub(crate) fn remove_player(&self, player: &Player) {
        self.players.remove_if(&player.guild(), |_, existing| std::ptr::eq(existing.as_ref(), player));
    }

    /// Encodes `code` for `guild` and queues it on the connection.
    pub fn send(&self, guild: impl Into<GuildId>, code: Codes) -> LinkResult<()> {
        let guild = guild.into();
        let payload = code.encode(guild)?;

        let sender = self.sender.read();
        let tx = sender.as_ref().ok_or(LinkError::NodeUnavailable)?;

        tx.send(TungsteniteMessage::text(payload)).map_err(|_| LinkError::NodeUnavailable)?;

        debug!("Node id {} sent `{}` for guild {}", self.id, code.name(), guild);

        Ok(())
    }

    pub(crate) fn attach(&self, tx: UnboundedSender<TungsteniteMessage>) {
        *self.sender.write() = Some(tx);
    }

    pub(crate) fn detach(&self) {
        *self.sender.write() = None;
    }

    /// Routes one text frame from the node.
    pub fn dispatch_incoming(self: &Arc<Self>, text: &str) {
        let message = match serde_json::from_str::<IncomingMessage>(text) {
            Ok(message) => message,
            Err(why) => {
                debug!("Node id {} sent an undecodable payload ({}): {}", self.id, why, text);
                return;
            }
        };

        match message {
            IncomingMessage::Stats(stats) => {
                *self.stats.write() = Some(stats.clone());

                process(Arc::clone(self), Arc::clone(&self.context.handler), EventType::Stats(stats));
            },
            IncomingMessage::PlayerUpdate(update) => {
                let player = match self.player(update.guild_id) {
                    Some(player) => player,
                    None => {
                        trace!("Dropping player update for unknown guild {}", update.guild_id);
                        return;
                    }
                };

                player.handle_event(PlayerEvent::Update(update.state));

                process(Arc::clone(self), Arc::clone(&self.context.handler), EventType::PlayerUpdate(update));
            },
            IncomingMessage::Event(event) => {
                let guild = match event.guild_id() {
                    Some(guild) => guild,
                    None => return,
                };

                let player = match self.player(guild) {
                    Some(player) => player,
                    None => {
                        trace!("Dropping event for unknown guild {}", guild);
                        return;
                    }
                };

                player.handle_event(PlayerEvent::Event(event.clone()));

                process(Arc::clone(self), Arc::clone(&self.context.handler), EventType::Node(event));
            },
            IncomingMessage::Unknown => (),
        }
    }

    /// Hands a gateway voice state to the guild's player, if it is about the bot.
    pub fn voice_state_update(&self, update: &VoiceStateUpdate) {
        if update.user_id != self.user_id {
            return;
        }

        if let Some(player) = self.player(update.guild_id) {
            player.on_voice_state_update(update);
        }
    }

    pub fn voice_server_update(&self, update: &VoiceServerUpdate) {
        if let Some(player) = self.player(update.guild_id) {
            player.on_voice_server_update(update);
        }
    }

    fn ws_request(&self) -> Result<Request<()>, http::Error> {
        Request::builder()
            .uri(&self.socket_url)
            .header("Authorization", &self.pass)
            .header("Num-Shards", &self.shards.to_string())
            .header("User-Id", &self.user_id.to_string())
            .body(())
    }

    /// Spawns the connection task, reconnecting with backoff until the attempts run out.
    ///
    /// A previous connection task of this node is aborted.
    pub fn run(node: Arc<Self>) {
        let span = tracing::info_span!("node", id = node.id);
        let task_node = Arc::clone(&node);

        let task = tokio::spawn(async move {
            let node = task_node;
            let policy = node.context.reconnect;
            let mut failures = 0u8;

            while failures < policy.attempts {
                info!("Node id {} trying to connect to server, attempt {}", node.id, failures + 1);

                let request = match node.ws_request() {
                    Ok(request) => request,
                    Err(why) => {
                        error!("Node id {} has an invalid connection request: {}", node.id, why);
                        return;
                    }
                };

                let stream = match tokio_tungstenite::connect_async(request).await {
                    Ok((stream, _)) => stream,
                    Err(why) => {
                        failures += 1;
                        let delay = policy.delay(failures);

                        warn!("Node id {} failed to connect to server (attempt {}/{}): {}, waiting {:?} before reconnecting", node.id, failures, policy.attempts, why, delay);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                };

                info!("Node id {} connected successfully to server", node.id);
                failures = 0;

                let (mut write, mut read) = stream.split();
                let (tx, mut rx) = mpsc::unbounded_channel();

                let writer = tokio::spawn(async move {
                    while let Some(message) = rx.recv().await {
                        if let Err(why) = write.send(message).await {
                            warn!("Error while sending payload: {}", why);
                            break;
                        }
                    }
                }.in_current_span());

                node.attach(tx);

                while let Some(Ok(msg)) = read.next().await {
                    match msg {
                        TungsteniteMessage::Text(t) => node.dispatch_incoming(&t),
                        TungsteniteMessage::Close(_) => break,
                        _ => ()
                    }
                }

                node.detach();
                writer.abort();

                warn!("Node id {} lost its connection, {} players are stalled until it reconnects", node.id, node.player_count());
            }

            info!("Node id {} reached max connection attempts, giving up", node.id);
        }.instrument(span));

        node.set_task(task);
    }

    pub(crate) fn set_task(&self, task: JoinHandle<()>) {
        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Destroys every player on this node and closes its connection for good.
    pub async fn shutdown(&self) {
        for player in self.players() {
            if let Err(why) = player.destroy().await {
                debug!("Player for guild {} was already gone: {}", player.guild(), why);
            }
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
        }

        self.detach();

        info!("Node id {} shut down", self.id);
    }

    /// Loads tracks for an identifier, a url or a prefixed search such as `ytsearch:`.
    pub async fn get_tracks<Q: ToString>(&self, query: Q) -> LinkResult<Tracks> {
        if !self.is_connected() {
            return Err(LinkError::NodeUnavailable);
        }

        let query = query.to_string();
        let url = Url::parse_with_params(&format!("{}/loadtracks", self.rest_url), &[("identifier", &query)])
            .map_err(|why| LinkError::SearchError(why.to_string()))?;

        let request = self.http.get(url).header("Authorization", &self.pass);

        let response = tokio::time::timeout(self.context.settings.search_timeout, async move {
            request.send()
                .await?
                .error_for_status()?
                .json::<Tracks>()
                .await
        }).await??;

        match response.load_type {
            LoadType::LoadFailed => Err(LinkError::SearchError(
                response.exception.map(|e| e.message).unwrap_or_else(|| format!("failed to load `{}`", query))
            )),
            LoadType::NoMatches => Err(LinkError::SearchError(format!("no matches for `{}`", query))),
            _ => Ok(response),
        }
    }

    /// Urls are loaded as they are, anything else is searched on YouTube.
    pub async fn auto_search<Q: ToString>(&self, query: Q) -> LinkResult<Tracks> {
        let query = query.to_string();

        if URL_REGEX.is_match(&query) {
            self.get_tracks(query).await
        } else {
            self.get_tracks(format!("ytsearch:{}", query)).await
        }
    }
}
