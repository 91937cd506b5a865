use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::{timeout, Instant},
};
use tracing::{debug, info, warn};
use tracing_futures::Instrument;

use super::{
    Codes,
    events::{Band, Equalize, Pause, Play, Seek, VoiceUpdate, Volume},
    gateway::{NodeEvent, PlayerEvent, WebSocketClosed},
    queue::{LoopMode, Queue},
    track::Track,
    voice::{VoiceServerUpdate, VoiceSessionState, VoiceStateUpdate},
};
use crate::{
    error::{LinkError, LinkResult},
    events::{process, EventType, PlayerNotice},
    node::Node,
    resolver::TrackResolver,
    types::{ChannelId, GuildId},
};

pub const MAX_VOLUME: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Nothing is playing.
    Idle,
    /// Voice join requested, the handshake has not reached the node yet.
    Connecting,
    /// `play` was sent, waiting for the node to start the track.
    AwaitingPlayback,
    Playing,
    Paused,
    Destroyed,
}

/// Last position the node reported and when it arrived.
#[derive(Debug, Clone, Copy)]
pub struct PositionSnapshot {
    pub position: u64,
    pub at: Instant,
}

/// What applying an event means for the playback loop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Started,
    Ended { finished: bool },
    Exception(String),
    Stuck(u64),
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    Started,
    Ended { finished: bool },
}

#[derive(Debug)]
pub struct PlayerState {
    pub status: PlayerStatus,
    pub voice_channel: Option<ChannelId>,
    pub text_channel: Option<ChannelId>,
    pub current: Option<Arc<Track>>,
    pub paused: bool,
    pub volume: u16,
    pub snapshot: PositionSnapshot,
    pub voice: VoiceSessionState,
}

impl PlayerState {
    pub fn new(text_channel: Option<ChannelId>, now: Instant) -> Self {
        Self {
            status: PlayerStatus::Idle,
            voice_channel: None,
            text_channel,
            current: None,
            paused: false,
            volume: 100,
            snapshot: PositionSnapshot { position: 0, at: now },
            voice: VoiceSessionState::new(),
        }
    }

    /// Playback position in milliseconds as of `now`.
    ///
    /// Past the end of the track this is 0, the end event is on its way.
    pub fn position_at(&self, now: Instant) -> u64 {
        let length = match &self.current {
            Some(track) => track.length(),
            None => return 0,
        };

        if self.paused {
            return self.snapshot.position.min(length);
        }

        let elapsed = now.saturating_duration_since(self.snapshot.at).as_millis() as u64;
        let position = self.snapshot.position.saturating_add(elapsed);

        if position > length { 0 } else { position }
    }

    fn is_current(&self, track: &str) -> bool {
        self.current.as_ref().map_or(false, |t| t.is(track))
    }

    fn start(&mut self, track: Arc<Track>, position: u64, now: Instant) {
        self.current = Some(track);
        self.snapshot = PositionSnapshot { position, at: now };
        self.status = PlayerStatus::AwaitingPlayback;
    }

    fn finish(&mut self) -> Option<Arc<Track>> {
        if self.status != PlayerStatus::Connecting {
            self.status = PlayerStatus::Idle;
        }

        self.current.take()
    }

    fn destroyed(&mut self) {
        self.status = PlayerStatus::Destroyed;
        self.current = None;
        self.voice_channel = None;
        self.voice.clear();
    }

    /// Applies a node event, ignoring anything about a track other than the current one.
    pub(crate) fn apply(&mut self, event: &PlayerEvent, now: Instant) -> Option<Outcome> {
        if self.status == PlayerStatus::Destroyed {
            return None;
        }

        let event = match event {
            PlayerEvent::Update(state) => {
                self.snapshot = PositionSnapshot { position: state.position, at: now };
                return None;
            },
            PlayerEvent::Event(event) => event,
        };

        match event {
            NodeEvent::TrackStartEvent(e) if self.is_current(&e.track) => {
                self.status = if self.paused { PlayerStatus::Paused } else { PlayerStatus::Playing };
                Some(Outcome::Started)
            },
            NodeEvent::TrackEndEvent(e) if self.is_current(&e.track) && !e.reason.is_local() => {
                self.finish();
                Some(Outcome::Ended { finished: e.reason.is_natural() })
            },
            NodeEvent::TrackExceptionEvent(e) if self.is_current(&e.track) => Some(Outcome::Exception(e.message())),
            NodeEvent::TrackStuckEvent(e) if self.is_current(&e.track) => Some(Outcome::Stuck(e.threshold_ms)),
            NodeEvent::WebSocketClosedEvent(e) if e.code == WebSocketClosed::DISCONNECTED => Some(Outcome::Disconnected),
            _ => None,
        }
    }
}

/// Playback state of one guild on one node.
pub struct Player {
    guild: GuildId,
    node: Arc<Node>,
    state: Mutex<PlayerState>,
    queue: Queue,
    signals: UnboundedSender<Signal>,
    receiver: Mutex<Option<UnboundedReceiver<Signal>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    pub(crate) fn new(node: Arc<Node>, guild: GuildId, text_channel: Option<ChannelId>) -> Arc<Self> {
        let (signals, receiver) = mpsc::unbounded_channel();

        Arc::new(Self {
            guild,
            node,
            state: Mutex::new(PlayerState::new(text_channel, Instant::now())),
            queue: Queue::new(),
            signals,
            receiver: Mutex::new(Some(receiver)),
            task: Mutex::new(None),
        })
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn status(&self) -> PlayerStatus {
        self.state.lock().status
    }

    pub fn current(&self) -> Option<Arc<Track>> {
        self.state.lock().current.clone()
    }

    pub fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.voice_channel.is_some() && state.current.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn volume(&self) -> u16 {
        self.state.lock().volume
    }

    pub fn voice_channel(&self) -> Option<ChannelId> {
        self.state.lock().voice_channel
    }

    pub fn text_channel(&self) -> Option<ChannelId> {
        self.state.lock().text_channel
    }

    pub fn set_text_channel(&self, channel: Option<ChannelId>) {
        self.state.lock().text_channel = channel;
    }

    /// Current playback position in milliseconds.
    pub fn position(&self) -> u64 {
        self.state.lock().position_at(Instant::now())
    }

    pub fn enqueue(&self, track: Track) -> LinkResult<Arc<Track>> {
        self.alive()?;

        let track = Arc::new(track);
        self.queue.push(Arc::clone(&track));

        Ok(track)
    }

    pub fn enqueue_all(&self, tracks: impl IntoIterator<Item = Track>) -> LinkResult<usize> {
        self.alive()?;

        let mut count = 0;
        for track in tracks {
            self.queue.push(Arc::new(track));
            count += 1;
        }

        Ok(count)
    }

    /// Joins `channel` and starts the playback loop if it is not running yet.
    pub async fn connect(self: &Arc<Self>, channel: ChannelId) -> LinkResult<()> {
        {
            let mut state = self.state.lock();
            if state.status == PlayerStatus::Destroyed {
                return Err(LinkError::PlayerDestroyed);
            }

            state.voice_channel = Some(channel);
            if state.status == PlayerStatus::Idle {
                state.status = PlayerStatus::Connecting;
            }
        }

        info!("Joining channel {} on guild {}", channel, self.guild);
        self.node.context.gateway.join(self.guild, channel).await;

        self.alive()?;

        let receiver = self.receiver.lock().take();
        if let Some(receiver) = receiver {
            let span = tracing::info_span!("player", guild = self.guild.0);
            let task = tokio::spawn(Arc::clone(self).run(receiver).instrument(span));

            *self.task.lock() = Some(task);
        }

        Ok(())
    }

    /// Leaving voice ends the player, it is destroyed.
    pub async fn disconnect(&self) -> LinkResult<()> {
        self.destroy().await
    }

    /// Stops the loop, releases the node side player and leaves voice.
    pub async fn destroy(&self) -> LinkResult<()> {
        {
            let mut state = self.state.lock();
            if state.status == PlayerStatus::Destroyed {
                return Err(LinkError::PlayerDestroyed);
            }

            state.destroyed();
        }

        if let Some(task) = self.task.lock().take() {
            task.abort();
        }

        self.teardown().await;

        Ok(())
    }

    async fn teardown(&self) {
        self.node.remove_player(self);
        self.queue.clear();

        if self.node.is_connected() {
            if let Err(why) = self.node.send(self.guild, Codes::Stop) {
                warn!("Failed to stop guild {} while destroying it: {}", self.guild, why);
            }
            if let Err(why) = self.node.send(self.guild, Codes::Destroy) {
                warn!("Failed to destroy guild {} on the node: {}", self.guild, why);
            }
        }

        self.node.context.gateway.leave(self.guild).await;

        info!("Player for guild {} destroyed", self.guild);
    }

    /// Sends `play` for `track`, replacing whatever is playing.
    ///
    /// `start` and `end` are only honoured inside the track's bounds.
    pub fn play(&self, track: Arc<Track>, start: Option<u64>, end: Option<u64>) -> LinkResult<()> {
        if track.requires_resolution() {
            return Err(LinkError::ResolutionFailure(format!("`{}` has to be resolved before playing", track.title())));
        }

        let length = track.length();
        let within = |time: u64| time > 0 && time < length;

        let payload = Play {
            track: track.track_id.clone(),
            no_replace: false,
            start_time: start.filter(|t| within(*t)),
            end_time: end.filter(|t| within(*t)),
        };
        let position = payload.start_time.unwrap_or(0);

        let mut state = self.lock_alive()?;
        self.node.send(self.guild, Codes::Play(payload))?;
        state.start(track, position, Instant::now());

        Ok(())
    }

    /// Stops the current track, the loop moves on to the next one.
    pub fn stop(&self) -> LinkResult<()> {
        self.skip().map(|_| ())
    }

    /// Like [`stop`](Self::stop), returning the track that was cut off.
    pub fn skip(&self) -> LinkResult<Option<Arc<Track>>> {
        let mut state = self.lock_alive()?;
        self.node.send(self.guild, Codes::Stop)?;

        let stopped = state.finish();
        if stopped.is_some() {
            let _ = self.signals.send(Signal::Ended { finished: false });
        }

        Ok(stopped)
    }

    /// Seeks the current track, does nothing when idle.
    pub fn set_position(&self, position: u64) -> LinkResult<()> {
        let mut state = self.lock_alive()?;

        let length = match &state.current {
            Some(track) => track.length(),
            None => return Ok(()),
        };

        self.node.send(self.guild, Codes::Seek(Seek { position }))?;
        state.snapshot = PositionSnapshot { position: position.min(length), at: Instant::now() };

        Ok(())
    }

    /// Volume is clamped to 0-1000, 100 being unchanged.
    pub fn set_volume(&self, volume: u16) -> LinkResult<()> {
        let volume = volume.min(MAX_VOLUME);

        let mut state = self.lock_alive()?;
        self.node.send(self.guild, Codes::Volume(Volume { volume }))?;
        state.volume = volume;

        Ok(())
    }

    pub fn set_pause(&self, pause: bool) -> LinkResult<()> {
        let mut state = self.lock_alive()?;
        self.node.send(self.guild, Codes::Pause(Pause { pause }))?;

        let now = Instant::now();
        let position = state.position_at(now);
        state.snapshot = PositionSnapshot { position, at: now };
        state.paused = pause;

        state.status = match state.status {
            PlayerStatus::Playing | PlayerStatus::Paused if pause => PlayerStatus::Paused,
            PlayerStatus::Playing | PlayerStatus::Paused => PlayerStatus::Playing,
            other => other,
        };

        Ok(())
    }

    pub fn set_equalizer(&self, bands: Vec<Band>) -> LinkResult<()> {
        let _state = self.lock_alive()?;

        self.node.send(self.guild, Codes::Equalize(Equalize { bands }))
    }

    pub fn reset_equalizer(&self) -> LinkResult<()> {
        self.set_equalizer(Band::flat())
    }

    pub fn on_voice_server_update(&self, update: &VoiceServerUpdate) {
        let mut state = self.state.lock();
        if state.status == PlayerStatus::Destroyed {
            return;
        }

        if let Some(handshake) = state.voice.on_server_update(self.guild, update) {
            self.dispatch_voice_update(&mut state, handshake);
        }
    }

    pub fn on_voice_state_update(&self, update: &VoiceStateUpdate) {
        let mut state = self.state.lock();
        if state.status == PlayerStatus::Destroyed {
            return;
        }

        let handshake = state.voice.on_state_update(update);

        if update.channel_id.is_none() {
            if state.voice_channel.take().is_some() {
                warn!("Guild {} was disconnected from voice", self.guild);
                self.notify_locked(&state, PlayerNotice::ForcedDisconnect);
            }
            return;
        }

        state.voice_channel = update.channel_id;

        if let Some(handshake) = handshake {
            self.dispatch_voice_update(&mut state, handshake);
        }
    }

    fn dispatch_voice_update(&self, state: &mut PlayerState, handshake: VoiceUpdate) {
        match self.node.send(self.guild, Codes::VoiceUpdate(handshake)) {
            Ok(()) => {
                if state.status == PlayerStatus::Connecting {
                    state.status = PlayerStatus::Idle;
                }
            },
            Err(why) => warn!("Failed to send voice update for guild {}: {}", self.guild, why),
        }
    }

    /// Applies an event relayed by the node.
    pub(crate) fn handle_event(self: &Arc<Self>, event: PlayerEvent) {
        let (outcome, title) = {
            let mut state = self.state.lock();
            let title = state.current.as_ref().map(|t| t.title().to_string()).unwrap_or_default();

            (state.apply(&event, Instant::now()), title)
        };

        match outcome {
            None => (),
            Some(Outcome::Started) => {
                let _ = self.signals.send(Signal::Started);
            },
            Some(Outcome::Ended { finished }) => {
                let _ = self.signals.send(Signal::Ended { finished });
            },
            Some(Outcome::Exception(message)) => {
                self.notify(PlayerNotice::TrackException { title, message });
            },
            Some(Outcome::Stuck(threshold_ms)) => {
                self.notify(PlayerNotice::TrackStuck { title, threshold_ms });

                if let Err(why) = self.stop() {
                    warn!("Failed to skip stuck track on guild {}: {}", self.guild, why);
                }
            },
            Some(Outcome::Disconnected) => {
                self.notify(PlayerNotice::ForcedDisconnect);

                let player = Arc::clone(self);
                tokio::spawn(async move {
                    let _ = player.destroy().await;
                });
            },
        }
    }

    fn notify(&self, notice: PlayerNotice) {
        let state = self.state.lock();
        self.notify_locked(&state, notice);
    }

    fn notify_locked(&self, state: &PlayerState, notice: PlayerNotice) {
        debug!("Guild {}: {}", self.guild, notice);

        process(
            Arc::clone(&self.node),
            Arc::clone(&self.node.context.handler),
            EventType::Notice { guild: self.guild, channel: state.text_channel, notice },
        );
    }

    fn alive(&self) -> LinkResult<()> {
        self.lock_alive().map(|_| ())
    }

    fn lock_alive(&self) -> LinkResult<parking_lot::MutexGuard<'_, PlayerState>> {
        let state = self.state.lock();

        if state.status == PlayerStatus::Destroyed {
            return Err(LinkError::PlayerDestroyed);
        }

        Ok(state)
    }

    async fn resolve(&self, reference: &Track) -> LinkResult<Arc<Track>> {
        let resolved = match &self.node.context.resolver {
            Some(resolver) => resolver.resolve(reference).await?,
            None => self.node.resolve(reference).await?,
        };

        resolved.into_iter()
            .find(|t| !t.requires_resolution())
            .map(Arc::new)
            .ok_or_else(|| LinkError::ResolutionFailure("no playable results".to_string()))
    }

    /// Gives up on `track` if it is still the current one.
    fn abandon(&self, track: &Arc<Track>) {
        let mut state = self.state.lock();

        if state.current.as_ref().map_or(false, |c| Arc::ptr_eq(c, track)) {
            state.finish();
        }
    }

    async fn run(self: Arc<Self>, mut signals: UnboundedReceiver<Signal>) {
        let settings = self.node.context.settings;

        loop {
            let track = match timeout(settings.idle_timeout, self.queue.pop()).await {
                Ok(track) => track,
                Err(_) => {
                    self.notify(PlayerNotice::IdleTimeout(settings.idle_timeout));
                    self.idle_out().await;
                    break;
                }
            };

            let track = if track.requires_resolution() {
                match self.resolve(&track).await {
                    Ok(resolved) => resolved,
                    Err(why) => {
                        self.notify(PlayerNotice::ResolutionFailed { title: track.title().to_string(), reason: why.to_string() });
                        continue;
                    }
                }
            } else {
                track
            };

            while signals.try_recv().is_ok() {}

            if let Err(why) = self.play(Arc::clone(&track), None, None) {
                if let LinkError::PlayerDestroyed = why {
                    break;
                }

                self.notify(PlayerNotice::CommandFailed { reason: why.to_string() });
                continue;
            }

            match timeout(settings.start_timeout, signals.recv()).await {
                Ok(Some(Signal::Started)) => (),
                Ok(Some(Signal::Ended { .. })) => continue,
                Ok(None) => break,
                Err(_) => {
                    self.notify(PlayerNotice::PlaybackFailed { title: track.title().to_string() });
                    self.abandon(&track);
                    continue;
                }
            }

            let finished = loop {
                match signals.recv().await {
                    Some(Signal::Ended { finished }) => break finished,
                    Some(Signal::Started) => continue,
                    None => return,
                }
            };

            if finished && self.queue.loop_mode() == LoopMode::Track {
                self.queue.push_front(track);
            }
        }
    }

    async fn idle_out(&self) {
        {
            let mut state = self.state.lock();
            if state.status == PlayerStatus::Destroyed {
                return;
            }

            state.destroyed();
        }

        // This runs inside the loop task itself, there is nothing to abort.
        drop(self.task.lock().take());

        self.teardown().await;
    }
}
