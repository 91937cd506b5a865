use async_trait::async_trait;

use crate::types::{ChannelId, GuildId};

/// The bot's gateway connection, only used to move the bot in and out of voice.
///
/// After a `join`, the gateway is expected to hand the resulting voice state and
/// voice server updates to [`Cluster::voice_state_update`] and
/// [`Cluster::voice_server_update`].
///
/// [`Cluster::voice_state_update`]: crate::cluster::Cluster::voice_state_update
/// [`Cluster::voice_server_update`]: crate::cluster::Cluster::voice_server_update
#[async_trait]
pub trait VoiceGateway: Send + Sync + 'static {
    /// Requests joining `channel`, self deafened.
    async fn join(&self, guild: GuildId, channel: ChannelId);
    /// Requests leaving whatever voice channel the bot is in on `guild`.
    async fn leave(&self, guild: GuildId);
}
