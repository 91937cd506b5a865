pub mod events;
pub mod track;
pub mod gateway;
pub mod player;
pub mod queue;
pub mod voice;

use serde::Serialize;

use events::*;
use crate::types::GuildId;
use crate::error::LinkResult;

/// Operations sent to the node, tagged by their `op` field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Codes {
    //Destroy the player
    Destroy,
    //Equalize the player
    #[serde(rename = "equalizer")]
    Equalize(Equalize),
    //Pause the player
    Pause(Pause),
    //Play a track
    Play(Play),
    //Seek to a given position
    Seek(Seek),
    //Stop a player
    Stop,
    //Player connects to a given channel
    VoiceUpdate(VoiceUpdate),
    //Change the player's volume
    Volume(Volume)
}

impl Codes {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Destroy => "destroy",
            Self::Equalize(_) => "equalizer",
            Self::Pause(_) => "pause",
            Self::Play(_) => "play",
            Self::Seek(_) => "seek",
            Self::Stop => "stop",
            Self::VoiceUpdate(_) => "voiceUpdate",
            Self::Volume(_) => "volume",
        }
    }

    /// Serializes the operation for the given guild into a websocket text payload.
    pub fn encode(&self, guild_id: GuildId) -> LinkResult<String> {
        let envelope = Outgoing {
            code: self,
            guild_id: guild_id.0.to_string(),
        };

        Ok(serde_json::to_string(&envelope)?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Outgoing<'a> {
    #[serde(flatten)]
    code: &'a Codes,
    guild_id: String,
}
