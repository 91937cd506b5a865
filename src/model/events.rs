use serde::{Serialize, Deserialize};

/// The server half of the voice handshake, forwarded verbatim to the node.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub token: String,
    pub endpoint: String,
    pub guild_id: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub track: String,
    pub no_replace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceUpdate {
    pub session_id: String,
    pub event: Event
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub volume: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seek {
    pub position: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pause {
    pub pause: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equalize {
    pub bands: Vec<Band>,
}

/// There are 15 bands (0-14).
/// The gain is a multiplier for the given band, valid values range from -0.25 to 1.0,
/// where -0.25 mutes the band and 0.25 doubles it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub band: u8,
    pub gain: f64,
}

impl Band {
    pub const COUNT: u8 = 15;

    pub fn new(band: u8, gain: f64) -> Self {
        Self {
            band: band.min(Self::COUNT - 1),
            gain: gain.max(-0.25).min(1.0),
        }
    }

    /// All bands at gain 0.
    pub fn flat() -> Vec<Band> {
        (0..Self::COUNT).map(|band| Band { band, gain: 0. }).collect()
    }
}
