use serde::{
    Serialize,
    Deserialize
};
use crate::types::{UserId, ChannelId};

/// Raw answer of the node's `loadtracks` route.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    #[serde(default)]
    pub playlist_info: PlaylistInfo,
    pub load_type: LoadType,
    #[serde(default)]
    pub tracks: Vec<LoadedTrack>,
    pub exception: Option<Exception>
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadType {
    TrackLoaded,
    PlaylistLoaded,
    SearchResult,
    NoMatches,
    LoadFailed,
}

impl Default for LoadType {
    fn default() -> Self {
        Self::NoMatches
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct LoadedTrack {
    pub track: String,
    pub info: TrackInfo
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    pub uri: String,
    #[serde(default)]
    pub source_name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub message: String,
    pub severity: String
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PlaylistInfo {
    pub name: Option<String>,
    #[serde(rename = "selectedTrack")]
    pub selected_track: Option<i64>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    Youtube,
    Soundcloud,
    Spotify,
    Twitch,
    Http,
    Other(String),
}

impl TrackSource {
    /// Prefers the node reported source name and falls back to the uri host.
    pub fn detect(source_name: Option<&str>, uri: &str) -> Self {
        if let Some(name) = source_name {
            return match name {
                "youtube" => Self::Youtube,
                "soundcloud" => Self::Soundcloud,
                "spotify" => Self::Spotify,
                "twitch" => Self::Twitch,
                "http" => Self::Http,
                other => Self::Other(other.to_string()),
            };
        }

        if uri.contains("youtube.com") || uri.contains("youtu.be") {
            Self::Youtube
        } else if uri.contains("soundcloud.com") {
            Self::Soundcloud
        } else if uri.contains("spotify.com") || uri.starts_with("spotify:") {
            Self::Spotify
        } else if uri.contains("twitch.tv") {
            Self::Twitch
        } else {
            Self::Http
        }
    }
}

impl std::fmt::Display for TrackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Youtube => write!(f, "Youtube"),
            Self::Soundcloud => write!(f, "Soundcloud"),
            Self::Spotify => write!(f, "Spotify"),
            Self::Twitch => write!(f, "Twitch"),
            Self::Http => write!(f, "Http"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A playable (or resolvable) track. Shared behind an `Arc` once created.
#[derive(Debug, Clone)]
pub struct Track {
    /// Identifier issued by the node, empty for references that still need resolving.
    pub track_id: String,
    pub info: TrackInfo,
    pub source: TrackSource,
    pub thumbnail: Option<String>,
    pub requester: Option<TrackRequester>,
    /// Text channel the request came from.
    pub context: Option<ChannelId>,
}

impl Track {
    pub fn from_loaded(loaded: LoadedTrack, requester: Option<TrackRequester>, context: Option<ChannelId>) -> Self {
        let source = TrackSource::detect(loaded.info.source_name.as_deref(), &loaded.info.uri);
        let thumbnail = match source {
            TrackSource::Youtube => Some(format!("https://img.youtube.com/vi/{}/mqdefault.jpg", loaded.info.identifier)),
            _ => None,
        };

        Self {
            track_id: loaded.track,
            info: loaded.info,
            source,
            thumbnail,
            requester,
            context,
        }
    }

    /// A catalog entry from a foreign service, it has to be resolved before the node can play it.
    pub fn reference(info: TrackInfo, source: TrackSource, thumbnail: Option<String>) -> Self {
        Self {
            track_id: String::new(),
            info,
            source,
            thumbnail,
            requester: None,
            context: None,
        }
    }

    pub fn with_requester(mut self, requester: impl Into<TrackRequester>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    pub fn with_context(mut self, channel: impl Into<ChannelId>) -> Self {
        self.context = Some(channel.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn author(&self) -> &str {
        &self.info.author
    }

    pub fn uri(&self) -> &str {
        &self.info.uri
    }

    /// Length in milliseconds.
    pub fn length(&self) -> u64 {
        self.info.length
    }

    pub fn requires_resolution(&self) -> bool {
        self.track_id.is_empty() || self.source == TrackSource::Spotify
    }

    /// Whether a node event about `track` refers to this track.
    pub fn is(&self, track: &str) -> bool {
        !self.track_id.is_empty() && self.track_id == track
    }
}

#[derive(Debug, Clone)]
pub enum TrackSearch<'a> {
    Youtube(&'a str),
    Soundcloud(&'a str),
    Url(&'a str)
}

impl std::fmt::Display for TrackSearch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Youtube(query) => write!(f, "ytsearch:{}", query),
            Self::Soundcloud(query) => write!(f, "scsearch:{}", query),
            Self::Url(url) => write!(f, "{}", url)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequester {
    pub id: Option<UserId>,
    pub name: Option<String>
}

impl From<UserId> for TrackRequester {
    fn from(id: UserId) -> TrackRequester {
        TrackRequester{id: Some(id), name: None}
    }
}

impl From<String> for TrackRequester {
    fn from(name: String) -> TrackRequester {
        TrackRequester{id: None, name: Some(name)}
    }
}

impl From<(UserId, String)> for TrackRequester {
    fn from(data: (UserId, String)) -> TrackRequester {
        TrackRequester {id: Some(data.0), name: Some(data.1)}
    }
}

impl From<(u64, String)> for TrackRequester {
    fn from(data: (u64, String)) -> TrackRequester {
        TrackRequester{id: Some(UserId::from(data.0)), name: Some(data.1)}
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(id: &str, length: u64) -> Track {
        Track::from_loaded(
            LoadedTrack {
                track: id.to_string(),
                info: TrackInfo {
                    identifier: format!("{}-ident", id),
                    is_seekable: true,
                    author: "author".to_string(),
                    length,
                    is_stream: false,
                    position: 0,
                    title: format!("title {}", id),
                    uri: format!("https://www.youtube.com/watch?v={}", id),
                    source_name: None,
                },
            },
            None,
            None,
        )
    }

    #[test]
    fn loaded_youtube_track_gets_thumbnail() {
        let t = track("abc", 1000);

        assert_eq!(t.source, TrackSource::Youtube);
        assert_eq!(t.thumbnail.as_deref(), Some("https://img.youtube.com/vi/abc-ident/mqdefault.jpg"));
        assert!(!t.requires_resolution());
        assert!(t.is("abc"));
        assert!(!t.is("abd"));
    }

    #[test]
    fn spotify_references_need_resolution() {
        let info = TrackInfo {
            title: "Song".to_string(),
            author: "Band".to_string(),
            uri: "https://open.spotify.com/track/1".to_string(),
            ..Default::default()
        };
        let reference = Track::reference(info, TrackSource::Spotify, None).with_requester(UserId(5));

        assert!(reference.requires_resolution());
        assert!(!reference.is(""));
        assert_eq!(reference.requester, Some(TrackRequester { id: Some(UserId(5)), name: None }));
    }

    #[test]
    fn source_name_wins_over_uri() {
        assert_eq!(TrackSource::detect(Some("soundcloud"), "https://youtube.com/x"), TrackSource::Soundcloud);
        assert_eq!(TrackSource::detect(None, "spotify:track:1"), TrackSource::Spotify);
        assert_eq!(TrackSource::detect(None, "https://example.com/a.mp3"), TrackSource::Http);
    }

    #[test]
    fn load_result_decodes() {
        let raw = r#"{"loadType":"SEARCH_RESULT","playlistInfo":{},"tracks":[{"track":"QAAA","info":{
            "identifier":"id","isSeekable":true,"author":"a","length":1000,"isStream":false,
            "position":0,"title":"t","uri":"https://www.youtube.com/watch?v=id"}}]}"#;
        let tracks: Tracks = serde_json::from_str(raw).unwrap();

        assert_eq!(tracks.load_type, LoadType::SearchResult);
        assert_eq!(tracks.tracks.len(), 1);
        assert_eq!(tracks.tracks[0].track, "QAAA");
    }

    #[test]
    fn search_prefixes() {
        assert_eq!(TrackSearch::Youtube("a b").to_string(), "ytsearch:a b");
        assert_eq!(TrackSearch::Soundcloud("a").to_string(), "scsearch:a");
        assert_eq!(TrackSearch::Url("https://x").to_string(), "https://x");
    }
}
