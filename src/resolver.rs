use async_trait::async_trait;

use crate::{
    error::{LinkError, LinkResult},
    model::track::{Track, TrackRequester, TrackSearch},
    node::Node,
    types::ChannelId,
};

/// Turns queries and foreign references into tracks the node can play.
#[async_trait]
pub trait TrackResolver: Send + Sync + 'static {
    async fn search(&self, query: &str, requester: Option<TrackRequester>, context: Option<ChannelId>) -> LinkResult<Vec<Track>>;

    /// May return several tracks, e.g. for an album reference.
    async fn resolve(&self, reference: &Track) -> LinkResult<Vec<Track>>;
}

/// Resolves through the node's own sources.
#[async_trait]
impl TrackResolver for Node {
    async fn search(&self, query: &str, requester: Option<TrackRequester>, context: Option<ChannelId>) -> LinkResult<Vec<Track>> {
        let loaded = self.auto_search(query).await?;

        Ok(loaded.tracks
            .into_iter()
            .map(|t| Track::from_loaded(t, requester.clone(), context))
            .collect())
    }

    async fn resolve(&self, reference: &Track) -> LinkResult<Vec<Track>> {
        let query = format!("{} - {}", reference.author(), reference.title());

        let tracks = match self.get_tracks(TrackSearch::Youtube(&query)).await {
            Ok(loaded) => loaded.tracks,
            Err(LinkError::SearchError(why)) => return Err(LinkError::ResolutionFailure(why)),
            Err(e) => return Err(e),
        };

        if tracks.is_empty() {
            return Err(LinkError::ResolutionFailure(format!("no results for `{}`", query)));
        }

        Ok(tracks
            .into_iter()
            .map(|t| Track::from_loaded(t, reference.requester.clone(), reference.context))
            .collect())
    }
}
