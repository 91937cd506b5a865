use std::{
    error::Error,
    fmt::{
        Display,
        Formatter,
        Result,
    },
};

pub type LinkResult<T> = ::std::result::Result<T, LinkError>;

#[derive(Debug)]
pub enum LinkError {
    /// The node has no open connection, commands fail fast until it reconnects.
    NodeUnavailable,
    /// The node answered a track lookup with an error or with no matches.
    SearchError(String),
    /// A track reference could not be turned into a playable track.
    ResolutionFailure(String),
    /// A bounded wait elapsed.
    Timeout,
    OutOfBounds { index: usize, len: usize },
    PlayerDestroyed,
    Http(reqwest::Error),
    Json(serde_json::Error),
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LinkError::Http(e) => Some(e),
            LinkError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for LinkError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            LinkError::NodeUnavailable => write!(f, "The audio node is not connected."),
            LinkError::SearchError(why) => write!(f, "The audio node failed to load tracks: {}", why),
            LinkError::ResolutionFailure(why) => write!(f, "Unable to find a playable track: {}", why),
            LinkError::Timeout => write!(f, "Timed out waiting for the audio node."),
            LinkError::OutOfBounds { index, len } => write!(f, "Index {} is out of bounds, the queue has {} tracks.", index, len),
            LinkError::PlayerDestroyed => write!(f, "The player has already been destroyed."),
            LinkError::Http(why) => write!(f, "Error while requesting the audio node: {}", why),
            LinkError::Json(why) => write!(f, "Error while encoding payload, json => {}", why),
        }
    }
}

impl From<reqwest::Error> for LinkError {
    fn from(e: reqwest::Error) -> LinkError {
        if e.is_connect() {
            Self::NodeUnavailable
        } else if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(e: serde_json::Error) -> LinkError {
        Self::Json(e)
    }
}

impl From<tokio::time::error::Elapsed> for LinkError {
    fn from(_: tokio::time::error::Elapsed) -> LinkError {
        Self::Timeout
    }
}

pub type ClusterResult<T> = ::std::result::Result<T, ClusterError>;

#[derive(Debug)]
pub enum ClusterError {
    CannotFindNode,
    CannotFindBestNode,
    Link(LinkError)
}

impl Error for ClusterError {}

impl Display for ClusterError {
    fn fmt(&self, f: &mut Formatter) -> Result {
        match self {
            ClusterError::CannotFindNode => write!(f, "Cannot find node, this can mean the node you're trying to search is not available or not exists"),
            ClusterError::CannotFindBestNode => write!(f, "Cannot find the best node, this is caused because there are no connected nodes"),
            ClusterError::Link(e) => e.fmt(f)
        }
    }
}

impl From<LinkError> for ClusterError {
    fn from(e: LinkError) -> ClusterError {
        ClusterError::Link(e)
    }
}
