use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tokio::sync::Notify;

use super::track::Track;
use crate::error::{LinkError, LinkResult};

const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Off,
    /// The player puts a finished track back at the head.
    Track,
    /// Popped tracks go back to the tail.
    Queue,
}

impl Default for LoopMode {
    fn default() -> Self {
        Self::Off
    }
}

#[derive(Default)]
struct QueueInner {
    tracks: VecDeque<Arc<Track>>,
    history: VecDeque<Arc<Track>>,
    loop_mode: LoopMode,
}

/// Pending tracks of a player, plus the ones it already played.
#[derive(Default)]
pub struct Queue {
    inner: Mutex<QueueInner>,
    added: Notify,
}

impl Queue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&self, track: Arc<Track>) {
        self.inner.lock().tracks.push_back(track);
        self.added.notify_one();
    }

    pub(crate) fn push_front(&self, track: Arc<Track>) {
        self.inner.lock().tracks.push_front(track);
        self.added.notify_one();
    }

    /// Removes the head if there is one.
    pub fn try_pop(&self) -> Option<Arc<Track>> {
        let mut inner = self.inner.lock();
        let track = inner.tracks.pop_front()?;

        if inner.loop_mode == LoopMode::Queue {
            inner.tracks.push_back(Arc::clone(&track));
        }

        if inner.history.len() == MAX_HISTORY {
            inner.history.pop_front();
        }
        inner.history.push_back(Arc::clone(&track));

        Some(track)
    }

    /// Removes the head, waiting for a push while the queue is empty.
    ///
    /// Dropping the returned future before it resolves leaves the queue untouched.
    pub async fn pop(&self) -> Arc<Track> {
        loop {
            let added = self.added.notified();

            if let Some(track) = self.try_pop() {
                return track;
            }

            added.await;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().tracks.len()
    }

    pub fn get(&self, index: usize) -> LinkResult<Arc<Track>> {
        let inner = self.inner.lock();

        inner.tracks.get(index)
            .cloned()
            .ok_or(LinkError::OutOfBounds { index, len: inner.tracks.len() })
    }

    /// The next `count` tracks, in play order.
    pub fn upcoming(&self, count: usize) -> Vec<Arc<Track>> {
        self.inner.lock().tracks.iter().take(count).cloned().collect()
    }

    /// Played tracks, oldest first.
    pub fn history(&self) -> Vec<Arc<Track>> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().tracks.clear();
    }

    pub fn remove(&self, index: usize) -> LinkResult<Arc<Track>> {
        let mut inner = self.inner.lock();
        let len = inner.tracks.len();

        inner.tracks.remove(index).ok_or(LinkError::OutOfBounds { index, len })
    }

    pub fn shuffle(&self) {
        let mut inner = self.inner.lock();

        inner.tracks.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.inner.lock().loop_mode
    }

    pub fn set_loop_mode(&self, mode: LoopMode) {
        self.inner.lock().loop_mode = mode;
    }
}
