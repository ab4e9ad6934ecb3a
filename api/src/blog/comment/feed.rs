use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{CommentId, PostId};

/// What changed in a post's comments. Listeners treat every event the same
/// way, by fetching the whole thread again.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CommentEvent {
    Created { id: CommentId },
    Updated { id: CommentId },
    Deleted { ids: Vec<CommentId> },
    Pinned { id: CommentId, pinned: bool },
    /// Events were dropped because the listener fell behind
    Resync,
}

type Channels = HashMap<PostId, broadcast::Sender<CommentEvent>>;

/// One broadcast channel per post, created by the first subscriber and
/// dropped with the last one.
#[derive(Clone)]
pub struct CommentFeeds {
    channels: Arc<Mutex<Channels>>,
    capacity: usize,
}

impl CommentFeeds {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn channels(&self) -> MutexGuard<'_, Channels> {
        // the map stays consistent even if a holder panicked
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, post_id: PostId) -> Subscription {
        let receiver = self
            .channels()
            .entry(post_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        tracing::debug!(post_id, "Subscribed to comment feed");

        Subscription {
            post_id,
            receiver,
            feeds: self.clone(),
        }
    }

    pub fn publish(&self, post_id: PostId, event: CommentEvent) {
        if let Some(sender) = self.channels().get(&post_id) {
            // no receivers left is fine, the channel is about to be released
            let _ = sender.send(event);
        }
    }

    pub fn subscriber_count(&self, post_id: PostId) -> usize {
        self.channels()
            .get(&post_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    fn release(&self, post_id: PostId) {
        let mut channels = self.channels();
        // the receiver being dropped still counts here
        if channels
            .get(&post_id)
            .is_some_and(|sender| sender.receiver_count() <= 1)
        {
            channels.remove(&post_id);
            tracing::debug!(post_id, "Released comment feed");
        }
    }
}

/// A listener on one post's comments, unsubscribed when dropped.
pub struct Subscription {
    post_id: PostId,
    receiver: broadcast::Receiver<CommentEvent>,
    feeds: CommentFeeds,
}

impl Subscription {
    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Waits for the next change. Returns `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<CommentEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(post_id = self.post_id, skipped, "Comment feed lagged");
                Some(CommentEvent::Resync)
            }
            Err(RecvError::Closed) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feeds.release(self.post_id);
    }
}
