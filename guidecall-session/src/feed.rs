use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// What a late subscriber gets on `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// The most recent value, then everything after it.
    Last,
    /// Only values emitted after subscribing.
    None,
}

struct FeedInner<T> {
    replay: Replay,
    last: Option<T>,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    completed: bool,
}

/// Multi-subscriber status broadcast.
///
/// Every subscriber has its own unbounded queue, so a slow consumer never
/// drops a status transition. After `complete` each subscriber observes the
/// end of its stream exactly once and nothing more is delivered.
pub struct StatusFeed<T> {
    inner: Arc<Mutex<FeedInner<T>>>,
}

impl<T> Clone for StatusFeed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> StatusFeed<T> {
    pub fn new(replay: Replay) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FeedInner {
                replay,
                last: None,
                subscribers: Vec::new(),
                completed: false,
            })),
        }
    }

    pub fn subscribe(&self) -> FeedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();

        if !inner.completed {
            if inner.replay == Replay::Last
                && let Some(last) = inner.last.clone()
            {
                let _ = tx.send(last);
            }
            inner.subscribers.push(tx);
        }

        FeedReceiver { rx }
    }

    /// Delivers `value` to every live subscriber. Returns how many got it.
    pub fn emit(&self, value: T) -> usize {
        let mut inner = self.inner.lock();
        if inner.completed {
            return 0;
        }

        if inner.replay == Replay::Last {
            inner.last = Some(value.clone());
        }
        inner
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        inner.subscribers.len()
    }

    pub fn complete(&self) {
        let mut inner = self.inner.lock();
        inner.completed = true;
        inner.last = None;
        inner.subscribers.clear();
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().completed
    }

    pub fn last(&self) -> Option<T> {
        self.inner.lock().last.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

/// Receiving half of a [`StatusFeed`] subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct FeedReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> FeedReceiver<T> {
    /// Next value, or `None` once the feed has completed.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for FeedReceiver<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
