//! Publish-latest plumbing for values the presentation layer watches.

use tokio::sync::watch;

/// A published value paired with the revision it was published at.
/// Revisions are strictly monotonic per [`Observable`], so a consumer can
/// tell a fresh snapshot from one it has already seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

/// Subscribers receive the latest value only; dropping the subscription
/// unsubscribes it.
pub type Subscription<T> = watch::Receiver<Versioned<T>>;

/// A value cell with publish-latest semantics. Publishing never blocks and
/// never fails, whether or not anyone is subscribed.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<Versioned<T>>,
}

impl<T: Clone> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Versioned {
            revision: 0,
            value: initial,
        });
        Self { tx }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        self.tx.subscribe()
    }

    /// Replaces the current value and returns the revision it got.
    pub fn publish(&self, value: T) -> u64 {
        let mut published = 0;
        self.tx.send_modify(|current| {
            current.revision += 1;
            current.value = value;
            published = current.revision;
        });
        published
    }

    /// The most recently published value, without subscribing.
    pub fn latest(&self) -> Versioned<T> {
        self.tx.borrow().clone()
    }
}
