//! Single-slot hand-off from the collector task to the controller.
//!
//! Every publication replaces the previous one, so a reader only ever sees
//! the most recent complete series. Status and payload travel together in
//! one value, which makes it impossible to observe a payload without the
//! status that describes it.

use crate::sampler::SeriesBuffer;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    Ok(SeriesBuffer),
    Failed(String),
}

impl Publication {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

pub fn mailbox() -> (Publisher, Subscriber) {
    let (tx, rx) = watch::channel(None);
    (Publisher { tx }, Subscriber { rx })
}

pub struct Publisher {
    tx: watch::Sender<Option<Publication>>,
}

impl Publisher {
    /// Replace whatever was published before.
    pub fn publish(&self, publication: Publication) {
        self.tx.send_replace(Some(publication));
    }

    pub fn has_published(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

pub struct Subscriber {
    rx: watch::Receiver<Option<Publication>>,
}

impl Subscriber {
    /// Wait for the first publication and return the latest one.
    ///
    /// Returns `None` if the publisher went away without publishing.
    pub async fn latest(&mut self) -> Option<Publication> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        }
    }

    /// The latest publication without waiting.
    pub fn peek(&self) -> Option<Publication> {
        self.rx.borrow().clone()
    }
}
