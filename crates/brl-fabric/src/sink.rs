use std::sync::{Mutex, RwLock};

use tokio::sync::mpsc;
use tracing::info;

use brl_types::{AccountId, BookId};

use crate::error::{FabricError, Result};
use crate::notification::{Notification, NotificationKind};

/// Observer of committed ledger notifications.
///
/// Sinks are called after the producing transaction has committed, while
/// dispatch order is still serialized. Implementations must not call back
/// into the ledger from `deliver`.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Sink that keeps every delivered notification in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        let mut received = self
            .received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *received)
    }

    /// Copy of everything received so far.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl NotificationSink for RecordingSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.received
            .lock()
            .map_err(|_| FabricError::LockPoisoned("recording sink"))?
            .push(notification.clone());
        Ok(())
    }
}

/// Sink that writes one structured log line per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        let book = notification.book().map(BookId::short_id);
        let account = notification.account().map(AccountId::short_id);
        info!(
            kind = %notification.kind(),
            book = book.as_deref().unwrap_or("-"),
            account = account.as_deref().unwrap_or("-"),
            "ledger notification"
        );
        Ok(())
    }
}

/// Filter for subscribing to a subset of notifications.
#[derive(Clone, Debug, Default)]
pub struct NotificationFilter {
    /// If set, only notifications of these kinds are delivered.
    pub kinds: Option<Vec<NotificationKind>>,
    /// If set, only notifications about these books are delivered.
    pub books: Option<Vec<BookId>>,
    /// If set, only notifications about these accounts are delivered.
    pub accounts: Option<Vec<AccountId>>,
}

impl NotificationFilter {
    pub fn kinds(kinds: impl IntoIterator<Item = NotificationKind>) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Returns `true` if the given notification matches this filter.
    pub fn matches(&self, notification: &Notification) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&notification.kind()) {
                return false;
            }
        }
        if let Some(ref books) = self.books {
            match notification.book() {
                Some(book) if books.contains(book) => {}
                _ => return false,
            }
        }
        if let Some(ref accounts) = self.accounts {
            match notification.account() {
                Some(account) if accounts.contains(account) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Receiving end of a subscription.
///
/// The queue is unbounded, so a slow reader never loses notifications.
pub type NotificationStream = mpsc::UnboundedReceiver<Notification>;

struct Subscriber {
    filter: NotificationFilter,
    sender: mpsc::UnboundedSender<Notification>,
}

/// Fan-out sink delivering notifications to filtered subscribers.
#[derive(Default)]
pub struct BroadcastSink {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its receiver.
    pub fn subscribe(&self, filter: NotificationFilter) -> Result<NotificationStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .map_err(|_| FabricError::LockPoisoned("broadcast router"))?
            .push(Subscriber { filter, sender: tx });
        Ok(rx)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .map(|subs| subs.len())
            .unwrap_or_default()
    }
}

impl NotificationSink for BroadcastSink {
    /// Route to matching subscribers, pruning those whose receivers are gone.
    fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut subs = self
            .subscribers
            .write()
            .map_err(|_| FabricError::LockPoisoned("broadcast router"))?;
        subs.retain(|sub| {
            if sub.filter.matches(notification) {
                sub.sender.send(notification.clone()).is_ok()
            } else {
                !sub.sender.is_closed()
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use brl_types::{Bookcoin, Timestamp};

    use super::*;

    fn publish(label: &str) -> Notification {
        Notification::Publish {
            book: BookId::from_label(label),
            title: label.into(),
            content: String::new(),
            price: Bookcoin::new(10),
        }
    }

    fn created(book: &str, renter: &str) -> Notification {
        Notification::RentalCreated {
            book: BookId::from_label(book),
            renter: AccountId::from_label(renter),
            start: Timestamp::from_secs(0),
            end: Timestamp::from_secs(10),
        }
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.deliver(&publish("a")).unwrap();
        sink.deliver(&publish("b")).unwrap();
        assert_eq!(sink.snapshot(), vec![publish("a"), publish("b")]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = NotificationFilter::default();
        assert!(filter.matches(&publish("a")));
        assert!(filter.matches(&created("a", "r")));
    }

    #[test]
    fn filter_by_kind_book_and_account() {
        let by_kind = NotificationFilter::kinds([NotificationKind::RentalCreated]);
        assert!(by_kind.matches(&created("a", "r")));
        assert!(!by_kind.matches(&publish("a")));

        let by_book = NotificationFilter {
            books: Some(vec![BookId::from_label("a")]),
            ..Default::default()
        };
        assert!(by_book.matches(&publish("a")));
        assert!(!by_book.matches(&publish("b")));

        let by_account = NotificationFilter {
            accounts: Some(vec![AccountId::from_label("r")]),
            ..Default::default()
        };
        assert!(by_account.matches(&created("a", "r")));
        assert!(!by_account.matches(&created("a", "other")));
        assert!(!by_account.matches(&publish("a")));
    }

    #[test]
    fn broadcast_routes_to_matching_subscribers() {
        let sink = BroadcastSink::new();
        let mut all = sink.subscribe(NotificationFilter::default()).unwrap();
        let mut rentals = sink
            .subscribe(NotificationFilter::kinds([NotificationKind::RentalCreated]))
            .unwrap();

        sink.deliver(&publish("a")).unwrap();
        sink.deliver(&created("a", "r")).unwrap();

        assert_eq!(all.try_recv().unwrap(), publish("a"));
        assert_eq!(all.try_recv().unwrap(), created("a", "r"));
        assert_eq!(rentals.try_recv().unwrap(), created("a", "r"));
        assert!(rentals.try_recv().is_err());
    }

    #[test]
    fn broadcast_prunes_dropped_subscribers() {
        let sink = BroadcastSink::new();
        let rx = sink.subscribe(NotificationFilter::default()).unwrap();
        assert_eq!(sink.subscriber_count(), 1);
        drop(rx);
        sink.deliver(&publish("a")).unwrap();
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[test]
    fn slow_subscriber_receives_every_notification() {
        let sink = BroadcastSink::new();
        let mut all = sink.subscribe(NotificationFilter::default()).unwrap();

        let sent: Vec<_> = (0..64).map(|i| publish(&format!("book-{i}"))).collect();
        for notification in &sent {
            sink.deliver(notification).unwrap();
        }

        let mut received = Vec::new();
        while let Ok(notification) = all.try_recv() {
            received.push(notification);
        }
        assert_eq!(received, sent);
    }
}
