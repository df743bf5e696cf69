use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::FabricError;
use crate::notification::Notification;
use crate::outbox::Outbox;
use crate::sink::NotificationSink;

/// A notification a sink has not yet accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDelivery {
    /// Registration index of the sink, see [`Dispatcher::add_sink`].
    pub sink: usize,
    pub notification: Notification,
    pub attempts: u32,
    /// `None` until the sink has been tried with this notification.
    pub last_error: Option<FabricError>,
}

/// Result of one [`Dispatcher::dispatch`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// The dispatched notifications, in production order.
    pub notifications: Vec<Notification>,
    /// Backlog entries delivered before the new notifications.
    pub redelivered: usize,
    /// Deliveries added to the backlog by this call.
    pub deferred: usize,
}

/// At-least-once delivery of committed notifications to registered sinks.
///
/// Each sink sees notifications in production order. A delivery a sink
/// rejects is kept in the backlog together with every later notification
/// for that sink, and retried before anything newer on the next dispatch or
/// [`redeliver`](Self::redeliver). Other sinks are not held back.
#[derive(Default)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
    backlog: Vec<PendingDelivery>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink and return its index.
    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) -> usize {
        self.sinks.push(sink);
        self.sinks.len() - 1
    }

    /// Deliveries still waiting for their sink, oldest first.
    pub fn backlog(&self) -> &[PendingDelivery] {
        &self.backlog
    }

    /// Retry the backlog, then deliver `outbox` to every sink.
    pub fn dispatch(&mut self, outbox: Outbox) -> DispatchReport {
        let redelivered = self.redeliver();
        let backlog_before = self.backlog.len();
        let mut blocked: HashSet<usize> = self.backlog.iter().map(|p| p.sink).collect();

        let notifications = outbox.into_notifications();
        for notification in &notifications {
            for (index, sink) in self.sinks.iter().enumerate() {
                if blocked.contains(&index) {
                    self.backlog.push(PendingDelivery {
                        sink: index,
                        notification: notification.clone(),
                        attempts: 0,
                        last_error: None,
                    });
                    continue;
                }
                if let Err(error) = sink.deliver(notification) {
                    warn!(sink = index, kind = %notification.kind(), %error, "delivery deferred");
                    blocked.insert(index);
                    self.backlog.push(PendingDelivery {
                        sink: index,
                        notification: notification.clone(),
                        attempts: 1,
                        last_error: Some(error),
                    });
                }
            }
        }

        let deferred = self.backlog.len() - backlog_before;
        debug!(
            count = notifications.len(),
            sinks = self.sinks.len(),
            redelivered,
            deferred,
            "outbox dispatched"
        );
        DispatchReport {
            notifications,
            redelivered,
            deferred,
        }
    }

    /// Retry every backlog entry in order and return how many were accepted.
    ///
    /// After a sink rejects an entry, its later entries stay queued so its
    /// order is preserved.
    pub fn redeliver(&mut self) -> usize {
        if self.backlog.is_empty() {
            return 0;
        }
        let mut blocked = HashSet::new();
        let mut delivered = 0;
        let mut remaining = Vec::new();

        for mut pending in std::mem::take(&mut self.backlog) {
            if blocked.contains(&pending.sink) {
                remaining.push(pending);
                continue;
            }
            let Some(sink) = self.sinks.get(pending.sink) else {
                continue;
            };
            match sink.deliver(&pending.notification) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    pending.attempts += 1;
                    pending.last_error = Some(error);
                    blocked.insert(pending.sink);
                    remaining.push(pending);
                }
            }
        }

        if !remaining.is_empty() {
            warn!(pending = remaining.len(), delivered, "deliveries still pending");
        }
        self.backlog = remaining;
        delivered
    }
}
