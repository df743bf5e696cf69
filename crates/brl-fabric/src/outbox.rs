use crate::notification::Notification;

/// Buffer of notifications produced by one transaction.
///
/// Producers push while the transaction runs; the owner dispatches the
/// buffered notifications once the transaction has committed. A transaction
/// that aborts simply drops its outbox, so no notification escapes from a
/// rolled-back operation.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume the outbox, yielding its notifications in production order.
    pub fn into_notifications(self) -> Vec<Notification> {
        self.pending
    }
}
