//! Notification fabric for the Bookrent Ledger.
//!
//! State changes and reporting queries produce [`Notification`]s. They are
//! collected in a per-transaction [`Outbox`] and handed to every registered
//! [`NotificationSink`] by the [`Dispatcher`] only after the transaction has
//! committed, in the exact order they were produced. Deliveries a sink
//! rejects stay in the dispatcher's backlog until it accepts them.
//!
//! The crate also owns the clock boundary: the ledger reads time through the
//! [`Clock`] trait, wrapped in a [`MonotonicClock`] that never steps back.

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod notification;
pub mod outbox;
pub mod sink;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use dispatch::{DispatchReport, Dispatcher, PendingDelivery};
pub use error::{FabricError, Result};
pub use notification::{Notification, NotificationKind};
pub use outbox::Outbox;
pub use sink::{
    BroadcastSink, NotificationFilter, NotificationSink, NotificationStream, RecordingSink,
    TracingSink,
};
