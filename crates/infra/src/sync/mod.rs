//! Background outbox processing

pub mod outbox_worker;

pub use outbox_worker::{calculate_backoff, OutboxWorker, OutboxWorkerConfig};
