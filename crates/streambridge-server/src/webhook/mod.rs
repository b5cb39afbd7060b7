//! Inbound EventSub webhook deliveries.
//!
//! Deliveries are signature-checked, deduplicated by message id and
//! archived per tenant: the latest event plus a bounded history.

mod pipeline;


pub use pipeline::{ArchivedEvent, DeliveryOutcome, WebhookIngestor, history_key, latest_event_key};
