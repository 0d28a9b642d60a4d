//! Award Notifications - outbound notices for concluded procurement rounds
//!
//! This crate turns a committed selection into the message the winning
//! supplier receives:
//! - **Messages** (`message`) - Tera-rendered notice bodies and the payload
//!   digest stored on the award notice row
//! - **Notifiers** (`notifier`) - delivery transports: a webhook sender with
//!   a bounded timeout, and a noop transport for local runs
//!
//! # Delivery model
//!
//! Delivery is best-effort and single-attempt. The selection that triggered
//! the notice is already committed by the time a notifier runs; a failed
//! send marks the notice `failed` and never rolls the award back.
//!
//! # Key Types
//!
//! - `AwardNoticeContext` - everything the template and payload need
//! - `AwardMessage` - rendered subject, body, payload, and digest
//! - `Notifier` - trait for delivery transports
//! - `WebhookNotifier` / `NoopNotifier` - the two shipped transports

pub mod message;
pub mod notifier;
