//! Subscriber registry for live fan-out
//!
//! The registry is the only state shared between the fan-out pump and the
//! subscription endpoint. Connection tasks add and remove themselves; the pump
//! only ever reads a snapshot.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌─────────────────────────────┐
//!                 │ subscribers: HashMap<Id,    │
//!                 │   Arc<Subscriber {          │
//!                 │     tx: mpsc::Sender,       │
//!                 │   }>                        │
//!                 │ >                           │
//!                 └──────────────┬──────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [FanoutPump]          [Connection task]       [Connection task]
//!   snapshot()            rx.recv()               rx.recv()
//!        │                       │                       │
//!        └──► subscriber.send() ─┴──► ws.send() ──► TCP ─┘
//! ```
//!
//! # Snapshot Semantics
//!
//! `snapshot()` clones the `Arc` handles out from under the lock, so a broadcast
//! never holds the lock across a send and concurrent add/remove cannot
//! invalidate an in-flight broadcast. Payloads are reference-counted
//! `Utf8Bytes`, so every subscriber shares one allocation per packet.

pub mod store;
pub mod subscriber;

pub use store::SubscriberRegistry;
pub use subscriber::{Subscriber, SubscriberId};
