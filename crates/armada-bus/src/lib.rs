//! armada-bus — the at-least-once event bus connecting pollers, the job
//! coordinator, and external producers.
//!
//! Topics are a closed set and every payload is a typed variant of
//! [`BusEvent`] — events are validated where they are constructed, never
//! decoded ad hoc by handlers. The bus contract assumes at-least-once
//! delivery: consumers tolerate duplicates (the coordinator's lease check
//! makes duplicate jobs safe), and exactly-once is never assumed.
//!
//! [`InMemoryBus`] is the in-process implementation: one tokio broadcast
//! channel per topic. Wire transports (MQTT, Redis, ...) implement the same
//! [`EventBus`] trait externally.

pub mod bus;
pub mod events;

pub use bus::{BusError, BusResult, EventBus, InMemoryBus};
pub use events::{BusEvent, Topic};
