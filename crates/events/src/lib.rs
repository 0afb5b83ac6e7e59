//! Domain events and the observation channel they travel on.
//!
//! Circulation operations (borrow, return, fee charges) do not print or log
//! directly from domain code; they emit events. Consumers — the demo binary,
//! tests, a future UI — subscribe to the bus and render them however they like.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
