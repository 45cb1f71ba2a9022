//! Change events and the pub/sub mechanics used to fan them out.
//!
//! Stores publish a message after every committed mutation; sessions subscribe
//! and treat any message as "my local snapshot may be stale".

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
