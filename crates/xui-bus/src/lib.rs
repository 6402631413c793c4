//! XUI Event Bus
//!
//! Typed publish/subscribe used by the session store and the guardian to
//! announce state changes.
//!
//! # Core Concepts
//!
//! - [`EventBus`]: Cloneable handle to a listener list for one event type
//! - [`ListenerId`]: Identity of a registered listener, used for removal
//! - [`Subscription`]: RAII guard that removes its listener on drop
//!
//! # Delivery
//!
//! Listeners run in registration order, synchronously, on the emitting
//! caller's stack. The listener list is copied before delivery, so handlers
//! may add or remove listeners while an event is being emitted. Every
//! listener carries an active flag that is checked right before it is
//! invoked; a listener removed mid-emit is never called afterwards.
//!
//! # Example
//!
//! ```rust
//! use xui_bus::EventBus;
//!
//! let bus: EventBus<u32> = EventBus::new();
//! let subscription = bus.subscribe_filtered(|n| println!("even: {n}"), |n| n % 2 == 0);
//!
//! assert_eq!(bus.emit(&2), 1);
//! assert_eq!(bus.emit(&3), 0);
//!
//! drop(subscription);
//! assert_eq!(bus.emit(&4), 0);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod bus;
mod error;
mod subscription;

pub use bus::{EventBus, ListenerId};
pub use error::BusError;
pub use subscription::Subscription;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
