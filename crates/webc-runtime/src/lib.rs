#![forbid(unsafe_code)]

//! Runtime for webc elements.
//!
//! - [`bus`]: the process-wide, kind-keyed event channel
//! - [`changes`]: changed-property records with previous values
//! - [`element`]: the [`ReactiveElement`] lifecycle contract and the
//!   [`ElementHost`] that drives it (attach, update, detach, SSR, hydration)

pub mod bus;
pub mod changes;
pub mod element;

pub use bus::{BusEvent, EventBus, Subscription};
pub use changes::{ChangedProperties, Previous};
pub use element::{
    ElementHost, HydrationReport, LifecycleError, LifecycleState, MAX_SETTLE_CYCLES,
    ReactiveElement, Update,
};
