#![forbid(unsafe_code)]

//! Modal dialog element.
//!
//! # Example
//!
//! ```ignore
//! use webc_widgets::modal::{ActionProps, ModalElement, ModalProps};
//!
//! let props = ModalProps::new("Delete file?")
//!     .dismissible(true)
//!     .leading_action(ActionProps::new("Delete"))
//!     .supporting_action(ActionProps::new("Cancel"))
//!     .return_focus_after_close("#delete-button");
//! let mut host = ModalElement::new(props, services).into_host();
//! host.connect()?;
//! host.interact(|modal| modal.set_open(true))?;
//! ```

mod element;
mod error;
pub mod events;
pub mod props;
pub mod template;

pub use element::{CancelOutcome, ModalElement, ModalServices, SetupState};
pub use error::ModalError;
pub use events::{ModalEvent, ModalEventKind, modal_channel};
pub use props::{
    ActionProps, ActionSlot, ButtonVariant, HeadingLevel, ModalAria, ModalFlags, ModalPosition,
    ModalProperty, ModalProps, ModalSize,
};

/// Accepted `size` values.
pub const SIZES: &[ModalSize] = <ModalSize as crate::choice::Choice>::VALUES;
/// Accepted `position` values.
pub const POSITIONS: &[ModalPosition] = <ModalPosition as crate::choice::Choice>::VALUES;
/// Accepted `heading-level` values.
pub const HEADING_LEVELS: &[HeadingLevel] = <HeadingLevel as crate::choice::Choice>::VALUES;
