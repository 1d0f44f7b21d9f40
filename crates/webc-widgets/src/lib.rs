#![forbid(unsafe_code)]

//! Elements built on the webc runtime.
//!
//! - [`modal`]: the modal dialog element ([`ModalElement`])
//! - [`hydration_probe`]: a minimal element for hydration checks
//! - [`choice`]: allow-listed enum properties

pub mod choice;
pub mod hydration_probe;
pub mod modal;

pub use choice::Choice;
pub use hydration_probe::{ButtonType, HydrationProbe, ProbeConfig, UnknownProbeAttribute};
pub use modal::{
    ActionProps, ActionSlot, CancelOutcome, ModalElement, ModalError, ModalEvent, ModalEventKind,
    ModalProps, ModalServices,
};
