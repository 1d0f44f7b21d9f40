#![forbid(unsafe_code)]

//! Modal events and the process-wide channel they travel on.

use std::fmt;

use webc_core::dom::ElementId;
use webc_runtime::bus::{BusEvent, EventBus};

/// What happened to a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalEventKind {
    Open,
    Close,
    Back,
    LeadingActionClick,
    SupportingActionClick,
}

impl ModalEventKind {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Close,
        Self::Back,
        Self::LeadingActionClick,
        Self::SupportingActionClick,
    ];

    /// Event name as observed by consumers.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "modal-open",
            Self::Close => "modal-close",
            Self::Back => "modal-back",
            Self::LeadingActionClick => "modal-leading-action-click",
            Self::SupportingActionClick => "modal-supporting-action-click",
        }
    }
}

impl fmt::Display for ModalEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A modal event addressed to one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalEvent {
    pub kind: ModalEventKind,
    pub target: ElementId,
}

impl ModalEvent {
    pub const fn new(kind: ModalEventKind, target: ElementId) -> Self {
        Self { kind, target }
    }

    #[inline]
    pub fn is_for(&self, id: ElementId) -> bool {
        self.target == id
    }
}

impl BusEvent for ModalEvent {
    type Kind = ModalEventKind;

    fn kind(&self) -> ModalEventKind {
        self.kind
    }
}

thread_local! {
    static MODAL_CHANNEL: EventBus<ModalEvent> = EventBus::new();
}

/// The modal channel shared by every instance on this thread.
pub fn modal_channel() -> EventBus<ModalEvent> {
    MODAL_CHANNEL.with(EventBus::clone)
}
