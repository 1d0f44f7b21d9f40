#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;

use webc_core::dom::ElementId;

/// Modal configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalError {
    /// The modal was attached without a heading.
    MissingHeading(ElementId),
    /// `set_attribute` was called with a name the modal does not observe.
    UnknownAttribute(String),
}

impl fmt::Display for ModalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeading(id) => write!(f, "modal {id} requires a non-empty heading"),
            Self::UnknownAttribute(name) => write!(f, "unknown modal attribute: {name}"),
        }
    }
}

impl Error for ModalError {}
