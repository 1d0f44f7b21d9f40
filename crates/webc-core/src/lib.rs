#![forbid(unsafe_code)]

//! Core types for webc elements.
//!
//! This crate provides:
//! - [`geometry`]: viewport points and bounding boxes
//! - [`html`]: the render tree elements produce, with HTML serialisation
//! - [`dom`]: element identity, text direction, and the collaborator traits
//!   ([`DialogSurface`], [`ScrollLock`], [`FocusHost`])

pub mod dom;
pub mod geometry;
pub mod html;

pub use dom::{
    DialogSurface, Direction, ElementId, FocusHost, NodeHandle, Readiness, ScrollLock,
    ScrollTarget,
};
pub use geometry::{DomRect, Point};
pub use html::{AttrValue, Element, Node};
