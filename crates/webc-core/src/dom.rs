#![forbid(unsafe_code)]

//! Contracts for the document-side collaborators an element talks to.
//!
//! Elements never touch a real document directly. Instead they are handed
//! implementations of these traits by the runtime:
//!
//! - [`DialogSurface`]: the native top-layer modal primitive (`<dialog>`).
//! - [`ScrollLock`]: the page scroll-lock service, keyed by node.
//! - [`FocusHost`]: selector resolution and focus movement.
//!
//! In a browser build these wrap DOM calls; tests use the in-memory fakes
//! from `webc-harness`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::DomRect;

/// Global counter for unique element IDs.
static ELEMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one live element instance.
///
/// Events on the process-wide bus carry the target's `ElementId` so every
/// listener can tell whether an event is meant for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Allocate a fresh, never reused ID.
    pub fn next() -> Self {
        Self(ELEMENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Writing direction of the element's context (`dir` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    /// Parse a `dir` attribute value. Anything other than `rtl` is LTR.
    pub fn from_attr(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("rtl") {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }

    #[inline]
    pub fn is_rtl(self) -> bool {
        self == Self::Rtl
    }
}

/// Outcome of the one-time setup a surface may need before it can be shown
/// (e.g. registering a polyfill on engines without native `<dialog>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Setup finished synchronously.
    Ready,
    /// Setup is still running; the runtime reports completion later.
    Pending,
    /// No setup is needed on this platform.
    NotRequired,
}

/// The native modal presentation primitive.
///
/// Implementations report state truthfully; callers are responsible for
/// the "already shown" / "not connected" guards.
pub trait DialogSurface {
    /// Start any one-time setup. Called once, on the element's first render.
    fn prepare(&mut self) -> Readiness {
        Readiness::NotRequired
    }

    /// Whether the surface node is attached to a document.
    fn is_connected(&self) -> bool;

    /// Whether the surface is currently shown (`open` attribute present).
    fn is_shown(&self) -> bool;

    /// Show as a modal in the top layer.
    fn show_modal(&mut self);

    /// Close the surface, optionally recording a return value.
    fn close(&mut self, return_value: Option<&str>);

    /// Current bounding box. An unshown surface reports [`DomRect::ZERO`].
    fn bounding_rect(&self) -> DomRect;
}

/// Reference to the node whose scrolling is locked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScrollTarget {
    /// Element that owns the node.
    pub host: ElementId,
    /// Class identifying the node inside the host's render tree.
    pub part: String,
}

impl ScrollTarget {
    pub fn new(host: ElementId, part: impl Into<String>) -> Self {
        Self {
            host,
            part: part.into(),
        }
    }
}

/// Page scroll-lock service.
///
/// Locking keeps `target` scrollable while everything behind it is frozen.
/// Every `lock` must be followed by exactly one `unlock` for the same target.
pub trait ScrollLock {
    fn lock(&mut self, target: &ScrollTarget);
    fn unlock(&mut self, target: &ScrollTarget);
}

/// Opaque handle to a document element returned by [`FocusHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Selector resolution and focus movement.
pub trait FocusHost {
    /// All elements matching a CSS selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<NodeHandle>;

    /// Whether the element can receive focus.
    fn is_focusable(&self, node: NodeHandle) -> bool;

    /// Move focus to the element.
    fn focus(&mut self, node: NodeHandle);
}
