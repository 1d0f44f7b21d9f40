#![forbid(unsafe_code)]

//! Reactive element lifecycle.
//!
//! [`ReactiveElement`] is the capability interface an element implements;
//! [`ElementHost`] is the runtime side that owns the element and drives it
//! through its lifecycle:
//!
//! ```text
//!            connect()                 disconnect()
//!  Detached ───────────► Connected ─────────────────► Detached
//!                          │   ▲
//!          perform_update()│   │ (hooks + settle)
//!                          ▼   │
//!                        render → first_updated (once) → updated
//! ```
//!
//! # Invariants
//!
//! 1. `connected` runs once per attach; attaching an attached element is a
//!    no-op, so per-attach resources are never duplicated.
//! 2. `first_updated` runs exactly once per host, before the first `updated`.
//! 3. Hooks run while the element is mutably borrowed; the host runs its
//!    settle callbacks (bus flushes) only after the borrow is released.
//! 4. Server rendering ([`ElementHost::render_to_string`]) runs no hooks.
//!
//! # Failure Modes
//!
//! - Updating a detached element returns [`LifecycleError::NotConnected`].
//! - An element whose hooks keep scheduling updates is stopped after
//!   [`MAX_SETTLE_CYCLES`] cycles with [`LifecycleError::UpdateLoop`].

use std::cell::{Ref, RefCell, RefMut};
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, warn};
use webc_core::dom::ElementId;
use webc_core::html::Node;

use crate::changes::ChangedProperties;

/// Upper bound on update cycles triggered by a single settle.
pub const MAX_SETTLE_CYCLES: usize = 16;

/// Context handed to the update hooks.
#[derive(Debug)]
pub struct Update<'a, K> {
    /// Properties changed since the previous update.
    pub changes: &'a ChangedProperties<K>,
    /// The tree produced by this cycle's `render`.
    pub tree: &'a Node,
}

/// An element driven by an [`ElementHost`].
pub trait ReactiveElement: Sized + 'static {
    /// Property key type used in change records.
    type Property: Copy + Eq + Hash + fmt::Debug + 'static;
    /// Configuration error reported on attach.
    type Error: Error + 'static;

    /// Identity of this instance.
    fn id(&self) -> ElementId;

    /// Produce the render tree for the current properties.
    fn render(&self) -> Node;

    /// Whether property changes are waiting for an update.
    fn has_pending_changes(&self) -> bool;

    /// Drain the recorded property changes.
    fn take_changes(&mut self) -> ChangedProperties<Self::Property>;

    /// Attached to a document. `this` refers back to the element for
    /// callbacks that outlive the hook (e.g. bus listeners).
    fn connected(&mut self, _this: &Weak<RefCell<Self>>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// After the first render.
    fn first_updated(&mut self, _update: &Update<'_, Self::Property>) {}

    /// After every render, including the first.
    fn updated(&mut self, _update: &Update<'_, Self::Property>) {}

    /// Detached from the document.
    fn disconnected(&mut self) {}
}

/// Where the element is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Detached,
    Connected,
}

/// Errors raised while driving an element.
#[derive(Debug)]
pub enum LifecycleError<E> {
    /// The element rejected its configuration on attach.
    Element(E),
    /// An update was requested while the element is detached.
    NotConnected(ElementId),
    /// Updates kept scheduling further updates.
    UpdateLoop { id: ElementId, cycles: usize },
}

impl<E: fmt::Display> fmt::Display for LifecycleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(e) => write!(f, "element configuration error: {e}"),
            Self::NotConnected(id) => write!(f, "{id} is not connected"),
            Self::UpdateLoop { id, cycles } => {
                write!(f, "{id} still had pending updates after {cycles} cycles")
            }
        }
    }
}

impl<E: Error + 'static> Error for LifecycleError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// Result of hydrating server markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationReport {
    /// Whether the client's first render reproduced the server markup.
    pub matched: bool,
}

/// Runtime owner of one element instance.
pub struct ElementHost<E: ReactiveElement> {
    element: Rc<RefCell<E>>,
    state: LifecycleState,
    has_updated: bool,
    tree: Option<Node>,
    settle: Vec<Box<dyn Fn()>>,
}

impl<E: ReactiveElement + fmt::Debug> fmt::Debug for ElementHost<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHost")
            .field("element", &self.element)
            .field("state", &self.state)
            .field("has_updated", &self.has_updated)
            .finish_non_exhaustive()
    }
}

impl<E: ReactiveElement> ElementHost<E> {
    /// Wrap a freshly created, detached element.
    pub fn new(element: E) -> Self {
        Self {
            element: Rc::new(RefCell::new(element)),
            state: LifecycleState::Detached,
            has_updated: false,
            tree: None,
            settle: Vec::new(),
        }
    }

    /// Register a callback run after every lifecycle step once the element
    /// is no longer borrowed (typically an event bus flush).
    #[must_use]
    pub fn on_settle(mut self, f: impl Fn() + 'static) -> Self {
        self.settle.push(Box::new(f));
        self
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == LifecycleState::Connected
    }

    /// Identity of the hosted element.
    pub fn id(&self) -> ElementId {
        self.element.borrow().id()
    }

    /// Borrow the element.
    pub fn element(&self) -> Ref<'_, E> {
        self.element.borrow()
    }

    /// Mutably borrow the element without running an update afterwards.
    pub fn element_mut(&self) -> RefMut<'_, E> {
        self.element.borrow_mut()
    }

    /// Shared handle to the element.
    pub fn handle(&self) -> Rc<RefCell<E>> {
        Rc::clone(&self.element)
    }

    /// The tree committed by the most recent update.
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    /// Attach the element and run its first update.
    pub fn connect(&mut self) -> Result<(), LifecycleError<E::Error>> {
        if self.state == LifecycleState::Connected {
            debug!(id = %self.id(), "connect on a connected element ignored");
            return Ok(());
        }
        let weak = Rc::downgrade(&self.element);
        self.element
            .borrow_mut()
            .connected(&weak)
            .map_err(LifecycleError::Element)?;
        self.state = LifecycleState::Connected;
        self.run_settle();
        if !self.has_updated {
            self.perform_update()?;
        }
        self.settle_updates()
    }

    /// Detach the element. Detaching a detached element is a no-op.
    pub fn disconnect(&mut self) {
        if self.state == LifecycleState::Detached {
            return;
        }
        self.element.borrow_mut().disconnected();
        self.state = LifecycleState::Detached;
        self.run_settle();
    }

    /// Run one update cycle: render, hooks, settle.
    pub fn perform_update(&mut self) -> Result<(), LifecycleError<E::Error>> {
        if self.state != LifecycleState::Connected {
            return Err(LifecycleError::NotConnected(self.id()));
        }
        {
            let mut el = self.element.borrow_mut();
            let _span = debug_span!("element.update", id = %el.id()).entered();
            let changes = el.take_changes();
            let tree = el.render();
            let update = Update {
                changes: &changes,
                tree: &tree,
            };
            if !self.has_updated {
                self.has_updated = true;
                el.first_updated(&update);
            }
            el.updated(&update);
            drop(el);
            self.tree = Some(tree);
        }
        self.run_settle();
        Ok(())
    }

    /// Run `f` against the element (an event handler), then perform any
    /// update it scheduled.
    pub fn interact<R>(
        &mut self,
        f: impl FnOnce(&mut E) -> R,
    ) -> Result<R, LifecycleError<E::Error>> {
        let out = f(&mut self.element.borrow_mut());
        self.run_settle();
        if self.is_connected() {
            self.settle_updates()?;
        }
        Ok(out)
    }

    /// Perform updates until no changes are pending.
    pub fn settle_updates(&mut self) -> Result<(), LifecycleError<E::Error>> {
        for _ in 0..MAX_SETTLE_CYCLES {
            if !self.element.borrow().has_pending_changes() {
                return Ok(());
            }
            self.perform_update()?;
        }
        if self.element.borrow().has_pending_changes() {
            let id = self.id();
            warn!(%id, cycles = MAX_SETTLE_CYCLES, "update loop detected");
            return Err(LifecycleError::UpdateLoop {
                id,
                cycles: MAX_SETTLE_CYCLES,
            });
        }
        Ok(())
    }

    /// Server-side render: markup for the current properties, no hooks.
    pub fn render_to_string(&self) -> String {
        self.element.borrow().render().to_html()
    }

    /// Attach over server-rendered markup and verify the first client render
    /// reproduces it.
    pub fn hydrate(
        &mut self,
        server_html: &str,
    ) -> Result<HydrationReport, LifecycleError<E::Error>> {
        self.connect()?;
        let client_html = self.tree.as_ref().map(Node::to_html).unwrap_or_default();
        let matched = client_html == server_html;
        if !matched {
            warn!(
                id = %self.id(),
                server = server_html,
                client = %client_html,
                "hydration mismatch"
            );
        }
        Ok(HydrationReport { matched })
    }

    fn run_settle(&self) {
        for f in &self.settle {
            f();
        }
    }
}

impl<E: ReactiveElement> Drop for ElementHost<E> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
