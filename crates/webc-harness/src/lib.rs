#![forbid(unsafe_code)]

//! In-memory collaborators for driving webc elements in tests.
//!
//! - [`FakeSurface`]: a dialog surface that records every call and flags
//!   shows the real primitive would reject.
//! - [`FakeScrollLock`]: tracks held locks and unbalanced unlocks.
//! - [`FakeFocusHost`]: a selector table with a focus cursor.
//! - [`EventRecorder`]: captures every modal event on a channel.
//! - [`ModalFixture`]: a modal element wired to all of the above.
//!
//! Collaborators share their state through `Rc`, so a test keeps a handle
//! after the element has taken ownership of its copy.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::warn;
use webc_core::dom::{
    DialogSurface, ElementId, FocusHost, NodeHandle, Readiness, ScrollLock, ScrollTarget,
};
use webc_core::geometry::{DomRect, Point};
use webc_runtime::bus::{EventBus, Subscription};
use webc_runtime::element::{ElementHost, LifecycleError};
use webc_widgets::modal::{
    ModalElement, ModalError, ModalEvent, ModalEventKind, ModalProps, ModalServices,
};

// ============================================================================
// Dialog surface
// ============================================================================

/// A call made on a [`FakeSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Prepare,
    ShowModal,
    Close(Option<String>),
}

#[derive(Debug)]
struct SurfaceState {
    connected: bool,
    shown: bool,
    rect: DomRect,
    readiness: Readiness,
    return_value: Option<String>,
    calls: Vec<SurfaceCall>,
    invalid_shows: usize,
}

/// Recording [`DialogSurface`].
#[derive(Debug, Clone)]
pub struct FakeSurface {
    state: Rc<RefCell<SurfaceState>>,
}

impl Default for FakeSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSurface {
    /// Box reported while shown.
    pub const RECT: DomRect = DomRect {
        x: 100.0,
        y: 100.0,
        width: 400.0,
        height: 300.0,
    };

    /// A connected surface that needs no setup.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SurfaceState {
                connected: true,
                shown: false,
                rect: Self::RECT,
                readiness: Readiness::NotRequired,
                return_value: None,
                calls: Vec::new(),
                invalid_shows: 0,
            })),
        }
    }

    /// A connected surface whose setup completes later.
    pub fn pending() -> Self {
        let surface = Self::new();
        surface.state.borrow_mut().readiness = Readiness::Pending;
        surface
    }

    /// A surface that is not attached to a document.
    pub fn disconnected() -> Self {
        let surface = Self::new();
        surface.set_connected(false);
        surface
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.borrow_mut().connected = connected;
    }

    /// Whether the surface is shown.
    pub fn shown(&self) -> bool {
        self.state.borrow().shown
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn show_count(&self) -> usize {
        self.count(|c| *c == SurfaceCall::ShowModal)
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, SurfaceCall::Close(_)))
    }

    /// `show_modal` calls made while shown or disconnected.
    pub fn invalid_shows(&self) -> usize {
        self.state.borrow().invalid_shows
    }

    /// Return value recorded by the last close.
    pub fn return_value(&self) -> Option<String> {
        self.state.borrow().return_value.clone()
    }

    /// A point well outside the shown box.
    pub fn outside_point() -> Point {
        Point::new(10.0, 10.0)
    }

    /// A point inside the shown box.
    pub fn inside_point() -> Point {
        Point::new(300.0, 250.0)
    }

    fn count(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }
}

impl DialogSurface for FakeSurface {
    fn prepare(&mut self) -> Readiness {
        let mut state = self.state.borrow_mut();
        state.calls.push(SurfaceCall::Prepare);
        state.readiness
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    fn is_shown(&self) -> bool {
        self.state.borrow().shown
    }

    fn show_modal(&mut self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(SurfaceCall::ShowModal);
        if state.shown || !state.connected {
            warn!(shown = state.shown, connected = state.connected, "invalid show_modal");
            state.invalid_shows += 1;
            return;
        }
        state.shown = true;
    }

    fn close(&mut self, return_value: Option<&str>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(SurfaceCall::Close(return_value.map(str::to_owned)));
        if state.shown {
            state.shown = false;
            state.return_value = return_value.map(str::to_owned);
        }
    }

    fn bounding_rect(&self) -> DomRect {
        let state = self.state.borrow();
        if state.shown { state.rect } else { DomRect::ZERO }
    }
}

// ============================================================================
// Scroll lock
// ============================================================================

/// A call made on a [`FakeScrollLock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollCall {
    Lock(ScrollTarget),
    Unlock(ScrollTarget),
}

/// Recording [`ScrollLock`] service shared by every modal in a test.
#[derive(Debug, Default)]
pub struct FakeScrollLock {
    held: Vec<ScrollTarget>,
    calls: Vec<ScrollCall>,
    unbalanced: usize,
}

impl FakeScrollLock {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Whether any lock is held for `host`.
    pub fn is_locked_by(&self, host: ElementId) -> bool {
        self.held.iter().any(|t| t.host == host)
    }

    pub fn held(&self) -> &[ScrollTarget] {
        &self.held
    }

    pub fn calls(&self) -> &[ScrollCall] {
        &self.calls
    }

    pub fn lock_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ScrollCall::Lock(_)))
            .count()
    }

    pub fn unlock_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ScrollCall::Unlock(_)))
            .count()
    }

    /// Unlocks with no matching lock, plus locks of an already held target.
    pub fn unbalanced(&self) -> usize {
        self.unbalanced
    }
}

impl ScrollLock for FakeScrollLock {
    fn lock(&mut self, target: &ScrollTarget) {
        self.calls.push(ScrollCall::Lock(target.clone()));
        if self.held.contains(target) {
            self.unbalanced += 1;
            return;
        }
        self.held.push(target.clone());
    }

    fn unlock(&mut self, target: &ScrollTarget) {
        self.calls.push(ScrollCall::Unlock(target.clone()));
        match self.held.iter().position(|t| t == target) {
            Some(i) => {
                self.held.remove(i);
            }
            None => self.unbalanced += 1,
        }
    }
}

// ============================================================================
// Focus host
// ============================================================================

#[derive(Debug)]
struct FakeNode {
    handle: NodeHandle,
    selector: String,
    focusable: bool,
}

/// Selector table with a focus cursor. Selectors match by exact string.
#[derive(Debug, Default)]
pub struct FakeFocusHost {
    nodes: Vec<FakeNode>,
    focused: Option<NodeHandle>,
    focus_calls: usize,
}

impl FakeFocusHost {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Add an element matched by `selector`.
    pub fn add(&mut self, selector: impl Into<String>, focusable: bool) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len() as u64 + 1);
        self.nodes.push(FakeNode {
            handle,
            selector: selector.into(),
            focusable,
        });
        handle
    }

    pub fn focused(&self) -> Option<NodeHandle> {
        self.focused
    }

    pub fn focus_calls(&self) -> usize {
        self.focus_calls
    }
}

impl FocusHost for FakeFocusHost {
    fn query_selector_all(&self, selector: &str) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.selector == selector)
            .map(|n| n.handle)
            .collect()
    }

    fn is_focusable(&self, node: NodeHandle) -> bool {
        self.nodes
            .iter()
            .any(|n| n.handle == node && n.focusable)
    }

    fn focus(&mut self, node: NodeHandle) {
        self.focus_calls += 1;
        self.focused = Some(node);
    }
}

// ============================================================================
// Event recorder
// ============================================================================

/// Captures every modal event delivered on a channel.
#[derive(Debug)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<ModalEvent>>>,
    _subscription: Subscription,
}

impl EventRecorder {
    pub fn attach(bus: &EventBus<ModalEvent>) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let subscription = bus.subscribe_many(&ModalEventKind::ALL, move |event| {
            sink.borrow_mut().push(*event);
        });
        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<ModalEvent> {
        self.events.borrow().clone()
    }

    /// Event kinds addressed to `target`, in delivery order.
    pub fn kinds_for(&self, target: ElementId) -> Vec<ModalEventKind> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.is_for(target))
            .map(|e| e.kind)
            .collect()
    }

    pub fn count(&self, kind: ModalEventKind, target: ElementId) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind == kind && e.is_for(target))
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

// ============================================================================
// Modal fixture
// ============================================================================

/// A modal element wired to fresh fakes.
pub struct ModalFixture {
    pub host: ElementHost<ModalElement>,
    pub surface: FakeSurface,
    pub scroll: Rc<RefCell<FakeScrollLock>>,
    pub focus: Rc<RefCell<FakeFocusHost>>,
    pub events: EventRecorder,
}

impl ModalFixture {
    /// A detached modal on its own channel.
    pub fn new(props: ModalProps) -> Self {
        Self::build(props, FakeSurface::new(), &EventBus::new(), FakeScrollLock::shared())
    }

    /// A detached modal with a specific surface.
    pub fn with_surface(props: ModalProps, surface: FakeSurface) -> Self {
        Self::build(props, surface, &EventBus::new(), FakeScrollLock::shared())
    }

    /// A detached modal sharing `bus` and `scroll` with other fixtures.
    pub fn on_shared(
        props: ModalProps,
        bus: &EventBus<ModalEvent>,
        scroll: &Rc<RefCell<FakeScrollLock>>,
    ) -> Self {
        Self::build(props, FakeSurface::new(), bus, Rc::clone(scroll))
    }

    fn build(
        props: ModalProps,
        surface: FakeSurface,
        bus: &EventBus<ModalEvent>,
        scroll: Rc<RefCell<FakeScrollLock>>,
    ) -> Self {
        let focus = FakeFocusHost::shared();
        let services = ModalServices {
            surface: Box::new(surface.clone()),
            scroll_lock: scroll.clone(),
            focus: focus.clone(),
        };
        let events = EventRecorder::attach(bus);
        let host = ModalElement::with_bus(props, services, bus.clone()).into_host();
        Self {
            host,
            surface,
            scroll,
            focus,
            events,
        }
    }

    /// A modal that has been attached and rendered.
    pub fn connected(props: ModalProps) -> Self {
        let mut fixture = Self::new(props);
        fixture.connect().unwrap_or_else(|e| panic!("fixture connect failed: {e}"));
        fixture
    }

    pub fn connect(&mut self) -> Result<(), LifecycleError<ModalError>> {
        self.host.connect()
    }

    pub fn disconnect(&mut self) {
        self.host.disconnect();
    }

    pub fn id(&self) -> ElementId {
        self.host.id()
    }

    pub fn modal(&self) -> Ref<'_, ModalElement> {
        self.host.element()
    }

    /// Run a handler against the modal and settle the resulting update.
    pub fn act<R>(&mut self, f: impl FnOnce(&mut ModalElement) -> R) -> R {
        self.host
            .interact(f)
            .unwrap_or_else(|e| panic!("interaction failed: {e}"))
    }

    /// Event kinds this modal has emitted so far.
    pub fn emitted(&self) -> Vec<ModalEventKind> {
        self.events.kinds_for(self.id())
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.scroll.borrow().is_locked_by(self.id())
    }
}
