#![forbid(unsafe_code)]

//! The modal element: property surface, open/close state machine and the
//! side effects it drives.
//!
//! # State machine
//!
//! ```text
//!           is_open: unset/false → true
//!  CLOSED ─────────────────────────────► OPEN
//!    ▲        queue `modal-open`           │
//!    │                                     │ close button, light dismiss,
//!    │   queue `modal-back` (back flag)    │ cancel (dismissible only),
//!    └─────── or `modal-close` ◄───────────┘ action, back button
//! ```
//!
//! Transitions are evaluated in `updated` from the recorded previous value of
//! `is_open`. The first render counts as a transition when the property was
//! never assigned before, so a modal created open announces itself.
//!
//! Events go through the shared modal channel. Every attached instance
//! listens; only the addressed instance acts:
//!
//! - **open**: lock page scroll around the scroll container, then show the
//!   surface if it is connected, not already shown and its setup is done
//!   (otherwise the show waits for [`ModalElement::setup_complete`]).
//! - **close/back**: unlock scroll, close the surface if shown, then return
//!   focus to the element named by `return_focus_after_close_selector` when it
//!   resolves to exactly one focusable element.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use webc_core::dom::{
    DialogSurface, Direction, ElementId, FocusHost, Readiness, ScrollLock, ScrollTarget,
};
use webc_core::geometry::Point;
use webc_core::html::Node;
use webc_runtime::bus::{EventBus, Subscription};
use webc_runtime::changes::{ChangedProperties, Previous};
use webc_runtime::element::{ElementHost, ReactiveElement, Update};

use super::error::ModalError;
use super::events::{ModalEvent, ModalEventKind, modal_channel};
use super::props::{
    ActionProps, ActionSlot, HeadingLevel, ModalAria, ModalFlags, ModalPosition, ModalProperty,
    ModalProps, ModalSize,
};
use super::template::{self, SCROLL_CONTAINER_CLASS};
use crate::choice::Choice;

/// Document-side collaborators of one modal instance.
pub struct ModalServices {
    pub surface: Box<dyn DialogSurface>,
    pub scroll_lock: Rc<RefCell<dyn ScrollLock>>,
    pub focus: Rc<RefCell<dyn FocusHost>>,
}

impl fmt::Debug for ModalServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalServices")
            .field("surface_connected", &self.surface.is_connected())
            .field("surface_shown", &self.surface.is_shown())
            .finish_non_exhaustive()
    }
}

/// Progress of the surface's one-time setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    /// The first render has not happened yet.
    NotStarted,
    /// Setup is running; showing is deferred.
    Pending,
    /// The surface can be shown.
    Ready,
}

/// Result of a native cancel request (Escape key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The modal is not dismissible; nothing changed.
    Suppressed,
    /// The surface closed and the close path ran.
    Proceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Opened,
    Closed,
}

/// A modal dialog element.
pub struct ModalElement {
    id: ElementId,
    props: ModalProps,
    changes: ChangedProperties<ModalProperty>,
    services: ModalServices,
    bus: EventBus<ModalEvent>,
    subscription: Option<Subscription>,
    back_button_clicked: bool,
    setup: SetupState,
    show_deferred: bool,
    scroll_target: Option<ScrollTarget>,
    scroll_locked: Option<ScrollTarget>,
}

impl fmt::Debug for ModalElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalElement")
            .field("id", &self.id)
            .field("props", &self.props)
            .field("pending", &self.changes)
            .field("subscribed", &self.subscription.is_some())
            .field("back_button_clicked", &self.back_button_clicked)
            .field("setup", &self.setup)
            .field("scroll_locked", &self.scroll_locked.is_some())
            .finish_non_exhaustive()
    }
}

fn set_field<T: Clone + PartialEq + 'static>(
    changes: &mut ChangedProperties<ModalProperty>,
    property: ModalProperty,
    slot: &mut T,
    value: T,
) {
    if *slot == value {
        return;
    }
    changes.record(property, Some(&*slot));
    *slot = value;
}

impl ModalElement {
    /// Create a detached modal on the shared modal channel.
    pub fn new(props: ModalProps, services: ModalServices) -> Self {
        Self::with_bus(props, services, modal_channel())
    }

    /// Create a detached modal on a specific channel.
    pub fn with_bus(props: ModalProps, services: ModalServices, bus: EventBus<ModalEvent>) -> Self {
        let mut changes = ChangedProperties::new();
        // Every property starts out never-assigned.
        for property in ModalProperty::ALL {
            changes.record::<()>(property, None);
        }
        Self {
            id: ElementId::next(),
            props,
            changes,
            services,
            bus,
            subscription: None,
            back_button_clicked: false,
            setup: SetupState::NotStarted,
            show_deferred: false,
            scroll_target: None,
            scroll_locked: None,
        }
    }

    /// Wrap in a host that delivers queued modal events after every
    /// lifecycle step.
    pub fn into_host(self) -> ElementHost<Self> {
        let bus = self.bus.clone();
        ElementHost::new(self).on_settle(move || {
            bus.flush();
        })
    }

    #[inline]
    pub fn props(&self) -> &ModalProps {
        &self.props
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.props.is_open()
    }

    /// Whether the back button initiated the pending close.
    #[inline]
    pub fn back_button_clicked(&self) -> bool {
        self.back_button_clicked
    }

    #[inline]
    pub fn setup_state(&self) -> SetupState {
        self.setup
    }

    /// Whether this instance currently holds a page scroll lock.
    #[inline]
    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked.is_some()
    }

    /// Whether this instance is listening on the modal channel.
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn bus(&self) -> &EventBus<ModalEvent> {
        &self.bus
    }

    pub fn surface(&self) -> &dyn DialogSurface {
        self.services.surface.as_ref()
    }

    // --- properties -------------------------------------------------------

    fn set_flag(&mut self, flag: ModalFlags, value: bool) {
        let current = self.props.flags.contains(flag);
        if current == value {
            return;
        }
        if let Some(property) = ModalProperty::for_flag(flag) {
            self.changes.record(property, Some(&current));
        }
        self.props.flags.set(flag, value);
    }

    pub fn set_heading(&mut self, heading: impl Into<String>) {
        set_field(
            &mut self.changes,
            ModalProperty::Heading,
            &mut self.props.heading,
            heading.into(),
        );
    }

    pub fn set_heading_level(&mut self, level: HeadingLevel) {
        set_field(
            &mut self.changes,
            ModalProperty::HeadingLevel,
            &mut self.props.heading_level,
            level,
        );
    }

    pub fn set_open(&mut self, open: bool) {
        self.set_flag(ModalFlags::OPEN, open);
    }

    pub fn set_dismissible(&mut self, dismissible: bool) {
        self.set_flag(ModalFlags::DISMISSIBLE, dismissible);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.set_flag(ModalFlags::LOADING, loading);
    }

    pub fn set_footer_pinned(&mut self, pinned: bool) {
        self.set_flag(ModalFlags::FOOTER_PINNED, pinned);
    }

    pub fn set_full_width_below_mid(&mut self, full: bool) {
        self.set_flag(ModalFlags::FULL_WIDTH_BELOW_MID, full);
    }

    pub fn set_back_button(&mut self, back: bool) {
        self.set_flag(ModalFlags::BACK_BUTTON, back);
    }

    pub fn set_stacked_actions(&mut self, stacked: bool) {
        self.set_flag(ModalFlags::STACKED_ACTIONS, stacked);
    }

    pub fn set_position(&mut self, position: ModalPosition) {
        set_field(
            &mut self.changes,
            ModalProperty::Position,
            &mut self.props.position,
            position,
        );
    }

    pub fn set_size(&mut self, size: ModalSize) {
        set_field(
            &mut self.changes,
            ModalProperty::Size,
            &mut self.props.size,
            size,
        );
    }

    pub fn set_leading_action(&mut self, action: Option<ActionProps>) {
        set_field(
            &mut self.changes,
            ModalProperty::LeadingAction,
            &mut self.props.leading_action,
            action,
        );
    }

    pub fn set_supporting_action(&mut self, action: Option<ActionProps>) {
        set_field(
            &mut self.changes,
            ModalProperty::SupportingAction,
            &mut self.props.supporting_action,
            action,
        );
    }

    pub fn set_return_focus_after_close_selector(&mut self, selector: Option<String>) {
        set_field(
            &mut self.changes,
            ModalProperty::ReturnFocusAfterCloseSelector,
            &mut self.props.return_focus_after_close_selector,
            selector,
        );
    }

    pub fn set_aria(&mut self, aria: ModalAria) {
        set_field(
            &mut self.changes,
            ModalProperty::Aria,
            &mut self.props.aria,
            aria,
        );
    }

    pub fn set_dir(&mut self, dir: Direction) {
        set_field(&mut self.changes, ModalProperty::Dir, &mut self.props.dir, dir);
    }

    /// Apply an attribute change. `None` means the attribute was removed.
    ///
    /// Boolean attributes are true when present. Enum attributes outside
    /// their allow-list fall back to the default with a warning; malformed
    /// JSON in object attributes clears the property.
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> Result<(), ModalError> {
        let present = value.is_some();
        match name {
            "heading" => self.set_heading(value.unwrap_or_default()),
            "heading-level" => {
                self.set_heading_level(value.map(HeadingLevel::from_attr).unwrap_or_default());
            }
            "is-open" => self.set_open(present),
            "is-dismissible" => self.set_dismissible(present),
            "is-loading" => self.set_loading(present),
            "is-footer-pinned" => self.set_footer_pinned(present),
            "is-full-width-below-mid" => self.set_full_width_below_mid(present),
            "has-back-button" => self.set_back_button(present),
            "has-stacked-actions" => self.set_stacked_actions(present),
            "position" => {
                self.set_position(value.map(ModalPosition::from_attr).unwrap_or_default());
            }
            "size" => self.set_size(value.map(ModalSize::from_attr).unwrap_or_default()),
            "leading-action" => self.set_leading_action(
                value.and_then(|raw| ActionProps::from_json("leading-action", raw)),
            ),
            "supporting-action" => self.set_supporting_action(
                value.and_then(|raw| ActionProps::from_json("supporting-action", raw)),
            ),
            "return-focus-after-close-selector" => {
                self.set_return_focus_after_close_selector(value.map(str::to_owned));
            }
            "aria" => self.set_aria(value.map(ModalAria::from_json).unwrap_or_default()),
            "dir" => self.set_dir(value.map(Direction::from_attr).unwrap_or_default()),
            other => return Err(ModalError::UnknownAttribute(other.to_owned())),
        }
        Ok(())
    }

    // --- interactions -----------------------------------------------------

    /// The header close button was clicked.
    pub fn click_close_button(&mut self) {
        self.set_open(false);
    }

    /// The header back button was clicked.
    pub fn click_back_button(&mut self) {
        self.back_button_clicked = true;
        self.set_open(false);
    }

    /// The surface asked to cancel (Escape key).
    pub fn handle_cancel(&mut self) -> CancelOutcome {
        if !self.props.is_dismissible() {
            debug!(id = %self.id, "cancel suppressed");
            return CancelOutcome::Suppressed;
        }
        if self.services.surface.is_shown() {
            self.services.surface.close(None);
        }
        self.handle_surface_closed(None);
        CancelOutcome::Proceeded
    }

    /// A click landed on the surface at `point` (viewport coordinates).
    ///
    /// Returns whether the click dismissed the modal.
    pub fn handle_click(&mut self, point: Point) -> bool {
        if !self.props.is_dismissible() {
            return false;
        }
        if !point.is_finite() {
            warn!(id = %self.id, x = point.x, y = point.y, "non-finite click ignored");
            return false;
        }
        let rect = self.services.surface.bounding_rect();
        // An unshown surface has no box; nothing can be outside it.
        if rect.is_empty() || rect.contains(point) {
            return false;
        }
        debug!(id = %self.id, x = point.x, y = point.y, "light dismiss");
        self.set_open(false);
        true
    }

    /// A footer action was clicked. Returns `false` when the action is not
    /// rendered.
    pub fn click_action(&mut self, slot: ActionSlot) -> bool {
        let rendered = match slot {
            ActionSlot::Leading => self.props.renderable_leading().is_some(),
            ActionSlot::Supporting => self.props.renderable_supporting().is_some(),
        };
        if !rendered {
            return false;
        }
        let tag = slot.return_value();
        if self.services.surface.is_shown() {
            self.services.surface.close(Some(tag));
        }
        self.handle_surface_closed(Some(tag));
        true
    }

    /// The surface closed itself, with the return value of the form button
    /// that closed it (if any).
    pub fn handle_surface_closed(&mut self, return_value: Option<&str>) {
        if let Some(slot) = return_value.and_then(ActionSlot::from_return_value) {
            let kind = match slot {
                ActionSlot::Leading => ModalEventKind::LeadingActionClick,
                ActionSlot::Supporting => ModalEventKind::SupportingActionClick,
            };
            self.bus.dispatch(ModalEvent::new(kind, self.id));
        }
        self.set_open(false);
    }

    /// The surface's one-time setup finished. Shows the surface if an open
    /// was waiting on it.
    pub fn setup_complete(&mut self) {
        if self.setup == SetupState::Ready {
            return;
        }
        self.setup = SetupState::Ready;
        if std::mem::take(&mut self.show_deferred) && self.props.is_open() {
            self.show_surface();
        }
    }

    // --- side effects -----------------------------------------------------

    fn handle_event(&mut self, kind: ModalEventKind) {
        match kind {
            ModalEventKind::Open => self.on_open(),
            ModalEventKind::Close | ModalEventKind::Back => self.on_close(),
            ModalEventKind::LeadingActionClick | ModalEventKind::SupportingActionClick => {}
        }
    }

    fn on_open(&mut self) {
        self.lock_scroll();
        if self.setup != SetupState::Ready {
            debug!(id = %self.id, "surface setup pending, show deferred");
            self.show_deferred = true;
            return;
        }
        self.show_surface();
    }

    fn on_close(&mut self) {
        self.show_deferred = false;
        self.unlock_scroll();
        if self.services.surface.is_shown() {
            self.services.surface.close(None);
        }
        self.return_focus();
    }

    fn show_surface(&mut self) {
        let surface = &mut self.services.surface;
        if !surface.is_connected() {
            debug!(id = %self.id, "surface not connected, show skipped");
            return;
        }
        if surface.is_shown() {
            debug!(id = %self.id, "surface already shown");
            return;
        }
        surface.show_modal();
    }

    fn lock_scroll(&mut self) {
        if self.scroll_locked.is_some() {
            return;
        }
        if let Some(target) = self.scroll_target.clone() {
            self.services.scroll_lock.borrow_mut().lock(&target);
            self.scroll_locked = Some(target);
        }
    }

    fn unlock_scroll(&mut self) {
        if let Some(target) = self.scroll_locked.take() {
            self.services.scroll_lock.borrow_mut().unlock(&target);
        }
    }

    fn return_focus(&mut self) {
        let Some(selector) = self.props.return_focus_after_close_selector.as_deref() else {
            return;
        };
        let mut focus = self.services.focus.borrow_mut();
        match focus.query_selector_all(selector).as_slice() {
            [node] if focus.is_focusable(*node) => focus.focus(*node),
            matches => {
                debug!(id = %self.id, selector, matches = matches.len(), "focus return skipped");
            }
        }
    }

    fn open_transition(&self, changes: &ChangedProperties<ModalProperty>) -> Option<Transition> {
        let now = self.props.is_open();
        match changes.previous::<bool>(ModalProperty::IsOpen) {
            Previous::Unchanged => None,
            Previous::Unset => now.then_some(Transition::Opened),
            Previous::Value(&was) if was == now => None,
            Previous::Value(_) if now => Some(Transition::Opened),
            Previous::Value(_) => Some(Transition::Closed),
        }
    }
}

impl ReactiveElement for ModalElement {
    type Property = ModalProperty;
    type Error = ModalError;

    fn id(&self) -> ElementId {
        self.id
    }

    fn render(&self) -> Node {
        template::render(&self.props)
    }

    fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn take_changes(&mut self) -> ChangedProperties<ModalProperty> {
        self.changes.take()
    }

    fn connected(&mut self, this: &Weak<RefCell<Self>>) -> Result<(), ModalError> {
        if self.props.heading.trim().is_empty() {
            return Err(ModalError::MissingHeading(self.id));
        }
        if self.subscription.is_some() {
            return Ok(());
        }
        let id = self.id;
        let this = Weak::clone(this);
        let subscription = self.bus.subscribe_many(
            &[ModalEventKind::Open, ModalEventKind::Close, ModalEventKind::Back],
            move |event| {
                if !event.is_for(id) {
                    return;
                }
                let Some(modal) = this.upgrade() else {
                    return;
                };
                let Ok(mut modal) = modal.try_borrow_mut() else {
                    warn!(%id, kind = %event.kind, "modal busy, event dropped");
                    return;
                };
                modal.handle_event(event.kind);
            },
        );
        self.subscription = Some(subscription);
        debug!(%id, "modal subscribed");
        Ok(())
    }

    fn first_updated(&mut self, _update: &Update<'_, ModalProperty>) {
        self.setup = match self.services.surface.prepare() {
            Readiness::Pending => SetupState::Pending,
            Readiness::Ready | Readiness::NotRequired => SetupState::Ready,
        };
    }

    fn updated(&mut self, update: &Update<'_, ModalProperty>) {
        self.scroll_target = update
            .tree
            .find_by_class(SCROLL_CONTAINER_CLASS)
            .map(|_| ScrollTarget::new(self.id, SCROLL_CONTAINER_CLASS));

        let changes = update.changes;
        let actions_changed = changes.has(ModalProperty::LeadingAction)
            || changes.has(ModalProperty::SupportingAction);
        if actions_changed && self.props.has_orphan_supporting_action() {
            warn!(
                id = %self.id,
                "supporting action requires a leading action with text; not rendered"
            );
        }

        let Some(transition) = self.open_transition(changes) else {
            return;
        };
        let back = std::mem::take(&mut self.back_button_clicked);
        let kind = match transition {
            Transition::Opened => ModalEventKind::Open,
            Transition::Closed if back => ModalEventKind::Back,
            Transition::Closed => ModalEventKind::Close,
        };
        debug!(id = %self.id, event = %kind, "open state changed");
        self.bus.dispatch(ModalEvent::new(kind, self.id));
    }

    fn disconnected(&mut self) {
        self.subscription = None;
        self.unlock_scroll();
        self.back_button_clicked = false;
        self.show_deferred = false;
        debug!(id = %self.id, "modal detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use webc_core::dom::NodeHandle;
    use webc_core::geometry::DomRect;
    use webc_runtime::element::LifecycleError;

    struct Detached;

    impl DialogSurface for Detached {
        fn is_connected(&self) -> bool {
            false
        }
        fn is_shown(&self) -> bool {
            false
        }
        fn show_modal(&mut self) {}
        fn close(&mut self, _return_value: Option<&str>) {}
        fn bounding_rect(&self) -> DomRect {
            DomRect::ZERO
        }
    }

    struct NoScroll;

    impl ScrollLock for NoScroll {
        fn lock(&mut self, _target: &ScrollTarget) {}
        fn unlock(&mut self, _target: &ScrollTarget) {}
    }

    struct NoFocus;

    impl FocusHost for NoFocus {
        fn query_selector_all(&self, _selector: &str) -> Vec<NodeHandle> {
            Vec::new()
        }
        fn is_focusable(&self, _node: NodeHandle) -> bool {
            false
        }
        fn focus(&mut self, _node: NodeHandle) {}
    }

    fn modal(props: ModalProps) -> ModalElement {
        let services = ModalServices {
            surface: Box::new(Detached),
            scroll_lock: Rc::new(RefCell::new(NoScroll)),
            focus: Rc::new(RefCell::new(NoFocus)),
        };
        ModalElement::with_bus(props, services, EventBus::new())
    }

    #[test]
    fn attach_without_heading_fails() {
        let mut host = modal(ModalProps::new("   ")).into_host();
        let id = host.id();
        match host.connect() {
            Err(LifecycleError::Element(ModalError::MissingHeading(got))) => assert_eq!(got, id),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!host.element().is_subscribed());
    }

    #[test]
    fn attach_subscribes_once() {
        let mut host = modal(ModalProps::new("Hi")).into_host();
        host.connect().unwrap();
        host.connect().unwrap();
        let bus = host.element().bus().clone();
        assert_eq!(bus.listener_count(ModalEventKind::Open), 1);
        host.disconnect();
        assert_eq!(bus.listener_count(ModalEventKind::Open), 0);
        assert!(!host.element().is_subscribed());
    }

    #[test]
    fn boolean_attributes_follow_presence() {
        let mut m = modal(ModalProps::new("Hi"));
        m.set_attribute("is-dismissible", Some("")).unwrap();
        m.set_attribute("is-footer-pinned", None).unwrap();
        assert!(m.props().is_dismissible());
        assert!(!m.props().is_footer_pinned());
        m.set_attribute("is-dismissible", None).unwrap();
        assert!(!m.props().is_dismissible());
    }

    #[traced_test]
    #[test]
    fn enum_attributes_validate() {
        let mut m = modal(ModalProps::new("Hi"));
        m.set_attribute("size", Some("large")).unwrap();
        m.set_attribute("heading-level", Some("h9")).unwrap();
        m.set_attribute("position", Some("top")).unwrap();
        assert_eq!(m.props().size, ModalSize::Large);
        assert_eq!(m.props().heading_level, HeadingLevel::H2);
        assert_eq!(m.props().position, ModalPosition::Top);
        assert!(logs_contain("invalid property value"));
        m.set_attribute("size", None).unwrap();
        assert_eq!(m.props().size, ModalSize::Medium);
    }

    #[test]
    fn object_attributes_parse_json() {
        let mut m = modal(ModalProps::new("Hi"));
        m.set_attribute("leading-action", Some(r#"{"text":"OK"}"#)).unwrap();
        m.set_attribute("aria", Some(r#"{"close":"Close"}"#)).unwrap();
        m.set_attribute("dir", Some("rtl")).unwrap();
        assert_eq!(m.props().leading_action, Some(ActionProps::new("OK")));
        assert_eq!(m.props().aria.close.as_deref(), Some("Close"));
        assert_eq!(m.props().dir, Direction::Rtl);
        m.set_attribute("leading-action", Some("{broken")).unwrap();
        assert_eq!(m.props().leading_action, None);
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let mut m = modal(ModalProps::new("Hi"));
        assert_eq!(
            m.set_attribute("colour", Some("red")),
            Err(ModalError::UnknownAttribute("colour".into()))
        );
    }

    #[test]
    fn setting_an_equal_value_records_nothing() {
        let mut m = modal(ModalProps::new("Hi"));
        m.take_changes();
        m.set_size(ModalSize::Medium);
        m.set_open(false);
        assert!(!m.has_pending_changes());
        m.set_open(true);
        m.set_open(false);
        let changes = m.take_changes();
        assert_eq!(changes.previous::<bool>(ModalProperty::IsOpen), Previous::Value(&false));
    }

    #[test]
    fn show_skipped_when_surface_detached() {
        let mut host = modal(ModalProps::new("Hi").open(true)).into_host();
        host.connect().unwrap();
        assert!(host.element().is_open());
        assert!(!host.element().surface().is_shown());
    }

    #[traced_test]
    #[test]
    fn orphan_supporting_action_warns() {
        let props = ModalProps::new("Hi").supporting_action(ActionProps::new("Cancel"));
        let mut host = modal(props).into_host();
        host.connect().unwrap();
        assert!(logs_contain("supporting action requires a leading action"));
    }
}
