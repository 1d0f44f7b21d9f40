#![forbid(unsafe_code)]

//! Process-wide publish/subscribe channel for element events.
//!
//! # Design
//!
//! [`EventBus<E>`] keeps one listener list per event kind. Listeners are
//! stored as `Weak` callbacks; the strong side lives in the [`Subscription`]
//! guard returned to the subscriber, so dropping the guard unsubscribes.
//!
//! Dispatch is *deferred*: [`EventBus::dispatch`] only queues the event and
//! [`EventBus::flush`] delivers the queue. The runtime flushes once the
//! dispatching element has finished its lifecycle hook, which means a
//! listener may freely borrow the element that dispatched the event.
//!
//! # Invariants
//!
//! 1. Every live listener of an event's kind sees the event exactly once.
//! 2. Events are delivered in dispatch order, listeners in registration order.
//! 3. Events dispatched from inside a listener are delivered by the same
//!    flush, after the current event.
//! 4. A dropped [`Subscription`] is never called again.
//!
//! # Failure Modes
//!
//! - **Nested flush**: calling `flush()` from inside a listener returns `0`
//!   immediately; the outer flush picks up anything queued meanwhile.
//! - **Subscriber leak**: guards stored forever keep their callbacks alive.
//!   [`EventBus::listener_count`] exposes live counts for leak checks.
//! - **Dead slots**: slots of dropped guards are pruned on every subscribe
//!   and on delivery, so subscribe/drop cycles keep at most one dead slot
//!   per kind. [`EventBus::slot_count`] reports the stored total.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::{debug, info_span};
use web_time::Instant;

/// An event that can travel on an [`EventBus`].
pub trait BusEvent: fmt::Debug + 'static {
    /// Discriminant used to route the event to listeners.
    type Kind: Copy + Eq + Hash + fmt::Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

type CallbackRc<E> = Rc<dyn Fn(&E)>;
type CallbackWeak<E> = Weak<dyn Fn(&E)>;

struct BusInner<E: BusEvent> {
    listeners: AHashMap<E::Kind, Vec<CallbackWeak<E>>>,
    queue: VecDeque<E>,
    flushing: bool,
    delivered: u64,
}

/// A shared event channel.
///
/// Cloning an `EventBus` creates another handle to the **same** channel.
pub struct EventBus<E: BusEvent> {
    inner: Rc<RefCell<BusInner<E>>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("kinds", &inner.listeners.len())
            .field("queued", &inner.queue.len())
            .field("delivered", &inner.delivered)
            .finish()
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                listeners: AHashMap::new(),
                queue: VecDeque::new(),
                flushing: false,
                delivered: 0,
            })),
        }
    }

    /// Listen for events of one kind.
    pub fn subscribe(&self, kind: E::Kind, callback: impl Fn(&E) + 'static) -> Subscription {
        self.subscribe_many(&[kind], callback)
    }

    /// Listen for events of several kinds with a single callback.
    ///
    /// The returned guard covers all of `kinds`.
    pub fn subscribe_many(
        &self,
        kinds: &[E::Kind],
        callback: impl Fn(&E) + 'static,
    ) -> Subscription {
        let strong: CallbackRc<E> = Rc::new(callback);
        {
            let mut inner = self.inner.borrow_mut();
            for &kind in kinds {
                let list = inner.listeners.entry(kind).or_default();
                list.retain(|w| w.strong_count() > 0);
                list.push(Rc::downgrade(&strong));
            }
        }
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Queue an event for delivery on the next [`flush`](Self::flush).
    pub fn dispatch(&self, event: E) {
        debug!(kind = ?event.kind(), "event queued");
        self.inner.borrow_mut().queue.push_back(event);
    }

    /// Deliver all queued events. Returns the number of listener calls made.
    pub fn flush(&self) -> usize {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing || inner.queue.is_empty() {
                return 0;
            }
            inner.flushing = true;
        }
        let _reset = FlushGuard { bus: &self.inner };

        let started = Instant::now();
        let span = info_span!(
            "bus.flush",
            events = tracing::field::Empty,
            calls = tracing::field::Empty,
            duration_us = tracing::field::Empty
        )
        .entered();

        let mut events = 0_usize;
        let mut calls = 0_usize;
        loop {
            let next = self.inner.borrow_mut().queue.pop_front();
            let Some(event) = next else { break };
            events += 1;

            // Collect first so listeners can subscribe, dispatch, or drop guards.
            let callbacks: Vec<CallbackRc<E>> = {
                let mut inner = self.inner.borrow_mut();
                match inner.listeners.get_mut(&event.kind()) {
                    Some(list) => {
                        list.retain(|w| w.strong_count() > 0);
                        list.iter().filter_map(Weak::upgrade).collect()
                    }
                    None => Vec::new(),
                }
            };
            for cb in &callbacks {
                cb(&event);
            }
            calls += callbacks.len();
        }

        self.inner.borrow_mut().delivered += events as u64;
        span.record("events", events);
        span.record("calls", calls);
        span.record(
            "duration_us",
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        );
        calls
    }

    /// Number of events waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Number of live listeners for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(&kind)
            .map_or(0, |list| list.iter().filter(|w| w.strong_count() > 0).count())
    }

    /// Number of stored listener slots for `kind`, including dropped ones
    /// not yet pruned.
    #[must_use]
    pub fn slot_count(&self, kind: E::Kind) -> usize {
        self.inner.borrow().listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Total number of events delivered since creation.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.inner.borrow().delivered
    }
}

struct FlushGuard<'a, E: BusEvent> {
    bus: &'a Rc<RefCell<BusInner<E>>>,
}

impl<E: BusEvent> Drop for FlushGuard<'_, E> {
    fn drop(&mut self) {
        self.bus.borrow_mut().flushing = false;
    }
}

/// RAII guard for a bus listener.
///
/// Dropping the `Subscription` drops the strong callback, so the `Weak` held
/// by the bus stops upgrading and is pruned on the next subscribe or
/// delivery of its kind.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Ping,
        Pong,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Msg {
        kind: Kind,
        n: u32,
    }

    impl BusEvent for Msg {
        type Kind = Kind;
        fn kind(&self) -> Kind {
            self.kind
        }
    }

    fn ping(n: u32) -> Msg {
        Msg {
            kind: Kind::Ping,
            n,
        }
    }

    #[test]
    fn dispatch_is_deferred_until_flush() {
        let bus = EventBus::new();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = bus.subscribe(Kind::Ping, move |m: &Msg| s.set(s.get() + m.n));

        bus.dispatch(ping(3));
        assert_eq!(seen.get(), 0);
        assert_eq!(bus.pending(), 1);

        assert_eq!(bus.flush(), 1);
        assert_eq!(seen.get(), 3);
        assert_eq!(bus.pending(), 0);
        assert_eq!(bus.delivered(), 1);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let bus = EventBus::new();
        let pings = Rc::new(Cell::new(0));
        let p = Rc::clone(&pings);
        let _sub = bus.subscribe(Kind::Ping, move |_: &Msg| p.set(p.get() + 1));

        bus.dispatch(Msg {
            kind: Kind::Pong,
            n: 0,
        });
        bus.flush();
        assert_eq!(pings.get(), 0);
    }

    #[test]
    fn subscribe_many_shares_one_guard() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = bus.subscribe_many(&[Kind::Ping, Kind::Pong], move |_: &Msg| {
            c.set(c.get() + 1);
        });
        assert_eq!(bus.listener_count(Kind::Ping), 1);
        assert_eq!(bus.listener_count(Kind::Pong), 1);

        bus.dispatch(ping(0));
        bus.dispatch(Msg {
            kind: Kind::Pong,
            n: 0,
        });
        bus.flush();
        assert_eq!(count.get(), 2);

        drop(sub);
        assert_eq!(bus.listener_count(Kind::Ping), 0);
        assert_eq!(bus.listener_count(Kind::Pong), 0);
    }

    #[test]
    fn dropped_subscription_is_not_called() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = bus.subscribe(Kind::Ping, move |_: &Msg| c.set(c.get() + 1));
        drop(sub);

        bus.dispatch(ping(1));
        assert_eq!(bus.flush(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn events_dispatched_by_listeners_are_delivered_in_same_flush() {
        let bus: EventBus<Msg> = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let relay = bus.clone();
        let _a = bus.subscribe(Kind::Ping, move |m: &Msg| {
            relay.dispatch(Msg {
                kind: Kind::Pong,
                n: m.n + 1,
            });
            // Nested flush is a no-op.
            assert_eq!(relay.flush(), 0);
        });
        let l = Rc::clone(&log);
        let _b = bus.subscribe(Kind::Pong, move |m: &Msg| l.borrow_mut().push(m.n));

        bus.dispatch(ping(1));
        bus.flush();
        assert_eq!(*log.borrow(), vec![2]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn delivery_order_follows_registration() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut subs = Vec::new();
        for tag in ["first", "second", "third"] {
            let l = Rc::clone(&log);
            subs.push(bus.subscribe(Kind::Ping, move |_: &Msg| l.borrow_mut().push(tag)));
        }
        bus.dispatch(ping(0));
        bus.flush();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn subscribe_drop_cycles_do_not_grow_storage() {
        let bus: EventBus<Msg> = EventBus::new();
        let _keep = bus.subscribe(Kind::Ping, |_: &Msg| {});
        for _ in 0..1000 {
            let sub = bus.subscribe_many(&[Kind::Ping, Kind::Pong], |_: &Msg| {});
            drop(sub);
        }
        assert_eq!(bus.listener_count(Kind::Ping), 1);
        assert_eq!(bus.listener_count(Kind::Pong), 0);
        assert!(bus.slot_count(Kind::Ping) <= 2);
        assert!(bus.slot_count(Kind::Pong) <= 1);
    }

    #[test]
    fn flush_prunes_dropped_slots() {
        let bus = EventBus::new();
        let sub = bus.subscribe(Kind::Ping, |_: &Msg| {});
        drop(sub);
        assert_eq!(bus.slot_count(Kind::Ping), 1);
        bus.dispatch(ping(0));
        bus.flush();
        assert_eq!(bus.slot_count(Kind::Ping), 0);
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::new();
        let other = bus.clone();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = other.subscribe(Kind::Ping, move |_: &Msg| c.set(c.get() + 1));
        bus.dispatch(ping(0));
        other.flush();
        assert_eq!(count.get(), 1);
    }

    proptest! {
        #[test]
        fn delivery_follows_dispatch_order(ns in proptest::collection::vec(0u32..1000, 0..40)) {
            let bus = EventBus::new();
            let log = Rc::new(RefCell::new(Vec::new()));
            let l = Rc::clone(&log);
            let _sub = bus.subscribe_many(&[Kind::Ping, Kind::Pong], move |m: &Msg| {
                l.borrow_mut().push(m.n);
            });
            for (i, &n) in ns.iter().enumerate() {
                let kind = if i % 2 == 0 { Kind::Ping } else { Kind::Pong };
                bus.dispatch(Msg { kind, n });
            }
            prop_assert_eq!(bus.flush(), ns.len());
            prop_assert_eq!(&*log.borrow(), &ns);
        }
    }
}
