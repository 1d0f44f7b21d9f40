#![forbid(unsafe_code)]

//! Changed-property tracking for reactive elements.
//!
//! Each property setter records the value it is about to overwrite. The
//! runtime drains the record once per update cycle and hands it to the
//! element's `first_updated`/`updated` hooks.
//!
//! # Invariants
//!
//! 1. Within one cycle only the *oldest* previous value is kept: setting a
//!    property twice before an update reports the value it had before the
//!    first set.
//! 2. A property that had never been assigned reports [`Previous::Unset`],
//!    which is distinct from any real value (notably from `false`).

use std::any::Any;
use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;

/// What a property held before the current update cycle.
#[derive(Debug, PartialEq, Eq)]
pub enum Previous<'a, T> {
    /// The property did not change this cycle.
    Unchanged,
    /// The property changed and had never been assigned before.
    Unset,
    /// The property changed from this value.
    Value(&'a T),
}

impl<T> Previous<'_, T> {
    /// Whether the property changed this cycle.
    #[inline]
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Properties changed since the last update, with their previous values.
pub struct ChangedProperties<K> {
    entries: AHashMap<K, Option<Box<dyn Any>>>,
    order: Vec<K>,
}

impl<K> Default for ChangedProperties<K> {
    fn default() -> Self {
        Self {
            entries: AHashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for ChangedProperties<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.order.iter()).finish()
    }
}

impl<K: Copy + Eq + Hash + fmt::Debug> ChangedProperties<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` is changing away from `previous` (`None` = unset).
    ///
    /// Later records for the same key within a cycle are ignored.
    pub fn record<T: Clone + 'static>(&mut self, key: K, previous: Option<&T>) {
        if self.entries.contains_key(&key) {
            return;
        }
        let boxed = previous.map(|v| Box::new(v.clone()) as Box<dyn Any>);
        self.entries.insert(key, boxed);
        self.order.push(key);
    }

    /// Previous value of `key`, typed as `T`.
    ///
    /// Asking with the wrong `T` is a programming error; release builds
    /// treat it as [`Previous::Unchanged`].
    pub fn previous<T: 'static>(&self, key: K) -> Previous<'_, T> {
        match self.entries.get(&key) {
            None => Previous::Unchanged,
            Some(None) => Previous::Unset,
            Some(Some(boxed)) => match boxed.downcast_ref::<T>() {
                Some(v) => Previous::Value(v),
                None => {
                    debug_assert!(false, "property {key:?} queried with the wrong type");
                    Previous::Unchanged
                }
            },
        }
    }

    /// Whether `key` changed this cycle.
    pub fn has(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    /// Changed keys in the order they were first recorded.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Take the record, leaving an empty one behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Prop {
        Open,
        Title,
    }

    #[test]
    fn unset_is_distinct_from_false() {
        let mut changes = ChangedProperties::new();
        changes.record::<bool>(Prop::Open, None);
        assert_eq!(changes.previous::<bool>(Prop::Open), Previous::Unset);

        let mut changes = ChangedProperties::new();
        changes.record(Prop::Open, Some(&false));
        assert_eq!(changes.previous::<bool>(Prop::Open), Previous::Value(&false));
    }

    #[test]
    fn oldest_previous_value_wins() {
        let mut changes = ChangedProperties::new();
        changes.record(Prop::Title, Some(&"a".to_string()));
        changes.record(Prop::Title, Some(&"b".to_string()));
        assert_eq!(
            changes.previous::<String>(Prop::Title),
            Previous::Value(&"a".to_string())
        );
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn unchanged_keys_report_unchanged() {
        let changes = ChangedProperties::<Prop>::new();
        assert_eq!(changes.previous::<bool>(Prop::Open), Previous::Unchanged);
        assert!(!changes.previous::<bool>(Prop::Open).changed());
        assert!(!changes.has(Prop::Open));
    }

    #[test]
    fn take_drains() {
        let mut changes = ChangedProperties::new();
        changes.record(Prop::Open, Some(&true));
        changes.record::<String>(Prop::Title, None);
        let taken = changes.take();
        assert!(changes.is_empty());
        assert_eq!(taken.keys().collect::<Vec<_>>(), vec![Prop::Open, Prop::Title]);
    }

    proptest! {
        #[test]
        fn first_record_per_key_is_kept(
            writes in proptest::collection::vec((any::<bool>(), proptest::option::of(0u8..4)), 1..30)
        ) {
            let key = |open: bool| if open { Prop::Open } else { Prop::Title };
            let mut changes = ChangedProperties::new();
            for (open, prev) in &writes {
                changes.record(key(*open), prev.as_ref());
            }
            for open in [true, false] {
                let first = writes.iter().find(|(o, _)| *o == open).map(|(_, p)| p);
                let expected = match first {
                    None => Previous::Unchanged,
                    Some(None) => Previous::Unset,
                    Some(Some(v)) => Previous::Value(v),
                };
                prop_assert_eq!(changes.previous::<u8>(key(open)), expected);
            }
            let distinct = usize::from(writes.iter().any(|(o, _)| *o))
                + usize::from(writes.iter().any(|(o, _)| !*o));
            prop_assert_eq!(changes.len(), distinct);
        }
    }
}
