//! Observable state shared between mounted components.
//!
//! A [`StateStore`] owns named [`StateVar`]s and a list of observers. Writes
//! that change a value notify, synchronously and in registration order,
//! every observer watching all keys or that key. Reads made through a
//! [`RenderContext`] are recorded so a component can subscribe to exactly
//! what its last render touched.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::error::{ClientError, Result};

pub type ObserverFn = Rc<dyn Fn(&str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct ObserverEntry {
    id: SubscriptionId,
    keys: Option<Vec<String>>,
    callback: ObserverFn,
    active: Rc<Cell<bool>>,
}

impl ObserverEntry {
    fn watches(&self, key: &str) -> bool {
        self.keys
            .as_ref()
            .is_none_or(|keys| keys.iter().any(|watched| watched == key))
    }
}

struct StoreInner {
    name: String,
    slots: RefCell<BTreeMap<String, Rc<dyn Any>>>,
    observers: RefCell<Vec<ObserverEntry>>,
    next_id: Cell<u64>,
}

/// Handle to a store; clones share the same variables and observers.
#[derive(Clone)]
pub struct StateStore {
    inner: Rc<StoreInner>,
}

impl PartialEq for StateStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for StateStore {}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("name", &self.inner.name)
            .field("keys", &self.keys())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl StateStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                name: name.into(),
                slots: RefCell::new(BTreeMap::new()),
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Declares `key` with an initial value. Declaring an existing key of the
    /// same type returns the existing variable and ignores `initial`; another
    /// type is rejected and the existing slot is left alone.
    pub fn define<T>(&self, key: &str, initial: T) -> Result<StateVar<T>>
    where
        T: Clone + PartialEq + 'static,
    {
        let mut slots = self.inner.slots.borrow_mut();
        let slot = match slots.get(key) {
            Some(existing) => Rc::clone(existing).downcast::<RefCell<T>>().map_err(|_| {
                warn!(store = %self.inner.name, key, "state var redefined with a different type");
                ClientError::StateTypeMismatch {
                    store: self.inner.name.clone(),
                    key: key.to_string(),
                }
            })?,
            None => {
                let slot = Rc::new(RefCell::new(initial));
                slots.insert(key.to_string(), slot.clone() as Rc<dyn Any>);
                slot
            }
        };
        Ok(StateVar {
            store: self.clone(),
            key: Rc::from(key),
            slot,
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.borrow().keys().cloned().collect()
    }

    /// Registers `observer` for `keys`, or for every key when `None`.
    pub fn subscribe(
        &self,
        observer: impl Fn(&str) + 'static,
        keys: Option<Vec<String>>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.observers.borrow_mut().push(ObserverEntry {
            id,
            keys,
            callback: Rc::new(observer),
            active: Rc::new(Cell::new(true)),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let Some(index) = observers.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = observers.remove(index);
        entry.active.set(false);
        true
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    fn notify(&self, key: &str) {
        let targets: Vec<(ObserverFn, Rc<Cell<bool>>)> = self
            .inner
            .observers
            .borrow()
            .iter()
            .filter(|entry| entry.watches(key))
            .map(|entry| (entry.callback.clone(), entry.active.clone()))
            .collect();
        trace!(store = %self.inner.name, key, observers = targets.len(), "state changed");

        for (callback, active) in targets {
            // Observers removed earlier in this pass must not fire.
            if active.get() {
                callback(key);
            }
        }
    }
}

/// One observable value inside a [`StateStore`].
pub struct StateVar<T> {
    store: StateStore,
    key: Rc<str>,
    slot: Rc<RefCell<T>>,
}

impl<T> Clone for StateVar<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateVar")
            .field("store", &self.store.name())
            .field("key", &self.key)
            .field("value", &self.slot.borrow())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> StateVar<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Current value without recording a dependency.
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }

    /// Current value, recorded as a dependency of the render in progress.
    pub fn read(&self, cx: &RenderContext) -> T {
        cx.record(&self.store, &self.key);
        self.get()
    }

    /// Stores `value` and notifies observers. Returns `false` (and notifies
    /// nobody) when the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        {
            let mut slot = self.slot.borrow_mut();
            if *slot == value {
                return false;
            }
            *slot = value;
        }
        self.store.notify(&self.key);
        true
    }

    pub fn update(&self, apply: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        apply(&mut next);
        self.set(next)
    }
}

/// Records `(store, key)` reads for the duration of one render.
#[derive(Debug, Default)]
pub struct RenderContext {
    reads: RefCell<Vec<(StateStore, Vec<String>)>>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, store: &StateStore, key: &str) {
        let mut reads = self.reads.borrow_mut();
        match reads.iter_mut().find(|(known, _)| known == store) {
            Some((_, keys)) => {
                if !keys.iter().any(|known| known == key) {
                    keys.push(key.to_string());
                }
            }
            None => reads.push((store.clone(), vec![key.to_string()])),
        }
    }

    /// Stores read during the render, in first-read order, with their keys.
    pub fn finish(self) -> Vec<(StateStore, Vec<String>)> {
        self.reads.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |key: &str| sink.borrow_mut().push(key.to_string()))
    }

    #[test]
    fn set_notifies_only_matching_observers() {
        let store = StateStore::new("cards");
        let a = store.define("a", 0).expect("define");
        let b = store.define("b", 0).expect("define");
        let (seen_a, observer_a) = counter();
        let (seen_all, observer_all) = counter();
        store.subscribe(observer_a, Some(vec!["a".to_string()]));
        store.subscribe(observer_all, None);

        assert!(a.set(1));
        assert!(b.set(1));

        assert_eq!(*seen_a.borrow(), vec!["a"]);
        assert_eq!(*seen_all.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn equal_write_is_a_noop() {
        let store = StateStore::new("cards");
        let hovered = store.define("hovered", Some("1".to_string())).expect("define");
        let (seen, observer) = counter();
        store.subscribe(observer, None);

        assert!(!hovered.set(Some("1".to_string())));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn unsubscribed_observer_is_silent() {
        let store = StateStore::new("cards");
        let a = store.define("a", 0).expect("define");
        let (seen, observer) = counter();
        let id = store.subscribe(observer, None);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        a.set(5);
        assert!(seen.borrow().is_empty());
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn notifications_follow_registration_order_and_cascade_synchronously() {
        let store = StateStore::new("search");
        let query = store.define("query", String::new()).expect("define");
        let results = store.define("results", 0_u32).expect("define");
        let log = Rc::new(RefCell::new(Vec::new()));

        let first_log = log.clone();
        let cascade = results.clone();
        store.subscribe(
            move |key| {
                first_log.borrow_mut().push(format!("first:{key}"));
                if key == "query" {
                    cascade.update(|count| *count += 1);
                }
            },
            None,
        );
        let second_log = log.clone();
        store.subscribe(move |key| second_log.borrow_mut().push(format!("second:{key}")), None);

        query.set("dune".to_string());

        assert_eq!(
            *log.borrow(),
            vec!["first:query", "first:results", "second:results", "second:query"]
        );
        assert_eq!(results.get(), 1);
    }

    #[test]
    fn observer_removed_mid_pass_does_not_fire() {
        let store = StateStore::new("cards");
        let a = store.define("a", 0).expect("define");
        let (seen, observer) = counter();
        let victim = Rc::new(Cell::new(None));

        let remover_store = store.clone();
        let remover_victim = victim.clone();
        store.subscribe(
            move |_| {
                if let Some(id) = remover_victim.get() {
                    remover_store.unsubscribe(id);
                }
            },
            None,
        );
        victim.set(Some(store.subscribe(observer, None)));

        a.set(1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn define_existing_key_shares_slot() {
        let store = StateStore::new("cards");
        let first = store.define("fav", "0".to_string()).expect("define");
        first.set("1".to_string());
        let second = store.define("fav", "0".to_string()).expect("define");
        assert_eq!(second.get(), "1");
        assert_eq!(store.keys(), vec!["fav"]);
    }

    #[test]
    fn define_with_another_type_keeps_the_existing_slot() {
        let store = StateStore::new("cards");
        let fav = store.define("fav", "0".to_string()).expect("define");
        let (seen, observer) = counter();
        store.subscribe(observer, None);

        let error = store.define("fav", 0_u8).expect_err("type clash");
        assert!(matches!(error, ClientError::StateTypeMismatch { .. }));

        fav.set("1".to_string());
        let again = store.define("fav", String::new()).expect("define");
        assert_eq!(again.get(), "1");
        assert_eq!(*seen.borrow(), vec!["fav"]);
    }

    #[test]
    fn render_context_records_unique_reads_per_store() {
        let cards = StateStore::new("cards");
        let search = StateStore::new("search");
        let a = cards.define("a", 1).expect("define");
        let b = cards.define("b", 2).expect("define");
        let q = search.define("q", 3).expect("define");

        let cx = RenderContext::new();
        assert_eq!(a.read(&cx) + b.read(&cx) + a.read(&cx) + q.read(&cx), 7);
        let _untracked = b.get();

        let reads = cx.finish();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0].0, cards);
        assert_eq!(reads[0].1, vec!["a", "b"]);
        assert_eq!(reads[1].0, search);
        assert_eq!(reads[1].1, vec!["q"]);
    }
}
