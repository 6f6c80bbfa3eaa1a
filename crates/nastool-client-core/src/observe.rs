//! Components that re-render when the state they read changes.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::state::{RenderContext, StateStore, SubscriptionId};

pub trait Component {
    fn render(&mut self, cx: &RenderContext);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Never connected.
    Detached,
    Observing,
    /// Was connected, now unmounted; the next connect re-renders.
    Disconnected,
}

struct Binding {
    store: StateStore,
    id: SubscriptionId,
}

struct Inner<C> {
    component: RefCell<C>,
    bindings: RefCell<Vec<Binding>>,
    lifecycle: Cell<Lifecycle>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
    render_count: Cell<u64>,
}

impl<C> Inner<C> {
    fn clear_bindings(&self) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        for binding in bindings {
            binding.store.unsubscribe(binding.id);
        }
    }
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        self.clear_bindings();
    }
}

/// Wraps a [`Component`] and keeps its subscriptions equal to the set of
/// state keys read during its most recent render.
pub struct ObservedComponent<C> {
    inner: Rc<Inner<C>>,
}

impl<C> Clone for ObservedComponent<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Component + 'static> ObservedComponent<C> {
    pub fn new(component: C) -> Self {
        Self {
            inner: Rc::new(Inner {
                component: RefCell::new(component),
                bindings: RefCell::new(Vec::new()),
                lifecycle: Cell::new(Lifecycle::Detached),
                rendering: Cell::new(false),
                dirty: Cell::new(false),
                render_count: Cell::new(0),
            }),
        }
    }

    /// Mounts the component. Both the first mount and a remount render once,
    /// which (re)builds the subscriptions.
    pub fn connect(&self) {
        if self.inner.lifecycle.get() == Lifecycle::Observing {
            return;
        }
        self.inner.lifecycle.set(Lifecycle::Observing);
        self.render();
    }

    pub fn disconnect(&self) {
        if self.inner.lifecycle.get() != Lifecycle::Observing {
            return;
        }
        self.inner.lifecycle.set(Lifecycle::Disconnected);
        self.inner.clear_bindings();
    }

    /// Observer entry point; ignored while unmounted.
    pub fn request_update(&self) {
        if self.inner.lifecycle.get() == Lifecycle::Observing {
            self.render();
        }
    }

    pub fn render(&self) {
        let inner = &self.inner;
        if inner.rendering.get() {
            inner.dirty.set(true);
            return;
        }

        inner.rendering.set(true);
        loop {
            inner.dirty.set(false);
            let cx = RenderContext::new();
            inner.component.borrow_mut().render(&cx);
            inner.render_count.set(inner.render_count.get() + 1);

            inner.clear_bindings();
            if inner.lifecycle.get() == Lifecycle::Observing {
                self.bind(cx.finish());
            }
            if !inner.dirty.get() {
                break;
            }
        }
        inner.rendering.set(false);
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle.get()
    }

    pub fn is_observing(&self) -> bool {
        self.lifecycle() == Lifecycle::Observing
    }

    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    pub fn render_count(&self) -> u64 {
        self.inner.render_count.get()
    }

    pub fn with_component<R>(&self, read: impl FnOnce(&C) -> R) -> R {
        read(&self.inner.component.borrow())
    }

    fn bind(&self, reads: Vec<(StateStore, Vec<String>)>) {
        let mut bindings = Vec::with_capacity(reads.len());
        for (store, keys) in reads {
            trace!(store = %store.name(), ?keys, "binding component to state keys");
            let weak: Weak<Inner<C>> = Rc::downgrade(&self.inner);
            let id = store.subscribe(
                move |_key| {
                    if let Some(inner) = weak.upgrade() {
                        Self { inner }.request_update();
                    }
                },
                Some(keys),
            );
            bindings.push(Binding { store, id });
        }
        *self.inner.bindings.borrow_mut() = bindings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateVar;

    struct Card {
        show_detail: StateVar<bool>,
        fav: StateVar<String>,
        detail: StateVar<String>,
        rendered: Vec<String>,
    }

    impl Component for Card {
        fn render(&mut self, cx: &RenderContext) {
            let mut line = self.fav.read(cx);
            if self.show_detail.read(cx) {
                line.push(':');
                line.push_str(&self.detail.read(cx));
            }
            self.rendered.push(line);
        }
    }

    struct Fixture {
        show_detail: StateVar<bool>,
        fav: StateVar<String>,
        detail: StateVar<String>,
        unrelated: StateVar<u32>,
        card: ObservedComponent<Card>,
    }

    fn fixture() -> Fixture {
        let store = StateStore::new("card");
        let show_detail = store.define("show_detail", false).expect("define");
        let fav = store.define("fav", "0".to_string()).expect("define");
        let detail = store.define("detail", "overview".to_string()).expect("define");
        let unrelated = store.define("unrelated", 0).expect("define");
        let card = ObservedComponent::new(Card {
            show_detail: show_detail.clone(),
            fav: fav.clone(),
            detail: detail.clone(),
            rendered: Vec::new(),
        });
        Fixture {
            show_detail,
            fav,
            detail,
            unrelated,
            card,
        }
    }

    #[test]
    fn rerenders_only_for_keys_read_last_render() {
        let fixture = fixture();
        fixture.card.connect();
        assert_eq!(fixture.card.render_count(), 1);

        fixture.unrelated.set(1);
        fixture.detail.set("changed".to_string());
        assert_eq!(fixture.card.render_count(), 1);

        fixture.fav.set("1".to_string());
        assert_eq!(fixture.card.render_count(), 2);
        assert_eq!(
            fixture.card.with_component(|card| card.rendered.clone()),
            vec!["0", "1"]
        );
    }

    #[test]
    fn conditional_reads_narrow_and_widen_subscriptions() {
        let fixture = fixture();
        fixture.card.connect();

        fixture.show_detail.set(true);
        assert_eq!(fixture.card.render_count(), 2);
        fixture.detail.set("plot".to_string());
        assert_eq!(fixture.card.render_count(), 3);

        fixture.show_detail.set(false);
        fixture.detail.set("ignored".to_string());
        assert_eq!(fixture.card.render_count(), 4);
        assert_eq!(
            fixture.card.with_component(|card| card.rendered.last().cloned()),
            Some("0".to_string())
        );
    }

    #[test]
    fn noop_write_does_not_rerender() {
        let fixture = fixture();
        fixture.card.connect();
        fixture.fav.set("0".to_string());
        assert_eq!(fixture.card.render_count(), 1);
    }

    #[test]
    fn disconnect_stops_notifications_and_reconnect_rerenders_once() {
        let fixture = fixture();
        fixture.card.connect();
        fixture.card.disconnect();
        assert_eq!(fixture.card.lifecycle(), Lifecycle::Disconnected);
        assert_eq!(fixture.card.binding_count(), 0);

        fixture.fav.set("1".to_string());
        assert_eq!(fixture.card.render_count(), 1);

        fixture.card.connect();
        assert_eq!(fixture.card.render_count(), 2);
        assert!(fixture.card.is_observing());
        assert_eq!(fixture.card.binding_count(), 1);

        fixture.card.connect();
        assert_eq!(fixture.card.render_count(), 2);

        fixture.fav.set("0".to_string());
        assert_eq!(fixture.card.render_count(), 3);
    }

    #[test]
    fn render_while_detached_does_not_subscribe() {
        let fixture = fixture();
        fixture.card.render();
        assert_eq!(fixture.card.binding_count(), 0);
        fixture.fav.set("1".to_string());
        assert_eq!(fixture.card.render_count(), 1);
    }

    #[test]
    fn dropping_component_releases_subscriptions() {
        let fixture = fixture();
        let store = fixture.fav.store().clone();
        fixture.card.connect();
        assert_eq!(store.observer_count(), 1);

        drop(fixture.card);
        assert_eq!(store.observer_count(), 0);
    }

    struct SelfCorrecting {
        value: StateVar<i32>,
        renders: u32,
    }

    impl Component for SelfCorrecting {
        fn render(&mut self, cx: &RenderContext) {
            self.renders += 1;
            let value = self.value.read(cx);
            if value < 0 {
                self.value.set(0);
            }
        }
    }

    #[test]
    fn write_during_render_queues_one_more_pass() {
        let store = StateStore::new("clamp");
        let value = store.define("value", 3).expect("define");
        let component = ObservedComponent::new(SelfCorrecting {
            value: value.clone(),
            renders: 0,
        });
        component.connect();

        value.set(-5);
        assert_eq!(value.get(), 0);
        assert_eq!(component.with_component(|c| c.renders), 3);
    }
}
