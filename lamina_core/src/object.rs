// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object lifecycle substrate: weak references, signals, and deferred events.
//!
//! Every trackable entity is an *object* in an [`ObjectRegistry`]. An object
//! carries a small `Copy` payload describing what it stands for (for the scene
//! this is a node or target handle) and takes part in three relations:
//!
//! - **Weak holders** ([`WeakRef`]) observe an object without owning it. When
//!   the object is destroyed every holder is nulled and its destroy callback,
//!   if any, fires exactly once.
//! - **Signals** ([`SignalId`]) are owned by an object and broadcast events of
//!   type `E` to connected listeners.
//! - **Listeners** ([`ListenerId`]) are owned by an object and connected to a
//!   signal. Destroying either side unlinks both records.
//!
//! Every link is stored twice (once on each side) together with its position
//! in the other side's list, so unlinking is O(1) swap-with-last on both ends.
//!
//! [`SafeEventQueue`] defers events addressed through weak references; events
//! whose target died before the queue drains are dropped silently.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use crate::node::INVALID;

/// Handle to an object in an [`ObjectRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}@gen{})", self.idx, self.generation)
    }
}

/// A weak-reference holder.
///
/// The holder stays allocated (and [dangling](ObjectRegistry::is_dangling)
/// once its object dies) until it is [released](ObjectRegistry::release).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakRef {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({}@gen{})", self.idx, self.generation)
    }
}

/// Handle to a signal owned by an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignalId {
    idx: u32,
    generation: u32,
}

/// Handle to a listener connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId {
    idx: u32,
    generation: u32,
}

type DestroyCallback = Box<dyn FnMut(WeakRef)>;
type ListenerCallback<E> = Box<dyn FnMut(&E)>;

struct ObjectSlot<T> {
    generation: u32,
    payload: Option<T>,
    holders: Vec<u32>,
    signals: Vec<u32>,
    listeners: Vec<u32>,
}

struct HolderSlot {
    generation: u32,
    live: bool,
    /// Owning object slot, or [`INVALID`] once the object died.
    owner: u32,
    /// Position in the owner's `holders` list.
    link: u32,
    on_destroy: Option<DestroyCallback>,
}

struct SignalSlot {
    generation: u32,
    live: bool,
    owner: u32,
    owner_link: u32,
    listeners: Vec<u32>,
}

struct ListenerSlot<E> {
    generation: u32,
    live: bool,
    signal: u32,
    signal_link: u32,
    owner: u32,
    owner_link: u32,
    callback: Option<ListenerCallback<E>>,
}

/// Generational arena of trackable objects.
///
/// `T` is the payload handed back by [`upgrade`](Self::upgrade) and
/// [`SafeEventQueue::drain`]; `E` is the event type broadcast by signals.
pub struct ObjectRegistry<T: Copy, E> {
    objects: Vec<ObjectSlot<T>>,
    free_objects: Vec<u32>,
    holders: Vec<HolderSlot>,
    free_holders: Vec<u32>,
    signals: Vec<SignalSlot>,
    free_signals: Vec<u32>,
    listeners: Vec<ListenerSlot<E>>,
    free_listeners: Vec<u32>,
}

impl<T: Copy + fmt::Debug, E> fmt::Debug for ObjectRegistry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("live_objects", &self.live_objects())
            .field("holders", &(self.holders.len() - self.free_holders.len()))
            .field("signals", &(self.signals.len() - self.free_signals.len()))
            .field(
                "listeners",
                &(self.listeners.len() - self.free_listeners.len()),
            )
            .finish_non_exhaustive()
    }
}

impl<T: Copy, E> Default for ObjectRegistry<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, E> ObjectRegistry<T, E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            free_objects: Vec::new(),
            holders: Vec::new(),
            free_holders: Vec::new(),
            signals: Vec::new(),
            free_signals: Vec::new(),
            listeners: Vec::new(),
            free_listeners: Vec::new(),
        }
    }

    // -- Objects --

    /// Creates an object carrying `payload`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena slots are addressed by u32 indices"
    )]
    pub fn create(&mut self, payload: T) -> ObjectId {
        if let Some(idx) = self.free_objects.pop() {
            let slot = &mut self.objects[idx as usize];
            slot.payload = Some(payload);
            ObjectId {
                idx,
                generation: slot.generation,
            }
        } else {
            let idx = self.objects.len() as u32;
            self.objects.push(ObjectSlot {
                generation: 0,
                payload: Some(payload),
                holders: Vec::new(),
                signals: Vec::new(),
                listeners: Vec::new(),
            });
            ObjectId { idx, generation: 0 }
        }
    }

    /// Returns `true` if `id` refers to an object that has not been destroyed.
    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.objects
            .get(id.idx as usize)
            .is_some_and(|s| s.generation == id.generation && s.payload.is_some())
    }

    /// Returns the payload of a live object.
    #[must_use]
    pub fn payload(&self, id: ObjectId) -> Option<T> {
        let slot = self.objects.get(id.idx as usize)?;
        if slot.generation == id.generation {
            slot.payload
        } else {
            None
        }
    }

    /// Number of live objects.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.objects.len() - self.free_objects.len()
    }

    /// Destroys an object.
    ///
    /// Nulls every weak holder (firing each destroy callback once), drops every
    /// signal the object owns together with its listener links, and
    /// disconnects every listener the object owns. Returns `false` (and does
    /// nothing) if the object was already destroyed.
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.idx;
        let slot = &mut self.objects[idx as usize];
        slot.payload = None;
        let holders = core::mem::take(&mut slot.holders);
        let signals = core::mem::take(&mut slot.signals);
        let listeners = core::mem::take(&mut slot.listeners);

        for h in holders {
            let generation = self.holders[h as usize].generation;
            let holder = &mut self.holders[h as usize];
            holder.owner = INVALID;
            holder.link = INVALID;
            if let Some(mut callback) = holder.on_destroy.take() {
                callback(WeakRef { idx: h, generation });
            }
        }

        for s in signals {
            let links = core::mem::take(&mut self.signals[s as usize].listeners);
            for l in links {
                let (owner, owner_link) = {
                    let listener = &self.listeners[l as usize];
                    (listener.owner, listener.owner_link)
                };
                // Listeners owned by the dying object were taken above.
                if owner != idx {
                    self.unlink_owner_listener(owner, owner_link);
                }
                self.free_listener(l);
            }
            self.free_signal(s);
        }

        for l in listeners {
            if !self.listeners[l as usize].live {
                continue;
            }
            let (signal, signal_link) = {
                let listener = &self.listeners[l as usize];
                (listener.signal, listener.signal_link)
            };
            self.unlink_signal_listener(signal, signal_link);
            self.free_listener(l);
        }

        let slot = &mut self.objects[idx as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free_objects.push(idx);
        true
    }

    // -- Weak references --

    /// Creates a weak holder observing `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena slots and link positions are addressed by u32 indices"
    )]
    pub fn downgrade(&mut self, id: ObjectId) -> WeakRef {
        assert!(self.is_alive(id), "stale ObjectId: {id:?}");
        let link = self.objects[id.idx as usize].holders.len() as u32;
        let holder = HolderSlot {
            generation: 0,
            live: true,
            owner: id.idx,
            link,
            on_destroy: None,
        };
        let h = if let Some(h) = self.free_holders.pop() {
            let slot = &mut self.holders[h as usize];
            let generation = slot.generation;
            *slot = HolderSlot {
                generation,
                ..holder
            };
            h
        } else {
            let h = self.holders.len() as u32;
            self.holders.push(holder);
            h
        };
        self.objects[id.idx as usize].holders.push(h);
        WeakRef {
            idx: h,
            generation: self.holders[h as usize].generation,
        }
    }

    /// Returns the payload of the observed object if it is still alive.
    #[must_use]
    pub fn upgrade(&self, weak: WeakRef) -> Option<T> {
        let holder = self.holder(weak)?;
        if holder.owner == INVALID {
            return None;
        }
        self.objects[holder.owner as usize].payload
    }

    /// Returns `true` if the observed object has been destroyed (or the holder
    /// was released).
    #[must_use]
    pub fn is_dangling(&self, weak: WeakRef) -> bool {
        self.holder(weak).is_none_or(|h| h.owner == INVALID)
    }

    /// Registers a callback fired once when the observed object is destroyed.
    ///
    /// Replaces any previously registered callback. Has no effect on a
    /// dangling holder.
    pub fn on_destroy(&mut self, weak: WeakRef, callback: impl FnMut(WeakRef) + 'static) {
        if self.is_dangling(weak) {
            return;
        }
        self.holders[weak.idx as usize].on_destroy = Some(Box::new(callback));
    }

    /// Releases a weak holder.
    ///
    /// Removes it from its object's holder list in O(1). Releasing an already
    /// released holder is a no-op.
    pub fn release(&mut self, weak: WeakRef) {
        let Some(holder) = self.holder(weak) else {
            return;
        };
        let (owner, link) = (holder.owner, holder.link);
        if owner != INVALID {
            let list = &mut self.objects[owner as usize].holders;
            list.swap_remove(link as usize);
            if let Some(&moved) = list.get(link as usize) {
                self.holders[moved as usize].link = link;
            }
        }
        let slot = &mut self.holders[weak.idx as usize];
        slot.live = false;
        slot.owner = INVALID;
        slot.on_destroy = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_holders.push(weak.idx);
    }

    /// Number of holders currently observing `id`.
    #[must_use]
    pub fn holder_count(&self, id: ObjectId) -> usize {
        if self.is_alive(id) {
            self.objects[id.idx as usize].holders.len()
        } else {
            0
        }
    }

    fn holder(&self, weak: WeakRef) -> Option<&HolderSlot> {
        self.holders
            .get(weak.idx as usize)
            .filter(|h| h.live && h.generation == weak.generation)
    }

    // -- Signals --

    /// Creates a signal owned by `owner`.
    ///
    /// # Panics
    ///
    /// Panics if `owner` is not alive.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena slots and link positions are addressed by u32 indices"
    )]
    pub fn create_signal(&mut self, owner: ObjectId) -> SignalId {
        assert!(self.is_alive(owner), "stale ObjectId: {owner:?}");
        let owner_link = self.objects[owner.idx as usize].signals.len() as u32;
        let s = if let Some(s) = self.free_signals.pop() {
            let slot = &mut self.signals[s as usize];
            slot.live = true;
            slot.owner = owner.idx;
            slot.owner_link = owner_link;
            s
        } else {
            let s = self.signals.len() as u32;
            self.signals.push(SignalSlot {
                generation: 0,
                live: true,
                owner: owner.idx,
                owner_link,
                listeners: Vec::new(),
            });
            s
        };
        self.objects[owner.idx as usize].signals.push(s);
        SignalId {
            idx: s,
            generation: self.signals[s as usize].generation,
        }
    }

    /// Returns `true` if the signal still exists (its owner is alive).
    #[must_use]
    pub fn signal_alive(&self, signal: SignalId) -> bool {
        self.signals
            .get(signal.idx as usize)
            .is_some_and(|s| s.live && s.generation == signal.generation)
    }

    /// Connects a listener owned by `owner` to `signal`.
    ///
    /// Returns `None` if the signal or the owner no longer exists.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "arena slots and link positions are addressed by u32 indices"
    )]
    pub fn connect(
        &mut self,
        signal: SignalId,
        owner: ObjectId,
        callback: impl FnMut(&E) + 'static,
    ) -> Option<ListenerId> {
        if !self.signal_alive(signal) || !self.is_alive(owner) {
            return None;
        }
        let signal_link = self.signals[signal.idx as usize].listeners.len() as u32;
        let owner_link = self.objects[owner.idx as usize].listeners.len() as u32;
        let record = ListenerSlot {
            generation: 0,
            live: true,
            signal: signal.idx,
            signal_link,
            owner: owner.idx,
            owner_link,
            callback: Some(Box::new(callback)),
        };
        let l = if let Some(l) = self.free_listeners.pop() {
            let slot = &mut self.listeners[l as usize];
            let generation = slot.generation;
            *slot = ListenerSlot {
                generation,
                ..record
            };
            l
        } else {
            let l = self.listeners.len() as u32;
            self.listeners.push(record);
            l
        };
        self.signals[signal.idx as usize].listeners.push(l);
        self.objects[owner.idx as usize].listeners.push(l);
        Some(ListenerId {
            idx: l,
            generation: self.listeners[l as usize].generation,
        })
    }

    /// Disconnects a listener. Returns `false` if it was already gone.
    pub fn disconnect(&mut self, listener: ListenerId) -> bool {
        let Some(record) = self
            .listeners
            .get(listener.idx as usize)
            .filter(|l| l.live && l.generation == listener.generation)
        else {
            return false;
        };
        let (signal, signal_link, owner, owner_link) = (
            record.signal,
            record.signal_link,
            record.owner,
            record.owner_link,
        );
        self.unlink_signal_listener(signal, signal_link);
        self.unlink_owner_listener(owner, owner_link);
        self.free_listener(listener.idx);
        true
    }

    /// Number of listeners connected to `signal`.
    #[must_use]
    pub fn listener_count(&self, signal: SignalId) -> usize {
        if self.signal_alive(signal) {
            self.signals[signal.idx as usize].listeners.len()
        } else {
            0
        }
    }

    /// Broadcasts `event` to every listener of `signal`, in connection order
    /// (modulo swap-with-last removals). Returns the number of listeners
    /// invoked.
    pub fn emit(&mut self, signal: SignalId, event: &E) -> usize {
        if !self.signal_alive(signal) {
            return 0;
        }
        let links = self.signals[signal.idx as usize].listeners.clone();
        let mut invoked = 0;
        for l in links {
            if let Some(callback) = self.listeners[l as usize].callback.as_mut() {
                callback(event);
                invoked += 1;
            }
        }
        invoked
    }

    // -- Internal helpers --

    /// Removes the entry at `link` from `signal`'s listener list.
    fn unlink_signal_listener(&mut self, signal: u32, link: u32) {
        let list = &mut self.signals[signal as usize].listeners;
        list.swap_remove(link as usize);
        if let Some(&moved) = list.get(link as usize) {
            self.listeners[moved as usize].signal_link = link;
        }
    }

    /// Removes the entry at `link` from `owner`'s listener list.
    fn unlink_owner_listener(&mut self, owner: u32, link: u32) {
        let list = &mut self.objects[owner as usize].listeners;
        list.swap_remove(link as usize);
        if let Some(&moved) = list.get(link as usize) {
            self.listeners[moved as usize].owner_link = link;
        }
    }

    fn free_listener(&mut self, l: u32) {
        let slot = &mut self.listeners[l as usize];
        slot.live = false;
        slot.callback = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_listeners.push(l);
    }

    fn free_signal(&mut self, s: u32) {
        let slot = &mut self.signals[s as usize];
        slot.live = false;
        slot.listeners.clear();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_signals.push(s);
    }
}

/// Events queued against objects through weak references.
///
/// The queue owns one weak holder per event; each holder is released when
/// its event is drained.
pub struct SafeEventQueue<E> {
    events: VecDeque<(WeakRef, E)>,
}

impl<E> fmt::Debug for SafeEventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeEventQueue")
            .field("len", &self.events.len())
            .finish()
    }
}

impl<E> Default for SafeEventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SafeEventQueue<E> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Queues `event` for the object observed by `weak`.
    ///
    /// The queue takes ownership of the holder.
    pub fn push(&mut self, weak: WeakRef, event: E) {
        self.events.push_back((weak, event));
    }

    /// Number of queued events (including ones whose target already died).
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Delivers queued events in FIFO order.
    ///
    /// Events whose target was destroyed are dropped. Every holder is
    /// released. Returns the number of events delivered.
    pub fn drain<T: Copy, R>(
        &mut self,
        registry: &mut ObjectRegistry<T, R>,
        mut deliver: impl FnMut(T, E),
    ) -> usize {
        let mut delivered = 0;
        while let Some((weak, event)) = self.events.pop_front() {
            if let Some(payload) = registry.upgrade(weak) {
                deliver(payload, event);
                delivered += 1;
            }
            registry.release(weak);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use super::*;

    type Registry = ObjectRegistry<u32, &'static str>;

    #[test]
    fn destroy_is_idempotent() {
        let mut reg = Registry::new();
        let id = reg.create(7);
        assert_eq!(reg.payload(id), Some(7));
        assert!(reg.destroy(id));
        assert!(!reg.destroy(id));
        assert!(!reg.is_alive(id));
        assert_eq!(reg.payload(id), None);
    }

    #[test]
    fn slot_reuse_bumps_generation() {
        let mut reg = Registry::new();
        let a = reg.create(1);
        reg.destroy(a);
        let b = reg.create(2);
        assert_ne!(a, b);
        assert!(!reg.is_alive(a));
        assert_eq!(reg.payload(b), Some(2));
    }

    #[test]
    fn weak_refs_null_on_destroy_and_callbacks_fire_once() {
        let mut reg = Registry::new();
        let id = reg.create(1);
        let fired = Rc::new(Cell::new(0));
        let weaks: Vec<_> = (0..3).map(|_| reg.downgrade(id)).collect();
        for &w in &weaks {
            let fired = Rc::clone(&fired);
            reg.on_destroy(w, move |_| fired.set(fired.get() + 1));
        }
        assert_eq!(reg.upgrade(weaks[1]), Some(1));
        reg.destroy(id);
        reg.destroy(id);
        assert_eq!(fired.get(), 3);
        for &w in &weaks {
            assert!(reg.is_dangling(w));
            assert_eq!(reg.upgrade(w), None);
        }
    }

    #[test]
    fn dangling_holder_does_not_see_reused_slot() {
        let mut reg = Registry::new();
        let a = reg.create(1);
        let w = reg.downgrade(a);
        reg.destroy(a);
        let _b = reg.create(2);
        assert_eq!(reg.upgrade(w), None);
    }

    #[test]
    fn release_swaps_with_last() {
        let mut reg = Registry::new();
        let id = reg.create(1);
        let w0 = reg.downgrade(id);
        let w1 = reg.downgrade(id);
        let w2 = reg.downgrade(id);
        reg.release(w0);
        assert_eq!(reg.holder_count(id), 2);
        // The moved holder must still unlink cleanly.
        reg.release(w2);
        reg.release(w2);
        assert_eq!(reg.holder_count(id), 1);
        assert_eq!(reg.upgrade(w1), Some(1));
        reg.release(w1);
        assert_eq!(reg.holder_count(id), 0);
    }

    #[test]
    fn emit_reaches_every_listener() {
        let mut reg = Registry::new();
        let emitter = reg.create(1);
        let sink_a = reg.create(2);
        let sink_b = reg.create(3);
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = reg.create_signal(emitter);
        for tag in ["a", "b"] {
            let owner = if tag == "a" { sink_a } else { sink_b };
            let log = Rc::clone(&log);
            reg.connect(signal, owner, move |e| log.borrow_mut().push((tag, *e)))
                .unwrap();
        }
        assert_eq!(reg.emit(signal, &"hello"), 2);
        assert_eq!(*log.borrow(), vec![("a", "hello"), ("b", "hello")]);
    }

    #[test]
    fn destroying_listener_owner_unlinks_from_signal() {
        let mut reg = Registry::new();
        let emitter = reg.create(1);
        let a = reg.create(2);
        let b = reg.create(3);
        let signal = reg.create_signal(emitter);
        let hits = Rc::new(Cell::new(0));
        for owner in [a, b, a] {
            let hits = Rc::clone(&hits);
            reg.connect(signal, owner, move |_| hits.set(hits.get() + 1))
                .unwrap();
        }
        reg.destroy(a);
        assert_eq!(reg.listener_count(signal), 1);
        assert_eq!(reg.emit(signal, &"x"), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn destroying_signal_owner_unlinks_listeners() {
        let mut reg = Registry::new();
        let emitter = reg.create(1);
        let listener_owner = reg.create(2);
        let other = reg.create(3);
        let s1 = reg.create_signal(emitter);
        let s2 = reg.create_signal(other);
        reg.connect(s1, listener_owner, |_| {}).unwrap();
        let kept = reg.connect(s2, listener_owner, |_| {}).unwrap();
        reg.destroy(emitter);
        assert!(!reg.signal_alive(s1));
        assert_eq!(reg.emit(s1, &"gone"), 0);
        // The surviving link was moved by swap-with-last and must still
        // disconnect cleanly.
        assert!(reg.disconnect(kept));
        assert_eq!(reg.listener_count(s2), 0);
        assert!(reg.destroy(listener_owner));
    }

    #[test]
    fn self_listening_object_destroys_cleanly() {
        let mut reg = Registry::new();
        let obj = reg.create(1);
        let signal = reg.create_signal(obj);
        let listener = reg.connect(signal, obj, |_| {}).unwrap();
        assert!(reg.destroy(obj));
        assert!(!reg.disconnect(listener));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut reg = Registry::new();
        let obj = reg.create(1);
        let signal = reg.create_signal(obj);
        let l = reg.connect(signal, obj, |_| {}).unwrap();
        assert!(reg.disconnect(l));
        assert!(!reg.disconnect(l));
        assert_eq!(reg.emit(signal, &"x"), 0);
    }

    #[test]
    fn queue_drops_events_for_dead_targets() {
        let mut reg = Registry::new();
        let alive = reg.create(10);
        let dead = reg.create(20);
        let mut queue = SafeEventQueue::new();
        queue.push(reg.downgrade(alive), "first");
        queue.push(reg.downgrade(dead), "lost");
        queue.push(reg.downgrade(alive), "second");
        reg.destroy(dead);
        assert_eq!(queue.len(), 3);

        let mut seen = Vec::new();
        let delivered = queue.drain(&mut reg, |payload, event| seen.push((payload, event)));
        assert_eq!(delivered, 2);
        assert_eq!(seen, vec![(10, "first"), (10, "second")]);
        assert!(queue.is_empty());
        assert_eq!(reg.holder_count(alive), 0);
    }
}
