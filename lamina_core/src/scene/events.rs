// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene lifecycle events, signals and weak handles.
//!
//! Every node and target is backed by an object in the scene's
//! [`ObjectRegistry`]. Destruction is observable three ways:
//!
//! - synchronously, through listeners on [`Scene::signal`] (every node and
//!   target) or [`Scene::node_signal`] (one node);
//! - through [`WeakRef`]s, which dangle and fire their destroy callbacks;
//! - through the deferred event queue, which drops events whose object died
//!   before [`Scene::dispatch_events`] ran.

use crate::node::NodeId;
use crate::object::{ObjectId, ObjectRegistry, SignalId, WeakRef};
use crate::target::TargetId;

use super::Scene;

/// What a scene-owned object stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneObject {
    /// The scene itself.
    Scene,
    /// A node.
    Node(NodeId),
    /// A target.
    Target(TargetId),
}

/// Events published by a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneEvent {
    /// A node was removed. Emitted synchronously during
    /// [`Scene::remove`], children first.
    Destroyed(NodeId),
    /// A layout delegate produced a new rectangle. Queued during
    /// [`Scene::render`] and delivered by [`Scene::dispatch_events`].
    LayoutChanged(NodeId),
    /// A target was destroyed.
    TargetDestroyed(TargetId),
}

impl Scene {
    /// Signal emitting every [`SceneEvent::Destroyed`] and
    /// [`SceneEvent::TargetDestroyed`] of this scene.
    #[must_use]
    pub fn signal(&self) -> SignalId {
        self.scene_signal
    }

    /// Signal emitting the [`SceneEvent::Destroyed`] of one node.
    ///
    /// Created on first use; listeners connected to it are dropped with the
    /// node.
    pub fn node_signal(&mut self, node: NodeId) -> SignalId {
        self.validate(node);
        let i = node.idx as usize;
        if let Some(signal) = self.node_signal[i] {
            return signal;
        }
        let signal = self.objects.create_signal(self.node_object[i]);
        self.node_signal[i] = Some(signal);
        signal
    }

    /// The object registry backing this scene's nodes and targets.
    #[must_use]
    pub fn objects(&self) -> &ObjectRegistry<SceneObject, SceneEvent> {
        &self.objects
    }

    /// Mutable access to the registry, for connecting listeners and creating
    /// listener-owning objects.
    pub fn objects_mut(&mut self) -> &mut ObjectRegistry<SceneObject, SceneEvent> {
        &mut self.objects
    }

    /// The object backing a node.
    #[must_use]
    pub fn node_object(&self, node: NodeId) -> ObjectId {
        self.validate(node);
        self.node_object[node.idx as usize]
    }

    /// A weak reference to a node. Release it with
    /// [`ObjectRegistry::release`] when no longer needed.
    pub fn weak_node(&mut self, node: NodeId) -> WeakRef {
        self.validate(node);
        self.objects.downgrade(self.node_object[node.idx as usize])
    }

    /// A weak reference to a target.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or belongs to another scene.
    pub fn weak_target(&mut self, target: TargetId) -> WeakRef {
        let object = self.target(target).object;
        self.objects.downgrade(object)
    }

    /// Resolves a weak reference to the node it points at, if still alive.
    #[must_use]
    pub fn upgrade_node(&self, weak: WeakRef) -> Option<NodeId> {
        match self.objects.upgrade(weak)? {
            SceneObject::Node(id) if self.is_alive(id) => Some(id),
            _ => None,
        }
    }

    /// Queues `event` for the object behind `weak`.
    ///
    /// The queue takes over `weak` and releases it when the event is
    /// delivered or dropped.
    pub fn post_event(&mut self, weak: WeakRef, event: SceneEvent) {
        self.events.push(weak, event);
    }

    /// Number of queued events, including ones whose object has died.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Delivers queued events in FIFO order, skipping events whose object
    /// was destroyed. Returns the number delivered.
    ///
    /// Repeated layout changes of a node between two dispatches are reported
    /// once; read the node's current rectangle when handling the event.
    pub fn dispatch_events(&mut self, deliver: impl FnMut(SceneObject, SceneEvent)) -> usize {
        self.layout_queued.fill(false);
        self.events.drain(&mut self.objects, deliver)
    }
}
