// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene: node tree, targets, and the compositor.
//!
//! A [`Scene`] owns a tree of nodes rooted at [`Scene::root`] and any number
//! of [`Target`]s. Nodes are stored struct-of-arrays and addressed by
//! generational [`NodeId`]s; every node is also backed by an object in the
//! scene's [`ObjectRegistry`] so that weak references, signals and deferred
//! events observe its lifetime.
//!
//! # Coordinates
//!
//! Scene geometry is integral and logical. A node's rectangle is relative to
//! its parent's origin; its *world* rectangle is relative to the scene
//! origin. A target shows the part of the scene under its viewport, scaled
//! and transformed onto its surface.
//!
//! # Per-target state
//!
//! Every node that renders keeps one state entry per target it is currently
//! visible on: pending client damage, pending change bits, the rectangle it
//! covered after the last render, its opaque area and its bake cache. These
//! entries are the only place where multiplicity across targets is resolved,
//! so rendering one target never consumes damage another still needs.
//!
//! # Rendering
//!
//! [`Scene::render`] runs, for one target: validate → update matrix → layout
//! → geometry → damage → bake → occlusion → opaque → background →
//! translucent → clear. See [`render`](Scene::render) for details.

mod bake;
mod events;
mod evaluate;
mod render;
mod store;
mod subscene;
mod targets;
mod traverse;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use hashbrown::HashMap;
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::geometry::{IRect, PixelSize};
use crate::layout::LayoutDelegate;
use crate::node::{Capabilities, Changes, INVALID, Node, NodeId, NodePayload, Opacity};
use crate::object::{ObjectId, ObjectRegistry, SafeEventQueue, SignalId};
use crate::paint::{Painter, SurfaceId};
use crate::region::Region;
use crate::target::{Target, TargetId};

pub use events::{SceneEvent, SceneObject};
pub use render::{BakeFailure, RenderReport};
pub use subscene::SubScene;
pub use traverse::Children;

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// Scene-wide configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Largest width or height, in device pixels, of a bake cache surface.
    /// Larger nodes paint live instead of baking.
    pub max_surface_size: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_surface_size: 8192,
        }
    }
}

/// A node's cached surface for one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BakeCache {
    pub(crate) surface: SurfaceId,
    pub(crate) size: PixelSize,
}

impl BakeCache {
    /// The cache surface.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Pixel size the cache was painted at.
    #[must_use]
    pub fn size(&self) -> PixelSize {
        self.size
    }
}

/// State of one node on one target.
#[derive(Debug)]
pub(crate) struct NodeTargetState {
    /// Position in the target's node list.
    pub(crate) slot: u32,
    /// Pending client damage, node-local.
    pub(crate) damage: Region,
    pub(crate) changes: Changes,
    /// Registered but not yet rendered.
    pub(crate) fresh: bool,
    /// Scene-space area covered after the last damage pass.
    pub(crate) visible: IRect,
    /// World rectangle at the last damage pass.
    pub(crate) world: IRect,
    /// Scene-space opaque area, clipped to `visible`.
    pub(crate) opaque: Region,
    pub(crate) bake: Option<BakeCache>,
    /// The cache could not be allocated; the node paints live.
    pub(crate) live: bool,
}

impl NodeTargetState {
    fn new(slot: u32) -> Self {
        Self {
            slot,
            damage: Region::new(),
            changes: Changes::all(),
            fresh: true,
            visible: IRect::ZERO,
            world: IRect::ZERO,
            opaque: Region::new(),
            bake: None,
            live: false,
        }
    }
}

/// A retained scene graph serviced by one or more targets.
pub struct Scene {
    pub(crate) id: u32,
    pub(crate) config: SceneConfig,

    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) caps: Vec<Capabilities>,
    pub(crate) rect: Vec<IRect>,
    pub(crate) visible: Vec<bool>,
    pub(crate) opacity: Vec<Opacity>,
    pub(crate) payload: Vec<Option<NodePayload>>,
    pub(crate) layout: Vec<Option<Box<dyn LayoutDelegate>>>,

    // -- Computed properties (written by the geometry phase) --
    pub(crate) world_rect: Vec<IRect>,
    pub(crate) clip: Vec<Option<IRect>>,
    pub(crate) effective_visible: Vec<bool>,
    /// Nearest ancestor baking its children, or [`INVALID`].
    pub(crate) baked_by: Vec<u32>,

    // -- Per-target state --
    pub(crate) states: Vec<HashMap<TargetId, NodeTargetState>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    /// Position of each slot in `traversal_order`.
    pub(crate) order_pos: Vec<u32>,
    /// End (exclusive) of each slot's subtree in `traversal_order`.
    pub(crate) order_end: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Targets --
    pub(crate) targets: Vec<Option<Target>>,
    pub(crate) target_generation: Vec<u32>,
    pub(crate) target_free: Vec<u32>,
    /// Live target slots in service order.
    pub(crate) target_list: Vec<u32>,

    // -- Lifecycle --
    pub(crate) objects: ObjectRegistry<SceneObject, SceneEvent>,
    pub(crate) node_object: Vec<ObjectId>,
    pub(crate) node_signal: Vec<Option<SignalId>>,
    pub(crate) scene_object: ObjectId,
    pub(crate) scene_signal: SignalId,
    pub(crate) events: SafeEventQueue<SceneEvent>,
    /// A `LayoutChanged` event for the slot is waiting in `events`.
    pub(crate) layout_queued: Vec<bool>,
    /// Cache surfaces to hand back to the painter on the next render or
    /// [`release_surfaces`](Scene::release_surfaces) call.
    pub(crate) released: Vec<SurfaceId>,

    pub(crate) root: NodeId,
    pub(crate) frame_index: u64,
    pub(crate) seq: u64,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("nodes", &(self.len as usize - self.free_list.len()))
            .field("targets", &self.target_list.len())
            .field("frame_index", &self.frame_index)
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates a scene holding only a root container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Creates a scene with the given configuration.
    #[must_use]
    pub fn with_config(config: SceneConfig) -> Self {
        let mut objects = ObjectRegistry::new();
        let scene_object = objects.create(SceneObject::Scene);
        let scene_signal = objects.create_signal(scene_object);
        let mut scene = Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            caps: Vec::new(),
            rect: Vec::new(),
            visible: Vec::new(),
            opacity: Vec::new(),
            payload: Vec::new(),
            layout: Vec::new(),
            world_rect: Vec::new(),
            clip: Vec::new(),
            effective_visible: Vec::new(),
            baked_by: Vec::new(),
            states: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            order_pos: Vec::new(),
            order_end: Vec::new(),
            traversal_dirty: true,
            targets: Vec::new(),
            target_generation: Vec::new(),
            target_free: Vec::new(),
            target_list: Vec::new(),
            objects,
            node_object: Vec::new(),
            node_signal: Vec::new(),
            scene_object,
            scene_signal,
            events: SafeEventQueue::new(),
            layout_queued: Vec::new(),
            released: Vec::new(),
            root: NodeId {
                idx: INVALID,
                generation: 0,
            },
            frame_index: 0,
            seq: 0,
        };
        let root = scene.alloc_slot(Node::container());
        scene.root = scene.node_id(root);
        scene
    }

    /// Process-unique identifier of this scene.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The scene configuration.
    #[must_use]
    pub fn config(&self) -> SceneConfig {
        self.config
    }

    /// The root container. It cannot be removed.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of render calls completed so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Number of live nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    // -- Read-only node accessors --

    /// Returns the parent of a node (`None` for the root).
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.node_id(p))
    }

    /// Returns an iterator over the direct children of a node, back to front.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// The node's rectangle relative to its parent's origin.
    #[must_use]
    pub fn rect(&self, id: NodeId) -> IRect {
        self.validate(id);
        self.rect[id.idx as usize]
    }

    /// The node's rectangle relative to the scene origin.
    ///
    /// Computed by the geometry phase of [`render`](Self::render); reflects
    /// the state as of the last render.
    #[must_use]
    pub fn world_rect(&self, id: NodeId) -> IRect {
        self.validate(id);
        self.world_rect[id.idx as usize]
    }

    /// The node's capabilities.
    #[must_use]
    pub fn capabilities(&self, id: NodeId) -> Capabilities {
        self.validate(id);
        self.caps[id.idx as usize]
    }

    /// Whether the node paints content.
    #[must_use]
    pub fn can_render(&self, id: NodeId) -> bool {
        self.capabilities(id).contains(Capabilities::RENDERS)
    }

    /// Whether the node caches its content per target.
    #[must_use]
    pub fn can_bake(&self, id: NodeId) -> bool {
        self.capabilities(id).contains(Capabilities::BAKES)
    }

    /// Whether the node clips its descendants.
    #[must_use]
    pub fn clips_children(&self, id: NodeId) -> bool {
        self.capabilities(id).contains(Capabilities::CLIPS_CHILDREN)
    }

    /// Whether the node is a container.
    #[must_use]
    pub fn is_container(&self, id: NodeId) -> bool {
        self.capabilities(id).contains(Capabilities::CONTAINER)
    }

    /// The node's own visibility flag (ancestors may still hide it).
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// The node's declared opacity.
    #[must_use]
    pub fn opacity(&self, id: NodeId) -> &Opacity {
        self.validate(id);
        &self.opacity[id.idx as usize]
    }

    /// Change bits recorded for `node` on `target` and not yet rendered.
    ///
    /// Empty when the node is not associated with the target.
    #[must_use]
    pub fn pending_changes(&self, node: NodeId, target: TargetId) -> Changes {
        self.state(node, target)
            .map_or(Changes::empty(), |s| s.changes)
    }

    /// Client damage pending for `node` on `target`, node-local.
    #[must_use]
    pub fn damage(&self, node: NodeId, target: TargetId) -> Region {
        self.state(node, target)
            .map_or_else(Region::new, |s| s.damage.clone())
    }

    /// Scene-space opaque area of `node` on `target` as of the last render.
    #[must_use]
    pub fn opaque_region(&self, node: NodeId, target: TargetId) -> Region {
        self.state(node, target)
            .map_or_else(Region::new, |s| s.opaque.clone())
    }

    /// Whether `node` currently has a state entry for `target`.
    #[must_use]
    pub fn is_registered(&self, node: NodeId, target: TargetId) -> bool {
        self.state(node, target).is_some()
    }

    /// The node's bake cache for `target`, if one is allocated.
    #[must_use]
    pub fn bake_cache(&self, node: NodeId, target: TargetId) -> Option<&BakeCache> {
        self.state(node, target).and_then(|s| s.bake.as_ref())
    }

    /// The nested scene of a sub-scene node.
    ///
    /// Returns `None` if the node is not a sub-scene.
    #[must_use]
    pub fn subscene(&self, id: NodeId) -> Option<&SubScene> {
        self.validate(id);
        match self.payload[id.idx as usize].as_ref() {
            Some(NodePayload::SubScene(sub)) => Some(sub),
            _ => None,
        }
    }

    /// Mutable access to the nested scene of a sub-scene node.
    pub fn subscene_mut(&mut self, id: NodeId) -> Option<&mut SubScene> {
        self.validate(id);
        match self.payload[id.idx as usize].as_mut() {
            Some(NodePayload::SubScene(sub)) => Some(sub),
            _ => None,
        }
    }

    /// Depth-first pre-order of live node slots, as of the last render.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn node_id(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn state(&self, node: NodeId, target: TargetId) -> Option<&NodeTargetState> {
        self.validate(node);
        self.states[node.idx as usize].get(&target)
    }

    /// World rectangle clipped by the ancestors' clips.
    pub(crate) fn visible_rect(&self, idx: u32) -> IRect {
        let world = self.world_rect[idx as usize];
        match self.clip[idx as usize] {
            Some(clip) => world.intersect(clip),
            None => world,
        }
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    /// Hands cache surfaces freed since the last render back to `painter`.
    ///
    /// [`render`](Self::render) does this itself; call it after destroying
    /// targets or removing nodes when no further render of this scene will
    /// follow. Returns the number of surfaces released.
    pub fn release_surfaces(&mut self, painter: &mut dyn Painter) -> usize {
        let surfaces = self.take_released();
        for &surface in &surfaces {
            painter.release_surface(surface);
        }
        surfaces.len()
    }

    /// Destroys every target and hands every cache surface back to
    /// `painter`, including those of nested scenes.
    ///
    /// Call this before dropping a scene that has rendered; the scene does
    /// not hold a painter to release through on drop. Nodes stay in place
    /// and bake again on any target created afterwards.
    pub fn shut_down(&mut self, painter: &mut dyn Painter) -> usize {
        let surfaces = self.release_all();
        for &surface in &surfaces {
            painter.release_surface(surface);
        }
        surfaces.len()
    }

    /// Takes the surfaces queued for release.
    pub(crate) fn take_released(&mut self) -> Vec<SurfaceId> {
        core::mem::take(&mut self.released)
    }
}
