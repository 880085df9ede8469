// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node allocation, topology and property mutation.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
use understory_dirty::EagerPolicy;

use crate::dirty;
use crate::geometry::IRect;
use crate::node::{Capabilities, Changes, INVALID, Node, NodeId, NodePayload, Opacity};
use crate::region::Region;

use super::{Scene, SceneEvent};

impl Scene {
    // -- Allocation API --

    /// Inserts `node` as the last (topmost) child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale or is a sub-scene node.
    pub fn insert(&mut self, parent: NodeId, node: Node) -> NodeId {
        self.validate(parent);
        self.assert_can_parent(parent.idx);
        let idx = self.alloc_slot(node);
        self.link_last(parent.idx, idx);
        self.node_id(idx)
    }

    /// Removes a node and its whole subtree.
    ///
    /// Children are destroyed first. Every destroyed node damages what it
    /// covered on each target, has its weak references nulled and emits
    /// [`SceneEvent::Destroyed`].
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or is the root.
    pub fn remove(&mut self, id: NodeId) {
        self.validate(id);
        assert!(id != self.root, "cannot remove the scene root");
        let idx = id.idx;

        let mut doomed = Vec::new();
        self.collect_post_order(idx, &mut doomed);

        let p = self.parent[idx as usize];
        self.unlink_from_parent(idx);
        self.dirty.remove_dependency(idx, p, dirty::GEOMETRY);
        self.dirty.mark(p, dirty::TOPOLOGY);

        for d in doomed {
            self.destroy_slot(d);
        }
        self.traversal_dirty = true;
    }

    // -- Topology API --

    /// Moves `child` (with its subtree) to be the last child of `new_parent`.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, `child` is the root, `new_parent` is a
    /// sub-scene, or `new_parent` lies inside `child`'s subtree.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.validate(child);
        self.validate(new_parent);
        assert!(child != self.root, "cannot reparent the scene root");
        self.assert_can_parent(new_parent.idx);
        assert!(
            !self.is_ancestor_or_self(child.idx, new_parent.idx),
            "cannot reparent a node into its own subtree"
        );
        self.detach(child.idx);
        self.link_last(new_parent.idx, child.idx);
        self.mark_subtree_changed(child.idx, Changes::ORDER);
    }

    /// Moves `child` (with its subtree) directly below `sibling`, under
    /// `sibling`'s parent.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, either node is the root, the two are the
    /// same node, or `sibling` lies inside `child`'s subtree.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        assert!(
            child != self.root && sibling != self.root,
            "the scene root has no siblings"
        );
        assert!(child != sibling, "cannot insert a node before itself");
        assert!(
            !self.is_ancestor_or_self(child.idx, sibling.idx),
            "cannot move a node into its own subtree"
        );
        let c = child.idx;
        let s = sibling.idx;
        self.detach(c);

        let p = self.parent[s as usize];
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);
        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.mark_subtree_changed(c, Changes::ORDER);
    }

    /// Moves a node above all of its siblings.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn raise(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        let p = self.parent[idx as usize];
        if p == INVALID || self.next_sibling[idx as usize] == INVALID {
            return;
        }
        self.detach(idx);
        self.link_last(p, idx);
        self.mark_subtree_changed(idx, Changes::ORDER);
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets a node's rectangle, relative to its parent's origin.
    ///
    /// Records [`Changes::POSITION`] and/or [`Changes::SIZE`]. A size change
    /// also asks the children's layout delegates to run again.
    pub fn set_rect(&mut self, id: NodeId, rect: IRect) {
        self.validate(id);
        let idx = id.idx;
        if self.apply_rect(idx, rect, Changes::empty()) {
            let mut child = self.first_child[idx as usize];
            while child != INVALID {
                if self.layout[child as usize].is_some() {
                    self.dirty.mark(child, dirty::LAYOUT);
                }
                child = self.next_sibling[child as usize];
            }
        }
    }

    /// Moves a node, keeping its size.
    pub fn set_position(&mut self, id: NodeId, x: i32, y: i32) {
        let r = self.rect(id);
        self.set_rect(id, IRect::from_origin_size(x, y, r.width(), r.height()));
    }

    /// Resizes a node, keeping its origin.
    pub fn set_size(&mut self, id: NodeId, width: i32, height: i32) {
        let r = self.rect(id);
        self.set_rect(id, IRect::from_origin_size(r.x0, r.y0, width, height));
    }

    /// Shows or hides a node and its subtree.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        let idx = id.idx as usize;
        if self.visible[idx] == visible {
            return;
        }
        self.visible[idx] = visible;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
        self.mark_subtree_changed(id.idx, Changes::VISIBILITY);
    }

    /// Declares a node-local opaque region.
    pub fn set_opaque_region(&mut self, id: NodeId, region: Region) {
        self.set_opacity(id, Opacity::Region(region));
    }

    /// Declares which part of a node is opaque.
    pub fn set_opacity(&mut self, id: NodeId, opacity: Opacity) {
        self.validate(id);
        if self.opacity[id.idx as usize] == opacity {
            return;
        }
        self.opacity[id.idx as usize] = opacity;
        self.record_changes(id.idx, Changes::OPAQUE);
    }

    /// Records change bits on every target the node is visible on.
    pub fn mark_changed(&mut self, id: NodeId, changes: Changes) {
        self.validate(id);
        self.record_changes(id.idx, changes);
    }

    /// Marks the whole content of a node as changed on every target.
    pub fn invalidate(&mut self, id: NodeId) {
        self.mark_changed(id, Changes::CONTENT);
    }

    /// Asks the node's layout delegate to run again on the next render.
    pub fn invalidate_layout(&mut self, id: NodeId) {
        self.validate(id);
        self.dirty.mark(id.idx, dirty::LAYOUT);
    }

    /// Adds node-local damage on every target the node is visible on.
    ///
    /// Damage outside the node's bounds is ignored. Damage on a node that is
    /// not visible on any target is dropped; it is painted in full when it
    /// becomes visible.
    pub fn add_damage(&mut self, id: NodeId, region: &Region) {
        self.validate(id);
        let local = self.rect[id.idx as usize].local();
        let clipped = region.intersect_rect(local);
        if clipped.is_empty() {
            return;
        }
        for state in self.states[id.idx as usize].values_mut() {
            state.damage.add(&clipped);
        }
    }

    /// Adds a node-local damage rectangle on every target.
    pub fn add_damage_rect(&mut self, id: NodeId, rect: IRect) {
        self.add_damage(id, &Region::from_rect(rect));
    }

    // -- Internal helpers --

    pub(crate) fn alloc_slot(&mut self, node: Node) -> u32 {
        let Node {
            caps,
            rect,
            visible,
            opacity,
            payload,
            layout,
        } = node;
        let has_layout = layout.is_some();

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; the generation was bumped on destroy.
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.caps[i] = caps;
            self.rect[i] = rect;
            self.visible[i] = visible;
            self.opacity[i] = opacity;
            self.payload[i] = payload;
            self.layout[i] = layout;
            self.world_rect[i] = IRect::ZERO;
            self.clip[i] = None;
            self.effective_visible[i] = false;
            self.baked_by[i] = INVALID;
            self.states[i].clear();
            self.alive[i] = true;
            self.node_signal[i] = None;
            self.layout_queued[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.caps.push(caps);
            self.rect.push(rect);
            self.visible.push(visible);
            self.opacity.push(opacity);
            self.payload.push(payload);
            self.layout.push(layout);
            self.world_rect.push(IRect::ZERO);
            self.clip.push(None);
            self.effective_visible.push(false);
            self.baked_by.push(INVALID);
            self.states.push(HashMap::new());
            self.generation.push(0);
            self.alive.push(true);
            self.node_object.push(self.scene_object);
            self.node_signal.push(None);
            self.layout_queued.push(false);
            self.order_pos.push(0);
            self.order_end.push(0);
            idx
        };

        let id = self.node_id(idx);
        self.node_object[idx as usize] = self.objects.create(super::SceneObject::Node(id));
        self.traversal_dirty = true;
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
        if has_layout {
            self.dirty.mark(idx, dirty::LAYOUT);
        }
        idx
    }

    /// Destroys one slot whose children are already gone.
    fn destroy_slot(&mut self, idx: u32) {
        let id = self.node_id(idx);

        let targets: Vec<_> = self.states[idx as usize].keys().copied().collect();
        for tid in targets {
            self.unregister(idx, tid, true);
        }

        if let Some(NodePayload::SubScene(mut sub)) = self.payload[idx as usize].take() {
            let surfaces = sub.shut_down();
            self.released.extend(surfaces);
        }
        self.layout[idx as usize] = None;

        if let Some(signal) = self.node_signal[idx as usize].take() {
            self.objects.emit(signal, &SceneEvent::Destroyed(id));
        }
        self.objects
            .emit(self.scene_signal, &SceneEvent::Destroyed(id));
        self.objects.destroy(self.node_object[idx as usize]);

        self.dirty.remove_key(idx);
        self.parent[idx as usize] = INVALID;
        self.first_child[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;

        // Bump generation so old handles immediately fail validation.
        self.alive[idx as usize] = false;
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Collects the subtree rooted at `idx`, children before parents.
    fn collect_post_order(&self, idx: u32, out: &mut Vec<u32>) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_post_order(child, out);
            child = self.next_sibling[child as usize];
        }
        out.push(idx);
    }

    /// Appends `c` as the last child of `p`.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child depends on parent for world geometry.
        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);
        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Unlinks `idx` from its parent and drops the geometry dependency.
    fn detach(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        if p == INVALID {
            return;
        }
        self.unlink_from_parent(idx);
        self.dirty.remove_dependency(idx, p, dirty::GEOMETRY);
        self.dirty.mark(p, dirty::TOPOLOGY);
        self.traversal_dirty = true;
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn assert_can_parent(&self, idx: u32) {
        assert!(
            !self.caps[idx as usize].contains(Capabilities::SUBSCENE),
            "sub-scene nodes cannot have children; populate the nested scene instead"
        );
    }

    /// Returns `true` if `ancestor` is `idx` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == ancestor {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }

    /// Stores a new rectangle and records the resulting change bits.
    ///
    /// Returns `true` if the size changed.
    pub(crate) fn apply_rect(&mut self, idx: u32, rect: IRect, extra: Changes) -> bool {
        let old = self.rect[idx as usize];
        if old == rect {
            return false;
        }
        self.rect[idx as usize] = rect;
        let mut changes = extra;
        if (old.x0, old.y0) != (rect.x0, rect.y0) {
            changes |= Changes::POSITION;
        }
        let resized = (old.width(), old.height()) != (rect.width(), rect.height());
        if resized {
            changes |= Changes::SIZE;
        }
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
        self.record_changes(idx, changes);
        resized
    }

    pub(crate) fn record_changes(&mut self, idx: u32, changes: Changes) {
        for state in self.states[idx as usize].values_mut() {
            state.changes |= changes;
        }
    }

    /// Records `changes` on every node of the subtree rooted at `idx`.
    fn mark_subtree_changed(&mut self, idx: u32, changes: Changes) {
        let mut stack = vec![idx];
        while let Some(n) = stack.pop() {
            self.record_changes(n, changes);
            let mut child = self.first_child[n as usize];
            while child != INVALID {
                stack.push(child);
                child = self.next_sibling[child as usize];
            }
        }
    }
}
