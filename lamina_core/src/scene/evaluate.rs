// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traversal, layout and geometry evaluation.
//!
//! Evaluation runs at the start of every render and follows a
//! drain-recompute pattern per dirty channel:
//!
//! 1. **TOPOLOGY**: if the tree changed, rebuild the pre-order traversal,
//!    subtree ranges and each node's nearest baking ancestor.
//! 2. **LAYOUT**: ask layout delegates for new rectangles, parents first.
//! 3. **GEOMETRY**: recompute world rectangles, effective clips and
//!    effective visibility, parents first.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Size;

use crate::dirty;
use crate::geometry::IRect;
use crate::layout::LayoutConstraints;
use crate::node::{Capabilities, Changes, INVALID};

use super::{Scene, SceneEvent};

impl Scene {
    /// Rebuilds the depth-first pre-order traversal if topology changed.
    pub(crate) fn rebuild_traversal_order(&mut self) {
        if !self.traversal_dirty {
            return;
        }
        self.traversal_order.clear();
        self.dfs_collect(self.root.idx, INVALID);
        self.traversal_dirty = false;

        // Drain TOPOLOGY channel (just consume, changes are structural).
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "node slots are u32, so traversal positions fit"
    )]
    fn dfs_collect(&mut self, idx: u32, baker: u32) {
        let i = idx as usize;
        if self.baked_by[i] != baker {
            // Damage now routes elsewhere; start over on every target.
            let targets: Vec<_> = self.states[i].keys().copied().collect();
            for tid in targets {
                self.unregister(idx, tid, true);
            }
            self.baked_by[i] = baker;
        }

        self.order_pos[i] = self.traversal_order.len() as u32;
        self.traversal_order.push(idx);

        let child_baker = if self.caps[i].contains(Capabilities::BAKES | Capabilities::CONTAINER) {
            idx
        } else {
            baker
        };
        let mut child = self.first_child[i];
        while child != INVALID {
            self.dfs_collect(child, child_baker);
            child = self.next_sibling[child as usize];
        }
        self.order_end[i] = self.traversal_order.len() as u32;
    }

    /// Runs layout delegates, parents before children.
    ///
    /// A delegate runs when it was invalidated, reports itself dirty, or its
    /// parent was resized earlier in this pass. A rectangle change queues a
    /// [`SceneEvent::LayoutChanged`] unless one is already waiting for the
    /// node, so the queue holds at most one per node between dispatches.
    pub(crate) fn run_layout(&mut self) {
        let requested: Vec<u32> = self
            .dirty
            .drain(dirty::LAYOUT)
            .deterministic()
            .run()
            .collect();
        let mut pending = vec![false; self.len as usize];
        for idx in requested {
            if let Some(flag) = pending.get_mut(idx as usize) {
                *flag = true;
            }
        }

        for pos in 0..self.traversal_order.len() {
            let idx = self.traversal_order[pos];
            let i = idx as usize;
            let p = self.parent[i];
            let available = if p == INVALID {
                self.rect[i]
            } else {
                self.rect[p as usize]
            };
            let Some(delegate) = self.layout[i].as_mut() else {
                continue;
            };
            if !pending[i] && !delegate.is_dirty() {
                continue;
            }
            let constraints = LayoutConstraints::new(Size::new(
                f64::from(available.width()),
                f64::from(available.height()),
            ));
            let rect = IRect::from_kurbo_outer(delegate.compute_layout(constraints));
            if rect == self.rect[i] {
                continue;
            }
            if self.apply_rect(idx, rect, Changes::LAYOUT) {
                let mut child = self.first_child[i];
                while child != INVALID {
                    pending[child as usize] = true;
                    child = self.next_sibling[child as usize];
                }
            }
            if !self.layout_queued[i] {
                self.layout_queued[i] = true;
                let id = self.node_id(idx);
                let weak = self.objects.downgrade(self.node_object[i]);
                self.events.push(weak, SceneEvent::LayoutChanged(id));
            }
        }
    }

    /// Recomputes world geometry for dirty nodes and their descendants.
    pub(crate) fn update_geometry(&mut self) {
        let dirty: Vec<u32> = self
            .dirty
            .drain(dirty::GEOMETRY)
            .affected()
            .deterministic()
            .run()
            .collect();
        if dirty.is_empty() {
            return;
        }
        let mut mask = vec![false; self.len as usize];
        for idx in dirty {
            if let Some(flag) = mask.get_mut(idx as usize) {
                *flag = true;
            }
        }

        for pos in 0..self.traversal_order.len() {
            let idx = self.traversal_order[pos];
            let i = idx as usize;
            let p = self.parent[i];
            if p != INVALID && mask[p as usize] {
                // Inherited: a recomputed parent recomputes its subtree.
                mask[i] = true;
            }
            if !mask[i] {
                continue;
            }
            let (origin, clip, parent_visible) = if p == INVALID {
                ((0, 0), None, true)
            } else {
                let pi = p as usize;
                let parent_world = self.world_rect[pi];
                let clip = if self.caps[pi].contains(Capabilities::CLIPS_CHILDREN) {
                    Some(match self.clip[pi] {
                        Some(c) => c.intersect(parent_world),
                        None => parent_world,
                    })
                } else {
                    self.clip[pi]
                };
                (
                    (parent_world.x0, parent_world.y0),
                    clip,
                    self.effective_visible[pi],
                )
            };
            self.world_rect[i] = self.rect[i].translate(origin.0, origin.1);
            self.clip[i] = clip;
            self.effective_visible[i] = parent_visible && self.visible[i];
        }
    }
}
