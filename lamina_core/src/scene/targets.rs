// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target management and per-target node registration.

use alloc::vec::Vec;

use crate::error::RenderError;
use crate::geometry::{Color, IRect, OutputTransform};
use crate::node::{INVALID, NodePayload};
use crate::paint::SurfaceId;
use crate::region::Region;
use crate::target::{Target, TargetDesc, TargetId, sanitize_scale};

use super::{NodeTargetState, Scene, SceneEvent, SceneObject};

impl Scene {
    /// Creates a target. It renders in full on its first render.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "target slots and list positions are bounded by u32 handles"
    )]
    pub fn create_target(&mut self, desc: TargetDesc) -> TargetId {
        let idx = if let Some(idx) = self.target_free.pop() {
            idx
        } else {
            let idx = self.targets.len() as u32;
            self.targets.push(None);
            self.target_generation.push(0);
            idx
        };
        let id = TargetId {
            scene: self.id,
            idx,
            generation: self.target_generation[idx as usize],
        };
        let object = self.objects.create(SceneObject::Target(id));
        let list_index = self.target_list.len() as u32;
        self.target_list.push(idx);
        self.targets[idx as usize] = Some(Target::new(id, &desc, object, list_index));
        id
    }

    /// Destroys a target, releasing every cache its nodes held for it.
    ///
    /// Emits [`SceneEvent::TargetDestroyed`] on the scene signal. Other
    /// targets are unaffected.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or belongs to another scene.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "target slots and list positions are bounded by u32 handles"
    )]
    pub fn destroy_target(&mut self, id: TargetId) {
        let slot = self.checked_target(id).unwrap_or_else(|err| panic!("{err}"));
        let Some(mut target) = self.targets[slot].take() else {
            return;
        };
        for idx in core::mem::take(&mut target.nodes) {
            if let Some(state) = self.states[idx as usize].remove(&id) {
                self.drop_state(idx, id, state);
            }
        }

        let li = target.list_index as usize;
        self.target_list.swap_remove(li);
        if let Some(&moved) = self.target_list.get(li)
            && let Some(t) = self.targets[moved as usize].as_mut()
        {
            t.list_index = li as u32;
        }
        self.target_generation[slot] += 1;
        self.target_free.push(slot as u32);

        self.objects
            .emit(self.scene_signal, &SceneEvent::TargetDestroyed(id));
        self.objects.destroy(target.object);
    }

    /// Returns the target.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or belongs to another scene.
    #[must_use]
    pub fn target(&self, id: TargetId) -> &Target {
        let slot = self.checked_target(id).unwrap_or_else(|err| panic!("{err}"));
        self.targets[slot]
            .as_ref()
            .unwrap_or_else(|| panic!("{}", RenderError::InvalidTarget(id)))
    }

    /// Returns the target, or `None` if the handle is stale.
    #[must_use]
    pub fn try_target(&self, id: TargetId) -> Option<&Target> {
        let slot = self.checked_target(id).ok()?;
        self.targets[slot].as_ref()
    }

    /// Iterates over live targets in creation order, modulo removals.
    pub fn targets(&self) -> impl Iterator<Item = &Target> + '_ {
        self.target_list
            .iter()
            .filter_map(|&idx| self.targets[idx as usize].as_ref())
    }

    /// Number of live targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.target_list.len()
    }

    /// Sets the area of the scene shown by a target.
    pub fn set_viewport(&mut self, id: TargetId, viewport: IRect) {
        let target = self.target_mut(id);
        if target.viewport != viewport {
            target.viewport = viewport;
            target.dirty = true;
        }
    }

    /// Sets a target's pixel scale. Non-finite or non-positive scales render
    /// as 1.
    pub fn set_scale(&mut self, id: TargetId, scale: f64) {
        let scale = sanitize_scale(scale);
        let target = self.target_mut(id);
        if target.scale != scale {
            target.scale = scale;
            target.dirty = true;
        }
    }

    /// Sets a target's output transform.
    pub fn set_transform(&mut self, id: TargetId, transform: OutputTransform) {
        let target = self.target_mut(id);
        if target.transform != transform {
            target.transform = transform;
            target.dirty = true;
        }
    }

    /// Sets a target's clear color.
    pub fn set_clear_color(&mut self, id: TargetId, color: Color) {
        let target = self.target_mut(id);
        if target.clear_color != color {
            target.clear_color = color;
            target.dirty = true;
        }
    }

    /// Points a target at a new surface. The next render repaints it fully.
    pub fn set_surface(&mut self, id: TargetId, surface: SurfaceId) {
        let target = self.target_mut(id);
        if target.surface != surface {
            target.surface = surface;
            target.dirty = true;
        }
    }

    /// Adds scene-space damage to one target only.
    pub fn damage_target(&mut self, id: TargetId, region: &Region) {
        self.target_mut(id).damage.add(region);
    }

    // -- Internal helpers --

    /// Resolves a handle to its slot.
    pub(crate) fn checked_target(&self, id: TargetId) -> Result<usize, RenderError> {
        let slot = id.idx as usize;
        let live = id.scene == self.id
            && slot < self.targets.len()
            && self.target_generation[slot] == id.generation
            && self.targets[slot].is_some();
        if live {
            Ok(slot)
        } else {
            Err(RenderError::InvalidTarget(id))
        }
    }

    fn target_mut(&mut self, id: TargetId) -> &mut Target {
        let slot = self.checked_target(id).unwrap_or_else(|err| panic!("{err}"));
        self.targets[slot]
            .as_mut()
            .unwrap_or_else(|| panic!("{}", RenderError::InvalidTarget(id)))
    }

    /// Gives `idx` a fresh state entry for `tid`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a target lists at most one entry per u32 node slot"
    )]
    pub(crate) fn register(&mut self, idx: u32, tid: TargetId) {
        let Some(target) = self.targets[tid.idx as usize].as_mut() else {
            return;
        };
        let slot = target.nodes.len() as u32;
        target.nodes.push(idx);
        self.states[idx as usize].insert(tid, NodeTargetState::new(slot));
    }

    /// Drops the state entry of `idx` for `tid`.
    ///
    /// With `damage`, the area the node covered is damaged, either on the
    /// target or in the cache of the node that bakes it.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a target lists at most one entry per u32 node slot"
    )]
    pub(crate) fn unregister(&mut self, idx: u32, tid: TargetId, damage: bool) {
        let Some(state) = self.states[idx as usize].remove(&tid) else {
            return;
        };
        if let Some(target) = self.targets[tid.idx as usize].as_mut() {
            let slot = state.slot as usize;
            target.nodes.swap_remove(slot);
            if let Some(&moved) = target.nodes.get(slot)
                && let Some(moved_state) = self.states[moved as usize].get_mut(&tid)
            {
                moved_state.slot = slot as u32;
            }
        }
        if damage && !state.fresh {
            let covered = Region::from_rect(state.visible);
            self.route_damage(idx, tid, &covered);
        }
        self.drop_state(idx, tid, state);
    }

    /// Releases what a dropped state entry owned.
    fn drop_state(&mut self, idx: u32, tid: TargetId, state: NodeTargetState) {
        if let Some(cache) = state.bake {
            self.released.push(cache.surface);
        }
        if let Some(NodePayload::SubScene(sub)) = self.payload[idx as usize].as_mut() {
            let surfaces = sub.forget_target(tid);
            self.released.extend(surfaces);
        }
    }

    /// Adds scene-space damage caused by `idx` to wherever it shows up: the
    /// cache of its baking ancestor, or the target itself.
    pub(crate) fn route_damage(&mut self, idx: u32, tid: TargetId, region: &Region) {
        if region.is_empty() {
            return;
        }
        let baker = self.baked_by[idx as usize];
        if baker != INVALID
            && let Some(state) = self.states[baker as usize].get_mut(&tid)
        {
            let origin = self.world_rect[baker as usize];
            state.damage.add(&region.translate(-origin.x0, -origin.y0));
            return;
        }
        if let Some(target) = self.targets[tid.idx as usize].as_mut() {
            target.damage.add(region);
        }
    }

    /// Destroys every target and returns all surfaces the scene still owns.
    pub(crate) fn release_all(&mut self) -> Vec<SurfaceId> {
        let ids: Vec<_> = self.targets().map(Target::id).collect();
        for id in ids {
            self.destroy_target(id);
        }
        self.take_released()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::error::RenderError;

    #[test]
    fn target_ids_are_generational() {
        let mut scene = Scene::new();
        let a = scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(10, 10)));
        scene.destroy_target(a);
        let b = scene.create_target(TargetDesc::new(SurfaceId(2), IRect::from_size(10, 10)));
        assert_eq!(a.index(), b.index());
        assert!(scene.try_target(a).is_none());
        assert_eq!(scene.target(b).surface(), SurfaceId(2));
        assert_eq!(scene.target_count(), 1);
    }

    #[test]
    fn foreign_target_is_rejected() {
        let mut one = Scene::new();
        let two = Scene::new();
        let t = one.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(10, 10)));
        assert_eq!(two.checked_target(t), Err(RenderError::InvalidTarget(t)));
    }

    #[test]
    fn setters_mark_dirty_only_on_change() {
        let mut scene = Scene::new();
        let t = scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(10, 10)));
        scene.targets[t.idx as usize].as_mut().unwrap().dirty = false;

        scene.set_scale(t, 1.0);
        assert!(!scene.target(t).is_dirty());
        scene.set_scale(t, 2.0);
        assert!(scene.target(t).is_dirty());
        assert_eq!(scene.target(t).scale(), 2.0);
    }

    #[test]
    fn destroy_target_emits_event_and_keeps_others() {
        let mut scene = Scene::new();
        let a = scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(10, 10)));
        let b = scene.create_target(TargetDesc::new(SurfaceId(2), IRect::from_size(10, 10)));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let owner = scene.objects_mut().create(SceneObject::Scene);
        let signal = scene.signal();
        scene
            .objects_mut()
            .connect(signal, owner, move |e| sink.borrow_mut().push(*e));

        scene.destroy_target(a);
        assert_eq!(*seen.borrow(), [SceneEvent::TargetDestroyed(a)]);
        let live: Vec<_> = scene.targets().map(Target::id).collect();
        assert_eq!(live, [b]);
    }

    #[test]
    #[should_panic(expected = "is not owned by this scene")]
    fn destroyed_target_handle_panics() {
        let mut scene = Scene::new();
        let t = scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(10, 10)));
        scene.destroy_target(t);
        scene.set_scale(t, 2.0);
    }
}
