// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-target render pipeline.

use alloc::vec::Vec;

use crate::error::{BakeError, RenderError};
use crate::geometry::{Blend, IRect};
use crate::node::{Capabilities, Changes, INVALID, NodeId};
use crate::paint::{Canvas, Painter};
use crate::region::Region;
use crate::target::TargetId;
use crate::trace::{
    PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderBeginEvent, RenderSummary, Tracer,
};

use super::Scene;

/// A node that could not be baked during a render.
///
/// The node painted live instead and bakes in full on the next render of
/// the same target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BakeFailure {
    /// The node. Failures inside a nested scene name the sub-scene node.
    pub node: NodeId,
    /// Why baking failed.
    pub error: BakeError,
}

/// The outcome of one [`Scene::render`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Per-scene render counter of this call.
    pub frame_index: u64,
    /// Repainted area in scene coordinates.
    pub painted: Region,
    /// Repainted area in surface pixels, after scale and transform. Hand
    /// this to the presentation layer.
    pub device_damage: Region,
    /// Primitives issued to the painter, cache repaints included.
    pub paint_calls: usize,
    /// Caches repainted.
    pub nodes_baked: usize,
    /// Nodes that painted onto the target surface.
    pub nodes_painted: usize,
    /// Nodes whose cache could not be allocated, in bake order.
    pub bake_failures: Vec<BakeFailure>,
}

impl RenderReport {
    /// Returns `true` if nothing was repainted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.painted.is_empty()
    }
}

/// Counters shared by the bake and paint passes.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub(crate) paint_calls: usize,
    pub(crate) nodes_baked: usize,
    pub(crate) bake_failures: Vec<BakeFailure>,
}

/// One composited node and the parts of it each pass paints.
struct PaintItem {
    idx: u32,
    opaque: Region,
    translucent: Region,
}

impl Scene {
    /// Renders the damaged part of one target.
    ///
    /// Only the target's own per-node state is consumed; other targets keep
    /// their pending damage. A render with nothing to do issues no paint
    /// calls.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidTarget`] if the target was destroyed or
    /// belongs to another scene. Nothing is painted in that case.
    pub fn render(
        &mut self,
        target: TargetId,
        painter: &mut dyn Painter,
    ) -> Result<RenderReport, RenderError> {
        self.render_traced(target, painter, &mut Tracer::none())
    }

    /// Like [`render`](Self::render), reporting phases and bakes to `tracer`.
    ///
    /// The pipeline, per call:
    ///
    /// 1. **Prepare**: release caches dropped since the last call; if a target
    ///    property changed, recompute its matrix and damage the whole
    ///    viewport.
    /// 2. **Layout** and **geometry**: see the evaluation phases.
    /// 3. **Damage**: (un)register nodes against the viewport and turn moves,
    ///    resizes, changes and client damage into target damage. Nodes inside
    ///    a baking container damage the container's cache instead.
    /// 4. **Bake**: repaint damaged caches, deepest first.
    /// 5. **Opaque**: walking front to back, split the damage into the part
    ///    each node must paint, and paint opaque parts with
    ///    [`Blend::Replace`].
    /// 6. **Background**: fill damage no opaque node covers with the clear
    ///    color.
    /// 7. **Translucent**: blend the remaining parts back to front.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_traced(
        &mut self,
        target: TargetId,
        painter: &mut dyn Painter,
        tracer: &mut Tracer<'_>,
    ) -> Result<RenderReport, RenderError> {
        let slot = self.checked_target(target)?;
        self.frame_index += 1;
        let frame_index = self.frame_index;
        tracer.render_begin(&RenderBeginEvent {
            frame_index,
            target,
        });

        self.release_surfaces(painter);
        self.prepare_target(slot, target);
        let Some(t) = self.targets[slot].as_ref() else {
            return Err(RenderError::InvalidTarget(target));
        };
        let viewport = t.viewport;
        let scale = t.scale;
        let surface = t.surface;
        let clear_color = t.clear_color;
        let map = t.device_map();

        self.phase_begin(tracer, target, PhaseKind::Layout);
        self.rebuild_traversal_order();
        self.run_layout();
        self.update_geometry();
        self.phase_end(tracer, target, PhaseKind::Layout);

        self.phase_begin(tracer, target, PhaseKind::Damage);
        let (composited, baked) = self.collect_damage(target, viewport);
        self.phase_end(tracer, target, PhaseKind::Damage);

        let mut stats = Stats::default();
        self.phase_begin(tracer, target, PhaseKind::Bake);
        self.bake_all(&baked, target, scale, painter, tracer, &mut stats);
        self.phase_end(tracer, target, PhaseKind::Bake);

        let damage = match self.targets[slot].as_mut() {
            Some(t) => core::mem::take(&mut t.damage).intersect_rect(viewport),
            None => Region::new(),
        };
        #[cfg(feature = "trace-rich")]
        {
            let rects: Vec<crate::trace::DamageRect> =
                damage.iter().map(crate::trace::DamageRect::from).collect();
            tracer.damage_rects(frame_index, &rects);
        }

        let mut canvas = Canvas::new(painter, surface, map, Region::from_rect(viewport));

        self.phase_begin(tracer, target, PhaseKind::Opaque);
        let (items, background) = self.occlusion(&composited, target, &damage);
        canvas.set_blend(Blend::Replace);
        for item in items.iter().rev() {
            if !item.opaque.is_empty() {
                self.composite_node(item.idx, target, &mut canvas, &item.opaque);
            }
        }
        self.phase_end(tracer, target, PhaseKind::Opaque);

        self.phase_begin(tracer, target, PhaseKind::Background);
        canvas.fill(&background, clear_color);
        self.phase_end(tracer, target, PhaseKind::Background);

        self.phase_begin(tracer, target, PhaseKind::Translucent);
        canvas.set_blend(Blend::SrcOver);
        for item in items.iter().rev() {
            if !item.translucent.is_empty() {
                self.composite_node(item.idx, target, &mut canvas, &item.translucent);
            }
        }
        self.phase_end(tracer, target, PhaseKind::Translucent);
        stats.paint_calls += canvas.paint_calls();
        drop(canvas);

        self.finish_target(slot, target);

        let report = RenderReport {
            frame_index,
            device_damage: map.region_to_device(&damage),
            painted: damage,
            paint_calls: stats.paint_calls,
            nodes_baked: stats.nodes_baked,
            nodes_painted: items.len(),
            bake_failures: stats.bake_failures,
        };
        tracer.render_summary(&RenderSummary {
            frame_index,
            target,
            painted_area: report.painted.area(),
            paint_calls: u32::try_from(report.paint_calls).unwrap_or(u32::MAX),
            nodes_baked: u32::try_from(report.nodes_baked).unwrap_or(u32::MAX),
            nodes_painted: u32::try_from(report.nodes_painted).unwrap_or(u32::MAX),
        });
        Ok(report)
    }

    /// Applies pending target property changes.
    fn prepare_target(&mut self, slot: usize, tid: TargetId) {
        let Some(target) = self.targets[slot].as_mut() else {
            return;
        };
        if !target.dirty {
            return;
        }
        let scale_changed = target.update_matrix();
        target.damage.add_rect(target.viewport);
        target.dirty = false;
        if scale_changed {
            for &idx in &target.nodes {
                if let Some(state) = self.states[idx as usize].get_mut(&tid) {
                    state.changes |= Changes::SCALE;
                }
            }
        }
    }

    /// Registers participating nodes, unregisters the rest, and turns node
    /// changes into damage.
    ///
    /// Returns the composited nodes and the baking nodes, in traversal order.
    fn collect_damage(&mut self, tid: TargetId, viewport: IRect) -> (Vec<u32>, Vec<u32>) {
        let mut composited = Vec::new();
        let mut baked = Vec::new();

        for pos in 0..self.traversal_order.len() {
            let idx = self.traversal_order[pos];
            let i = idx as usize;
            let caps = self.caps[i];
            if !caps.contains(Capabilities::RENDERS) {
                continue;
            }

            let baker = self.baked_by[i];
            let bounds = if baker == INVALID {
                Some(viewport)
            } else if self.states[baker as usize].contains_key(&tid) {
                Some(self.world_rect[baker as usize])
            } else {
                None
            };
            let current = match bounds {
                Some(bounds) if self.effective_visible[i] => {
                    self.visible_rect(idx).intersect(bounds)
                }
                _ => IRect::ZERO,
            };
            if current.is_empty() {
                self.unregister(idx, tid, true);
                continue;
            }
            if !self.states[i].contains_key(&tid) {
                self.register(idx, tid);
            }

            let world = self.world_rect[i];
            let bakes = caps.contains(Capabilities::BAKES);
            let opaque = if baker == INVALID {
                self.opacity[i]
                    .resolve(self.rect[i].local())
                    .translate(world.x0, world.y0)
                    .intersect_rect(current)
            } else {
                Region::new()
            };

            let Some(state) = self.states[i].get_mut(&tid) else {
                continue;
            };
            let mut damage = Region::new();
            let whole = state.fresh
                || state.changes.intersects(Changes::FULL_DAMAGE | Changes::POSITION)
                || state.visible != current
                || state.world != world;
            if whole {
                // Old and new coverage both need repainting.
                damage.add_rect(current);
                if !state.fresh {
                    damage.add_rect(state.visible);
                }
            } else if !bakes && !state.damage.is_empty() {
                damage = state
                    .damage
                    .translate(world.x0, world.y0)
                    .intersect_rect(current);
            }
            if !bakes {
                state.damage.clear();
            }
            state.visible = current;
            state.world = world;
            state.opaque = opaque;

            self.route_damage(idx, tid, &damage);
            if bakes {
                baked.push(idx);
            }
            if baker == INVALID {
                composited.push(idx);
            }
        }
        (composited, baked)
    }

    /// Splits `damage` among the composited nodes, front to back.
    ///
    /// Returns the nodes with something to paint and the damage no opaque
    /// node covers.
    fn occlusion(
        &self,
        composited: &[u32],
        tid: TargetId,
        damage: &Region,
    ) -> (Vec<PaintItem>, Region) {
        let mut items = Vec::new();
        let mut occluded = Region::new();
        for &idx in composited.iter().rev() {
            let i = idx as usize;
            let Some(state) = self.states[i].get(&tid) else {
                continue;
            };
            // A sub-scene without a cache has nothing to show.
            let paints_nothing = state.bake.is_none()
                && self.caps[i].contains(Capabilities::SUBSCENE);
            if paints_nothing {
                continue;
            }
            let exposed = damage
                .intersect_rect(state.visible)
                .subtract(&occluded);
            if !exposed.is_empty() {
                items.push(PaintItem {
                    idx,
                    opaque: exposed.intersect(&state.opaque),
                    translucent: exposed.subtract(&state.opaque),
                });
            }
            occluded.add(&state.opaque.intersect(damage));
        }
        let background = damage.subtract(&occluded);
        (items, background)
    }

    /// Paints one composited node, clipped to `area` (scene coordinates).
    fn composite_node(
        &mut self,
        idx: u32,
        tid: TargetId,
        canvas: &mut Canvas<'_>,
        area: &Region,
    ) {
        let i = idx as usize;
        let world = self.world_rect[i];
        let cached = self.states[i]
            .get(&tid)
            .and_then(|state| state.bake.as_ref())
            .map(|cache| cache.surface);
        canvas.save();
        canvas.clip_region(area);
        canvas.translate(world.x0, world.y0);
        match cached {
            Some(surface) => canvas.draw_surface(surface, self.rect[i].local()),
            None => self.paint_live(idx, tid, canvas, &area.translate(-world.x0, -world.y0)),
        }
        canvas.restore();
    }

    /// Clears the change bits and damage consumed by this render.
    fn finish_target(&mut self, slot: usize, tid: TargetId) {
        let Some(target) = self.targets[slot].as_ref() else {
            return;
        };
        for &idx in &target.nodes {
            if let Some(state) = self.states[idx as usize].get_mut(&tid) {
                state.changes = Changes::empty();
                state.fresh = false;
                state.damage.clear();
            }
        }
    }

    fn phase_begin(&mut self, tracer: &mut Tracer<'_>, target: TargetId, phase: PhaseKind) {
        let seq = self.next_seq();
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            target,
            phase,
            seq,
        });
    }

    fn phase_end(&mut self, tracer: &mut Tracer<'_>, target: TargetId, phase: PhaseKind) {
        let seq = self.next_seq();
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            target,
            phase,
            seq,
        });
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use crate::error::{BakeError, RenderError, SurfaceError};
    use crate::geometry::{Blend, Color, IRect, PixelSize};
    use crate::node::{Changes, Node};
    use crate::paint::{NodeContent, PaintContext, SolidColor, SurfaceId};
    use crate::region::Region;
    use crate::scene::{BakeFailure, Scene, SceneConfig};
    use crate::target::{TargetDesc, TargetId};
    use crate::test_util::{Call, RecordingPainter};

    const RED: Color = Color::opaque(255, 0, 0);
    const BLUE: Color = Color::opaque(0, 0, 255);

    #[derive(Debug, Default)]
    struct Log {
        damage: Vec<Region>,
        surface_changed: Vec<bool>,
    }

    /// Translucent content that records what it was asked to paint.
    struct Recorder {
        log: Rc<RefCell<Log>>,
        color: Color,
    }

    impl Recorder {
        fn new(color: Color) -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            (
                Self {
                    log: log.clone(),
                    color,
                },
                log,
            )
        }
    }

    impl NodeContent for Recorder {
        fn paint(&mut self, cx: &mut PaintContext<'_, '_>) {
            {
                let mut log = self.log.borrow_mut();
                log.damage.push(cx.damage().clone());
                log.surface_changed.push(cx.surface_changed());
            }
            let bounds = cx.bounds();
            cx.canvas().fill_rect(bounds, self.color);
        }
    }

    fn setup() -> (Scene, TargetId, RecordingPainter) {
        let mut scene = Scene::new();
        let target =
            scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(100, 100)));
        (scene, target, RecordingPainter::default())
    }

    fn fill(rect: IRect, color: Color, blend: Blend) -> Call {
        Call::Fill {
            surface: SurfaceId(1),
            rect,
            color,
            blend,
        }
    }

    #[test]
    fn first_render_is_full_then_idle() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        scene.insert(root, Node::solid(RED).with_rect(IRect::new(10, 10, 60, 60)));

        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.frame_index, 1);
        assert_eq!(report.painted, Region::from_rect(IRect::from_size(100, 100)));
        assert_eq!(report.nodes_painted, 1);
        // One opaque fill for the node, four background bands around it.
        assert_eq!(report.paint_calls, 5);
        assert_eq!(
            painter.calls[0],
            fill(IRect::new(10, 10, 60, 60), RED, Blend::Replace)
        );
        assert!(painter.calls[1..]
            .iter()
            .all(|c| matches!(c, Call::Fill { color, blend: Blend::Replace, .. } if *color == Color::BLACK)));

        painter.clear();
        let report = scene.render(target, &mut painter).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.paint_calls, 0);
        assert!(painter.calls.is_empty());
    }

    #[test]
    fn moving_damages_old_and_new_rects() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(root, Node::solid(RED).with_rect(IRect::new(10, 10, 60, 60)));
        scene.render(target, &mut painter).unwrap();

        scene.set_position(node, 20, 10);
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.painted, Region::from_rect(IRect::new(10, 10, 70, 60)));
    }

    #[test]
    fn client_damage_is_clipped_to_the_node() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, log) = Recorder::new(RED);
        let node = scene.insert(
            root,
            Node::renderable(content).with_rect(IRect::new(50, 50, 70, 70)),
        );
        scene.render(target, &mut painter).unwrap();

        scene.add_damage_rect(node, IRect::new(15, 15, 40, 40));
        assert_eq!(
            scene.damage(node, target),
            Region::from_rect(IRect::new(15, 15, 20, 20))
        );
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.painted, Region::from_rect(IRect::new(65, 65, 70, 70)));
        assert_eq!(
            log.borrow().damage.last(),
            Some(&Region::from_rect(IRect::new(15, 15, 20, 20)))
        );
        assert!(scene.damage(node, target).is_empty());
    }

    #[test]
    fn opaque_nodes_occlude_what_is_below() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, log) = Recorder::new(BLUE);
        scene.insert(root, Node::renderable(content).with_rect(IRect::from_size(50, 50)));
        scene.insert(root, Node::solid(RED).with_rect(IRect::from_size(50, 25)));

        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_painted, 2);
        assert_eq!(
            log.borrow().damage,
            [Region::from_rect(IRect::new(0, 25, 50, 50))]
        );
        // The translucent node blends over the background painted for it.
        let blue = painter
            .calls
            .iter()
            .position(|c| matches!(c, Call::Fill { color, .. } if *color == BLUE))
            .unwrap();
        let background = painter
            .calls
            .iter()
            .position(|c| matches!(c, Call::Fill { color, .. } if *color == Color::BLACK))
            .unwrap();
        assert!(background < blue);
    }

    #[test]
    fn overlapping_opaque_siblings_paint_each_pixel_once() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        scene.insert(root, Node::solid(RED).with_rect(IRect::new(0, 0, 50, 50)));
        scene.insert(root, Node::solid(BLUE).with_rect(IRect::new(25, 0, 75, 50)));

        scene.render(target, &mut painter).unwrap();
        let red: Vec<_> = painter
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Fill { color, .. } if *color == RED))
            .collect();
        assert_eq!(red, [&fill(IRect::new(0, 0, 25, 50), RED, Blend::Replace)]);
        assert!(painter
            .calls
            .contains(&fill(IRect::new(25, 0, 75, 50), BLUE, Blend::Replace)));
        assert!(!painter
            .calls
            .iter()
            .any(|c| matches!(c, Call::Fill { blend: Blend::SrcOver, .. })));
    }

    #[test]
    fn removed_nodes_leave_no_target_registration() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(root, Node::solid(RED).with_rect(IRect::new(0, 0, 10, 10)));
        scene.render(target, &mut painter).unwrap();
        let weak = scene.weak_node(node);

        scene.remove(node);
        assert_eq!(scene.upgrade_node(weak), None);
        assert_eq!(scene.target(target).node_count(), 0);
        scene.destroy_target(target);
        assert_eq!(scene.target_count(), 0);
    }

    #[test]
    fn targets_keep_independent_damage() {
        let (mut scene, a, mut painter) = setup();
        let b = scene.create_target(TargetDesc::new(SurfaceId(2), IRect::from_size(100, 100)));
        let root = scene.root();
        let node = scene.insert(root, Node::solid(RED).with_rect(IRect::new(10, 10, 20, 20)));
        scene.render(a, &mut painter).unwrap();
        scene.render(b, &mut painter).unwrap();

        scene.invalidate(node);
        assert!(scene.pending_changes(node, a).contains(Changes::CONTENT));
        let report = scene.render(a, &mut painter).unwrap();
        assert_eq!(report.painted, Region::from_rect(IRect::new(10, 10, 20, 20)));
        assert!(scene.pending_changes(node, a).is_empty());
        assert!(scene.pending_changes(node, b).contains(Changes::CONTENT));

        let report = scene.render(b, &mut painter).unwrap();
        assert_eq!(report.painted, Region::from_rect(IRect::new(10, 10, 20, 20)));
    }

    #[test]
    fn stale_or_foreign_targets_are_rejected() {
        let (mut scene, target, mut painter) = setup();
        scene.destroy_target(target);
        assert_eq!(
            scene.render(target, &mut painter),
            Err(RenderError::InvalidTarget(target))
        );

        let mut other = Scene::new();
        let foreign = other.create_target(TargetDesc::new(SurfaceId(9), IRect::from_size(10, 10)));
        assert_eq!(
            scene.render(foreign, &mut painter),
            Err(RenderError::InvalidTarget(foreign))
        );
        assert!(painter.calls.is_empty());
        assert_eq!(scene.frame_index(), 0);
    }

    #[test]
    fn bake_repaints_only_damage() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, log) = Recorder::new(RED);
        let node = scene.insert(
            root,
            Node::bakeable(content).with_rect(IRect::new(10, 10, 60, 60)),
        );

        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        let cache = scene.bake_cache(node, target).unwrap().surface();
        assert_eq!(painter.allocated.len(), 1);
        assert_eq!(log.borrow().surface_changed, [true]);
        assert!(painter
            .calls_on(SurfaceId(1))
            .iter()
            .any(|c| matches!(c, Call::Blit { src, .. } if *src == cache)));

        painter.clear();
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 0);
        assert!(painter.calls.is_empty());

        scene.add_damage_rect(node, IRect::from_size(10, 10));
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        assert_eq!(report.painted, Region::from_rect(IRect::new(10, 10, 20, 20)));
        assert_eq!(
            log.borrow().damage.last(),
            Some(&Region::from_rect(IRect::from_size(10, 10)))
        );
        assert_eq!(log.borrow().surface_changed.last(), Some(&false));
    }

    #[test]
    fn resizing_a_bakeable_reallocates_its_cache() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, log) = Recorder::new(RED);
        let node = scene.insert(root, Node::bakeable(content).with_rect(IRect::from_size(50, 50)));
        scene.render(target, &mut painter).unwrap();
        let old = scene.bake_cache(node, target).unwrap().surface();

        scene.set_size(node, 60, 60);
        scene.render(target, &mut painter).unwrap();
        let cache = scene.bake_cache(node, target).unwrap();
        assert_ne!(cache.surface(), old);
        assert_eq!(cache.size(), PixelSize::new(60, 60));
        assert_eq!(painter.released, [old]);
        assert_eq!(log.borrow().surface_changed.last(), Some(&true));
    }

    #[test]
    fn failed_allocation_paints_live_then_retries() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, log) = Recorder::new(RED);
        let node = scene.insert(root, Node::bakeable(content).with_rect(IRect::from_size(50, 50)));

        painter.fail_allocations = true;
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 0);
        assert_eq!(
            report.bake_failures,
            [BakeFailure {
                node,
                error: BakeError::Allocation(SurfaceError::Exhausted),
            }]
        );
        assert!(scene.bake_cache(node, target).is_none());
        assert_eq!(log.borrow().surface_changed, [false]);
        assert!(painter
            .calls
            .iter()
            .any(|c| matches!(c, Call::Fill { color, .. } if *color == RED)));

        painter.fail_allocations = false;
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        assert!(report.bake_failures.is_empty());
        assert!(scene.bake_cache(node, target).is_some());
    }

    #[test]
    fn oversized_caches_fall_back_to_live_painting() {
        let mut scene = Scene::with_config(SceneConfig {
            max_surface_size: 32,
        });
        let target = scene.create_target(TargetDesc::new(SurfaceId(1), IRect::from_size(100, 100)));
        let mut painter = RecordingPainter::default();
        let root = scene.root();
        let node = scene.insert(
            root,
            Node::bakeable(SolidColor::new(RED)).with_rect(IRect::from_size(50, 50)),
        );
        let report = scene.render(target, &mut painter).unwrap();
        assert!(painter.allocated.is_empty());
        assert!(scene.bake_cache(node, target).is_none());
        assert_eq!(
            report.bake_failures,
            [BakeFailure {
                node,
                error: BakeError::Allocation(SurfaceError::TooLarge {
                    width: 50,
                    height: 50,
                }),
            }]
        );
    }

    #[test]
    fn nested_bake_failures_name_the_subscene_node() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let sub = scene.insert(root, Node::subscene().with_rect(IRect::new(10, 10, 60, 60)));
        {
            let inner = scene.subscene_mut(sub).unwrap().scene_mut();
            let inner_root = inner.root();
            inner.insert(
                inner_root,
                Node::bakeable(SolidColor::new(RED)).with_rect(IRect::from_size(10, 10)),
            );
        }

        // The sub-scene's own cache fits; the nested node's does not.
        painter.allocation_budget = Some(1);
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(
            report.bake_failures,
            [BakeFailure {
                node: sub,
                error: BakeError::Allocation(SurfaceError::Exhausted),
            }]
        );
        let cache = scene.bake_cache(sub, target).unwrap().surface();
        assert!(painter.calls_on(cache).iter().any(|c| matches!(
            c,
            Call::Fill { rect, color, .. } if *rect == IRect::from_size(10, 10) && *color == RED
        )));

        painter.allocation_budget = None;
        let report = scene.render(target, &mut painter).unwrap();
        assert!(report.bake_failures.is_empty());
    }

    #[test]
    fn baked_container_absorbs_child_damage() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let (content, _log) = Recorder::new(Color::TRANSPARENT);
        let group = scene.insert(
            root,
            Node::baked_container(content).with_rect(IRect::from_size(100, 100)),
        );
        let child = scene.insert(group, Node::solid(BLUE).with_rect(IRect::new(10, 10, 20, 20)));
        scene.render(target, &mut painter).unwrap();

        let cache = scene.bake_cache(group, target).unwrap().surface();
        assert!(painter.calls_on(cache).iter().any(|c| matches!(
            c,
            Call::Fill { rect, color, .. } if *rect == IRect::new(10, 10, 20, 20) && *color == BLUE
        )));
        assert!(scene.is_registered(child, target));

        painter.clear();
        scene.set_position(child, 30, 30);
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        assert_eq!(
            report.painted,
            Region::from_rects([IRect::new(10, 10, 20, 20), IRect::new(30, 30, 40, 40)])
        );
        // The child reaches the target only through the group's cache.
        let on_target = painter.calls_on(SurfaceId(1));
        assert!(on_target.iter().any(|c| matches!(c, Call::Blit { src, .. } if *src == cache)));
        assert!(!on_target
            .iter()
            .any(|c| matches!(c, Call::Fill { color, .. } if *color == BLUE)));
    }

    #[test]
    fn subscene_changes_damage_the_outer_target() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let sub = scene.insert(root, Node::subscene().with_rect(IRect::new(10, 10, 60, 60)));
        let inner_node = {
            let inner = scene.subscene_mut(sub).unwrap().scene_mut();
            let inner_root = inner.root();
            inner.insert(inner_root, Node::solid(RED).with_rect(IRect::from_size(10, 10)))
        };

        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        let cache = scene.bake_cache(sub, target).unwrap().surface();
        let inner_target = scene.subscene(sub).unwrap().inner_target(target).unwrap();
        assert_eq!(
            scene.subscene(sub).unwrap().scene().target(inner_target).surface(),
            cache
        );
        assert!(painter.calls_on(cache).iter().any(|c| matches!(
            c,
            Call::Fill { rect, color, .. } if *rect == IRect::from_size(10, 10) && *color == RED
        )));

        scene
            .subscene_mut(sub)
            .unwrap()
            .scene_mut()
            .set_position(inner_node, 20, 0);
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(
            report.painted,
            Region::from_rects([IRect::new(10, 10, 20, 20), IRect::new(30, 10, 40, 20)])
        );

        painter.clear();
        let report = scene.render(target, &mut painter).unwrap();
        assert!(report.is_empty());
        assert!(painter.calls.is_empty());
    }

    #[test]
    fn removal_damages_and_releases() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(
            root,
            Node::bakeable(SolidColor::new(RED)).with_rect(IRect::new(10, 10, 30, 30)),
        );
        scene.render(target, &mut painter).unwrap();
        let cache = scene.bake_cache(node, target).unwrap().surface();

        scene.remove(node);
        assert_eq!(
            scene.target(target).pending_damage(),
            &Region::from_rect(IRect::new(10, 10, 30, 30))
        );
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.painted, Region::from_rect(IRect::new(10, 10, 30, 30)));
        assert_eq!(painter.released, [cache]);
    }

    #[test]
    fn hiding_unregisters_and_damages() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(root, Node::solid(RED).with_rect(IRect::new(0, 0, 10, 10)));
        scene.render(target, &mut painter).unwrap();
        assert!(scene.is_registered(node, target));

        scene.set_visible(node, false);
        let report = scene.render(target, &mut painter).unwrap();
        assert!(!scene.is_registered(node, target));
        assert_eq!(report.painted, Region::from_rect(IRect::new(0, 0, 10, 10)));
        assert_eq!(scene.target(target).node_count(), 0);
    }

    #[test]
    fn nodes_outside_the_viewport_are_not_registered() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(root, Node::solid(RED).with_rect(IRect::new(200, 0, 210, 10)));
        scene.render(target, &mut painter).unwrap();
        assert!(!scene.is_registered(node, target));

        scene.set_viewport(target, IRect::new(150, 0, 250, 100));
        let report = scene.render(target, &mut painter).unwrap();
        assert!(scene.is_registered(node, target));
        assert_eq!(report.painted, Region::from_rect(IRect::new(150, 0, 250, 100)));
        assert_eq!(
            painter.calls.iter().find(|c| matches!(c, Call::Fill { color, .. } if *color == RED)),
            Some(&fill(IRect::new(50, 0, 60, 10), RED, Blend::Replace))
        );
    }

    #[test]
    fn scale_change_rebakes_at_the_new_size() {
        let (mut scene, target, mut painter) = setup();
        let root = scene.root();
        let node = scene.insert(
            root,
            Node::bakeable(SolidColor::new(RED)).with_rect(IRect::from_size(50, 50)),
        );
        scene.render(target, &mut painter).unwrap();

        scene.set_scale(target, 2.0);
        let report = scene.render(target, &mut painter).unwrap();
        assert_eq!(report.nodes_baked, 1);
        assert_eq!(
            scene.bake_cache(node, target).unwrap().size(),
            PixelSize::new(100, 100)
        );
        assert_eq!(
            report.device_damage,
            Region::from_rect(IRect::from_size(200, 200))
        );
    }

    #[test]
    fn destroying_a_target_releases_only_its_caches() {
        let (mut scene, a, mut painter) = setup();
        let b = scene.create_target(TargetDesc::new(SurfaceId(2), IRect::from_size(100, 100)));
        let root = scene.root();
        let node = scene.insert(
            root,
            Node::bakeable(SolidColor::new(RED)).with_rect(IRect::from_size(50, 50)),
        );
        scene.render(a, &mut painter).unwrap();
        scene.render(b, &mut painter).unwrap();
        let cache_a = scene.bake_cache(node, a).unwrap().surface();
        let cache_b = scene.bake_cache(node, b).unwrap().surface();
        assert_ne!(cache_a, cache_b);

        scene.destroy_target(a);
        scene.render(b, &mut painter).unwrap();
        assert_eq!(painter.released, [cache_a]);
        assert!(scene.bake_cache(node, b).is_some());
    }
}
