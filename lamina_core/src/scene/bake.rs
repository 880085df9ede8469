// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bake caches and live painting.
//!
//! A bakeable node owns one cache surface per target, sized to its local
//! bounds at the target's scale. Each render repaints only the damaged part
//! of the cache (everything after a reallocation) and reports that part as
//! the node's damage on the target. Nodes that bake their children paint
//! every descendant into the same cache, reusing descendants' own caches
//! where they have one.
//!
//! Allocation failures never abort a render: the node paints live for the
//! frame, retries on the next one, and the failure is listed in the
//! [`RenderReport`].

use crate::error::{BakeError, SurfaceError};
use crate::geometry::{Blend, Color, OutputTransform, PixelSize};
use crate::node::{Capabilities, Changes, NodeId, NodePayload};
use crate::paint::{Canvas, DeviceMap, PaintContext, Painter};
use crate::region::Region;
use crate::target::TargetId;
use crate::trace::{BakeEvent, BakeFailedEvent, Tracer};

use super::render::Stats;
use super::{BakeCache, BakeFailure, RenderReport, Scene};

impl Scene {
    /// Bakes `nodes` (in traversal order) back to front, so descendants are
    /// baked before the containers that composite them.
    pub(crate) fn bake_all(
        &mut self,
        nodes: &[u32],
        tid: TargetId,
        scale: f64,
        painter: &mut dyn Painter,
        tracer: &mut Tracer<'_>,
        stats: &mut Stats,
    ) {
        for &idx in nodes.iter().rev() {
            if let Err(error) = self.bake_node(idx, tid, scale, painter, tracer, stats) {
                self.report_failure(self.node_id(idx), error, tid, tracer, stats);
            }
        }
    }

    fn report_failure(
        &self,
        node: NodeId,
        error: BakeError,
        tid: TargetId,
        tracer: &mut Tracer<'_>,
        stats: &mut Stats,
    ) {
        tracer.bake_failed(&BakeFailedEvent {
            frame_index: self.frame_index,
            target: tid,
            node,
            error,
        });
        stats.bake_failures.push(BakeFailure { node, error });
    }

    /// Repaints the damaged part of one node's cache for `tid`.
    ///
    /// # Errors
    ///
    /// Returns the allocation error when no cache surface could be had. The
    /// node's damage has then been routed outward so that it paints live
    /// this frame.
    fn bake_node(
        &mut self,
        idx: u32,
        tid: TargetId,
        scale: f64,
        painter: &mut dyn Painter,
        tracer: &mut Tracer<'_>,
        stats: &mut Stats,
    ) -> Result<(), BakeError> {
        let i = idx as usize;
        let local = self.rect[i].local();
        let world = self.world_rect[i];
        let size = PixelSize::from_logical(local, scale);
        let max = self.config.max_surface_size;
        let caps = self.caps[i];

        let Some(state) = self.states[i].get_mut(&tid) else {
            return Ok(());
        };
        let current = state.visible;
        let forced =
            state.fresh || state.live || state.changes.intersects(Changes::FULL_REBAKE);

        if size.is_empty() {
            // Too small to cover a device pixel.
            if let Some(cache) = state.bake.take() {
                painter.release_surface(cache.surface);
            }
            state.damage.clear();
            return Ok(());
        }

        let mut surface_changed = false;
        let reuse = state
            .bake
            .as_ref()
            .filter(|cache| cache.size == size)
            .map(|cache| cache.surface);
        let surface = if let Some(surface) = reuse {
            surface
        } else {
            if let Some(old) = state.bake.take() {
                painter.release_surface(old.surface);
            }
            let allocated = if size.width > max || size.height > max {
                Err(SurfaceError::TooLarge {
                    width: size.width,
                    height: size.height,
                })
            } else {
                painter.allocate_surface(size)
            };
            match allocated {
                Ok(surface) => {
                    surface_changed = true;
                    surface
                }
                Err(err) => {
                    let was_live = state.live;
                    state.live = true;
                    let outward = if was_live && !forced {
                        state
                            .damage
                            .translate(world.x0, world.y0)
                            .intersect_rect(current)
                    } else {
                        Region::from_rect(current)
                    };
                    state.damage.clear();
                    self.route_damage(idx, tid, &outward);
                    return Err(BakeError::from(err));
                }
            }
        };
        state.live = false;
        let full = surface_changed || forced;
        let client_damage = core::mem::take(&mut state.damage);

        let region = if caps.contains(Capabilities::SUBSCENE) {
            let damage = if full {
                Region::from_rect(local)
            } else {
                client_damage
            };
            let report = match self.payload[i].as_mut() {
                Some(NodePayload::SubScene(sub)) => {
                    sub.bake(tid, surface, local, scale, &damage, painter)
                }
                _ => RenderReport::default(),
            };
            stats.paint_calls += report.paint_calls;
            // Nested failures surface against the sub-scene node.
            let node = self.node_id(idx);
            for failure in &report.bake_failures {
                self.report_failure(node, failure.error, tid, tracer, stats);
            }
            report.painted
        } else {
            let region = if full {
                Region::from_rect(local)
            } else {
                client_damage.intersect_rect(local)
            };
            if !region.is_empty() {
                let map = DeviceMap {
                    origin: (0, 0),
                    scale,
                    transform: OutputTransform::Normal,
                    size,
                };
                let mut canvas = Canvas::new(painter, surface, map, region.clone());
                canvas.set_blend(Blend::Replace);
                canvas.fill(&region, Color::TRANSPARENT);
                canvas.set_blend(Blend::SrcOver);
                let opaque = self.opacity[i].resolve(local);
                if let Some(NodePayload::Content(content)) = self.payload[i].as_mut() {
                    let mut cx = PaintContext::new(
                        &mut canvas,
                        local,
                        &region,
                        &opaque,
                        surface_changed,
                        tid,
                    );
                    content.paint(&mut cx);
                }
                if caps.contains(Capabilities::CONTAINER) {
                    self.paint_descendants(idx, tid, &mut canvas, &region);
                }
                stats.paint_calls += canvas.paint_calls();
            }
            region
        };

        if let Some(state) = self.states[i].get_mut(&tid) {
            state.bake = Some(BakeCache { surface, size });
        }
        if region.is_empty() {
            return Ok(());
        }
        let outward = region
            .translate(world.x0, world.y0)
            .intersect_rect(current);
        self.route_damage(idx, tid, &outward);
        stats.nodes_baked += 1;
        tracer.bake(&BakeEvent {
            frame_index: self.frame_index,
            target: tid,
            node: self.node_id(idx),
            area: region.area(),
            surface_changed,
        });
        Ok(())
    }

    /// Paints the descendants of a node that bakes its children.
    ///
    /// `canvas` is translated to the container's origin; `region` is the
    /// container-local area to paint.
    pub(crate) fn paint_descendants(
        &mut self,
        container: u32,
        tid: TargetId,
        canvas: &mut Canvas<'_>,
        region: &Region,
    ) {
        let c = container as usize;
        let origin = self.world_rect[c];
        let mut pos = self.order_pos[c] as usize + 1;
        let end = self.order_end[c] as usize;
        while pos < end {
            let idx = self.traversal_order[pos];
            let i = idx as usize;
            let subtree_end = self.order_end[i] as usize;
            if !self.effective_visible[i] {
                pos = subtree_end;
                continue;
            }
            let next = if self.caps[i].contains(Capabilities::BAKES | Capabilities::CONTAINER) {
                // Its descendants live in its own cache.
                subtree_end
            } else {
                pos + 1
            };
            pos = next;

            let Some(state) = self.states[i].get(&tid) else {
                continue;
            };
            let area = region.intersect_rect(state.visible.translate(-origin.x0, -origin.y0));
            if area.is_empty() {
                continue;
            }
            let cached = state.bake.as_ref().map(|cache| cache.surface);
            let world = self.world_rect[i];
            let (dx, dy) = (world.x0 - origin.x0, world.y0 - origin.y0);

            canvas.save();
            canvas.clip_region(&area);
            canvas.translate(dx, dy);
            match cached {
                Some(surface) => canvas.draw_surface(surface, self.rect[i].local()),
                None => self.paint_live(idx, tid, canvas, &area.translate(-dx, -dy)),
            }
            canvas.restore();
        }
    }

    /// Paints a node without its cache.
    ///
    /// `canvas` is translated to the node's origin; `damage` is node-local.
    pub(crate) fn paint_live(
        &mut self,
        idx: u32,
        tid: TargetId,
        canvas: &mut Canvas<'_>,
        damage: &Region,
    ) {
        let i = idx as usize;
        let local = self.rect[i].local();
        let opaque = self.opacity[i].resolve(local);
        if let Some(NodePayload::Content(content)) = self.payload[i].as_mut() {
            let mut cx = PaintContext::new(canvas, local, damage, &opaque, false, tid);
            content.paint(&mut cx);
        }
        if self.caps[i].contains(Capabilities::BAKES | Capabilities::CONTAINER) {
            self.paint_descendants(idx, tid, canvas, damage);
        }
    }
}
