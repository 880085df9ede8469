// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nested scenes.
//!
//! A sub-scene node owns a complete [`Scene`] and bakes it like any other
//! bakeable node: for each outer target the node is visible on, the nested
//! scene gets an inner target whose surface is the node's cache surface.
//! The inner target's viewport is the node's local bounds, it inherits the
//! outer scale, and it clears to transparent so the outer scene shows
//! through. Whatever the inner render paints becomes the node's damage on
//! the outer target.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::geometry::{Color, IRect};
use crate::paint::{Painter, SurfaceId};
use crate::region::Region;
use crate::target::{TargetDesc, TargetId};

use super::{RenderReport, Scene};

/// A nested scene rendered through a node of an outer scene.
#[derive(Debug)]
pub struct SubScene {
    scene: Scene,
    /// Outer target → inner target.
    targets: HashMap<TargetId, TargetId>,
}

impl SubScene {
    pub(crate) fn new(scene: Scene) -> Self {
        Self {
            scene,
            targets: HashMap::new(),
        }
    }

    /// The nested scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the nested scene.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The inner target serving `outer`, if the node has rendered on it.
    #[must_use]
    pub fn inner_target(&self, outer: TargetId) -> Option<TargetId> {
        self.targets.get(&outer).copied()
    }

    /// Renders the nested scene into the cache surface for `outer`.
    ///
    /// `local` is the node's local bounds and `damage` its pending client
    /// damage. The inner report's bake failures are left for the caller to
    /// surface on the outer scene.
    pub(crate) fn bake(
        &mut self,
        outer: TargetId,
        surface: SurfaceId,
        local: IRect,
        scale: f64,
        damage: &Region,
        painter: &mut dyn Painter,
    ) -> RenderReport {
        let root = self.scene.root();
        if self.scene.rect(root) != local {
            self.scene.set_rect(root, local);
        }

        let inner = match self.targets.get(&outer) {
            Some(&inner) if self.scene.try_target(inner).is_some() => {
                self.scene.set_surface(inner, surface);
                self.scene.set_viewport(inner, local);
                self.scene.set_scale(inner, scale);
                inner
            }
            _ => {
                let desc = TargetDesc::new(surface, local)
                    .with_scale(scale)
                    .with_clear_color(Color::TRANSPARENT);
                let inner = self.scene.create_target(desc);
                self.targets.insert(outer, inner);
                inner
            }
        };
        if !damage.is_empty() {
            self.scene.damage_target(inner, damage);
        }
        match self.scene.render(inner, painter) {
            Ok(report) => report,
            // `inner` was validated or created above.
            Err(err) => unreachable!("{err}"),
        }
    }

    /// Drops the inner target serving `outer` and returns the surfaces the
    /// nested scene no longer needs.
    pub(crate) fn forget_target(&mut self, outer: TargetId) -> Vec<SurfaceId> {
        if let Some(inner) = self.targets.remove(&outer)
            && self.scene.try_target(inner).is_some()
        {
            self.scene.destroy_target(inner);
        }
        self.scene.take_released()
    }

    /// Drops every inner target and returns every surface the nested scene
    /// still owns.
    pub(crate) fn shut_down(&mut self) -> Vec<SurfaceId> {
        self.targets.clear();
        self.scene.release_all()
    }
}
