// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render targets.
//!
//! A [`Target`] is one independent render destination (typically one display
//! output) serviced by a [`Scene`](crate::scene::Scene). It maps a logical
//! viewport of the scene onto a caller-owned surface through a pixel scale
//! and an [`OutputTransform`], and keeps its own damage: nodes carry one
//! state entry per target they are visible on, so rendering one target never
//! consumes damage another target still needs.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Affine;

use crate::geometry::{Color, IRect, OutputTransform, PixelSize};
use crate::object::ObjectId;
use crate::paint::{DeviceMap, SurfaceId};
use crate::region::Region;

/// A handle to a target, scoped to the scene that created it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId {
    pub(crate) scene: u32,
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl TargetId {
    /// Rebuilds a handle from its raw parts (for decoding recorded traces).
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(scene: u32, index: u32, generation: u32) -> Self {
        Self {
            scene,
            idx: index,
            generation,
        }
    }

    /// Identifier of the owning scene.
    #[inline]
    #[must_use]
    pub const fn scene(self) -> u32 {
        self.scene
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TargetId(s{}:{}@gen{})",
            self.scene, self.idx, self.generation
        )
    }
}

/// Parameters for [`Scene::create_target`](crate::scene::Scene::create_target).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetDesc {
    /// Caller-owned surface the target renders into.
    pub surface: SurfaceId,
    /// Area of the scene shown by the target, in logical units.
    pub viewport: IRect,
    /// Rotation/flip applied after scaling.
    pub transform: OutputTransform,
    /// Device pixels per logical unit.
    pub scale: f64,
    /// Color painted where no node covers damage.
    pub clear_color: Color,
}

impl TargetDesc {
    /// A target at scale 1 with no transform and a black clear color.
    #[must_use]
    pub const fn new(surface: SurfaceId, viewport: IRect) -> Self {
        Self {
            surface,
            viewport,
            transform: OutputTransform::Normal,
            scale: 1.0,
            clear_color: Color::BLACK,
        }
    }

    /// Sets the pixel scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the output transform.
    #[must_use]
    pub const fn with_transform(mut self, transform: OutputTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the clear color.
    #[must_use]
    pub const fn with_clear_color(mut self, clear_color: Color) -> Self {
        self.clear_color = clear_color;
        self
    }
}

/// Non-finite or non-positive scales render as scale 1.
pub(crate) fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// One render destination of a scene.
///
/// Obtained read-only through [`Scene::target`](crate::scene::Scene::target);
/// mutated through the scene's `set_*` methods.
#[derive(Debug)]
pub struct Target {
    pub(crate) id: TargetId,
    pub(crate) surface: SurfaceId,
    pub(crate) viewport: IRect,
    pub(crate) transform: OutputTransform,
    pub(crate) scale: f64,
    pub(crate) clear_color: Color,
    pub(crate) dirty: bool,
    pub(crate) matrix: Affine,
    /// Scale the registered nodes were last damaged at.
    pub(crate) applied_scale: f64,
    /// Node slots with a state entry for this target.
    pub(crate) nodes: Vec<u32>,
    /// Pending scene-space damage not attributable to a registered node.
    pub(crate) damage: Region,
    pub(crate) object: ObjectId,
    /// Position in the scene's target list.
    pub(crate) list_index: u32,
}

impl Target {
    pub(crate) fn new(id: TargetId, desc: &TargetDesc, object: ObjectId, list_index: u32) -> Self {
        let scale = sanitize_scale(desc.scale);
        Self {
            id,
            surface: desc.surface,
            viewport: desc.viewport,
            transform: desc.transform,
            scale,
            clear_color: desc.clear_color,
            dirty: true,
            matrix: Affine::IDENTITY,
            applied_scale: scale,
            nodes: Vec::new(),
            damage: Region::new(),
            object,
            list_index,
        }
    }

    /// This target's handle.
    #[must_use]
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// The surface rendered into.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The logical viewport.
    #[must_use]
    pub fn viewport(&self) -> IRect {
        self.viewport
    }

    /// The output transform.
    #[must_use]
    pub fn transform(&self) -> OutputTransform {
        self.transform
    }

    /// Device pixels per logical unit.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The clear color.
    #[must_use]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Returns `true` if a property changed since the last render.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Scene → device matrix computed by the last render.
    #[must_use]
    pub fn matrix(&self) -> Affine {
        self.matrix
    }

    /// Size of the surface area covered by the viewport, after the transform.
    #[must_use]
    pub fn device_size(&self) -> PixelSize {
        let size = self.scaled_size();
        if self.transform.swaps_axes() {
            size.transposed()
        } else {
            size
        }
    }

    /// Number of nodes currently registered on this target.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Damage queued by removed nodes, viewport changes or
    /// [`Scene::damage_target`](crate::scene::Scene::damage_target).
    #[must_use]
    pub fn pending_damage(&self) -> &Region {
        &self.damage
    }

    fn scaled_size(&self) -> PixelSize {
        PixelSize::from_logical(self.viewport, self.scale)
    }

    /// Recomputes the matrix. Returns `true` if the scale differs from the
    /// one nodes were last damaged at.
    pub(crate) fn update_matrix(&mut self) -> bool {
        let size = self.scaled_size();
        let rotate = self
            .transform
            .to_affine(f64::from(size.width), f64::from(size.height));
        self.matrix = rotate
            * Affine::scale(self.scale)
            * Affine::translate((-f64::from(self.viewport.x0), -f64::from(self.viewport.y0)));
        let scale_changed = self.applied_scale != self.scale;
        self.applied_scale = self.scale;
        scale_changed
    }

    pub(crate) fn device_map(&self) -> DeviceMap {
        DeviceMap {
            origin: (self.viewport.x0, self.viewport.y0),
            scale: self.scale,
            transform: self.transform,
            size: self.scaled_size(),
        }
    }
}
