// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint collaborator interface and the core-provided canvas.
//!
//! A backend implements [`Painter`]: surface allocation plus two device-space
//! primitives (`fill_rect`, `blit`). Everything above that (clipping to
//! regions, translation, logical → device mapping, call counting) lives in
//! [`Canvas`], so every backend sees the same primitive stream for the same
//! scene.
//!
//! Node content implements [`NodeContent`] and paints through a
//! [`PaintContext`] in node-local logical coordinates.

use alloc::vec::Vec;
use core::fmt;

use crate::error::SurfaceError;
use crate::geometry::{Blend, Color, IRect, OutputTransform, PixelSize};
use crate::region::Region;
use crate::target::TargetId;

/// An opaque reference to a backend surface.
///
/// Target surfaces are created and owned by the caller; cache surfaces are
/// allocated and released by the scene through [`Painter`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

impl fmt::Debug for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceId({})", self.0)
    }
}

/// The 2D drawing and surface backend.
///
/// All rectangles are in device pixels of the surface being drawn to.
pub trait Painter {
    /// Allocates an offscreen surface with undefined contents.
    fn allocate_surface(&mut self, size: PixelSize) -> Result<SurfaceId, SurfaceError>;

    /// Returns a surface obtained from [`allocate_surface`](Self::allocate_surface).
    fn release_surface(&mut self, surface: SurfaceId);

    /// Fills `rect` of `surface` with `color`.
    fn fill_rect(&mut self, surface: SurfaceId, rect: IRect, color: Color, blend: Blend);

    /// Copies `src_rect` of `src` into `dst_rect` of `dst`.
    ///
    /// The source pixels are rotated/flipped by `transform` within their own
    /// bounds, then scaled to cover `dst_rect`.
    fn blit(
        &mut self,
        dst: SurfaceId,
        dst_rect: IRect,
        src: SurfaceId,
        src_rect: IRect,
        transform: OutputTransform,
        blend: Blend,
    );
}

/// Logical → device mapping of a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct DeviceMap {
    /// Logical point that lands on device pixel (0, 0) before the transform.
    pub(crate) origin: (i32, i32),
    pub(crate) scale: f64,
    pub(crate) transform: OutputTransform,
    /// Untransformed device size.
    pub(crate) size: PixelSize,
}

impl DeviceMap {
    /// Maps a logical rectangle to device pixels, clipped to the surface.
    pub(crate) fn to_device(&self, rect: IRect) -> IRect {
        let bounds = IRect::from_size(
            i32::try_from(self.size.width).unwrap_or(i32::MAX),
            i32::try_from(self.size.height).unwrap_or(i32::MAX),
        );
        let scaled = rect
            .translate(-self.origin.0, -self.origin.1)
            .scale_round(self.scale)
            .intersect(bounds);
        self.transform.map_rect(scaled, self.size)
    }

    /// Maps a logical region to device pixels.
    pub(crate) fn region_to_device(&self, region: &Region) -> Region {
        region.iter().map(|r| self.to_device(r)).collect()
    }
}

#[derive(Clone, Debug)]
struct CanvasState {
    offset: (i32, i32),
    clip: Region,
    blend: Blend,
}

/// A clipped, translatable drawing context bound to one surface.
///
/// Coordinates passed to drawing methods are logical and relative to the
/// current translation. The clip is always intersected, never widened, so a
/// content hook can only paint inside the area the compositor handed it.
pub struct Canvas<'a> {
    painter: &'a mut dyn Painter,
    surface: SurfaceId,
    map: DeviceMap,
    offset: (i32, i32),
    /// Clip in untranslated logical coordinates.
    clip: Region,
    blend: Blend,
    stack: Vec<CanvasState>,
    calls: usize,
}

impl fmt::Debug for Canvas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("surface", &self.surface)
            .field("offset", &self.offset)
            .field("clip", &self.clip.bounds())
            .field("blend", &self.blend)
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(
        painter: &'a mut dyn Painter,
        surface: SurfaceId,
        map: DeviceMap,
        clip: Region,
    ) -> Self {
        Self {
            painter,
            surface,
            map,
            offset: (0, 0),
            clip,
            blend: Blend::SrcOver,
            stack: Vec::new(),
            calls: 0,
        }
    }

    /// Pushes the translation, clip, and blend mode.
    pub fn save(&mut self) {
        self.stack.push(CanvasState {
            offset: self.offset,
            clip: self.clip.clone(),
            blend: self.blend,
        });
    }

    /// Pops the state pushed by the matching [`save`](Self::save).
    ///
    /// Unbalanced restores are ignored.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.offset = state.offset;
            self.clip = state.clip;
            self.blend = state.blend;
        }
    }

    /// Moves the coordinate origin.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.offset.0 += dx;
        self.offset.1 += dy;
    }

    /// Narrows the clip to `rect`.
    pub fn clip_rect(&mut self, rect: IRect) {
        self.clip.clip_to(rect.translate(self.offset.0, self.offset.1));
    }

    /// Narrows the clip to `region`.
    pub fn clip_region(&mut self, region: &Region) {
        self.clip = self
            .clip
            .intersect(&region.translate(self.offset.0, self.offset.1));
    }

    /// The current clip in current coordinates.
    #[must_use]
    pub fn clip(&self) -> Region {
        self.clip.translate(-self.offset.0, -self.offset.1)
    }

    /// The current blend mode.
    #[must_use]
    pub fn blend(&self) -> Blend {
        self.blend
    }

    pub(crate) fn set_blend(&mut self, blend: Blend) {
        self.blend = blend;
    }

    /// Logical → device scale factor.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.map.scale
    }

    /// Number of primitives issued to the painter so far.
    #[must_use]
    pub fn paint_calls(&self) -> usize {
        self.calls
    }

    /// Fills `region` with `color`.
    pub fn fill(&mut self, region: &Region, color: Color) {
        if self.blend == Blend::SrcOver && color.a == 0 {
            return;
        }
        let visible = region
            .translate(self.offset.0, self.offset.1)
            .intersect(&self.clip);
        for rect in visible.iter() {
            let device = self.map.to_device(rect);
            if device.is_empty() {
                continue;
            }
            self.painter
                .fill_rect(self.surface, device, color, self.blend);
            self.calls += 1;
        }
    }

    /// Fills `rect` with `color`.
    pub fn fill_rect(&mut self, rect: IRect, color: Color) {
        self.fill(&Region::from_rect(rect), color);
    }

    /// Draws `surface`, which holds the pixels of logical rectangle `dst`
    /// rendered at this canvas's scale.
    pub fn draw_surface(&mut self, surface: SurfaceId, dst: IRect) {
        let dst = dst.translate(self.offset.0, self.offset.1);
        let visible = self.clip.intersect_rect(dst);
        for rect in visible.iter() {
            let device = self.map.to_device(rect);
            let src = rect.translate(-dst.x0, -dst.y0).scale_round(self.map.scale);
            if device.is_empty() || src.is_empty() {
                continue;
            }
            self.painter.blit(
                self.surface,
                device,
                surface,
                src,
                self.map.transform,
                self.blend,
            );
            self.calls += 1;
        }
    }
}

/// What a content hook is asked to paint.
pub struct PaintContext<'c, 'a> {
    canvas: &'c mut Canvas<'a>,
    bounds: IRect,
    damage: &'c Region,
    opaque: &'c Region,
    surface_changed: bool,
    target: TargetId,
}

impl fmt::Debug for PaintContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintContext")
            .field("bounds", &self.bounds)
            .field("damage", &self.damage.bounds())
            .field("surface_changed", &self.surface_changed)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<'c, 'a> PaintContext<'c, 'a> {
    pub(crate) fn new(
        canvas: &'c mut Canvas<'a>,
        bounds: IRect,
        damage: &'c Region,
        opaque: &'c Region,
        surface_changed: bool,
        target: TargetId,
    ) -> Self {
        Self {
            canvas,
            bounds,
            damage,
            opaque,
            surface_changed,
            target,
        }
    }

    /// The canvas, translated to the node's origin and clipped to
    /// [`damage`](Self::damage).
    pub fn canvas(&mut self) -> &mut Canvas<'a> {
        self.canvas
    }

    /// The node's local bounds (`0, 0, width, height`).
    #[must_use]
    pub fn bounds(&self) -> IRect {
        self.bounds
    }

    /// Node-local area that must be painted.
    #[must_use]
    pub fn damage(&self) -> &Region {
        self.damage
    }

    /// Node-local opaque area for the target being rendered.
    #[must_use]
    pub fn opaque_region(&self) -> &Region {
        self.opaque
    }

    /// `true` if the cache surface was just (re)allocated, so nothing outside
    /// [`damage`](Self::damage) holds valid pixels either.
    #[must_use]
    pub fn surface_changed(&self) -> bool {
        self.surface_changed
    }

    /// The target being rendered.
    #[must_use]
    pub fn target(&self) -> TargetId {
        self.target
    }
}

/// Paintable node content.
pub trait NodeContent {
    /// Paints the node in node-local coordinates.
    fn paint(&mut self, cx: &mut PaintContext<'_, '_>);
}

/// Content that fills the whole node with one color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolidColor {
    /// Fill color.
    pub color: Color,
}

impl SolidColor {
    /// Creates a solid fill.
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self { color }
    }
}

impl NodeContent for SolidColor {
    fn paint(&mut self, cx: &mut PaintContext<'_, '_>) {
        let bounds = cx.bounds();
        cx.canvas().fill_rect(bounds, self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{Call, RecordingPainter};

    fn map(scale: f64, transform: OutputTransform) -> DeviceMap {
        DeviceMap {
            origin: (0, 0),
            scale,
            transform,
            size: PixelSize::new(200, 100),
        }
    }

    #[test]
    fn fills_are_clipped_and_translated() {
        let mut painter = RecordingPainter::default();
        let mut canvas = Canvas::new(
            &mut painter,
            SurfaceId(1),
            map(1.0, OutputTransform::Normal),
            Region::from_rect(IRect::new(0, 0, 50, 50)),
        );
        canvas.translate(40, 40);
        canvas.fill_rect(IRect::from_size(20, 20), Color::WHITE);
        assert_eq!(canvas.paint_calls(), 1);
        assert_eq!(
            painter.calls,
            [Call::Fill {
                surface: SurfaceId(1),
                rect: IRect::new(40, 40, 50, 50),
                color: Color::WHITE,
                blend: Blend::SrcOver,
            }]
        );
    }

    #[test]
    fn save_restore_scopes_clip() {
        let mut painter = RecordingPainter::default();
        let mut canvas = Canvas::new(
            &mut painter,
            SurfaceId(1),
            map(1.0, OutputTransform::Normal),
            Region::from_rect(IRect::new(0, 0, 100, 100)),
        );
        canvas.save();
        canvas.translate(10, 10);
        canvas.clip_rect(IRect::from_size(5, 5));
        assert_eq!(canvas.clip(), Region::from_rect(IRect::from_size(5, 5)));
        canvas.restore();
        canvas.restore();
        assert_eq!(canvas.clip(), Region::from_rect(IRect::new(0, 0, 100, 100)));
        canvas.fill_rect(IRect::new(90, 90, 120, 120), Color::BLACK);
        assert_eq!(canvas.paint_calls(), 1);
    }

    #[test]
    fn transparent_src_over_is_skipped() {
        let mut painter = RecordingPainter::default();
        let mut canvas = Canvas::new(
            &mut painter,
            SurfaceId(1),
            map(1.0, OutputTransform::Normal),
            Region::from_rect(IRect::new(0, 0, 100, 100)),
        );
        canvas.fill_rect(IRect::new(0, 0, 10, 10), Color::TRANSPARENT);
        assert_eq!(canvas.paint_calls(), 0);
        canvas.set_blend(Blend::Replace);
        canvas.fill_rect(IRect::new(0, 0, 10, 10), Color::TRANSPARENT);
        assert_eq!(canvas.paint_calls(), 1);
    }

    #[test]
    fn device_map_scales_and_rotates() {
        let m = map(2.0, OutputTransform::Rotate90);
        // Logical (0,0)-(10,5) → device (0,0)-(20,10) in a 200×100 buffer,
        // rotated clockwise into a 100×200 buffer.
        assert_eq!(m.to_device(IRect::new(0, 0, 10, 5)), IRect::new(90, 0, 100, 20));
    }

    #[test]
    fn draw_surface_maps_source_rect() {
        let mut painter = RecordingPainter::default();
        let mut canvas = Canvas::new(
            &mut painter,
            SurfaceId(1),
            map(2.0, OutputTransform::Normal),
            Region::from_rect(IRect::new(0, 0, 30, 30)),
        );
        canvas.draw_surface(SurfaceId(9), IRect::new(20, 20, 40, 40));
        assert_eq!(
            painter.calls,
            [Call::Blit {
                dst: SurfaceId(1),
                dst_rect: IRect::new(40, 40, 60, 60),
                src: SurfaceId(9),
                src_rect: IRect::new(0, 0, 20, 20),
                transform: OutputTransform::Normal,
                blend: Blend::SrcOver,
            }]
        );
    }
}
