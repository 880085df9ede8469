// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel geometry, colors, blend modes, and output transforms.
//!
//! Scene geometry is integral: node rectangles, damage, and clips are all
//! expressed as [`IRect`]s in logical units. Conversion to device pixels
//! (scale, rotation, flip) happens only at the edge, in
//! [`Canvas`](crate::paint::Canvas). [`kurbo`] types are accepted and produced
//! at the API boundary where floating-point geometry is natural (layout
//! results, target matrices).

use core::fmt;

use kurbo::{Affine, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// An axis-aligned integer rectangle with exclusive max edges.
///
/// A rectangle whose `x1 <= x0` or `y1 <= y0` is empty. Empty rectangles are
/// never an error; they simply cover no pixels.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IRect {
    /// Left edge (inclusive).
    pub x0: i32,
    /// Top edge (inclusive).
    pub y0: i32,
    /// Right edge (exclusive).
    pub x1: i32,
    /// Bottom edge (exclusive).
    pub y1: i32,
}

impl IRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its edges.
    #[inline]
    #[must_use]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Creates a rectangle from an origin and a size.
    ///
    /// Negative sizes produce an empty rectangle.
    #[inline]
    #[must_use]
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Creates a rectangle at the origin with the given size.
    #[inline]
    #[must_use]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::from_origin_size(0, 0, width, height)
    }

    /// Width, or zero for empty rectangles.
    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        if self.x1 > self.x0 {
            self.x1 - self.x0
        } else {
            0
        }
    }

    /// Height, or zero for empty rectangles.
    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        if self.y1 > self.y0 {
            self.y1 - self.y0
        } else {
            0
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Intersection of two rectangles (possibly empty).
    #[inline]
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let r = Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        if r.is_empty() { Self::ZERO } else { r }
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    #[must_use]
    pub fn union_bounds(self, other: Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Self::ZERO,
            (true, false) => other,
            (false, true) => self,
            (false, false) => Self::new(
                self.x0.min(other.x0),
                self.y0.min(other.y0),
                self.x1.max(other.x1),
                self.y1.max(other.y1),
            ),
        }
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    #[inline]
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Returns `true` if the pixel at `(x, y)` is covered.
    #[inline]
    #[must_use]
    pub const fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Returns `true` if `other` lies entirely within `self`.
    ///
    /// Empty rectangles are contained in everything.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.is_empty()
            || (other.x0 >= self.x0
                && other.y0 >= self.y0
                && other.x1 <= self.x1
                && other.y1 <= self.y1)
    }

    /// Offsets the rectangle.
    #[inline]
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }

    /// Returns the same size placed at the origin.
    #[inline]
    #[must_use]
    pub const fn local(self) -> Self {
        Self::from_size(self.width(), self.height())
    }

    /// Scales every edge by `scale`, rounding each edge to the nearest integer.
    ///
    /// Rounding edges (rather than flooring the origin and ceiling the far
    /// edge) keeps adjacent rectangles adjacent after scaling, so a tiled
    /// region never double-covers a pixel.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "scaled coordinates stay within the i32 pixel space"
    )]
    pub fn scale_round(self, scale: f64) -> Self {
        if scale == 1.0 {
            return self;
        }
        let s = |v: i32| (f64::from(v) * scale).round() as i32;
        Self::new(s(self.x0), s(self.y0), s(self.x1), s(self.y1))
    }

    /// Converts to a floating-point [`kurbo::Rect`].
    #[inline]
    #[must_use]
    pub fn to_kurbo(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }

    /// Converts a [`kurbo::Rect`] to the smallest integer rectangle containing it.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "layout results are bounded by the i32 pixel space"
    )]
    pub fn from_kurbo_outer(rect: Rect) -> Self {
        let r = rect.abs();
        Self::new(
            r.x0.floor() as i32,
            r.y0.floor() as i32,
            r.x1.ceil() as i32,
            r.y1.ceil() as i32,
        )
    }
}

impl fmt::Debug for IRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IRect([{}, {}) x [{}, {}))", self.x0, self.x1, self.y0, self.y1)
    }
}

/// A size in device pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Creates a pixel size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Device size of a logical rectangle at `scale`, using the same rounding
    /// as [`IRect::scale_round`].
    #[must_use]
    pub fn from_logical(rect: IRect, scale: f64) -> Self {
        let r = rect.local().scale_round(scale);
        Self::new(r.width().unsigned_abs(), r.height().unsigned_abs())
    }

    /// Swaps width and height.
    #[inline]
    #[must_use]
    pub const fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }
}

/// A premultiplied RGBA8 color.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red, premultiplied by alpha.
    pub r: u8,
    /// Green, premultiplied by alpha.
    pub g: u8,
    /// Blue, premultiplied by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::premultiplied(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    /// Creates an opaque color.
    #[inline]
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color from already-premultiplied components.
    #[inline]
    #[must_use]
    pub const fn premultiplied(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from straight (non-premultiplied) components.
    #[must_use]
    pub const fn from_straight(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: mul_div_255(r, a),
            g: mul_div_255(g, a),
            b: mul_div_255(b, a),
            a,
        }
    }

    /// Returns `true` if alpha is 255.
    #[inline]
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Composites `self` over `dst` (Porter-Duff source-over).
    #[must_use]
    pub const fn over(self, dst: Self) -> Self {
        let inv = 255 - self.a;
        Self {
            r: self.r.saturating_add(mul_div_255(dst.r, inv)),
            g: self.g.saturating_add(mul_div_255(dst.g, inv)),
            b: self.b.saturating_add(mul_div_255(dst.b, inv)),
            a: self.a.saturating_add(mul_div_255(dst.a, inv)),
        }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Color(#{:02x}{:02x}{:02x}{:02x})",
            self.r, self.g, self.b, self.a
        )
    }
}

/// `round(v * a / 255)` in integer arithmetic.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the product divided by 255 always fits in u8"
)]
const fn mul_div_255(v: u8, a: u8) -> u8 {
    let t = v as u32 * a as u32 + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// How a source is combined with the destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blend {
    /// Destination pixels are overwritten (used for known-opaque areas).
    Replace,
    /// Porter-Duff source-over alpha compositing.
    #[default]
    SrcOver,
}

/// Rotation and flip applied when mapping logical space onto an output.
///
/// Rotations are clockwise. The `Flipped*` variants mirror horizontally
/// first, then rotate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputTransform {
    /// No transform.
    #[default]
    Normal,
    /// Rotated 90° clockwise.
    Rotate90,
    /// Rotated 180°.
    Rotate180,
    /// Rotated 270° clockwise.
    Rotate270,
    /// Mirrored horizontally.
    Flipped,
    /// Mirrored, then rotated 90°.
    Flipped90,
    /// Mirrored, then rotated 180°.
    Flipped180,
    /// Mirrored, then rotated 270°.
    Flipped270,
}

impl OutputTransform {
    /// Returns `true` if the transform exchanges the x and y axes.
    #[inline]
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Rotate90 | Self::Rotate270 | Self::Flipped90 | Self::Flipped270
        )
    }

    /// The transform that undoes `self`.
    #[inline]
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => other,
        }
    }

    /// Maps a point in an untransformed `width × height` space into the
    /// transformed space.
    #[must_use]
    pub fn map_point(self, x: f64, y: f64, width: f64, height: f64) -> (f64, f64) {
        let (w, h) = (width, height);
        match self {
            Self::Normal => (x, y),
            Self::Rotate90 => (h - y, x),
            Self::Rotate180 => (w - x, h - y),
            Self::Rotate270 => (y, w - x),
            Self::Flipped => (w - x, y),
            Self::Flipped90 => (h - y, w - x),
            Self::Flipped180 => (x, h - y),
            Self::Flipped270 => (y, x),
        }
    }

    /// Maps a rectangle in an untransformed `size` space into the transformed
    /// space. The mapping is exact for integer rectangles.
    #[must_use]
    pub fn map_rect(self, rect: IRect, size: PixelSize) -> IRect {
        if self == Self::Normal || rect.is_empty() {
            return rect;
        }
        let (w, h) = (
            i64::from(size.width).min(i64::from(i32::MAX)),
            i64::from(size.height).min(i64::from(i32::MAX)),
        );
        let map = |x: i32, y: i32| -> (i64, i64) {
            let (x, y) = (i64::from(x), i64::from(y));
            match self {
                Self::Normal => (x, y),
                Self::Rotate90 => (h - y, x),
                Self::Rotate180 => (w - x, h - y),
                Self::Rotate270 => (y, w - x),
                Self::Flipped => (w - x, y),
                Self::Flipped90 => (h - y, w - x),
                Self::Flipped180 => (x, h - y),
                Self::Flipped270 => (y, x),
            }
        };
        let (ax, ay) = map(rect.x0, rect.y0);
        let (bx, by) = map(rect.x1, rect.y1);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "mapped coordinates stay within the surface bounds"
        )]
        IRect::new(
            ax.min(bx) as i32,
            ay.min(by) as i32,
            ax.max(bx) as i32,
            ay.max(by) as i32,
        )
    }

    /// The affine matrix equivalent to [`map_point`](Self::map_point) for an
    /// untransformed `width × height` space.
    #[must_use]
    pub fn to_affine(self, width: f64, height: f64) -> Affine {
        let (w, h) = (width, height);
        let coeffs = match self {
            Self::Normal => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            Self::Rotate90 => [0.0, 1.0, -1.0, 0.0, h, 0.0],
            Self::Rotate180 => [-1.0, 0.0, 0.0, -1.0, w, h],
            Self::Rotate270 => [0.0, -1.0, 1.0, 0.0, 0.0, w],
            Self::Flipped => [-1.0, 0.0, 0.0, 1.0, w, 0.0],
            Self::Flipped90 => [0.0, -1.0, -1.0, 0.0, h, w],
            Self::Flipped180 => [1.0, 0.0, 0.0, -1.0, 0.0, h],
            Self::Flipped270 => [0.0, 1.0, 1.0, 0.0, 0.0, 0.0],
        };
        Affine::new(coeffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn empty_rects_normalize() {
        assert!(IRect::new(10, 10, 5, 20).is_empty());
        assert_eq!(IRect::new(10, 10, 5, 20).width(), 0);
        assert_eq!(IRect::from_size(-4, 3).area(), 0);
        assert_eq!(
            IRect::new(0, 0, 10, 10).intersect(IRect::new(20, 20, 30, 30)),
            IRect::ZERO
        );
    }

    #[test]
    fn union_bounds_ignores_empty() {
        let a = IRect::new(0, 0, 10, 10);
        assert_eq!(a.union_bounds(IRect::ZERO), a);
        assert_eq!(
            a.union_bounds(IRect::new(20, 5, 30, 40)),
            IRect::new(0, 0, 30, 40)
        );
    }

    #[test]
    fn scale_round_keeps_tiles_adjacent() {
        let left = IRect::new(0, 0, 3, 3).scale_round(1.5);
        let right = IRect::new(3, 0, 6, 3).scale_round(1.5);
        assert_eq!(left.x1, right.x0);
    }

    #[test]
    fn kurbo_roundtrip_rounds_outward() {
        let r = IRect::from_kurbo_outer(Rect::new(0.5, 1.2, 9.1, 9.9));
        assert_eq!(r, IRect::new(0, 1, 10, 10));
        assert_eq!(IRect::new(1, 2, 3, 4).to_kurbo(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn src_over_blends_premultiplied() {
        let half_white = Color::from_straight(255, 255, 255, 128);
        let out = half_white.over(Color::BLACK);
        assert_eq!(out.a, 255);
        assert!((i32::from(out.r) - 128).abs() <= 1, "got {out:?}");
        assert_eq!(Color::WHITE.over(Color::BLACK), Color::WHITE);
        assert_eq!(Color::TRANSPARENT.over(Color::BLACK), Color::BLACK);
    }

    #[test]
    fn transform_rect_matches_affine() {
        let size = PixelSize::new(200, 100);
        let rect = IRect::new(10, 20, 40, 30);
        let all = [
            OutputTransform::Normal,
            OutputTransform::Rotate90,
            OutputTransform::Rotate180,
            OutputTransform::Rotate270,
            OutputTransform::Flipped,
            OutputTransform::Flipped90,
            OutputTransform::Flipped180,
            OutputTransform::Flipped270,
        ];
        for t in all {
            let mapped = t.map_rect(rect, size);
            let affine = t.to_affine(200.0, 100.0);
            let a = affine * Point::new(10.0, 20.0);
            let b = affine * Point::new(40.0, 30.0);
            let expected = IRect::from_kurbo_outer(Rect::from_points(a, b));
            assert_eq!(mapped, expected, "{t:?}");
        }
    }

    #[test]
    fn transform_inverse_roundtrips_points() {
        let (w, h) = (200.0, 100.0);
        for t in [
            OutputTransform::Rotate90,
            OutputTransform::Rotate270,
            OutputTransform::Flipped90,
            OutputTransform::Flipped270,
            OutputTransform::Flipped,
        ] {
            let (tw, th) = if t.swaps_axes() { (h, w) } else { (w, h) };
            let (x, y) = t.map_point(12.0, 34.0, w, h);
            let back = t.inverse().map_point(x, y, tw, th);
            assert_eq!(back, (12.0, 34.0), "{t:?}");
        }
    }
}
