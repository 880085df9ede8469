// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Premultiplied ARGB pixel buffers.

use alloc::vec;
use alloc::vec::Vec;

use lamina_core::geometry::{Blend, Color, IRect, OutputTransform, PixelSize};

/// A row-major buffer of premultiplied `0xAARRGGBB` pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    size: PixelSize,
    data: Vec<u32>,
}

impl core::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pixmap")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Packs a color into `0xAARRGGBB`.
#[inline]
#[must_use]
pub(crate) fn pack(c: Color) -> u32 {
    u32::from_be_bytes([c.a, c.r, c.g, c.b])
}

/// Unpacks `0xAARRGGBB`.
#[inline]
#[must_use]
pub(crate) fn unpack(v: u32) -> Color {
    let [a, r, g, b] = v.to_be_bytes();
    Color::premultiplied(r, g, b, a)
}

impl Pixmap {
    /// Creates a fully transparent pixmap.
    #[must_use]
    pub fn new(size: PixelSize) -> Self {
        let len = size.width as usize * size.height as usize;
        Self {
            size,
            data: vec![0; len],
        }
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Raw pixels, row-major.
    #[must_use]
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// The pixel at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(unpack(self.data[self.offset(x, y)]))
    }

    /// Overwrites every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        self.data.fill(pack(color));
    }

    fn bounds(&self) -> IRect {
        IRect::from_size(
            i32::try_from(self.size.width).unwrap_or(i32::MAX),
            i32::try_from(self.size.height).unwrap_or(i32::MAX),
        )
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    /// Writes one pixel. `x` and `y` must be inside the buffer.
    fn put(&mut self, x: u32, y: u32, color: Color, blend: Blend) {
        let i = self.offset(x, y);
        self.data[i] = match blend {
            Blend::Replace => pack(color),
            Blend::SrcOver => pack(color.over(unpack(self.data[i]))),
        };
    }

    /// Fills `rect`, clipped to the buffer.
    pub(crate) fn fill(&mut self, rect: IRect, color: Color, blend: Blend) {
        let r = rect.intersect(self.bounds());
        if r.is_empty() {
            return;
        }
        for y in r.y0.unsigned_abs()..r.y1.unsigned_abs() {
            for x in r.x0.unsigned_abs()..r.x1.unsigned_abs() {
                self.put(x, y, color, blend);
            }
        }
    }

    /// Draws `src_rect` of `src`, transformed by `transform` and scaled to
    /// cover `dst_rect`. Samples nearest-neighbour at pixel centers.
    pub(crate) fn blit(
        &mut self,
        dst_rect: IRect,
        src: &Self,
        src_rect: IRect,
        transform: OutputTransform,
        blend: Blend,
    ) {
        let src_rect = src_rect.intersect(src.bounds());
        let clipped = dst_rect.intersect(self.bounds());
        if src_rect.is_empty() || clipped.is_empty() {
            return;
        }
        let (sw, sh) = (src_rect.width(), src_rect.height());
        let (tw, th) = if transform.swaps_axes() {
            (f64::from(sh), f64::from(sw))
        } else {
            (f64::from(sw), f64::from(sh))
        };
        let inverse = transform.inverse();
        let (dw, dh) = (f64::from(dst_rect.width()), f64::from(dst_rect.height()));

        for y in clipped.y0..clipped.y1 {
            let v = (f64::from(y - dst_rect.y0) + 0.5) * th / dh;
            for x in clipped.x0..clipped.x1 {
                let u = (f64::from(x - dst_rect.x0) + 0.5) * tw / dw;
                let (sx, sy) = inverse.map_point(u, v, tw, th);
                // Sample coordinates are non-negative, so truncation floors.
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "sample coordinates lie within the source rectangle"
                )]
                let (sx, sy) = (
                    (sx as i32).clamp(0, sw - 1) + src_rect.x0,
                    (sy as i32).clamp(0, sh - 1) + src_rect.y0,
                );
                let color = unpack(src.data[src.offset(sx.unsigned_abs(), sy.unsigned_abs())]);
                self.put(x.unsigned_abs(), y.unsigned_abs(), color, blend);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::opaque(255, 0, 0);
    const BLUE: Color = Color::opaque(0, 0, 255);

    #[test]
    fn pack_round_trips_channels() {
        let c = Color::premultiplied(10, 20, 30, 40);
        assert_eq!(pack(c), 0x280A_141E);
        assert_eq!(unpack(pack(c)), c);
    }

    #[test]
    fn fill_is_clipped_to_the_buffer() {
        let mut p = Pixmap::new(PixelSize::new(4, 4));
        p.fill(IRect::new(-2, -2, 2, 2), RED, Blend::Replace);
        assert_eq!(p.pixel(0, 0), Some(RED));
        assert_eq!(p.pixel(1, 1), Some(RED));
        assert_eq!(p.pixel(2, 2), Some(Color::TRANSPARENT));
        assert_eq!(p.pixel(4, 0), None);
    }

    #[test]
    fn src_over_blends_premultiplied() {
        let mut p = Pixmap::new(PixelSize::new(1, 1));
        p.clear(Color::BLACK);
        let half_white = Color::premultiplied(128, 128, 128, 128);
        p.fill(IRect::from_size(1, 1), half_white, Blend::SrcOver);
        assert_eq!(p.pixel(0, 0), Some(half_white.over(Color::BLACK)));

        p.fill(IRect::from_size(1, 1), Color::TRANSPARENT, Blend::Replace);
        assert_eq!(p.pixel(0, 0), Some(Color::TRANSPARENT));
    }

    #[test]
    fn blit_scales_nearest_neighbour() {
        let mut src = Pixmap::new(PixelSize::new(2, 1));
        src.fill(IRect::new(0, 0, 1, 1), RED, Blend::Replace);
        src.fill(IRect::new(1, 0, 2, 1), BLUE, Blend::Replace);

        let mut dst = Pixmap::new(PixelSize::new(4, 2));
        dst.blit(
            IRect::from_size(4, 2),
            &src,
            IRect::from_size(2, 1),
            OutputTransform::Normal,
            Blend::Replace,
        );
        assert_eq!(dst.pixel(0, 0), Some(RED));
        assert_eq!(dst.pixel(1, 1), Some(RED));
        assert_eq!(dst.pixel(2, 0), Some(BLUE));
        assert_eq!(dst.pixel(3, 1), Some(BLUE));
    }

    #[test]
    fn blit_rotates_the_source() {
        // Red on top of blue, 1×2.
        let mut src = Pixmap::new(PixelSize::new(1, 2));
        src.fill(IRect::new(0, 0, 1, 1), RED, Blend::Replace);
        src.fill(IRect::new(0, 1, 1, 2), BLUE, Blend::Replace);

        // A clockwise quarter turn puts the top row on the right.
        let mut dst = Pixmap::new(PixelSize::new(2, 1));
        dst.blit(
            IRect::from_size(2, 1),
            &src,
            IRect::from_size(1, 2),
            OutputTransform::Rotate90,
            Blend::Replace,
        );
        assert_eq!(dst.pixel(0, 0), Some(BLUE));
        assert_eq!(dst.pixel(1, 0), Some(RED));
    }

    #[test]
    fn blit_reads_only_the_source_rect() {
        let mut src = Pixmap::new(PixelSize::new(4, 4));
        src.fill(IRect::from_size(4, 4), RED, Blend::Replace);
        src.fill(IRect::new(2, 2, 4, 4), BLUE, Blend::Replace);

        let mut dst = Pixmap::new(PixelSize::new(2, 2));
        dst.blit(
            IRect::from_size(2, 2),
            &src,
            IRect::new(2, 2, 4, 4),
            OutputTransform::Normal,
            Blend::SrcOver,
        );
        assert!(dst.data().iter().all(|&p| unpack(p) == BLUE));
    }
}
