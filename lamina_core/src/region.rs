// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact integer region algebra.
//!
//! A [`Region`] is a finite set of pixels represented as disjoint rectangles
//! in canonical *y-x banded* form:
//!
//! - rectangles are grouped into horizontal bands sharing `y0`/`y1`;
//! - bands are sorted top to bottom and never overlap;
//! - within a band, rectangles are sorted left to right and never touch;
//! - vertically adjacent bands with identical spans are merged.
//!
//! The canonical form is unique for a given pixel set, so `==` compares
//! coverage, and every operation is exact (no bounding-box approximation).

use alloc::vec::Vec;

use crate::geometry::IRect;

/// A set of pixels as canonical banded rectangles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    rects: Vec<IRect>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Union,
    Intersect,
    Subtract,
}

impl Op {
    #[inline]
    fn keep(self, in_a: bool, in_b: bool) -> bool {
        match self {
            Self::Union => in_a || in_b,
            Self::Intersect => in_a && in_b,
            Self::Subtract => in_a && !in_b,
        }
    }
}

impl Region {
    /// The empty region.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// A region covering a single rectangle (empty if `rect` is empty).
    #[must_use]
    pub fn from_rect(rect: IRect) -> Self {
        if rect.is_empty() {
            Self::new()
        } else {
            let mut rects = Vec::with_capacity(1);
            rects.push(rect);
            Self { rects }
        }
    }

    /// The union of an arbitrary collection of rectangles.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = IRect>) -> Self {
        let mut out = Self::new();
        for rect in rects {
            out.add_rect(rect);
        }
        out
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The canonical rectangles, top to bottom, left to right.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[IRect] {
        &self.rects
    }

    /// Iterates over the canonical rectangles.
    pub fn iter(&self) -> impl Iterator<Item = IRect> + '_ {
        self.rects.iter().copied()
    }

    /// Bounding box of the region ([`IRect::ZERO`] when empty).
    #[must_use]
    pub fn bounds(&self) -> IRect {
        let (Some(first), Some(last)) = (self.rects.first(), self.rects.last()) else {
            return IRect::ZERO;
        };
        let (x0, x1) = self
            .rects
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), r| (lo.min(r.x0), hi.max(r.x1)));
        IRect::new(x0, first.y0, x1, last.y1)
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Removes every rectangle.
    #[inline]
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Set union.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self {
            rects: combine(&self.rects, &other.rects, Op::Union),
        }
    }

    /// Set intersection.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() || !self.bounds().intersects(other.bounds()) {
            return Self::new();
        }
        Self {
            rects: combine(&self.rects, &other.rects, Op::Intersect),
        }
    }

    /// Set difference (`self` minus `other`).
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() || !self.bounds().intersects(other.bounds()) {
            return self.clone();
        }
        Self {
            rects: combine(&self.rects, &other.rects, Op::Subtract),
        }
    }

    /// Intersection with a single rectangle.
    #[must_use]
    pub fn intersect_rect(&self, rect: IRect) -> Self {
        if rect.contains(self.bounds()) {
            return self.clone();
        }
        self.intersect(&Self::from_rect(rect))
    }

    /// Adds `other` to this region in place.
    pub fn add(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        *self = self.union(other);
    }

    /// Adds a rectangle to this region in place.
    pub fn add_rect(&mut self, rect: IRect) {
        if rect.is_empty() {
            return;
        }
        if self.is_empty() {
            self.rects.push(rect);
            return;
        }
        *self = self.union(&Self::from_rect(rect));
    }

    /// Removes `other` from this region in place.
    pub fn remove(&mut self, other: &Self) {
        if other.is_empty() || self.is_empty() {
            return;
        }
        *self = self.subtract(other);
    }

    /// Clips this region to `rect` in place.
    pub fn clip_to(&mut self, rect: IRect) {
        if rect.contains(self.bounds()) {
            return;
        }
        *self = self.intersect_rect(rect);
    }

    /// Returns the region offset by `(dx, dy)`.
    #[must_use]
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        if dx == 0 && dy == 0 {
            return self.clone();
        }
        Self {
            rects: self.rects.iter().map(|r| r.translate(dx, dy)).collect(),
        }
    }

    /// Returns `true` if the pixel at `(x, y)` is in the region.
    #[must_use]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    /// Returns `true` if every pixel of `rect` is in the region.
    #[must_use]
    pub fn contains_rect(&self, rect: IRect) -> bool {
        rect.is_empty() || Self::from_rect(rect).subtract(self).is_empty()
    }

    /// Returns `true` if the region shares any pixel with `rect`.
    #[must_use]
    pub fn intersects_rect(&self, rect: IRect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }
}

impl From<IRect> for Region {
    fn from(rect: IRect) -> Self {
        Self::from_rect(rect)
    }
}

impl FromIterator<IRect> for Region {
    fn from_iter<I: IntoIterator<Item = IRect>>(iter: I) -> Self {
        Self::from_rects(iter)
    }
}

// ---------------------------------------------------------------------------
// Band sweep
// ---------------------------------------------------------------------------

/// Combines two canonical rectangle lists.
///
/// The plane is cut at every distinct `y` edge. Within each horizontal slice
/// both inputs reduce to sorted span lists, which are merged with `op`. A
/// slice whose spans equal the previous slice's (and touches it) extends that
/// band instead of starting a new one.
fn combine(a: &[IRect], b: &[IRect], op: Op) -> Vec<IRect> {
    let mut ys: Vec<i32> = Vec::with_capacity((a.len() + b.len()) * 2);
    for r in a.iter().chain(b) {
        ys.push(r.y0);
        ys.push(r.y1);
    }
    ys.sort_unstable();
    ys.dedup();

    let mut out: Vec<IRect> = Vec::new();
    let mut band_start = 0;
    let mut spans_a = Vec::new();
    let mut spans_b = Vec::new();
    let mut spans = Vec::new();

    for w in ys.windows(2) {
        let (y0, y1) = (w[0], w[1]);
        slice_spans(a, y0, y1, &mut spans_a);
        slice_spans(b, y0, y1, &mut spans_b);
        merge_spans(&spans_a, &spans_b, op, &mut spans);
        if spans.is_empty() {
            continue;
        }

        let prev = &out[band_start..];
        let extends = !prev.is_empty()
            && prev[0].y1 == y0
            && prev.len() == spans.len()
            && prev
                .iter()
                .zip(&spans)
                .all(|(r, &(x0, x1))| r.x0 == x0 && r.x1 == x1);
        if extends {
            for r in &mut out[band_start..] {
                r.y1 = y1;
            }
        } else {
            band_start = out.len();
            out.extend(spans.iter().map(|&(x0, x1)| IRect::new(x0, y0, x1, y1)));
        }
    }
    out
}

/// Collects the x-spans of `rects` that cover the slice `[y0, y1)`.
fn slice_spans(rects: &[IRect], y0: i32, y1: i32, out: &mut Vec<(i32, i32)>) {
    out.clear();
    for r in rects {
        if r.y0 >= y1 {
            break;
        }
        if r.y0 <= y0 && r.y1 >= y1 {
            out.push((r.x0, r.x1));
        }
    }
    out.sort_unstable();
}

/// Merges two sorted span lists, coalescing touching output spans.
fn merge_spans(a: &[(i32, i32)], b: &[(i32, i32)], op: Op, out: &mut Vec<(i32, i32)>) {
    out.clear();
    let mut xs: Vec<i32> = Vec::with_capacity((a.len() + b.len()) * 2);
    for &(x0, x1) in a.iter().chain(b) {
        xs.push(x0);
        xs.push(x1);
    }
    xs.sort_unstable();
    xs.dedup();

    for w in xs.windows(2) {
        let (x0, x1) = (w[0], w[1]);
        let in_a = a.iter().any(|&(s, e)| s <= x0 && x0 < e);
        let in_b = b.iter().any(|&(s, e)| s <= x0 && x0 < e);
        if !op.keep(in_a, in_b) {
            continue;
        }
        if let Some(last) = out.last_mut()
            && last.1 == x0
        {
            last.1 = x1;
        } else {
            out.push((x0, x1));
        }
    }
}
