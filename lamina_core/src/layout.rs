// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout collaborator interface.
//!
//! The scene does not compute layout itself. A node may carry a
//! [`LayoutDelegate`] (typically backed by a flexbox engine) which the scene
//! queries top-down at the start of every render, before geometry is
//! resolved. A delegate is asked for new geometry when it reports itself
//! dirty, when [`Scene::invalidate_layout`](crate::scene::Scene::invalidate_layout)
//! was called for its node, or when its parent's size changed.

use kurbo::{Rect, Size};

/// Constraints handed to a [`LayoutDelegate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConstraints {
    /// Space available inside the parent, in logical units.
    pub available: Size,
}

impl LayoutConstraints {
    /// Constraints with the given available size.
    #[must_use]
    pub const fn new(available: Size) -> Self {
        Self { available }
    }
}

/// Computes a node's geometry on behalf of the scene.
pub trait LayoutDelegate {
    /// Returns `true` if the delegate's inputs changed since the last
    /// [`compute_layout`](Self::compute_layout) call.
    fn is_dirty(&self) -> bool;

    /// Computes the node's rectangle relative to its parent's origin.
    ///
    /// Fractional results are rounded outward to whole logical units.
    fn compute_layout(&mut self, constraints: LayoutConstraints) -> Rect;
}

/// A delegate that fills its parent, optionally inset by a margin.
///
/// Useful for backgrounds and sub-scenes that track their container's size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FillParent {
    /// Margin removed from every edge.
    pub inset: f64,
}

impl LayoutDelegate for FillParent {
    fn is_dirty(&self) -> bool {
        false
    }

    fn compute_layout(&mut self, constraints: LayoutConstraints) -> Rect {
        Rect::from_origin_size((0.0, 0.0), constraints.available).inset(-self.inset)
    }
}
