// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity, capability and change bitsets, and node descriptors.
//!
//! A node's behavior is selected by its [`Capabilities`], fixed when the
//! [`Node`] descriptor is built and never mutated afterwards:
//!
//! | Constructor                      | Capabilities                       |
//! |----------------------------------|------------------------------------|
//! | [`Node::container`]              | `CONTAINER`                        |
//! | [`Node::renderable`]             | `RENDERS`                          |
//! | [`Node::bakeable`]               | `RENDERS \| BAKES`                 |
//! | [`Node::baked_container`]        | `RENDERS \| BAKES \| CONTAINER`    |
//! | [`Node::subscene`]               | `RENDERS \| BAKES \| SUBSCENE`     |
//!
//! [`Node::clipping_children`] adds `CLIPS_CHILDREN` to any of them.

use alloc::boxed::Box;
use core::fmt;

use crate::geometry::{Color, IRect};
use crate::layout::LayoutDelegate;
use crate::paint::{NodeContent, SolidColor};
use crate::region::Region;
use crate::scene::{Scene, SubScene};

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`Scene`].
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is removed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Rebuilds a handle from its raw parts (for decoding recorded traces).
    #[inline]
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
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

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

bitflags::bitflags! {
    /// What a node can do. Fixed at construction.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Paints its own content.
        const RENDERS        = 0b0000_0001;
        /// Caches its content in a per-target surface.
        const BAKES          = 0b0000_0010;
        /// Clips descendants to its own rectangle.
        const CLIPS_CHILDREN = 0b0000_0100;
        /// Groups children. Together with `BAKES`, children are baked into
        /// the node's cache instead of being composited individually.
        const CONTAINER      = 0b0000_1000;
        /// Renders a nested scene as its baked content.
        const SUBSCENE       = 0b0001_0000;
    }
}

bitflags::bitflags! {
    /// Pending changes of a node, recorded per target.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Changes: u16 {
        /// The node moved.
        const POSITION   = 0b0000_0000_0001;
        /// The node was resized.
        const SIZE       = 0b0000_0000_0010;
        /// The target scale changed.
        const SCALE      = 0b0000_0000_0100;
        /// A layout delegate produced new geometry.
        const LAYOUT     = 0b0000_0000_1000;
        /// The content was invalidated as a whole.
        const CONTENT    = 0b0000_0001_0000;
        /// The declared opaque region changed.
        const OPAQUE     = 0b0000_0010_0000;
        /// The node was shown or hidden.
        const VISIBILITY = 0b0000_0100_0000;
        /// The node's stacking order among its siblings changed.
        const ORDER      = 0b0000_1000_0000;
    }
}

impl Changes {
    /// Changes that repaint the node's whole visible area.
    pub(crate) const FULL_DAMAGE: Self = Self::SIZE
        .union(Self::SCALE)
        .union(Self::CONTENT)
        .union(Self::OPAQUE)
        .union(Self::VISIBILITY)
        .union(Self::ORDER);

    /// Changes that invalidate a bake cache completely.
    pub(crate) const FULL_REBAKE: Self = Self::SIZE
        .union(Self::SCALE)
        .union(Self::CONTENT)
        .union(Self::LAYOUT);
}

/// Which part of a node is fully opaque.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Opacity {
    /// No part is guaranteed opaque.
    #[default]
    Translucent,
    /// The whole node rectangle is opaque, whatever its size.
    Opaque,
    /// The given node-local region is opaque.
    Region(Region),
}

impl Opacity {
    /// Resolves to a node-local region for a node of the given local bounds.
    #[must_use]
    pub fn resolve(&self, local: IRect) -> Region {
        match self {
            Self::Translucent => Region::new(),
            Self::Opaque => Region::from_rect(local),
            Self::Region(r) => r.intersect_rect(local),
        }
    }
}

/// Per-variant payload held by the node store.
pub(crate) enum NodePayload {
    Content(Box<dyn NodeContent>),
    SubScene(Box<SubScene>),
}

/// Description of a node to insert into a [`Scene`].
pub struct Node {
    pub(crate) caps: Capabilities,
    pub(crate) rect: IRect,
    pub(crate) visible: bool,
    pub(crate) opacity: Opacity,
    pub(crate) payload: Option<NodePayload>,
    pub(crate) layout: Option<Box<dyn LayoutDelegate>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("caps", &self.caps)
            .field("rect", &self.rect)
            .field("visible", &self.visible)
            .field("opacity", &self.opacity)
            .field("has_layout", &self.layout.is_some())
            .finish_non_exhaustive()
    }
}

impl Node {
    fn with_caps(caps: Capabilities, payload: Option<NodePayload>) -> Self {
        Self {
            caps,
            rect: IRect::ZERO,
            visible: true,
            opacity: Opacity::Translucent,
            payload,
            layout: None,
        }
    }

    /// A node that only groups children.
    #[must_use]
    pub fn container() -> Self {
        Self::with_caps(Capabilities::CONTAINER, None)
    }

    /// A node that paints `content` directly onto every target.
    #[must_use]
    pub fn renderable(content: impl NodeContent + 'static) -> Self {
        Self::with_caps(
            Capabilities::RENDERS,
            Some(NodePayload::Content(Box::new(content))),
        )
    }

    /// A node that paints `content` into a per-target cache surface.
    #[must_use]
    pub fn bakeable(content: impl NodeContent + 'static) -> Self {
        Self::with_caps(
            Capabilities::RENDERS | Capabilities::BAKES,
            Some(NodePayload::Content(Box::new(content))),
        )
    }

    /// A bakeable node whose descendants are painted into its cache.
    #[must_use]
    pub fn baked_container(content: impl NodeContent + 'static) -> Self {
        Self::with_caps(
            Capabilities::RENDERS | Capabilities::BAKES | Capabilities::CONTAINER,
            Some(NodePayload::Content(Box::new(content))),
        )
    }

    /// A node that renders an empty nested scene.
    ///
    /// Populate it through [`Scene::subscene_mut`].
    #[must_use]
    pub fn subscene() -> Self {
        Self::subscene_with(Scene::new())
    }

    /// A node that renders the given nested scene.
    #[must_use]
    pub fn subscene_with(scene: Scene) -> Self {
        Self::with_caps(
            Capabilities::RENDERS | Capabilities::BAKES | Capabilities::SUBSCENE,
            Some(NodePayload::SubScene(Box::new(SubScene::new(scene)))),
        )
    }

    /// A renderable filled with `color`, declared opaque when `color` is.
    #[must_use]
    pub fn solid(color: Color) -> Self {
        let opacity = if color.is_opaque() {
            Opacity::Opaque
        } else {
            Opacity::Translucent
        };
        Self::renderable(SolidColor::new(color)).with_opacity(opacity)
    }

    /// Sets the rectangle, relative to the parent's origin.
    #[must_use]
    pub fn with_rect(mut self, rect: IRect) -> Self {
        self.rect = rect;
        self
    }

    /// Clips descendants to this node's rectangle.
    #[must_use]
    pub fn clipping_children(mut self) -> Self {
        self.caps |= Capabilities::CLIPS_CHILDREN;
        self
    }

    /// Declares a node-local opaque region.
    #[must_use]
    pub fn with_opaque(self, region: Region) -> Self {
        self.with_opacity(Opacity::Region(region))
    }

    /// Declares which part of the node is opaque.
    #[must_use]
    pub fn with_opacity(mut self, opacity: Opacity) -> Self {
        self.opacity = opacity;
        self
    }

    /// Attaches a layout delegate that computes this node's rectangle.
    #[must_use]
    pub fn with_layout(mut self, layout: impl LayoutDelegate + 'static) -> Self {
        self.layout = Some(Box::new(layout));
        self
    }

    /// Starts the node hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// The capabilities this descriptor will give the node.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_fix_capabilities() {
        assert_eq!(Node::container().capabilities(), Capabilities::CONTAINER);
        let solid = Node::solid(Color::WHITE);
        assert_eq!(solid.capabilities(), Capabilities::RENDERS);
        assert_eq!(solid.opacity, Opacity::Opaque);
        let baked = Node::baked_container(SolidColor::new(Color::TRANSPARENT)).clipping_children();
        assert!(baked.capabilities().contains(
            Capabilities::BAKES | Capabilities::CONTAINER | Capabilities::CLIPS_CHILDREN
        ));
        assert!(Node::subscene().capabilities().contains(Capabilities::SUBSCENE));
    }

    #[test]
    fn translucent_solid_is_not_opaque() {
        let n = Node::solid(Color::from_straight(255, 0, 0, 128));
        assert_eq!(n.opacity, Opacity::Translucent);
    }

    #[test]
    fn opacity_resolves_against_bounds() {
        let local = IRect::from_size(10, 10);
        assert!(Opacity::Translucent.resolve(local).is_empty());
        assert_eq!(Opacity::Opaque.resolve(local), Region::from_rect(local));
        let partial = Opacity::Region(Region::from_rect(IRect::new(5, 5, 20, 20)));
        assert_eq!(
            partial.resolve(local),
            Region::from_rect(IRect::new(5, 5, 10, 10))
        );
    }
}
