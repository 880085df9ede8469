// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The scene uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! find the nodes whose derived state must be recomputed before a render.
//! Each channel represents an independent category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency edges
//!   from child to parent. World rectangles, effective clips and effective
//!   visibility are inherited, so marking a node marks its whole subtree.
//!
//! - **Local-only**: [`LAYOUT`] is marked with the default policy when a
//!   node's layout delegate must be asked again.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on insert, remove, reparent and
//!   reorder. It triggers a traversal-order rebuild.
//!
//! # Consumption
//!
//! Callers never query dirty state directly. The layout and geometry phases
//! of [`Scene::render`](crate::scene::Scene::render) drain the channels;
//! per-target damage is derived from the recomputed geometry.

use understory_dirty::Channel;

/// Rectangle, clip or visibility changed. Recompute world geometry for the
/// node and its descendants.
pub const GEOMETRY: Channel = Channel::new(0);

/// Layout must be recomputed for this node.
pub const LAYOUT: Channel = Channel::new(1);

/// Tree topology or sibling order changed.
pub const TOPOLOGY: Channel = Channel::new(2);
