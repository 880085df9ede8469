// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode scene graph with damage tracking, baking and multi-target
//! compositing.
//!
//! `lamina_core` keeps a tree of rectangular nodes and repaints only what
//! changed, independently for every output the scene is shown on. It is
//! `no_std` compatible (with `alloc`), stores nodes struct-of-arrays behind
//! generational handles, and draws exclusively through a caller-supplied
//! [`Painter`](paint::Painter).
//!
//! # Architecture
//!
//! ```text
//!   caller mutations ──► Scene (node store + dirty channels)
//!                              │
//!                              ▼
//!   Scene::render(target) ─► layout ─► geometry ─► damage ─► bake
//!                                                            │
//!                 ┌──────────────────────────────────────────┘
//!                 ▼
//!   occlusion ─► opaque pass ─► background ─► translucent pass
//!                 │
//!                 ▼
//!   Painter (fill / blit)        RenderReport (painted, device damage)
//! ```
//!
//! **[`scene`]**: the node tree, per-target state, bake caches, nested
//! scenes and the render pipeline.
//!
//! **[`node`]**: node handles, capabilities, change bits and the [`Node`](node::Node)
//! descriptor used to insert nodes.
//!
//! **[`target`]**: render targets (viewport, scale, output transform, clear
//! color).
//!
//! **[`region`]**: integer region algebra used for damage, clips and opaque
//! areas.
//!
//! **[`paint`]**: the [`Painter`](paint::Painter) backend trait, the clipped
//! [`Canvas`](paint::Canvas) handed to content hooks, and the
//! [`NodeContent`](paint::NodeContent) trait.
//!
//! **[`object`]**: the lifecycle substrate: generational objects, weak
//! references, signals and a safe deferred event queue.
//!
//! **[`layout`]**: optional layout delegates computing node rectangles.
//!
//! **[`dirty`]**: dirty-tracking channels via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-render
//!   damage-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod node;
pub mod object;
pub mod paint;
pub mod region;
pub mod scene;
pub mod target;
pub mod trace;

#[cfg(test)]
mod test_util;
