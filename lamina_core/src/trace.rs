// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! compositor calls at each stage of [`Scene::render_traced`]. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! No clock is assumed: phase events carry a per-scene monotonic `seq`
//! number, which sinks can use as a logical timestamp.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`DamageRect`] events and the
//!   corresponding `TraceSink` method.
//!
//! [`Scene::render_traced`]: crate::scene::Scene::render_traced

use crate::error::BakeError;
use crate::node::NodeId;
use crate::target::TargetId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a render call is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Layout delegates and geometry resolution.
    Layout,
    /// Change bits and client damage turned into target damage.
    Damage,
    /// Bake caches refreshed.
    Bake,
    /// Opaque areas painted with replace blending.
    Opaque,
    /// Uncovered damage filled with the clear color.
    Background,
    /// Remaining areas alpha-composited back to front.
    Translucent,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [Self; 6] = [
        Self::Layout,
        Self::Damage,
        Self::Bake,
        Self::Opaque,
        Self::Background,
        Self::Translucent,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Damage => "damage",
            Self::Bake => "bake",
            Self::Opaque => "opaque",
            Self::Background => "background",
            Self::Translucent => "translucent",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once a render call has validated its target.
#[derive(Clone, Copy, Debug)]
pub struct RenderBeginEvent {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target being rendered.
    pub target: TargetId,
}

/// Marks the beginning of a render phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target being rendered.
    pub target: TargetId,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Per-scene monotonic sequence number.
    pub seq: u64,
}

/// Marks the end of a render phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target being rendered.
    pub target: TargetId,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Per-scene monotonic sequence number.
    pub seq: u64,
}

/// Emitted after a node's cache was repainted.
#[derive(Clone, Copy, Debug)]
pub struct BakeEvent {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target the cache belongs to.
    pub target: TargetId,
    /// Baked node.
    pub node: NodeId,
    /// Repainted area in logical pixels.
    pub area: u64,
    /// Whether the cache surface was (re)allocated.
    pub surface_changed: bool,
}

/// Emitted when a node could not be baked and fell back to live painting.
#[derive(Clone, Copy, Debug)]
pub struct BakeFailedEvent {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target the cache belongs to.
    pub target: TargetId,
    /// Node that fell back.
    pub node: NodeId,
    /// Why baking failed.
    pub error: BakeError,
}

/// Per-render summary.
#[derive(Clone, Copy, Debug)]
pub struct RenderSummary {
    /// Per-scene render counter.
    pub frame_index: u64,
    /// Target rendered.
    pub target: TargetId,
    /// Painted area in logical pixels.
    pub painted_area: u64,
    /// Primitives issued to the painter for the target surface.
    pub paint_calls: u32,
    /// Caches repainted.
    pub nodes_baked: u32,
    /// Nodes that painted (live or from cache) onto the target.
    pub nodes_painted: u32,
}

/// An axis-aligned damage rectangle in scene coordinates.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<crate::geometry::IRect> for DamageRect {
    fn from(r: crate::geometry::IRect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width().unsigned_abs(),
            height: r.height().unsigned_abs(),
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compositor.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a render call starts.
    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a render phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a render phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after a cache was repainted.
    fn on_bake(&mut self, e: &BakeEvent) {
        _ = e;
    }

    /// Called when a bake fell back to live painting.
    fn on_bake_failed(&mut self, e: &BakeFailedEvent) {
        _ = e;
    }

    /// Called with the per-render summary.
    fn on_render_summary(&mut self, s: &RenderSummary) {
        _ = s;
    }

    /// Called with the frame's damage rectangles (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`RenderBeginEvent`].
    #[inline]
    pub fn render_begin(&mut self, e: &RenderBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BakeEvent`].
    #[inline]
    pub fn bake(&mut self, e: &BakeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bake(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BakeFailedEvent`].
    #[inline]
    pub fn bake_failed(&mut self, e: &BakeFailedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bake_failed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderSummary`].
    #[inline]
    pub fn render_summary(&mut self, s: &RenderSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_render_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(frame_index, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetId {
        TargetId::from_raw_parts(1, 0, 0)
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_render_begin(&RenderBeginEvent {
            frame_index: 0,
            target: target(),
        });
        sink.on_render_summary(&RenderSummary {
            frame_index: 0,
            target: target(),
            painted_area: 0,
            paint_calls: 0,
            nodes_baked: 0,
            nodes_painted: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            target: target(),
            phase: PhaseKind::Layout,
            seq: 0,
        });
    }

    #[test]
    fn phase_names_are_unique() {
        for (i, a) in PhaseKind::ALL.iter().enumerate() {
            for b in &PhaseKind::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            phases: Vec<PhaseKind>,
        }
        impl TraceSink for RecordingSink {
            fn on_phase_end(&mut self, e: &PhaseEndEvent) {
                self.phases.push(e.phase);
            }
        }

        let mut sink = RecordingSink { phases: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.phase_end(&PhaseEndEvent {
            frame_index: 3,
            target: target(),
            phase: PhaseKind::Bake,
            seq: 9,
        });
        drop(tracer);
        assert_eq!(sink.phases, &[PhaseKind::Bake]);
    }
}
