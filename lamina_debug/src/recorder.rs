// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! [`on_damage_rects`](TraceSink::on_damage_rects) stores the count and the
//! total area only.

use lamina_core::error::{BakeError, SurfaceError};
use lamina_core::node::NodeId;
use lamina_core::target::TargetId;
use lamina_core::trace::{
    BakeEvent, BakeFailedEvent, DamageRect, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    RenderBeginEvent, RenderSummary, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_RENDER_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_BAKE: u8 = 4;
const TAG_BAKE_FAILED: u8 = 5;
const TAG_RENDER_SUMMARY: u8 = 6;
const TAG_DAMAGE_RECTS: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_target(&mut self, t: TargetId) {
        self.write_u32(t.scene());
        self.write_u32(t.index());
        self.write_u32(t.generation());
    }

    fn write_node(&mut self, n: NodeId) {
        self.write_u32(n.index());
        self.write_u32(n.generation());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Layout => 0,
            PhaseKind::Damage => 1,
            PhaseKind::Bake => 2,
            PhaseKind::Opaque => 3,
            PhaseKind::Background => 4,
            PhaseKind::Translucent => 5,
        });
    }

    /// Error tag followed by two `u32` payload words.
    fn write_bake_error(&mut self, e: BakeError) {
        let BakeError::Allocation(err) = e;
        let (tag, width, height) = match err {
            SurfaceError::ZeroSized => (0, 0, 0),
            SurfaceError::TooLarge { width, height } => (1, width, height),
            SurfaceError::Exhausted => (2, 0, 0),
        };
        self.write_u8(tag);
        self.write_u32(width);
        self.write_u32(height);
    }
}

impl TraceSink for RecorderSink {
    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        self.write_u8(TAG_RENDER_BEGIN);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
        self.write_phase(e.phase);
        self.write_u64(e.seq);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
        self.write_phase(e.phase);
        self.write_u64(e.seq);
    }

    fn on_bake(&mut self, e: &BakeEvent) {
        self.write_u8(TAG_BAKE);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
        self.write_node(e.node);
        self.write_u64(e.area);
        self.write_u8(u8::from(e.surface_changed));
    }

    fn on_bake_failed(&mut self, e: &BakeFailedEvent) {
        self.write_u8(TAG_BAKE_FAILED);
        self.write_u64(e.frame_index);
        self.write_target(e.target);
        self.write_node(e.node);
        self.write_bake_error(e.error);
    }

    fn on_render_summary(&mut self, s: &RenderSummary) {
        self.write_u8(TAG_RENDER_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_target(s.target);
        self.write_u64(s.painted_area);
        self.write_u32(s.paint_calls);
        self.write_u32(s.nodes_baked);
        self.write_u32(s.nodes_painted);
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS);
        self.write_u64(frame_index);
        self.write_u32(u32::try_from(rects.len()).unwrap_or(u32::MAX));
        let area = rects
            .iter()
            .map(|r| u64::from(r.width) * u64::from(r.height))
            .sum();
        self.write_u64(area);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`RenderBeginEvent`].
    RenderBegin(RenderBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`BakeEvent`].
    Bake(BakeEvent),
    /// A [`BakeFailedEvent`].
    BakeFailed(BakeFailedEvent),
    /// A [`RenderSummary`].
    RenderSummary(RenderSummary),
    /// Damage rectangles of a render.
    DamageRects {
        /// Per-scene render counter.
        frame_index: u64,
        /// Number of rectangles.
        count: u32,
        /// Sum of their areas.
        area: u64,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_target(&mut self) -> Option<TargetId> {
        let scene = self.read_u32()?;
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(TargetId::from_raw_parts(scene, index, generation))
    }

    fn read_node(&mut self) -> Option<NodeId> {
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(NodeId::from_raw_parts(index, generation))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Layout,
            1 => PhaseKind::Damage,
            2 => PhaseKind::Bake,
            3 => PhaseKind::Opaque,
            4 => PhaseKind::Background,
            _ => PhaseKind::Translucent,
        })
    }

    fn read_bake_error(&mut self) -> Option<BakeError> {
        let tag = self.read_u8()?;
        let width = self.read_u32()?;
        let height = self.read_u32()?;
        let err = match tag {
            0 => SurfaceError::ZeroSized,
            1 => SurfaceError::TooLarge { width, height },
            _ => SurfaceError::Exhausted,
        };
        Some(BakeError::Allocation(err))
    }

    fn decode_render_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderBegin(RenderBeginEvent {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
            phase: self.read_phase()?,
            seq: self.read_u64()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
            phase: self.read_phase()?,
            seq: self.read_u64()?,
        }))
    }

    fn decode_bake(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Bake(BakeEvent {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
            node: self.read_node()?,
            area: self.read_u64()?,
            surface_changed: self.read_u8()? != 0,
        }))
    }

    fn decode_bake_failed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BakeFailed(BakeFailedEvent {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
            node: self.read_node()?,
            error: self.read_bake_error()?,
        }))
    }

    fn decode_render_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderSummary(RenderSummary {
            frame_index: self.read_u64()?,
            target: self.read_target()?,
            painted_area: self.read_u64()?,
            paint_calls: self.read_u32()?,
            nodes_baked: self.read_u32()?,
            nodes_painted: self.read_u32()?,
        }))
    }

    fn decode_damage_rects(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let count = self.read_u32()?;
        let area = self.read_u64()?;
        Some(RecordedEvent::DamageRects {
            frame_index,
            count,
            area,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_RENDER_BEGIN => self.decode_render_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_BAKE => self.decode_bake(),
            TAG_BAKE_FAILED => self.decode_bake_failed(),
            TAG_RENDER_SUMMARY => self.decode_render_summary(),
            TAG_DAMAGE_RECTS => self.decode_damage_rects(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
