// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::target::TargetId;
use lamina_core::trace::{
    BakeEvent, BakeFailedEvent, DamageRect, PhaseBeginEvent, PhaseEndEvent, RenderBeginEvent,
    RenderSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `s<scene>:<index>` (the generation only matters to the scene).
fn target_label(t: TargetId) -> String {
    format!("s{}:{}", t.scene(), t.index())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_render_begin(&mut self, e: &RenderBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[render] frame={} target={}",
            e.frame_index,
            target_label(e.target),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} seq={}",
            e.frame_index,
            e.phase.name(),
            e.seq,
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} seq={}",
            e.frame_index,
            e.phase.name(),
            e.seq,
        );
    }

    fn on_bake(&mut self, e: &BakeEvent) {
        let surface = if e.surface_changed { " new-surface" } else { "" };
        let _ = writeln!(
            self.writer,
            "[bake] frame={} node={}@{} area={}{surface}",
            e.frame_index,
            e.node.index(),
            e.node.generation(),
            e.area,
        );
    }

    fn on_bake_failed(&mut self, e: &BakeFailedEvent) {
        let _ = writeln!(
            self.writer,
            "[bake:failed] frame={} node={}@{} {}",
            e.frame_index,
            e.node.index(),
            e.node.generation(),
            e.error,
        );
    }

    fn on_render_summary(&mut self, s: &RenderSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} target={} painted={}px calls={} baked={} nodes={}",
            s.frame_index,
            target_label(s.target),
            s.painted_area,
            s.paint_calls,
            s.nodes_baked,
            s.nodes_painted,
        );
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let _ = writeln!(
            self.writer,
            "[damage] frame={frame_index} rects={}",
            rects.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::error::{BakeError, SurfaceError};
    use lamina_core::node::NodeId;
    use lamina_core::trace::PhaseKind;

    fn target() -> TargetId {
        TargetId::from_raw_parts(2, 1, 0)
    }

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_render_begin() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_render_begin(&RenderBeginEvent {
            frame_index: 1,
            target: target(),
        });
        let output = output(sink);
        assert_eq!(output, "[render] frame=1 target=s2:1\n");
    }

    #[test]
    fn pretty_print_phases_use_short_names() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 4,
            target: target(),
            phase: PhaseKind::Translucent,
            seq: 10,
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 4,
            target: target(),
            phase: PhaseKind::Translucent,
            seq: 11,
        });
        let output = output(sink);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            [
                "[phase:begin] frame=4 translucent seq=10",
                "[phase:end] frame=4 translucent seq=11",
            ]
        );
    }

    #[test]
    fn pretty_print_bakes() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_bake(&BakeEvent {
            frame_index: 2,
            target: target(),
            node: NodeId::from_raw_parts(5, 1),
            area: 2500,
            surface_changed: true,
        });
        sink.on_bake_failed(&BakeFailedEvent {
            frame_index: 2,
            target: target(),
            node: NodeId::from_raw_parts(6, 0),
            error: BakeError::Allocation(SurfaceError::Exhausted),
        });
        let output = output(sink);
        assert!(
            output.contains("[bake] frame=2 node=5@1 area=2500 new-surface"),
            "got: {output}"
        );
        assert!(
            output.contains("[bake:failed] frame=2 node=6@0 bake cache allocation failed"),
            "got: {output}"
        );
    }
}
