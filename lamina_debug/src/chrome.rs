// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Renders carry no clock readings, so timestamps are the per-scene phase
//! sequence numbers: one "microsecond" per phase boundary. Each scene is a
//! process and each target a thread.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use lamina_core::target::TargetId;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Events without a sequence number of their own are stamped with the most
/// recent one seen.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut now = 0_u64;
    // Damage events carry no target; they belong to the last render begun.
    let mut current = (0_u32, 0_u32);

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::RenderBegin(e) => {
                current = ids(e.target);
                events.push(json!({
                    "ph": "i",
                    "name": "Render",
                    "cat": "Render",
                    "ts": now,
                    "pid": current.0,
                    "tid": current.1,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                now = e.seq;
                let (pid, tid) = ids(e.target);
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Phase",
                    "ts": now,
                    "pid": pid,
                    "tid": tid,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                now = e.seq;
                let (pid, tid) = ids(e.target);
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Phase",
                    "ts": now,
                    "pid": pid,
                    "tid": tid,
                    "args": {
                        "frame_index": e.frame_index,
                    }
                }));
            }
            RecordedEvent::Bake(e) => {
                let (pid, tid) = ids(e.target);
                events.push(json!({
                    "ph": "i",
                    "name": "Bake",
                    "cat": "Bake",
                    "ts": now,
                    "pid": pid,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "node": e.node.index(),
                        "area": e.area,
                        "surface_changed": e.surface_changed,
                    }
                }));
            }
            RecordedEvent::BakeFailed(e) => {
                let (pid, tid) = ids(e.target);
                events.push(json!({
                    "ph": "i",
                    "name": "BakeFailed",
                    "cat": "Bake",
                    "ts": now,
                    "pid": pid,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "frame_index": e.frame_index,
                        "node": e.node.index(),
                        "error": e.error.to_string(),
                    }
                }));
            }
            RecordedEvent::RenderSummary(s) => {
                let (pid, tid) = ids(s.target);
                events.push(json!({
                    "ph": "i",
                    "name": "RenderSummary",
                    "cat": "Summary",
                    "ts": now,
                    "pid": pid,
                    "tid": tid,
                    "s": "p",
                    "args": {
                        "frame_index": s.frame_index,
                        "painted_area": s.painted_area,
                        "paint_calls": s.paint_calls,
                        "nodes_baked": s.nodes_baked,
                        "nodes_painted": s.nodes_painted,
                    }
                }));
            }
            RecordedEvent::DamageRects {
                frame_index,
                count,
                area,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": now,
                    "pid": current.0,
                    "tid": current.1,
                    "s": "t",
                    "args": {
                        "frame_index": frame_index,
                        "count": count,
                        "area": area,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

/// Chrome process and thread ids for a target.
fn ids(target: TargetId) -> (u32, u32) {
    (target.scene(), target.index())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use lamina_core::node::NodeId;
    use lamina_core::trace::{
        BakeEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RenderBeginEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let target = TargetId::from_raw_parts(4, 2, 0);
        let mut rec = RecorderSink::new();
        rec.on_render_begin(&RenderBeginEvent {
            frame_index: 1,
            target,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            target,
            phase: PhaseKind::Bake,
            seq: 5,
        });
        rec.on_bake(&BakeEvent {
            frame_index: 1,
            target,
            node: NodeId::from_raw_parts(3, 0),
            area: 64,
            surface_changed: false,
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 1,
            target,
            phase: PhaseKind::Bake,
            seq: 6,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Render");
        assert_eq!(parsed[0]["pid"], 4);
        assert_eq!(parsed[0]["tid"], 2);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "bake");
        assert_eq!(parsed[1]["ts"], 5);

        // Instants take the timestamp of the enclosing phase.
        assert_eq!(parsed[2]["name"], "Bake");
        assert_eq!(parsed[2]["ts"], 5);
        assert_eq!(parsed[2]["args"]["area"], 64);

        assert_eq!(parsed[3]["ph"], "E");
        assert_eq!(parsed[3]["ts"], 6);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
