// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles shared by unit tests.

use alloc::vec::Vec;

use crate::error::SurfaceError;
use crate::geometry::{Blend, Color, IRect, OutputTransform, PixelSize};
use crate::paint::{Painter, SurfaceId};

/// One recorded painter call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    Fill {
        surface: SurfaceId,
        rect: IRect,
        color: Color,
        blend: Blend,
    },
    Blit {
        dst: SurfaceId,
        dst_rect: IRect,
        src: SurfaceId,
        src_rect: IRect,
        transform: OutputTransform,
        blend: Blend,
    },
}

impl Call {
    pub(crate) fn surface(&self) -> SurfaceId {
        match self {
            Self::Fill { surface, .. } => *surface,
            Self::Blit { dst, .. } => *dst,
        }
    }
}

/// A painter that records every primitive and hands out numbered surfaces.
///
/// Surface ids start at 1000 so they never collide with caller-chosen
/// target surfaces in tests.
#[derive(Debug)]
pub(crate) struct RecordingPainter {
    pub(crate) calls: Vec<Call>,
    pub(crate) allocated: Vec<(SurfaceId, PixelSize)>,
    pub(crate) released: Vec<SurfaceId>,
    pub(crate) fail_allocations: bool,
    /// Allocations past this many (counted since creation) fail.
    pub(crate) allocation_budget: Option<usize>,
    next_surface: u32,
}

impl Default for RecordingPainter {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            allocated: Vec::new(),
            released: Vec::new(),
            fail_allocations: false,
            allocation_budget: None,
            next_surface: 1000,
        }
    }
}

impl RecordingPainter {
    /// Calls that drew into `surface`.
    pub(crate) fn calls_on(&self, surface: SurfaceId) -> Vec<&Call> {
        self.calls.iter().filter(|c| c.surface() == surface).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Painter for RecordingPainter {
    fn allocate_surface(&mut self, size: PixelSize) -> Result<SurfaceId, SurfaceError> {
        if size.is_empty() {
            return Err(SurfaceError::ZeroSized);
        }
        let over_budget = self
            .allocation_budget
            .is_some_and(|budget| self.allocated.len() >= budget);
        if self.fail_allocations || over_budget {
            return Err(SurfaceError::Exhausted);
        }
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.allocated.push((id, size));
        Ok(id)
    }

    fn release_surface(&mut self, surface: SurfaceId) {
        self.released.push(surface);
    }

    fn fill_rect(&mut self, surface: SurfaceId, rect: IRect, color: Color, blend: Blend) {
        self.calls.push(Call::Fill {
            surface,
            rect,
            color,
            blend,
        });
    }

    fn blit(
        &mut self,
        dst: SurfaceId,
        dst_rect: IRect,
        src: SurfaceId,
        src_rect: IRect,
        transform: OutputTransform,
        blend: Blend,
    ) {
        self.calls.push(Call::Blit {
            dst,
            dst_rect,
            src,
            src_rect,
            transform,
            blend,
        });
    }
}
