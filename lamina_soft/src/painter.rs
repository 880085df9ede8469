// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Painter`] implementation.

use hashbrown::HashMap;

use lamina_core::error::SurfaceError;
use lamina_core::geometry::{Blend, Color, IRect, OutputTransform, PixelSize};
use lamina_core::paint::{Painter, SurfaceId};

use crate::pixmap::Pixmap;

/// Who may free a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Owner {
    /// Created with [`SoftPainter::create_surface`].
    Caller,
    /// Allocated through [`Painter::allocate_surface`].
    Scene,
}

#[derive(Debug)]
struct Surface {
    pixmap: Pixmap,
    owner: Owner,
}

/// Counters for the primitives a [`SoftPainter`] has executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintStats {
    /// `fill_rect` calls.
    pub fills: usize,
    /// `blit` calls.
    pub blits: usize,
    /// Successful cache allocations.
    pub allocations: usize,
    /// Cache releases.
    pub releases: usize,
}

impl PaintStats {
    /// Fills plus blits.
    #[must_use]
    pub fn paint_calls(&self) -> usize {
        self.fills + self.blits
    }
}

/// A [`Painter`] that draws into in-memory [`Pixmap`]s.
#[derive(Debug)]
pub struct SoftPainter {
    surfaces: HashMap<SurfaceId, Surface>,
    next_id: u32,
    max_surface_size: u32,
    cache_budget: Option<usize>,
    cache_count: usize,
    stats: PaintStats,
}

impl Default for SoftPainter {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftPainter {
    /// Largest surface dimension accepted by default.
    pub const DEFAULT_MAX_SURFACE_SIZE: u32 = 16384;

    /// Creates a painter with no surfaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            next_id: 1,
            max_surface_size: Self::DEFAULT_MAX_SURFACE_SIZE,
            cache_budget: None,
            cache_count: 0,
            stats: PaintStats::default(),
        }
    }

    /// Limits the width and height of cache surfaces.
    #[must_use]
    pub fn with_max_surface_size(mut self, max: u32) -> Self {
        self.max_surface_size = max;
        self
    }

    /// Limits how many cache surfaces may be alive at once. Allocations past
    /// the budget fail with [`SurfaceError::Exhausted`]; `None` removes the
    /// limit.
    pub fn set_cache_budget(&mut self, budget: Option<usize>) {
        self.cache_budget = budget;
    }

    /// Creates a caller-owned surface, cleared to transparent, suitable as a
    /// render target.
    pub fn create_surface(&mut self, size: PixelSize) -> SurfaceId {
        self.insert(Pixmap::new(size), Owner::Caller)
    }

    /// Frees a surface created with [`create_surface`](Self::create_surface).
    ///
    /// Returns `false` for unknown ids and for cache surfaces, which belong
    /// to the scene.
    pub fn destroy_surface(&mut self, surface: SurfaceId) -> bool {
        match self.surfaces.get(&surface) {
            Some(s) if s.owner == Owner::Caller => {
                self.surfaces.remove(&surface);
                true
            }
            _ => false,
        }
    }

    /// The pixels of `surface`.
    #[must_use]
    pub fn pixmap(&self, surface: SurfaceId) -> Option<&Pixmap> {
        self.surfaces.get(&surface).map(|s| &s.pixmap)
    }

    /// One pixel of `surface`.
    #[must_use]
    pub fn pixel(&self, surface: SurfaceId, x: u32, y: u32) -> Option<Color> {
        self.pixmap(surface)?.pixel(x, y)
    }

    /// Number of live cache surfaces.
    #[must_use]
    pub fn cache_surface_count(&self) -> usize {
        self.cache_count
    }

    /// Primitive counters since creation or the last
    /// [`reset_stats`](Self::reset_stats).
    #[must_use]
    pub fn stats(&self) -> PaintStats {
        self.stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&mut self) {
        self.stats = PaintStats::default();
    }

    fn insert(&mut self, pixmap: Pixmap, owner: Owner) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.insert(id, Surface { pixmap, owner });
        id
    }
}

impl Painter for SoftPainter {
    fn allocate_surface(&mut self, size: PixelSize) -> Result<SurfaceId, SurfaceError> {
        if size.is_empty() {
            return Err(SurfaceError::ZeroSized);
        }
        if size.width > self.max_surface_size || size.height > self.max_surface_size {
            return Err(SurfaceError::TooLarge {
                width: size.width,
                height: size.height,
            });
        }
        if self.cache_budget.is_some_and(|budget| self.cache_count >= budget) {
            return Err(SurfaceError::Exhausted);
        }
        self.cache_count += 1;
        self.stats.allocations += 1;
        Ok(self.insert(Pixmap::new(size), Owner::Scene))
    }

    fn release_surface(&mut self, surface: SurfaceId) {
        if self
            .surfaces
            .get(&surface)
            .is_some_and(|s| s.owner == Owner::Scene)
        {
            self.surfaces.remove(&surface);
            self.cache_count -= 1;
            self.stats.releases += 1;
        }
    }

    fn fill_rect(&mut self, surface: SurfaceId, rect: IRect, color: Color, blend: Blend) {
        self.stats.fills += 1;
        if let Some(s) = self.surfaces.get_mut(&surface) {
            s.pixmap.fill(rect, color, blend);
        }
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
        self.stats.blits += 1;
        if dst == src {
            return;
        }
        // Take the source out so both buffers can be borrowed.
        let Some(source) = self.surfaces.remove(&src) else {
            return;
        };
        if let Some(target) = self.surfaces.get_mut(&dst) {
            target
                .pixmap
                .blit(dst_rect, &source.pixmap, src_rect, transform, blend);
        }
        self.surfaces.insert(src, source);
    }
}
