// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU painter for `lamina_core` scenes.
//!
//! [`SoftPainter`] implements [`Painter`](lamina_core::paint::Painter) over
//! [`Pixmap`]s, premultiplied ARGB buffers held in memory. Target surfaces are
//! created by the caller with [`SoftPainter::create_surface`]; cache surfaces
//! are allocated and released by the scene.
//!
//! The painter is deliberately simple: fills and blits touch every covered
//! pixel, and blits sample nearest-neighbour. It exists for headless
//! rendering and for checking scene output pixel by pixel.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod painter;
mod pixmap;

pub use painter::{PaintStats, SoftPainter};
pub use pixmap::Pixmap;
