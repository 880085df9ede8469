// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable errors.
//!
//! Lifetime misuse (stale [`NodeId`](crate::node::NodeId) or
//! [`TargetId`] handles) panics instead; see the individual operations.

use core::fmt;

use crate::target::TargetId;

/// Errors from [`Scene::render`](crate::scene::Scene::render).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// The target was not created by this scene, or has been destroyed.
    /// Nothing was painted and no state changed.
    InvalidTarget(TargetId),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget(id) => write!(f, "target {id:?} is not owned by this scene"),
        }
    }
}

impl core::error::Error for RenderError {}

/// Errors from [`Painter::allocate_surface`](crate::paint::Painter::allocate_surface).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// A zero-width or zero-height surface was requested.
    ZeroSized,
    /// The requested size exceeds what the backend (or the scene's
    /// configured maximum) supports.
    TooLarge {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The backend ran out of surface memory.
    Exhausted,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSized => f.write_str("zero-sized surface requested"),
            Self::TooLarge { width, height } => {
                write!(f, "surface of {width}x{height} pixels is too large")
            }
            Self::Exhausted => f.write_str("surface memory exhausted"),
        }
    }
}

impl core::error::Error for SurfaceError {}

/// Errors from baking a node into its cache.
///
/// Baking errors never abort a render: the node falls back to live painting
/// for the frame and retries a full bake on the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeError {
    /// The cache surface could not be allocated.
    Allocation(SurfaceError),
}

impl fmt::Display for BakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation(err) => write!(f, "bake cache allocation failed: {err}"),
        }
    }
}

impl core::error::Error for BakeError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Allocation(err) => Some(err),
        }
    }
}

impl From<SurfaceError> for BakeError {
    fn from(err: SurfaceError) -> Self {
        Self::Allocation(err)
    }
}
