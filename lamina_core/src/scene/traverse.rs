// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use crate::node::{INVALID, NodeId};

use super::Scene;

/// An iterator over the direct children of a node, back to front.
///
/// Created by [`Scene::children`].
#[derive(Debug)]
pub struct Children<'a> {
    scene: &'a Scene,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(scene: &'a Scene, first: u32) -> Self {
        Self {
            scene,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.scene.next_sibling[idx as usize];
        Some(self.scene.node_id(idx))
    }
}
