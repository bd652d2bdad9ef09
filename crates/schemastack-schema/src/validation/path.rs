//! Interned instance paths
//!
//! Frames carry a [`PathId`] instead of a `String`, so pushing a child frame
//! costs one arena slot rather than a copy of the whole parent path. Paths
//! are interned: the same logical location always maps to the same id, which
//! makes the id usable in the visited-set key. Text is only rendered when an
//! error is reported.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use std::collections::HashMap;

/// Handle to an interned path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PathId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Segment<'a> {
    Property(&'a str),
    Index(usize),
}

#[derive(Debug)]
struct PathNode<'a> {
    parent: PathId,
    segment: Segment<'a>,
}

/// Arena of path nodes for one validation call
#[derive(Debug)]
pub(crate) struct PathArena<'a> {
    nodes: Vec<PathNode<'a>>,
    interned: HashMap<(PathId, Segment<'a>), PathId>,
}

impl<'a> PathArena<'a> {
    /// Arena holding only the root path
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            interned: HashMap::new(),
        }
    }

    /// The root path, rendered as `""`
    pub(crate) fn root(&self) -> PathId {
        PathId(u32::MAX)
    }

    /// Path of a property below `parent`
    pub(crate) fn property(&mut self, parent: PathId, name: &'a str) -> PathId {
        self.intern(parent, Segment::Property(name))
    }

    /// Path of an array element below `parent`
    pub(crate) fn index(&mut self, parent: PathId, index: usize) -> PathId {
        self.intern(parent, Segment::Index(index))
    }

    fn intern(&mut self, parent: PathId, segment: Segment<'a>) -> PathId {
        if let Some(id) = self.interned.get(&(parent, segment)) {
            return *id;
        }
        let id = PathId(self.nodes.len() as u32);
        self.nodes.push(PathNode { parent, segment });
        self.interned.insert((parent, segment), id);
        id
    }

    /// Render a path as `a.b[0].c`
    pub(crate) fn render(&self, id: PathId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(node) = self.nodes.get(current.0 as usize) {
            segments.push(node.segment);
            current = node.parent;
        }
        let mut out = String::new();
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Property(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Segment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}
