//! Chained symbol tables.
//!
//! Frames live in an arena and point at their parent by [`ScopeId`]. A frame
//! outlives the lexical region that created it, so handlers and blocks can
//! keep the id of their own frame and resolve forward references through it
//! later. The same structure serves the term namespace (variables) and the
//! type namespace (type names and wildcards).

use rustc_hash::FxHashMap;

/// Handle of one frame in a [`Scopes`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Frame<T> {
    parent: Option<ScopeId>,
    names: FxHashMap<String, T>,
}

#[derive(Debug)]
pub struct Scopes<T> {
    frames: Vec<Frame<T>>,
}

impl<T> Default for Scopes<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scopes<T> {
    /// An arena holding one empty root frame.
    pub fn new() -> Self {
        Scopes {
            frames: vec![Frame {
                parent: None,
                names: FxHashMap::default(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child frame of `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.frames.len() as u32);
        self.frames.push(Frame {
            parent: Some(parent),
            names: FxHashMap::default(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frames[scope.index()].parent
    }

    /// Bind `name` in `scope` itself, shadowing outer bindings.
    pub fn add(&mut self, scope: ScopeId, name: impl Into<String>, value: T) {
        self.frames[scope.index()].names.insert(name.into(), value);
    }

    /// Look `name` up, innermost frame first.
    pub fn get(&self, scope: ScopeId, name: &str) -> Option<&T> {
        self.frame_of(scope, name)
            .and_then(|frame| self.frames[frame.index()].names.get(name))
    }

    fn frame_of(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = &self.frames[id.index()];
            if frame.names.contains_key(name) {
                return Some(id);
            }
            current = frame.parent;
        }
        None
    }
}
