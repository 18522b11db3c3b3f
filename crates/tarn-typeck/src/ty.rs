//! Structural type descriptors.
//!
//! A descriptor is a bag of handlers: the messages a value of that type
//! accepts. Symbol handlers answer a literal symbol (`.length`), type
//! handlers answer an argument matched structurally against a guard type.
//! Identity is the [`TypeId`] handed out by the [`TypeTable`] that owns the
//! descriptor; two descriptors are the same type only when their ids are
//! equal.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins::{self, Builtins};

/// Handle of a descriptor inside a [`TypeTable`].
///
/// Ids come from a per-table counter, so independent sessions never share
/// or collide on them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One field of a compound type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Declared name, or `?i` for the field at position `i` when unnamed.
    pub name: String,
    pub ty: TypeId,
    pub has_default: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Field {
            name: name.into(),
            ty,
            has_default: false,
        }
    }

    pub fn is_positional(&self) -> bool {
        self.name.starts_with('?')
    }
}

/// The matching discipline of a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Matched by its handlers.
    Simple,
    /// Matched field by field.
    Compound(Vec<Field>),
    /// An unbound generic parameter.
    Wildcard,
    /// The empty type; accepts nothing.
    Nothing,
    /// The universal type; matching against it always succeeds.
    Anything,
    /// No local type: the result of `return` and `break`.
    Never,
}

#[derive(Clone, Debug)]
pub struct Descriptor {
    pub id: TypeId,
    pub name: Option<String>,
    pub shape: Shape,
    pub symbol_handlers: BTreeMap<String, TypeId>,
    pub type_handlers: Vec<(TypeId, TypeId)>,
    /// Wildcards a template is parameterized over.
    pub params: Vec<TypeId>,
    /// Constituents of a merged type, kept for display.
    pub variants: Vec<TypeId>,
}

/// Owner of every descriptor of one session.
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<Descriptor>,
    builtins: Builtins,
    merges: FxHashMap<Vec<TypeId>, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// A table holding only the built-in types.
    pub fn new() -> Self {
        let mut table = TypeTable {
            types: Vec::new(),
            builtins: Builtins::placeholder(),
            merges: FxHashMap::default(),
        };
        table.builtins = builtins::register(&mut table);
        table
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ── Construction ───────────────────────────────────────────────────

    pub fn alloc(&mut self, name: Option<&str>, shape: Shape) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Descriptor {
            id,
            name: name.map(str::to_string),
            shape,
            symbol_handlers: BTreeMap::new(),
            type_handlers: Vec::new(),
            params: Vec::new(),
            variants: Vec::new(),
        });
        id
    }

    /// An anonymous handler-bearing type with no handlers yet.
    pub fn simple(&mut self) -> TypeId {
        self.alloc(None, Shape::Simple)
    }

    /// A compound type. Named fields also answer their name as a symbol.
    pub fn compound(&mut self, fields: Vec<Field>) -> TypeId {
        let accessors: Vec<(String, TypeId)> = fields
            .iter()
            .filter(|f| !f.is_positional())
            .map(|f| (f.name.clone(), f.ty))
            .collect();
        let id = self.alloc(None, Shape::Compound(fields));
        self.get_mut(id).symbol_handlers.extend(accessors);
        id
    }

    /// A fresh generic parameter; `name` includes the `$`.
    pub fn wildcard(&mut self, name: &str) -> TypeId {
        self.alloc(Some(name), Shape::Wildcard)
    }

    /// `arg -> result`: a type with exactly one type handler.
    pub fn function(&mut self, arg: TypeId, result: TypeId) -> TypeId {
        let id = self.simple();
        self.add_type_handler(id, arg, result);
        id
    }

    pub fn add_symbol_handler(&mut self, id: TypeId, symbol: &str, result: TypeId) {
        self.get_mut(id)
            .symbol_handlers
            .insert(symbol.to_string(), result);
    }

    pub fn add_type_handler(&mut self, id: TypeId, guard: TypeId, result: TypeId) {
        self.get_mut(id).type_handlers.push((guard, result));
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn get(&self, id: TypeId) -> &Descriptor {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Descriptor {
        &mut self.types[id.index()]
    }

    pub fn shape(&self, id: TypeId) -> &Shape {
        &self.get(id).shape
    }

    pub fn is_nothing(&self, id: TypeId) -> bool {
        matches!(self.shape(id), Shape::Nothing)
    }

    pub fn is_anything(&self, id: TypeId) -> bool {
        matches!(self.shape(id), Shape::Anything)
    }

    pub fn is_never(&self, id: TypeId) -> bool {
        matches!(self.shape(id), Shape::Never)
    }

    pub fn is_wildcard(&self, id: TypeId) -> bool {
        matches!(self.shape(id), Shape::Wildcard)
    }

    pub fn fields(&self, id: TypeId) -> Option<&[Field]> {
        match self.shape(id) {
            Shape::Compound(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn symbol_handler(&self, id: TypeId, symbol: &str) -> Option<TypeId> {
        self.get(id).symbol_handlers.get(symbol).copied()
    }

    // ── Merge ──────────────────────────────────────────────────────────

    /// Structural union of several types.
    ///
    /// `Never` contributes nothing, `Anything` absorbs everything, and a
    /// single distinct input is returned as is. Otherwise the result answers
    /// every symbol any input answers (overlapping results merged in turn)
    /// and carries every input's type handlers.
    pub fn merge(&mut self, ids: &[TypeId]) -> TypeId {
        let mut parts = Vec::new();
        for &id in ids {
            let variants = &self.get(id).variants;
            let flat: Vec<TypeId> = if variants.is_empty() {
                vec![id]
            } else {
                variants.clone()
            };
            for part in flat {
                if !self.is_never(part) && !parts.contains(&part) {
                    parts.push(part);
                }
            }
        }
        if parts.iter().any(|&p| self.is_anything(p)) {
            return self.builtins.anything;
        }
        match parts.as_slice() {
            [] => return self.builtins.never,
            [single] => return *single,
            _ => {}
        }
        if let Some(&merged) = self.merges.get(&parts) {
            return merged;
        }

        let merged = self.simple();
        self.merges.insert(parts.clone(), merged);
        self.get_mut(merged).variants = parts.clone();

        let mut symbols: BTreeMap<String, Vec<TypeId>> = BTreeMap::new();
        let mut handlers = Vec::new();
        for &part in &parts {
            let desc = self.get(part);
            for (symbol, &result) in &desc.symbol_handlers {
                symbols.entry(symbol.clone()).or_default().push(result);
            }
            for &pair in &desc.type_handlers {
                if !handlers.contains(&pair) {
                    handlers.push(pair);
                }
            }
        }
        for (symbol, results) in symbols {
            let result = self.merge(&results);
            self.add_symbol_handler(merged, &symbol, result);
        }
        self.get_mut(merged).type_handlers = handlers;
        log::trace!("merged {:?} into {}", parts, merged);
        merged
    }

    // ── Substitution ───────────────────────────────────────────────────

    /// Instantiate a template with concrete arguments.
    ///
    /// The caller has checked the arity.
    pub fn instantiate(&mut self, template: TypeId, args: &[TypeId]) -> TypeId {
        let params = self.get(template).params.clone();
        let map: FxHashMap<TypeId, TypeId> = params.into_iter().zip(args.iter().copied()).collect();
        let instance = self.substitute(template, &map);
        if instance != template {
            if let Some(name) = self.get(template).name.clone() {
                let args: Vec<String> = args.iter().map(|&a| self.display(a).to_string()).collect();
                self.get_mut(instance).name = Some(format!("{}({})", name, args.join(", ")));
            }
        }
        instance
    }

    /// Replace wildcards according to `map`, copying only the descriptors
    /// that actually mention one of them. Cycles through handlers are
    /// followed once.
    pub fn substitute(&mut self, id: TypeId, map: &FxHashMap<TypeId, TypeId>) -> TypeId {
        if map.is_empty() {
            return id;
        }
        let mut memo = FxHashMap::default();
        self.substitute_in(id, map, &mut memo)
    }

    fn substitute_in(
        &mut self,
        id: TypeId,
        map: &FxHashMap<TypeId, TypeId>,
        memo: &mut FxHashMap<TypeId, TypeId>,
    ) -> TypeId {
        if let Some(&to) = map.get(&id) {
            return to;
        }
        if let Some(&done) = memo.get(&id) {
            return done;
        }
        if !self.mentions(id, map, &mut FxHashSet::default()) {
            return id;
        }

        let original = self.get(id).clone();
        let copy = self.alloc(original.name.as_deref(), Shape::Simple);
        memo.insert(id, copy);

        let shape = match original.shape {
            Shape::Compound(fields) => Shape::Compound(
                fields
                    .into_iter()
                    .map(|f| Field {
                        ty: self.substitute_in(f.ty, map, memo),
                        ..f
                    })
                    .collect(),
            ),
            other => other,
        };
        let mut symbols = BTreeMap::new();
        for (symbol, result) in original.symbol_handlers {
            symbols.insert(symbol, self.substitute_in(result, map, memo));
        }
        let mut handlers = Vec::with_capacity(original.type_handlers.len());
        for (guard, result) in original.type_handlers {
            let guard = self.substitute_in(guard, map, memo);
            let result = self.substitute_in(result, map, memo);
            handlers.push((guard, result));
        }
        let variants = original
            .variants
            .into_iter()
            .map(|v| self.substitute_in(v, map, memo))
            .collect();

        let desc = self.get_mut(copy);
        desc.shape = shape;
        desc.symbol_handlers = symbols;
        desc.type_handlers = handlers;
        desc.variants = variants;
        copy
    }

    /// Whether any key of `map` is reachable from `id`.
    fn mentions(
        &self,
        id: TypeId,
        map: &FxHashMap<TypeId, TypeId>,
        seen: &mut FxHashSet<TypeId>,
    ) -> bool {
        if map.contains_key(&id) {
            return true;
        }
        if !seen.insert(id) {
            return false;
        }
        let desc = self.get(id);
        let field_types = match &desc.shape {
            Shape::Compound(fields) => fields.iter().map(|f| f.ty).collect(),
            _ => Vec::new(),
        };
        field_types
            .into_iter()
            .chain(desc.symbol_handlers.values().copied())
            .chain(desc.type_handlers.iter().flat_map(|&(g, r)| [g, r]))
            .chain(desc.variants.iter().copied())
            .any(|t| self.mentions(t, map, seen))
    }

    // ── Display ────────────────────────────────────────────────────────

    pub fn display(&self, id: TypeId) -> TypeDisplay<'_> {
        TypeDisplay {
            table: self,
            id,
            depth: 0,
        }
    }
}

/// Renders a descriptor as `Name`, `$T`, `(a: T, U)`, `A -> B`, `A | B` or
/// `{ .sym -> T; A -> B }`.
pub struct TypeDisplay<'a> {
    table: &'a TypeTable,
    id: TypeId,
    depth: usize,
}

const MAX_DISPLAY_DEPTH: usize = 6;

impl TypeDisplay<'_> {
    fn nested(&self, id: TypeId) -> Self {
        TypeDisplay {
            table: self.table,
            id,
            depth: self.depth + 1,
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = self.table.get(self.id);
        if let Some(name) = &desc.name {
            return write!(f, "{}", name);
        }
        if self.depth >= MAX_DISPLAY_DEPTH {
            return write!(f, "...");
        }
        if !desc.variants.is_empty() {
            for (i, &v) in desc.variants.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", self.nested(v))?;
            }
            return Ok(());
        }
        match &desc.shape {
            Shape::Compound(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if !field.is_positional() {
                        write!(f, "{}: ", field.name)?;
                    }
                    write!(f, "{}", self.nested(field.ty))?;
                }
                write!(f, ")")
            }
            _ if desc.symbol_handlers.is_empty() && desc.type_handlers.len() == 1 => {
                let (guard, result) = desc.type_handlers[0];
                write!(f, "{} -> {}", self.nested(guard), self.nested(result))
            }
            _ => {
                write!(f, "{{")?;
                let symbols = desc
                    .symbol_handlers
                    .iter()
                    .map(|(s, &r)| format!(" .{} -> {}", s, self.nested(r)));
                let calls = desc
                    .type_handlers
                    .iter()
                    .map(|&(g, r)| format!(" {} -> {}", self.nested(g), self.nested(r)));
                let entries: Vec<String> = symbols.chain(calls).collect();
                write!(f, "{}", entries.join(";"))?;
                write!(f, " }}")
            }
        }
    }
}
