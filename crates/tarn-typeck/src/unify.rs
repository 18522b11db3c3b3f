//! The assignment checker: structural subtyping with wildcard unification.
//!
//! [`Checker::can_assign`] decides whether a value of the source type may be
//! used where the target type is required. Verdicts are cached per ordered
//! `(target, source)` pair. A pair under examination is cached as
//! compatible before its parts are compared, so recursive types terminate.
//! If the pair then fails, every verdict cached while that assumption was
//! live is evicted with it.
//!
//! Wildcards bind on their first successful match and keep that binding for
//! the checker's lifetime. Bindings live in an `ena` union-find table, which
//! lets two wildcards matched against each other share one binding and lets
//! a speculative match be rolled back with [`Checker::rollback`].

use std::mem;

use ena::unify::{InPlace, InPlaceUnificationTable, Snapshot, UnifyKey};
use rustc_hash::FxHashMap;

use crate::ty::{Field, Shape, TypeId, TypeTable};
use crate::CheckConfig;

/// Union-find key of one wildcard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WildcardKey(u32);

impl UnifyKey for WildcardKey {
    type Value = Option<TypeId>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        WildcardKey(u)
    }

    fn tag() -> &'static str {
        "WildcardKey"
    }
}

impl ena::unify::EqUnifyValue for TypeId {}

/// A wildcard asked to accept a type incompatible with its binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WildcardConflict {
    pub wildcard: TypeId,
    pub bound: TypeId,
    pub attempted: TypeId,
}

/// State to return to when a speculative match fails.
pub struct Checkpoint {
    snapshot: Snapshot<InPlace<WildcardKey>>,
    cache_len: usize,
    wildcards: usize,
}

pub struct Checker {
    cache: FxHashMap<(TypeId, TypeId), bool>,
    /// Cache keys in insertion order, for rollback.
    cache_log: Vec<(TypeId, TypeId)>,
    table: InPlaceUnificationTable<WildcardKey>,
    keys: FxHashMap<TypeId, WildcardKey>,
    /// Wildcards in key order.
    wildcards: Vec<TypeId>,
    conflicts: Vec<WildcardConflict>,
    unwrap_single_field: bool,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(&CheckConfig::default())
    }
}

impl Checker {
    pub fn new(config: &CheckConfig) -> Self {
        Checker {
            cache: FxHashMap::default(),
            cache_log: Vec::new(),
            table: InPlaceUnificationTable::new(),
            keys: FxHashMap::default(),
            wildcards: Vec::new(),
            conflicts: Vec::new(),
            unwrap_single_field: config.unwrap_single_field,
        }
    }

    /// Forget every verdict and binding.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.cache_log.clear();
        self.table = InPlaceUnificationTable::new();
        self.keys.clear();
        self.wildcards.clear();
        self.conflicts.clear();
    }

    // ── Wildcards ──────────────────────────────────────────────────────

    fn key_for(&mut self, wildcard: TypeId) -> WildcardKey {
        if let Some(&key) = self.keys.get(&wildcard) {
            return key;
        }
        let key = self.table.new_key(None);
        self.keys.insert(wildcard, key);
        self.wildcards.push(wildcard);
        key
    }

    /// Follow wildcard bindings until reaching a non-wildcard or an unbound
    /// wildcard.
    pub fn resolve(&mut self, types: &TypeTable, id: TypeId) -> TypeId {
        let mut current = id;
        // A binding chain never revisits a wildcard, so it ends within
        // `wildcards.len()` steps.
        for _ in 0..=self.wildcards.len() {
            if !types.is_wildcard(current) {
                break;
            }
            let Some(&key) = self.keys.get(&current) else {
                break;
            };
            match self.table.probe_value(key) {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current
    }

    /// The type `wildcard` is bound to, if any.
    pub fn resolution(&mut self, types: &TypeTable, wildcard: TypeId) -> Option<TypeId> {
        let resolved = self.resolve(types, wildcard);
        (resolved != wildcard && !types.is_wildcard(resolved)).then_some(resolved)
    }

    /// Every bound wildcard with its binding.
    pub fn bindings(&mut self, types: &TypeTable) -> FxHashMap<TypeId, TypeId> {
        let wildcards = self.wildcards.clone();
        wildcards
            .into_iter()
            .filter_map(|w| self.resolution(types, w).map(|t| (w, t)))
            .collect()
    }

    /// Conflicts recorded since the last call.
    pub fn take_conflicts(&mut self) -> Vec<WildcardConflict> {
        mem::take(&mut self.conflicts)
    }

    fn bind(&mut self, types: &TypeTable, wildcard: TypeId, source: TypeId) -> bool {
        let key = self.key_for(wildcard);
        if types.is_wildcard(source) {
            let other = self.key_for(source);
            return match self.table.unify_var_var(key, other) {
                Ok(()) => true,
                Err((bound, attempted)) => {
                    self.conflicts.push(WildcardConflict {
                        wildcard,
                        bound,
                        attempted,
                    });
                    false
                }
            };
        }
        match self.table.probe_value(key) {
            None => {
                log::trace!(
                    "bind {} := {}",
                    types.display(wildcard),
                    types.display(source)
                );
                self.table.unify_var_value(key, Some(source)).is_ok()
            }
            Some(bound) => {
                if self.can_assign(types, bound, source) {
                    return true;
                }
                self.conflicts.push(WildcardConflict {
                    wildcard,
                    bound,
                    attempted: source,
                });
                false
            }
        }
    }

    // ── Speculation ────────────────────────────────────────────────────

    pub fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint {
            snapshot: self.table.snapshot(),
            cache_len: self.cache_log.len(),
            wildcards: self.wildcards.len(),
        }
    }

    /// Undo bindings and verdicts made since `checkpoint`. Recorded
    /// conflicts are kept.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.table.rollback_to(checkpoint.snapshot);
        for pair in self.cache_log.drain(checkpoint.cache_len..) {
            self.cache.remove(&pair);
        }
        for wildcard in self.wildcards.drain(checkpoint.wildcards..) {
            self.keys.remove(&wildcard);
        }
    }

    pub fn commit(&mut self, checkpoint: Checkpoint) {
        self.table.commit(checkpoint.snapshot);
    }

    // ── Assignability ──────────────────────────────────────────────────

    fn remember(&mut self, target: TypeId, source: TypeId, verdict: bool) {
        if self.cache.insert((target, source), verdict).is_none() {
            self.cache_log.push((target, source));
        }
    }

    /// Whether a value of type `source` may be used where `target` is
    /// required.
    pub fn can_assign(&mut self, types: &TypeTable, target: TypeId, source: TypeId) -> bool {
        let source = self.resolve(types, source);

        if types.is_nothing(target) {
            return false;
        }
        let target_compound = types.fields(target).is_some();
        if types.is_nothing(source) && !target_compound {
            return false;
        }
        if target == source {
            return true;
        }
        // Binding is a side effect, so wildcard verdicts are never cached.
        if types.is_wildcard(target) {
            return self.bind(types, target, source);
        }
        if let Some(&verdict) = self.cache.get(&(target, source)) {
            return verdict;
        }
        // An unbound wildcard source is not known yet; don't reject it.
        if types.is_anything(target)
            || types.is_anything(source)
            || types.is_never(source)
            || types.is_wildcard(source)
        {
            return true;
        }

        let assumed_at = self.cache_log.len();
        self.remember(target, source, true);
        let verdict = match types.shape(target) {
            Shape::Simple => self.handlers_match(types, target, source),
            Shape::Compound(fields) => self.compound_match(types, fields, source),
            _ => false,
        };
        if !verdict {
            // Anything decided since the assumption may rest on it.
            for pair in self.cache_log.drain(assumed_at..) {
                self.cache.remove(&pair);
            }
        }
        self.remember(target, source, verdict);
        verdict
    }

    /// Every handler of `target` has a compatible counterpart in `source`.
    fn handlers_match(&mut self, types: &TypeTable, target: TypeId, source: TypeId) -> bool {
        let wanted = types.get(target);
        let offered = types.get(source);
        for (symbol, &result) in &wanted.symbol_handlers {
            match offered.symbol_handlers.get(symbol) {
                Some(&other) if self.can_assign(types, result, other) => {}
                _ => return false,
            }
        }
        wanted.type_handlers.iter().all(|&(guard, result)| {
            offered.type_handlers.iter().any(|&(other_guard, other_result)| {
                // Guards are contravariant, results covariant.
                self.can_assign(types, other_guard, guard)
                    && self.can_assign(types, result, other_result)
            })
        })
    }

    fn compound_match(&mut self, types: &TypeTable, target: &[Field], source: TypeId) -> bool {
        let offered: Vec<Field> = if types.is_nothing(source) {
            Vec::new()
        } else if let Some(fields) = types.fields(source) {
            fields.to_vec()
        } else {
            vec![Field::new("?0", source)]
        };
        if self.fields_match(types, target, &offered) {
            return true;
        }
        if self.unwrap_single_field {
            if let [only] = target {
                if let Some(inner) = types.fields(only.ty) {
                    return self.fields_match(types, inner, &offered);
                }
            }
        }
        false
    }

    fn fields_match(&mut self, types: &TypeTable, target: &[Field], source: &[Field]) -> bool {
        let mut matched = vec![false; target.len()];
        for field in source {
            let position = match field.name.strip_prefix('?') {
                Some(index) => index.parse::<usize>().ok(),
                None => target.iter().position(|t| t.name == field.name),
            };
            let Some(index) = position.filter(|&i| i < target.len()) else {
                return false;
            };
            if matched[index] || !self.can_assign(types, target[index].ty, field.ty) {
                return false;
            }
            matched[index] = true;
        }
        target
            .iter()
            .zip(&matched)
            .all(|(field, &matched)| matched || field.has_default)
    }
}
