//! The type-compute pass.
//!
//! One recursive walk over a desugared tree, computing a descriptor for every
//! expression node. Two pools ride along the walk: the escape pool collects
//! the types of `return` operands up to the nearest handler, and the break
//! pool collects `break` operands up to the nearest `repeat`.
//!
//! Locals are declared before their block runs, as [`UnresolvedType`]
//! placeholders computed on first use. That makes forward references work
//! (a handler can call a function defined further down) and turns a
//! self-dependent definition into a reported error instead of endless
//! recursion.

use std::mem;

use rustc_hash::FxHashMap;

use tarn_ast::{Ast, ConstKind, ErrorKind, Errors, ExprKind, LogicOp, NodeId};

use crate::builtins;
use crate::compile::TypeCompiler;
use crate::scope::{ScopeId, Scopes};
use crate::ty::{Field, TypeId, TypeTable};
use crate::unify::Checker;
use crate::{CheckConfig, TypeckResult};

/// Index of an [`UnresolvedType`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnresolvedId(u32);

impl UnresolvedId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Resolved(TypeId),
    Pending(UnresolvedId),
}

/// A term-scope entry.
#[derive(Clone, Debug)]
pub struct Variable {
    pub binding: Binding,
    pub mutable: bool,
}

impl Variable {
    fn immutable(ty: TypeId) -> Self {
        Variable {
            binding: Binding::Resolved(ty),
            mutable: false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Progress {
    Pending,
    InProgress,
    Done(TypeId),
}

/// A declared local whose type is computed on first use.
#[derive(Debug)]
pub struct UnresolvedType {
    pub name: String,
    pub local: NodeId,
    pub value: Option<NodeId>,
    pub scope: ScopeId,
    pub type_scope: ScopeId,
    /// The annotated type; authoritative once given.
    pub annotation: Option<TypeId>,
    /// Placeholders referenced while computing this one.
    pub depends_on: Vec<UnresolvedId>,
    progress: Progress,
    /// Set when the value referred back to this placeholder.
    cyclic: bool,
}

pub(crate) struct Infer<'a> {
    ast: &'a Ast,
    errors: &'a mut Errors,
    config: &'a CheckConfig,
    table: TypeTable,
    checker: Checker,
    terms: Scopes<Variable>,
    types: Scopes<TypeId>,
    scope: ScopeId,
    type_scope: ScopeId,
    results: FxHashMap<NodeId, TypeId>,
    coercions: FxHashMap<NodeId, TypeId>,
    escapes: Vec<(NodeId, TypeId)>,
    breaks: Vec<TypeId>,
    unresolved: Vec<UnresolvedType>,
    by_local: FxHashMap<NodeId, UnresolvedId>,
    /// Placeholders being computed, innermost last.
    resolving: Vec<UnresolvedId>,
    /// Placeholders in the order they were resolved.
    resolved_log: Vec<UnresolvedId>,
}

impl<'a> Infer<'a> {
    pub(crate) fn new(ast: &'a Ast, errors: &'a mut Errors, config: &'a CheckConfig) -> Self {
        let mut table = TypeTable::new();
        let mut terms = Scopes::new();
        let mut types = Scopes::new();
        let (scope, type_scope) = (terms.root(), types.root());
        for (name, ty) in builtins::terms(&mut table) {
            terms.add(scope, name, Variable::immutable(ty));
        }
        builtins::declare_types(&table, &mut types, type_scope);
        Infer {
            ast,
            errors,
            config,
            table,
            checker: Checker::new(config),
            terms,
            types,
            scope,
            type_scope,
            results: FxHashMap::default(),
            coercions: FxHashMap::default(),
            escapes: Vec::new(),
            breaks: Vec::new(),
            unresolved: Vec::new(),
            by_local: FxHashMap::default(),
            resolving: Vec::new(),
            resolved_log: Vec::new(),
        }
    }

    /// Compute the whole tree. Its type is the merge of everything that
    /// escaped with the natural type of the root.
    pub(crate) fn run(mut self, root: NodeId) -> TypeckResult {
        let natural = self.compute(root);
        let mut parts: Vec<TypeId> = mem::take(&mut self.escapes)
            .into_iter()
            .map(|(_, ty)| ty)
            .collect();
        let result_type = if parts.is_empty() {
            natural
        } else {
            parts.push(natural);
            self.table.merge(&parts)
        };
        log::debug!(
            "typeck: {} nodes typed, {} placeholders, result {}",
            self.results.len(),
            self.unresolved.len(),
            self.table.display(result_type)
        );
        TypeckResult {
            types: self.results,
            coercions: self.coercions,
            table: self.table,
            result_type,
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn nothing(&self) -> TypeId {
        self.table.builtins().nothing
    }

    fn anything(&self) -> TypeId {
        self.table.builtins().anything
    }

    fn report(&mut self, node: NodeId, kind: ErrorKind) {
        self.errors.report(self.ast, node, kind);
    }

    fn compile(&mut self, node: NodeId) -> TypeId {
        TypeCompiler {
            ast: self.ast,
            table: &mut self.table,
            scopes: &mut self.types,
            errors: &mut *self.errors,
        }
        .compile(node, self.type_scope)
    }

    /// Run the assignment checker, reporting wildcard conflicts at `node`.
    fn check_assign(&mut self, node: NodeId, target: TypeId, source: TypeId) -> bool {
        let ok = self.checker.can_assign(&self.table, target, source);
        self.report_conflicts(node);
        ok
    }

    fn report_conflicts(&mut self, node: NodeId) {
        for conflict in self.checker.take_conflicts() {
            let kind = ErrorKind::WildcardConflict {
                name: self.table.display(conflict.wildcard).to_string(),
                bound: self.table.display(conflict.bound).to_string(),
            };
            self.report(node, kind);
        }
    }

    fn enter_scope(&mut self) -> (ScopeId, ScopeId) {
        let outer = (self.scope, self.type_scope);
        self.scope = self.terms.push(outer.0);
        self.type_scope = self.types.push(outer.1);
        outer
    }

    fn leave_scope(&mut self, outer: (ScopeId, ScopeId)) {
        (self.scope, self.type_scope) = outer;
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn compute(&mut self, id: NodeId) -> TypeId {
        let ty = self.compute_kind(id);
        self.results.insert(id, ty);
        ty
    }

    /// Type of the first expression child, `Nothing` when there is none.
    fn compute_operand(&mut self, id: NodeId) -> TypeId {
        match self.ast.expressions(id).first() {
            Some(&operand) => self.compute(operand),
            None => self.nothing(),
        }
    }

    fn compute_kind(&mut self, id: NodeId) -> TypeId {
        let Some(kind) = self.ast.expr(id).cloned() else {
            return self.anything();
        };
        let b = self.table.builtins().clone();
        match kind {
            ExprKind::Constant(constant) => match constant.kind {
                ConstKind::Nothing => b.nothing,
                ConstKind::Boolean => b.boolean,
                ConstKind::Number { .. } => b.number,
                ConstKind::String => b.string,
                ConstKind::Symbol => b.symbol,
            },
            ExprKind::Reference { name } => self.reference(id, &name),
            ExprKind::Array => self.array(id),
            ExprKind::Struct => self.structure(id),
            ExprKind::StructField { .. } | ExprKind::Nested | ExprKind::Local { .. } => {
                self.compute_operand(id)
            }
            ExprKind::New => self.new_object(id),
            ExprKind::Call => self.call(id),
            ExprKind::Logic { op } => self.logic(id, op),
            ExprKind::If => self.if_expr(id),
            ExprKind::Repeat => self.repeat(id),
            ExprKind::Assignment { name } => self.assignment(id, &name),
            ExprKind::Return => {
                let ty = self.compute_operand(id);
                self.escapes.push((id, ty));
                b.never
            }
            ExprKind::Break => {
                let ty = self.compute_operand(id);
                self.breaks.push(ty);
                b.never
            }
            ExprKind::Locals => {
                // Only reachable outside a block, which is already reported.
                self.declare_locals(id);
                self.define_locals(id);
                b.nothing
            }
            ExprKind::On => self.handler(id),
            ExprKind::Block => self.block(id),
            surface => {
                debug_assert!(surface.is_surface_only());
                log::warn!(
                    "surface form '{}' at {} reached type computation; run simplify first",
                    surface.name(),
                    self.ast.span(id)
                );
                b.anything
            }
        }
    }

    fn reference(&mut self, id: NodeId, name: &str) -> TypeId {
        let Some(variable) = self.terms.get(self.scope, name).cloned() else {
            self.report(
                id,
                ErrorKind::UnresolvedName {
                    name: name.to_string(),
                },
            );
            return self.anything();
        };
        self.variable_type(&variable)
    }

    fn variable_type(&mut self, variable: &Variable) -> TypeId {
        match variable.binding {
            Binding::Resolved(ty) => ty,
            Binding::Pending(uid) => {
                if let Some(&current) = self.resolving.last() {
                    let deps = &mut self.unresolved[current.index()].depends_on;
                    if !deps.contains(&uid) {
                        deps.push(uid);
                    }
                }
                self.resolve(uid)
            }
        }
    }

    fn array(&mut self, id: NodeId) -> TypeId {
        let items: Vec<TypeId> = self
            .ast
            .expressions(id)
            .into_iter()
            .map(|item| self.compute(item))
            .collect();
        let element = if items.is_empty() {
            self.anything()
        } else {
            self.table.merge(&items)
        };
        let array = self.table.builtins().array;
        self.table.instantiate(array, &[element])
    }

    fn structure(&mut self, id: NodeId) -> TypeId {
        let mut fields = Vec::new();
        for (index, field) in self.ast.expressions(id).into_iter().enumerate() {
            let name = match self.ast.expr(field) {
                Some(ExprKind::StructField { name: Some(name) }) => name.clone(),
                _ => format!("?{}", index),
            };
            let ty = self.compute(field);
            fields.push(Field::new(name, ty));
        }
        self.table.compound(fields)
    }

    /// An object answers whatever its `on` handlers answer.
    fn new_object(&mut self, id: NodeId) -> TypeId {
        let Some(&code) = self.ast.expressions(id).first() else {
            return self.anything();
        };
        self.compute(code);
        let is_handler = |node: &NodeId| matches!(self.ast.expr(*node), Some(ExprKind::On));
        let handlers: Vec<NodeId> = match self.ast.expr(code) {
            Some(ExprKind::On) => vec![code],
            Some(ExprKind::Block) => self
                .ast
                .expressions(code)
                .into_iter()
                .filter(is_handler)
                .collect(),
            _ => Vec::new(),
        };
        if handlers.is_empty() {
            return self.anything();
        }
        let object = self.table.simple();
        for handler in handlers {
            let Some(&ty) = self.results.get(&handler) else {
                continue;
            };
            for (guard, result) in self.table.get(ty).type_handlers.clone() {
                self.table.add_type_handler(object, guard, result);
            }
        }
        object
    }

    /// `on Input [-> Output] body`, typed as `Input -> Result`.
    fn handler(&mut self, id: NodeId) -> TypeId {
        let outer = self.enter_scope();
        let signature = self.ast.types(id);
        let input = match signature.first() {
            Some(&node) => self.compile(node),
            None => self.table.builtins().empty,
        };
        let output = signature.get(1).map(|&node| self.compile(node));

        let inputs: Vec<Field> = self.table.fields(input).map(<[Field]>::to_vec).unwrap_or_default();
        for field in inputs.into_iter().filter(|f| !f.is_positional()) {
            self.terms.add(self.scope, field.name, Variable::immutable(field.ty));
        }

        let saved_escapes = mem::take(&mut self.escapes);
        let saved_breaks = mem::take(&mut self.breaks);
        let body = self.ast.expressions(id).first().copied();
        let natural = match body {
            Some(body) => self.compute(body),
            None => self.nothing(),
        };
        let returned = mem::replace(&mut self.escapes, saved_escapes);
        self.breaks = saved_breaks;

        let mut exits = returned;
        if !self.table.is_never(natural) {
            exits.push((body.unwrap_or(id), natural));
        }
        let result = match output {
            Some(expected) => {
                for (node, ty) in exits {
                    if !self.check_assign(node, expected, ty) {
                        self.report(node, ErrorKind::IncompatibleReturn);
                    }
                }
                expected
            }
            None => {
                let parts: Vec<TypeId> = exits.into_iter().map(|(_, ty)| ty).collect();
                self.table.merge(&parts)
            }
        };
        self.leave_scope(outer);
        self.table.function(input, result)
    }

    fn call(&mut self, id: NodeId) -> TypeId {
        let (receiver, message) = match self.ast.expressions(id).as_slice() {
            &[receiver, message] => (receiver, message),
            _ => return self.anything(),
        };
        let receiver_ty = self.compute(receiver);
        let message_ty = self.compute(message);
        let receiver_ty = self.checker.resolve(&self.table, receiver_ty);
        if self.table.is_anything(receiver_ty)
            || self.table.is_never(receiver_ty)
            || self.table.is_wildcard(receiver_ty)
        {
            return self.anything();
        }

        if let Some(ExprKind::Constant(constant)) = self.ast.expr(message) {
            if constant.kind == ConstKind::Symbol {
                if let Some(result) = self.table.symbol_handler(receiver_ty, &constant.value) {
                    log::trace!(
                        "{} .{} -> {}",
                        self.table.display(receiver_ty),
                        constant.value,
                        self.table.display(result)
                    );
                    return result;
                }
            }
        }
        if let Some((result, guard)) = self.handler_for_message(message, receiver_ty, message_ty) {
            self.coercions.insert(id, guard);
            return result;
        }
        self.report(id, ErrorKind::NoMatchingHandler);
        self.anything()
    }

    /// First type handler of `receiver` whose guard accepts `message_ty`,
    /// as `(result, guard)` with the guard's wildcard bindings applied to
    /// the result.
    fn handler_for_message(
        &mut self,
        message: NodeId,
        receiver: TypeId,
        message_ty: TypeId,
    ) -> Option<(TypeId, TypeId)> {
        let handlers = self.table.get(receiver).type_handlers.clone();
        for (guard, result) in handlers {
            let checkpoint = self.checker.checkpoint();
            if self.checker.can_assign(&self.table, guard, message_ty) {
                self.checker.commit(checkpoint);
                self.checker.take_conflicts();
                let bindings = self.checker.bindings(&self.table);
                let result = self.table.substitute(result, &bindings);
                log::trace!(
                    "{} matched guard {} -> {}",
                    self.table.display(message_ty),
                    self.table.display(guard),
                    self.table.display(result)
                );
                return Some((result, guard));
            }
            self.checker.rollback(checkpoint);
        }
        self.report_conflicts(message);
        None
    }

    fn logic(&mut self, id: NodeId, op: LogicOp) -> TypeId {
        let boolean = self.table.builtins().boolean;
        for operand in self.ast.expressions(id) {
            let ty = self.compute(operand);
            if !self.check_assign(operand, boolean, ty) {
                self.report(
                    operand,
                    ErrorKind::NonBooleanOperand {
                        op: op.as_str().to_string(),
                    },
                );
            }
        }
        boolean
    }

    fn if_expr(&mut self, id: NodeId) -> TypeId {
        let parts = self.ast.expressions(id);
        let Some((&cond, branches)) = parts.split_first() else {
            return self.anything();
        };
        let boolean = self.table.builtins().boolean;
        let cond_ty = self.compute(cond);
        if !self.check_assign(cond, boolean, cond_ty) {
            self.report(cond, ErrorKind::NonBooleanCondition);
        }
        let mut types: Vec<TypeId> = branches.iter().map(|&branch| self.compute(branch)).collect();
        if types.len() < 2 {
            types.push(self.nothing());
        }
        self.table.merge(&types)
    }

    fn repeat(&mut self, id: NodeId) -> TypeId {
        let saved = mem::take(&mut self.breaks);
        self.compute_operand(id);
        let fired = mem::replace(&mut self.breaks, saved);
        if fired.is_empty() {
            self.nothing()
        } else {
            self.table.merge(&fired)
        }
    }

    fn assignment(&mut self, id: NodeId, name: &str) -> TypeId {
        let value = self.compute_operand(id);
        let Some(variable) = self.terms.get(self.scope, name).cloned() else {
            self.report(
                id,
                ErrorKind::UnresolvedName {
                    name: name.to_string(),
                },
            );
            return value;
        };
        let target = self.variable_type(&variable);
        if !variable.mutable {
            self.report(
                id,
                ErrorKind::ImmutableAssignment {
                    name: name.to_string(),
                },
            );
        } else if !self.check_assign(id, target, value) {
            self.report(id, ErrorKind::IncompatibleAssignment);
        }
        target
    }

    // ── Blocks and locals ──────────────────────────────────────────────

    fn block(&mut self, id: NodeId) -> TypeId {
        let outer = self.enter_scope();
        let items = self.ast.expressions(id);
        for &item in &items {
            if matches!(self.ast.expr(item), Some(ExprKind::Locals)) {
                self.declare_locals(item);
            }
        }

        let mut ty = self.nothing();
        let mut returned = false;
        let mut reported = false;
        for &item in &items {
            if returned && !reported && self.config.report_unreachable {
                self.report(item, ErrorKind::UnreachableCode);
                reported = true;
            }
            ty = match self.ast.expr(item) {
                Some(ExprKind::Locals) => {
                    self.define_locals(item);
                    let nothing = self.nothing();
                    self.results.insert(item, nothing);
                    nothing
                }
                _ => self.compute(item),
            };
            returned |= matches!(self.ast.expr(item), Some(ExprKind::Return));
        }
        self.leave_scope(outer);
        ty
    }

    /// Bind every local of a `let`/`var` group as a placeholder in the
    /// current scope.
    fn declare_locals(&mut self, locals: NodeId) {
        for local in self.ast.expressions(locals) {
            let Some(ExprKind::Local { name, mutable }) = self.ast.expr(local).cloned() else {
                continue;
            };
            let annotation = self.ast.types(local).first().map(|&node| self.compile(node));
            let uid = UnresolvedId(self.unresolved.len() as u32);
            self.unresolved.push(UnresolvedType {
                name: name.clone(),
                local,
                value: self.ast.expressions(local).first().copied(),
                scope: self.scope,
                type_scope: self.type_scope,
                annotation,
                depends_on: Vec::new(),
                progress: Progress::Pending,
                cyclic: false,
            });
            self.by_local.insert(local, uid);
            self.terms.add(
                self.scope,
                name,
                Variable {
                    binding: Binding::Pending(uid),
                    mutable,
                },
            );
        }
    }

    /// Resolve the locals of a group in order.
    fn define_locals(&mut self, locals: NodeId) {
        for local in self.ast.expressions(locals) {
            if let Some(&uid) = self.by_local.get(&local) {
                let ty = self.resolve(uid);
                self.results.insert(local, ty);
            }
        }
    }

    fn resolve(&mut self, uid: UnresolvedId) -> TypeId {
        match self.unresolved[uid.index()].progress {
            Progress::Done(ty) => ty,
            Progress::InProgress => {
                let path = self.cycle_path(uid);
                let entry = &mut self.unresolved[uid.index()];
                if let Some(annotation) = entry.annotation {
                    return annotation;
                }
                log::trace!("recursive definition: {}", path.join(" -> "));
                entry.cyclic = true;
                self.anything()
            }
            Progress::Pending => self.resolve_pending(uid),
        }
    }

    /// Names along the dependency chain from `uid` back to itself.
    fn cycle_path(&self, uid: UnresolvedId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = uid;
        loop {
            let entry = &self.unresolved[current.index()];
            path.push(entry.name.clone());
            let next = entry
                .depends_on
                .iter()
                .copied()
                .find(|dep| self.resolving.contains(dep));
            match next {
                Some(next) if next != uid && path.len() <= self.resolving.len() => current = next,
                _ => break,
            }
        }
        path.push(self.unresolved[uid.index()].name.clone());
        path
    }

    fn resolve_pending(&mut self, uid: UnresolvedId) -> TypeId {
        let (local, value, annotation, scope, type_scope) = {
            let entry = &mut self.unresolved[uid.index()];
            entry.progress = Progress::InProgress;
            (
                entry.local,
                entry.value,
                entry.annotation,
                entry.scope,
                entry.type_scope,
            )
        };
        self.resolving.push(uid);
        let outer = (self.scope, self.type_scope);
        (self.scope, self.type_scope) = (scope, type_scope);

        let mark = self.errors.mark();
        let checkpoint = self.checker.checkpoint();
        let resolved_before = self.resolved_log.len();
        let pools = (self.escapes.len(), self.breaks.len());

        let mut ty = self.local_value(value, annotation);
        if self.unresolved[uid.index()].cyclic && annotation.is_none() {
            // Whatever was computed on top of the placeholder is suspect:
            // drop it and compute again with the recursion reported.
            self.errors.restore(mark);
            self.checker.rollback(checkpoint);
            for later in self.resolved_log.drain(resolved_before..) {
                self.unresolved[later.index()].progress = Progress::Pending;
            }
            self.escapes.truncate(pools.0);
            self.breaks.truncate(pools.1);

            ty = self.anything();
            let name = self.unresolved[uid.index()].name.clone();
            self.unresolved[uid.index()].progress = Progress::Done(ty);
            self.report(local, ErrorKind::RecursiveDefinition { name });
            self.local_value(value, None);
        } else {
            self.checker.commit(checkpoint);
        }

        self.unresolved[uid.index()].progress = Progress::Done(ty);
        self.resolved_log.push(uid);
        (self.scope, self.type_scope) = outer;
        self.resolving.pop();
        log::trace!(
            "resolved '{}': {}",
            self.unresolved[uid.index()].name,
            self.table.display(ty)
        );
        ty
    }

    fn local_value(&mut self, value: Option<NodeId>, annotation: Option<TypeId>) -> TypeId {
        let Some(value) = value else {
            return annotation.unwrap_or_else(|| self.nothing());
        };
        let ty = self.compute(value);
        match annotation {
            Some(expected) => {
                if !self.check_assign(value, expected, ty) {
                    self.report(value, ErrorKind::IncompatibleAssignment);
                }
                expected
            }
            None => ty,
        }
    }
}
