//! Indented debug rendering of a tree.
//!
//! One line per expression or type node, two spaces of indentation per
//! level, token leaves omitted. Used by tests to pin down tree shape.

use std::fmt::Write;

use crate::kind::{ConstKind, ExprKind, NodeKind, TypeKind};
use crate::tree::{Ast, NodeId};

impl Ast {
    /// Render the subtree under `root`.
    pub fn debug_tree(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.write_node(root, 0, &mut out);
        // Drop the final newline.
        out.pop();
        out
    }

    fn write_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let label = match self.kind(id) {
            NodeKind::Token(_) => return,
            NodeKind::Expr(kind) => expr_label(kind),
            NodeKind::Type(kind) => type_label(kind),
        };
        let _ = writeln!(out, "{:indent$}{}", "", label, indent = depth * 2);
        for &child in self.children(id) {
            self.write_node(child, depth + 1, out);
        }
    }
}

fn expr_label(kind: &ExprKind) -> String {
    match kind {
        ExprKind::Constant(c) => match c.kind {
            ConstKind::Nothing => "Constant ()".to_string(),
            ConstKind::Boolean => format!("Constant Boolean {}", c.value),
            ConstKind::Number { base: 10 } => format!("Constant Number {}", c.value),
            ConstKind::Number { base } => format!("Constant Number {} (base {})", c.value, base),
            ConstKind::String => format!("Constant String {:?}", c.value),
            ConstKind::Symbol => format!("Constant Symbol {}", c.value),
        },
        ExprKind::Reference { name } => format!("Reference {}", name),
        ExprKind::StructField { name: Some(name) } => format!("StructField {}", name),
        ExprKind::StructField { name: None } => "StructField".to_string(),
        ExprKind::Unary { op } => format!("Unary {}", op),
        ExprKind::Binary { op } => format!("Binary {}", op),
        ExprKind::Logic { op } => format!("Logic {}", op.as_str()),
        ExprKind::Assignment { name } => format!("Assignment {}", name),
        ExprKind::Local {
            name,
            mutable: true,
        } => format!("Local var {}", name),
        ExprKind::Local { name, .. } => format!("Local {}", name),
        ExprKind::Array => "Array".to_string(),
        ExprKind::Function { .. } => "Function".to_string(),
        ExprKind::Struct => "Struct".to_string(),
        ExprKind::Nested => "Nested".to_string(),
        ExprKind::New => "New".to_string(),
        ExprKind::Call => "Call".to_string(),
        ExprKind::If => "If".to_string(),
        ExprKind::Repeat => "Repeat".to_string(),
        ExprKind::While => "While".to_string(),
        ExprKind::Return => "Return".to_string(),
        ExprKind::Break => "Break".to_string(),
        ExprKind::Locals => "Locals".to_string(),
        ExprKind::On => "On".to_string(),
        ExprKind::Block => "Block".to_string(),
    }
}

fn type_label(kind: &TypeKind) -> String {
    match kind {
        TypeKind::Empty => "EmptyType".to_string(),
        TypeKind::Simple { name } => format!("SimpleType {}", name),
        TypeKind::TypedField { name: Some(name) } => format!("TypedField {}", name),
        TypeKind::TypedField { name: None } => "TypedField".to_string(),
        TypeKind::Compound => "CompoundType".to_string(),
        TypeKind::Template { name } => format!("TemplateType {}", name),
        TypeKind::Parameter { name } => format!("ParameterType ${}", name),
        TypeKind::FunctionType => "FunctionType".to_string(),
        TypeKind::NestedType => "NestedType".to_string(),
        TypeKind::MergedType => "MergedType".to_string(),
        TypeKind::InlineDeclaration { symbol: Some(sym) } => format!("InlineDeclaration .{}", sym),
        TypeKind::InlineDeclaration { symbol: None } => "InlineDeclaration".to_string(),
        TypeKind::InlineType => "InlineType".to_string(),
    }
}
