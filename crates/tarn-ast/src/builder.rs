//! Source-ordered tree construction.
//!
//! The tokenizer and grammar live outside the core; this builder is the
//! small producer used by embedders and tests. Every call "lexes" its tokens
//! at the end of a growing source string, so spans are real byte ranges and
//! [`Builder::source`] is text the spans point into. Sub-trees are supplied
//! as closures so that they are emitted in source order.

use tarn_common::{Keyword, Token, TokenKind};

use crate::kind::{ConstKind, Constant, ExprKind, TypeKind};
use crate::tree::{Ast, Element, NodeId};

#[derive(Debug, Default)]
pub struct Builder {
    ast: Ast,
    source: String,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn finish(self) -> (Ast, String) {
        (self.ast, self.source)
    }

    // ── Tokens ─────────────────────────────────────────────────────────

    /// Lex one token at the end of the source, separated by a space.
    pub fn token(&mut self, kind: TokenKind, text: &str) -> Token {
        if !self.source.is_empty() {
            self.source.push(' ');
        }
        let start = self.source.len() as u32;
        self.source.push_str(text);
        Token::new(kind, text, start, self.source.len() as u32)
    }

    fn keyword(&mut self, keyword: Keyword) -> Token {
        self.token(TokenKind::Keyword(keyword), keyword.text())
    }

    fn punct(&mut self, text: &str) -> Token {
        self.token(TokenKind::Punctuation, text)
    }

    fn operator(&mut self, op: &str) -> Token {
        match op {
            "and" => self.keyword(Keyword::And),
            "or" => self.keyword(Keyword::Or),
            "not" => self.keyword(Keyword::Not),
            _ => self.token(TokenKind::Operator, op),
        }
    }

    fn constant(&mut self, kind: TokenKind, text: &str, constant: Constant) -> NodeId {
        let token = self.token(kind, text);
        self.ast.leaf(ExprKind::Constant(constant), token.span)
    }

    // ── Leaves ─────────────────────────────────────────────────────────

    /// A numeric literal; `0x`, `0o` and `0b` prefixes select the base.
    pub fn number(&mut self, text: &str) -> NodeId {
        let base = match text.get(..2) {
            Some("0x") => 16,
            Some("0o") => 8,
            Some("0b") => 2,
            _ => 10,
        };
        let constant = Constant {
            kind: ConstKind::Number { base },
            value: text.to_string(),
        };
        self.constant(TokenKind::Number, text, constant)
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        let text = format!("{:?}", value);
        let constant = Constant {
            kind: ConstKind::String,
            value: value.to_string(),
        };
        self.constant(TokenKind::String, &text, constant)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        let text = if value { "true" } else { "false" };
        let constant = Constant {
            kind: ConstKind::Boolean,
            value: text.to_string(),
        };
        self.constant(TokenKind::Identifier, text, constant)
    }

    pub fn nothing(&mut self) -> NodeId {
        self.constant(TokenKind::Punctuation, "()", Constant::nothing())
    }

    /// A symbol literal, written `.name`.
    pub fn symbol(&mut self, name: &str) -> NodeId {
        let text = format!(".{}", name);
        self.constant(TokenKind::Symbol, &text, Constant::symbol(name))
    }

    pub fn reference(&mut self, name: &str) -> NodeId {
        let token = self.token(TokenKind::Identifier, name);
        self.ast.leaf(
            ExprKind::Reference {
                name: name.to_string(),
            },
            token.span,
        )
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub fn nested(&mut self, inner: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let open = self.punct("(");
        let inner = inner(self);
        let close = self.punct(")");
        self.ast
            .alloc(ExprKind::Nested, vec![open.into(), inner.into(), close.into()])
    }

    pub fn unary(&mut self, op: &str, operand: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let token = self.operator(op);
        let operand = operand(self);
        self.ast.alloc(
            ExprKind::Unary { op: op.to_string() },
            vec![token.into(), operand.into()],
        )
    }

    pub fn binary(
        &mut self,
        lhs: impl FnOnce(&mut Self) -> NodeId,
        op: &str,
        rhs: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let lhs = lhs(self);
        let token = self.operator(op);
        let rhs = rhs(self);
        self.ast.alloc(
            ExprKind::Binary { op: op.to_string() },
            vec![lhs.into(), token.into(), rhs.into()],
        )
    }

    pub fn call(
        &mut self,
        receiver: impl FnOnce(&mut Self) -> NodeId,
        message: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let receiver = receiver(self);
        let message = message(self);
        self.ast
            .alloc(ExprKind::Call, vec![receiver.into(), message.into()])
    }

    /// `receiver .symbol`
    pub fn send(&mut self, receiver: impl FnOnce(&mut Self) -> NodeId, symbol: &str) -> NodeId {
        self.call(receiver, |b| b.symbol(symbol))
    }

    pub fn if_then(
        &mut self,
        cond: impl FnOnce(&mut Self) -> NodeId,
        then: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let if_kw = self.keyword(Keyword::If);
        let cond = cond(self);
        let then_kw = self.keyword(Keyword::Then);
        let then = then(self);
        self.ast.alloc(
            ExprKind::If,
            vec![if_kw.into(), cond.into(), then_kw.into(), then.into()],
        )
    }

    pub fn if_else(
        &mut self,
        cond: impl FnOnce(&mut Self) -> NodeId,
        then: impl FnOnce(&mut Self) -> NodeId,
        otherwise: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let node = self.if_then(cond, then);
        let else_kw = self.keyword(Keyword::Else);
        let otherwise = otherwise(self);
        self.ast.append(node, vec![else_kw.into(), otherwise.into()]);
        node
    }

    pub fn while_do(
        &mut self,
        cond: impl FnOnce(&mut Self) -> NodeId,
        body: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let while_kw = self.keyword(Keyword::While);
        let cond = cond(self);
        let do_kw = self.keyword(Keyword::Do);
        let body = body(self);
        self.ast.alloc(
            ExprKind::While,
            vec![while_kw.into(), cond.into(), do_kw.into(), body.into()],
        )
    }

    pub fn repeat(&mut self, body: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let kw = self.keyword(Keyword::Repeat);
        let body = body(self);
        self.ast.alloc(ExprKind::Repeat, vec![kw.into(), body.into()])
    }

    pub fn new_object(&mut self, code: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let kw = self.keyword(Keyword::New);
        let code = code(self);
        self.ast.alloc(ExprKind::New, vec![kw.into(), code.into()])
    }

    pub fn block(&mut self, items: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let open = self.punct("{");
        let items = items(self);
        let close = self.punct("}");
        self.ast
            .alloc(ExprKind::Block, vec![open.into(), items.into(), close.into()])
    }

    pub fn array(&mut self, items: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let open = self.punct("[");
        let items = items(self);
        let close = self.punct("]");
        self.ast
            .alloc(ExprKind::Array, vec![open.into(), items.into(), close.into()])
    }

    /// A struct literal `( fields )`.
    pub fn structure(&mut self, fields: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let open = self.punct("(");
        let fields = fields(self);
        let close = self.punct(")");
        self.ast
            .alloc(ExprKind::Struct, vec![open.into(), fields.into(), close.into()])
    }

    /// A struct field, `name: value` or just `value`.
    pub fn field(&mut self, name: Option<&str>, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let label = name.map(|n| {
            vec![
                self.token(TokenKind::Identifier, n),
                self.punct(":"),
            ]
        });
        let value = value(self);
        self.ast.alloc(
            ExprKind::StructField {
                name: name.map(str::to_string),
            },
            vec![label.into(), value.into()],
        )
    }

    pub fn assign(&mut self, name: &str, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let ident = self.token(TokenKind::Identifier, name);
        let op = self.token(TokenKind::Operator, ":=");
        let value = value(self);
        self.ast.alloc(
            ExprKind::Assignment {
                name: name.to_string(),
            },
            vec![ident.into(), op.into(), value.into()],
        )
    }

    /// A single local declaration without its keyword, for [`Builder::locals`].
    pub fn local(
        &mut self,
        name: &str,
        mutable: bool,
        annotation: Option<&dyn Fn(&mut Self) -> NodeId>,
        value: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let ident = self.token(TokenKind::Identifier, name);
        let annotation = annotation.map(|ty| {
            let colon = self.punct(":");
            let ty = ty(self);
            vec![Element::from(colon), ty.into()]
        });
        let eq = self.token(TokenKind::Operator, "=");
        let value = value(self);
        self.ast.alloc(
            ExprKind::Local {
                name: name.to_string(),
                mutable,
            },
            vec![ident.into(), annotation.into(), eq.into(), value.into()],
        )
    }

    /// `let`/`var` followed by the locals built by `locals`.
    pub fn locals(&mut self, mutable: bool, locals: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let kw = self.keyword(if mutable { Keyword::Var } else { Keyword::Let });
        let locals = locals(self);
        self.ast
            .alloc(ExprKind::Locals, vec![kw.into(), locals.into()])
    }

    /// `let name = value`
    pub fn let_(&mut self, name: &str, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        self.locals(false, |b| vec![b.local(name, false, None, value)])
    }

    /// `var name = value`
    pub fn var(&mut self, name: &str, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        self.locals(true, |b| vec![b.local(name, true, None, value)])
    }

    /// `let name: annotation = value`
    pub fn let_typed(
        &mut self,
        name: &str,
        annotation: &dyn Fn(&mut Self) -> NodeId,
        value: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        self.locals(false, |b| vec![b.local(name, false, Some(annotation), value)])
    }

    pub fn return_(&mut self, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let kw = self.keyword(Keyword::Return);
        let value = value(self);
        self.ast.alloc(ExprKind::Return, vec![kw.into(), value.into()])
    }

    pub fn return_empty(&mut self) -> NodeId {
        let kw = self.keyword(Keyword::Return);
        self.ast.alloc(ExprKind::Return, vec![kw.into()])
    }

    pub fn break_(&mut self, value: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let kw = self.keyword(Keyword::Break);
        let value = value(self);
        self.ast.alloc(ExprKind::Break, vec![kw.into(), value.into()])
    }

    pub fn break_empty(&mut self) -> NodeId {
        let kw = self.keyword(Keyword::Break);
        self.ast.alloc(ExprKind::Break, vec![kw.into()])
    }

    /// `on Input [-> Output] body`; `signature` yields the input type and
    /// the optional output type.
    pub fn on(
        &mut self,
        signature: impl FnOnce(&mut Self) -> (NodeId, Option<NodeId>),
        body: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let kw = self.keyword(Keyword::On);
        let (input, output) = signature(self);
        let body = body(self);
        self.ast.alloc(
            ExprKind::On,
            vec![kw.into(), input.into(), output.into(), body.into()],
        )
    }

    /// `fn [Input] [-> Output] body`
    pub fn function(
        &mut self,
        signature: impl FnOnce(&mut Self) -> (Option<NodeId>, Option<NodeId>),
        body: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let kw = self.keyword(Keyword::Fn);
        let (input, output) = signature(self);
        let body = body(self);
        self.ast.alloc(
            ExprKind::Function {
                input: input.is_some(),
                output: output.is_some(),
            },
            vec![kw.into(), input.into(), output.into(), body.into()],
        )
    }

    // ── Types ──────────────────────────────────────────────────────────

    pub fn empty_type(&mut self) -> NodeId {
        let token = self.punct("()");
        self.ast.alloc(TypeKind::Empty, vec![token.into()])
    }

    pub fn simple_type(&mut self, name: &str) -> NodeId {
        let token = self.token(TokenKind::Identifier, name);
        self.ast.alloc(
            TypeKind::Simple {
                name: name.to_string(),
            },
            vec![token.into()],
        )
    }

    /// `$name`
    pub fn parameter_type(&mut self, name: &str) -> NodeId {
        let token = self.token(TokenKind::Identifier, &format!("${}", name));
        self.ast.alloc(
            TypeKind::Parameter {
                name: name.to_string(),
            },
            vec![token.into()],
        )
    }

    pub fn typed_field(&mut self, name: Option<&str>, ty: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let label = name.map(|n| vec![self.token(TokenKind::Identifier, n), self.punct(":")]);
        let ty = ty(self);
        self.ast.alloc(
            TypeKind::TypedField {
                name: name.map(str::to_string),
            },
            vec![label.into(), ty.into()],
        )
    }

    /// `name: Type = default`
    pub fn typed_field_default(
        &mut self,
        name: &str,
        ty: impl FnOnce(&mut Self) -> NodeId,
        default: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let field = self.typed_field(Some(name), ty);
        let eq = self.token(TokenKind::Operator, "=");
        let default = default(self);
        self.ast.append(field, vec![eq.into(), default.into()]);
        field
    }

    pub fn compound_type(&mut self, fields: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let open = self.punct("(");
        let fields = fields(self);
        let close = self.punct(")");
        self.ast
            .alloc(TypeKind::Compound, vec![open.into(), fields.into(), close.into()])
    }

    /// `Name(Args…)`
    pub fn template_type(&mut self, name: &str, args: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let ident = self.token(TokenKind::Identifier, name);
        let open = self.punct("(");
        let args = args(self);
        let close = self.punct(")");
        self.ast.alloc(
            TypeKind::Template {
                name: name.to_string(),
            },
            vec![ident.into(), open.into(), args.into(), close.into()],
        )
    }

    /// `Arg -> Result`
    pub fn function_type(
        &mut self,
        arg: impl FnOnce(&mut Self) -> NodeId,
        result: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let arg = arg(self);
        let arrow = self.token(TokenKind::Operator, "->");
        let result = result(self);
        self.ast.alloc(
            TypeKind::FunctionType,
            vec![arg.into(), arrow.into(), result.into()],
        )
    }

    pub fn nested_type(&mut self, inner: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let open = self.punct("(");
        let inner = inner(self);
        let close = self.punct(")");
        self.ast
            .alloc(TypeKind::NestedType, vec![open.into(), inner.into(), close.into()])
    }

    /// `A | B | …`
    pub fn merged_type(&mut self, alternatives: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let alternatives = alternatives(self);
        self.ast.alloc(TypeKind::MergedType, vec![alternatives.into()])
    }

    /// `{ declarations }`
    pub fn inline_type(&mut self, declarations: impl FnOnce(&mut Self) -> Vec<NodeId>) -> NodeId {
        let open = self.punct("{");
        let declarations = declarations(self);
        let close = self.punct("}");
        self.ast.alloc(
            TypeKind::InlineType,
            vec![open.into(), declarations.into(), close.into()],
        )
    }

    /// `.symbol -> Result` inside an inline type.
    pub fn symbol_declaration(&mut self, symbol: &str, result: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        let sym = self.token(TokenKind::Symbol, &format!(".{}", symbol));
        let arrow = self.token(TokenKind::Operator, "->");
        let result = result(self);
        self.ast.alloc(
            TypeKind::InlineDeclaration {
                symbol: Some(symbol.to_string()),
            },
            vec![sym.into(), arrow.into(), result.into()],
        )
    }

    /// `Guard -> Result` inside an inline type.
    pub fn guard_declaration(
        &mut self,
        guard: impl FnOnce(&mut Self) -> NodeId,
        result: impl FnOnce(&mut Self) -> NodeId,
    ) -> NodeId {
        let guard = guard(self);
        let arrow = self.token(TokenKind::Operator, "->");
        let result = result(self);
        self.ast.alloc(
            TypeKind::InlineDeclaration { symbol: None },
            vec![guard.into(), arrow.into(), result.into()],
        )
    }
}
