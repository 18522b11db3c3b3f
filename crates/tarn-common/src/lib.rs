//! Shared types for the Tarn compiler: byte spans and tokens.
//!
//! The tokenizer itself lives outside the core. These types are the contract
//! between the tokenizer, the syntax tree, and every later phase.

pub mod span;
pub mod token;

pub use span::{LineIndex, Span};
pub use token::{Keyword, Token, TokenKind};
