//! Built-in types and their handlers.
//!
//! Operators reach the primitives as messages after desugaring: `a + b` is
//! `(a .+) b`, so `Number` answers `.+` with a function `Number -> Number`.

use crate::scope::{ScopeId, Scopes};
use crate::ty::{Shape, TypeId, TypeTable};

/// Ids of the built-in descriptors of one [`TypeTable`].
#[derive(Clone, Debug)]
pub struct Builtins {
    pub nothing: TypeId,
    pub anything: TypeId,
    pub never: TypeId,
    /// `()`, the empty compound.
    pub empty: TypeId,
    pub boolean: TypeId,
    pub number: TypeId,
    pub string: TypeId,
    pub symbol: TypeId,
    /// The `Array($Item)` template.
    pub array: TypeId,
    pub array_item: TypeId,
}

impl Builtins {
    /// Stand-in used while the table registers the real ones.
    pub(crate) fn placeholder() -> Self {
        let none = TypeId(u32::MAX);
        Builtins {
            nothing: none,
            anything: none,
            never: none,
            empty: none,
            boolean: none,
            number: none,
            string: none,
            symbol: none,
            array: none,
            array_item: none,
        }
    }

    /// Named types visible in every program.
    pub fn named(&self) -> [(&'static str, TypeId); 7] {
        [
            ("Nothing", self.nothing),
            ("Anything", self.anything),
            ("Boolean", self.boolean),
            ("Number", self.number),
            ("String", self.string),
            ("Symbol", self.symbol),
            ("Array", self.array),
        ]
    }
}

const ARITHMETIC: [&str; 5] = ["+", "-", "*", "/", "%"];
const COMPARISON: [&str; 6] = ["<", "<=", ">", ">=", "==", "!="];

pub(crate) fn register(table: &mut TypeTable) -> Builtins {
    let nothing = table.alloc(Some("Nothing"), Shape::Nothing);
    let anything = table.alloc(Some("Anything"), Shape::Anything);
    let never = table.alloc(Some("Never"), Shape::Never);
    let empty = table.compound(Vec::new());
    let boolean = table.alloc(Some("Boolean"), Shape::Simple);
    let number = table.alloc(Some("Number"), Shape::Simple);
    let string = table.alloc(Some("String"), Shape::Simple);
    let symbol = table.alloc(Some("Symbol"), Shape::Simple);

    let number_op = table.function(number, number);
    let number_test = table.function(number, boolean);
    for op in ARITHMETIC {
        table.add_symbol_handler(number, op, number_op);
    }
    for op in COMPARISON {
        table.add_symbol_handler(number, op, number_test);
    }
    table.add_symbol_handler(number, "negative", number);

    let boolean_test = table.function(boolean, boolean);
    table.add_symbol_handler(boolean, "not", boolean);
    table.add_symbol_handler(boolean, "==", boolean_test);
    table.add_symbol_handler(boolean, "!=", boolean_test);

    let concat = table.function(string, string);
    let string_test = table.function(string, boolean);
    table.add_symbol_handler(string, "+", concat);
    table.add_symbol_handler(string, "==", string_test);
    table.add_symbol_handler(string, "length", number);

    let symbol_test = table.function(symbol, boolean);
    table.add_symbol_handler(symbol, "==", symbol_test);

    let array_item = table.wildcard("$Item");
    let array = table.alloc(Some("Array"), Shape::Simple);
    table.get_mut(array).params = vec![array_item];
    let at = table.function(number, array_item);
    let append = table.function(array_item, array);
    table.add_symbol_handler(array, "length", number);
    table.add_symbol_handler(array, "first", array_item);
    table.add_symbol_handler(array, "at", at);
    table.add_symbol_handler(array, "append", append);

    Builtins {
        nothing,
        anything,
        never,
        empty,
        boolean,
        number,
        string,
        symbol,
        array,
        array_item,
    }
}

/// Bind the built-in type names in `scope`.
pub fn declare_types(table: &TypeTable, types: &mut Scopes<TypeId>, scope: ScopeId) {
    for (name, id) in table.builtins().named() {
        types.add(scope, name, id);
    }
}

/// Term-level built-ins: `(name, type)` pairs, all immutable.
pub fn terms(table: &mut TypeTable) -> Vec<(&'static str, TypeId)> {
    let b = table.builtins().clone();
    let print = table.function(b.anything, b.nothing);
    vec![("print", print)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_answer_operators() {
        let table = TypeTable::new();
        let b = table.builtins();
        let plus = table.symbol_handler(b.number, "+");
        assert_eq!(
            plus.map(|t| table.display(t).to_string()).as_deref(),
            Some("Number -> Number")
        );
        assert_eq!(table.symbol_handler(b.number, "negative"), Some(b.number));
        assert_eq!(table.symbol_handler(b.boolean, "not"), Some(b.boolean));
        assert_eq!(table.symbol_handler(b.string, "length"), Some(b.number));
        assert!(table.symbol_handler(b.boolean, "+").is_none());
    }

    #[test]
    fn array_is_a_template() {
        let table = TypeTable::new();
        let b = table.builtins();
        assert_eq!(table.get(b.array).params, vec![b.array_item]);
        assert_eq!(table.display(b.array_item).to_string(), "$Item");
        assert_eq!(table.display(b.empty).to_string(), "()");
    }
}
