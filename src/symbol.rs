//! The symbol model: identifier kinds, scalar types, operator kinds, and
//! the per-identifier symbol table entry.
//!
//! Pure data, grounded in `libpas/ast/SymbolTable.hpp`: no behavior beyond
//! storage and the accessors/mutators the other passes need.
use std::collections::HashMap;

/// The kind of entity an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Constant,
    Variable,
    Array,
    ProgramName,
    NoForm,
}

/// The four scalar types a node can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Integer,
    Char,
    String,
    None,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Div,
    Mod,
}

/// Boolean comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Equal,
    NotEqual,
    LessThan,
    MoreThan,
    NotLess,
    NotMore,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModType {
    Assignment,
    Add,
    Reduce,
    Multiply,
}

/// Built-in I/O functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncName {
    Readln,
    Write,
    Writeln,
}

/// `(min_index, size)` for an array-typed symbol. `size = rborder - lborder`,
/// preserved verbatim from the source behavior (see spec design note iii).
pub type ArrayData = (i64, i64);

/// One row of the symbol table.
#[derive(Debug, Clone)]
pub struct Symbol {
    form: Form,
    ty: ScalarType,
    address: Option<i64>,
    array_data: Option<ArrayData>,
}

impl Symbol {
    pub fn new(form: Form, ty: ScalarType) -> Self {
        Self {
            form,
            ty,
            address: None,
            array_data: None,
        }
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn ty(&self) -> ScalarType {
        self.ty
    }

    pub fn address(&self) -> Option<i64> {
        self.address
    }

    pub fn set_address(&mut self, address: i64) {
        self.address = Some(address);
    }

    pub fn set_array_data(&mut self, data: ArrayData) {
        self.array_data = Some(data);
    }

    /// Undefined unless `form() == Form::Array`; callers must gate on that
    /// first (spec design note iv — preserved, not defended against here).
    pub fn min_index(&self) -> i64 {
        self.array_data.expect("min_index on a non-array symbol").0
    }

    /// Undefined unless `form() == Form::Array`; see [`Symbol::min_index`].
    pub fn size(&self) -> i64 {
        self.array_data.expect("size on a non-array symbol").1
    }
}

/// Mapping from case-normalized identifier text to its symbol. Insertion
/// order is irrelevant (invariant I1: at most one entry per identifier).
pub type SymbolTable = HashMap<String, Symbol>;
