//! Single-pass semantic analyser (spec §4.5): type checks, declaration
//! legality, writes a resolved [`ScalarType`] into every typed node, and
//! builds the [`SymbolTable`]. Fails fast: the first violation aborts the
//! pass and no partial table is returned (spec §4.5 "Failure semantics").
//!
//! Grounded in `libpas/ast/detail/Checker.cpp`'s per-node `visit` dispatch,
//! translated from `accept`/`visit` double-dispatch into a tree of plain
//! functions matching on the node enums (spec design note: "functionally
//! it is a pattern match").
use std::fmt::Display;

use crate::ast::*;
use crate::symbol::{Form, ModType, ScalarType, Symbol, SymbolTable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError(pub String);

impl Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl std::error::Error for SemanticError {}

type SResult<T> = Result<T, SemanticError>;

fn err(message: impl Into<String>) -> SemanticError {
    SemanticError(message.into())
}

/// Analyse `program` in place, returning the symbol table built along the
/// way. Traversal order: header, then constants, then variables, then the
/// main block (spec §4.5).
pub fn analyse(program: &mut Program) -> SResult<SymbolTable> {
    let mut table = SymbolTable::new();
    table.insert(
        program.header.name.text.clone(),
        Symbol::new(Form::ProgramName, ScalarType::None),
    );

    if let Some(const_decl) = &mut program.const_decl {
        for declaration in &mut const_decl.declarations {
            check_const_declaration(declaration, &mut table)?;
        }
    }

    if let Some(var_decl) = &mut program.var_decl {
        for declaration in &mut var_decl.declarations {
            check_declaration(declaration, &mut table)?;
        }
    }

    check_block(&mut program.block, &table)?;
    Ok(table)
}

fn check_const_declaration(decl: &mut ConstDeclaration, table: &mut SymbolTable) -> SResult<()> {
    if table.contains_key(&decl.name.text) {
        return Err(err(format!(
            "Repeat declaration of const identifier '{}'",
            decl.name.text
        )));
    }
    let ty = check_expression(&mut decl.init, table)?;
    table.insert(decl.name.text.clone(), Symbol::new(Form::Constant, ty));
    Ok(())
}

fn check_declaration(decl: &mut Declaration, table: &mut SymbolTable) -> SResult<()> {
    let (form, ty) = resolve_var_type(&decl.var_type)?;
    for name in &decl.names {
        if table.contains_key(&name.text) {
            return Err(err(format!(
                "Repeat declaration of identifier '{}'",
                name.text
            )));
        }
        table.insert(name.text.clone(), Symbol::new(form, ty));
    }
    Ok(())
}

fn resolve_var_type(var_type: &VarType) -> SResult<(Form, ScalarType)> {
    match var_type {
        VarType::Simple(simple) => Ok((Form::Variable, scalar_from_lexeme(&simple.lexeme))),
        VarType::Array(array) => {
            let element = scalar_from_lexeme(&array.element.lexeme);
            if element == ScalarType::String {
                return Err(err("Incompatible array type of array"));
            }
            Ok((Form::Array, element))
        }
    }
}

fn scalar_from_lexeme(lexeme: &str) -> ScalarType {
    match lexeme {
        "integer" => ScalarType::Integer,
        "char" => ScalarType::Char,
        "string" => ScalarType::String,
        _ => ScalarType::None,
    }
}

fn check_block(block: &mut Block, table: &SymbolTable) -> SResult<()> {
    for statement in &mut block.statements {
        check_statement(statement, table)?;
    }
    Ok(())
}

fn check_statement(statement: &mut Statement, table: &SymbolTable) -> SResult<()> {
    match statement {
        Statement::Block(block) => check_block(block, table),
        Statement::Assignment(assignment) => check_assignment(assignment, table),
        Statement::While(while_loop) => {
            check_bool_expr(&mut while_loop.condition, table)?;
            check_statement(&mut while_loop.body, table)
        }
        Statement::Branch(branch) => {
            check_bool_expr(&mut branch.condition, table)?;
            check_statement(&mut branch.then_branch, table)?;
            if let Some(else_branch) = &mut branch.else_branch {
                check_statement(else_branch, table)?;
            }
            Ok(())
        }
        Statement::FunctionCall(call) => check_function_call(call, table),
    }
}

fn check_assignment(assignment: &mut Assignment, table: &SymbolTable) -> SResult<()> {
    let name = assignment.target.text().to_string();
    let is_constant = table
        .get(&name)
        .map(|s| s.form() == Form::Constant)
        .unwrap_or(false);
    let target_ty = check_target(&mut assignment.target, table)?;

    if is_constant {
        return Err(err(format!(
            "Cannot assign new value to constant '{name}'"
        )));
    }

    match assignment.modification.kind {
        ModType::Assignment => {}
        ModType::Add => {
            if target_ty == ScalarType::Char {
                return Err(err("Incompatible operation for char expression"));
            }
        }
        ModType::Reduce | ModType::Multiply => {
            if target_ty == ScalarType::String {
                return Err(err("Incompatible operation for string expression"));
            }
            if target_ty == ScalarType::Char {
                return Err(err("Incompatible operation for char expression"));
            }
        }
    }

    let rhs_ty = check_expression(&mut assignment.expression, table)?;
    let compatible =
        rhs_ty == target_ty || (target_ty == ScalarType::String && rhs_ty == ScalarType::Char);
    if !compatible {
        return Err(err("Incompatible operands types for assignment"));
    }
    Ok(())
}

fn check_function_call(call: &mut FunctionCall, table: &SymbolTable) -> SResult<()> {
    use crate::symbol::FuncName;
    match call.name.kind {
        FuncName::Readln => {
            if !call.arguments.is_empty() {
                return Err(err(
                    "Only identifiers or array cells expected in read function arguments",
                ));
            }
            for variable in &mut call.variables {
                let name = variable.text().to_string();
                check_target(variable, table)?;
                if table
                    .get(&name)
                    .map(|s| s.form() == Form::Constant)
                    .unwrap_or(false)
                {
                    return Err(err(format!(
                        "Cannot assign new value to constant '{name}'"
                    )));
                }
            }
        }
        FuncName::Write | FuncName::Writeln => {
            for variable in &mut call.variables {
                check_target(variable, table)?;
            }
            for argument in &mut call.arguments {
                check_expression(argument, table)?;
            }
        }
    }
    Ok(())
}

fn check_target(target: &mut AssignTarget, table: &SymbolTable) -> SResult<ScalarType> {
    match target {
        AssignTarget::Id(id) => check_id(id, table),
        AssignTarget::Cell(cell) => check_cell(cell, table),
    }
}

fn check_bool_expr(bool_expr: &mut BoolExpr, table: &SymbolTable) -> SResult<ScalarType> {
    let left = check_expression(&mut bool_expr.left, table)?;
    let right = check_expression(&mut bool_expr.right, table)?;
    if left != right {
        return Err(err("Different types of boolean expression operands"));
    }
    bool_expr.ty = left;
    Ok(left)
}

fn check_expression(expression: &mut Expression, table: &SymbolTable) -> SResult<ScalarType> {
    let ty = match &mut expression.kind {
        ExpressionKind::Atomic { signs, atom } => {
            let atom_ty = check_atom(atom, table)?;
            if !signs.is_empty() && atom_ty != ScalarType::Integer {
                return Err(err("Only integer expression can be signed"));
            }
            atom_ty
        }
        ExpressionKind::Bracketed { inner } => check_expression(inner, table)?,
        ExpressionKind::Binary { left, right, .. } => {
            let left_ty = check_expression(left, table)?;
            let right_ty = check_expression(right, table)?;
            if left_ty != right_ty || left_ty != ScalarType::Integer {
                return Err(err("Incompatible operands types for expression"));
            }
            ScalarType::Integer
        }
    };
    expression.ty = ty;
    Ok(ty)
}

fn check_atom(atom: &mut Atom, table: &SymbolTable) -> SResult<ScalarType> {
    match atom {
        Atom::Id(id) => check_id(id, table),
        Atom::Int(_) => Ok(ScalarType::Integer),
        Atom::Char(_) => Ok(ScalarType::Char),
        Atom::Str(_) => Ok(ScalarType::String),
        Atom::Cell(cell) => check_cell(cell, table),
    }
}

fn check_id(id: &mut Id, table: &SymbolTable) -> SResult<ScalarType> {
    let symbol = table
        .get(&id.text)
        .ok_or_else(|| err(format!("Unknown identifier '{}'", id.text)))?;
    if symbol.form() == Form::Array {
        return Err(err(format!("'{}' is an array name", id.text)));
    }
    if symbol.form() == Form::ProgramName {
        return Err(err(format!("'{}' is a program name", id.text)));
    }
    id.ty = symbol.ty();
    Ok(symbol.ty())
}

fn check_cell(cell: &mut Cell, table: &SymbolTable) -> SResult<ScalarType> {
    let symbol = table.get(&cell.variable.text).ok_or_else(|| {
        err(format!(
            "Unknown identifier '{}' in array name",
            cell.variable.text
        ))
    })?;
    let is_array = symbol.form() == Form::Array;
    let is_string = symbol.ty() == ScalarType::String;
    if !is_array && !is_string {
        return Err(err(format!(
            "Identifier '{}' is not an array or string name",
            cell.variable.text
        )));
    }
    let element_ty = symbol.ty();
    let index_ty = check_expression(&mut cell.index, table)?;
    if index_ty != ScalarType::Integer {
        return Err(err(format!(
            "Invalid index type of '{}'",
            cell.variable.text
        )));
    }
    let result_ty = if is_string {
        ScalarType::Char
    } else {
        element_ty
    };
    cell.ty = result_ty;
    cell.variable.ty = symbol.ty();
    Ok(result_ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn analyse_source(src: &str) -> Result<SymbolTable, SemanticError> {
        let tokens = Lexer::new(src).lex().unwrap();
        let tree = Parser::new(tokens).parse_program().unwrap();
        let mut program = build(tree);
        analyse(&mut program)
    }

    #[test]
    fn accepts_hello_world() {
        let table = analyse_source(
            "program HelloWorld; begin writeln('Hello world!'); end.",
        )
        .unwrap();
        assert!(table.contains_key("helloworld"));
    }

    #[test]
    fn rejects_duplicate_const() {
        let result = analyse_source("program P; const a = 42; a = 69; begin end.");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Error: Repeat declaration of const identifier 'a'"
        );
    }

    #[test]
    fn rejects_compound_char_modification() {
        let result =
            analyse_source("program P; var a: char; begin a += 'a'; end.");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Error: Incompatible operation for char expression"
        );
    }

    #[test]
    fn rejects_unknown_array_identifier() {
        let result = analyse_source("program P; begin a[1] := 42; end.");
        assert_eq!(
            result.unwrap_err().to_string(),
            "Error: Unknown identifier 'a' in array name"
        );
    }

    #[test]
    fn resolves_cell_type_to_char_for_string_symbols() {
        let tokens = Lexer::new(
            "program P; var s: string; c: char; begin c := s[1]; end.",
        )
        .lex()
        .unwrap();
        let tree = Parser::new(tokens).parse_program().unwrap();
        let mut program = build(tree);
        analyse(&mut program).unwrap();
        let Statement::Assignment(assignment) = &program.block.statements[0] else {
            panic!("expected assignment");
        };
        match &assignment.expression.kind {
            ExpressionKind::Atomic { atom: Atom::Cell(cell), .. } => {
                assert_eq!(cell.ty, ScalarType::Char);
            }
            _ => panic!("expected a cell atom"),
        }
    }

    #[test]
    fn string_target_accepts_char_rhs() {
        analyse_source("program P; var s: string; begin s := 'a'; end.").unwrap();
    }
}
