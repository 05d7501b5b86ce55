//! Case-normalization pass (spec §4.3 / invariant P5): the parser emits the
//! AST with identifiers, type lexemes, operation/comparison text, and
//! function names exactly as spelled in the source; this pass lowercases
//! all of those in place before semantic analysis sees the tree.
//! `Modification` lexemes (`:=`, `+=`, `-=`, `*=`) are exempt since they
//! carry no letter case to begin with, matching the exemption spec §4.3
//! calls out.
use crate::ast::*;

/// Lowercase every case-normalized lexeme in `program` and return it.
pub fn build(mut program: Program) -> Program {
    normalize_header(&mut program.header);
    if let Some(const_decl) = &mut program.const_decl {
        normalize_const_decl(const_decl);
    }
    if let Some(var_decl) = &mut program.var_decl {
        normalize_var_decl(var_decl);
    }
    normalize_block(&mut program.block);
    program
}

fn normalize_header(header: &mut Header) {
    normalize_id(&mut header.name);
}

fn normalize_id(id: &mut Id) {
    id.text = id.text.to_lowercase();
}

fn normalize_const_decl(decl: &mut ConstDecl) {
    for declaration in &mut decl.declarations {
        normalize_id(&mut declaration.name);
        normalize_expression(&mut declaration.init);
    }
}

fn normalize_var_decl(decl: &mut VarDecl) {
    for declaration in &mut decl.declarations {
        for name in &mut declaration.names {
            normalize_id(name);
        }
        normalize_var_type(&mut declaration.var_type);
    }
}

fn normalize_var_type(var_type: &mut VarType) {
    match var_type {
        VarType::Simple(simple) => normalize_simple_type(simple),
        VarType::Array(array) => normalize_simple_type(&mut array.element),
    }
}

fn normalize_simple_type(simple: &mut SimpleType) {
    simple.lexeme = simple.lexeme.to_lowercase();
}

fn normalize_block(block: &mut Block) {
    for statement in &mut block.statements {
        normalize_statement(statement);
    }
}

fn normalize_statement(statement: &mut Statement) {
    match statement {
        Statement::Block(block) => normalize_block(block),
        Statement::Assignment(assignment) => normalize_assignment(assignment),
        Statement::While(while_loop) => {
            normalize_bool_expr(&mut while_loop.condition);
            normalize_statement(&mut while_loop.body);
        }
        Statement::Branch(branch) => {
            normalize_bool_expr(&mut branch.condition);
            normalize_statement(&mut branch.then_branch);
            if let Some(else_branch) = &mut branch.else_branch {
                normalize_statement(else_branch);
            }
        }
        Statement::FunctionCall(call) => normalize_function_call(call),
    }
}

fn normalize_assignment(assignment: &mut Assignment) {
    normalize_target(&mut assignment.target);
    // `assignment.modification.text` is intentionally left untouched.
    normalize_expression(&mut assignment.expression);
}

fn normalize_target(target: &mut AssignTarget) {
    match target {
        AssignTarget::Id(id) => normalize_id(id),
        AssignTarget::Cell(cell) => normalize_cell(cell),
    }
}

fn normalize_cell(cell: &mut Cell) {
    normalize_id(&mut cell.variable);
    normalize_expression(&mut cell.index);
}

fn normalize_function_call(call: &mut FunctionCall) {
    call.name.text = call.name.text.to_lowercase();
    for variable in &mut call.variables {
        normalize_target(variable);
    }
    for argument in &mut call.arguments {
        normalize_expression(argument);
    }
}

fn normalize_bool_expr(bool_expr: &mut BoolExpr) {
    normalize_expression(&mut bool_expr.left);
    bool_expr.op.text = bool_expr.op.text.to_lowercase();
    normalize_expression(&mut bool_expr.right);
}

fn normalize_expression(expression: &mut Expression) {
    match &mut expression.kind {
        ExpressionKind::Atomic { signs, atom } => {
            for sign in signs {
                sign.text = sign.text.to_lowercase();
            }
            normalize_atom(atom);
        }
        ExpressionKind::Bracketed { inner } => normalize_expression(inner),
        ExpressionKind::Binary { left, op, right } => {
            normalize_expression(left);
            op.text = op.text.to_lowercase();
            normalize_expression(right);
        }
    }
}

fn normalize_atom(atom: &mut Atom) {
    match atom {
        Atom::Id(id) => normalize_id(id),
        Atom::Int(_) => {}
        // Char/string literal bodies are data, not lexemes; left untouched.
        Atom::Char(_) => {}
        Atom::Str(_) => {}
        Atom::Cell(cell) => normalize_cell(cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn build_source(src: &str) -> Program {
        let tokens = Lexer::new(src).lex().unwrap();
        let tree = Parser::new(tokens).parse_program().unwrap();
        build(tree)
    }

    #[test]
    fn lowercases_identifiers_and_types() {
        let program = build_source(
            "Program Demo; Var A: INTEGER; begin A := 1; end.",
        );
        assert_eq!(program.header.name.text, "demo");
        let var_decl = program.var_decl.unwrap();
        assert_eq!(var_decl.declarations[0].names[0].text, "a");
        match &var_decl.declarations[0].var_type {
            VarType::Simple(simple) => assert_eq!(simple.lexeme, "integer"),
            VarType::Array(_) => panic!("expected simple type"),
        }
    }

    #[test]
    fn leaves_modification_lexeme_untouched() {
        let program = build_source("program P; var a: integer; begin a := 1; end.");
        match &program.block.statements[0] {
            Statement::Assignment(assignment) => {
                assert_eq!(assignment.modification.text, ":=");
            }
            _ => panic!("expected assignment"),
        }
    }

    #[test]
    fn leaves_string_literal_body_untouched() {
        let program = build_source("program P; begin writeln('Hello World'); end.");
        match &program.block.statements[0] {
            Statement::FunctionCall(call) => {
                let Expression {
                    kind: ExpressionKind::Atomic { atom, .. },
                    ..
                } = &call.arguments[0]
                else {
                    panic!("expected atomic expression");
                };
                match atom {
                    Atom::Str(s) => assert_eq!(s.text, "Hello World"),
                    _ => panic!("expected string literal"),
                }
            }
            _ => panic!("expected function call"),
        }
    }
}
