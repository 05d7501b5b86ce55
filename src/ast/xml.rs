//! Deterministic XML dump of a [`Program`](super::Program), exposed via
//! `--dump-ast`. Carries no semantics; it is the ground truth for parser
//! tests (spec §4.4). Grounded in `libpas/ast/XmlSerializer.cpp`'s tag set
//! and infix expression-dump convention.
use std::fmt::Write as _;

use super::*;

const INDENT: &str = "  ";

/// Render `program` as a `<pascal>`-rooted XML document, two-space indented.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();
    let mut w = Writer { out: &mut out, depth: 0 };
    w.open("pascal");
    w.header(&program.header);
    if let Some(const_decl) = &program.const_decl {
        w.const_decl(const_decl);
    }
    if let Some(var_decl) = &program.var_decl {
        w.var_decl(var_decl);
    }
    w.block(&program.block);
    w.close("pascal");
    out
}

struct Writer<'a> {
    out: &'a mut String,
    depth: usize,
}

impl<'a> Writer<'a> {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn open(&mut self, tag: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{tag}>");
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.indent();
        let _ = writeln!(self.out, "</{tag}>");
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.indent();
        let _ = writeln!(self.out, "<{tag}>{}</{tag}>", escape(text));
    }

    fn header(&mut self, header: &Header) {
        self.open("progname");
        self.leaf("id", &header.name.text);
        self.close("progname");
    }

    fn const_decl(&mut self, decl: &ConstDecl) {
        self.open("constdecl");
        for declaration in &decl.declarations {
            self.open("constdeclaration");
            self.leaf("constname", &declaration.name.text);
            self.open("value");
            self.expression(&declaration.init);
            self.close("value");
            self.close("constdeclaration");
        }
        self.close("constdecl");
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.open("vardecl");
        for declaration in &decl.declarations {
            self.open("declaration");
            for name in &declaration.names {
                self.leaf("varname", &name.text);
            }
            self.var_type(&declaration.var_type);
            self.close("declaration");
        }
        self.close("vardecl");
    }

    fn var_type(&mut self, var_type: &VarType) {
        match var_type {
            VarType::Simple(simple) => self.leaf("vartype", &simple.lexeme),
            VarType::Array(array) => {
                self.open("arraytype");
                self.open("interval");
                self.leaf("lborder", &array.interval.lower.text);
                self.leaf("rborder", &array.interval.upper.text);
                self.close("interval");
                self.leaf("vartype", &array.element.lexeme);
                self.close("arraytype");
            }
        }
    }

    fn block(&mut self, block: &Block) {
        self.open("block");
        for statement in &block.statements {
            self.statement(statement);
        }
        self.close("block");
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.block(block),
            Statement::Assignment(assignment) => self.assignment(assignment),
            Statement::While(while_loop) => self.while_loop(while_loop),
            Statement::Branch(branch) => self.branch(branch),
            Statement::FunctionCall(call) => self.function_call(call),
        }
    }

    fn assignment(&mut self, assignment: &Assignment) {
        self.open("assignment");
        self.open("variable");
        self.target(&assignment.target);
        self.close("variable");
        self.leaf("modification", &assignment.modification.text);
        self.open("value");
        self.expression(&assignment.expression);
        self.close("value");
        self.close("assignment");
    }

    fn target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Id(id) => self.leaf("id", &id.text),
            AssignTarget::Cell(cell) => self.cell(cell),
        }
    }

    fn while_loop(&mut self, while_loop: &While) {
        self.open("whileloop");
        self.open("condition");
        self.bool_expr(&while_loop.condition);
        self.close("condition");
        self.open("body");
        self.statement(&while_loop.body);
        self.close("body");
        self.close("whileloop");
    }

    fn branch(&mut self, branch: &Branch) {
        self.open("branch");
        self.open("condition");
        self.bool_expr(&branch.condition);
        self.close("condition");
        self.open("body");
        self.statement(&branch.then_branch);
        self.close("body");
        if let Some(else_branch) = &branch.else_branch {
            self.open("alternative");
            self.statement(else_branch);
            self.close("alternative");
        }
        self.close("branch");
    }

    fn function_call(&mut self, call: &FunctionCall) {
        self.open("functioncall");
        self.leaf("functionname", &call.name.text);
        for variable in &call.variables {
            self.open("argument");
            self.target(variable);
            self.close("argument");
        }
        for argument in &call.arguments {
            self.open("argument");
            self.expression(argument);
            self.close("argument");
        }
        self.close("functioncall");
    }

    fn bool_expr(&mut self, bool_expr: &BoolExpr) {
        self.expression(&bool_expr.left);
        self.leaf("booloperation", &bool_expr.op.text);
        self.expression(&bool_expr.right);
    }

    fn expression(&mut self, expression: &Expression) {
        if expression.brackets {
            self.open("braces");
        }
        match &expression.kind {
            ExpressionKind::Atomic { signs, atom } => {
                for sign in signs {
                    self.leaf("operation", &sign.text);
                }
                self.atom(atom);
            }
            ExpressionKind::Bracketed { inner } => self.expression(inner),
            ExpressionKind::Binary { left, op, right } => {
                self.expression(left);
                self.leaf("operation", &op.text);
                self.expression(right);
            }
        }
        if expression.brackets {
            self.close("braces");
        }
    }

    fn atom(&mut self, atom: &Atom) {
        match atom {
            Atom::Id(id) => self.leaf("id", &id.text),
            Atom::Int(int) => self.leaf("integer", &int.text),
            Atom::Char(char_lit) => self.leaf("char", &char_lit.text),
            Atom::Str(string_lit) => self.leaf("string", &string_lit.text),
            Atom::Cell(cell) => self.cell(cell),
        }
    }

    fn cell(&mut self, cell: &Cell) {
        self.open("cell");
        self.leaf("id", &cell.variable.text);
        self.open("index");
        self.expression(&cell.index);
        self.close("index");
        self.close("cell");
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn dump_source(src: &str) -> String {
        let tokens = Lexer::new(src).lex().unwrap();
        let tree = Parser::new(tokens).parse_program().unwrap();
        let program = build(tree);
        dump(&program)
    }

    #[test]
    fn root_element_is_pascal() {
        let xml = dump_source("program HelloWorld; begin writeln('Hello world!'); end.");
        assert!(xml.starts_with("<pascal>\n"));
        assert!(xml.trim_end().ends_with("</pascal>"));
    }

    #[test]
    fn is_deterministic() {
        let src = "program HelloWorld; begin writeln('Hello world!'); end.";
        assert_eq!(dump_source(src), dump_source(src));
    }
}
