//! Hand-written recursive-descent parser over the token stream. Produces
//! the AST directly (see [`crate::builder`] for why there is no separate
//! untyped parse-tree type), in whichever case the source text used;
//! [`crate::builder::build`] is the separate pass that applies the
//! case-normalization rule of spec §4.3.
//!
//! Grammar (informal; the lexer/parser are external-interface components
//! per spec §1, so the exact surface grammar is this module's own design,
//! constrained only by the scenarios in spec §8 and the node shapes in
//! spec §3):
//!
//! ```text
//! program    := 'program' id ';' const_decl? var_decl? block '.'
//! const_decl := 'const' constdeclaration (';' constdeclaration)* ';'
//! var_decl   := 'var' declaration (';' declaration)* ';'
//! declaration:= id (',' id)* ':' vartype
//! vartype    := 'integer' | 'char' | 'string'
//!             | 'array' '[' int '..' int ']' 'of' ('integer' | 'char' | 'string')
//! block      := 'begin' statement (';' statement)* 'end'
//! statement  := block | while | branch | functioncall | assignment
//! while      := 'while' boolexpr 'do' statement
//! branch     := 'if' boolexpr 'then' statement ('else' statement)?
//! functioncall := ('readln' | 'write' | 'writeln') '(' arg (',' arg)* ')'
//! assignment := target (':=' | '+=' | '-=' | '*=') expression
//! boolexpr   := expression ('=' | '<>' | '<' | '>' | '<=' | '>=') expression
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | 'div' | 'mod') factor)*
//! factor     := ('+' | '-')* atom | '(' expression ')'
//! atom       := int | char | string | id ('[' expression ']')?
//! ```
use std::{error::Error, fmt::Display};

use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;
use crate::symbol::{BoolOp, FuncName, ModType, Op};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} {}", self.span.line, self.span.column, self.message)
    }
}

impl Error for SyntaxError {}

type PResult<T> = Result<T, SyntaxError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn span(&self) -> Span {
        self.peek()
            .map(|t| t.span)
            .unwrap_or_else(|| self.tokens.last().map(|t| t.span).unwrap_or_default())
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn found_text(&self) -> String {
        self.peek()
            .map(|t| t.kind.text())
            .unwrap_or_else(|| "<EOF>".to_string())
    }

    fn expect(&mut self, kind: &TokenKind, expected_text: &str) -> PResult<Token> {
        match self.peek_kind() {
            Some(k) if k == kind => Ok(self.bump().expect("checked by peek_kind")),
            _ => Err(SyntaxError {
                span: self.span(),
                message: format!("missing '{expected_text}' at '{}'", self.found_text()),
            }),
        }
    }

    fn expect_id(&mut self) -> PResult<Id> {
        match self.peek_kind() {
            Some(TokenKind::Id(text)) => {
                let text = text.clone();
                let span = self.span();
                self.bump();
                Ok(Id {
                    text,
                    span,
                    ty: crate::symbol::ScalarType::None,
                })
            }
            _ => Err(SyntaxError {
                span: self.span(),
                message: format!("missing identifier at '{}'", self.found_text()),
            }),
        }
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        self.expect(&TokenKind::Program, "program")?;
        let name = self.expect_id()?;
        self.expect(&TokenKind::Semicolon, ";")?;

        let const_decl = if matches!(self.peek_kind(), Some(TokenKind::Const)) {
            Some(self.parse_const_decl()?)
        } else {
            None
        };

        let var_decl = if matches!(self.peek_kind(), Some(TokenKind::Var)) {
            Some(self.parse_var_decl()?)
        } else {
            None
        };

        let block = self.parse_block()?;
        self.expect(&TokenKind::Dot, ".")?;

        Ok(Program {
            header: Header { name },
            const_decl,
            var_decl,
            block,
        })
    }

    fn parse_const_decl(&mut self) -> PResult<ConstDecl> {
        self.expect(&TokenKind::Const, "const")?;
        let mut declarations = vec![self.parse_const_declaration()?];
        self.expect(&TokenKind::Semicolon, ";")?;
        while matches!(self.peek_kind(), Some(TokenKind::Id(_))) {
            declarations.push(self.parse_const_declaration()?);
            self.expect(&TokenKind::Semicolon, ";")?;
        }
        Ok(ConstDecl { declarations })
    }

    fn parse_const_declaration(&mut self) -> PResult<ConstDeclaration> {
        let name = self.expect_id()?;
        self.expect(&TokenKind::Eq, "=")?;
        let init = self.parse_expression()?;
        Ok(ConstDeclaration { name, init })
    }

    fn parse_var_decl(&mut self) -> PResult<VarDecl> {
        self.expect(&TokenKind::Var, "var")?;
        let mut declarations = vec![self.parse_declaration()?];
        self.expect(&TokenKind::Semicolon, ";")?;
        while matches!(self.peek_kind(), Some(TokenKind::Id(_))) {
            declarations.push(self.parse_declaration()?);
            self.expect(&TokenKind::Semicolon, ";")?;
        }
        Ok(VarDecl { declarations })
    }

    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let mut names = vec![self.expect_id()?];
        while matches!(self.peek_kind(), Some(TokenKind::Comma)) {
            self.bump();
            names.push(self.expect_id()?);
        }
        self.expect(&TokenKind::Colon, ":")?;
        let var_type = self.parse_var_type()?;
        Ok(Declaration { names, var_type })
    }

    fn parse_var_type(&mut self) -> PResult<VarType> {
        if matches!(self.peek_kind(), Some(TokenKind::Array)) {
            self.bump();
            self.expect(&TokenKind::LBracket, "[")?;
            let lower = self.parse_int()?;
            self.expect(&TokenKind::DotDot, "..")?;
            let upper = self.parse_int()?;
            self.expect(&TokenKind::RBracket, "]")?;
            self.expect(&TokenKind::Of, "of")?;
            let element = self.parse_simple_type()?;
            Ok(VarType::Array(ArrayType {
                interval: Interval { lower, upper },
                element,
            }))
        } else {
            Ok(VarType::Simple(self.parse_simple_type()?))
        }
    }

    fn parse_simple_type(&mut self) -> PResult<SimpleType> {
        let span = self.span();
        let lexeme = match self.peek_kind() {
            Some(TokenKind::Integer) => "integer",
            Some(TokenKind::Char) => "char",
            Some(TokenKind::Str) => "string",
            _ => {
                return Err(SyntaxError {
                    span,
                    message: format!("missing type at '{}'", self.found_text()),
                })
            }
        };
        self.bump();
        Ok(SimpleType {
            lexeme: lexeme.to_string(),
            span,
        })
    }

    fn parse_int(&mut self) -> PResult<Int> {
        match self.peek_kind() {
            Some(TokenKind::IntLit(text)) => {
                let text = text.clone();
                let span = self.span();
                self.bump();
                Ok(Int { text, span })
            }
            _ => Err(SyntaxError {
                span: self.span(),
                message: format!("missing integer literal at '{}'", self.found_text()),
            }),
        }
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(&TokenKind::Begin, "begin")?;
        let mut statements = vec![];
        if !matches!(self.peek_kind(), Some(TokenKind::End)) {
            statements.push(self.parse_statement()?);
            while matches!(self.peek_kind(), Some(TokenKind::Semicolon)) {
                self.bump();
                if matches!(self.peek_kind(), Some(TokenKind::End)) {
                    break;
                }
                statements.push(self.parse_statement()?);
            }
        }
        self.expect(&TokenKind::End, "end")?;
        Ok(Block { statements })
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        match self.peek_kind() {
            Some(TokenKind::Begin) => Ok(Statement::Block(self.parse_block()?)),
            Some(TokenKind::While) => Ok(Statement::While(self.parse_while()?)),
            Some(TokenKind::If) => Ok(Statement::Branch(self.parse_branch()?)),
            Some(TokenKind::Readln) | Some(TokenKind::Write) | Some(TokenKind::Writeln) => {
                Ok(Statement::FunctionCall(self.parse_function_call()?))
            }
            _ => Ok(Statement::Assignment(self.parse_assignment()?)),
        }
    }

    fn parse_while(&mut self) -> PResult<While> {
        self.expect(&TokenKind::While, "while")?;
        let condition = self.parse_bool_expr()?;
        self.expect(&TokenKind::Do, "do")?;
        let body = Box::new(self.parse_statement()?);
        Ok(While { condition, body })
    }

    fn parse_branch(&mut self) -> PResult<Branch> {
        self.expect(&TokenKind::If, "if")?;
        let condition = self.parse_bool_expr()?;
        self.expect(&TokenKind::Then, "then")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if matches!(self.peek_kind(), Some(TokenKind::Else)) {
            self.bump();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Branch {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_function_name(&mut self) -> PResult<FunctionName> {
        let span = self.span();
        let (text, kind) = match self.peek_kind() {
            Some(TokenKind::Readln) => ("readln", FuncName::Readln),
            Some(TokenKind::Write) => ("write", FuncName::Write),
            Some(TokenKind::Writeln) => ("writeln", FuncName::Writeln),
            _ => {
                return Err(SyntaxError {
                    span,
                    message: format!("missing function name at '{}'", self.found_text()),
                })
            }
        };
        self.bump();
        Ok(FunctionName {
            text: text.to_string(),
            kind,
            span,
        })
    }

    fn parse_function_call(&mut self) -> PResult<FunctionCall> {
        let name = self.parse_function_name()?;
        self.expect(&TokenKind::LParen, "(")?;
        let mut variables = vec![];
        let mut arguments = vec![];
        if !matches!(self.peek_kind(), Some(TokenKind::RParen)) {
            self.parse_call_arg(&mut variables, &mut arguments)?;
            while matches!(self.peek_kind(), Some(TokenKind::Comma)) {
                self.bump();
                self.parse_call_arg(&mut variables, &mut arguments)?;
            }
        }
        self.expect(&TokenKind::RParen, ")")?;
        Ok(FunctionCall {
            name,
            variables,
            arguments,
        })
    }

    /// Classifies each call argument: a bare `id` or `id[expr]` not followed
    /// by an operator is a "variable" (l-value); anything else is a general
    /// "argument" expression. See [`crate::ast::FunctionCall`].
    fn parse_call_arg(
        &mut self,
        variables: &mut Vec<AssignTarget>,
        arguments: &mut Vec<Expression>,
    ) -> PResult<()> {
        if matches!(self.peek_kind(), Some(TokenKind::Id(_))) {
            let save = self.pos;
            if let Ok(target) = self.parse_assign_target() {
                if matches!(
                    self.peek_kind(),
                    Some(TokenKind::Comma) | Some(TokenKind::RParen)
                ) {
                    variables.push(target);
                    return Ok(());
                }
            }
            self.pos = save;
        }
        arguments.push(self.parse_expression()?);
        Ok(())
    }

    fn parse_assign_target(&mut self) -> PResult<AssignTarget> {
        let variable = self.expect_id()?;
        if matches!(self.peek_kind(), Some(TokenKind::LBracket)) {
            let span = variable.span;
            self.bump();
            let index = Box::new(self.parse_expression()?);
            self.expect(&TokenKind::RBracket, "]")?;
            Ok(AssignTarget::Cell(Cell {
                variable,
                index,
                span,
                ty: crate::symbol::ScalarType::None,
            }))
        } else {
            Ok(AssignTarget::Id(variable))
        }
    }

    fn parse_modification(&mut self) -> PResult<Modification> {
        let span = self.span();
        let (text, kind) = match self.peek_kind() {
            Some(TokenKind::Assign) => (":=", ModType::Assignment),
            Some(TokenKind::PlusAssign) => ("+=", ModType::Add),
            Some(TokenKind::MinusAssign) => ("-=", ModType::Reduce),
            Some(TokenKind::StarAssign) => ("*=", ModType::Multiply),
            _ => {
                return Err(SyntaxError {
                    span,
                    message: format!("missing assignment operator at '{}'", self.found_text()),
                })
            }
        };
        self.bump();
        Ok(Modification {
            text: text.to_string(),
            kind,
            span,
        })
    }

    fn parse_assignment(&mut self) -> PResult<Assignment> {
        let target = self.parse_assign_target()?;
        let modification = self.parse_modification()?;
        let expression = self.parse_expression()?;
        Ok(Assignment {
            target,
            modification,
            expression,
        })
    }

    fn parse_bool_op(&mut self) -> PResult<BoolOperation> {
        let span = self.span();
        let (text, kind) = match self.peek_kind() {
            Some(TokenKind::Eq) => ("=", BoolOp::Equal),
            Some(TokenKind::NotEq) => ("<>", BoolOp::NotEqual),
            Some(TokenKind::Less) => ("<", BoolOp::LessThan),
            Some(TokenKind::Greater) => (">", BoolOp::MoreThan),
            Some(TokenKind::LessEq) => ("<=", BoolOp::NotMore),
            Some(TokenKind::GreaterEq) => (">=", BoolOp::NotLess),
            _ => {
                return Err(SyntaxError {
                    span,
                    message: format!("missing comparison operator at '{}'", self.found_text()),
                })
            }
        };
        self.bump();
        Ok(BoolOperation {
            text: text.to_string(),
            kind,
            span,
        })
    }

    fn parse_bool_expr(&mut self) -> PResult<BoolExpr> {
        let left = self.parse_expression()?;
        let op = self.parse_bool_op()?;
        let right = self.parse_expression()?;
        Ok(BoolExpr {
            left,
            op,
            right,
            ty: crate::symbol::ScalarType::None,
        })
    }

    fn parse_expression(&mut self) -> PResult<Expression> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => Operation {
                    text: "+".to_string(),
                    kind: Op::Plus,
                    span: self.span(),
                },
                Some(TokenKind::Minus) => Operation {
                    text: "-".to_string(),
                    kind: Op::Minus,
                    span: self.span(),
                },
                _ => break,
            };
            self.bump();
            let right = self.parse_term()?;
            let span = left.span;
            left = Expression {
                kind: ExpressionKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                brackets: false,
                span,
                ty: crate::symbol::ScalarType::None,
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> PResult<Expression> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => Operation {
                    text: "*".to_string(),
                    kind: Op::Star,
                    span: self.span(),
                },
                Some(TokenKind::KwDiv) => Operation {
                    text: "div".to_string(),
                    kind: Op::Div,
                    span: self.span(),
                },
                Some(TokenKind::KwMod) => Operation {
                    text: "mod".to_string(),
                    kind: Op::Mod,
                    span: self.span(),
                },
                _ => break,
            };
            self.bump();
            let right = self.parse_factor()?;
            let span = left.span;
            left = Expression {
                kind: ExpressionKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                brackets: false,
                span,
                ty: crate::symbol::ScalarType::None,
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> PResult<Expression> {
        let span = self.span();
        let mut signs = vec![];
        loop {
            match self.peek_kind() {
                Some(TokenKind::Plus) => {
                    signs.push(Operation {
                        text: "+".to_string(),
                        kind: Op::Plus,
                        span: self.span(),
                    });
                    self.bump();
                }
                Some(TokenKind::Minus) => {
                    signs.push(Operation {
                        text: "-".to_string(),
                        kind: Op::Minus,
                        span: self.span(),
                    });
                    self.bump();
                }
                _ => break,
            }
        }

        if signs.is_empty() && matches!(self.peek_kind(), Some(TokenKind::LParen)) {
            self.bump();
            let inner = self.parse_expression()?;
            self.expect(&TokenKind::RParen, ")")?;
            return Ok(Expression {
                kind: ExpressionKind::Bracketed {
                    inner: Box::new(inner),
                },
                brackets: true,
                span,
                ty: crate::symbol::ScalarType::None,
            });
        }

        let atom = self.parse_atom()?;
        Ok(Expression {
            kind: ExpressionKind::Atomic { signs, atom },
            brackets: false,
            span,
            ty: crate::symbol::ScalarType::None,
        })
    }

    fn parse_atom(&mut self) -> PResult<Atom> {
        let span = self.span();
        match self.peek_kind() {
            Some(TokenKind::IntLit(text)) => {
                let text = text.clone();
                self.bump();
                Ok(Atom::Int(Int { text, span }))
            }
            Some(TokenKind::CharLit(text)) => {
                let text = text.clone();
                self.bump();
                Ok(Atom::Char(CharLiteral { text, span }))
            }
            Some(TokenKind::StringLit(text)) => {
                let text = text.clone();
                self.bump();
                Ok(Atom::Str(StringLiteral { text, span }))
            }
            Some(TokenKind::Id(_)) => {
                let variable = self.expect_id()?;
                if matches!(self.peek_kind(), Some(TokenKind::LBracket)) {
                    self.bump();
                    let index = Box::new(self.parse_expression()?);
                    self.expect(&TokenKind::RBracket, "]")?;
                    Ok(Atom::Cell(Cell {
                        variable,
                        index,
                        span,
                        ty: crate::symbol::ScalarType::None,
                    }))
                } else {
                    Ok(Atom::Id(variable))
                }
            }
            _ => Err(SyntaxError {
                span,
                message: format!("missing expression at '{}'", self.found_text()),
            }),
        }
    }
}

/// Parse a whole program, returning the syntax errors collected along the
/// way (spec §7: "collected into a list of `{line, column, message}`").
/// Recovery is a single attempt: the first fatal parse failure stops the
/// pass (a hand-written recursive-descent parser with full panic-mode
/// recovery is beyond this grammar's needs; every later pass is skipped
/// once any error is present, per spec's failure semantics).
pub fn parse(tokens: Vec<Token>) -> Result<Program, Vec<SyntaxError>> {
    let mut parser = Parser::new(tokens);
    parser.parse_program().map_err(|e| vec![e])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_src(src: &str) -> Result<Program, Vec<SyntaxError>> {
        let tokens = Lexer::new(src).lex().unwrap();
        parse(tokens)
    }

    #[test]
    fn parses_hello_world() {
        let program = parse_src("program HelloWorld; begin writeln('Hello world!'); end.").unwrap();
        assert_eq!(program.header.name.text, "HelloWorld");
        assert_eq!(program.block.statements.len(), 1);
    }

    #[test]
    fn rejects_missing_trailing_dot() {
        let src = "program P;\nbegin\n  writeln('x')\nend";
        let errors = parse_src(src).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("missing '.'"));
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let program =
            parse_src("program P; var a: integer; begin a := 1 + 2 * 3; end.").unwrap();
        let Statement::Assignment(assignment) = &program.block.statements[0] else {
            panic!("expected assignment");
        };
        match &assignment.expression.kind {
            ExpressionKind::Binary { op, .. } => assert_eq!(op.text, "+"),
            _ => panic!("expected a top-level '+'"),
        }
    }

    #[test]
    fn classifies_call_arguments() {
        let program = parse_src(
            "program P; var z: integer; begin writeln('GCD: ', z); end.",
        )
        .unwrap();
        let Statement::FunctionCall(call) = &program.block.statements[0] else {
            panic!("expected function call");
        };
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.variables.len(), 1);
    }
}
