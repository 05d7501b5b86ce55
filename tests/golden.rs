//! In-process golden tests for the end-to-end scenarios of spec §8.
//! These assemble fresh fixture source strings rather than shelling out to
//! a built binary (the teacher's `test-utils` process-spawning harness is
//! not appropriate here: there is no external assembler available in this
//! environment to link the emitted IR against).
use pasc::{ast, builder, codegen, lexer::Lexer, parser, semantic};

fn compile(src: &str) -> String {
    let tokens = Lexer::new(src).lex().expect("lexing should succeed");
    let tree = parser::parse(tokens).expect("parsing should succeed");
    let mut program = builder::build(tree);
    let mut table = semantic::analyse(&mut program).expect("analysis should succeed");
    codegen::generate(&program, &mut table)
}

fn dump(src: &str) -> String {
    let tokens = Lexer::new(src).lex().expect("lexing should succeed");
    let tree = parser::parse(tokens).expect("parsing should succeed");
    let program = builder::build(tree);
    ast::xml::dump(&program)
}

#[test]
fn s1_hello_world() {
    let src = "Program HelloWorld; begin Writeln('Hello world!'); end.";
    let ir = compile(src);
    // Pinned byte-exact output: the string literal consumes two registers
    // (`@.str.1` names off `vars_-1`, the GEP lands in `%.2`), and the
    // `printf` declaration carries the `%format` parameter name.
    let expected = "target triple = \"x86_64-pc-linux-gnu\"\n\n\
                    declare i32 @printf(i8* %format, ...)\n\
                    declare i32 @__isoc99_scanf(i8*, ...)\n\n\
                    @.fmt.writeln.string = constant [4 x i8] c\"%s\\0A\\00\"\n\
                    define void @writeln_string(i8* %v) {\n\
                    start:\n  \
                    %.fmt = getelementptr [4 x i8], [4 x i8]* @.fmt.writeln.string, i64 0, i64 0\n  \
                    call i32 (i8*, ...) @printf(i8* %.fmt, i8* %v)\n  \
                    ret void\n\
                    }\n\n\
                    @.str.1 = constant [13 x i8] c\"Hello world!\\00\"\n\n\
                    define i32 @main() {\n\
                    start:\n  \
                    %.2 = getelementptr [13 x i8], [13 x i8]* @.str.1, i64 0, i64 0\n  \
                    call void @writeln_string(i8* %.2)\n  \
                    ret i32 0\n\
                    }\n";
    assert_eq!(ir, expected);

    let xml = dump(src);
    assert!(xml.starts_with("<pascal>\n"));
    assert!(xml.contains("<progname>\n  <id>helloworld</id>\n</progname>\n"));
    assert!(xml.contains("<string>Hello world!</string>"));
}

#[test]
fn s2_gcd_reuses_helpers_for_a_single_while_scaffold() {
    let src = "program GCD;\n\
               var a, b, m, i, z: integer;\n\
               begin\n  \
               readln(a, b);\n  \
               if a < b then m := a else m := b;\n  \
               i := 1;\n  \
               while i <= m do\n  \
               begin\n    \
               if (a mod i = 0) then\n      \
               if (b mod i = 0) then z := i;\n    \
               i := i + 1;\n  \
               end;\n  \
               writeln('GCD: ', z);\n\
               end.";
    let ir = compile(src);
    // `writeln('GCD: ', z)`: the FunctionCall's `variables` list (just `z`)
    // is lowered entirely before its `arguments` list (just `'GCD: '`), so
    // `z` is not the last element lowered and uses `write_int`, while the
    // string literal is and uses `writeln_string` (spec §4.6 I/O lowering;
    // preserved source quirk, see DESIGN.md).
    assert!(ir.contains("@write_int"));
    assert!(ir.contains("@writeln_string"));
    assert!(ir.matches("br i1").count() >= 3);

    // Pinned register/label numbers for the outer `while i <= m do`: the
    // condition label is reserved alone (`.18`), then its own operand loads
    // and comparison consume `.19`/`.20`/`.21`, and only then are the
    // body/exit labels reserved (`.22`/`.23`) — the body/exit labels must
    // land *above* the condition's own registers, not below them.
    assert!(ir.contains(".18:"));
    assert!(ir.contains("  %.19 = load i32, i32* %.4"));
    assert!(ir.contains("  %.20 = load i32, i32* %.3"));
    assert!(ir.contains("  %.21 = icmp sle i32%.19, %.20"));
    assert!(ir.contains("  br i1 %.21, label %.22, label %.23"));
    assert!(ir.contains(".22:"));
    assert!(ir.contains(".23:"));

    // The nested `if (a mod i = 0) then if (b mod i = 0) then z := i` has
    // no `else`, so its innermost `if`'s exit/join label is `.39` — this is
    // only reachable if the outer `if a < b then m := a else m := b`
    // reserved its join label via a bump of three registers (`branch3`),
    // not one.
    assert!(ir.contains(".39:"));
    assert!(ir.contains("  br label %.39"));
}

#[test]
fn s3_arrmin_cell_addressing_uses_size_99() {
    let src = "program ArrMin;\n\
               var a: array[1..100] of integer; i, m: integer;\n\
               begin\n  \
               m := a[1];\n\
               end.";
    let ir = compile(src);
    assert!(ir.contains("alloca [99 x i32]"));
    assert!(ir.contains("sub nsw i32") || ir.contains("sub i32"));
    assert!(ir.contains("getelementptr [99 x i32]"));
}

#[test]
fn s4_strings_assignment_lowering() {
    let src = "program Strings;\n\
               var ch: char; res, s1: string;\n\
               begin\n  \
               ch := 'X';\n  \
               res := 'a';\n  \
               res += s1;\n  \
               res[3] := ch;\n\
               end.";
    let ir = compile(src);
    assert!(ir.contains("@strcpy"));
    assert!(ir.contains("@strcat"));
    assert!(ir.contains("@strinit"));
}

#[test]
fn s5_semantic_rejects() {
    let repeat_const = "program P; const a = 42; a = 69; begin end.";
    let tokens = Lexer::new(repeat_const).lex().unwrap();
    let tree = parser::parse(tokens).unwrap();
    let mut program = builder::build(tree);
    let err = semantic::analyse(&mut program).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error: Repeat declaration of const identifier 'a'"
    );

    let char_compound = "program P; var a: char; begin a += 'a'; end.";
    let tokens = Lexer::new(char_compound).lex().unwrap();
    let tree = parser::parse(tokens).unwrap();
    let mut program = builder::build(tree);
    let err = semantic::analyse(&mut program).unwrap_err();
    assert_eq!(err.to_string(), "Error: Incompatible operation for char expression");

    let unknown_array = "program P; begin a[1] := 42; end.";
    let tokens = Lexer::new(unknown_array).lex().unwrap();
    let tree = parser::parse(tokens).unwrap();
    let mut program = builder::build(tree);
    let err = semantic::analyse(&mut program).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error: Unknown identifier 'a' in array name"
    );
}

#[test]
fn s6_parser_rejects_missing_trailing_dot() {
    let src = "program P;\nvar a: integer;\nbegin\n  a := 1\nend";
    let tokens = Lexer::new(src).lex().unwrap();
    let errors = parser::parse(tokens).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("missing '.' at '<EOF>'"));
}

#[test]
fn p6_determinism_of_xml_and_ir() {
    let src = "program HelloWorld; begin writeln('Hello world!'); end.";
    assert_eq!(dump(src), dump(src));
    assert_eq!(compile(src), compile(src));
}

#[test]
fn p7_every_basic_block_has_exactly_one_terminator() {
    let src = "program P;\nvar i: integer;\nbegin\n  \
               while i < 10 do\n  begin\n    i := i + 1;\n  end;\n\
               end.";
    let ir = compile(src);
    for block in ir.split("\n.").skip(1) {
        let terminators = block.matches("  br ").count() + block.matches("  ret ").count();
        // each label's block body is delimited by the next label or `}`;
        // a simple substring scan is enough since no block in this grammar
        // ever falls through without br/ret (every arm emits one).
        assert!(terminators >= 1);
    }
}
