//! # pascalc
//!
//! Compiler front-end for the Pascal subset: wires together the lexer,
//! parser, AST builder, semantic analyser and code generator, then hands
//! the emitted IR to an external C-compiler toolchain (spec §6 "Command-
//! line surface"). Grounded in the teacher's `src/bin/why/main.rs`.
mod cli;

use std::{error::Error, fs, process::Command};

use cli::Cli;
use log::{error, info};
use pasc::{ast, builder, codegen, lexer::Lexer, parser, semantic};

fn main() {
    let args = Cli::init();
    simple_logger::init_with_level(args.verbosity.into()).unwrap();

    // I/O errors on the input file are the only case that exits non-zero
    // (spec §6 "Exit codes"); parse/semantic errors are printed and the
    // pipeline stops without changing the exit code.
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Cli) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&args.file)
        .map_err(|e| format!("could not read '{}': {e}", args.file.display()))?;

    let tokens = match Lexer::new(&source).lex() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    if args.dump_tokens {
        for token in &tokens {
            println!("{token}");
        }
        return Ok(());
    }

    let tree = match parser::parse(tokens) {
        Ok(tree) => tree,
        Err(errors) => {
            for e in errors {
                eprintln!("{e}");
            }
            return Ok(());
        }
    };

    let mut program = builder::build(tree);

    if args.dump_ast {
        print!("{}", ast::xml::dump(&program));
        return Ok(());
    }

    let mut table = match semantic::analyse(&mut program) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    let ir = codegen::generate(&program, &mut table);

    let stem = args
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    let ir_path = args.file.with_file_name(format!("{stem}.ll"));

    fs::write(&ir_path, &ir)
        .map_err(|e| format!("could not write '{}': {e}", ir_path.display()))?;
    info!("wrote {}", ir_path.display());

    if args.dump_asm {
        return Ok(());
    }

    let output_path = args.file.with_file_name(&stem);
    let status = Command::new("cc")
        .arg(&ir_path)
        .arg("-o")
        .arg(&output_path)
        .status();

    match status {
        Ok(status) if status.success() => info!("wrote {}", output_path.display()),
        Ok(status) => error!("assembler toolchain exited with {status}"),
        Err(e) => error!("could not invoke assembler toolchain: {e}"),
    }

    Ok(())
}
