//! CLI argument surface for `pascalc` (spec §6 "Command-line surface").
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for pascalc.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the Pascal source file.
    #[arg(index = 1)]
    pub file: PathBuf,

    /// Print the token stream and exit.
    #[arg(long)]
    pub dump_tokens: bool,

    /// Print the XML dump of the AST and exit.
    #[arg(long)]
    pub dump_ast: bool,

    /// Emit `<stem>.ll` without invoking the assembler.
    #[arg(long)]
    pub dump_asm: bool,

    /// Specify the log level of the compiler.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of pascalc.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
