pub mod analyzer;
pub mod codegen;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod tac;

use thiserror::Error;

use analyzer::{SemanticError, SymbolTable};
use codegen::{LoweringError, Module};
use lexer::{LexError, Lexer};
use parser::{ParseError, Parser, Program};
use tac::{Instruction, TacGenerator};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{}", render_diagnostics(.0))]
    Semantic(Vec<SemanticError>),
    #[error("LoweringError: {0}")]
    Lowering(#[from] LoweringError),
}

/// One diagnostic per line.
pub fn render_diagnostics(errors: &[SemanticError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every artifact of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub program: Program,
    pub symbol_table: SymbolTable,
    pub tac: Vec<Instruction>,
    pub module: Module,
}

pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = Lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse()?)
}

pub fn check(program: &Program) -> Result<SymbolTable, CompileError> {
    analyzer::analyze(program).map_err(CompileError::Semantic)
}

pub fn generate_tac(program: &Program, symbol_table: &SymbolTable) -> Vec<Instruction> {
    TacGenerator::new(symbol_table).generate(program)
}

pub fn lower(tac: Vec<Instruction>, symbol_table: &SymbolTable) -> Result<Module, CompileError> {
    Ok(codegen::lower(tac, symbol_table)?)
}

/// Runs the whole pipeline. Each stage completes before the next starts and
/// the first failing stage stops it.
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    let program = parse(source)?;
    let symbol_table = check(&program)?;
    let tac = generate_tac(&program, &symbol_table);
    let module = lower(tac.clone(), &symbol_table)?;
    Ok(Compilation {
        program,
        symbol_table,
        tac,
        module,
    })
}
