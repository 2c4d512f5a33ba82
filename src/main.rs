use std::io;
use std::process;

use clap::{Parser, ValueEnum};
use clap_stdin::FileOrStdin;

use pogc::lexer::Lexer;
use pogc::{interp, tac, CompileError};

#[derive(Parser)]
#[command(name = "pogc")]
#[command(about = "Compiler for the poglin toy language")]
struct Args {
    /// Source file, `-` or omitted for stdin
    #[arg(default_value = "-")]
    input: FileOrStdin,

    /// Stage to print
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Interpret the lowered program instead of printing it, with stdin as
    /// the program's input
    #[arg(long)]
    run: bool,

    /// Trace stage boundaries on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Tac,
    Ir,
}

macro_rules! trace {
    ($verbose:expr, $($arg:tt)*) => {
        if $verbose {
            eprintln!("[pogc] {}", format!($($arg)*));
        }
    };
}

fn main() {
    let args = Args::parse();
    process::exit(run(args));
}

fn run(args: Args) -> i32 {
    let verbose = args.verbose;
    if args.run && args.input.is_stdin() {
        eprintln!("--run needs a source file: stdin is the program's input");
        return 1;
    }

    let source = match args.input.contents() {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            return 1;
        }
    };

    if args.emit == Emit::Tokens && !args.run {
        trace!(verbose, "lexing {} bytes", source.len());
        return match Lexer::tokenize(&source) {
            Ok(tokens) => {
                for token in tokens.iter() {
                    println!("[{}] {}", token.pos, token.kind);
                }
                0
            }
            Err(e) => {
                eprintln!("{}", e);
                1
            }
        };
    }

    trace!(verbose, "parsing");
    let program = match pogc::parse(&source) {
        Ok(program) => program,
        Err(e) => return report(e),
    };
    if args.emit == Emit::Ast && !args.run {
        println!("{:#?}", program);
        return 0;
    }

    trace!(verbose, "analyzing {} statements", program.0.len());
    let symbol_table = match pogc::check(&program) {
        Ok(table) => table,
        Err(e) => return report(e),
    };
    trace!(verbose, "{} symbols declared", symbol_table.symbols().len());

    let instructions = pogc::generate_tac(&program, &symbol_table);
    trace!(verbose, "generated {} TAC instructions", instructions.len());
    if args.emit == Emit::Tac && !args.run {
        print!("{}", tac::to_text(&instructions));
        return 0;
    }

    let module = match pogc::lower(instructions, &symbol_table) {
        Ok(module) => module,
        Err(e) => return report(e),
    };
    trace!(
        verbose,
        "lowered into {} blocks, {} strings",
        module.blocks.len(),
        module.strings.len()
    );

    if !args.run {
        print!("{}", module);
        return 0;
    }

    trace!(verbose, "running");
    let stdin = io::stdin();
    let stdout = io::stdout();
    match interp::run(&module, stdin.lock(), stdout.lock()) {
        Ok(code) => {
            trace!(verbose, "exited with {}", code);
            code
        }
        Err(e) => {
            eprintln!("RuntimeError: {}", e);
            1
        }
    }
}

fn report(e: CompileError) -> i32 {
    eprintln!("{}", e);
    1
}
