use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{self, Command};
use turc::machine::Halt;
use turc::types::{INITIAL_SYMBOL, TAPE_ORIGIN, TAPE_SIZE};
use turc::{CodegenOptions, Compiler, CompilerOptions, ProgramManager, SourceLoader, TuringMachine};

/// Compiles Turing machine transition rules into a C program.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  turc machines/bounce.tm -o bounce.c --build
  cat machines/accept.tm | turc --emit table
  turc --sample runaway --run")]
struct Cli {
    /// Path to a program file (.tm).
    /// Can also pipe program content via stdin.
    program_file: Option<PathBuf>,

    /// Compile a bundled program instead of a file
    #[clap(short, long, conflicts_with = "program_file")]
    sample: Option<String>,

    /// List the bundled programs and exit
    #[clap(short, long)]
    list: bool,

    /// Where to write the generated C program
    #[clap(short, long, default_value = "tm.c")]
    output: PathBuf,

    /// What to produce
    #[clap(long, value_enum, default_value_t = Emit::C)]
    emit: Emit,

    /// Interpret the program instead of writing C
    #[clap(short, long)]
    run: bool,

    /// Invoke the C compiler on the generated file
    #[clap(short, long)]
    build: bool,

    /// C compiler used by --build
    #[clap(long, default_value = "cc")]
    cc: String,

    /// Executable produced by --build
    #[clap(long, default_value = "tm")]
    binary: PathBuf,

    /// Number of tape cells
    #[clap(long, default_value_t = TAPE_SIZE)]
    tape_size: usize,

    /// Cell the head starts on
    #[clap(long, default_value_t = TAPE_ORIGIN)]
    origin: usize,

    /// Symbol written on the origin cell before the first step
    #[clap(long, default_value_t = INITIAL_SYMBOL.to_string())]
    seed: String,

    /// Do not emit #line directives
    #[clap(long)]
    no_line_directives: bool,

    /// Treat analysis warnings as errors
    #[clap(long)]
    strict: bool,

    /// Print debug logs
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// The generated C program
    C,
    /// The token stream, as JSON
    Tokens,
    /// The state table, as JSON
    Table,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if cli.list {
        for name in ProgramManager::get_program_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let (source_name, source) = load_source(cli)?;
    let options = CompilerOptions::default()
        .with_strict(cli.strict)
        .with_codegen(
            CodegenOptions::default()
                .with_source_name(source_name)
                .with_tape(cli.tape_size, cli.origin)
                .with_seed_symbol(cli.seed.clone())
                .with_line_directives(!cli.no_line_directives),
        );
    let compiler = Compiler::new(options);

    if cli.run {
        return interpret(&compiler, &source);
    }

    match cli.emit {
        Emit::Tokens => {
            let tokens = compiler.tokens(&source)?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Emit::Table => {
            let table = compiler.table(&source)?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Emit::C => {
            let program = compiler.compile(&source)?;
            SourceLoader::write_generated(&cli.output, &program.text)?;
            println!("Wrote {}", cli.output.display());

            if cli.build {
                build(&cli.cc, &cli.output, &cli.binary);
            }
        }
    }

    Ok(())
}

/// Loads the program from a bundled sample, a file, or stdin, in that order.
fn load_source(cli: &Cli) -> Result<(String, String), Box<dyn Error>> {
    if let Some(name) = &cli.sample {
        let program = ProgramManager::get_program_by_name(name)?;
        Ok((format!("{}.tm", program.name), program.source.to_string()))
    } else if let Some(path) = &cli.program_file {
        let source = SourceLoader::read_source(path)?;
        Ok((path.display().to_string(), source))
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(("<stdin>".to_string(), buffer))
    } else {
        Err("no program given (pass a file, --sample, or pipe one via stdin)".into())
    }
}

/// Runs the program with the interpreter and prints the outcome.
fn interpret(compiler: &Compiler, source: &str) -> Result<(), Box<dyn Error>> {
    let table = compiler.table(source)?;
    let mut machine = TuringMachine::new(table, &compiler.options().codegen)?;

    let halt = machine.run();
    let outcome = match &halt {
        Halt::Accept => "accept".to_string(),
        Halt::Reject => format!("reject in state {}", machine.state()),
        Halt::Fault(e) => format!("fault: {}", e),
    };

    println!("Steps: {}", machine.step_count());
    println!("Tape:  {}", machine.tape_as_string());
    match halt.exit_status() {
        Some(status) => println!("Result: {} (exit status {})", outcome, status),
        None => println!("Result: {} (no matching exit status)", outcome),
    }
    Ok(())
}

/// Invokes the C compiler on the generated file. Its outcome is reported only.
fn build(cc: &str, source: &Path, binary: &Path) {
    log::info!("running {} -g {} -o {}", cc, source.display(), binary.display());

    match Command::new(cc)
        .arg("-g")
        .arg(source)
        .arg("-o")
        .arg(binary)
        .status()
    {
        Ok(status) if status.success() => println!("Built {}", binary.display()),
        Ok(status) => log::warn!("{} exited with {}", cc, status),
        Err(e) => log::warn!("failed to run {}: {}", cc, e),
    }
}
