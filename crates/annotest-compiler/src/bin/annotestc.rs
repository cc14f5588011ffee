/// Feature compiler CLI

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use annotest_compiler::logging::init_logging;
use annotest_compiler::{CompileOptions, Compiler};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "annotestc")]
#[command(about = "Compiles annotated feature files into end-to-end test modules")]
#[command(version)]
struct Args {
    /// Directory containing .feature files
    #[arg(long = "src", value_name = "DIR", env = "ANNOTEST_SRC_DIR")]
    src_dir: PathBuf,

    /// Directory generated test modules are written to
    #[arg(long = "dest", value_name = "DIR", env = "ANNOTEST_DEST_DIR")]
    dest_dir: PathBuf,

    /// Step-definition module (repeatable; later files override earlier ones)
    #[arg(long = "steps", value_name = "FILE", required = true, num_args = 1..)]
    step_files: Vec<PathBuf>,

    /// Stop at the first failing feature file
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: Args) -> anyhow::Result<()> {
    let options = CompileOptions::new(&args.src_dir, &args.dest_dir)
        .step_files(args.step_files)
        .strict(args.strict);

    let output = Compiler::new(options)
        .compile()
        .with_context(|| format!("failed to compile features in {}", args.src_dir.display()))?;

    if args.verbose {
        for file in &output.files {
            println!("{} -> {}", file.source.display(), file.output.display());
        }
    }
    println!("Compiled {} feature file(s)", output.files.len());
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Compilation failed: {:#}", e);
        process::exit(1);
    }
}
