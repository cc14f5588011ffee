use annotest_parser::{ast_dump::dump_document, parse};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <file.feature>", args[0]);
        eprintln!();
        eprintln!("Parse an annotated feature file and dump its document structure");
        process::exit(1);
    }

    let filename = &args[1];

    let input = match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };

    let document = match parse(&input) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Parse error in '{}':", filename);
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    print!("{}", dump_document(&document));
}
