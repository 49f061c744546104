use slp_recompress::{decompress, text_format, Grammar, RecompressConfig, Recompressor};
use std::env;
use std::error::Error;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

/// Loads a grammar, optionally prints an excerpt, then recompresses it.
///
/// Usage: cargo run --example main -- [--raw] <filename> [<start> <end>]
///
/// Without `--raw` the file holds a grammar in the `R<id>:<l>,<r>` / `SEQ:`
/// text format; with it, any file is read as bytes and turned into a
/// balanced grammar first. Set `RUST_LOG=debug` to watch every rewrite.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args: Vec<String> = env::args().collect();
    let raw = args.iter().any(|arg| arg == "--raw");
    args.retain(|arg| arg != "--raw");

    if args.len() != 2 && args.len() != 4 {
        eprintln!("Usage: {} [--raw] <filename> [<start> <end>]", args[0]);
        process::exit(1);
    }

    if let Err(e) = run(&args[1], raw, args.get(2..4)) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(filename: &str, raw: bool, window: Option<&[String]>) -> Result<(), Box<dyn Error>> {
    let grammar = if raw {
        Grammar::from_bytes(&fs::read(filename)?)
    } else {
        text_format::parse(&fs::read_to_string(filename)?)?
    };

    let length = grammar.total_length()?;
    println!("Expanded length: {}", length);

    if let Some([start, end]) = window {
        let excerpt = grammar.excerpt(start.parse()?, end.parse()?)?;
        let bytes = decompress(&excerpt)?;
        println!("Excerpt ({} rules): {}", excerpt.rule_count(), String::from_utf8_lossy(&bytes));
    }

    let before = grammar.stats();
    let config = RecompressConfig::new().pop_outlet(env::var_os("POP_OUTLET").is_some());
    let result = Recompressor::new(grammar).with_config(config).run();
    let after = result.grammar.stats();

    // Rewrites must keep the expansion
    if result.grammar.total_length()? != length {
        return Err("recompression changed the expanded length".into());
    }

    println!("\n=== Statistics ===");
    println!("Rounds: {}", result.stats.rounds);
    println!("Bigrams replaced: {}", result.stats.bigrams_replaced);
    println!("Inlets popped: {}", result.stats.inlets_popped);
    println!("Outlets popped: {}", result.stats.outlets_popped);
    println!("Rules pruned: {}", result.stats.rules_pruned);
    println!("Rules: {} -> {}", before.rules, after.rules);
    println!("Symbols in grammar: {} -> {}", before.rhs_symbols + before.sequence_len, after.rhs_symbols + after.sequence_len);
    println!("Compact size: {} -> {}", before.compact_size, after.compact_size);
    println!("Compression ratio: {:.2}% -> {:.2}%", before.compression_ratio(), after.compression_ratio());
    Ok(())
}
