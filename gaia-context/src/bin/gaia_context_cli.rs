use clap::Parser;
use gaia_context::text::{DEFAULT_OVERLAP_RATIO, WindowChunker};
use std::fs;
use std::io::{self, Read};

/// Split a text file into overlapping windows and print them as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Target window size in characters.
    #[arg(short, long, default_value_t = 512)]
    chunk_size: usize,

    /// Fraction of each window carried into the next one.
    #[arg(short, long, default_value_t = DEFAULT_OVERLAP_RATIO)]
    overlap_ratio: f64,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunker = WindowChunker::new(args.chunk_size).with_overlap_ratio(args.overlap_ratio);
    let windows = chunker.windows(&content);

    let json_output = serde_json::to_string_pretty(&windows)?;
    println!("{json_output}");

    Ok(())
}
