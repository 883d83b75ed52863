use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use tremolo::{Dictionary, Query, Searcher};

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "search",
    about = "A program to search the dictionary by common substrings."
)]
struct Args {
    /// Binary database file produced by the compile command.
    #[clap(short = 'i', long)]
    db_in: PathBuf,

    /// Valid characters in traversal order, e.g. abcdefghijklmnopqrstuvwxyz.
    #[clap(short = 'c', long)]
    char_table: Option<String>,

    /// Use depth-first subtree traversal instead of breadth-first.
    #[clap(short = 'd', long)]
    depth_first: bool,

    /// Search for common prefixes only.
    #[clap(short = 'p', long)]
    prefix_only: bool,

    /// Give each match position its own result budget.
    #[clap(short = 'a', long)]
    average_limit: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let start = Instant::now();
    let dict = Dictionary::read(BufReader::new(File::open(&args.db_in)?))?;
    eprintln!(
        "Read the database with {} words in {} seconds: {:?}",
        dict.num_dwords(),
        start.elapsed().as_secs_f64(),
        &args.db_in
    );

    let mut searcher = Searcher::new(&dict);
    if let Some(char_table) = args.char_table {
        searcher.set_char_table(char_table.as_bytes())?;
    }

    // Each line: word [min_common_len [min_dword_len [max_dword_len [limit]]]]
    let mut results = vec![];
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let mut cols = line.split_whitespace();
        let Some(word) = cols.next() else {
            continue;
        };
        let query = Query {
            word: word.as_bytes(),
            min_common_len: cols.next().map_or(Ok(2), str::parse)?,
            min_dword_len: cols.next().map_or(Ok(1), str::parse)?,
            max_dword_len: cols.next().map_or(Ok(u32::MAX), str::parse)?,
            limit: cols.next().map_or(Ok(100), str::parse)?,
            depth_first_search: args.depth_first,
            com_prefix_only: args.prefix_only,
            average_limit: args.average_limit,
        };

        let start = Instant::now();
        let num_results = searcher.search(&query, &mut results);
        eprintln!(
            "Found {} results for {:?} in {} us",
            num_results,
            word,
            start.elapsed().as_micros()
        );
        for (i, m) in results.iter().enumerate() {
            let (head, rest) = m.dword.split_at(m.start_pos as usize);
            let (common, tail) = rest.split_at(m.common_len as usize);
            println!(
                "{}\t{}\t{}[{}]{}\t{}",
                i,
                String::from_utf8_lossy(m.dword),
                String::from_utf8_lossy(head),
                String::from_utf8_lossy(common),
                String::from_utf8_lossy(tail),
                String::from_utf8_lossy(m.value),
            );
        }
    }

    Ok(())
}
