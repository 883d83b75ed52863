use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::Instant;

use tremolo::DictionaryBuilder;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    name = "compile",
    about = "A program to compile the dictionary database."
)]
struct Args {
    /// Dictionary file with one key<TAB>value record per line.
    #[clap(short = 'i', long)]
    dict_in: PathBuf,

    /// File to which the binary database is output.
    #[clap(short = 'o', long)]
    db_out: PathBuf,

    /// Minimum indexed suffix length as a ratio of the word length.
    #[clap(short = 'r', long, default_value = "0.5")]
    suffix_ratio: f64,

    /// Global minimum indexed suffix length.
    #[clap(short = 's', long, default_value = "2")]
    min_suffix: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    eprintln!("Compiling the dictionary...");
    let start = Instant::now();
    let dict = DictionaryBuilder::new()
        .suffix_ratio(args.suffix_ratio)?
        .min_suffix(args.min_suffix)?
        .build_from_reader(BufReader::new(File::open(args.dict_in)?))?;
    eprintln!("{} seconds", start.elapsed().as_secs_f64());
    eprintln!("{} words", dict.num_dwords());

    eprintln!("Writting the database...: {:?}", &args.db_out);
    let num_bytes = dict.write(BufWriter::new(File::create(args.db_out)?))?;
    eprintln!("{} MiB", num_bytes as f64 / (1024. * 1024.));

    Ok(())
}
