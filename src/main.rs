use clap::{arg, crate_version, value_parser, Command};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ptreap::{Natural, NodePool, Treap};

pub fn open_file<P>(filename: P) -> std::io::Result<BufReader<File>>
where
    P: AsRef<Path>,
{
    let f = File::open(filename)?;
    Ok(BufReader::new(f))
}

fn main() -> Result<(), Box<dyn Error>> {
    if std::env::var("PTREAP_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PTREAP_LOG")
            .write_style("PTREAP_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Generate a CLI, and get input filename to process
    let params = Command::new("ptreap")
        .version(crate_version!())
        .about("Load the distinct words of a text file into a persistent treap and list them in order")
        .arg(arg!(tokens: <FILE> "A text file containing words").required(true).value_parser(value_parser!(PathBuf)))
        .arg(arg!(-p --pivot <WORD> "List words greater than or equal to this one. Defaults to the smallest word").required(false))
        .arg(arg!(-l --limit <LIMIT> "The maximum number of words to list").required(false).default_value("20").value_parser(value_parser!(usize)))
        .arg(arg!(-s --seed <SEED> "Seed for the priority generator, for reproducible tree shapes").required(false).value_parser(value_parser!(u64)))
        .arg(arg!(--pool <CAPACITY> "Recycle nodes through a pool holding up to this many idle slots").required(false).value_parser(value_parser!(usize)))
        .get_matches();
    let input_file = params
        .get_one::<PathBuf>("tokens")
        .ok_or("missing input file")?;
    let limit = params.get_one::<usize>("limit").copied().unwrap_or(20);

    let mut rng = match params.get_one::<u64>("seed") {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_os_rng(),
    };
    let mut treap = match params.get_one::<usize>("pool") {
        Some(capacity) => {
            let pool = NodePool::<String>::builder().capacity(*capacity).build::<String>()?;
            Treap::with_pool(Natural, Arc::new(pool))
        }
        None => Treap::new(),
    };

    let re = Regex::new(r"[^\w\s]")?;
    let mut seen = 0usize;
    for line in open_file(input_file)?.lines() {
        for word in line?.split_whitespace() {
            let clean_word = re.replace_all(word, "").to_lowercase();
            if clean_word.is_empty() {
                continue;
            }
            treap = treap.upsert_with_rng(clean_word, &mut rng);
            seen += 1;
        }
    }
    debug!("read {seen} tokens from {}", input_file.display());

    println!("Unique tokens: {}", treap.len());
    println!("Tree height: {}", treap.height());
    if let (Some(min), Some(max)) = (treap.min(), treap.max()) {
        println!("Range: {min} .. {max}");
    }

    let pivot = match params.get_one::<String>("pivot") {
        Some(pivot) => pivot.to_lowercase(),
        None => treap.min().cloned().unwrap_or_default(),
    };
    let mut listed = 0;
    treap.visit_ascend(&pivot, |word| {
        if listed == limit {
            return false;
        }
        println!("  {word}");
        listed += 1;
        true
    });

    if let Some(pool) = treap.pool() {
        println!("Pool: {:?}", pool.stats());
    }
    Ok(())
}
