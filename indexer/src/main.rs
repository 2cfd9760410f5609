use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use newsdex_core::persist::{open_index, save_index, save_meta, IndexPaths, MetaFile, FORMAT_VERSION};
use newsdex_core::present::{Hit, PresentOptions, Presenter};
use newsdex_core::{query, IndexBuilder, IndexConfig, JsonLoader, LoadPolicy, Searcher};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs;
use std::path::Path;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query boolean news indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of JSON/JSONL news files (or a single file)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Index title, date, keywords and summary as well as the article
        #[arg(long, default_value_t = false)]
        multifield: bool,
        /// Keep token positions so phrase queries work
        #[arg(long, default_value_t = false)]
        positional: bool,
        /// Resolve terms through their stems at query time
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Enable wildcard terms through a permuterm index
        #[arg(long, default_value_t = false)]
        permuterm: bool,
        /// Skip files that fail to load instead of aborting
        #[arg(long, default_value_t = false)]
        skip_unreadable: bool,
    },
    /// Print index statistics
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
        /// Print the statistics as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run queries against a built index
    Query(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long, default_value = "./index")]
    index: String,
    /// A single query
    #[arg(long, short = 'q', conflicts_with_all = ["file", "test"])]
    query: Option<String>,
    /// A file with one query per line
    #[arg(long, conflicts_with = "test")]
    file: Option<String>,
    /// A file of `query<TAB>expected count` lines to check
    #[arg(long)]
    test: Option<String>,
    /// Only print the number of results
    #[arg(long, default_value_t = false)]
    count: bool,
    /// Show every result instead of the first few
    #[arg(long, default_value_t = false)]
    all: bool,
    /// Show a highlighted snippet for each result
    #[arg(long, default_value_t = false)]
    snippet: bool,
    /// Match terms literally even if the index was built with stemming
    #[arg(long, default_value_t = false)]
    no_stem: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, multifield, positional, stem, permuterm, skip_unreadable } => {
            let on_load_error = if skip_unreadable { LoadPolicy::Skip } else { LoadPolicy::Abort };
            let config = IndexConfig { multifield, positional, stemming: stem, permuterm, on_load_error };
            build_index(&input, &output, config)
        }
        Commands::Stats { index, json } => show_stats(&index, json),
        Commands::Query(args) => run_queries(args),
    }
}

fn build_index(input: &str, output: &str, config: IndexConfig) -> Result<()> {
    let input_path = Path::new(input);
    if !input_path.exists() {
        bail!("input path {input} does not exist");
    }
    let out_paths = IndexPaths::new(output);

    let mut builder = IndexBuilder::new(config);
    builder.index_dir(input_path, &JsonLoader).with_context(|| format!("indexing {input}"))?;
    let index = builder.finish();

    save_index(&out_paths, &index)?;
    let meta = MetaFile {
        num_news: index.news_count(),
        num_docs: index.doc_count() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, news = meta.num_news, docs = meta.num_docs, "index build complete");
    Ok(())
}

fn open(index_dir: &str) -> Result<Searcher> {
    let index = open_index(&IndexPaths::new(index_dir)).with_context(|| format!("opening index in {index_dir}"))?;
    Ok(Searcher::new(index))
}

fn show_stats(index_dir: &str, json: bool) -> Result<()> {
    let searcher = open(index_dir)?;
    let stats = searcher.index().stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("{}", "=".repeat(40));
    println!("Number of indexed files: {}", stats.docs);
    println!("{}", "-".repeat(40));
    println!("Number of indexed news: {}", stats.news);
    println!("{}", "-".repeat(40));
    println!("Number of indexed days: {}", stats.days);
    println!("{}", "-".repeat(40));
    println!("TOKENS:");
    for (field, size) in &stats.vocabulary {
        println!("\t# of tokens in '{field}': {size}");
    }
    println!("{}", "-".repeat(40));
    if stats.positional {
        println!("Positional queries are allowed.");
    } else {
        println!("Positional queries are NOT allowed.");
    }
    if stats.stemming {
        println!("Stemming is available.");
    }
    if stats.permuterm {
        println!("Wildcard queries are allowed.");
    }
    println!("{}", "=".repeat(40));
    Ok(())
}

fn run_queries(args: QueryArgs) -> Result<()> {
    let mut searcher = open(&args.index)?;
    if args.no_stem {
        searcher = searcher.without_stemming();
    }

    if let Some(test) = &args.test {
        return check_queries(&searcher, test);
    }

    let queries: Vec<String> = match (&args.query, &args.file) {
        (Some(q), _) => vec![q.clone()],
        (None, Some(file)) => read_lines(file)?,
        (None, None) => bail!("one of --query, --file or --test is required"),
    };

    let options = PresentOptions { limit: if args.all { None } else { Some(newsdex_core::present::SHOW_MAX) }, snippets: args.snippet };
    for q in &queries {
        if args.count {
            match searcher.count(q) {
                Ok(n) => println!("{q}\t{n}"),
                Err(err) => eprintln!("{q}\tERROR: {err}"),
            }
        } else if let Err(err) = show_query(&searcher, q, options) {
            eprintln!("Query '{q}' failed: {err:#}");
        }
    }
    Ok(())
}

fn show_query(searcher: &Searcher, text: &str, options: PresentOptions) -> Result<()> {
    let Some(parsed) = query::parse(text)? else {
        println!("Query '{text}' is empty");
        return Ok(());
    };
    let results = searcher.rank(searcher.evaluate(&parsed)?, &parsed);

    let mut presenter = Presenter::new(searcher.index(), &JsonLoader);
    let hits = presenter.present(&results, Some(&parsed), options)?;

    println!("{}", "=".repeat(40));
    println!("Query: '{text}'");
    println!("Number of results: {}", results.len());
    for (i, hit) in hits.iter().enumerate() {
        print_hit(hit);
        if i + 1 < hits.len() {
            println!("{}", "-".repeat(20));
        }
    }
    println!("{}", "=".repeat(40));
    Ok(())
}

fn print_hit(hit: &Hit) {
    println!("#{}", hit.rank);
    println!("{}", hit.news_id);
    println!("Date: {}", hit.date);
    println!("Title: {}", hit.title);
    println!("Keywords: {}", hit.keywords);
    if let Some(snippet) = &hit.snippet {
        println!("{snippet}");
    }
}

/// Compare result counts against `query<TAB>count` lines and report every mismatch.
fn check_queries(searcher: &Searcher, file: &str) -> Result<()> {
    let mut failures = 0usize;
    let lines = read_lines(file)?;
    for line in &lines {
        match check_line(searcher, line)? {
            None => println!("{line}"),
            Some(mismatch) => {
                failures += 1;
                println!("{mismatch}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} queries did not return the expected number of results", lines.len());
    }
    println!("All {} queries returned the expected number of results", lines.len());
    Ok(())
}

/// Split a `query<TAB>count` line. The query itself may contain tabs; the count follows the last.
fn parse_test_line(line: &str) -> Result<(&str, usize)> {
    let Some((q, expected)) = line.rsplit_once('\t') else {
        bail!("line '{line}' is not in `query<TAB>count` form");
    };
    let expected = expected.trim().parse().with_context(|| format!("bad count in line '{line}'"))?;
    Ok((q, expected))
}

/// `None` when the query returns the expected count, otherwise the mismatch report.
fn check_line(searcher: &Searcher, line: &str) -> Result<Option<String>> {
    let (q, expected) = parse_test_line(line)?;
    Ok(match searcher.count(q) {
        Ok(n) if n == expected => None,
        Ok(n) => Some(format!(">>>>{q}\t{expected} != {n}<<<<")),
        Err(err) => Some(format!(">>>>{q}\t{expected} != ERROR: {err}<<<<")),
    })
}

fn read_lines(file: &str) -> Result<Vec<String>> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {file}"))?;
    Ok(text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
