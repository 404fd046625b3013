//! 共起検索を実行するユーティリティ
//!
//! このバイナリは、データセットと見出し語を受け取り、共起語とスコアを
//! 表形式または1行1レコードのJSONで出力します。REPLモードでは
//! 標準入力から`lemma [pos|-] [tt|-]`形式の行を終端まで読み続けます。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::Parser;

use kolodex::{
    Collocation, Direction, Measure, PredefinedSearch, SearchOptions, Searcher, Store,
    StoreOptions,
};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(
    name = "search",
    version,
    about = "Searches for collocations of a provided lemma."
)]
struct Args {
    /// Dataset directory.
    db_path: PathBuf,

    /// Searched lemma. Required unless --repl is set.
    lemma: Option<String>,

    /// Optional PoS restriction of the searched lemma.
    pos: Option<String>,

    /// Optional text type restriction.
    text_type: Option<String>,

    /// Max number of matching items to show.
    #[clap(short = 'l', long, default_value_t = 10)]
    limit: usize,

    /// Sorting measure (ldice, tscore, lmi, ll or rrf).
    #[clap(short = 's', long, default_value = "rrf")]
    sort_by: String,

    /// Treat the lemma as a prefix and search all matching headwords.
    #[clap(long)]
    prefix_search: bool,

    /// Scanned direction of the headword (head, dependent or both).
    #[clap(short = 'd', long, default_value = "both")]
    direction: String,

    /// Drop pairs whose absolute mean distance exceeds this value.
    #[clap(long)]
    max_dist: Option<f64>,

    /// Split collocates by their PoS.
    #[clap(long)]
    collocate_group_by_pos: bool,

    /// Split collocates by their deprel variants.
    #[clap(long)]
    group_by_deprel: bool,

    /// Split collocates by their text type.
    #[clap(long)]
    collocate_group_by_tt: bool,

    /// Use a predefined search (modifiers-of, nouns-modified-by,
    /// verbs-subject, verbs-object).
    #[clap(long)]
    predefined_search: Option<String>,

    /// Print results as one JSON record per line.
    #[clap(long)]
    json_out: bool,

    /// Run an infinite read-eval-print loop over standard input.
    #[clap(long)]
    repl: bool,

    /// Log level (debug, info, warn, error).
    #[clap(long, default_value = "info")]
    log_level: String,
}

/// REPL行(`lemma [pos|-] [tt|-]`)を分解したクエリ
#[derive(Debug, Default, Clone)]
struct SearchCommand {
    lemma: String,
    pos: Option<String>,
    text_type: Option<String>,
}

impl SearchCommand {
    fn parse(line: &str) -> Self {
        let mut items = line.split_whitespace();
        let lemma = items.next().unwrap_or_default().to_string();
        let pos = items.next().filter(|v| *v != "-").map(str::to_string);
        let text_type = items.next().filter(|v| *v != "-").map(str::to_string);
        Self {
            lemma,
            pos,
            text_type,
        }
    }
}

fn build_options(args: &Args, command: &SearchCommand) -> Result<SearchOptions, String> {
    let sort_by = Measure::from_str(&args.sort_by).map_err(str::to_string)?;
    let mut options = SearchOptions::default()
        .with_limit(args.limit)
        .with_sort_by(sort_by);
    if let Some(pos) = &command.pos {
        options = options.with_pos(pos.clone());
    }
    if let Some(text_type) = &command.text_type {
        options = options.with_text_type(text_type.clone());
    }
    if args.prefix_search {
        options = options.with_prefix_search();
    }
    match args.direction.as_str() {
        "both" => {}
        "head" => options = options.with_direction(Direction::Head),
        "dependent" => options = options.with_direction(Direction::Dependent),
        other => {
            return Err(format!(
                "could not parse a direction {other:?} (expected head, dependent or both)"
            ));
        }
    }
    if let Some(max_dist) = args.max_dist {
        options = options.with_max_mean_abs_dist(max_dist);
    }
    if args.collocate_group_by_pos {
        options = options.with_group_by_collocate_pos();
    }
    if args.group_by_deprel {
        options = options.with_group_by_deprel();
    }
    if args.collocate_group_by_tt {
        options = options.with_group_by_text_type();
    }
    if let Some(predefined) = &args.predefined_search {
        let predefined = PredefinedSearch::from_str(predefined).map_err(str::to_string)?;
        options = options.with_predefined(predefined);
    }
    Ok(options)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn print_json(results: &[Collocation]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for item in results {
        let record = serde_json::json!({
            "lemma": {"value": item.lemma.as_str(), "pos": item.lemma_pos.as_str()},
            "isHead": item.is_head(),
            "collocate": {"value": item.collocate.as_str(), "pos": item.collocate_pos.as_str()},
            "deprel": item.deprel.as_str(),
            "logDice": round3(item.log_dice),
            "tScore": round3(item.t_score),
            "mutualDist": round3(item.mutual_dist),
            "lmi": round3(item.lmi),
            "logLikelihood": round3(item.log_likelihood),
            "rrfScore": round3(item.rrf_score),
            "textType": item.text_type.as_str(),
        });
        writeln!(out, "{record}")?;
    }
    Ok(())
}

fn format_score(value: f64) -> String {
    if value.is_infinite() {
        "-".to_string()
    } else {
        format!("{value:.2}")
    }
}

fn format_dependency(item: &Collocation) -> String {
    if item.mutual_dist < 0.0 {
        match item.deprel.as_str() {
            "" => "\u{2192}".to_string(),
            deprel => format!("{deprel} \u{2192}"),
        }
    } else {
        match item.deprel.as_str() {
            "" => "\u{2190}".to_string(),
            deprel => format!("\u{2190} {deprel}"),
        }
    }
}

fn print_table(results: &[Collocation]) {
    if results.is_empty() {
        println!("-- NO RESULT --");
        return;
    }
    println!(
        "{:<12} {:<16} {:<14} {:<16} {:>8} {:>9} {:>9} {:>9} {:>8} {:>7}",
        "registry",
        "lemma",
        "dependency",
        "collocate",
        "T-Score",
        "Log-Dice",
        "LMI",
        "LL",
        "RRF",
        "dist.",
    );
    println!("{}", "\u{2550}".repeat(116));
    for item in results {
        let registry = if item.text_type.is_empty() {
            "-"
        } else {
            item.text_type.as_str()
        };
        let lemma_props = if item.lemma_pos.is_empty() {
            "(-)".to_string()
        } else {
            format!("({})", item.lemma_pos)
        };
        let collocate_props = if item.collocate_pos.is_empty() {
            "(-)".to_string()
        } else {
            format!("({})", item.collocate_pos)
        };
        println!(
            "{:<12} {:<16} {:<14} {:<16} {:>8} {:>9} {:>9} {:>9} {:>8.4} {:>7}",
            registry,
            format!("{} {}", item.lemma, lemma_props),
            format_dependency(item),
            format!("{} {}", item.collocate, collocate_props),
            format_score(item.t_score),
            format_score(item.log_dice),
            format_score(item.lmi),
            format_score(item.log_likelihood),
            item.rrf_score,
            format_score(item.mutual_dist),
        );
    }
}

fn run_query(store: &Store, args: &Args, command: &SearchCommand) -> Result<(), String> {
    let options = build_options(args, command)?;
    let results = Searcher::new(store)
        .collocations_of(&command.lemma, &options)
        .map_err(|err| err.to_string())?;
    if args.json_out {
        print_json(&results).map_err(|err| err.to_string())?;
    } else {
        println!();
        print_table(&results);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    let store = match Store::open(&args.db_path, StoreOptions::default()) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("ERROR: {err}");
            return ExitCode::from(1);
        }
    };

    if !args.repl {
        let Some(lemma) = args.lemma.clone() else {
            eprintln!("ERROR: no lemma entered (use --repl for interactive mode)");
            return ExitCode::from(1);
        };
        let command = SearchCommand {
            lemma,
            pos: args.pos.clone(),
            text_type: args.text_type.clone(),
        };
        if let Err(err) = run_query(&store, &args, &command) {
            eprintln!("ERROR: {err}");
            return ExitCode::from(1);
        }
        return ExitCode::SUCCESS;
    }

    // REPL mode: cancellation happens only at whole-query boundaries
    let stdin = io::stdin();
    loop {
        println!("\nenter a query (lemma [optional PoS] [optional TT]):");
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                eprintln!("ERROR: {err}");
                return ExitCode::from(1);
            }
        }
        let command = SearchCommand::parse(&line);
        if command.lemma.is_empty() {
            println!("no query entered");
            continue;
        }
        if let Err(err) = run_query(&store, &args, &command) {
            eprintln!("ERROR: {err}");
        }
    }
    ExitCode::SUCCESS
}
