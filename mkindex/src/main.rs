//! 共起データセットを構築するユーティリティ
//!
//! このバイナリは、依存構造解析済みのバーティカルファイル(単体または
//! ディレクトリ)を読み、頻度を集計してkolodexデータセットを書き出します。
//! 出力先を省略するとドライランになり、集計のプレビューだけを表示します。
//!
//! 終了コード: 0 成功、1 設定エラー、2 I/O・ストアエラー、3 パース
//! エラー、4 メタデータ書き込みエラー。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use kolodex::{
    find_profile, CorpusImporter, KolodexError, Metadata, Profile, Store, StoreOptions, TokenIdSeq,
};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(
    name = "mkindex",
    version,
    about = "Builds a collocation dataset from a dependency-parsed vertical corpus."
)]
struct Args {
    /// Vertical file or a directory of vertical files.
    vert_path: PathBuf,

    /// Target dataset directory. When omitted, the import runs dry and
    /// only prints a preview of the aggregated frequencies.
    db_path: Option<PathBuf>,

    /// Select a predefined import profile by corpus name (e.g. intercorp_v16ud).
    #[clap(short = 'p', long)]
    import_profile: Option<String>,

    /// Vertical file column position where the lemma is located.
    #[clap(long, default_value_t = 2)]
    lemma_idx: usize,

    /// Vertical file column position where the PoS is located.
    #[clap(long, default_value_t = 5)]
    pos_idx: usize,

    /// Vertical file column position where the syntactic parent reference is located.
    #[clap(long, default_value_t = 12)]
    parent_idx: usize,

    /// Vertical file column position where the dependency relation is located.
    #[clap(long, default_value_t = 11)]
    deprel_idx: usize,

    /// Structural attribute carrying the text type (e.g. text.txtype).
    #[clap(long)]
    text_type_attr: Option<String>,

    /// Minimal frequency of collocate pairs to be accepted.
    #[clap(short = 'm', long, default_value_t = 20)]
    min_freq: u32,

    /// Log level (debug, info, warn, error).
    #[clap(long, default_value = "info")]
    log_level: String,
}

/// インポート実行中に発生する可能性のあるエラー
///
/// バリアントは終了コードに対応します。
#[derive(Debug, Error)]
enum MkindexError {
    /// 設定エラー(終了コード1)
    #[error("{0}")]
    Config(String),

    /// I/O・ストアエラー(終了コード2)
    #[error(transparent)]
    Store(KolodexError),

    /// 入力のパースエラー(終了コード3)
    #[error(transparent)]
    Parse(KolodexError),

    /// メタデータ書き込みエラー(終了コード4)
    #[error(transparent)]
    Metadata(KolodexError),

    /// I/Oエラー(終了コード2)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MkindexError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::Store(_) | Self::Io(_) => 2,
            Self::Parse(_) => 3,
            Self::Metadata(_) => 4,
        }
    }
}

/// インポート中のエラーを終了コードのクラスに振り分けます。
///
/// 入力フォーマットの問題はパースエラー、それ以外(I/Oなど)は
/// I/Oエラーとして扱います。
fn classify_import_error(err: KolodexError) -> MkindexError {
    match err {
        KolodexError::InvalidFormat(_) => MkindexError::Parse(err),
        other => MkindexError::Store(other),
    }
}

fn resolve_profile(args: &Args) -> Result<Profile, MkindexError> {
    if let Some(name) = &args.import_profile {
        let profile = find_profile(name)
            .ok_or_else(|| MkindexError::Config(format!("import profile {name} not found")))?;
        log::info!("using import profile {name}");
        return Ok(profile);
    }
    let mut profile = Profile::from_columns(
        args.lemma_idx,
        args.pos_idx,
        args.parent_idx,
        args.deprel_idx,
    );
    if let Some(attr) = &args.text_type_attr {
        profile.text_type_attr = attr.clone();
    }
    Ok(profile)
}

/// 処理対象のファイル一覧を返します。
///
/// ディレクトリの場合は、決定的な順序のためにエントリ名でソートします。
fn files_to_process(path: &Path) -> Result<Vec<PathBuf>, MkindexError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}

fn print_preview(importer: &CorpusImporter) {
    eprintln!("-- dry run, aggregated frequencies preview --");
    for (key, freq) in importer.freqs.singles().iter().take(10) {
        eprintln!("{key:?} => {freq}");
    }
    for (key, stat) in importer.freqs.pairs().iter().take(10) {
        eprintln!("{key:?} => {stat:?}");
    }
    eprintln!(
        "-- totals: {} single entries, {} pair entries, corpus size {} --",
        importer.freqs.singles().len(),
        importer.freqs.pairs().len(),
        importer.corpus_size,
    );
}

fn run(args: &Args) -> Result<(), MkindexError> {
    let profile = resolve_profile(args)?;
    let files = files_to_process(&args.vert_path)?;
    if files.is_empty() {
        return Err(MkindexError::Config(format!(
            "no input files found in {}",
            args.vert_path.display()
        )));
    }

    let mut importer = CorpusImporter::new(&profile);
    for file in &files {
        log::info!(
            "extracting syntax data from {} (min pair freq {})",
            file.display(),
            args.min_freq
        );
        let rdr = BufReader::new(File::open(file)?);
        importer.import_reader(rdr).map_err(classify_import_error)?;
    }

    let Some(db_path) = &args.db_path else {
        print_preview(&importer);
        return Ok(());
    };

    let mut store = Store::create(db_path, StoreOptions::default(), profile.text_types.clone())
        .map_err(MkindexError::Store)?;
    store.clear().map_err(MkindexError::Store)?;

    let mut seq = TokenIdSeq::new();
    let stats = store
        .store_frequencies(&mut seq, &importer.freqs, args.min_freq)
        .map_err(MkindexError::Store)?;

    let metadata = Metadata {
        profile_name: profile.name.clone(),
        corpus_size: importer.corpus_size,
        counts: stats,
        deprel_map: importer.deprels.as_map(),
        text_type_map: profile.text_types.as_map(),
    };
    store
        .write_metadata(metadata)
        .map_err(MkindexError::Metadata)?;

    log::info!(
        "collected and stored dataset metadata: corpus_size={} lemmas={} token_freqs={} pair_freqs={} profile={}",
        importer.corpus_size,
        stats.num_lemmas,
        stats.num_token_freqs,
        stats.num_pair_freqs,
        profile.name,
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
