//! # Kolodex
//!
//! Kolodexは、依存構造解析済みコーパスから抽出した統語的共起
//! (コロケーション)の埋め込み型オンディスクインデックスです。
//!
//! ## 概要
//!
//! このライブラリは、見出し語(レンマ、任意で品詞・ジャンル・依存関係に
//! よる絞り込み付き)に対して、統計的に最も結び付きの強い共起レンマを、
//! 複数の共起強度指標とその融合順位とともに返します。
//!
//! ## 主な機能
//!
//! - **順序付きキー・値インデックス**: プレフィックススキャンで引ける
//!   バイナリキーレイアウトと、レンマを32ビットIDに圧縮するID列
//! - **スキャン中の動的グルーピング**: 品詞・deprel・テキストタイプの
//!   任意の組み合わせによるその場の集約
//! - **4つの共起強度指標**: T-Score、Log-Dice、LMI、G²(対数尤度比)
//! - **順位融合**: Reciprocal Rank Fusionによる指標横断の並べ替え
//! - **バーティカルコーパスのインポート**: 依存木の根向きパス抽出と
//!   頻度集計
//!
//! ## 使用例
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kolodex::{Measure, SearchOptions, Searcher, Store, StoreOptions};
//!
//! let store = Store::open("path/to/dataset", StoreOptions::default())?;
//! let results = Searcher::new(&store).collocations_of(
//!     "dog",
//!     &SearchOptions::default()
//!         .with_pos("NOUN")
//!         .with_sort_by(Measure::TScore)
//!         .with_limit(10),
//! )?;
//! for collocation in &results {
//!     println!("{} {:.2}", collocation.collocate, collocation.t_score);
//! }
//! # Ok(())
//! # }
//! ```

/// キー・値コーデック
pub mod codec;

/// エラー型の定義
pub mod errors;

/// コーパスからの統語データ抽出
pub mod extract;

/// インポートプロファイル
pub mod profile;

/// 検索とスコアリング
pub mod search;

/// 永続ストア
pub mod store;

/// タグセットのコードテーブル
pub mod tagset;

#[cfg(test)]
mod tests;

// Re-exports
pub use codec::Direction;
pub use errors::{KolodexError, Result};
pub use extract::CorpusImporter;
pub use profile::{find_profile, Profile};
pub use search::{Collocation, Measure, PredefinedSearch, SearchOptions, Searcher};
pub use store::{ImportStats, Metadata, Store, StoreOptions, TokenIdSeq};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
