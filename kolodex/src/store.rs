//! 共起インデックスの永続ストア
//!
//! このモジュールは、順序付き埋め込みKVストア(LMDB)の上に構築された
//! データセットハンドルを提供します。主な機能:
//!
//! - データセットの作成([`Store::create`])と読み取り用オープン([`Store::open`])
//! - インポート時の一括書き込み([`writer`])
//! - クエリ時のスナップショット読み取り([`reader`])
//! - データセットメタデータの永続化([`meta`])
//!
//! ストアに要求する性質は、バイト列キーの順序付け、プレフィックススキャン、
//! アトミックな書き込みトランザクション、ポイント読み取りの4つだけです。
//! クエリは1つの読み取りトランザクション(スナップショット)の中ですべての
//! スキャンを行い、一貫したビューを得ます。

pub mod meta;
pub mod reader;
pub mod writer;

use std::fs;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::errors::{KolodexError, Result};
use crate::profile;
use crate::tagset::{DeprelRegistry, TextTypes};

pub use crate::store::meta::Metadata;
pub use crate::store::reader::{RawTokenFreq, Snapshot};
pub use crate::store::writer::{ImportStats, TokenIdSeq};

/// ストアを開く際のチューニングオプション
///
/// LMDBのマップサイズはデータセットの上限サイズを決めます。マップは
/// スパースに確保されるため、大きめの既定値で実害はありません。
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// メモリマップの最大サイズ(バイト)
    pub map_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            map_size: 16 * 1024 * 1024 * 1024,
        }
    }
}

impl StoreOptions {
    /// マップサイズを変更したオプションを返します。
    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }
}

/// 開かれた共起データセット
///
/// 1つのデータセットディレクトリに対するプロセス内ハンドルです。
/// メタデータ、テキストタイプテーブル、凍結済みdeprelレジストリを
/// 所有します。複数クエリは独立したスナップショットを通して並行に
/// 実行できます。
pub struct Store {
    env: Env,
    db: Database<Bytes, Bytes>,
    metadata: Metadata,
    text_types: TextTypes,
    deprels: DeprelRegistry,
}

impl Store {
    /// 新しいデータセットを作成するためにストアを開きます。
    ///
    /// メタデータの読み込みは行いません。既存データベースの上書き
    /// (再インポート)にも使えます。テキストタイプテーブルは
    /// インポートプロファイルから渡されます。
    ///
    /// # エラー
    ///
    /// ディレクトリが作成できない場合、または基盤ストアが開けない場合に
    /// エラーを返します。
    pub fn create<P: AsRef<Path>>(
        path: P,
        options: StoreOptions,
        text_types: TextTypes,
    ) -> Result<Self> {
        fs::create_dir_all(path.as_ref())?;
        let (env, db) = open_env(path.as_ref(), options)?;
        Ok(Self {
            env,
            db,
            metadata: Metadata::default(),
            text_types,
            deprels: DeprelRegistry::new(),
        })
    }

    /// 既存のデータセットを問い合わせ用に開きます。
    ///
    /// メタデータレコードが必須です。書き込みが完了していない(メタデータが
    /// フラッシュされていない)データセットは開けません。メタデータから
    /// deprelレジストリとテキストタイプテーブルが再インストールされます。
    ///
    /// # エラー
    ///
    /// ストアが開けない場合、またはメタデータレコードが存在しないか
    /// 復号できない場合にエラーを返します。
    pub fn open<P: AsRef<Path>>(path: P, options: StoreOptions) -> Result<Self> {
        let (env, db) = open_env(path.as_ref(), options)?;
        let metadata = meta::read_metadata(&env, db)?.ok_or_else(|| {
            KolodexError::invalid_state(
                "failed to read dataset metadata",
                "the store has no metadata record; the dataset was not fully imported",
            )
        })?;

        let deprels = DeprelRegistry::from_map(&metadata.deprel_map);
        let text_types = if !metadata.text_type_map.is_empty() {
            TextTypes::from_map(metadata.text_type_map.clone())
        } else {
            match profile::find_profile(&metadata.profile_name) {
                Some(prof) => prof.text_types,
                None => {
                    log::warn!(
                        "unknown import profile {:?}, text type mapping won't be available",
                        metadata.profile_name
                    );
                    TextTypes::default()
                }
            }
        };
        log::info!(
            "loaded dataset metadata: profile={} corpus_size={} lemmas={} token_freqs={} pair_freqs={}",
            metadata.profile_name,
            metadata.corpus_size,
            metadata.counts.num_lemmas,
            metadata.counts.num_token_freqs,
            metadata.counts.num_pair_freqs,
        );

        Ok(Self {
            env,
            db,
            metadata,
            text_types,
            deprels,
        })
    }

    /// データセットの全レコードを削除します。
    ///
    /// 再ビルドがサポートされる唯一の更新経路です。インクリメンタルな
    /// 更新は存在しません。
    pub fn clear(&self) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    /// データセットのメタデータを返します。
    #[inline(always)]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// テキストタイプテーブルを返します。
    #[inline(always)]
    pub fn text_types(&self) -> &TextTypes {
        &self.text_types
    }

    /// このデータセットのdeprelレジストリを返します。
    #[inline(always)]
    pub fn deprels(&self) -> &DeprelRegistry {
        &self.deprels
    }

    #[inline(always)]
    pub(crate) fn env(&self) -> &Env {
        &self.env
    }

    #[inline(always)]
    pub(crate) fn db(&self) -> Database<Bytes, Bytes> {
        self.db
    }
}

fn open_env(path: &Path, options: StoreOptions) -> Result<(Env, Database<Bytes, Bytes>)> {
    if !path.is_dir() {
        return Err(KolodexError::invalid_argument(
            "path",
            format!("{} is not a directory", path.display()),
        ));
    }
    // SAFETY: the caller is expected not to open the same dataset
    // directory twice within one process, per the LMDB contract.
    let env = unsafe { EnvOpenOptions::new().map_size(options.map_size).open(path)? };
    let mut wtxn = env.write_txn()?;
    let db = env.create_database::<Bytes, Bytes>(&mut wtxn, None)?;
    wtxn.commit()?;
    Ok((env, db))
}
