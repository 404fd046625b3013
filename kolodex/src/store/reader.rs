//! インデックスの読み取り
//!
//! クエリは[`Snapshot`]を1つ取得し、その中ですべてのスキャンと
//! ポイント読み取りを行います。スナップショットは基盤ストアの
//! 読み取りトランザクションであり、クエリの間一貫したビューを保証します。
//!
//! スナップショットはクエリ内で繰り返される参照(ID→レンマ、
//! 単一トークン頻度)のメモ化テーブルを持ちます。これらのテーブルは
//! クエリ終了時にスナップショットごと破棄されます。

use std::cell::RefCell;

use hashbrown::HashMap;
use heed::RoTxn;

use crate::codec::{
    decode_pair_freq_key, decode_pair_value, decode_token_freq_key, decode_token_id,
    decode_token_value, id_key, lemma_key, pair_freq_prefix, token_freq_search_key, Direction,
    PairFreqKey,
};
use crate::errors::Result;
use crate::store::Store;

/// 復号済みの単一トークン頻度行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTokenFreq {
    /// トークンID
    pub token_id: u32,
    /// 品詞コード
    pub pos: u8,
    /// テキストタイプ
    pub text_type: u8,
    /// 出現頻度
    pub freq: u32,
}

/// 1クエリ分の一貫した読み取りビュー
///
/// 複数のクエリはそれぞれ独立したスナップショットを使い、可変状態を
/// 共有しません。スナップショット内の処理は単一スレッドの協調的
/// リーダーとして設計されています。
pub struct Snapshot<'a> {
    store: &'a Store,
    rtxn: RoTxn<'a>,
    lemma_cache: RefCell<HashMap<u32, Option<String>>>,
    token_freq_cache: RefCell<HashMap<Vec<u8>, Vec<RawTokenFreq>>>,
}

impl Store {
    /// 新しい読み取りスナップショットを取得します。
    pub fn snapshot(&self) -> Result<Snapshot<'_>> {
        Ok(Snapshot {
            store: self,
            rtxn: self.env().read_txn()?,
            lemma_cache: RefCell::new(HashMap::new()),
            token_freq_cache: RefCell::new(HashMap::new()),
        })
    }
}

impl<'a> Snapshot<'a> {
    /// レンマの数値IDを返します。
    ///
    /// 見つからない場合は`None`です(エラーではありません)。
    pub fn lemma_id(&self, lemma: &str) -> Result<Option<u32>> {
        let key = lemma_key(lemma);
        match self.store.db().get(&self.rtxn, &key)? {
            Some(value) => Ok(Some(decode_token_id(value)?)),
            None => Ok(None),
        }
    }

    /// プレフィックスに一致するすべての(レンマ, ID)を順序付きで返します。
    ///
    /// レンマの前方一致補完に使われます。
    pub fn lemmas_by_prefix(&self, prefix: &str) -> Result<Vec<(String, u32)>> {
        let key = lemma_key(prefix);
        let mut out = Vec::new();
        let iter = self.store.db().prefix_iter(&self.rtxn, &key)?;
        for row in iter {
            let (stored_key, value) = row?;
            let lemma = std::str::from_utf8(&stored_key[1..])?.trim().to_string();
            out.push((lemma, decode_token_id(value)?));
        }
        Ok(out)
    }

    /// IDからレンマを逆引きします。
    ///
    /// 結果はスナップショット内でメモ化されます。見つからない場合は
    /// `None`です。
    pub fn lemma_by_id(&self, token_id: u32) -> Result<Option<String>> {
        if let Some(cached) = self.lemma_cache.borrow().get(&token_id) {
            return Ok(cached.clone());
        }
        let key = id_key(token_id);
        let ans = match self.store.db().get(&self.rtxn, &key)? {
            Some(value) => Some(std::str::from_utf8(value)?.trim().to_string()),
            None => None,
        };
        self.lemma_cache.borrow_mut().insert(token_id, ans.clone());
        Ok(ans)
    }

    /// 指定トークンの単一頻度行をすべて返します。
    ///
    /// 属性`pos` / `text_type` / `deprel`は省略可能(ゼロ)で、階層的に
    /// 解釈されます: `pos`がゼロなら残りは無視され、`pos`があって
    /// `text_type`がゼロなら`deprel`は無視されます(検索キーの切り詰めに
    /// よる)。結果はスナップショット内でメモ化されます。
    ///
    /// 復号できない行は記録の上スキップされ、クエリ全体は失われません。
    pub fn token_freqs(
        &self,
        token_id: u32,
        pos: u8,
        text_type: u8,
        deprel: u16,
    ) -> Result<Vec<RawTokenFreq>> {
        let search_key = token_freq_search_key(token_id, pos, text_type, deprel);
        if let Some(cached) = self.token_freq_cache.borrow().get(&search_key) {
            return Ok(cached.clone());
        }
        let mut out = Vec::new();
        let iter = self.store.db().prefix_iter(&self.rtxn, &search_key)?;
        for row in iter {
            let (stored_key, value) = row?;
            let decoded = match decode_token_freq_key(stored_key) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("skipping undecodable token freq row: {err}");
                    continue;
                }
            };
            let freq = match decode_token_value(value) {
                Ok(freq) => freq,
                Err(err) => {
                    log::warn!("skipping undecodable token freq value: {err}");
                    continue;
                }
            };
            out.push(RawTokenFreq {
                token_id,
                pos: decoded.pos,
                text_type: decoded.text_type,
                freq,
            });
        }
        self.token_freq_cache
            .borrow_mut()
            .insert(search_key, out.clone());
        Ok(out)
    }

    /// 指定方向・指定トークンのすべての共起行を走査します。
    ///
    /// (direction, tokenID)を共有する行は連続区間を成すため、走査は
    /// 1回のプレフィックススキャンです。復号できない行は記録の上
    /// スキップされます。コールバックが返すエラー、およびスキャン外の
    /// ストアエラーは呼び出し側へ伝播し、クエリを中断します。
    pub fn for_each_pair<F>(&self, direction: Direction, token1_id: u32, mut f: F) -> Result<()>
    where
        F: FnMut(PairFreqKey, u32, f64) -> Result<()>,
    {
        let prefix = pair_freq_prefix(direction, token1_id);
        let iter = self.store.db().prefix_iter(&self.rtxn, &prefix)?;
        for row in iter {
            let (stored_key, value) = row?;
            let key = match decode_pair_freq_key(stored_key) {
                Ok(key) => key,
                Err(err) => {
                    log::warn!("skipping undecodable pair row: {err}");
                    continue;
                }
            };
            let (freq, mean_dist) = match decode_pair_value(value) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("skipping undecodable pair value: {err}");
                    continue;
                }
            };
            f(key, freq, mean_dist)?;
        }
        Ok(())
    }
}
