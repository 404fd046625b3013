//! インデックスの書き込み
//!
//! 集計済みの頻度マップ([`FreqAggregator`])をストアのレコード群に
//! 変換します。書き込みの内容:
//!
//! 1. 各レンマのID採番と、正引き(`0x02`)・逆引き(`0x03`)レコード
//! 2. 単一トークン頻度レコード(`0x04`)
//! 3. 最小ペア頻度を満たす共起レコード(`0x05`)
//!
//! 書き込みは単一スレッドで、キー順にソートした短命トランザクションの列
//! として流し込まれます。IDはレンマの辞書順に採番されるため、同じ
//! コーパスを再インポートするとバイト単位で同一のレコードが得られます。

use std::collections::BTreeSet;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::codec::{
    encode_pair_value, encode_token_id, encode_token_value, id_key, lemma_key, pair_freq_key,
    token_freq_key, Direction,
};
use crate::errors::{KolodexError, Result};
use crate::extract::freqs::FreqAggregator;
use crate::store::Store;

/// 1つの書き込みトランザクションに含めるレコード数
const WRITE_BATCH: usize = 8192;

/// インポートで書き込まれたレコード数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportStats {
    /// 採番されたレンマの数
    pub num_lemmas: u64,
    /// 単一トークン頻度レコードの数
    pub num_token_freqs: u64,
    /// 共起頻度レコードの数
    pub num_pair_freqs: u64,
}

/// トークンIDの採番器
///
/// インポート中に、相異なるレンマへ1から始まる安定な32ビットIDを
/// 割り当てます。品詞はIDと直交しており、同じレンマは品詞が違っても
/// 同じIDを受け取ります。`0`は「見つからない」を意味する番兵値として
/// 予約されています。
#[derive(Debug, Default)]
pub struct TokenIdSeq {
    value: u32,
    cache: HashMap<String, u32>,
}

impl TokenIdSeq {
    /// 空の採番器を作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// レンマのIDを返し、未登録なら新しいIDを採番します。
    ///
    /// 戻り値の2番目の要素は、レンマが既に登録済みだったかどうかです。
    ///
    /// # エラー
    ///
    /// 32ビットのID空間を使い切った場合は[`KolodexError::IdOverflow`]を
    /// 返します。インポートはこの時点で中断されます。
    pub fn next_if_absent(&mut self, lemma: &str) -> Result<(u32, bool)> {
        if let Some(&id) = self.cache.get(lemma) {
            return Ok((id, true));
        }
        self.value = self
            .value
            .checked_add(1)
            .ok_or(KolodexError::IdOverflow)?;
        self.cache.insert(lemma.to_string(), self.value);
        Ok((self.value, false))
    }

    /// 登録済みレンマのIDを返します。未登録なら`0`。
    pub fn recall(&self, lemma: &str) -> u32 {
        self.cache.get(lemma).copied().unwrap_or(0)
    }

    /// 採番済みレンマの数を返します。
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// 採番器が空かどうかを返します。
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Store {
    /// 集計済みの頻度をストアに書き込みます。
    ///
    /// `min_pair_freq`未満の共起エントリはこの時点で捨てられ、
    /// 読み取り側からは存在しないものになります。
    ///
    /// # 引数
    ///
    /// * `seq` - トークンIDの採番器(通常は空の新品)
    /// * `freqs` - パス集計の結果
    /// * `min_pair_freq` - 共起レコードを残す最小頻度
    ///
    /// # 戻り値
    ///
    /// 書き込まれたレコード数。メタデータに記録されます。
    pub fn store_frequencies(
        &self,
        seq: &mut TokenIdSeq,
        freqs: &FreqAggregator,
        min_pair_freq: u32,
    ) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        // Ids are minted in lexicographic lemma order so that repeated
        // imports of the same corpus assign identical ids.
        let lemmas: BTreeSet<&str> = freqs
            .singles()
            .keys()
            .map(|k| k.lemma.as_str())
            .collect();
        let mut records: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(lemmas.len() * 2);
        for lemma in lemmas {
            let (id, known) = seq.next_if_absent(lemma)?;
            if known {
                continue;
            }
            records.push((lemma_key(lemma), encode_token_id(id).to_vec()));
            records.push((id_key(id).to_vec(), lemma.as_bytes().to_vec()));
            stats.num_lemmas += 1;
        }
        self.put_sorted(records)?;

        // Entries whose keys coincide after deprel truncation are merged
        // here, not overwritten.
        let mut token_records: HashMap<[u8; 8], u32> = HashMap::new();
        for (key, &freq) in freqs.singles() {
            let id = seq.recall(&key.lemma);
            debug_assert_ne!(id, 0);
            let stored = token_freq_key(id, key.pos, key.text_type, key.deprel);
            *token_records.entry(stored).or_insert(0) += freq;
        }
        stats.num_token_freqs = token_records.len() as u64;
        self.put_sorted(
            token_records
                .into_iter()
                .map(|(k, v)| (k.to_vec(), encode_token_value(v).to_vec()))
                .collect(),
        )?;

        let mut pair_records: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for (key, stat) in freqs.pairs() {
            if stat.freq < min_pair_freq {
                continue;
            }
            let id1 = seq.recall(&key.lemma1);
            let id2 = seq.recall(&key.lemma2);
            if id1 == 0 || id2 == 0 {
                log::error!(
                    "pair entry ({}, {}) references a lemma without an id, skipping",
                    key.lemma1,
                    key.lemma2
                );
                continue;
            }
            let direction = if stat.mean_dist >= 0.0 {
                Direction::Head
            } else {
                Direction::Dependent
            };
            let stored = pair_freq_key(
                direction,
                id1,
                key.pos1,
                key.text_type,
                key.deprel,
                id2,
                key.pos2,
            );
            pair_records.push((
                stored.to_vec(),
                encode_pair_value(stat.freq, stat.mean_dist).to_vec(),
            ));
        }
        stats.num_pair_freqs = pair_records.len() as u64;
        self.put_sorted(pair_records)?;

        Ok(stats)
    }

    /// レコード列をキー順に整列し、固定サイズのトランザクションで
    /// 書き込みます。
    fn put_sorted(&self, mut records: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        records.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for chunk in records.chunks(WRITE_BATCH) {
            let mut wtxn = self.env().write_txn()?;
            for (key, value) in chunk {
                self.db().put(&mut wtxn, key, value)?;
            }
            wtxn.commit()?;
        }
        Ok(())
    }
}
