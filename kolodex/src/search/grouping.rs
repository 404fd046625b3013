//! スキャン中の動的グルーピング
//!
//! レンジスキャンで読んだ頻度行を、クエリのトグルに応じた粒度で
//! その場で集約します。キーは固定幅のバイト配列で、トグルが無効な
//! フィールドは集約前にゼロ化されます。
//!
//! 同一のゼロ化規則が`F(x)` / `F(y)`と`F(x,y)`の全グルーパーに
//! 適用されるため、ペアエントリの「レンマ1射影」は対応する`F(x)`
//! エントリのキーと構成上等しくなります。スコアリング段はこの等式を
//! 使って属性比較ではなくキー結合を行います。

use hashbrown::HashMap;

use crate::codec::PairFreqKey;
use crate::store::reader::RawTokenFreq;

/// `F(x)` / `F(y)`グルーパーのキー幅
pub(crate) const TOKEN_GROUP_KEY_LEN: usize = 6;

/// `F(x,y)`グルーパーのキー幅
pub(crate) const PAIR_GROUP_KEY_LEN: usize = 16;

/// 単一トークン頻度のグルーパー
///
/// キーのレイアウト: `[tokenID:4][pos:1][textType:1]`
#[derive(Debug, Default)]
pub(crate) struct TokenGrouping {
    by_pos: bool,
    by_tt: bool,
    data: HashMap<[u8; TOKEN_GROUP_KEY_LEN], u32>,
}

impl TokenGrouping {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 品詞でのグルーピングを有効にします。
    pub(crate) fn group_by_pos(&mut self) {
        self.by_pos = true;
    }

    /// テキストタイプでのグルーピングを有効にします。
    pub(crate) fn group_by_tt(&mut self) {
        self.by_tt = true;
    }

    /// 1行を集約に取り込みます。
    pub(crate) fn add(&mut self, row: &RawTokenFreq) {
        let pos = if self.by_pos { row.pos } else { 0 };
        let tt = if self.by_tt { row.text_type } else { 0 };
        let key = token_group_key(row.token_id, pos, tt);
        *self.data.entry(key).or_insert(0) += row.freq;
    }

    /// キーに対応する集約済み頻度を返します。未知のキーは`0`です。
    pub(crate) fn get(&self, key: &[u8; TOKEN_GROUP_KEY_LEN]) -> u32 {
        self.data.get(key).copied().unwrap_or(0)
    }
}

fn token_group_key(token_id: u32, pos: u8, tt: u8) -> [u8; TOKEN_GROUP_KEY_LEN] {
    let mut key = [0u8; TOKEN_GROUP_KEY_LEN];
    key[0..4].copy_from_slice(&token_id.to_le_bytes());
    key[4] = pos;
    key[5] = tt;
    key
}

/// グルーピング後の共起エントリ
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupedPair {
    pub token1_id: u32,
    pub pos1: u8,
    pub deprel: u16,
    pub token2_id: u32,
    pub pos2: u8,
    pub text_type: u8,
    pub freq: u32,
    pub mean_dist: f64,
}

impl GroupedPair {
    /// このエントリの最初のレンマ部分のキーを返します。
    ///
    /// ゼロ化はすでに[`PairGrouping::add`]で済んでいるため、同じ
    /// トグルを持つ`F(x)`グルーパーのキーと一致します。
    pub(crate) fn lemma1_key(&self) -> [u8; TOKEN_GROUP_KEY_LEN] {
        token_group_key(self.token1_id, self.pos1, self.text_type)
    }

    /// このエントリの2番目のレンマ部分のキーを返します。
    pub(crate) fn lemma2_key(&self) -> [u8; TOKEN_GROUP_KEY_LEN] {
        token_group_key(self.token2_id, self.pos2, self.text_type)
    }
}

/// 共起頻度のグルーパー
///
/// キーのレイアウト:
/// `[token1ID:4][pos1:1][deprel:2][token2ID:4][pos2:1][textType:1][pad:3]`
///
/// 挿入順を保持するため、スコアリング段の出力順(および同点時の順序)は
/// スキャン順に従います。
#[derive(Debug, Default)]
pub(crate) struct PairGrouping {
    by_pos1: bool,
    by_pos2: bool,
    by_deprel: bool,
    by_tt: bool,
    data: HashMap<[u8; PAIR_GROUP_KEY_LEN], GroupedPair>,
    order: Vec<[u8; PAIR_GROUP_KEY_LEN]>,
}

impl PairGrouping {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn group_by_pos1(&mut self) {
        self.by_pos1 = true;
    }

    pub(crate) fn group_by_pos2(&mut self) {
        self.by_pos2 = true;
    }

    pub(crate) fn group_by_deprel(&mut self) {
        self.by_deprel = true;
    }

    pub(crate) fn group_by_tt(&mut self) {
        self.by_tt = true;
    }

    /// 1つの共起行を集約に取り込みます。
    ///
    /// 既存エントリには頻度を合算し、平均距離は頻度重み付きで
    /// マージします。
    pub(crate) fn add(&mut self, key: &PairFreqKey, freq: u32, mean_dist: f64) {
        let entry = GroupedPair {
            token1_id: key.token1_id,
            pos1: if self.by_pos1 { key.pos1 } else { 0 },
            deprel: if self.by_deprel { key.deprel } else { 0 },
            token2_id: key.token2_id,
            pos2: if self.by_pos2 { key.pos2 } else { 0 },
            text_type: if self.by_tt { key.text_type } else { 0 },
            freq,
            mean_dist,
        };
        let group_key = pair_group_key(&entry);
        match self.data.get_mut(&group_key) {
            Some(current) => {
                let total = current.freq + entry.freq;
                if total > 0 {
                    current.mean_dist = (f64::from(current.freq) * current.mean_dist
                        + f64::from(entry.freq) * entry.mean_dist)
                        / f64::from(total);
                }
                current.freq = total;
            }
            None => {
                self.data.insert(group_key, entry);
                self.order.push(group_key);
            }
        }
    }

    /// 集約済みエントリを挿入順に返します。
    pub(crate) fn iter(&self) -> impl Iterator<Item = &GroupedPair> {
        self.order.iter().map(|key| &self.data[key])
    }
}

fn pair_group_key(entry: &GroupedPair) -> [u8; PAIR_GROUP_KEY_LEN] {
    let mut key = [0u8; PAIR_GROUP_KEY_LEN];
    key[0..4].copy_from_slice(&entry.token1_id.to_le_bytes());
    key[4] = entry.pos1;
    key[5..7].copy_from_slice(&entry.deprel.to_le_bytes());
    key[7..11].copy_from_slice(&entry.token2_id.to_le_bytes());
    key[11] = entry.pos2;
    key[12] = entry.text_type;
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Direction;

    fn pair_key(pos1: u8, deprel: u16, pos2: u8, tt: u8) -> PairFreqKey {
        PairFreqKey {
            direction: Direction::Head,
            token1_id: 1,
            pos1,
            text_type: tt,
            deprel,
            token2_id: 2,
            pos2,
        }
    }

    fn token_row(pos: u8, tt: u8, freq: u32) -> RawTokenFreq {
        RawTokenFreq {
            token_id: 1,
            pos,
            text_type: tt,
            freq,
        }
    }

    #[test]
    fn disabled_toggles_merge_entries() {
        let mut grouping = TokenGrouping::new();
        grouping.add(&token_row(0x08, 0x01, 5));
        grouping.add(&token_row(0x0f, 0x02, 7));
        assert_eq!(grouping.get(&token_group_key(1, 0, 0)), 12);
    }

    #[test]
    fn enabled_toggles_split_entries() {
        let mut grouping = TokenGrouping::new();
        grouping.group_by_pos();
        grouping.add(&token_row(0x08, 0x01, 5));
        grouping.add(&token_row(0x0f, 0x02, 7));
        assert_eq!(grouping.get(&token_group_key(1, 0x08, 0)), 5);
        assert_eq!(grouping.get(&token_group_key(1, 0x0f, 0)), 7);
    }

    #[test]
    fn pair_grouping_sums_and_merges_mean() {
        let mut grouping = PairGrouping::new();
        grouping.add(&pair_key(0x08, 0x22, 0x0f, 0x01), 3, 1.0);
        grouping.add(&pair_key(0x08, 0x23, 0x0f, 0x02), 1, -1.0);
        let entries: Vec<_> = grouping.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].freq, 4);
        // (3*1.0 + 1*(-1.0)) / 4
        assert!((entries[0].mean_dist - 0.5).abs() < 1e-9);
    }

    #[test]
    fn lemma_projections_join_with_token_grouping() {
        // identical toggle sets on both sides
        let mut pairs = PairGrouping::new();
        pairs.group_by_pos1();
        pairs.group_by_tt();
        let mut f1 = TokenGrouping::new();
        f1.group_by_pos();
        f1.group_by_tt();

        pairs.add(&pair_key(0x08, 0x22, 0x0f, 0x01), 2, 1.0);
        f1.add(&token_row(0x08, 0x01, 9));

        let entry = pairs.iter().next().unwrap();
        assert_eq!(f1.get(&entry.lemma1_key()), 9);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut grouping = PairGrouping::new();
        grouping.group_by_deprel();
        for deprel in [0x30u16, 0x10, 0x20] {
            grouping.add(&pair_key(0, deprel, 0, 0), 1, 0.0);
        }
        let deprels: Vec<u16> = grouping.iter().map(|e| e.deprel).collect();
        assert_eq!(deprels, vec![0x30, 0x10, 0x20]);
    }
}
