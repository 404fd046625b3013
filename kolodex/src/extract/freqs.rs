//! パス上の頻度集計
//!
//! 書き込みの前段として、`F(x)`(単一トークン頻度)と`F(x,y)`
//! (共起頻度 + 平均依存距離)をメモリ上のマップに蓄積します。
//!
//! 共起は各パス内の±2位置の窓で取られます。窓内の順序付きペア
//! (t, u)ごとに1を加え、符号付きの位置差を距離標本として走行平均に
//! 取り込みます。パスは葉→根の順なので、正の距離は「2番目のトークンが
//! 葉側(依存部)にある」ことを意味します。

use hashbrown::HashMap;

use crate::extract::paths::PathToken;

/// 窓の片側の幅(パス位置)
const WINDOW: usize = 2;

/// 単一トークン頻度の集計キー
///
/// 頻度以外のすべての識別属性を含みます。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenKey {
    /// レンマ
    pub lemma: String,
    /// 品詞コード
    pub pos: u8,
    /// deprelコード
    pub deprel: u16,
    /// テキストタイプ
    pub text_type: u8,
}

/// 共起頻度の集計キー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    /// 最初のレンマ
    pub lemma1: String,
    /// 最初のレンマの品詞コード
    pub pos1: u8,
    /// ペアのdeprelコード(葉側メンバーのdeprel、すなわち辺のラベル)
    pub deprel: u16,
    /// 2番目のレンマ
    pub lemma2: String,
    /// 2番目のレンマの品詞コード
    pub pos2: u8,
    /// テキストタイプ
    pub text_type: u8,
}

/// 共起エントリの蓄積値
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairStat {
    /// 共起頻度
    pub freq: u32,
    /// 依存距離の走行算術平均
    pub mean_dist: f64,
}

impl PairStat {
    /// 新しい距離標本を走行平均に取り込みます。
    fn update(&mut self, dist: f64) {
        self.mean_dist =
            (f64::from(self.freq) * self.mean_dist + dist) / f64::from(self.freq + 1);
        self.freq += 1;
    }
}

/// ハッシュマップに基づく頻度アキュムレータ
#[derive(Debug, Default)]
pub struct FreqAggregator {
    singles: HashMap<TokenKey, u32>,
    pairs: HashMap<PairKey, PairStat>,
}

impl FreqAggregator {
    /// 空のアキュムレータを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 1本の依存パスを集計へ取り込みます。
    pub fn add_path(&mut self, path: &[PathToken]) {
        for (i, token) in path.iter().enumerate() {
            self.add_token(token);
            let lo = i.saturating_sub(WINDOW);
            let hi = (i + WINDOW).min(path.len() - 1);
            for j in lo..=hi {
                if j == i {
                    continue;
                }
                // the lower index is the leaf-ward member whose deprel
                // labels the pair's edge
                let edge_deprel = path[i.min(j)].deprel;
                let dist = i as f64 - j as f64;
                self.add_pair(token, &path[j], edge_deprel, dist);
            }
        }
    }

    fn add_token(&mut self, token: &PathToken) {
        let key = TokenKey {
            lemma: token.lemma.clone(),
            pos: token.pos,
            deprel: token.deprel,
            text_type: token.text_type,
        };
        *self.singles.entry(key).or_insert(0) += 1;
    }

    fn add_pair(&mut self, t: &PathToken, u: &PathToken, edge_deprel: u16, dist: f64) {
        let key = PairKey {
            lemma1: t.lemma.clone(),
            pos1: t.pos,
            deprel: edge_deprel,
            lemma2: u.lemma.clone(),
            pos2: u.pos,
            text_type: t.text_type,
        };
        self.pairs.entry(key).or_default().update(dist);
    }

    /// 集計された単一トークン頻度を返します。
    #[inline(always)]
    pub fn singles(&self) -> &HashMap<TokenKey, u32> {
        &self.singles
    }

    /// 集計された共起頻度を返します。
    #[inline(always)]
    pub fn pairs(&self) -> &HashMap<PairKey, PairStat> {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagset::{base_deprel_code, POS_NOUN, POS_VERB};

    fn token(lemma: &str, pos: u8, deprel: &str) -> PathToken {
        PathToken {
            lemma: lemma.to_string(),
            pos,
            deprel: base_deprel_code(deprel),
            text_type: 0x01,
        }
    }

    #[test]
    fn accumulates_single_frequencies() {
        let mut agg = FreqAggregator::new();
        let path = vec![token("dog", POS_NOUN, "nsubj"), token("bark", POS_VERB, "root")];
        agg.add_path(&path);
        agg.add_path(&path);
        let key = TokenKey {
            lemma: "dog".to_string(),
            pos: POS_NOUN,
            deprel: base_deprel_code("nsubj"),
            text_type: 0x01,
        };
        assert_eq!(agg.singles()[&key], 2);
        assert_eq!(agg.singles().len(), 2);
    }

    #[test]
    fn pairs_are_collected_in_both_orders() {
        let mut agg = FreqAggregator::new();
        let path = vec![token("dog", POS_NOUN, "nsubj"), token("bark", POS_VERB, "root")];
        agg.add_path(&path);
        assert_eq!(agg.pairs().len(), 2);
        let forward = PairKey {
            lemma1: "dog".to_string(),
            pos1: POS_NOUN,
            deprel: base_deprel_code("nsubj"),
            lemma2: "bark".to_string(),
            pos2: POS_VERB,
            text_type: 0x01,
        };
        let stat = agg.pairs()[&forward];
        assert_eq!(stat.freq, 1);
        // "bark" is root-ward of "dog", so the distance is negative
        assert!((stat.mean_dist - (-1.0)).abs() < 1e-9);
        let backward = PairKey {
            lemma1: "bark".to_string(),
            pos1: POS_VERB,
            deprel: base_deprel_code("nsubj"),
            lemma2: "dog".to_string(),
            pos2: POS_NOUN,
            text_type: 0x01,
        };
        let stat = agg.pairs()[&backward];
        assert!((stat.mean_dist - 1.0).abs() < 1e-9);
    }

    #[test]
    fn window_is_limited_to_two_positions() {
        let mut agg = FreqAggregator::new();
        let path = vec![
            token("a", POS_NOUN, "obj"),
            token("b", POS_NOUN, "nmod"),
            token("c", POS_NOUN, "nsubj"),
            token("d", POS_VERB, "root"),
        ];
        agg.add_path(&path);
        let far = agg
            .pairs()
            .keys()
            .find(|k| k.lemma1 == "a" && k.lemma2 == "d");
        assert!(far.is_none());
        let near = agg
            .pairs()
            .keys()
            .find(|k| k.lemma1 == "a" && k.lemma2 == "c");
        assert!(near.is_some());
    }

    #[test]
    fn running_mean_follows_incremental_rule() {
        let mut stat = PairStat::default();
        stat.update(1.0);
        stat.update(2.0);
        stat.update(2.0);
        // (1 + 2 + 2) / 3
        assert!((stat.mean_dist - 5.0 / 3.0).abs() < 1e-9);
        assert_eq!(stat.freq, 3);
    }

    #[test]
    fn empty_path_is_a_noop() {
        let mut agg = FreqAggregator::new();
        agg.add_path(&[]);
        assert!(agg.singles().is_empty());
        assert!(agg.pairs().is_empty());
    }
}
