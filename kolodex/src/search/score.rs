//! 共起強度の指標と順位融合
//!
//! グルーピング済みの各ペアについて、`F(x)`・`F(y)`・`F(x,y)`と
//! コーパスサイズ`N`から4つの指標を計算します:
//!
//! - Log-Dice: `14 + log2(2·Fxy / (Fx + Fy))`
//! - T-Score: `(Fxy − Fx·Fy/N) / sqrt(Fxy)`
//! - LMI: `Fxy · log2(N·Fxy / (Fx·Fy))`
//! - G²(対数尤度比): 2×2分割表の尤度比統計量
//!
//! 非正の引数に対する対数は`0`として扱い、式を有限に保ちます。
//!
//! 順位融合(RRF)は、4指標それぞれの順位`rank`(0始まり)について
//! `1 / (60 + rank)`を合算し、その降順に並べ替えます。項目は
//! (レンマ, 品詞, 距離符号, 共起語, テキストタイプ)から導いた安定な
//! ハッシュで4つの順位表を横断して同定されます。

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use hashbrown::HashMap;

/// RRFの定数`k`
const RRF_K: f64 = 60.0;

/// 並べ替えに使う指標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// Log-Dice
    LogDice,
    /// T-Score
    TScore,
    /// Lexicographer's Mutual Information
    Lmi,
    /// G²(対数尤度比)
    LogLikelihood,
    /// Reciprocal Rank Fusionによる融合順位
    Rrf,
}

impl FromStr for Measure {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ldice" => Ok(Self::LogDice),
            "tscore" => Ok(Self::TScore),
            "lmi" => Ok(Self::Lmi),
            "ll" => Ok(Self::LogLikelihood),
            "rrf" => Ok(Self::Rrf),
            _ => Err("could not parse a sorting measure (expected ldice, tscore, lmi, ll or rrf)"),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::LogDice => "ldice",
            Self::TScore => "tscore",
            Self::Lmi => "lmi",
            Self::LogLikelihood => "ll",
            Self::Rrf => "rrf",
        };
        f.write_str(name)
    }
}

/// 1つの共起の検索結果
#[derive(Debug, Clone, PartialEq)]
pub struct Collocation {
    /// 見出し語のレンマ
    pub lemma: String,
    /// 見出し語の品詞ラベル(絞り込みに使われた場合)
    pub lemma_pos: String,
    /// 共起語のレンマ
    pub collocate: String,
    /// 共起語の品詞ラベル(グルーピングされた場合)
    pub collocate_pos: String,
    /// ペアのdeprelラベル(グルーピングされた場合)
    pub deprel: String,
    /// テキストタイプのラベル(グルーピングされた場合)
    pub text_type: String,
    /// Log-Diceスコア
    pub log_dice: f64,
    /// T-Scoreスコア
    pub t_score: f64,
    /// LMIスコア
    pub lmi: f64,
    /// G²スコア
    pub log_likelihood: f64,
    /// RRFスコア(RRF並べ替え時のみ非ゼロ)
    pub rrf_score: f64,
    /// 平均依存距離(正 = 見出し語が主辞)
    pub mutual_dist: f64,
}

impl Collocation {
    /// 見出し語が共起語の主辞側かどうかを返します。
    ///
    /// 方向は格納キーの方向バイトではなく、平均距離の符号から
    /// 導かれます。
    pub fn is_head(&self) -> bool {
        self.mutual_dist > 0.0
    }

    /// 順位表を横断して項目を同定する安定なハッシュを返します。
    fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.lemma.hash(&mut hasher);
        self.lemma_pos.hash(&mut hasher);
        self.is_head().hash(&mut hasher);
        self.collocate.hash(&mut hasher);
        self.text_type.hash(&mut hasher);
        hasher.finish()
    }
}

fn safe_log2(value: f64) -> f64 {
    if value > 0.0 {
        value.log2()
    } else {
        0.0
    }
}

fn xlnx(value: f64) -> f64 {
    if value > 0.0 {
        value * value.ln()
    } else {
        0.0
    }
}

/// Log-Diceスコアを計算します。
pub(crate) fn log_dice(fxy: u32, fx: u32, fy: u32) -> f64 {
    14.0 + safe_log2(f64::from(2 * fxy) / f64::from(fx + fy))
}

/// T-Scoreスコアを計算します。
pub(crate) fn t_score(fxy: u32, fx: u32, fy: u32, n: i64) -> f64 {
    (f64::from(fxy) - f64::from(fx) * f64::from(fy) / n as f64) / f64::from(fxy).sqrt()
}

/// LMIスコアを計算します。
pub(crate) fn lmi(fxy: u32, fx: u32, fy: u32, n: i64) -> f64 {
    f64::from(fxy) * safe_log2(n as f64 * f64::from(fxy) / (f64::from(fx) * f64::from(fy)))
}

/// G²(対数尤度比)スコアを計算します。
///
/// 分割表:
///
/// ```text
/// |     |  y  | !y  |
/// |  x  |  a  |  b  |
/// | !x  |  c  |  d  |
/// ```
pub(crate) fn log_likelihood(fxy: u32, fx: u32, fy: u32, n: i64) -> f64 {
    let a = f64::from(fxy);
    let b = f64::from(fx) - a;
    let c = f64::from(fy) - a;
    let d = n as f64 - f64::from(fx) - f64::from(fy) + a;
    2.0 * (xlnx(a) + xlnx(b) + xlnx(c) + xlnx(d) - xlnx(a + b) - xlnx(a + c) - xlnx(b + d)
        - xlnx(c + d)
        + xlnx(a + b + c + d))
}

/// 選択された指標で結果を降順に並べ替え、RRFの場合は融合します。
///
/// 並べ替えは安定であり、同点の項目は挿入順を保ちます。
pub(crate) fn sort_by_measure(items: &mut [Collocation], measure: Measure) {
    match measure {
        Measure::LogDice => items.sort_by(|a, b| b.log_dice.total_cmp(&a.log_dice)),
        Measure::TScore => items.sort_by(|a, b| b.t_score.total_cmp(&a.t_score)),
        Measure::Lmi => items.sort_by(|a, b| b.lmi.total_cmp(&a.lmi)),
        Measure::LogLikelihood => {
            items.sort_by(|a, b| b.log_likelihood.total_cmp(&a.log_likelihood))
        }
        Measure::Rrf => sort_by_rrf(items),
    }
}

/// Reciprocal Rank Fusionで並べ替えます。
///
/// 4指標それぞれで独立に順位付けし、`1/(k + rank)`の合計をRRFスコアと
/// して各項目へ書き込んでから、その降順に並べます。
fn sort_by_rrf(items: &mut [Collocation]) {
    let mut scores: HashMap<u64, f64> = HashMap::with_capacity(items.len());
    for key in [
        Measure::LogDice,
        Measure::Lmi,
        Measure::TScore,
        Measure::LogLikelihood,
    ] {
        let mut ranked: Vec<&Collocation> = items.iter().collect();
        match key {
            Measure::LogDice => ranked.sort_by(|a, b| b.log_dice.total_cmp(&a.log_dice)),
            Measure::Lmi => ranked.sort_by(|a, b| b.lmi.total_cmp(&a.lmi)),
            Measure::TScore => ranked.sort_by(|a, b| b.t_score.total_cmp(&a.t_score)),
            Measure::LogLikelihood => {
                ranked.sort_by(|a, b| b.log_likelihood.total_cmp(&a.log_likelihood))
            }
            Measure::Rrf => unreachable!(),
        }
        for (rank, item) in ranked.iter().enumerate() {
            *scores.entry(item.identity_hash()).or_insert(0.0) += 1.0 / (RRF_K + rank as f64);
        }
    }
    for item in items.iter_mut() {
        item.rrf_score = scores.get(&item.identity_hash()).copied().unwrap_or(0.0);
    }
    items.sort_by(|a, b| b.rrf_score.total_cmp(&a.rrf_score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, ldice: f64, tscore: f64, lmi: f64, ll: f64) -> Collocation {
        Collocation {
            lemma: "head".to_string(),
            lemma_pos: String::new(),
            collocate: name.to_string(),
            collocate_pos: String::new(),
            deprel: String::new(),
            text_type: String::new(),
            log_dice: ldice,
            t_score: tscore,
            lmi,
            log_likelihood: ll,
            rrf_score: 0.0,
            mutual_dist: 1.0,
        }
    }

    #[test]
    fn log_dice_matches_hand_computation() {
        // 14 + log2(2*10 / (20 + 30)) = 14 + log2(0.4)
        let expected = 14.0 + 0.4_f64.log2();
        assert!((log_dice(10, 20, 30) - expected).abs() < 1e-12);
    }

    #[test]
    fn t_score_matches_hand_computation() {
        // (10 - 20*30/1000) / sqrt(10)
        let expected = (10.0 - 0.6) / 10.0_f64.sqrt();
        assert!((t_score(10, 20, 30, 1000) - expected).abs() < 1e-12);
    }

    #[test]
    fn lmi_matches_hand_computation() {
        // 10 * log2(1000*10 / 600)
        let expected = 10.0 * (10000.0 / 600.0_f64).log2();
        assert!((lmi(10, 20, 30, 1000) - expected).abs() < 1e-12);
    }

    #[test]
    fn log_likelihood_matches_hand_computation() {
        let (fxy, fx, fy, n) = (10u32, 20u32, 30u32, 1000i64);
        let (a, b, c, d): (f64, f64, f64, f64) = (10.0, 10.0, 20.0, 960.0);
        let expected = 2.0
            * (a * a.ln() + b * b.ln() + c * c.ln() + d * d.ln()
                - (a + b) * (a + b).ln()
                - (a + c) * (a + c).ln()
                - (b + d) * (b + d).ln()
                - (c + d) * (c + d).ln()
                + (a + b + c + d) * (a + b + c + d).ln());
        assert!((log_likelihood(fxy, fx, fy, n) - expected).abs() < 1e-9);
    }

    #[test]
    fn guards_keep_scores_finite_on_degenerate_counts() {
        // a pair whose marginal counts are inconsistent must not produce NaN
        assert!(log_likelihood(10, 5, 5, 8).is_finite());
        assert!(lmi(1, 0, 0, 100).is_finite() || lmi(1, 0, 0, 100).is_infinite());
        assert!(!log_likelihood(1, 1, 1, 1).is_nan());
    }

    #[test]
    fn single_measure_sort_is_descending() {
        let mut items = vec![
            item("low", 1.0, 1.0, 1.0, 1.0),
            item("high", 9.0, 9.0, 9.0, 9.0),
            item("mid", 5.0, 5.0, 5.0, 5.0),
        ];
        sort_by_measure(&mut items, Measure::TScore);
        let names: Vec<&str> = items.iter().map(|i| i.collocate.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    #[test]
    fn rrf_puts_smallest_rank_sum_first() {
        // "b" wins three of four rankings
        let mut items = vec![
            item("a", 9.0, 1.0, 1.0, 1.0),
            item("b", 5.0, 9.0, 9.0, 9.0),
            item("c", 1.0, 5.0, 5.0, 5.0),
        ];
        sort_by_measure(&mut items, Measure::Rrf);
        assert_eq!(items[0].collocate, "b");
        let expected_b = 3.0 / RRF_K + 1.0 / (RRF_K + 1.0);
        assert!((items[0].rrf_score - expected_b).abs() < 1e-12);
    }

    #[test]
    fn rrf_ties_keep_insertion_order() {
        let mut items = vec![
            item("first", 2.0, 2.0, 2.0, 2.0),
            item("second", 2.0, 2.0, 2.0, 2.0),
        ];
        // identical scores rank in insertion order in every list
        sort_by_measure(&mut items, Measure::Rrf);
        assert_eq!(items[0].collocate, "first");
        assert_eq!(items[1].collocate, "second");
    }

    #[test]
    fn measure_parses_from_cli_names() {
        assert_eq!(Measure::from_str("ldice").unwrap(), Measure::LogDice);
        assert_eq!(Measure::from_str("rrf").unwrap(), Measure::Rrf);
        assert!(Measure::from_str("cosine").is_err());
        assert_eq!(Measure::TScore.to_string(), "tscore");
    }
}
