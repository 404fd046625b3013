//! 共起検索のクエリ表面
//!
//! 検索の入口は[`Searcher::collocations_of`]の1つです。与えられた
//! 見出し語(および任意の絞り込み・グルーピング指定)に対して:
//!
//! 1. レンマのプレフィックススキャンで見出し語の変種を見つける
//! 2. 変種ごとに共起行のレンジスキャンを行う(方向ごとに1回)
//! 3. スキャン中に`F(x)` / `F(y)` / `F(x,y)`をその場で集約する
//! 4. 指標を計算し、単一指標またはRRFで並べ替えて上位を返す
//!
//! 1つのクエリのすべての読み取りは1つのスナップショットの中で行われ、
//! 一貫したビューが保証されます。

mod grouping;
pub mod score;

use std::str::FromStr;

use crate::codec::Direction;
use crate::errors::Result;
use crate::search::grouping::{PairGrouping, TokenGrouping};
use crate::search::score::{log_dice, log_likelihood, lmi, sort_by_measure, t_score};
use crate::store::Store;
use crate::tagset::{
    pos_code, pos_label, DEPREL_IOBJ, DEPREL_NMOD, DEPREL_NSUBJ, DEPREL_OBJ, POS_NOUN, POS_VERB,
};

pub use crate::search::score::{Collocation, Measure};

/// 定義済み検索
///
/// スキャン行ごとに集約前に適用される真偽述語です。選択すると、
/// deprelと共起語品詞のグルーピングが有効になり、スキャン方向が
/// 固定されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedSearch {
    /// 見出し語(名詞)を修飾する語
    ModifiersOf,
    /// 見出し語が修飾する名詞
    NounsModifiedBy,
    /// 見出し語を主語に取る動詞
    VerbsSubject,
    /// 見出し語を目的語に取る動詞
    VerbsObject,
}

impl FromStr for PredefinedSearch {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "modifiers-of" => Ok(Self::ModifiersOf),
            "nouns-modified-by" => Ok(Self::NounsModifiedBy),
            "verbs-subject" => Ok(Self::VerbsSubject),
            "verbs-object" => Ok(Self::VerbsObject),
            _ => Err(
                "could not parse a predefined search (expected modifiers-of, nouns-modified-by, \
                 verbs-subject or verbs-object)",
            ),
        }
    }
}

impl PredefinedSearch {
    /// スキャン行が述語を満たすかどうかを返します。
    pub fn matches(&self, pos1: u8, deprel: u16, pos2: u8, _text_type: u8, dist: f64) -> bool {
        match self {
            Self::ModifiersOf => dist > 0.0 && deprel == DEPREL_NMOD && pos1 == POS_NOUN,
            Self::NounsModifiedBy => dist < 0.0 && deprel == DEPREL_NMOD && pos2 == POS_NOUN,
            Self::VerbsObject => dist < 0.0 && deprel == DEPREL_NSUBJ && pos2 == POS_VERB,
            Self::VerbsSubject => {
                dist < 0.0 && (deprel == DEPREL_OBJ || deprel == DEPREL_IOBJ) && pos2 == POS_VERB
            }
        }
    }

    /// この検索が固定するスキャン方向を返します。
    fn direction(&self) -> Direction {
        match self {
            Self::ModifiersOf => Direction::Head,
            _ => Direction::Dependent,
        }
    }
}

/// 検索オプション
///
/// 既定では: 完全一致、両方向、グルーピングなし、RRF並べ替え、
/// 上位10件です。
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// 見出し語の品詞による絞り込み(品詞グルーピングも有効になる)
    pub pos: Option<String>,
    /// テキストタイプによる絞り込み(テキストタイプグルーピングも有効になる)
    pub text_type: Option<String>,
    /// 見出し語をプレフィックスとして扱い、共有する変種すべてを候補にする
    pub prefix_search: bool,
    /// スキャン方向(`None`なら両方向)
    pub direction: Option<Direction>,
    /// 平均距離の絶対値の上限
    pub max_mean_abs_dist: Option<f64>,
    /// 共起語の品詞でグルーピングする
    pub group_by_collocate_pos: bool,
    /// deprelでグルーピングする
    pub group_by_deprel: bool,
    /// テキストタイプでグルーピングする
    pub group_by_text_type: bool,
    /// 返す項目数の上限
    pub limit: usize,
    /// 並べ替えの指標
    pub sort_by: Measure,
    /// 定義済み検索のフィルタ
    pub predefined: Option<PredefinedSearch>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            pos: None,
            text_type: None,
            prefix_search: false,
            direction: None,
            max_mean_abs_dist: None,
            group_by_collocate_pos: false,
            group_by_deprel: false,
            group_by_text_type: false,
            limit: 10,
            sort_by: Measure::Rrf,
            predefined: None,
        }
    }
}

impl SearchOptions {
    /// 見出し語の品詞で絞り込みます。
    pub fn with_pos<S: Into<String>>(mut self, pos: S) -> Self {
        let pos = pos.into();
        if !pos.is_empty() {
            self.pos = Some(pos);
        }
        self
    }

    /// テキストタイプで絞り込みます。
    pub fn with_text_type<S: Into<String>>(mut self, text_type: S) -> Self {
        let text_type = text_type.into();
        if !text_type.is_empty() {
            self.text_type = Some(text_type);
        }
        self
    }

    /// プレフィックス検索を有効にします。
    pub fn with_prefix_search(mut self) -> Self {
        self.prefix_search = true;
        self
    }

    /// スキャン方向を固定します。
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// 平均距離の絶対値の上限を設定します。
    pub fn with_max_mean_abs_dist(mut self, dist: f64) -> Self {
        self.max_mean_abs_dist = Some(dist);
        self
    }

    /// 共起語の品詞グルーピングを有効にします。
    pub fn with_group_by_collocate_pos(mut self) -> Self {
        self.group_by_collocate_pos = true;
        self
    }

    /// deprelグルーピングを有効にします。
    pub fn with_group_by_deprel(mut self) -> Self {
        self.group_by_deprel = true;
        self
    }

    /// テキストタイプグルーピングを有効にします。
    pub fn with_group_by_text_type(mut self) -> Self {
        self.group_by_text_type = true;
        self
    }

    /// 返す項目数の上限を設定します。
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// 並べ替えの指標を設定します。
    pub fn with_sort_by(mut self, measure: Measure) -> Self {
        self.sort_by = measure;
        self
    }

    /// 定義済み検索を設定します。
    pub fn with_predefined(mut self, search: PredefinedSearch) -> Self {
        self.predefined = Some(search);
        self
    }
}

/// 開かれたデータセットに対する検索器
pub struct Searcher<'s> {
    store: &'s Store,
}

impl<'s> Searcher<'s> {
    /// ストアから検索器を作成します。
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// 見出し語の共起語を検索します。
    ///
    /// # 引数
    ///
    /// * `lemma` - 見出し語(プレフィックス検索有効時はプレフィックス)
    /// * `options` - 絞り込み・グルーピング・並べ替えの指定
    ///
    /// # 戻り値
    ///
    /// 選択された指標の降順で高々`limit`件の共起。見出し語が見つからない
    /// 場合は空のリストです(エラーではありません)。
    ///
    /// # エラー
    ///
    /// 基盤ストアのエラーはそのまま伝播します。スキャン中の復号不能な
    /// 行は記録の上スキップされ、クエリは失われません。
    pub fn collocations_of(&self, lemma: &str, options: &SearchOptions) -> Result<Vec<Collocation>> {
        let mut opts = options.clone();
        if let Some(predefined) = opts.predefined {
            // a predefined search needs deprel and collocate pos in the
            // grouping key, and pins the scan direction
            opts.group_by_deprel = true;
            opts.group_by_collocate_pos = true;
            opts.direction = Some(predefined.direction());
        }

        let pos_filter = resolve_pos(opts.pos.as_deref());
        let tt_filter = self.resolve_text_type(opts.text_type.as_deref());
        let n = self.store.metadata().corpus_size;
        let directions: &[Direction] = match opts.direction {
            None => &[Direction::Head, Direction::Dependent],
            Some(Direction::Head) => &[Direction::Head],
            Some(Direction::Dependent) => &[Direction::Dependent],
        };

        let snapshot = self.store.snapshot()?;
        let variants = snapshot.lemmas_by_prefix(lemma)?;
        let mut results: Vec<Collocation> = Vec::new();

        for (variant, variant_id) in &variants {
            if !opts.prefix_search && variant.as_str() != lemma {
                continue;
            }

            let mut f1 = TokenGrouping::new();
            let mut f2 = TokenGrouping::new();
            let mut pairs = PairGrouping::new();
            if pos_filter > 0 {
                f1.group_by_pos();
                pairs.group_by_pos1();
            }
            if tt_filter > 0 || opts.group_by_text_type {
                f1.group_by_tt();
                f2.group_by_tt();
                pairs.group_by_tt();
            }
            if opts.group_by_deprel {
                pairs.group_by_deprel();
            }
            if opts.group_by_collocate_pos {
                f2.group_by_pos();
                pairs.group_by_pos2();
            }

            // F(x): frequency of the searched lemma, respecting the pos
            // and text type restrictions
            for row in snapshot.token_freqs(*variant_id, pos_filter, tt_filter, 0)? {
                f1.add(&row);
            }

            for &direction in directions {
                snapshot.for_each_pair(direction, *variant_id, |key, freq, mean_dist| {
                    if tt_filter > 0 && key.text_type != tt_filter {
                        return Ok(());
                    }
                    if pos_filter > 0 && key.pos1 != pos_filter {
                        return Ok(());
                    }
                    if let Some(predefined) = opts.predefined {
                        if !predefined.matches(
                            key.pos1,
                            key.deprel,
                            key.pos2,
                            key.text_type,
                            mean_dist,
                        ) {
                            return Ok(());
                        }
                    }
                    if let Some(max_dist) = opts.max_mean_abs_dist {
                        if mean_dist.abs() > max_dist {
                            return Ok(());
                        }
                    }
                    // F(x,y)
                    pairs.add(&key, freq, mean_dist);
                    // F(y): frequency of the collocate, memoised per query
                    for row in snapshot.token_freqs(key.token2_id, key.pos2, tt_filter, 0)? {
                        f2.add(&row);
                    }
                    Ok(())
                })?;
            }

            for entry in pairs.iter() {
                let collocate = snapshot.lemma_by_id(entry.token2_id)?.unwrap_or_default();
                let fx = f1.get(&entry.lemma1_key());
                let fy = f2.get(&entry.lemma2_key());
                results.push(Collocation {
                    lemma: variant.clone(),
                    lemma_pos: opts.pos.clone().unwrap_or_default(),
                    collocate,
                    collocate_pos: pos_label(entry.pos2).to_string(),
                    deprel: self.store.deprels().label(entry.deprel).to_string(),
                    text_type: self.store.text_types().label(entry.text_type).to_string(),
                    log_dice: log_dice(entry.freq, fx, fy),
                    t_score: t_score(entry.freq, fx, fy, n),
                    lmi: lmi(entry.freq, fx, fy, n),
                    log_likelihood: log_likelihood(entry.freq, fx, fy, n),
                    rrf_score: 0.0,
                    mutual_dist: entry.mean_dist,
                });
            }
        }

        sort_by_measure(&mut results, opts.sort_by);
        results.truncate(opts.limit);
        Ok(results)
    }

    fn resolve_text_type(&self, text_type: Option<&str>) -> u8 {
        match text_type {
            Some(label) if !label.is_empty() => {
                let code = self.store.text_types().code(label);
                if code == 0 {
                    log::warn!("unknown text type {label:?}, ignoring the restriction");
                }
                code
            }
            _ => 0,
        }
    }
}

fn resolve_pos(pos: Option<&str>) -> u8 {
    match pos {
        Some(label) if !label.is_empty() => {
            let code = pos_code(label);
            if code == 0 {
                log::warn!("unknown pos tag {label:?}, ignoring the restriction");
            }
            code
        }
        _ => 0,
    }
}
