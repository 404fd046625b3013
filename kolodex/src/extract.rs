//! コーパスからの統語データ抽出
//!
//! インデックス書き込みの前段にあたるパイプラインです:
//!
//! 1. [`vertical`] - タブ区切りのバーティカルファイルを文単位に読む
//! 2. [`paths`] - 文を依存木の根向きパスに変換する
//! 3. [`freqs`] - パス上のトークン頻度と共起頻度を集計する
//!
//! コアのインデックスとの契約は、「文の中の(lemma, pos, deprel,
//! テキストタイプ)トークンの流れ」と「文ごとのパストークン列」を
//! 生成することだけです。

pub mod freqs;
pub mod paths;
pub mod vertical;

use std::io::BufRead;

use crate::errors::Result;
use crate::extract::freqs::FreqAggregator;
use crate::extract::vertical::{parse_vertical, Sentence};
use crate::profile::Profile;
use crate::tagset::DeprelRegistry;

/// バーティカルファイルを読み、頻度集計まで行うインポータ
///
/// 複数の入力ファイルに対して繰り返し[`import_reader`]を呼ぶことで、
/// 1つのデータセットに合算されます。集計の完了後、
/// [`deprels`](Self::deprels)にはインポート中に登録された拡張deprelを
/// 含むレジストリが残り、メタデータへの凍結に使われます。
pub struct CorpusImporter<'p> {
    profile: &'p Profile,
    /// このインポートで育てられるdeprelレジストリ
    pub deprels: DeprelRegistry,
    /// 集計された頻度
    pub freqs: FreqAggregator,
    /// これまでに数えた内容語トークンの総数
    pub corpus_size: i64,
}

impl<'p> CorpusImporter<'p> {
    /// プロファイルからインポータを作成します。
    pub fn new(profile: &'p Profile) -> Self {
        Self {
            profile,
            deprels: DeprelRegistry::new(),
            freqs: FreqAggregator::new(),
            corpus_size: 0,
        }
    }

    /// 1つのバーティカル入力を最後まで読み、集計へ流し込みます。
    pub fn import_reader<R: BufRead>(&mut self, rdr: R) -> Result<()> {
        let profile = self.profile;
        parse_vertical(rdr, |sent| {
            import_sentence(
                profile,
                &mut self.deprels,
                &mut self.freqs,
                &mut self.corpus_size,
                &sent,
            );
            Ok(())
        })
    }
}

fn import_sentence(
    profile: &Profile,
    deprels: &mut DeprelRegistry,
    freqs: &mut FreqAggregator,
    corpus_size: &mut i64,
    sent: &Sentence,
) {
    *corpus_size += paths::count_content_tokens(sent, profile);
    for path in paths::sentence_paths(sent, profile, deprels) {
        freqs.add_path(&path);
    }
}
