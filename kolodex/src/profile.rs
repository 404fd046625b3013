//! インポートプロファイル
//!
//! プロファイルは、特定のコーパスのバーティカルファイルからどの列を
//! 読むか(lemma / pos / 親参照 / deprel)、テキストタイプをどの構造属性から
//! 取り、どのバイト値に対応させるかを束ねた名前付き設定です。
//!
//! テキストタイプのテーブルはプロファイルの一部であり、データセットの
//! メタデータに永続化されます。

use crate::tagset::TextTypes;

/// コーパスインポートの列設定とテキストタイプテーブル
#[derive(Debug, Clone)]
pub struct Profile {
    /// プロファイル名(メタデータに記録される)
    pub name: String,
    /// レンマが置かれている列の位置
    pub lemma_idx: usize,
    /// 品詞が置かれている列の位置
    pub pos_idx: usize,
    /// 統語的な親参照(相対オフセット)が置かれている列の位置
    pub parent_idx: usize,
    /// deprelが置かれている列の位置
    pub deprel_idx: usize,
    /// テキストタイプを運ぶ構造属性の名前(例: `text.txtype`)
    pub text_type_attr: String,
    /// テキストタイプの対応表
    pub text_types: TextTypes,
}

impl Profile {
    /// プロファイルを使わないインポート用の、列位置だけの設定を作成します。
    ///
    /// テキストタイプのテーブルは空で、すべての文はタイプ`0`(不明)に
    /// なります。
    pub fn from_columns(lemma_idx: usize, pos_idx: usize, parent_idx: usize, deprel_idx: usize) -> Self {
        Self {
            name: String::new(),
            lemma_idx,
            pos_idx,
            parent_idx,
            deprel_idx,
            text_type_attr: String::new(),
            text_types: TextTypes::default(),
        }
    }
}

/// 名前から定義済みプロファイルを探します。
///
/// 不明な名前には`None`が返されます。呼び出し側(CLI)は作業を始める前に
/// 設定エラーとして扱ってください。
pub fn find_profile(name: &str) -> Option<Profile> {
    match name {
        "intercorp_v16ud" => Some(Profile {
            name: name.to_string(),
            lemma_idx: 4,
            pos_idx: 6,
            parent_idx: 12,
            deprel_idx: 11,
            text_type_attr: "text.txtype".to_string(),
            text_types: TextTypes::from_map(
                [
                    ("discussions - transcripts", 0x01u8),
                    ("drama", 0x02),
                    ("fiction", 0x03),
                    ("children's lit.", 0x04),
                    ("journalism - commentaries", 0x05),
                    ("journalism - news", 0x06),
                    ("legal texts", 0x07),
                    ("nonfiction", 0x08),
                    ("other", 0x09),
                    ("poetry", 0x0a),
                    ("religious", 0x0b),
                    ("subtitles", 0x0c),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            ),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_profile_resolves() {
        let prof = find_profile("intercorp_v16ud").unwrap();
        assert_eq!(prof.lemma_idx, 4);
        assert_eq!(prof.text_types.code("fiction"), 0x03);
    }

    #[test]
    fn unknown_profile_is_none() {
        assert!(find_profile("no_such_profile").is_none());
    }
}
