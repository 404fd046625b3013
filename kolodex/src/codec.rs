//! インデックスレコードのキー・値コーデック
//!
//! このモジュールは、ストアに格納されるすべてのレコードのバイト表現を
//! 定義します。キーは先頭1バイトのファミリ識別子で区別されます:
//!
//! | 先頭バイト | 内容 |
//! |---|---|
//! | `0x01` | メタデータ(サブキー1バイト) |
//! | `0x02` | レンマ(UTF-8) → トークンID |
//! | `0x03` | トークンID → レンマ(UTF-8) |
//! | `0x04` | 単一トークン頻度: ID + pos + テキストタイプ + deprel下位バイト |
//! | `0x05` | 共起頻度: 方向 + ID1 + pos1 + テキストタイプ + deprel + ID2 + pos2 |
//!
//! 同じ先頭フィールドを持つキーが隣接して整列するため、プレフィックス
//! スキャンだけで必要な範囲を切り出せます。値は固定長で、長さが一致しない
//! 値の復号は拒否されます。

use crate::errors::{KolodexError, Result};

/// メタデータレコードのファミリ識別子
pub const PREFIX_METADATA: u8 = 0x01;
/// レンマ→IDレコードのファミリ識別子
pub const PREFIX_LEMMA_TO_ID: u8 = 0x02;
/// ID→レンマレコードのファミリ識別子
pub const PREFIX_ID_TO_LEMMA: u8 = 0x03;
/// 単一トークン頻度レコードのファミリ識別子
pub const PREFIX_TOKEN_FREQ: u8 = 0x04;
/// 共起頻度レコードのファミリ識別子
pub const PREFIX_PAIR_FREQ: u8 = 0x05;

/// メタデータファミリ内のインポートプロファイル用サブキー
pub const META_SUBKEY_PROFILE: u8 = 0x01;

/// 単一トークン頻度キーの全長(ファミリバイトを含む)
pub const TOKEN_FREQ_KEY_LEN: usize = 8;
/// 共起頻度キーの全長(ファミリバイトを含む)
pub const PAIR_FREQ_KEY_LEN: usize = 15;

/// 共起レコードにおける見出し語の役割
///
/// ファミリ`0x05`のキーの2バイト目であり、キーの最初のトークンが
/// ペアの主辞(head)か依存部(dependent)かを区別します。どちらの役割でも
/// 問い合わせられるよう、各ペアは両方向で格納されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// 最初のトークンがペアの主辞
    Head = 0,
    /// 最初のトークンがペアの依存部
    Dependent = 1,
}

impl Direction {
    /// 格納バイトから方向を復元します。
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Head),
            1 => Ok(Self::Dependent),
            other => Err(KolodexError::decode(
                "pair key",
                format!("invalid direction byte {other:#04x}"),
            )),
        }
    }
}

/// レンマ→IDレコードのキーを生成します。
///
/// キーはファミリバイトに生のUTF-8バイト列を続けたものです。レンマの
/// 辞書順がそのままキー順になるため、プレフィックス検索で前方一致補完が
/// できます。
pub fn lemma_key(lemma: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + lemma.len());
    key.push(PREFIX_LEMMA_TO_ID);
    key.extend_from_slice(lemma.as_bytes());
    key
}

/// ID→レンマ(逆引き)レコードのキーを生成します。
pub fn id_key(token_id: u32) -> [u8; 5] {
    let mut key = [0u8; 5];
    key[0] = PREFIX_ID_TO_LEMMA;
    key[1..5].copy_from_slice(&token_id.to_le_bytes());
    key
}

/// メタデータレコードのキーを生成します。
pub fn metadata_key(subkey: u8) -> [u8; 2] {
    [PREFIX_METADATA, subkey]
}

/// 単一トークン頻度レコードの格納キーを生成します。
///
/// これは常に全長のキーを生成します。ゼロの`pos`を渡しても切り詰めは
/// 行われません。検索用のプレフィックスキーには
/// [`token_freq_search_key`]を使用してください。
///
/// ファミリ`0x04`にはdeprelの下位バイトしか格納されないため、単一トークン
/// 頻度のインデックスには1バイトに収まるdeprel(UD基本セット)のみが
/// 使われます。拡張コードはここでは`0`になります。
pub fn token_freq_key(token_id: u32, pos: u8, text_type: u8, deprel: u16) -> [u8; TOKEN_FREQ_KEY_LEN] {
    let mut key = [0u8; TOKEN_FREQ_KEY_LEN];
    key[0] = PREFIX_TOKEN_FREQ;
    key[1..5].copy_from_slice(&token_id.to_le_bytes());
    key[5] = pos;
    key[6] = text_type;
    key[7] = deprel_low_byte(deprel);
    key
}

/// 単一トークン頻度の検索キーを生成します。
///
/// [`token_freq_key`]の検索版です。フィールドは階層的で、優先順位は
/// pos > テキストタイプ > deprelです。あるフィールドがゼロなら、それ以降の
/// フィールドはすべて落とされ、より具体的な格納キーすべてに前方一致する
/// プレフィックスが得られます。
pub fn token_freq_search_key(token_id: u32, pos: u8, text_type: u8, deprel: u16) -> Vec<u8> {
    let mut key = Vec::with_capacity(TOKEN_FREQ_KEY_LEN);
    key.push(PREFIX_TOKEN_FREQ);
    key.extend_from_slice(&token_id.to_le_bytes());
    if pos > 0 {
        key.push(pos);
        if text_type > 0 {
            key.push(text_type);
            let low = deprel_low_byte(deprel);
            if low > 0 {
                key.push(low);
            }
        }
    }
    key
}

/// 復号された単一トークン頻度キー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFreqKey {
    /// トークンID
    pub token_id: u32,
    /// 品詞コード(キーに含まれない場合は0)
    pub pos: u8,
    /// テキストタイプ(キーに含まれない場合は0)
    pub text_type: u8,
    /// deprel下位バイト(キーに含まれない場合は0)
    pub deprel: u8,
}

/// 単一トークン頻度キーを復号します。
///
/// 検索キーの切り詰めを反映して、5バイト以上の部分キーも受け付けます。
/// 欠けているフィールドはゼロのままです。
pub fn decode_token_freq_key(key: &[u8]) -> Result<TokenFreqKey> {
    if key.len() < 5 || key[0] != PREFIX_TOKEN_FREQ {
        return Err(KolodexError::decode(
            "token freq key",
            format!("expected at least 5 bytes of family 0x04, got {} bytes", key.len()),
        ));
    }
    let mut id = [0u8; 4];
    id.copy_from_slice(&key[1..5]);
    let mut decoded = TokenFreqKey {
        token_id: u32::from_le_bytes(id),
        ..TokenFreqKey::default()
    };
    if key.len() >= 6 {
        decoded.pos = key[5];
    }
    if key.len() >= 7 {
        decoded.text_type = key[6];
    }
    if key.len() >= 8 {
        decoded.deprel = key[7];
    }
    Ok(decoded)
}

/// 共起頻度レコードの格納キーを生成します。
///
/// レイアウトは、(direction, tokenID1)を共有するすべてのペアが連続区間を
/// 成すように選ばれています。(pos1, テキストタイプ, deprel)まで指定すると
/// さらに範囲が狭まります。
pub fn pair_freq_key(
    direction: Direction,
    token1_id: u32,
    pos1: u8,
    text_type: u8,
    deprel: u16,
    token2_id: u32,
    pos2: u8,
) -> [u8; PAIR_FREQ_KEY_LEN] {
    let mut key = [0u8; PAIR_FREQ_KEY_LEN];
    key[0] = PREFIX_PAIR_FREQ;
    key[1] = direction as u8;
    key[2..6].copy_from_slice(&token1_id.to_le_bytes());
    key[6] = pos1;
    key[7] = text_type;
    key[8..10].copy_from_slice(&deprel.to_le_bytes());
    key[10..14].copy_from_slice(&token2_id.to_le_bytes());
    key[14] = pos2;
    key
}

/// あるトークンの、指定方向のすべての共起レコードに前方一致する
/// プレフィックスキーを生成します。
pub fn pair_freq_prefix(direction: Direction, token1_id: u32) -> [u8; 6] {
    let mut key = [0u8; 6];
    key[0] = PREFIX_PAIR_FREQ;
    key[1] = direction as u8;
    key[2..6].copy_from_slice(&token1_id.to_le_bytes());
    key
}

/// 復号された共起頻度キー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairFreqKey {
    /// 見出し語の役割
    pub direction: Direction,
    /// 最初のトークンのID
    pub token1_id: u32,
    /// 最初のトークンの品詞コード
    pub pos1: u8,
    /// テキストタイプ
    pub text_type: u8,
    /// ペアのdeprelコード
    pub deprel: u16,
    /// 2番目のトークンのID
    pub token2_id: u32,
    /// 2番目のトークンの品詞コード
    pub pos2: u8,
}

/// 共起頻度キーを復号します。
pub fn decode_pair_freq_key(key: &[u8]) -> Result<PairFreqKey> {
    if key.len() != PAIR_FREQ_KEY_LEN || key[0] != PREFIX_PAIR_FREQ {
        return Err(KolodexError::decode(
            "pair key",
            format!(
                "expected {} bytes of family 0x05, got {} bytes",
                PAIR_FREQ_KEY_LEN,
                key.len()
            ),
        ));
    }
    let mut id1 = [0u8; 4];
    id1.copy_from_slice(&key[2..6]);
    let mut deprel = [0u8; 2];
    deprel.copy_from_slice(&key[8..10]);
    let mut id2 = [0u8; 4];
    id2.copy_from_slice(&key[10..14]);
    Ok(PairFreqKey {
        direction: Direction::from_byte(key[1])?,
        token1_id: u32::from_le_bytes(id1),
        pos1: key[6],
        text_type: key[7],
        deprel: u16::from_le_bytes(deprel),
        token2_id: u32::from_le_bytes(id2),
        pos2: key[14],
    })
}

/// トークンIDを値表現(リトルエンディアン4バイト)に符号化します。
pub fn encode_token_id(token_id: u32) -> [u8; 4] {
    token_id.to_le_bytes()
}

/// 値表現からトークンIDを復号します。
pub fn decode_token_id(value: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = value.try_into().map_err(|_| {
        KolodexError::decode(
            "token id value",
            format!("expected 4 bytes, got {}", value.len()),
        )
    })?;
    Ok(u32::from_le_bytes(bytes))
}

/// 単一トークン頻度の値(4バイト)を符号化します。
pub fn encode_token_value(freq: u32) -> [u8; 4] {
    freq.to_le_bytes()
}

/// 単一トークン頻度の値を復号します。
pub fn decode_token_value(value: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = value.try_into().map_err(|_| {
        KolodexError::decode(
            "token freq value",
            format!("expected 4 bytes, got {}", value.len()),
        )
    })?;
    Ok(u32::from_le_bytes(bytes))
}

/// 共起頻度の値(頻度4バイト + 平均距離1バイト)を符号化します。
pub fn encode_pair_value(freq: u32, mean_dist: f64) -> [u8; 5] {
    let mut value = [0u8; 5];
    value[0..4].copy_from_slice(&freq.to_le_bytes());
    value[4] = encode_distance(mean_dist);
    value
}

/// 共起頻度の値を復号し、(頻度, 平均距離)を返します。
pub fn decode_pair_value(value: &[u8]) -> Result<(u32, f64)> {
    if value.len() != 5 {
        return Err(KolodexError::decode(
            "pair value",
            format!("expected 5 bytes, got {}", value.len()),
        ));
    }
    let mut freq = [0u8; 4];
    freq.copy_from_slice(&value[0..4]);
    Ok((u32::from_le_bytes(freq), decode_distance(value[4])))
}

/// 依存距離を1バイトに符号化します。
///
/// 距離は10倍にスケールして0.1刻みの精度で保存されます。値域は
/// [-12.7, +12.7]で、範囲外の値は端に丸められます。符号は統語的な
/// 方向を運びます(正 = 最初のトークンが共起語を支配する)。
///
/// - 負のスケール値`s`は`(-s - 1)`として0..=126に
/// - 非負のスケール値`s`は`s + 128`として128..=255に
pub fn encode_distance(distance: f64) -> u8 {
    let scaled = (distance * 10.0).round();
    if scaled < 0.0 {
        let clamped = if scaled < -127.0 { -127.0 } else { scaled };
        (-clamped - 1.0) as u8
    } else {
        let clamped = if scaled > 127.0 { 127.0 } else { scaled };
        (clamped + 128.0) as u8
    }
}

/// 1バイトの距離表現を復号します。
///
/// [`encode_distance`]の正確な逆関数です。
pub fn decode_distance(encoded: u8) -> f64 {
    if encoded < 128 {
        -f64::from(i32::from(encoded) + 1) / 10.0
    } else {
        f64::from(i32::from(encoded) - 128) / 10.0
    }
}

/// 1バイトに収まるdeprelコードの下位バイトを返します。
///
/// 拡張コード(`>= 0x0100`)は`0`に落ちます。
#[inline(always)]
fn deprel_low_byte(deprel: u16) -> u8 {
    if deprel > 0x00ff {
        0
    } else {
        deprel as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lemma_keys_sort_by_lemma() {
        let a = lemma_key("dog");
        let b = lemma_key("dogma");
        let c = lemma_key("dot");
        assert!(a < b && b < c);
        assert!(b.starts_with(&a));
    }

    #[test]
    fn token_freq_key_round_trip() {
        let key = token_freq_key(42, 0x08, 0x03, 0x0022);
        assert_eq!(key.len(), TOKEN_FREQ_KEY_LEN);
        let decoded = decode_token_freq_key(&key).unwrap();
        assert_eq!(decoded.token_id, 42);
        assert_eq!(decoded.pos, 0x08);
        assert_eq!(decoded.text_type, 0x03);
        assert_eq!(decoded.deprel, 0x22);
    }

    #[test]
    fn token_freq_key_truncates_extended_deprel() {
        let key = token_freq_key(7, 0x08, 0x01, 0x0104);
        assert_eq!(key[7], 0);
    }

    #[test]
    fn search_key_is_hierarchical() {
        // pos == 0 drops every later field
        assert_eq!(
            token_freq_search_key(9, 0, 0x02, 0x0022),
            token_freq_search_key(9, 0, 0, 0),
        );
        // pos > 0 and tt == 0 drops deprel
        assert_eq!(
            token_freq_search_key(9, 0x08, 0, 0x0022),
            token_freq_search_key(9, 0x08, 0, 0),
        );
        // the full key is an extension of every truncated variant
        let full = token_freq_key(9, 0x08, 0x02, 0x0022);
        for (pos, tt, deprel) in [(0, 0, 0), (0x08, 0, 0), (0x08, 0x02, 0), (0x08, 0x02, 0x0022)] {
            let prefix = token_freq_search_key(9, pos, tt, deprel);
            assert!(full.starts_with(&prefix), "prefix {prefix:?}");
        }
    }

    #[test]
    fn pair_key_round_trip() {
        let key = pair_freq_key(Direction::Dependent, 3, 0x0f, 0x01, 0x0104, 77, 0x08);
        assert_eq!(key.len(), PAIR_FREQ_KEY_LEN);
        let decoded = decode_pair_freq_key(&key).unwrap();
        assert_eq!(decoded.direction, Direction::Dependent);
        assert_eq!(decoded.token1_id, 3);
        assert_eq!(decoded.pos1, 0x0f);
        assert_eq!(decoded.text_type, 0x01);
        assert_eq!(decoded.deprel, 0x0104);
        assert_eq!(decoded.token2_id, 77);
        assert_eq!(decoded.pos2, 0x08);
    }

    #[test]
    fn pair_prefix_covers_full_keys() {
        let prefix = pair_freq_prefix(Direction::Head, 12345);
        let key = pair_freq_key(Direction::Head, 12345, 1, 2, 3, 4, 5);
        assert!(key.starts_with(&prefix));
        let other = pair_freq_key(Direction::Dependent, 12345, 1, 2, 3, 4, 5);
        assert!(!other.starts_with(&prefix));
    }

    #[test]
    fn values_reject_wrong_sizes() {
        assert!(decode_token_value(&[1, 2, 3]).is_err());
        assert!(decode_token_id(&[1, 2, 3, 4, 5]).is_err());
        assert!(decode_pair_value(&[0; 4]).is_err());
        assert!(decode_pair_freq_key(&[PREFIX_PAIR_FREQ; 14]).is_err());
    }

    #[test]
    fn pair_value_round_trip() {
        let value = encode_pair_value(1000, -2.4);
        let (freq, dist) = decode_pair_value(&value).unwrap();
        assert_eq!(freq, 1000);
        assert!((dist - (-2.4)).abs() < 1e-9);
    }

    #[test]
    fn distance_round_trips_on_tenths() {
        let mut d = -12.7;
        while d <= 12.7 {
            let rounded = (d * 10.0_f64).round() / 10.0;
            let decoded = decode_distance(encode_distance(rounded));
            assert!(
                (decoded - rounded).abs() < 1e-9,
                "distance {rounded} decoded as {decoded}"
            );
            d += 0.1;
        }
    }

    #[test]
    fn distance_clamps_out_of_range() {
        assert!((decode_distance(encode_distance(40.0)) - 12.7).abs() < 1e-9);
        assert!((decode_distance(encode_distance(-40.0)) + 12.7).abs() < 1e-9);
    }

    #[test]
    fn distance_keeps_sign_convention() {
        // positive distances land in the upper half of the byte range
        assert!(encode_distance(1.0) >= 128);
        assert!(encode_distance(0.0) == 128);
        assert!(encode_distance(-0.1) < 128);
    }
}
