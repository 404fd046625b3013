//! タグセットのコードテーブル
//!
//! このモジュールは、インデックスのキーに埋め込まれる数値コードと
//! 人間可読なラベルの間の対応を管理します。
//!
//! - Universal Dependencies品詞タグ(UPOS)の閉じた1バイトテーブル
//! - UD依存関係ラベル(deprel)の基本16ビットテーブル
//! - インポート時に複合ラベル(例: `obl:to`)で拡張可能な[`DeprelRegistry`]
//! - インポートプロファイルごとのテキストタイプ(ジャンル)テーブル
//!
//! POSとテキストタイプはデータセット作成時に閉じられます。deprelのみが
//! 拡張可能で、拡張後の全対応表はメタデータとして永続化されます。
//! どのテーブルでも`0`は「不明」を意味する番兵値です。

use std::sync::OnceLock;

use hashbrown::HashMap;

/// 不明な品詞を表す番兵値
pub const POS_UNKNOWN: u8 = 0x00;

/// UPOSコード: ADJ
pub const POS_ADJ: u8 = 0x01;
/// UPOSコード: ADP (前置詞・後置詞)
pub const POS_ADP: u8 = 0x02;
/// UPOSコード: ADV
pub const POS_ADV: u8 = 0x03;
/// UPOSコード: AUX
pub const POS_AUX: u8 = 0x04;
/// UPOSコード: CCONJ
pub const POS_CCONJ: u8 = 0x05;
/// UPOSコード: DET
pub const POS_DET: u8 = 0x06;
/// UPOSコード: INTJ
pub const POS_INTJ: u8 = 0x07;
/// UPOSコード: NOUN
pub const POS_NOUN: u8 = 0x08;
/// UPOSコード: NUM
pub const POS_NUM: u8 = 0x09;
/// UPOSコード: PRON
pub const POS_PRON: u8 = 0x0a;
/// UPOSコード: PROPN
pub const POS_PROPN: u8 = 0x0b;
/// UPOSコード: PUNCT
pub const POS_PUNCT: u8 = 0x0c;
/// UPOSコード: SCONJ
pub const POS_SCONJ: u8 = 0x0d;
/// UPOSコード: SYM
pub const POS_SYM: u8 = 0x0e;
/// UPOSコード: VERB
pub const POS_VERB: u8 = 0x0f;
/// UPOSコード: X
pub const POS_X: u8 = 0x10;
/// UPOSコード: PART
pub const POS_PART: u8 = 0x11;

/// 不明な依存関係ラベルを表す番兵値
pub const DEPREL_UNKNOWN: u16 = 0x0000;

/// deprelコード: `iobj`
pub const DEPREL_IOBJ: u16 = 0x001f;
/// deprelコード: `nmod`
pub const DEPREL_NMOD: u16 = 0x0022;
/// deprelコード: `nsubj`
pub const DEPREL_NSUBJ: u16 = 0x0023;
/// deprelコード: `obj`
pub const DEPREL_OBJ: u16 = 0x0027;
/// deprelコード: `obl`
pub const DEPREL_OBL: u16 = 0x0028;

/// 拡張deprelに割り当てられる最初のコード
///
/// `0x0001..0x00ff`はUD基本セットのために予約されており、インポート時に
/// 登録される複合ラベルはここから上のコードを受け取ります。
pub const DEPREL_EXTENSION_BASE: u16 = 0x0100;

/// 品詞ラベルをバイトコードに変換します。
///
/// ラベルは大文字小文字を区別せずに照合されます。`a|b`形式の複合タグも
/// テーブルの一部です。不明なラベルには[`POS_UNKNOWN`]が返されます。
pub fn pos_code(label: &str) -> u8 {
    match label.to_ascii_uppercase().as_str() {
        "ADJ" => POS_ADJ,
        "ADP" => POS_ADP,
        "ADV" => POS_ADV,
        "AUX" => POS_AUX,
        "CCONJ" => POS_CCONJ,
        "DET" => POS_DET,
        "INTJ" => POS_INTJ,
        "NOUN" => POS_NOUN,
        "NUM" => POS_NUM,
        "PRON" => POS_PRON,
        "PROPN" => POS_PROPN,
        "PUNCT" => POS_PUNCT,
        "SCONJ" => POS_SCONJ,
        "SYM" => POS_SYM,
        "VERB" => POS_VERB,
        "X" => POS_X,
        "PART" => POS_PART,
        "SCONJ|AUX" => 0x12,
        "PRON|AUX" => 0x13,
        "ADP|PRON" => 0x14,
        "VERB|AUX" => 0x15,
        "PROPN|AUX" => 0x16,
        "NOUN|NOUN" => 0x17,
        "X|AUX" => 0x18,
        "NOUN|AUX" => 0x19,
        "PROPN|NOUN" => 0x1a,
        "PART|AUX" => 0x1b,
        "PROPN|PROPN" => 0x1c,
        _ => POS_UNKNOWN,
    }
}

/// 品詞コードをラベルに逆変換します。
///
/// 不明なコードには空文字列が返されます。
pub fn pos_label(code: u8) -> &'static str {
    match code {
        POS_ADJ => "ADJ",
        POS_ADP => "ADP",
        POS_ADV => "ADV",
        POS_AUX => "AUX",
        POS_CCONJ => "CCONJ",
        POS_DET => "DET",
        POS_INTJ => "INTJ",
        POS_NOUN => "NOUN",
        POS_NUM => "NUM",
        POS_PRON => "PRON",
        POS_PROPN => "PROPN",
        POS_PUNCT => "PUNCT",
        POS_SCONJ => "SCONJ",
        POS_SYM => "SYM",
        POS_VERB => "VERB",
        POS_X => "X",
        POS_PART => "PART",
        0x12 => "SCONJ|AUX",
        0x13 => "PRON|AUX",
        0x14 => "ADP|PRON",
        0x15 => "VERB|AUX",
        0x16 => "PROPN|AUX",
        0x17 => "NOUN|NOUN",
        0x18 => "X|AUX",
        0x19 => "NOUN|AUX",
        0x1a => "PROPN|NOUN",
        0x1b => "PART|AUX",
        0x1c => "PROPN|PROPN",
        _ => "",
    }
}

/// UD基本セットのdeprelラベルをコードに変換します。
///
/// ラベルは小文字に正規化して照合されます。基本セットにないラベル
/// (拡張ラベルを含む)には[`DEPREL_UNKNOWN`]が返されます。
/// 拡張ラベルの解決には[`DeprelRegistry::code`]を使用してください。
pub fn base_deprel_code(label: &str) -> u16 {
    match label.to_ascii_lowercase().as_str() {
        "acl" => 0x0001,
        "acl:relcl" => 0x0002,
        "advcl" => 0x0003,
        "advmod" => 0x0004,
        "advmod:emph" => 0x0005,
        "amod" => 0x0006,
        "appos" => 0x0007,
        "aux" => 0x0008,
        "aux:pass" => 0x0009,
        "case" => 0x000a,
        "cc" => 0x000b,
        "ccomp" => 0x000c,
        "clf" => 0x000d,
        "compound" => 0x000e,
        "conj" => 0x000f,
        "cop" => 0x0010,
        "csubj" => 0x0011,
        "csubj:pass" => 0x0012,
        "dep" => 0x0013,
        "det" => 0x0014,
        "det:numgov" => 0x0015,
        "det:nummod" => 0x0016,
        "discourse" => 0x0017,
        "dislocated" => 0x0018,
        "expl:pass" => 0x0019,
        "expl:pv" => 0x001a,
        "fixed" => 0x001b,
        "flat" => 0x001c,
        "flat:foreign" => 0x001d,
        "goeswith" => 0x001e,
        "iobj" => DEPREL_IOBJ,
        "list" => 0x0020,
        "mark" => 0x0021,
        "nmod" => DEPREL_NMOD,
        "nsubj" => DEPREL_NSUBJ,
        "nsubj:pass" => 0x0024,
        "nummod" => 0x0025,
        "nummod:gov" => 0x0026,
        "obj" => DEPREL_OBJ,
        "obl" => DEPREL_OBL,
        "obl:arg" => 0x0029,
        "orphan" => 0x002a,
        "parataxis" => 0x002b,
        "punct" => 0x002c,
        "reparandum" => 0x002d,
        "root" => 0x002e,
        "vocative" => 0x002f,
        "xcomp" => 0x0030,
        _ => DEPREL_UNKNOWN,
    }
}

/// UD基本セットのdeprelコードをラベルに逆変換します。
fn base_deprel_label(code: u16) -> &'static str {
    match code {
        0x0001 => "acl",
        0x0002 => "acl:relcl",
        0x0003 => "advcl",
        0x0004 => "advmod",
        0x0005 => "advmod:emph",
        0x0006 => "amod",
        0x0007 => "appos",
        0x0008 => "aux",
        0x0009 => "aux:pass",
        0x000a => "case",
        0x000b => "cc",
        0x000c => "ccomp",
        0x000d => "clf",
        0x000e => "compound",
        0x000f => "conj",
        0x0010 => "cop",
        0x0011 => "csubj",
        0x0012 => "csubj:pass",
        0x0013 => "dep",
        0x0014 => "det",
        0x0015 => "det:numgov",
        0x0016 => "det:nummod",
        0x0017 => "discourse",
        0x0018 => "dislocated",
        0x0019 => "expl:pass",
        0x001a => "expl:pv",
        0x001b => "fixed",
        0x001c => "flat",
        0x001d => "flat:foreign",
        0x001e => "goeswith",
        DEPREL_IOBJ => "iobj",
        0x0020 => "list",
        0x0021 => "mark",
        DEPREL_NMOD => "nmod",
        DEPREL_NSUBJ => "nsubj",
        0x0024 => "nsubj:pass",
        0x0025 => "nummod",
        0x0026 => "nummod:gov",
        DEPREL_OBJ => "obj",
        DEPREL_OBL => "obl",
        0x0029 => "obl:arg",
        0x002a => "orphan",
        0x002b => "parataxis",
        0x002c => "punct",
        0x002d => "reparandum",
        0x002e => "root",
        0x002f => "vocative",
        0x0030 => "xcomp",
        _ => "",
    }
}

/// データセットごとのdeprelレジストリ
///
/// UD基本セットに加えて、インポート中にパス抽出器が生成する複合ラベル
/// (例: `obl:to`)を保持します。登録されたラベルは
/// [`DEPREL_EXTENSION_BASE`]から順にコードを受け取ります。
///
/// レジストリはデータセット単位の値であり、プロセス全体で共有される
/// 可変テーブルではありません。インポートの完了時点で全対応表が
/// メタデータに凍結され、データセットを開く際に再インストールされます。
#[derive(Debug)]
pub struct DeprelRegistry {
    extensions: HashMap<String, u16>,
    next: u16,
    rev: OnceLock<HashMap<u16, String>>,
}

impl Default for DeprelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeprelRegistry {
    /// 空の(基本セットのみの)レジストリを作成します。
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
            next: DEPREL_EXTENSION_BASE,
            rev: OnceLock::new(),
        }
    }

    /// メタデータに保存された対応表からレジストリを再構築します。
    ///
    /// 基本セットのコード(`< 0x0100`)は保存されていても無視されます。
    /// 基本テーブルが真実の情報源であるためです。
    pub fn from_map(stored: &HashMap<String, u16>) -> Self {
        let mut extensions = HashMap::new();
        let mut next = DEPREL_EXTENSION_BASE;
        for (label, &code) in stored {
            if code >= DEPREL_EXTENSION_BASE {
                extensions.insert(label.clone(), code);
                if code >= next {
                    next = code + 1;
                }
            }
        }
        Self {
            extensions,
            next,
            rev: OnceLock::new(),
        }
    }

    /// 新しい複合ラベルを登録し、割り当てられたコードを返します。
    ///
    /// # Panics
    ///
    /// ラベルが既に登録済みの場合(基本セット内のラベルを含む)はパニック
    /// します。呼び出し側は[`code`](Self::code)で事前に確認してください。
    pub fn register(&mut self, label: &str) -> u16 {
        if self.code(label) != DEPREL_UNKNOWN {
            panic!("cannot register deprel value - {label} is already registered");
        }
        debug_assert!(
            self.rev.get().is_none(),
            "deprel registry must not grow once the reverse table is built"
        );
        let code = self.next;
        self.next = self
            .next
            .checked_add(1)
            .expect("deprel extension codes exhausted");
        self.extensions.insert(label.to_string(), code);
        code
    }

    /// ラベルのコードを返します。
    ///
    /// 基本セットと拡張の両方を照合します。未登録のラベルには
    /// [`DEPREL_UNKNOWN`]が返されます。
    pub fn code(&self, label: &str) -> u16 {
        let base = base_deprel_code(label);
        if base != DEPREL_UNKNOWN {
            return base;
        }
        self.extensions
            .get(label)
            .copied()
            .unwrap_or(DEPREL_UNKNOWN)
    }

    /// コードのラベルを返します。
    ///
    /// 拡張分の逆引きテーブルは最初の呼び出し時に構築されます。
    /// 不明なコードには空文字列が返されます。
    pub fn label(&self, code: u16) -> &str {
        let base = base_deprel_label(code);
        if !base.is_empty() {
            return base;
        }
        let rev = self.rev.get_or_init(|| {
            self.extensions
                .iter()
                .map(|(k, &v)| (v, k.clone()))
                .collect()
        });
        rev.get(&code).map(String::as_str).unwrap_or("")
    }

    /// 完全な対応表(基本セット + 拡張)を返します。
    ///
    /// メタデータへの永続化に使用されます。
    pub fn as_map(&self) -> HashMap<String, u16> {
        let mut out: HashMap<String, u16> = BASE_DEPREL_CODES
            .iter()
            .map(|&c| (base_deprel_label(c).to_string(), c))
            .collect();
        for (label, &code) in &self.extensions {
            out.insert(label.clone(), code);
        }
        out
    }

    /// 登録済み拡張ラベルの数を返します。
    pub fn num_extensions(&self) -> usize {
        self.extensions.len()
    }
}

const BASE_DEPREL_CODES: [u16; 48] = [
    0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008, 0x0009, 0x000a, 0x000b,
    0x000c, 0x000d, 0x000e, 0x000f, 0x0010, 0x0011, 0x0012, 0x0013, 0x0014, 0x0015, 0x0016,
    0x0017, 0x0018, 0x0019, 0x001a, 0x001b, 0x001c, 0x001d, 0x001e, 0x001f, 0x0020, 0x0021,
    0x0022, 0x0023, 0x0024, 0x0025, 0x0026, 0x0027, 0x0028, 0x0029, 0x002a, 0x002b, 0x002c,
    0x002d, 0x002e, 0x002f, 0x0030,
];

/// テキストタイプ(ジャンル)のバイトテーブル
///
/// 対応はインポートプロファイルの一部であり、データセットのメタデータに
/// 永続化されます。コード`0`は「不明/任意」を意味します。
#[derive(Debug, Clone, Default)]
pub struct TextTypes {
    data: HashMap<String, u8>,
}

impl TextTypes {
    /// 対応表からテキストタイプテーブルを作成します。
    pub fn from_map(data: HashMap<String, u8>) -> Self {
        Self { data }
    }

    /// ラベルのバイトコードを返します。不明なら`0`。
    pub fn code(&self, label: &str) -> u8 {
        self.data.get(label).copied().unwrap_or(0)
    }

    /// バイトコードのラベルを返します。不明なら空文字列。
    pub fn label(&self, code: u8) -> &str {
        self.data
            .iter()
            .find(|(_, &v)| v == code)
            .map(|(k, _)| k.as_str())
            .unwrap_or("")
    }

    /// テーブルが空かどうかを返します。
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 対応表のコピーを返します。メタデータへの永続化に使われます。
    pub fn as_map(&self) -> HashMap<String, u8> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_codes_round_trip() {
        for label in ["NOUN", "VERB", "ADP", "PROPN|PROPN"] {
            let code = pos_code(label);
            assert_ne!(code, POS_UNKNOWN);
            assert_eq!(pos_label(code), label);
        }
        assert_eq!(pos_code("noun"), POS_NOUN);
        assert_eq!(pos_code("ZZZ"), POS_UNKNOWN);
        assert_eq!(pos_label(0xff), "");
    }

    #[test]
    fn base_deprels_round_trip() {
        for &code in &BASE_DEPREL_CODES {
            let label = base_deprel_label(code);
            assert!(!label.is_empty());
            assert_eq!(base_deprel_code(label), code);
        }
        assert_eq!(base_deprel_code("obl:with"), DEPREL_UNKNOWN);
    }

    #[test]
    fn registry_assigns_extension_codes() {
        let mut reg = DeprelRegistry::new();
        let a = reg.register("obl:to");
        let b = reg.register("obl:from");
        assert_eq!(a, DEPREL_EXTENSION_BASE);
        assert_eq!(b, DEPREL_EXTENSION_BASE + 1);
        assert_eq!(reg.code("obl:to"), a);
        assert_eq!(reg.code("nmod"), DEPREL_NMOD);
        assert_eq!(reg.label(a), "obl:to");
        assert_eq!(reg.label(DEPREL_NMOD), "nmod");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_panics_on_duplicate() {
        let mut reg = DeprelRegistry::new();
        reg.register("obl:to");
        reg.register("obl:to");
    }

    #[test]
    fn registry_round_trips_through_map() {
        let mut reg = DeprelRegistry::new();
        reg.register("obl:to");
        reg.register("obl:between");
        let restored = DeprelRegistry::from_map(&reg.as_map());
        assert_eq!(restored.code("obl:to"), reg.code("obl:to"));
        assert_eq!(restored.code("obl:between"), reg.code("obl:between"));
        // the next free slot continues after the restored extensions
        let mut restored = restored;
        let next = restored.register("obl:under");
        assert_eq!(next, DEPREL_EXTENSION_BASE + 2);
    }

    #[test]
    fn text_types_lookup() {
        let tt = TextTypes::from_map(
            [("fiction".to_string(), 0x03), ("poetry".to_string(), 0x0a)]
                .into_iter()
                .collect(),
        );
        assert_eq!(tt.code("fiction"), 0x03);
        assert_eq!(tt.code("unknown genre"), 0);
        assert_eq!(tt.label(0x0a), "poetry");
        assert_eq!(tt.label(0x7f), "");
    }
}
