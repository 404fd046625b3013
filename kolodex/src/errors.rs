//! エラー型の定義
//!
//! このモジュールは、kolodexライブラリで使用されるすべてのエラー型を定義します。
//!
//! 検索時に語彙が見つからないケースはエラーではなく、番兵値(ID 0)や空の結果で
//! 表現されることに注意してください。エラーになるのは、ストア自体の障害、
//! レコードの復号失敗、設定の誤りなどです。

use std::error::Error;
use std::fmt::{self, Debug};

/// kolodex専用のResult型
///
/// エラー型としてデフォルトで[`KolodexError`]を使用します。
pub type Result<T, E = KolodexError> = std::result::Result<T, E>;

/// kolodexのエラー型
///
/// このライブラリで発生する可能性のあるすべてのエラーを表現します。
#[derive(Debug, thiserror::Error)]
pub enum KolodexError {
    /// 無効な引数エラー
    ///
    /// [`InvalidArgumentError`]のエラーバリアント。
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// 無効なフォーマットエラー
    ///
    /// [`InvalidFormatError`]のエラーバリアント。
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// 無効な状態エラー
    ///
    /// [`InvalidStateError`]のエラーバリアント。
    #[error(transparent)]
    InvalidState(InvalidStateError),

    /// 格納レコードの復号エラー
    ///
    /// キーまたは値のバイト列が期待されるレイアウトと一致しない場合に発生します。
    /// スキャン中の1行に対しては致命的ですが、スキャン全体はこの行を記録して
    /// スキップします。
    #[error(transparent)]
    Decode(DecodeError),

    /// トークンIDシーケンスの枯渇
    ///
    /// 32ビットのID空間を使い切った場合に発生します。インポートは中断されます。
    #[error("token id sequence overflow")]
    IdOverflow,

    /// 基盤ストアのエラー
    ///
    /// [`heed::Error`]のエラーバリアント。
    #[error(transparent)]
    Store(#[from] heed::Error),

    /// 標準I/Oエラー
    ///
    /// [`std::io::Error`]のエラーバリアント。
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// UTF-8エンコーディングエラー
    ///
    /// [`std::str::Utf8Error`]のエラーバリアント。
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),

    /// 整数パースエラー
    ///
    /// [`ParseIntError`](std::num::ParseIntError)のエラーバリアント。
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),

    /// 浮動小数点数パースエラー
    ///
    /// [`ParseFloatError`](std::num::ParseFloatError)のエラーバリアント。
    #[error(transparent)]
    ParseFloat(#[from] std::num::ParseFloatError),

    /// メタデータのシリアライズ/デシリアライズエラー
    ///
    /// [`serde_json::Error`]のエラーバリアント。
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl KolodexError {
    /// 無効な引数エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - フォーマット名
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効な状態エラーを生成します
    ///
    /// # 引数
    ///
    /// * `msg` - エラーメッセージ
    /// * `cause` - エラーの原因
    pub(crate) fn invalid_state<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::InvalidState(InvalidStateError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }

    /// 復号エラーを生成します
    ///
    /// # 引数
    ///
    /// * `what` - 復号しようとしたレコードの種別
    /// * `msg` - エラーメッセージ
    pub(crate) fn decode<S>(what: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Decode(DecodeError {
            what,
            msg: msg.into(),
        })
    }
}

/// 引数が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// 引数の名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// 入力フォーマットが無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidFormatError {
    /// フォーマットの名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// 状態が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidStateError {
    /// エラーメッセージ
    pub(crate) msg: String,

    /// エラーの根本原因
    pub(crate) cause: String,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}: {}", self.msg, self.cause)
    }
}

impl Error for InvalidStateError {}

/// 格納レコードが復号できない場合に使用されるエラー
#[derive(Debug)]
pub struct DecodeError {
    /// 復号しようとしたレコードの種別
    pub(crate) what: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DecodeError: {}: {}", self.what, self.msg)
    }
}

impl Error for DecodeError {}
