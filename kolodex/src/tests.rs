//! kolodexのテストモジュール群
//!
//! インポートから検索までのパイプライン全体と、ストアの永続化の
//! 振る舞いを検証するテストを含みます。

mod fixtures;
