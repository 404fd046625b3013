//! バーティカル形式のコーパスパーサ
//!
//! バーティカルファイルは1行1トークンのタブ区切りテキストで、間に
//! XML風の構造行(`<doc ...>`、`<s>`、`</s>`など)が挟まります。
//! このパーサは構造の属性を`構造名.属性名`のキーで累積し、`s`構造の
//! 閉じごとに文をハンドラへ渡します。
//!
//! トークン列の意味付け(どの列がレンマか等)はインポートプロファイルの
//! 仕事であり、ここでは行をそのまま保持します。

use std::io::BufRead;

use hashbrown::HashMap;

use crate::errors::{KolodexError, Result};

/// バーティカルファイルの1トークン行
#[derive(Debug, Clone)]
pub struct VerticalToken {
    /// 語形(先頭列)
    pub word: String,
    attrs: Vec<String>,
}

impl VerticalToken {
    /// 列位置で属性を取得します。
    ///
    /// 位置`0`は語形そのもの、`1`以降はタブ区切りの残りの列です。
    /// 範囲外の位置には空文字列が返されます。
    pub fn attr(&self, idx: usize) -> &str {
        if idx == 0 {
            &self.word
        } else {
            self.attrs.get(idx - 1).map(String::as_str).unwrap_or("")
        }
    }
}

/// 構造属性付きの1文
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    /// 文のトークン列
    pub tokens: Vec<VerticalToken>,
    /// 文を開いた時点で有効だった構造属性(`構造名.属性名` → 値)
    pub attrs: HashMap<String, String>,
}

/// バーティカル入力を読み、文ごとにハンドラを呼びます。
///
/// 文の境界は`s`構造です。`s`の外側のトークン行は無視されます。
///
/// # エラー
///
/// 入力のI/Oエラー、または構造行の属性構文が壊れている場合に
/// エラーを返します。
pub fn parse_vertical<R, F>(rdr: R, mut handler: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(Sentence) -> Result<()>,
{
    let mut open_structs: Vec<(String, Vec<String>)> = Vec::new();
    let mut struct_attrs: HashMap<String, String> = HashMap::new();
    let mut current: Option<Sentence> = None;

    for line in rdr.lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(body) = trimmed.strip_prefix('<') {
            if let Some(name) = body.strip_prefix('/') {
                // closing tag
                let name = name.trim_end_matches('>').trim();
                if name == "s" {
                    if let Some(sent) = current.take() {
                        handler(sent)?;
                    }
                } else {
                    close_structure(name, &mut open_structs, &mut struct_attrs);
                }
                continue;
            }
            let (name, attrs) = parse_structure_line(body)?;
            if name == "s" {
                if current.is_some() {
                    log::warn!("nested <s> structure, starting a new sentence");
                }
                current = Some(Sentence {
                    tokens: Vec::new(),
                    attrs: struct_attrs.clone(),
                });
                continue;
            }
            let mut inserted = Vec::with_capacity(attrs.len());
            for (attr, value) in attrs {
                let key = format!("{name}.{attr}");
                struct_attrs.insert(key.clone(), value);
                inserted.push(key);
            }
            open_structs.push((name, inserted));
            continue;
        }
        if let Some(sent) = current.as_mut() {
            let mut cols = trimmed.split('\t').map(|c| c.trim().to_string());
            let word = cols.next().unwrap_or_default();
            sent.tokens.push(VerticalToken {
                word,
                attrs: cols.collect(),
            });
        }
    }
    if let Some(sent) = current.take() {
        log::warn!("input ended inside an open <s> structure");
        handler(sent)?;
    }
    Ok(())
}

fn close_structure(
    name: &str,
    open_structs: &mut Vec<(String, Vec<String>)>,
    struct_attrs: &mut HashMap<String, String>,
) {
    while let Some((open_name, keys)) = open_structs.pop() {
        for key in keys {
            struct_attrs.remove(&key);
        }
        if open_name == name {
            return;
        }
        log::warn!("implicitly closed unterminated structure <{open_name}>");
    }
}

/// `<`を除いた構造行本体から、構造名と属性のリストを取り出します。
fn parse_structure_line(body: &str) -> Result<(String, Vec<(String, String)>)> {
    let body = body
        .trim_end()
        .trim_end_matches('>')
        .trim_end_matches('/');
    let mut chars = body.char_indices().peekable();
    let name_end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    let name = body[..name_end].to_string();
    if name.is_empty() {
        return Err(KolodexError::invalid_format(
            "vertical",
            format!("structure line with an empty name: <{body}>"),
        ));
    }
    // skip past the name
    while let Some(&(idx, _)) = chars.peek() {
        if idx >= name_end {
            break;
        }
        chars.next();
    }

    let mut attrs = Vec::new();
    loop {
        // skip whitespace
        while matches!(chars.peek(), Some((_, c)) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&(key_start, _)) = chars.peek() else {
            break;
        };
        let mut key_end = body.len();
        for (idx, c) in chars.by_ref() {
            if c == '=' {
                key_end = idx;
                break;
            }
        }
        if key_end == body.len() {
            // bare attribute without a value, tolerated
            break;
        }
        let key = body[key_start..key_end].trim().to_string();
        match chars.next() {
            Some((_, '"')) => {}
            _ => {
                return Err(KolodexError::invalid_format(
                    "vertical",
                    format!("attribute {key} in <{name}> has an unquoted value"),
                ));
            }
        }
        let mut value_end = None;
        let value_start = chars.peek().map(|&(idx, _)| idx).unwrap_or(body.len());
        for (idx, c) in chars.by_ref() {
            if c == '"' {
                value_end = Some(idx);
                break;
            }
        }
        let Some(value_end) = value_end else {
            return Err(KolodexError::invalid_format(
                "vertical",
                format!("attribute {key} in <{name}> has an unterminated value"),
            ));
        };
        attrs.push((key, body[value_start..value_end].to_string()));
    }
    Ok((name, attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<doc id=\"d1\">\n\
        <text txtype=\"fiction\">\n\
        <s>\n\
        The\tthe\tDET\n\
        dog\tdog\tNOUN\n\
        barks\tbark\tVERB\n\
        </s>\n\
        <s>\n\
        Cats\tcat\tNOUN\n\
        </s>\n\
        </text>\n\
        </doc>\n";

    fn collect(input: &str) -> Vec<Sentence> {
        let mut out = Vec::new();
        parse_vertical(input.as_bytes(), |sent| {
            out.push(sent);
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn splits_sentences_on_s_structure() {
        let sents = collect(SAMPLE);
        assert_eq!(sents.len(), 2);
        assert_eq!(sents[0].tokens.len(), 3);
        assert_eq!(sents[1].tokens.len(), 1);
        assert_eq!(sents[0].tokens[1].word, "dog");
        assert_eq!(sents[0].tokens[1].attr(1), "dog");
        assert_eq!(sents[0].tokens[2].attr(2), "VERB");
        assert_eq!(sents[0].tokens[2].attr(9), "");
    }

    #[test]
    fn accumulates_structure_attributes() {
        let sents = collect(SAMPLE);
        assert_eq!(sents[0].attrs.get("text.txtype").unwrap(), "fiction");
        assert_eq!(sents[0].attrs.get("doc.id").unwrap(), "d1");
    }

    #[test]
    fn closing_structure_drops_its_attributes() {
        let input = "<text txtype=\"poetry\">\n<s>\na\ta\tX\n</s>\n</text>\n<s>\nb\tb\tX\n</s>\n";
        let sents = collect(input);
        assert_eq!(sents[0].attrs.get("text.txtype").unwrap(), "poetry");
        assert!(sents[1].attrs.get("text.txtype").is_none());
    }

    #[test]
    fn rejects_broken_attribute_syntax() {
        let err = parse_vertical("<text txtype=fiction>\n".as_bytes(), |_| Ok(()));
        assert!(err.is_err());
    }

    #[test]
    fn tokens_outside_sentences_are_ignored() {
        let input = "stray\tstray\tX\n<s>\nin\tin\tADP\n</s>\n";
        let sents = collect(input);
        assert_eq!(sents.len(), 1);
        assert_eq!(sents[0].tokens.len(), 1);
    }
}
