//! 依存木パスの抽出
//!
//! 文を、葉から根へ向かう依存パスの集合に変換します。変換の途中で:
//!
//! - `a|b`形式の多値親参照は独立したノードコピーに展開されます
//! - 根向き走査で再訪を検出したパスは破棄されます(データ不良由来の閉路)
//! - 句読点や機能語のブロックリスト関係はパスから落とされます
//! - `obl`の親を持つADPノードは、親のdeprelを`obl:<前置詞レンマ>`に
//!   書き換え、レジストリを育てます
//!
//! パスの順序(葉→根)が距離符号の一貫性を与えます。

use hashbrown::HashSet;

use crate::extract::vertical::Sentence;
use crate::profile::Profile;
use crate::tagset::{pos_code, DeprelRegistry, DEPREL_UNKNOWN, POS_ADP};

/// パス上の1内容語トークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathToken {
    /// レンマ
    pub lemma: String,
    /// 品詞コード
    pub pos: u8,
    /// deprelコード(不明なら0)
    pub deprel: u16,
    /// 文のテキストタイプ
    pub text_type: u8,
}

struct Node {
    word: String,
    lemma: String,
    pos_label: String,
    deprel_label: String,
    parent: Option<usize>,
    multival: bool,
}

/// 文のブロックリスト対象外トークン数を返します。
///
/// コーパスサイズ(統計のN)は、文ごとに1回数えた内容語トークンの
/// 総数です。パスは枝分かれで同じノードを共有するため、パス長の合計では
/// ありません。
pub fn count_content_tokens(sent: &Sentence, profile: &Profile) -> i64 {
    sent.tokens
        .iter()
        .filter(|t| !is_blocklisted_rel(t.attr(profile.deprel_idx)))
        .count() as i64
}

/// 文を根向き依存パスの集合に変換します。
///
/// `obl`書き換えで生まれた新しいdeprelラベルは、`deprels`に即座に
/// 登録されます。
pub fn sentence_paths(
    sent: &Sentence,
    profile: &Profile,
    deprels: &mut DeprelRegistry,
) -> Vec<Vec<PathToken>> {
    let text_type = resolve_text_type(sent, profile);
    let mut nodes = expand_nodes(sent, profile);
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut is_parent = vec![false; nodes.len()];
    for node in &nodes {
        if let Some(p) = node.parent {
            is_parent[p] = true;
        }
    }

    let mut paths = Vec::new();
    for leaf in 0..nodes.len() {
        if is_parent[leaf] {
            continue;
        }
        let mut path: Vec<PathToken> = Vec::with_capacity(nodes.len());
        let mut visited: HashSet<usize> = HashSet::new();
        let mut steps = 0usize;
        let mut cur = Some(leaf);
        while let Some(idx) = cur {
            if visited.contains(&idx) && !nodes[idx].multival {
                log_cycle(&nodes, idx);
                break;
            }
            // a cycle running only through multi-valued copies would
            // otherwise walk forever
            steps += 1;
            if steps > nodes.len() + 1 {
                log_cycle(&nodes, idx);
                break;
            }
            visited.insert(idx);
            let parent = nodes[idx].parent;

            if is_blocklisted_rel(&nodes[idx].deprel_label) {
                // dropped from the path
            } else if parent.is_some() && pos_code(&nodes[idx].pos_label) == POS_ADP {
                if let Some(p) = parent {
                    if nodes[p].deprel_label == "obl" {
                        let merged = format!("obl:{}", nodes[idx].lemma);
                        if deprels.code(&merged) == DEPREL_UNKNOWN {
                            deprels.register(&merged);
                        }
                        log::debug!(
                            "merged ADP case into parent {}: {}",
                            nodes[p].word,
                            merged
                        );
                        nodes[p].deprel_label = merged;
                    }
                }
            } else {
                path.push(PathToken {
                    lemma: nodes[idx].lemma.clone(),
                    pos: pos_code(&nodes[idx].pos_label),
                    deprel: deprels.code(&nodes[idx].deprel_label),
                    text_type,
                });
            }

            cur = parent;
        }
        paths.push(path);
    }
    paths
}

fn resolve_text_type(sent: &Sentence, profile: &Profile) -> u8 {
    if profile.text_type_attr.is_empty() {
        return 0;
    }
    let Some(value) = sent.attrs.get(&profile.text_type_attr) else {
        return 0;
    };
    let code = profile.text_types.code(value);
    if code == 0 {
        log::warn!(
            "cannot map text type value {:?} of attribute {}",
            value,
            profile.text_type_attr
        );
    }
    code
}

/// 多値親参照をノードコピーに展開します。
///
/// 親参照は相対オフセット(`0` = 根)です。オフセットは元の文の
/// トークン位置に対して解決され、展開後のコピー間では各元位置の
/// 最初のコピーが親として選ばれます。
fn expand_nodes(sent: &Sentence, profile: &Profile) -> Vec<Node> {
    struct Expanded {
        orig: usize,
        offset: Option<i64>,
        multival: bool,
    }

    let mut expanded: Vec<Expanded> = Vec::with_capacity(sent.tokens.len());
    let mut first_copy: Vec<usize> = Vec::with_capacity(sent.tokens.len());
    for (i, token) in sent.tokens.iter().enumerate() {
        first_copy.push(expanded.len());
        let parent_field = token.attr(profile.parent_idx);
        let multival = parent_field.contains('|');
        if parent_field.is_empty() {
            expanded.push(Expanded {
                orig: i,
                offset: None,
                multival,
            });
            continue;
        }
        let before = expanded.len();
        for variant in parent_field.split('|') {
            match variant.trim_start_matches('+').parse::<i64>() {
                Ok(offset) => expanded.push(Expanded {
                    orig: i,
                    offset: Some(offset),
                    multival,
                }),
                Err(err) => {
                    log::error!("failed to parse parent attribute {variant:?}: {err}, skipping");
                }
            }
        }
        if expanded.len() == before {
            // every variant was unparsable; keep the token as a root so
            // that parent references into it stay resolvable
            expanded.push(Expanded {
                orig: i,
                offset: None,
                multival,
            });
        }
    }

    expanded
        .iter()
        .map(|e| {
            let token = &sent.tokens[e.orig];
            let parent = match e.offset {
                None | Some(0) => None,
                Some(offset) => {
                    let target = e.orig as i64 + offset;
                    if target < 0 || target >= sent.tokens.len() as i64 {
                        log::error!(
                            "broken syntax tree path - parent of {:?} out of sentence, taking partial path",
                            token.word
                        );
                        None
                    } else {
                        Some(first_copy[target as usize])
                    }
                }
            };
            Node {
                word: token.word.clone(),
                lemma: token.attr(profile.lemma_idx).to_string(),
                pos_label: token.attr(profile.pos_idx).to_string(),
                deprel_label: token.attr(profile.deprel_idx).to_string(),
                parent,
                multival: e.multival,
            }
        })
        .collect()
}

fn log_cycle(nodes: &[Node], at: usize) {
    log::error!(
        "detected cycle at token {:?} while walking towards the root, skipping path",
        nodes[at].word
    );
}

fn is_blocklisted_rel(rel: &str) -> bool {
    rel == "punct"
        || rel == "cc"
        || rel.starts_with("det")
        || rel.starts_with("aux")
        || rel == "cop"
        || rel == "mark"
        || rel.starts_with("expl")
        || rel == "discourse"
        || rel == "goeswith"
        || rel == "reparandum"
        || rel == "orphan"
        || rel == "list"
        || rel == "vocative"
        || rel == "dep"
}
