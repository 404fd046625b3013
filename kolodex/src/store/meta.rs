//! データセットメタデータ
//!
//! メタデータはファミリ`0x01`の単一レコードとしてJSONで永続化されます。
//! プロファイル名、コーパスサイズ、各種レコード数に加えて、この
//! データセットで凍結されたdeprel対応表とテキストタイプ対応表を含みます。

use hashbrown::HashMap;
use heed::types::Bytes;
use heed::{Database, Env};
use serde::{Deserialize, Serialize};

use crate::codec::{metadata_key, META_SUBKEY_PROFILE};
use crate::errors::Result;
use crate::store::writer::ImportStats;
use crate::store::Store;

/// データセットごとに1つ存在するメタデータレコード
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    /// インポートに使われたプロファイルの名前
    pub profile_name: String,
    /// コーパスの内容語トークン総数(統計のN)
    pub corpus_size: i64,
    /// インポートで書き込まれたレコード数
    #[serde(flatten)]
    pub counts: ImportStats,
    /// 凍結されたdeprel対応表(基本セット + インポート時の拡張)
    pub deprel_map: HashMap<String, u16>,
    /// テキストタイプの対応表
    pub text_type_map: HashMap<String, u8>,
}

impl Store {
    /// メタデータレコードを書き込み、ハンドルに反映します。
    ///
    /// インポートの最終ステップです。これ以降、データセットは
    /// [`Store::open`]で問い合わせ可能になります。
    pub fn write_metadata(&mut self, metadata: Metadata) -> Result<()> {
        let raw = serde_json::to_vec(&metadata)?;
        let key = metadata_key(META_SUBKEY_PROFILE);
        let mut wtxn = self.env().write_txn()?;
        self.db().put(&mut wtxn, &key, &raw)?;
        wtxn.commit()?;

        self.deprels = crate::tagset::DeprelRegistry::from_map(&metadata.deprel_map);
        self.text_types = crate::tagset::TextTypes::from_map(metadata.text_type_map.clone());
        self.metadata = metadata;
        Ok(())
    }
}

pub(crate) fn read_metadata(env: &Env, db: Database<Bytes, Bytes>) -> Result<Option<Metadata>> {
    let key = metadata_key(META_SUBKEY_PROFILE);
    let rtxn = env.read_txn()?;
    match db.get(&rtxn, &key)? {
        Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_round_trip() {
        let mut deprel_map = HashMap::new();
        deprel_map.insert("nmod".to_string(), 0x0022u16);
        deprel_map.insert("obl:to".to_string(), 0x0100u16);
        let meta = Metadata {
            profile_name: "intercorp_v16ud".to_string(),
            corpus_size: 123456,
            counts: ImportStats {
                num_lemmas: 10,
                num_token_freqs: 25,
                num_pair_freqs: 40,
            },
            deprel_map,
            text_type_map: [("fiction".to_string(), 0x03u8)].into_iter().collect(),
        };
        let raw = serde_json::to_vec(&meta).unwrap();
        let back: Metadata = serde_json::from_slice(&raw).unwrap();
        assert_eq!(back.profile_name, meta.profile_name);
        assert_eq!(back.corpus_size, meta.corpus_size);
        assert_eq!(back.counts.num_pair_freqs, 40);
        assert_eq!(back.deprel_map.get("obl:to"), Some(&0x0100));
        assert_eq!(back.text_type_map.get("fiction"), Some(&0x03));
    }
}
