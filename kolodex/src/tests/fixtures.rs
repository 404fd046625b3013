//! テスト用のトイコーパスとヘルパー
//!
//! `DOG_CORPUS`の頻度は手計算で追跡できる規模に抑えられています。
//! 内容語トークン数は20です。見出し語`dog`について:
//!
//! - F(dog) = 5(nsubjで4回、nmodで1回、すべてfiction)
//! - 共起: bark(2回)、chase(2回)、big・tail・wag(各1回、wagは距離-2)
//!
//! `TEAM_CORPUS`は定義済み検索の述語を検証するための最小構成です。

use crate::extract::CorpusImporter;
use crate::profile::Profile;
use crate::store::meta::Metadata;
use crate::store::{Store, StoreOptions, TokenIdSeq};
use crate::tagset::TextTypes;

/// テスト用ストアのLMDBマップサイズ
pub(crate) const TEST_MAP_SIZE: usize = 64 * 1024 * 1024;

/// 列: word, lemma, pos, parent, deprel
pub(crate) fn test_profile() -> Profile {
    let mut prof = Profile::from_columns(1, 2, 3, 4);
    prof.name = "test_corpus".to_string();
    prof.text_type_attr = "text.txtype".to_string();
    prof.text_types = TextTypes::from_map(
        [("fiction".to_string(), 0x01u8), ("news".to_string(), 0x02u8)]
            .into_iter()
            .collect(),
    );
    prof
}

pub(crate) const DOG_CORPUS: &str = "\
<text txtype=\"fiction\">
<s>
the\tthe\tDET\t1\tdet
dog\tdog\tNOUN\t1\tnsubj
barks\tbark\tVERB\t0\troot
</s>
<s>
a\ta\tDET\t1\tdet
dog\tdog\tNOUN\t1\tnsubj
barks\tbark\tVERB\t0\troot
</s>
<s>
the\tthe\tDET\t2\tdet
big\tbig\tADJ\t1\tamod
dog\tdog\tNOUN\t1\tnsubj
chases\tchase\tVERB\t0\troot
cat\tcat\tNOUN\t-1\tobj
</s>
<s>
tail\ttail\tNOUN\t3\tnsubj
of\tof\tADP\t1\tcase
dog\tdog\tNOUN\t-2\tnmod
wags\twag\tVERB\t0\troot
</s>
</text>
<text txtype=\"news\">
<s>
dogma\tdogma\tNOUN\t1\tnsubj
prevails\tprevail\tVERB\t0\troot
</s>
<s>
dogged\tdogged\tADJ\t1\tamod
effort\teffort\tNOUN\t1\tnsubj
wins\twin\tVERB\t0\troot
</s>
<s>
sleeps\tsleep\tVERB\t0\troot
in\tin\tADP\t1\tcase
town\ttown\tNOUN\t-2\tobl
</s>
</text>
";

pub(crate) const TEAM_CORPUS: &str = "\
<text txtype=\"news\">
<s>
team\tteam\tNOUN\t0\troot
of\tof\tADP\t1\tcase
winners\twinner\tNOUN\t-2\tnmod
</s>
<s>
team\tteam\tNOUN\t1\tnsubj
wins\twin\tVERB\t0\troot
</s>
</text>
";

/// コーパス文字列をインポートし、問い合わせ可能なストアを返します。
pub(crate) fn import_corpus(dir: &std::path::Path, corpus: &str, min_pair_freq: u32) -> Store {
    let profile = test_profile();
    let mut importer = CorpusImporter::new(&profile);
    importer
        .import_reader(corpus.as_bytes())
        .expect("corpus import should succeed");

    let options = StoreOptions::default().with_map_size(TEST_MAP_SIZE);
    let mut store = Store::create(dir, options, profile.text_types.clone())
        .expect("store creation should succeed");
    let mut seq = TokenIdSeq::new();
    let stats = store
        .store_frequencies(&mut seq, &importer.freqs, min_pair_freq)
        .expect("storing frequencies should succeed");
    store
        .write_metadata(Metadata {
            profile_name: profile.name.clone(),
            corpus_size: importer.corpus_size,
            counts: stats,
            deprel_map: importer.deprels.as_map(),
            text_type_map: profile.text_types.as_map(),
        })
        .expect("metadata write should succeed");
    drop(store);

    Store::open(dir, options).expect("reopening the dataset should succeed")
}
