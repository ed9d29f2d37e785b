use std::collections::HashSet;
use std::fs;

use corpus_prep::dedup::DedupKey;
use corpus_prep::resplit::{load_inputs, resplit};
use corpus_prep::sink::read_jsonl;
use corpus_prep::{ExampleSink, JsonlDirSink, SplitPlan};

#[test]
fn same_rows_in_two_files_split_once() {
    let dir = tempfile::tempdir().unwrap();
    let rows: String = (0..10)
        .map(|i| format!("{{\"text\":\"dup {i}\",\"label\":\"positive\"}}\n"))
        .collect();
    let a = dir.path().join("a.jsonl");
    let b = dir.path().join("b.jsonl");
    fs::write(&a, &rows).unwrap();
    fs::write(&b, &rows).unwrap();

    let plan = SplitPlan::from_ratios(0.5, 0.0, 0.5, 42);
    let outcome = resplit(load_inputs(&[a, b]).unwrap(), &plan, DedupKey::Text).unwrap();
    assert_eq!(outcome.duplicates, 10);

    let out = dir.path().join("splits");
    let mut sink = JsonlDirSink::new(&out, "split");
    for p in &outcome.partitions {
        sink.write_partition(p, true).unwrap();
    }
    sink.finish().unwrap();

    let train = read_jsonl(&out.join("split_train.jsonl")).unwrap();
    let test = read_jsonl(&out.join("split_test.jsonl")).unwrap();
    let train_texts: HashSet<_> = train.iter().map(|e| e.text.clone()).collect();
    let test_texts: HashSet<_> = test.iter().map(|e| e.text.clone()).collect();
    assert_eq!(train_texts.len(), train.len());
    assert_eq!(test_texts.len(), test.len());
    assert!(train_texts.is_disjoint(&test_texts));
    assert_eq!(train.len() + test.len(), 10);

    // plain re-split keeps the canonical shape
    let raw = fs::read_to_string(out.join("split_train.jsonl")).unwrap();
    assert!(!raw.contains("\"source\""));
}
