use super::*;

#[test]
fn keeps_the_ten_most_recent_queries() {
    let mut history = SearchHistory::new(10);
    for n in 1..=11 {
        assert!(history.record(&format!("query {n}")));
    }

    assert_eq!(history.len(), 10);
    let expected: Vec<String> = (2..=11).rev().map(|n| format!("query {n}")).collect();
    assert_eq!(history.entries(), expected.as_slice());
}

#[test]
fn re_recording_moves_to_front_without_growing() {
    let mut history = SearchHistory::new(10);
    history.record("phone");
    history.record("shoes");
    history.record("lamp");

    history.record("phone");

    assert_eq!(history.entries(), ["phone", "lamp", "shoes"]);
    assert_eq!(history.len(), 3);
}

#[test]
fn blank_queries_are_not_recorded() {
    let mut history = SearchHistory::new(10);
    assert!(!history.record("   "));
    assert!(history.is_empty());
}

#[test]
fn restores_from_json_and_normalises_entries() {
    let raw = r#"["a", "b", "a", "  ", "c", "d"]"#;
    let history = SearchHistory::from_json(raw, 3).expect("parse");
    assert_eq!(history.entries(), ["a", "b", "c"]);
    assert_eq!(history.to_json().expect("encode"), r#"["a","b","c"]"#);

    assert!(SearchHistory::from_json("{not json", 10).is_err());
}
