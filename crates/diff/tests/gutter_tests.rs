use gutter_diff::{parse_unified_diff, unified_patch, ChangeKind};

#[test]
fn generated_patch_parses_into_gutter_ranges() {
    // Render a patch with the same machinery shelf export uses, then feed
    // it to the gutter parser
    let old = "fn main() {\n    println!(\"hello\");\n}\n";
    let new = "fn main() {\n    println!(\"hello, world\");\n    println!(\"bye\");\n}\n";

    let patch = unified_patch("src/main.rs", old, new);
    let ranges = parse_unified_diff(&patch);

    assert!(!ranges.is_empty());
    assert!(ranges.iter().any(|r| r.kind == ChangeKind::Added));
    assert!(ranges.iter().any(|r| r.kind == ChangeKind::Deleted));

    // Ranges are ordered and non-overlapping
    for pair in ranges.windows(2) {
        assert!(pair[0].end_line <= pair[1].start_line || pair[0].kind != pair[1].kind);
    }
}

#[test]
fn clean_file_produces_no_ranges() {
    let content = "same\nsame\nsame\n";
    let patch = unified_patch("x.txt", content, content);
    assert!(parse_unified_diff(&patch).is_empty());
}

#[test]
fn added_file_is_one_added_range() {
    let patch = unified_patch("new.txt", "", "one\ntwo\nthree\n");
    let ranges = parse_unified_diff(&patch);

    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].kind, ChangeKind::Added);
    assert_eq!(ranges[0].line_count(), 3);
}
