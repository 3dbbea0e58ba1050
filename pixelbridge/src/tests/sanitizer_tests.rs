use crate::sanitizer::ResponseSanitizer;

#[test]
fn expands_escaped_newlines_in_plain_text() {
    let sanitizer = ResponseSanitizer::new();
    let out = sanitizer.sanitize("first\\nsecond\\nthird");
    assert_eq!(out, "first\nsecond\nthird\n");
}

#[test]
fn verbatim_spans_keep_their_escapes() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "a\\nb\n<content>\\nc\\nd\n</content>\ne\\nf";
    let out = sanitizer.sanitize(raw);

    assert_eq!(
        out,
        "a\nb\n<content>\\nc\\nd\n</content>\ne\nf\n"
    );
}

#[test]
fn marker_lines_themselves_are_never_rewritten() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "<write_to_file>\n<path>src\\nmain.rs</path>\n</write_to_file>";
    let out = sanitizer.sanitize(raw);

    // The opening line, the nested tag line, and the closing line come
    // through untouched, escapes included.
    assert_eq!(out, "<write_to_file>\n<path>src\\nmain.rs</path>\n</write_to_file>\n");
}

#[test]
fn span_opened_and_closed_on_one_line_stays_literal() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "<command>ls\\n-la</command>\nplain\\ntext";
    let out = sanitizer.sanitize(raw);

    assert_eq!(out, "<command>ls\\n-la</command>\nplain\ntext\n");
}

#[test]
fn copy_chrome_is_stripped_before_anything_else() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "```rust\ncontent_copy  Use code with caution.\nlet x = 1;\n```";
    let out = sanitizer.sanitize(raw);

    assert_eq!(out, "```rust\n\nlet x = 1;\n```\n");
}

#[test]
fn chrome_embedded_mid_line_is_removed_in_place() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "prefixcontent_copy  Use code with caution.Xmlsuffix";
    assert_eq!(sanitizer.sanitize(raw), "prefixsuffix\n");
}

#[test]
fn unbalanced_marker_swallows_the_rest_without_erroring() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "before\\nlines\n<thinking>\nnever\\nclosed";
    let out = sanitizer.sanitize(raw);

    // Everything after the dangling open marker is preserved literally.
    assert_eq!(out, "before\nlines\n<thinking>\nnever\\nclosed\n");
}

#[test]
fn sanitize_is_idempotent_on_its_own_output() {
    let sanitizer = ResponseSanitizer::new();
    let raw = "a\\nb\n<content>\\nkeep\n</content>\ntail\\nend";
    let once = sanitizer.sanitize(raw);
    let twice = sanitizer.sanitize(&once);
    assert_eq!(once, twice);
}

#[test]
fn empty_input_produces_empty_output() {
    let sanitizer = ResponseSanitizer::new();
    assert_eq!(sanitizer.sanitize(""), "");
}

#[test]
fn custom_vocabulary_replaces_the_defaults() {
    static MARKERS: &[(&str, &str)] = &[("<pre>", "</pre>")];
    static CHROME: &[&str] = &["[copy]"];
    let sanitizer = ResponseSanitizer::with_vocabulary(MARKERS, CHROME);

    let raw = "[copy]head\\ner\n<pre>\\nraw\n</pre>\n<content>\\nexpanded";
    let out = sanitizer.sanitize(raw);

    // The default <content> marker no longer protects anything.
    assert_eq!(out, "head\ner\n<pre>\\nraw\n</pre>\n<content>\nexpanded\n");
}
