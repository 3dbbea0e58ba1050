use crate::payload::{extract_data_uris, RequestPayload};

fn long_uri(fill: char) -> String {
    format!("data:image/png;base64,{}==", fill.to_string().repeat(60))
}

#[test]
fn prompt_text_interleaves_text_and_image_references() {
    let mut payload = RequestPayload::text("Fix the build");
    payload.push_image(long_uri('A'), Some("build log screenshot".to_string()));
    payload.push_text("then rerun the tests");

    assert_eq!(
        payload.prompt_text(),
        "Fix the build\n[Image: build log screenshot]\nthen rerun the tests"
    );
}

#[test]
fn undescribed_images_get_the_generic_label() {
    let mut payload = RequestPayload::default();
    payload.push_image(long_uri('B'), None);

    assert_eq!(payload.prompt_text(), "[Image: An uploaded image]");
}

#[test]
fn images_iterates_in_segment_order() {
    let mut payload = RequestPayload::default();
    payload.push_text("before");
    payload.push_image(long_uri('C'), None);
    payload.push_text("between");
    payload.push_image(long_uri('D'), None);

    let images: Vec<String> = payload.images().map(str::to_string).collect();
    assert_eq!(images, vec![long_uri('C'), long_uri('D')]);
}

#[test]
fn empty_payload_reports_empty() {
    assert!(RequestPayload::default().is_empty());
    assert!(!RequestPayload::text("x").is_empty());
}

#[test]
fn extracts_embedded_data_uris_from_free_text() {
    let uri = long_uri('E');
    let text = format!("here is a screenshot {uri} inline with prose");
    assert_eq!(extract_data_uris(&text), vec![uri]);
}

#[test]
fn short_base64_runs_are_not_mistaken_for_images() {
    // Under the minimum run length; likely a path or stray token.
    let text = "data:image/png;base64,c2hvcnQ= and some prose";
    assert!(extract_data_uris(text).is_empty());
}

#[test]
fn duplicate_uris_are_reported_once_in_first_seen_order() {
    let a = long_uri('F');
    let b = long_uri('G');
    let text = format!("{a} then {b} then {a} again");
    assert_eq!(extract_data_uris(&text), vec![a, b]);
}

#[test]
fn payload_round_trips_through_json() {
    let mut payload = RequestPayload::text("hello");
    payload.push_image(long_uri('H'), Some("chart".to_string()));

    let json = serde_json::to_string(&payload).unwrap();
    assert!(json.contains("\"type\":\"text\""));
    assert!(json.contains("\"type\":\"image\""));

    let back: RequestPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(back.prompt_text(), payload.prompt_text());
}
