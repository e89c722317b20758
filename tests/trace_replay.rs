//! Replays recorded traces through the public API.

use std::path::Path;
use std::time::Duration;

use accio_tracker::{
    replay, ScanSession, SearchTarget, SmoothingParams, TraceConfig, TraceSource,
    DEFAULT_TICK_INTERVAL,
};

fn kitchen_trace() -> TraceSource {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/kitchen.jsonl");
    TraceSource::open(&path, TraceConfig::default()).expect("open trace")
}

#[test]
fn kitchen_trace_produces_expected_timeline() {
    let session = ScanSession::new(SmoothingParams::default());
    session
        .start_session(SearchTarget::new("Phone", "iphone", ["cell phone", "phone"]))
        .unwrap();

    let mut timeline = Vec::new();
    let stats = replay(&mut kitchen_trace(), &session, DEFAULT_TICK_INTERVAL, |at, e| {
        let labels: Vec<String> = e.detections.iter().map(|d| d.label.clone()).collect();
        timeline.push((at.as_millis() as u64, labels, e.has_match, e.found));
        Ok(())
    })
    .unwrap();

    let expected: Vec<(u64, Vec<&str>, bool, bool)> = vec![
        (0, vec![], false, false),
        (120, vec!["cell_phone", "cup"], true, true),
        (240, vec!["cell_phone", "cup"], true, false),
        // low-confidence cup is dropped by the source floor; the quiet batch still emits
        (360, vec!["cell_phone", "cup"], true, false),
        (480, vec!["Cell_Phone", "cup"], true, false),
        // cup last seen at 120ms
        (600, vec!["Cell_Phone"], true, false),
        // phone last seen at 480ms
        (900, vec![], false, false),
        (1400, vec!["cell_phone"], true, true),
        (1950, vec![], false, false),
    ];
    let actual: Vec<(u64, Vec<&str>, bool, bool)> = timeline
        .iter()
        .map(|(at, labels, has_match, found)| {
            (*at, labels.iter().map(String::as_str).collect(), *has_match, *found)
        })
        .collect();
    assert_eq!(actual, expected);

    assert_eq!(stats.batches, 6);
    assert_eq!(stats.ticks, 13);
    assert_eq!(stats.emissions, 9);
    assert_eq!(stats.found, 2);
}

#[test]
fn kitchen_trace_confidence_is_smoothed_across_spellings() {
    let session = ScanSession::new(SmoothingParams::default());
    session
        .start_session(SearchTarget::new("Phone", "", ["phone"]))
        .unwrap();

    let mut at_480 = None;
    replay(&mut kitchen_trace(), &session, DEFAULT_TICK_INTERVAL, |at, e| {
        if at == Duration::from_millis(480) {
            at_480 = Some(e.matches[0].confidence);
        }
        Ok(())
    })
    .unwrap();

    // 0.62 -> 0.70*0.7 + 0.62*0.3 = 0.676 -> 0.66*0.7 + 0.676*0.3 = 0.6648
    let confidence = at_480.expect("emission at 480ms");
    assert!((confidence - 0.6648).abs() < 1e-4);
}

#[test]
fn target_without_sightings_never_matches() {
    let session = ScanSession::new(SmoothingParams::default());
    session
        .start_session(SearchTarget::new("Scissors", "", ["scissors"]))
        .unwrap();

    let stats = replay(&mut kitchen_trace(), &session, DEFAULT_TICK_INTERVAL, |_, e| {
        assert!(!e.has_match);
        assert!(e.matches.is_empty());
        Ok(())
    })
    .unwrap();
    assert_eq!(stats.found, 0);
}
