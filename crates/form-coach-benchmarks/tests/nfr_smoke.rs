//! Benchmark smoke test for the parse-and-render loop.

use std::time::Instant;

use form_coach_analysis_contract::parse_analysis_response;
use form_coach_ui::render_results;
use serde_json::json;

fn synthetic_response_bytes(frames: usize) -> Vec<u8> {
    let analysis: Vec<_> = (0..frames)
        .map(|index| {
            json!({
                "image_base64": "iVBORw0KGgoAAAANSUhEUg==",
                "timestamp": format!("{:02}:{:02}", index / 60, index % 60),
                "posture": {
                    "errors": ["Knees caving in", "Back rounding"],
                    "suggestions": ["Widen stance", "Brace the core"]
                }
            })
        })
        .collect();
    serde_json::to_vec(&json!({ "analysis": analysis })).expect("synthetic payload should encode")
}

#[test]
fn benchmark_parse_and_render_prints_latency() {
    let raw = synthetic_response_bytes(120);

    let start = Instant::now();
    let mut total_issues = 0usize;

    for _ in 0..100 {
        let response = parse_analysis_response(&raw).expect("synthetic payload should parse");
        let view = render_results(&response);
        total_issues += view.total_issues;
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_parse_render_elapsed_ms={elapsed_ms}");
    println!("benchmark_total_issues={total_issues}");

    // This is a lightweight guardrail; strict NFR checks are environment-specific.
    assert!(
        elapsed_ms < 5_000,
        "parse-and-render smoke benchmark should stay bounded"
    );
}
