//! wasm library for schedcheck
//! compiled binary is uploaded as github action artifact

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use schedcheck_core::analyze;
use schedcheck_core::conflict::describe_cycle;
use schedcheck_core::simulation::LockManager;
use schedcheck_parser::{parse_schedule, tokenize, TokenKind};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Analyze schedule text.
///
/// Returns a JSON string:
/// ```json
/// {
///   "ok": true,
///   "analysis": { "operations": [...], "transactions": [...], "conflicts": [...],
///                 "precedence_graph": {...}, "serial_order": [...],
///                 "two_pl_report": {...}, "recoverability": {...} },
///   "cycle": "T1 -> T2 [RW(X)]; T2 -> T1 [RW(Y)]",
///   "warnings": [{ "token": "Q1", "line": 1, "column": 7, ... }]
/// }
/// ```
#[must_use]
#[wasm_bindgen]
pub fn analyze_schedule(schedule: &str) -> String {
    let parsed = parse_schedule(schedule);
    let analysis = analyze(parsed.operations);
    let cycle = describe_cycle(&analysis.precedence_graph);

    serde_json::json!({
        "ok": true,
        "analysis": analysis,
        "cycle": cycle,
        "warnings": parsed.warnings,
    })
    .to_string()
}

/// Run the lock manager over schedule text for at most `max_steps` steps.
///
/// Returns a JSON string with every snapshot, the initial one first:
/// ```json
/// { "ok": true, "steps": [{ "current_step_index": null, "locks": [], ... }, ...],
///   "complete": true, "deadlock": false }
/// ```
#[must_use]
#[wasm_bindgen]
pub fn simulate_schedule(schedule: &str, max_steps: u32) -> String {
    let parsed = parse_schedule(schedule);
    let mut manager = LockManager::new(parsed.operations);
    let steps = manager.run(max_steps as usize).to_vec();

    serde_json::json!({
        "ok": true,
        "steps": steps,
        "complete": manager.is_complete(),
        "deadlock": manager.is_deadlocked(),
        "warnings": parsed.warnings,
    })
    .to_string()
}

#[derive(Serialize)]
struct HighlightToken<'a> {
    kind: &'static str,
    start: usize,
    end: usize,
    text: &'a str,
}

/// Split schedule text into tokens for syntax highlighting.
///
/// Returns a JSON array of `{"kind", "start", "end", "text"}` where `kind`
/// is `separator`, `operation` or `invalid` and `start..end` are byte
/// offsets.
#[must_use]
#[wasm_bindgen]
pub fn tokenize_schedule(schedule: &str) -> String {
    let parsed = parse_schedule(schedule);
    let tokens: Vec<HighlightToken<'_>> = tokenize(schedule)
        .into_iter()
        .map(|token| {
            let kind = match token.kind {
                TokenKind::Separator => "separator",
                TokenKind::Operation
                    if parsed
                        .warnings
                        .iter()
                        .any(|warning| warning.span == token.span) =>
                {
                    "invalid"
                }
                TokenKind::Operation => "operation",
            };
            HighlightToken {
                kind,
                start: token.span.start,
                end: token.span.end,
                text: token.text(schedule),
            }
        })
        .collect();

    serde_json::to_string(&tokens).unwrap_or_else(|e| {
        serde_json::json!({"ok": false, "error": e.to_string()}).to_string()
    })
}
