// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn substitutes_known_step_output() {
    let mut outputs = HashMap::new();
    outputs.insert("build".to_string(), "artifact.tar.gz".to_string());
    let resolved = resolve_prompt("test {build.output}", &outputs);
    assert_eq!(resolved, "test artifact.tar.gz");
}

#[test]
fn leaves_unknown_placeholder_literal() {
    let outputs = HashMap::new();
    let resolved = resolve_prompt("test {ghost.output}", &outputs);
    assert_eq!(resolved, "test {ghost.output}");
}

#[test]
fn substitutes_user_input() {
    let resolved = resolve_user_input("handle: {user_input}", "hello world");
    assert_eq!(resolved, "handle: hello world");
}
