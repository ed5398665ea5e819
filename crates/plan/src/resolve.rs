// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `resolve_prompt` (§4.7): literal `{step_id.output}` substitution against
//! already-captured step outputs, plus the `{user_input}` placeholder
//! substituted at plan-run entry points. Deliberately simpler than
//! [`crate`]'s sibling `${var}` template language (see `template.rs`'s
//! `interpolate`) — step references are resolved against a fixed small set
//! of known names, not arbitrary environment-style variables, so a plain
//! literal-substring replace is enough and avoids dragging `regex` into
//! this crate for it.

use std::collections::HashMap;

/// Replace every literal `{step_id.output}` in `template` with the stored
/// output of `step_id`. Placeholders naming a step with no recorded output
/// yet (or no step at all) are left exactly as written.
pub fn resolve_prompt(template: &str, outputs: &HashMap<String, String>) -> String {
    let mut resolved = template.to_string();
    for (step_id, output) in outputs {
        let placeholder = format!("{{{step_id}.output}}");
        resolved = resolved.replace(&placeholder, output);
    }
    resolved
}

/// Substitute the `{user_input}` placeholder at plan-run entry points.
pub fn resolve_user_input(template: &str, user_input: &str) -> String {
    template.replace("{user_input}", user_input)
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
