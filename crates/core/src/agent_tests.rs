// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn agent_id_must_be_lowercase_alnum_dash_underscore() {
    assert!(validate_agent_id("default").is_ok());
    assert!(validate_agent_id("code-reviewer_2").is_ok());
    assert!(validate_agent_id("Has-Caps").is_err());
    assert!(validate_agent_id("has spaces").is_err());
    assert!(validate_agent_id("").is_err());
}

#[test]
fn default_agent_is_recognized() {
    assert!(AgentId::named("default").is_default());
    assert!(!AgentId::named("reviewer").is_default());
}

#[test]
fn delegation_max_hops_must_leave_a_free_worker() {
    let ok = AgentConfig::builder().workers(3).delegation_max_hops(2).build();
    assert!(ok.validate().is_ok());

    let bad = AgentConfig::builder().workers(3).delegation_max_hops(3).build();
    assert!(bad.validate().is_err());
}

#[test]
fn zero_workers_is_invalid() {
    let cfg = AgentConfig::builder().workers(0).build();
    assert!(cfg.validate().is_err());
}

#[test]
fn capability_routing_checks_skills_and_preferred_search() {
    let skills = Some(["rust", "python"].iter().map(|s| s.to_string()).collect());
    let cfg = AgentConfig::builder().skills(skills).build();
    assert!(cfg.has_capability("rust"));
    assert!(!cfg.has_capability("go"));

    let cfg2 = AgentConfig::builder().preferred_search("web").build();
    assert!(cfg2.has_capability("web"));
}

#[test]
fn material_diff_detects_any_field_change() {
    let a = AgentConfig::builder().workers(2).build();
    let b = AgentConfig::builder().workers(3).build();
    assert!(a.materially_differs_from(&b));
    assert!(!a.materially_differs_from(&a.clone()));
}
