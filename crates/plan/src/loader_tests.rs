// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn agents(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn loads_a_plan_with_dependent_steps() {
    let hcl = r#"
        plan "deploy" {
          step "build" {
            agent_id = "builder"
            prompt   = "Build the project"
          }
          step "test" {
            agent_id   = "tester"
            prompt     = "Test {build.output}"
            depends_on = ["build"]
          }
        }
    "#;

    let (plans, errors) = load_plans(hcl, &agents(&["builder", "tester"]), &HashSet::new());
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].name, "deploy");
    assert_eq!(plans[0].step_count(), 2);
}

#[test]
fn rejects_step_referencing_unknown_agent() {
    let hcl = r#"
        plan "deploy" {
          step "build" {
            agent_id = "ghost"
            prompt   = "Build"
          }
        }
    "#;

    let (plans, errors) = load_plans(hcl, &agents(&["builder"]), &HashSet::new());
    assert!(plans.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::InvalidInput(_)));
}

#[test]
fn rejects_duplicate_plan_name_across_files() {
    let hcl = r#"
        plan "deploy" {
          step "build" {
            agent_id = "builder"
            prompt   = "Build"
          }
        }
    "#;

    let existing = ["deploy".to_string()].into_iter().collect();
    let (plans, errors) = load_plans(hcl, &agents(&["builder"]), &existing);
    assert!(plans.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::Conflict(_)));
}

#[test]
fn one_invalid_plan_does_not_block_its_siblings() {
    let hcl = r#"
        plan "good" {
          step "build" {
            agent_id = "builder"
            prompt   = "Build"
          }
        }
        plan "bad" {
          step "build" {
            agent_id = "ghost"
            prompt   = "Build"
          }
        }
    "#;

    let (plans, errors) = load_plans(hcl, &agents(&["builder"]), &HashSet::new());
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].name, "good");
    assert_eq!(errors.len(), 1);
}
