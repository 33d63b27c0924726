// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Extension mechanism tests.

use std::sync::Arc;
use std::thread;

use runtara_context::{
    ContextError, ExecutionContext, ProjectBranch, ProjectInfo, RESERVED_FIELDS,
    RuntimeEnvironment, TaskIdentity,
};
use serde_json::json;

#[test]
fn test_extension_round_trip() {
    let ctx = ExecutionContext::new();

    ctx.install_extension("build_id", "abc123").unwrap();

    assert_eq!(ctx.get("build_id").unwrap(), Some(json!("abc123")));
    assert!(ctx.contains("build_id"));
    assert!(!ctx.contains("not_installed"));
    assert_eq!(ctx.get("not_installed").unwrap(), None);
    assert_eq!(
        ctx.get_or("not_installed", "fallback").unwrap(),
        json!("fallback")
    );
}

#[test]
fn test_extensions_survive_reconfigure() {
    let ctx = ExecutionContext::new();
    ctx.install_extension("build_id", "abc123").unwrap();

    ctx.configure_with_runtime(
        None,
        TaskIdentity::new("1", "start", "1").with_flow_name("F"),
        RuntimeEnvironment::default(),
    );

    assert_eq!(ctx.extension("build_id"), Some(json!("abc123")));
}

#[test]
fn test_later_install_wins() {
    let ctx = ExecutionContext::new();

    ctx.install_extension("card_id", 1).unwrap();
    ctx.install_extension("card_id", 2).unwrap();

    assert_eq!(ctx.get("card_id").unwrap(), Some(json!(2)));
    assert_eq!(ctx.extension_names(), vec!["card_id".to_string()]);
}

#[test]
fn test_reserved_names_are_rejected() {
    let ctx = ExecutionContext::new();

    for name in RESERVED_FIELDS {
        let err = ctx.install_extension(name, "shadow").unwrap_err();
        assert!(matches!(err, ContextError::ReservedName(_)), "{name}");
    }

    // fixed fields still resolve to their own values
    assert_eq!(ctx.get("run_id").unwrap(), None);
    assert_eq!(ctx.get("is_running_flow").unwrap(), Some(json!(false)));
}

#[test]
fn test_null_extension_is_not_contained() {
    let ctx = ExecutionContext::new();

    ctx.install_extension("maybe", serde_json::Value::Null).unwrap();

    assert!(!ctx.contains("maybe"));
    assert_eq!(ctx.get("maybe").unwrap(), Some(serde_json::Value::Null));
}

#[test]
fn test_structured_extension_values() {
    let ctx = ExecutionContext::new();

    ctx.install_extension("card", json!({"id": "summary", "refresh": true}))
        .unwrap();

    let card = ctx.get("card").unwrap().unwrap();
    assert_eq!(card["id"], "summary");
    assert_eq!(card["refresh"], true);
}

#[test]
fn test_project_plugin() {
    let ctx = ExecutionContext::new();
    let info = ProjectInfo::new(
        "current_singleton",
        ProjectBranch::User("tester".to_string()),
        "CurrentSingletonTestFlow",
    )
    .unwrap();

    info.install(&ctx).unwrap();

    assert_eq!(
        ctx.get("project_name").unwrap(),
        Some(json!("current_singleton"))
    );
    assert_eq!(ctx.get("branch_name").unwrap(), Some(json!("user.tester")));
    assert_eq!(
        ctx.get("project_flow_name").unwrap(),
        Some(json!("current_singleton.user.tester.CurrentSingletonTestFlow"))
    );
    assert_eq!(ctx.get("is_production").unwrap(), Some(json!(false)));
}

#[test]
fn test_concurrent_readers_see_whole_snapshots() {
    let ctx = Arc::new(ExecutionContext::new());
    ctx.configure_with_runtime(
        None,
        TaskIdentity::new("0", "s0", "t0").with_flow_name("F0"),
        RuntimeEnvironment::default(),
    );

    let writer = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for i in 1..200 {
                ctx.configure_with_runtime(
                    None,
                    TaskIdentity::new(i.to_string(), format!("s{i}"), format!("t{i}"))
                        .with_flow_name(format!("F{i}")),
                    RuntimeEnvironment::default(),
                );
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = ctx.snapshot();
                    let run = snapshot.run_id().unwrap().to_string();
                    assert_eq!(
                        snapshot.pathspec().unwrap(),
                        format!("F{run}/{run}/s{run}/t{run}")
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
