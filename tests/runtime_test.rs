//! End-to-end runtime tests.
//!
//! Drives whole executions through a toy line-based engine that calls the
//! real builtin table, the way a host template engine would.

mod common;

use ccrt::{BuiltinTable, Config, RuntimeError, Value};
use common::{Event, TestHost, CHANNEL, TRIGGER_MESSAGE, USER};

#[test]
fn test_root_template_with_nested_call() {
    let host = TestHost::new();
    host.engine.add("child", "> hello from child");
    host.engine.add("root", "sendTemplate nil child\n> |done");

    let mut ctx = host.context(false);
    let out = host.run(&mut ctx, "root").unwrap();
    assert_eq!(out, "1001|done");

    assert_eq!(
        host.recorder.events(),
        vec![
            Event::Response(CHANNEL, "hello from child".to_string(), vec![]),
            Event::Response(CHANNEL, "1001|done".to_string(), vec![]),
        ]
    );
    assert_eq!(ctx.quota().count("exec_child"), 1);
}

#[test]
fn test_nested_template_cannot_nest() {
    let host = TestHost::new();
    host.engine.add("grandchild", "> never");
    host.engine.add("child", "sendTemplate nil grandchild");
    host.engine.add("root", "sendTemplate nil child");

    let mut ctx = host.context(false);
    let err = host.run(&mut ctx, "root").unwrap_err();
    assert!(matches!(err, RuntimeError::NestingLimit(_)));
    assert!(!ctx.frame().is_nested);
    assert!(host.recorder.events().is_empty());
}

#[test]
fn test_nested_call_budget_from_config() {
    let config = Config::parse("[limits]\nmax_nested_calls = 1\n").unwrap();
    config.validate().unwrap();

    let host = TestHost::new();
    host.engine.add("child", "> x");
    host.engine.add("root", "sendTemplate nil child\nsendTemplate nil child");

    let mut ctx = host.context_with_limits(false, &config.limits);
    let err = host.run(&mut ctx, "root").unwrap_err();
    assert!(err.is_quota());
    assert_eq!(host.recorder.events().len(), 1);
}

#[test]
fn test_dm_and_other_channel_targets() {
    let host = TestHost::new();
    host.engine.add("child", "> psst");
    host.engine.add("root", "sendTemplateDM child\nsendTemplate 11 child");

    let mut ctx = host.context(false);
    host.run(&mut ctx, "root").unwrap();

    let events = host.recorder.events();
    assert_eq!(events[0], Event::Dm(USER));
    assert_eq!(events[1], Event::Response(99, "psst".to_string(), vec![]));
    assert_eq!(events[2], Event::Response(11, "psst".to_string(), vec![]));
}

#[test]
fn test_response_reactions_and_trigger_reactions() {
    let host = TestHost::new();
    host.engine.add(
        "root",
        "addResponseReactions 👍 🎉\naddReactions ✅\n> reacted",
    );

    let mut ctx = host.context(false);
    host.run(&mut ctx, "root").unwrap();
    assert_eq!(
        host.recorder.events(),
        vec![
            Event::Reaction(TRIGGER_MESSAGE, "✅".to_string()),
            Event::Response(
                CHANNEL,
                "reacted".to_string(),
                vec!["👍".to_string(), "🎉".to_string()]
            ),
        ]
    );
}

#[test]
fn test_role_changes_and_scheduling() {
    let host = TestHost::new();
    host.engine.add(
        "root",
        "giveRoleID 20 7\ntakeRoleID 20 5 1h\ndeleteTrigger 30",
    );

    let mut ctx = host.context(false);
    host.run(&mut ctx, "root").unwrap();
    assert_eq!(
        host.recorder.events(),
        vec![
            Event::Role(USER, 7, true),
            Event::Scheduled(format!("remove {USER} 5")),
            Event::Scheduled(format!("delete {TRIGGER_MESSAGE}")),
        ]
    );
}

#[test]
fn test_failure_stops_execution_without_side_effects() {
    let host = TestHost::new();
    let mut script = String::new();
    for i in 0..101 {
        script.push_str(&format!("sendMessage nil m{i}\n"));
    }
    script.push_str("> unreachable");
    host.engine.add("root", &script);

    let mut ctx = host.context(false);
    let err = host.run(&mut ctx, "root").unwrap_err();
    assert_eq!(err.to_string(), "too many potential api calls in this execution");
    assert_eq!(host.recorder.events().len(), 100);
}

#[test]
fn test_regex_cache_capacity_from_limits() {
    let mut config = Config::default();
    config.limits.regex_cache_capacity = 2;

    let host = TestHost::new();
    host.engine.add("root", "reFind a+ caab\nreFind b+ caab\nreFind a+ aa\nreFind c caab");

    let mut ctx = host.context_with_limits(false, &config.limits);
    let err = host.run(&mut ctx, "root").unwrap_err();
    assert!(err.to_string().contains("regex cache full"));
}

#[test]
fn test_counters_visible_to_scripts() {
    let host = TestHost::new();
    host.engine.add("child", "");
    host.engine.add("root", "sendTemplate nil child\nexecCounters");

    let mut ctx = host.context(false);
    let out = host.run(&mut ctx, "root").unwrap();
    assert_eq!(out, "map[exec_child:1]");
}

#[test]
fn test_sort_budget_depends_on_tier() {
    let host = TestHost::new();
    let table = BuiltinTable::standard();
    let list = Value::from(vec![Value::from("b"), Value::Int(2), Value::from("a"), Value::Int(1)]);

    let mut free = host.context(false);
    let sorted = table.call(&mut free, "sort", &[list.clone()]).unwrap();
    assert_eq!(
        sorted,
        Value::from(vec![Value::Int(1), Value::Int(2), Value::from("a"), Value::from("b")])
    );
    assert!(table.call(&mut free, "sort", &[list.clone()]).unwrap_err().is_quota());

    let mut premium = host.context(true);
    for _ in 0..3 {
        table.call(&mut premium, "sort", &[list.clone()]).unwrap();
    }
    assert!(table.call(&mut premium, "sort", &[list]).unwrap_err().is_quota());
}

#[test]
fn test_budgets_are_per_execution() {
    let host = TestHost::new();
    host.engine.add("root", "sleep 40");

    let mut first = host.context(false);
    host.run(&mut first, "root").unwrap();
    assert!(host.run(&mut first, "root").unwrap_err().is_quota());

    let mut second = host.context(false);
    host.run(&mut second, "root").unwrap();
    assert_eq!(second.quota().slept_secs(), 40);
}
