//! Integration tests for the hook broker

use hq_hooks::hooks::{
    register_activation_hook, register_uninstall_hook, tags, Callback, CallbackRef, HookBroker,
    HookError, HookPriority, HooksConfig, Instance, PluginPaths, ALL_TAG,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Named callback that appends `label` to `log`
fn recorder(log: &Log, label: &str) -> Callback {
    let log = log.clone();
    let label = label.to_string();
    Callback::function(label.clone(), move |_, args| {
        log.lock().unwrap().push(label.clone());
        Ok(args.first().cloned().unwrap_or(Value::Null))
    })
}

#[test]
fn test_unknown_tag_passes_value_through() {
    let broker = HookBroker::new();
    assert_eq!(
        broker.apply_filters("unknown", json!({"a": 1}), &[json!(2)]).unwrap(),
        json!({"a": 1})
    );
    broker.do_action("unknown", &[json!(1)]).unwrap();
    assert_eq!(broker.did_action("unknown"), 1);
    assert_eq!(broker.current_filter(), None);
}

#[test]
fn test_reregistration_is_idempotent() {
    let broker = HookBroker::new();
    let log = new_log();
    let cb = recorder(&log, "once");
    broker.add_action("t", cb.clone(), HookPriority::DEFAULT, 1).unwrap();
    broker.add_action("t", cb, HookPriority::DEFAULT, 1).unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["once"]);
}

#[test]
fn test_priority_order() {
    let broker = HookBroker::new();
    let log = new_log();
    broker.add_action("t", recorder(&log, "twenty"), HookPriority(20), 1).unwrap();
    broker.add_action("t", recorder(&log, "five"), HookPriority(5), 1).unwrap();
    broker.add_action("t", recorder(&log, "ten"), HookPriority::DEFAULT, 1).unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["five", "ten", "twenty"]);
}

#[test]
fn test_same_priority_keeps_insertion_order() {
    let broker = HookBroker::new();
    let log = new_log();
    for name in ["c", "a", "b"] {
        broker.add_action("t", recorder(&log, name), HookPriority::DEFAULT, 1).unwrap();
    }

    broker.do_action("t", &[]).unwrap();
    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["c", "a", "b", "c", "a", "b"]);
}

#[test]
fn test_add_earlier_bucket_during_dispatch_runs_in_same_pass() {
    let broker = HookBroker::new();
    let log = new_log();
    let late = recorder(&log, "late");

    let sink = log.clone();
    broker
        .add_action(
            "t",
            Callback::function("adder", move |broker, _| {
                sink.lock().unwrap().push("adder".to_string());
                broker.add_action("t", late.clone(), HookPriority(1), 1)?;
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["adder", "late"]);

    // Next pass: the priority 1 bucket now sorts first
    log.lock().unwrap().clear();
    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["late", "adder"]);
}

#[test]
fn test_add_to_passed_bucket_waits_for_next_pass() {
    let broker = HookBroker::new();
    let log = new_log();
    broker.add_action("t", recorder(&log, "first"), HookPriority(1), 1).unwrap();

    let sink = log.clone();
    let latecomer = recorder(&log, "latecomer");
    broker
        .add_action(
            "t",
            Callback::function("adder", move |broker, _| {
                sink.lock().unwrap().push("adder".to_string());
                broker.add_action("t", latecomer.clone(), HookPriority(1), 1)?;
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["first", "adder"]);

    log.lock().unwrap().clear();
    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["first", "latecomer", "adder"]);
}

#[test]
fn test_callback_removes_itself() {
    let broker = HookBroker::new();
    let log = new_log();

    let sink = log.clone();
    broker
        .add_action(
            "t",
            Callback::function("one_shot", move |broker, _| {
                sink.lock().unwrap().push("one_shot".to_string());
                broker.remove_action("t", &CallbackRef::function("one_shot"), HookPriority::DEFAULT);
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();
    broker.add_action("t", recorder(&log, "after"), HookPriority::DEFAULT, 1).unwrap();

    broker.do_action("t", &[]).unwrap();
    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["one_shot", "after", "after"]);
}

#[test]
fn test_removing_a_pending_callback_skips_it() {
    let broker = HookBroker::new();
    let log = new_log();

    let sink = log.clone();
    broker
        .add_action(
            "t",
            Callback::function("remover", move |broker, _| {
                sink.lock().unwrap().push("remover".to_string());
                broker.remove_action("t", &CallbackRef::function("victim"), HookPriority(20));
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();
    broker.add_action("t", recorder(&log, "victim"), HookPriority(20), 1).unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["remover"]);
}

#[test]
fn test_filters_chain_in_priority_order() {
    let broker = HookBroker::new();
    broker
        .add_filter(
            "x",
            Callback::function("times_ten", |_, args| {
                Ok(json!(args[0].as_i64().unwrap_or_default() * 10))
            }),
            HookPriority(2),
            1,
        )
        .unwrap();
    broker
        .add_filter(
            "x",
            Callback::function("plus_one", |_, args| {
                Ok(json!(args[0].as_i64().unwrap_or_default() + 1))
            }),
            HookPriority(1),
            1,
        )
        .unwrap();

    assert_eq!(broker.apply_filters("x", json!(1), &[]).unwrap(), json!(20));
}

#[test]
fn test_did_action_counts() {
    let broker = HookBroker::new();
    for _ in 0..3 {
        broker.do_action("y", &[]).unwrap();
    }
    broker.apply_filters("y", json!(0), &[]).unwrap();
    assert_eq!(broker.did_action("y"), 3);
    assert_eq!(broker.did_action("z"), 0);
}

#[test]
fn test_nested_dispatch_tracks_current_hook() {
    let broker = HookBroker::new();
    let log = new_log();

    let sink = log.clone();
    broker
        .add_action(
            "inner",
            Callback::function("inner_probe", move |broker, _| {
                let current = broker.current_action().unwrap_or_default();
                sink.lock().unwrap().push(format!(
                    "{} outer={} inner={}",
                    current,
                    broker.doing_action(Some("outer")),
                    broker.doing_action(Some("inner"))
                ));
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    let sink = log.clone();
    broker
        .add_action(
            "outer",
            Callback::function("outer_probe", move |broker, _| {
                sink.lock().unwrap().push(broker.current_action().unwrap_or_default());
                broker.do_action("inner", &[])?;
                sink.lock().unwrap().push(broker.current_action().unwrap_or_default());
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    broker.do_action("outer", &[]).unwrap();
    assert_eq!(
        entries(&log),
        vec!["outer", "inner outer=true inner=true", "outer"]
    );
    assert_eq!(broker.current_action(), None);
    assert!(!broker.doing_action(None));
}

#[test]
fn test_all_hook_sees_every_dispatch() {
    let broker = HookBroker::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    broker
        .add_action(
            ALL_TAG,
            Callback::function("watch_all", move |broker, args| {
                sink.lock().unwrap().push((broker.current_filter(), args.to_vec()));
                Ok(json!("ignored"))
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();
    broker
        .add_filter(
            tags::QUERY_VARS,
            Callback::function("first_only", |_, args| Ok(args[0].clone())),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    let value = broker
        .apply_filters(tags::QUERY_VARS, json!(["p"]), &[json!("a"), json!("b")])
        .unwrap();
    assert_eq!(value, json!(["p"]));

    // Tags with no callbacks of their own still reach the all-hook
    broker.do_action(tags::SEND_HEADERS, &[json!({"status": 200})]).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0.as_deref(), Some(tags::QUERY_VARS));
    assert_eq!(seen[0].1, vec![json!(["p"]), json!("a"), json!("b")]);
    assert_eq!(seen[1].0.as_deref(), Some(tags::SEND_HEADERS));
    assert_eq!(seen[1].1, vec![json!({"status": 200})]);
}

#[test]
fn test_bound_methods_are_per_instance() {
    let broker = HookBroker::new();
    let log = new_log();
    let first = Instance::new("Router");
    let second = Instance::new("Router");

    for (instance, label) in [(&first, "first"), (&second, "second")] {
        let sink = log.clone();
        broker
            .add_action(
                tags::PARSE_REQUEST,
                Callback::method(instance, "parse", move |_, _| {
                    sink.lock().unwrap().push(label.to_string());
                    Ok(Value::Null)
                }),
                HookPriority::DEFAULT,
                1,
            )
            .unwrap();
    }

    assert!(broker.remove_action(
        tags::PARSE_REQUEST,
        &CallbackRef::method(&first, "parse"),
        HookPriority::DEFAULT
    ));
    broker.do_action(tags::PARSE_REQUEST, &[]).unwrap();
    assert_eq!(entries(&log), vec!["second"]);
}

#[test]
fn test_closures_are_distinct() {
    let broker = HookBroker::new();
    let log = new_log();
    for label in ["a", "b"] {
        let sink = log.clone();
        broker
            .add_action(
                tags::HQ,
                Callback::closure(move |_, _| {
                    sink.lock().unwrap().push(label.to_string());
                    Ok(Value::Null)
                }),
                HookPriority::DEFAULT,
                1,
            )
            .unwrap();
    }

    broker.do_action(tags::HQ, &[]).unwrap();
    assert_eq!(entries(&log), vec!["a", "b"]);
    assert_eq!(broker.registrations(tags::HQ).len(), 2);
}

#[test]
fn test_error_stops_dispatch_and_unwinds_stack() {
    let broker = HookBroker::new();
    broker
        .add_action(
            "outer",
            Callback::function("calls_inner", |broker, _| {
                broker.do_action("inner", &[])?;
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();
    broker
        .add_action(
            "inner",
            Callback::function("fails", |_, _| {
                Err(HookError::execution_failed("fails", "boom"))
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    let err = broker.do_action("outer", &[]).unwrap_err();
    assert!(matches!(err, HookError::ExecutionFailed { .. }));
    assert!(!broker.doing_action(None));
    assert_eq!(broker.did_action("inner"), 1);
}

#[test]
fn test_broker_from_config() {
    let config = HooksConfig::from_toml(
        r#"
[[handlers]]
name = "trace_requests"
handler_type = "logging"
tags = ["request"]
priority = 1

[[handlers]]
name = "shape_request"
handler_type = "transform"
tags = ["request"]

[[handlers.options.transforms]]
type = "add_field"
field = "routed"
value = true

[[handlers.options.transforms]]
type = "remove_field"
field = "debug"

[[handlers]]
name = "disabled"
handler_type = "logging"
tags = ["hq"]
enabled = false
"#,
    )
    .unwrap();

    let broker = HookBroker::from_config(&config).unwrap();
    let names: Vec<String> = broker
        .registrations(tags::REQUEST)
        .into_iter()
        .map(|r| r.callback)
        .collect();
    assert_eq!(names, vec!["trace_requests", "shape_request"]);
    assert!(!broker.has_action(tags::HQ));

    let value = broker
        .apply_filters(tags::REQUEST, json!({"name": "home", "debug": 1}), &[])
        .unwrap();
    assert_eq!(value, json!({"name": "home", "routed": true}));

    // Configured handlers are removable by name
    assert!(broker.remove_filter(
        tags::REQUEST,
        &CallbackRef::function("shape_request"),
        HookPriority::DEFAULT
    ));
}

#[test]
fn test_disabled_system_registers_nothing() {
    let config = HooksConfig::from_toml(
        r#"
[system]
enabled = false

[[handlers]]
name = "trace"
handler_type = "logging"
tags = ["request"]
"#,
    )
    .unwrap();

    let broker = HookBroker::from_config(&config).unwrap();
    assert!(broker.tags().is_empty());
}

#[test]
fn test_plugin_lifecycle_hooks() {
    let broker = HookBroker::new();
    let paths = PluginPaths::new("/var/www/hq-content/plugins", "/var/www/hq-content/mu-plugins").unwrap();
    let file = "/var/www/hq-content/plugins/gallery/gallery.php";
    let log = new_log();

    register_activation_hook(&broker, &paths, file, recorder(&log, "gallery_install")).unwrap();
    register_uninstall_hook(
        &broker,
        &paths,
        file,
        Callback::static_method("Gallery", "uninstall", |_, _| Ok(Value::Null)),
    )
    .unwrap();

    broker.do_action("activate_gallery/gallery.php", &[json!(false)]).unwrap();
    assert_eq!(entries(&log), vec!["gallery_install"]);
    assert!(broker.has_action("uninstall_gallery/gallery.php"));

    let bound = Callback::method(&Instance::new("Gallery"), "uninstall", |_, _| Ok(Value::Null));
    assert!(matches!(
        register_uninstall_hook(&broker, &paths, file, bound),
        Err(HookError::InvalidCallbackKind(_))
    ));
}

#[test]
fn test_callback_reregistering_itself_runs_once() {
    let broker = HookBroker::new();
    let runs = Arc::new(Mutex::new(0u32));

    fn solo(runs: Arc<Mutex<u32>>) -> Callback {
        Callback::function("solo", move |broker, _| {
            let count = {
                let mut runs = runs.lock().unwrap();
                *runs += 1;
                *runs
            };
            // Bail out instead of spinning forever if the walk ever loops
            if count < 5 {
                broker.remove_action("t", &CallbackRef::function("solo"), HookPriority::DEFAULT);
                broker.add_action("t", solo(runs.clone()), HookPriority::DEFAULT, 1)?;
            }
            Ok(Value::Null)
        })
    }

    broker.add_action("t", solo(runs.clone()), HookPriority::DEFAULT, 1).unwrap();
    broker.do_action("t", &[]).unwrap();
    assert_eq!(*runs.lock().unwrap(), 1);

    broker.do_action("t", &[]).unwrap();
    assert_eq!(*runs.lock().unwrap(), 2);
}

#[test]
fn test_cleared_and_refilled_tag_waits_for_next_pass() {
    let broker = HookBroker::new();
    let log = new_log();
    let late = recorder(&log, "late");

    let sink = log.clone();
    broker
        .add_action(
            "t",
            Callback::function("resetter", move |broker, _| {
                sink.lock().unwrap().push("resetter".to_string());
                broker.remove_all_actions("t", None);
                broker.add_action("t", late.clone(), HookPriority::DEFAULT, 1)?;
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["resetter"]);

    broker.do_action("t", &[]).unwrap();
    assert_eq!(entries(&log), vec!["resetter", "late"]);
}

#[test]
fn test_filter_reentering_its_own_tag() {
    let broker = HookBroker::new();
    let log = new_log();

    let sink = log.clone();
    let depth = Arc::new(Mutex::new(0u32));
    broker
        .add_filter(
            "t",
            Callback::function("plus_one", move |broker, args| {
                let nested = {
                    let mut depth = depth.lock().unwrap();
                    let nested = *depth;
                    *depth += 1;
                    nested
                };
                sink.lock().unwrap().push(format!("a{}", nested));
                if nested == 0 {
                    let inner = broker.apply_filters("t", json!(100), &[])?;
                    sink.lock().unwrap().push(format!("inner={}", inner));
                    assert_eq!(broker.current_filter().as_deref(), Some("t"));
                }
                Ok(json!(args[0].as_i64().unwrap_or_default() + 1))
            }),
            HookPriority(1),
            1,
        )
        .unwrap();

    let sink = log.clone();
    broker
        .add_filter(
            "t",
            Callback::function("double", move |_, args| {
                sink.lock().unwrap().push("b".to_string());
                Ok(json!(args[0].as_i64().unwrap_or_default() * 2))
            }),
            HookPriority(2),
            1,
        )
        .unwrap();

    let value = broker.apply_filters("t", json!(1), &[]).unwrap();
    assert_eq!(value, json!(4));
    assert_eq!(entries(&log), vec!["a0", "a1", "b", "inner=202", "b"]);
    assert_eq!(broker.current_filter(), None);
}

#[test]
fn test_action_reentering_its_own_tag() {
    let broker = HookBroker::new();
    let log = new_log();

    let sink = log.clone();
    broker
        .add_action(
            "t",
            Callback::function("nest_once", move |broker, args| {
                let level = args.first().and_then(Value::as_i64).unwrap_or_default();
                sink.lock().unwrap().push(format!("enter{}", level));
                if level == 0 {
                    broker.do_action("t", &[json!(1)])?;
                    assert_eq!(broker.current_action().as_deref(), Some("t"));
                    assert!(broker.doing_action(Some("t")));
                }
                sink.lock().unwrap().push(format!("leave{}", level));
                Ok(Value::Null)
            }),
            HookPriority::DEFAULT,
            1,
        )
        .unwrap();
    broker.add_action("t", recorder(&log, "after"), HookPriority(20), 1).unwrap();

    broker.do_action("t", &[json!(0)]).unwrap();
    assert_eq!(
        entries(&log),
        vec!["enter0", "enter1", "leave1", "after", "leave0", "after"]
    );
    assert_eq!(broker.did_action("t"), 2);
    assert_eq!(broker.current_action(), None);
    assert!(!broker.doing_action(None));
}
