use super::*;
use crate::{
    class::{ClassDef, EncapsulationMode, Member, Members, SuperclassRef},
    environment::Environment,
    errors::ObjectModelError,
};

fn model_error(err: &anyhow::Error) -> ObjectModelError {
    ObjectModelError::from_anyhow(err)
        .cloned()
        .unwrap_or_else(|| panic!("expected an object-model error, got: {err}"))
}

fn int(value: &Value) -> i64 {
    value
        .as_i64()
        .unwrap_or_else(|| panic!("expected an integer, got {value}"))
}

/// Three-level chain where every level appends its own name.
fn describe_chain() -> anyhow::Result<ClassDef> {
    let a = ClassDef::builder("A")
        .public(Members::new().method("describe", |_ctx, _args| Ok(Value::from("A"))))
        .build()?;
    let b = ClassDef::builder("B")
        .public(Members::new().method("describe", |ctx, _args| {
            let base = ctx.super_()?.call("describe", &[])?;
            Ok(Value::String(format!("{}B", base.as_str().unwrap_or_default())))
        }))
        .inherit(SuperclassRef::direct(&a))
        .build()?;
    ClassDef::builder("C")
        .public(Members::new().method("describe", |ctx, _args| {
            let base = ctx.super_()?.call("describe", &[])?;
            Ok(Value::String(format!("{}C", base.as_str().unwrap_or_default())))
        }))
        .inherit(SuperclassRef::direct(&b))
        .build()
}

#[test]
fn test_locked_scope_rules() -> anyhow::Result<()> {
    let class = ClassDef::builder("Box")
        .public(
            Members::new()
                .field("x", 1)
                .method("get_x", |ctx, _args| ctx.this().get("x")),
        )
        .build()?;
    let instance = class.new_instance(&[])?;
    assert!(instance.is_locked());

    instance.set("x", 10)?;
    assert_eq!(instance.call("get_x", &[])?, Value::Integer(10));

    let err = instance.set("y", 1).unwrap_err();
    assert_eq!(
        model_error(&err),
        ObjectModelError::locked_addition("Box", "public", "y")
    );

    let err = instance.set("get_x", 1).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::locked_binding("Box", "get_x"));

    assert!(instance.get("missing")?.is_null());

    let err = instance.call("missing", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::no_such_member("Box", "missing"));

    let err = instance.call("x", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::not_callable("Box", "x"));
    Ok(())
}

#[test]
fn test_unlocked_instance_accepts_new_names() -> anyhow::Result<()> {
    let class = ClassDef::builder("Open").lock_objects(false).build()?;
    let instance = class.new_instance(&[])?;
    assert!(!instance.is_locked());

    instance.set("added", "later")?;
    assert_eq!(instance.get("added")?, Value::from("later"));
    assert_eq!(instance.names(), vec!["added"]);
    Ok(())
}

#[test]
fn test_private_members_hidden_from_public_scope() -> anyhow::Result<()> {
    let class = ClassDef::builder("Vault")
        .public(Members::new().method("peek", |ctx, _args| ctx.private()?.get("secret")))
        .private(Members::new().field("secret", 42))
        .build()?;
    let instance = class.new_instance(&[])?;

    assert!(instance.has_private());
    assert!(!instance.has("secret"));
    assert!(instance.get("secret")?.is_null());
    assert_eq!(instance.call("peek", &[])?, Value::Integer(42));
    Ok(())
}

#[test]
fn test_missing_private_and_super_scopes() -> anyhow::Result<()> {
    let class = ClassDef::builder("Plain")
        .public(
            Members::new()
                .method("touch_private", |ctx, _args| ctx.private()?.get("x"))
                .method("touch_super", |ctx, _args| ctx.super_()?.call("x", &[])),
        )
        .build()?;
    let instance = class.new_instance(&[])?;
    assert!(!instance.has_private());

    let err = instance.call("touch_private", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::missing_scope("Plain", "private"));

    let err = instance.call("touch_super", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::missing_scope("Plain", "super"));
    Ok(())
}

#[test]
fn test_super_dispatch_across_three_levels() -> anyhow::Result<()> {
    let class = describe_chain()?;
    let instance = class.new_instance(&[])?;
    assert_eq!(instance.call("describe", &[])?, Value::from("ABC"));
    assert_eq!(instance.chain(), vec!["A", "B", "C"]);
    Ok(())
}

#[test]
fn test_super_methods_share_instance_state() -> anyhow::Result<()> {
    let base = ClassDef::builder("Tally")
        .public(
            Members::new()
                .method("add", |ctx, args| {
                    let n = args.first().and_then(Value::as_i64).unwrap_or(0);
                    let total = int(&ctx.private()?.get("total")?) + n;
                    ctx.private()?.set("total", total)?;
                    Ok(Value::Integer(total))
                })
                .method("get_total", |ctx, _args| ctx.private()?.get("total")),
        )
        .private(Members::new().field("total", 0))
        .build()?;
    let doubled = ClassDef::builder("DoubleTally")
        .public(Members::new().method("add", |ctx, args| {
            let n = args.first().and_then(Value::as_i64).unwrap_or(0);
            ctx.super_()?.call("add", &[Value::Integer(n * 2)])
        }))
        .inherit(SuperclassRef::direct(&base))
        .build()?;

    let instance = doubled.new_instance(&[])?;
    instance.call("add", &[Value::Integer(3)])?;
    instance.call("add", &[Value::Integer(1)])?;
    assert_eq!(instance.call("get_total", &[])?, Value::Integer(8));
    Ok(())
}

#[test]
fn test_super_scope_is_read_only() -> anyhow::Result<()> {
    let base = ClassDef::builder("Base")
        .public(Members::new().method("hello", |_ctx, _args| Ok(Value::from("hi"))))
        .build()?;
    let derived = ClassDef::builder("Derived")
        .public(
            Members::new()
                .method("replace_hello", |ctx, _args| {
                    ctx.super_()?.set("hello", 1)?;
                    Ok(Value::Null)
                })
                .method("add_to_super", |ctx, _args| {
                    ctx.super_()?.set("fresh", 1)?;
                    Ok(Value::Null)
                })
                .method("names", |ctx, _args| {
                    let super_ = ctx.super_()?;
                    Ok(Value::from(super_.class_name()))
                }),
        )
        .inherit(SuperclassRef::direct(&base))
        .build()?;
    let instance = derived.new_instance(&[])?;

    let err = instance.call("replace_hello", &[]).unwrap_err();
    assert!(matches!(model_error(&err), ObjectModelError::LockedBinding { .. }));

    let err = instance.call("add_to_super", &[]).unwrap_err();
    assert!(matches!(
        model_error(&err),
        ObjectModelError::LockedMemberAddition { scope, .. } if scope == "super"
    ));

    assert_eq!(instance.call("names", &[])?, Value::from("Base"));
    Ok(())
}

#[test]
fn test_active_property_reads_and_writes() -> anyhow::Result<()> {
    let class = ClassDef::builder("Numbers")
        .public(Members::new().field("x", 100))
        .active(Members::new().method("x2", |ctx, args| match args.first() {
            None => Ok(Value::Integer(int(&ctx.this().get("x")?) * 2)),
            Some(value) => {
                ctx.this().set("x", int(value) / 2)?;
                Ok(Value::Null)
            }
        }))
        .build()?;
    let numbers = class.new_instance(&[])?;

    assert_eq!(numbers.get("x2")?, Value::Integer(200));
    numbers.set("x2", 1000)?;
    assert_eq!(numbers.get("x")?, Value::Integer(500));
    assert_eq!(numbers.scope().kind_of("x2"), Some(SlotKind::Active));
    Ok(())
}

#[test]
fn test_unqualified_lookup_and_rebind() -> anyhow::Result<()> {
    let env = Environment::new("module");
    env.define("step", 5);

    let class = ClassDef::builder("Legacy")
        .mode(EncapsulationMode::Unqualified)
        .environment(&env)
        .public(
            Members::new()
                .field("count", 0)
                .method("bump", |ctx, _args| {
                    let next = int(&ctx.lookup("count")?) + int(&ctx.lookup("step")?);
                    ctx.rebind("count", next)?;
                    ctx.rebind("hidden", next * 10)?;
                    Ok(Value::Integer(next))
                })
                .method("whoami", |ctx, _args| ctx.lookup("self"))
                .method("read_hidden", |ctx, _args| ctx.lookup("hidden"))
                .method("rebind_unknown", |ctx, _args| {
                    ctx.rebind("nowhere", 1)?;
                    Ok(Value::Null)
                }),
        )
        .private(Members::new().field("hidden", 0))
        .build()?;
    let instance = class.new_instance(&[])?;
    assert_eq!(instance.mode(), EncapsulationMode::Unqualified);

    assert_eq!(instance.call("bump", &[])?, Value::Integer(5));
    assert_eq!(instance.get("count")?, Value::Integer(5));
    assert_eq!(instance.call("read_hidden", &[])?, Value::Integer(50));

    let me = instance.call("whoami", &[])?;
    assert!(me.as_instance().is_some_and(|me| me.ptr_eq(&instance)));

    let err = instance.call("rebind_unknown", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::unbound("nowhere"));

    // Environment rebinding goes through the declaring environment.
    env.define("total", 0);
    let summing = ClassDef::builder("Summing")
        .mode(EncapsulationMode::Unqualified)
        .environment(&env)
        .public(Members::new().method("record", |ctx, _args| {
            let total = int(&ctx.lookup("total")?) + 1;
            ctx.rebind("total", total)?;
            Ok(Value::Null)
        }))
        .build()?;
    let summing = summing.new_instance(&[])?;
    summing.call("record", &[])?;
    summing.call("record", &[])?;
    assert_eq!(env.get("total"), Some(Value::Integer(2)));
    Ok(())
}

#[test]
fn test_qualified_lookup_skips_instance_fields() -> anyhow::Result<()> {
    let env = Environment::new("module");
    env.define("label", "from-env");

    let class = ClassDef::builder("Strict")
        .environment(&env)
        .public(
            Members::new()
                .field("label", "from-field")
                .method("bare_label", |ctx, _args| ctx.lookup("label"))
                .method("bare_missing", |ctx, _args| ctx.lookup("missing")),
        )
        .build()?;
    let instance = class.new_instance(&[])?;

    assert_eq!(instance.call("bare_label", &[])?, Value::from("from-env"));
    let err = instance.call("bare_missing", &[]).unwrap_err();
    assert_eq!(model_error(&err), ObjectModelError::unbound("missing"));
    Ok(())
}

#[test]
fn test_class_tags() -> anyhow::Result<()> {
    let instance = describe_chain()?.new_instance(&[])?;
    assert_eq!(
        instance.class_tags().map(<[String]>::to_vec),
        Some(vec![
            "C".to_string(),
            "B".to_string(),
            "A".to_string(),
            GENERIC_TAG.to_string()
        ])
    );
    assert!(instance.inherits("A"));
    assert!(instance.inherits(GENERIC_TAG));
    assert!(!instance.inherits("D"));

    let untagged = ClassDef::builder("Untagged").class_tagged(false).build()?;
    let instance = untagged.new_instance(&[])?;
    assert!(instance.class_tags().is_none());
    assert!(!instance.inherits("Untagged"));
    Ok(())
}

#[test]
fn test_initialize_runs_after_lock() -> anyhow::Result<()> {
    let strict = ClassDef::builder("Strict")
        .public(Members::new().method("initialize", |ctx, _args| {
            ctx.this().set("late", 1)?;
            Ok(Value::Null)
        }))
        .build()?;
    let err = strict.new_instance(&[]).unwrap_err();
    assert_eq!(
        model_error(&err),
        ObjectModelError::locked_addition("Strict", "public", "late")
    );

    let loose = ClassDef::builder("Loose")
        .lock_objects(false)
        .public(Members::new().method("initialize", |ctx, args| {
            ctx.this().set("late", args.first().cloned().unwrap_or_default())?;
            Ok(Value::Null)
        }))
        .build()?;
    let instance = loose.new_instance(&[Value::Integer(7)])?;
    assert_eq!(instance.get("late")?, Value::Integer(7));
    Ok(())
}

#[test]
fn test_arguments_without_initialize() -> anyhow::Result<()> {
    let class = ClassDef::builder("NoInit").build()?;
    class.new_instance(&[])?;

    let err = class
        .new_instance(&[Value::Integer(1), Value::Integer(2)])
        .unwrap_err();
    assert_eq!(
        model_error(&err),
        ObjectModelError::ConstructorArgumentMismatch {
            class: "NoInit".to_string(),
            count: 2
        }
    );
    Ok(())
}

#[test]
fn test_initializer_is_inherited() -> anyhow::Result<()> {
    let base = ClassDef::builder("Base")
        .public(
            Members::new()
                .field("value", Value::Null)
                .method("initialize", |ctx, args| {
                    ctx.this().set("value", args.first().cloned().unwrap_or_default())?;
                    Ok(Value::Null)
                }),
        )
        .build()?;
    let derived = ClassDef::builder("Derived")
        .inherit(SuperclassRef::direct(&base))
        .build()?;

    let instance = derived.new_instance(&[Value::from("seed")])?;
    assert_eq!(instance.get("value")?, Value::from("seed"));
    Ok(())
}

#[test]
fn test_copy_does_not_run_initialize() -> anyhow::Result<()> {
    let env = Environment::new("counter");
    env.define("constructed", 0);
    let class = ClassDef::builder("Counted")
        .environment(&env)
        .public(Members::new().method("initialize", |ctx, _args| {
            if let Some(env) = ctx.environment() {
                let count = env.get("constructed").and_then(|v| v.as_i64()).unwrap_or(0);
                env.assign("constructed", Value::Integer(count + 1));
            }
            Ok(Value::Null)
        }))
        .build()?;

    let original = class.new_instance(&[])?;
    let copy = original.copy(false)?;
    assert!(!copy.ptr_eq(&original));
    assert_ne!(copy.id(), original.id());
    assert_eq!(env.get("constructed"), Some(Value::Integer(1)));
    Ok(())
}

#[test]
fn test_copy_rebinds_methods() -> anyhow::Result<()> {
    let class = ClassDef::builder("Cell")
        .public(
            Members::new()
                .method("get", |ctx, _args| ctx.private()?.get("value"))
                .method("put", |ctx, args| {
                    ctx.private()?.set("value", args.first().cloned().unwrap_or_default())?;
                    Ok(Value::Null)
                }),
        )
        .private(Members::new().field("value", 1))
        .build()?;

    let original = class.new_instance(&[])?;
    let copy = original.copy(false)?;
    copy.call("put", &[Value::Integer(2)])?;

    assert_eq!(original.call("get", &[])?, Value::Integer(1));
    assert_eq!(copy.call("get", &[])?, Value::Integer(2));
    assert!(copy.is_locked());
    Ok(())
}

#[test]
fn test_deep_clone_hook() -> anyhow::Result<()> {
    let class = ClassDef::builder("Hooked")
        .public(Members::new().field("label", "original").field("kept", 1))
        .private(Members::new().method("deep_clone", |_ctx, args| {
            let name = args.first().and_then(Value::as_str).unwrap_or_default();
            let value = args.get(1).cloned().unwrap_or_default();
            Ok(match name {
                "label" => Value::from("copied"),
                _ => value,
            })
        }))
        .build()?;
    let original = class.new_instance(&[])?;

    let shallow = original.copy(false)?;
    assert_eq!(shallow.get("label")?, Value::from("original"));

    let deep = original.copy(true)?;
    assert_eq!(deep.get("label")?, Value::from("copied"));
    assert_eq!(deep.get("kept")?, Value::Integer(1));
    assert_eq!(original.get("label")?, Value::from("original"));
    Ok(())
}

#[test]
fn test_non_cloneable_instances() -> anyhow::Result<()> {
    let class = ClassDef::builder("Unique").cloneable(false).build()?;
    let instance = class.new_instance(&[])?;
    assert!(!instance.is_cloneable());

    let err = instance.copy(false).unwrap_err();
    assert_eq!(
        model_error(&err),
        ObjectModelError::CloneUnsupported {
            class: "Unique".to_string()
        }
    );

    // Nested non-cloneable instances stay shared in a deep copy.
    let holder = ClassDef::builder("Holder")
        .public(Members::new().field("inner", Value::Null))
        .build()?;
    let outer = holder.new_instance(&[])?;
    outer.set("inner", instance.clone())?;
    let copy = outer.copy(true)?;
    let nested = copy.get("inner")?;
    assert!(nested.as_instance().is_some_and(|nested| nested.ptr_eq(&instance)));
    Ok(())
}

#[test]
fn test_detached_method_keeps_instance_alive() -> anyhow::Result<()> {
    let class = ClassDef::builder("Greeter")
        .public(Members::new().method("greet", |ctx, _args| {
            let name = ctx.private()?.get("name")?;
            Ok(Value::String(format!("hello {name}")))
        }))
        .private(Members::new().field("name", "strata"))
        .build()?;

    let greet = class.new_instance(&[])?.get("greet")?;
    let greet = greet
        .as_function()
        .cloned()
        .unwrap_or_else(|| panic!("greet should be a function"));
    assert_eq!(greet.declared_in(), "Greeter");
    assert_eq!(greet.call(&[])?, Value::from("hello strata"));
    Ok(())
}

#[test]
fn test_own_method_in_field_does_not_leak() -> anyhow::Result<()> {
    let class = ClassDef::builder("Callback")
        .public(
            Members::new()
                .field("cb", Value::Null)
                .method("read", |_ctx, _args| Ok(Value::Integer(1))),
        )
        .build()?;
    let instance = class.new_instance(&[])?;
    instance.set("cb", instance.get("read")?)?;
    assert_eq!(instance.call("cb", &[])?, Value::Integer(1));

    let weak = Arc::downgrade(&instance.core);
    drop(instance);
    assert!(weak.upgrade().is_none());
    Ok(())
}

#[test]
fn test_copy_rebinds_own_methods_held_in_fields() -> anyhow::Result<()> {
    let class = ClassDef::builder("Reader")
        .public(
            Members::new()
                .field("n", 1)
                .field("cb", Value::Null)
                .method("read", |ctx, _args| ctx.this().get("n")),
        )
        .build()?;
    let original = class.new_instance(&[])?;
    original.set("cb", original.get("read")?)?;

    let copy = original.copy(false)?;
    copy.set("n", 99)?;

    assert_eq!(copy.call("cb", &[])?, Value::Integer(99));
    assert_eq!(copy.call("read", &[])?, Value::Integer(99));
    assert_eq!(original.call("cb", &[])?, Value::Integer(1));
    Ok(())
}

#[test]
fn test_traced_methods() -> anyhow::Result<()> {
    let class = ClassDef::builder("Traced")
        .public(
            Members::new()
                .method("step", |_ctx, _args| Ok(Value::Integer(1)))
                .method("quiet", |_ctx, _args| Ok(Value::Null)),
        )
        .build()?;
    class.debug("step");
    let instance = class.new_instance(&[])?;

    let is_traced = |name: &str| -> anyhow::Result<bool> {
        Ok(instance
            .get(name)?
            .as_function()
            .is_some_and(BoundMethod::is_traced))
    };
    assert!(is_traced("step")?);
    assert!(!is_traced("quiet")?);
    assert_eq!(instance.call("step", &[])?, Value::Integer(1));
    Ok(())
}

#[test]
fn test_snapshot() -> anyhow::Result<()> {
    let class = ClassDef::builder("Shown")
        .public(
            Members::new()
                .field("x", 3)
                .method("show", |_ctx, _args| Ok(Value::Null)),
        )
        .private(Members::new().field("secret", "s"))
        .build()?;
    let instance = class.new_instance(&[])?;
    let snapshot = instance.snapshot();

    assert_eq!(snapshot.class_name, "Shown");
    assert_eq!(snapshot.chain, vec!["Shown"]);
    assert!(snapshot.locked);
    assert_eq!(snapshot.public.len(), 2);
    assert_eq!(snapshot.public[0].name, "x");
    assert_eq!(snapshot.public[0].value, Some(serde_json::json!(3)));
    assert_eq!(snapshot.public[1].kind, SlotKind::Method);
    assert!(snapshot.public[1].value.is_none());

    let private = snapshot.private.unwrap_or_default();
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].value, Some(serde_json::json!("s")));
    Ok(())
}

#[test]
fn test_field_override_across_levels() -> anyhow::Result<()> {
    let base = ClassDef::builder("Base")
        .public(Members::new().field("greeting", "hello"))
        .build()?;
    let derived = ClassDef::builder("Derived")
        .public(Members::new().entry("greeting", Member::field("howdy")))
        .inherit(SuperclassRef::direct(&base))
        .build()?;

    assert_eq!(base.new_instance(&[])?.get("greeting")?, Value::from("hello"));
    assert_eq!(derived.new_instance(&[])?.get("greeting")?, Value::from("howdy"));
    Ok(())
}

#[test]
fn test_instance_id_display() {
    let id = InstanceId::new();
    let shown = id.to_string();
    assert!(shown.starts_with('#'));
    assert_eq!(shown.len(), 9);
}
