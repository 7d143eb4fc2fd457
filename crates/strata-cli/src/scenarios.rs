//! Bundled demonstration scenarios.

use anyhow::{anyhow, Result};
use serde::Serialize;
use strata_core::{
    ClassDef, ClassSummary, Instance, InstanceSnapshot, Members, StrataConfig, SuperclassRef,
    Value,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Queue,
    CountingQueue,
    Numbers,
    Clone,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Queue,
        Scenario::CountingQueue,
        Scenario::Numbers,
        Scenario::Clone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Queue => "queue",
            Scenario::CountingQueue => "counting-queue",
            Scenario::Numbers => "numbers",
            Scenario::Clone => "clone",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == name)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(Scenario::name).collect();
                anyhow!("unknown scenario '{name}' (expected one of: {})", known.join(", "))
            })
    }

    pub fn run(&self, config: &StrataConfig) -> Result<ScenarioRun> {
        info!(scenario = self.name(), "running scenario");
        match self {
            Scenario::Queue => queue(config),
            Scenario::CountingQueue => counting_queue(config),
            Scenario::Numbers => numbers(config),
            Scenario::Clone => clone(config),
        }
    }
}

/// One observed step of a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub action: String,
    pub result: serde_json::Value,
}

pub struct ScenarioRun {
    pub classes: Vec<ClassDef>,
    pub instance: Instance,
    pub steps: Vec<Step>,
}

#[derive(Serialize)]
pub struct Inspection {
    pub classes: Vec<ClassSummary>,
    pub instance: InstanceSnapshot,
}

impl ScenarioRun {
    fn new(classes: Vec<ClassDef>, instance: Instance) -> Self {
        Self {
            classes,
            instance,
            steps: Vec::new(),
        }
    }

    fn record(&mut self, action: impl Into<String>, result: &Value) {
        self.steps.push(Step {
            action: action.into(),
            result: result.to_json(),
        });
    }

    pub fn inspect(&self) -> Inspection {
        Inspection {
            classes: self.classes.iter().map(ClassDef::summary).collect(),
            instance: self.instance.snapshot(),
        }
    }
}

fn queue_items(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        _ => Vec::new(),
    }
}

fn queue_class(config: &StrataConfig) -> Result<ClassDef> {
    config
        .class("Queue")
        .public(
            Members::new()
                .method("initialize", |ctx, args| {
                    for item in args {
                        ctx.this().call("add", &[item.clone()])?;
                    }
                    Ok(Value::Null)
                })
                .method("add", |ctx, args| {
                    let mut items = queue_items(ctx.private()?.get("queue")?);
                    items.push(args.first().cloned().unwrap_or_default());
                    ctx.private()?.set("queue", items)?;
                    Ok(Value::Instance(ctx.this().clone()))
                })
                .method("remove", |ctx, _args| {
                    let mut items = queue_items(ctx.private()?.get("queue")?);
                    if items.is_empty() {
                        return Ok(Value::Null);
                    }
                    let head = items.remove(0);
                    ctx.private()?.set("queue", items)?;
                    Ok(head)
                }),
        )
        .private(Members::new().field("queue", Value::List(Vec::new())))
        .build()
}

fn queue(config: &StrataConfig) -> Result<ScenarioRun> {
    let class = queue_class(config)?;
    let instance = class.new_instance(&[Value::Integer(5), Value::Integer(6), Value::from("foo")])?;
    let mut run = ScenarioRun::new(vec![class], instance.clone());
    for _ in 0..4 {
        let removed = instance.call("remove", &[])?;
        run.record("remove()", &removed);
    }
    Ok(run)
}

fn counting_queue(config: &StrataConfig) -> Result<ScenarioRun> {
    let queue = queue_class(config)?;
    let counting = config
        .class("CountingQueue")
        .public(
            Members::new()
                .method("add", |ctx, args| {
                    let total = ctx.private()?.get("total")?.as_i64().unwrap_or(0);
                    ctx.private()?.set("total", total + 1)?;
                    ctx.super_()?.call("add", args)
                })
                .method("get_total", |ctx, _args| ctx.private()?.get("total")),
        )
        .private(Members::new().field("total", 0))
        .inherit(SuperclassRef::direct(&queue))
        .build()?;

    let instance = counting.new_instance(&[])?;
    let mut run = ScenarioRun::new(vec![queue, counting], instance.clone());
    for item in ["5", "6"] {
        instance.call("add", &[Value::from(item)])?;
        run.record(format!("add({item:?})"), &Value::Null);
    }
    let total = instance.call("get_total", &[])?;
    run.record("get_total()", &total);
    Ok(run)
}

fn numbers(config: &StrataConfig) -> Result<ScenarioRun> {
    let class = config
        .class("Numbers")
        .public(Members::new().field("x", 0))
        .active(Members::new().method("x2", |ctx, args| match args.first() {
            None => {
                let x = ctx.this().get("x")?.as_i64().unwrap_or(0);
                Ok(Value::Integer(x * 2))
            }
            Some(value) => {
                let half = value.as_i64().unwrap_or(0) / 2;
                ctx.this().set("x", half)?;
                Ok(Value::Null)
            }
        }))
        .build()?;

    let instance = class.new_instance(&[])?;
    let mut run = ScenarioRun::new(vec![class], instance.clone());

    instance.set("x", 100)?;
    run.record("x = 100", &Value::Integer(100));
    run.record("x2", &instance.get("x2")?);
    instance.set("x2", 1000)?;
    run.record("x2 = 1000", &Value::Integer(1000));
    run.record("x", &instance.get("x")?);
    Ok(run)
}

fn clone(config: &StrataConfig) -> Result<ScenarioRun> {
    let node = config
        .class("Node")
        .public(Members::new().field("value", 0))
        .build()?;
    let holder = config
        .class("Holder")
        .public(Members::new().field("label", "original").field("child", Value::Null))
        .build()?;

    let original = holder.new_instance(&[])?;
    original.set("child", node.new_instance(&[])?)?;
    let shallow = original.copy(false)?;
    let deep = original.copy(true)?;

    original.set("label", "changed")?;
    if let Some(child) = original.get("child")?.as_instance() {
        child.set("value", 42)?;
    }

    let child_value = |instance: &Instance| -> Result<Value> {
        match instance.get("child")?.as_instance() {
            Some(child) => child.get("value"),
            None => Ok(Value::Null),
        }
    };

    let mut run = ScenarioRun::new(vec![node, holder], deep.clone());
    run.record("shallow.label", &shallow.get("label")?);
    run.record("shallow.child.value", &child_value(&shallow)?);
    run.record("deep.label", &deep.get("label")?);
    run.record("deep.child.value", &child_value(&deep)?);
    Ok(run)
}
