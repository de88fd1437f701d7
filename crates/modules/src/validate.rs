//! Shape checks that turn a [`NormalizedEntry`] into a [`ModuleDescriptor`].

use std::fmt;

use crate::{
    descriptor::{
        CommandData, CommandDescriptor, Cooldown, EventDescriptor, ModuleDescriptor, ModuleOrigin,
    },
    normalize::NormalizedEntry,
    value::{Callable, CallableKind, HandlerFn, ModuleValue},
};

/// A candidate that is not a valid descriptor. Logged and dropped by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub path: String,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path, self.index, self.reason)
    }
}

impl std::error::Error for ValidationFailure {}

type Check<T> = Result<T, String>;

/// Parse one candidate into a descriptor.
pub fn validate(entry: NormalizedEntry) -> Result<ModuleDescriptor, ValidationFailure> {
    let NormalizedEntry { path, index, value } = entry;
    let origin = ModuleOrigin { path, index };
    parse(&value, origin.clone()).map_err(|reason| ValidationFailure {
        path: origin.path,
        index: origin.index,
        reason,
    })
}

fn parse(value: &ModuleValue, origin: ModuleOrigin) -> Check<ModuleDescriptor> {
    if !matches!(value, ModuleValue::Object(_)) {
        return Err(format!(
            "expected an object with `tag` and `payload`, got {}",
            value.type_name()
        ));
    }
    let tag = match value.get("tag") {
        Some(ModuleValue::String(tag)) => tag.as_str(),
        Some(other) => return Err(format!("`tag` must be a string, got {}", other.type_name())),
        None => return Err("missing `tag`".into()),
    };
    let payload = match value.get("payload") {
        Some(payload @ ModuleValue::Object(_)) => payload,
        Some(other) => {
            return Err(format!(
                "`payload` must be an object, got {}",
                other.type_name()
            ));
        },
        None => return Err("missing `payload`".into()),
    };

    match tag {
        "event" => parse_event(payload, origin).map(ModuleDescriptor::Event),
        "command" => parse_command(payload, origin).map(ModuleDescriptor::Command),
        other => Err(format!(
            "unknown tag '{other}', expected \"event\" or \"command\""
        )),
    }
}

fn parse_event(payload: &ModuleValue, origin: ModuleOrigin) -> Check<EventDescriptor> {
    let name = match payload.get("name") {
        Some(ModuleValue::String(name)) if !name.is_empty() => name.clone(),
        Some(ModuleValue::String(_)) => return Err("`payload.name` is empty".into()),
        Some(other) => {
            return Err(format!(
                "`payload.name` must be a string, got {}",
                other.type_name()
            ));
        },
        None => return Err("missing `payload.name`".into()),
    };
    let once = match payload.get("once") {
        Some(ModuleValue::Bool(once)) => *once,
        Some(other) => {
            return Err(format!(
                "`payload.once` must be a boolean, got {}",
                other.type_name()
            ));
        },
        None => return Err("missing `payload.once`".into()),
    };
    let execute = match callable(payload, "execute")? {
        Some(Callable::Event(f)) => f.clone(),
        Some(other) => return Err(wrong_kind("execute", CallableKind::Event, other)),
        None => return Err("missing `payload.execute`".into()),
    };
    let handler = optional_handler(payload)?;

    Ok(EventDescriptor {
        name,
        once,
        handler,
        execute,
        origin,
    })
}

fn parse_command(payload: &ModuleValue, origin: ModuleOrigin) -> Check<CommandDescriptor> {
    let data = match payload.get("data") {
        Some(data @ ModuleValue::Object(_)) => {
            let json = data
                .to_json()
                .map_err(|e| format!("`payload.data` is not serializable: {e}"))?;
            CommandData::from_json(json)?
        },
        Some(other) => {
            return Err(format!(
                "`payload.data` must be an object, got {}",
                other.type_name()
            ));
        },
        None => return Err("missing `payload.data`".into()),
    };
    let execute = match callable(payload, "execute")? {
        Some(Callable::Command(f)) => f.clone(),
        Some(other) => return Err(wrong_kind("execute", CallableKind::Command, other)),
        None => return Err("missing `payload.execute`".into()),
    };
    let handler = optional_handler(payload)?;
    let cooldown = match payload.get("cooldown") {
        None | Some(ModuleValue::Null) => None,
        Some(ModuleValue::Number(n)) => match n.as_u64() {
            Some(secs) => Some(Cooldown::Seconds(secs)),
            None => {
                return Err(format!(
                    "`payload.cooldown` must be a non-negative whole number of seconds, got {n}"
                ));
            },
        },
        Some(ModuleValue::Callable(Callable::Cooldown(f))) => Some(Cooldown::Custom(f.clone())),
        Some(ModuleValue::Callable(other)) => {
            return Err(wrong_kind("cooldown", CallableKind::Cooldown, other));
        },
        Some(other) => {
            return Err(format!(
                "`payload.cooldown` must be seconds or a cooldown action, got {}",
                other.type_name()
            ));
        },
    };

    Ok(CommandDescriptor {
        data,
        handler,
        cooldown,
        execute,
        origin,
    })
}

/// The callable under `key`, if any. Plain data there is an error.
fn callable<'a>(payload: &'a ModuleValue, key: &str) -> Check<Option<&'a Callable>> {
    match payload.get(key) {
        None => Ok(None),
        Some(ModuleValue::Callable(c)) => Ok(Some(c)),
        Some(other) => Err(format!(
            "`payload.{key}` must be an action reference, got {}",
            other.type_name()
        )),
    }
}

fn wrong_kind(key: &str, expected: CallableKind, found: &Callable) -> String {
    format!(
        "`payload.{key}` is a {}, expected {expected}",
        found.kind()
    )
}

fn optional_handler(payload: &ModuleValue) -> Check<Option<HandlerFn>> {
    if matches!(payload.get("handler"), Some(ModuleValue::Null)) {
        return Ok(None);
    }
    match callable(payload, "handler")? {
        None => Ok(None),
        Some(Callable::Handler(f)) => Ok(Some(f.clone())),
        Some(other) => Err(wrong_kind("handler", CallableKind::Handler, other)),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn entry(value: ModuleValue) -> NormalizedEntry {
        NormalizedEntry {
            path: "./mod.json".into(),
            index: 3,
            value,
        }
    }

    fn event_exec() -> ModuleValue {
        Callable::event(|_| async { Ok(()) }).into()
    }

    fn command_exec() -> ModuleValue {
        Callable::command(|_| async { Ok(()) }).into()
    }

    fn command(extra: Vec<(&str, ModuleValue)>) -> ModuleValue {
        let mut payload = vec![
            ("data", ModuleValue::from(json!({"name": "ping"}))),
            ("execute", command_exec()),
        ];
        payload.extend(extra);
        ModuleValue::object([
            ("tag", "command".into()),
            ("payload", ModuleValue::object(payload)),
        ])
    }

    #[test]
    fn accepts_a_minimal_event() {
        let value = ModuleValue::object([
            ("tag", "event".into()),
            (
                "payload",
                ModuleValue::object([
                    ("name", "ready".into()),
                    ("once", true.into()),
                    ("execute", event_exec()),
                ]),
            ),
        ]);
        let ModuleDescriptor::Event(event) = validate(entry(value)).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.name, "ready");
        assert!(event.once);
        assert!(event.handler.is_none());
        assert_eq!(event.origin.index, 3);
    }

    #[test]
    fn accepts_a_command_with_handler_and_cooldown() {
        let value = command(vec![
            ("handler", Callable::handler(|v| Some(v.clone())).into()),
            ("cooldown", 5u64.into()),
        ]);
        let ModuleDescriptor::Command(cmd) = validate(entry(value)).unwrap() else {
            panic!("expected command");
        };
        assert_eq!(cmd.name(), "ping");
        assert!(cmd.handler.is_some());
        assert!(matches!(cmd.cooldown, Some(Cooldown::Seconds(5))));
    }

    #[test]
    fn accepts_a_custom_cooldown() {
        let value = command(vec![("cooldown", Callable::cooldown(|_| true).into())]);
        let ModuleDescriptor::Command(cmd) = validate(entry(value)).unwrap() else {
            panic!("expected command");
        };
        assert!(matches!(cmd.cooldown, Some(Cooldown::Custom(_))));
    }

    #[rstest]
    #[case::not_an_object(ModuleValue::from("ping"), "expected an object")]
    #[case::missing_tag(ModuleValue::object([("payload", ModuleValue::Object(Default::default()))]), "missing `tag`")]
    #[case::unknown_tag(
        ModuleValue::object([("tag", "task".into()), ("payload", ModuleValue::Object(Default::default()))]),
        "unknown tag 'task'"
    )]
    #[case::missing_payload(ModuleValue::object([("tag", "event".into())]), "missing `payload`")]
    #[case::event_without_execute(
        ModuleValue::object([
            ("tag", "event".into()),
            ("payload", ModuleValue::object([("name", "ready".into()), ("once", false.into())])),
        ]),
        "missing `payload.execute`"
    )]
    #[case::event_without_once(
        ModuleValue::object([
            ("tag", "event".into()),
            ("payload", ModuleValue::object([("name", "ready".into()), ("execute", event_exec())])),
        ]),
        "missing `payload.once`"
    )]
    #[case::event_with_command_executor(
        ModuleValue::object([
            ("tag", "event".into()),
            ("payload", ModuleValue::object([
                ("name", "ready".into()),
                ("once", true.into()),
                ("execute", command_exec()),
            ])),
        ]),
        "`payload.execute` is a command executor, expected event executor"
    )]
    #[case::command_without_data(
        ModuleValue::object([
            ("tag", "command".into()),
            ("payload", ModuleValue::object([("execute", command_exec())])),
        ]),
        "missing `payload.data`"
    )]
    #[case::fractional_cooldown(
        command(vec![("cooldown", ModuleValue::from(json!(1.5)))]),
        "non-negative whole number"
    )]
    #[case::handler_not_callable(command(vec![("handler", "x".into())]), "`payload.handler` must be an action reference")]
    fn rejects_malformed_candidates(#[case] value: ModuleValue, #[case] expected: &str) {
        let failure = validate(entry(value)).unwrap_err();
        assert_eq!(failure.path, "./mod.json");
        assert_eq!(failure.index, 3);
        assert!(
            failure.reason.contains(expected),
            "reason `{}` does not contain `{expected}`",
            failure.reason
        );
    }

    #[test]
    fn callable_inside_data_is_rejected() {
        let value = ModuleValue::object([
            ("tag", "command".into()),
            (
                "payload",
                ModuleValue::object([
                    (
                        "data",
                        ModuleValue::object([("name", "ping".into()), ("options", command_exec())]),
                    ),
                    ("execute", command_exec()),
                ]),
            ),
        ]);
        let failure = validate(entry(value)).unwrap_err();
        assert!(failure.reason.contains("options"), "{}", failure.reason);
    }
}
