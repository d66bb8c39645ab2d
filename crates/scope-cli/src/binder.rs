//! Binding command-line values onto scopes
//!
//! Two routes lead into the registry:
//!
//! - `--set SCOPE.KEY=VALUE` assignments, split at the last dot.
//! - Per-key flags (`--svc.port 8080`, `--root.threads 4`) generated from
//!   every scope's tracked, locally defined keys and parsed with a typed clap
//!   command.
//!
//! Both require the key to exist on the addressed scope. A bare `KEY`
//! addresses the root scope; there is no search across scopes.

use std::ffi::OsString;

use clap::builder::{BoolishValueParser, PossibleValue, PossibleValuesParser, ValueParser};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use scope_core::{ROOT_NAME, Registry, Scalar, ValueKind};

use crate::error::{CliError, Result};

/// One `SCOPE.KEY=VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub scope: String,
    pub key: String,
    pub value: String,
}

impl Assignment {
    pub fn parse(text: &str) -> Result<Self> {
        let Some((target, value)) = text.split_once('=') else {
            return Err(CliError::user(format!(
                "Invalid assignment '{text}': expected SCOPE.KEY=VALUE"
            )));
        };
        let (scope, key) = split_target(target);
        if key.is_empty() || scope.is_empty() {
            return Err(CliError::user(format!(
                "Invalid assignment '{text}': missing scope or key"
            )));
        }
        Ok(Self {
            scope: scope.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Update the addressed key.
    pub fn apply(&self, registry: &Registry) -> Result<()> {
        bind(registry, &self.scope, &self.key, Scalar::Text(self.value.clone()))
    }
}

fn split_target(target: &str) -> (&str, &str) {
    match target.rsplit_once('.') {
        Some((scope, key)) => (scope, key),
        None => (ROOT_NAME, target),
    }
}

fn bind(registry: &Registry, scope: &str, key: &str, raw: Scalar) -> Result<()> {
    let node = registry.get(scope).ok_or_else(|| scope_core::Error::KeyNotFound {
        scope: scope.to_string(),
        key: key.to_string(),
    })?;
    tracing::debug!(scope, key, %raw, "Binding command-line value");
    node.update([(key, raw)])?;
    Ok(())
}

/// Apply `--set` assignments in order.
pub fn apply_assignments(registry: &Registry, assignments: &[String]) -> Result<()> {
    for text in assignments {
        Assignment::parse(text)?.apply(registry)?;
    }
    Ok(())
}

/// A command-line flag generated for one scope key.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagSpec {
    /// Flag name without dashes, always `scope.key`
    pub flag: String,
    pub scope: String,
    pub key: String,
    pub kind: ValueKind,
    pub default: Option<Scalar>,
}

/// Flags for every tracked, locally defined key, ordered by flag name.
///
/// Two keys mapping to the same flag name is an error.
pub fn flag_specs(registry: &Registry) -> Result<Vec<FlagSpec>> {
    let mut specs: Vec<FlagSpec> = registry
        .scopes()
        .iter()
        .flat_map(|node| {
            let scope = node.name().to_string();
            node.tracked_items().into_iter().map(move |(key, value)| FlagSpec {
                flag: format!("{scope}.{key}"),
                scope: scope.clone(),
                key,
                kind: value.kind().clone(),
                default: value.raw().cloned(),
            })
        })
        .collect();
    specs.sort_by(|a, b| a.flag.cmp(&b.flag));
    check_unique(&specs)?;
    Ok(specs)
}

fn check_unique(specs: &[FlagSpec]) -> Result<()> {
    match specs.windows(2).find(|pair| pair[0].flag == pair[1].flag) {
        Some(pair) => Err(CliError::user(format!(
            "Flag --{} is generated by both {}:{} and {}:{}",
            pair[0].flag, pair[0].scope, pair[0].key, pair[1].scope, pair[1].key
        ))),
        None => Ok(()),
    }
}

fn parser_for(kind: &ValueKind) -> ValueParser {
    match kind {
        ValueKind::Integer => value_parser!(i64).into(),
        ValueKind::Float => value_parser!(f64).into(),
        ValueKind::Boolean => BoolishValueParser::new().into(),
        ValueKind::Category { choices } => {
            PossibleValuesParser::new(choices.iter().map(|c| PossibleValue::new(c.clone()))).into()
        }
        ValueKind::Text | ValueKind::PathTemplate { .. } => ValueParser::string(),
    }
}

/// A clap command accepting one `--flag VALUE` per spec.
pub fn command(specs: &[FlagSpec]) -> Command {
    specs.iter().fold(
        Command::new("overrides").no_binary_name(true),
        |cmd, spec| {
            let help = match &spec.default {
                Some(default) => format!("{} (default: {default})", spec.kind),
                None => spec.kind.to_string(),
            };
            cmd.arg(
                Arg::new(spec.flag.clone())
                    .long(spec.flag.clone())
                    .value_name(spec.kind.name().to_uppercase())
                    .help(help)
                    .action(ArgAction::Set)
                    .value_parser(parser_for(&spec.kind)),
            )
        },
    )
}

/// Parse generated flags and bind every one that was given.
pub fn apply_flags<I, T>(registry: &Registry, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let specs = flag_specs(registry)?;
    let matches = command(&specs).try_get_matches_from(args)?;
    bind_matches(registry, &specs, &matches)
}

fn bind_matches(registry: &Registry, specs: &[FlagSpec], matches: &ArgMatches) -> Result<()> {
    for spec in specs {
        let Some(raw) = matches.get_raw(&spec.flag).and_then(|mut values| values.next_back()) else {
            continue;
        };
        let raw = Scalar::Text(raw.to_string_lossy().into_owned());
        bind(registry, &spec.scope, &spec.key, raw)?;
    }
    Ok(())
}

/// Split process arguments at the first `--` into CLI arguments and
/// generated-flag overrides.
pub fn split_overrides<I: IntoIterator<Item = OsString>>(args: I) -> (Vec<OsString>, Vec<OsString>) {
    let mut cli = Vec::new();
    let mut overrides = Vec::new();
    let mut seen_separator = false;
    for arg in args {
        if seen_separator {
            overrides.push(arg);
        } else if arg == "--" {
            seen_separator = true;
        } else {
            cli.push(arg);
        }
    }
    (cli, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scope_core::Value;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry
            .get_or_create_with(
                "svc",
                [
                    ("port", Value::from(80)),
                    ("host", Value::from("localhost")),
                    ("debug", Value::from(false)),
                    ("level", Value::category("info", ["info", "debug"]).unwrap()),
                    ("token", Value::from("secret").untracked()),
                ],
            )
            .unwrap();
        registry
            .get_or_create_with("root", [("threads", 4)])
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            Assignment::parse("svc.api.path=/v1=x").unwrap(),
            Assignment {
                scope: "svc.api".into(),
                key: "path".into(),
                value: "/v1=x".into()
            }
        );
        let bare = Assignment::parse("threads=8").unwrap();
        assert_eq!(bare.scope, "root");
        assert_eq!(bare.key, "threads");
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(Assignment::parse("svc.port").is_err());
        assert!(Assignment::parse("svc.=1").is_err());
        assert!(Assignment::parse(".port=1").is_err());
    }

    #[test]
    fn test_apply_assignments() {
        let registry = registry();
        apply_assignments(&registry, &["svc.port=8080".into(), "threads=2".into()]).unwrap();
        let svc = registry.get("svc").unwrap();
        assert_eq!(svc.resolved_lookup("port").unwrap(), Scalar::Integer(8080));
        assert_eq!(svc.resolved_lookup("threads").unwrap(), Scalar::Integer(2));
    }

    #[test]
    fn test_assignment_to_unknown_scope_is_key_not_found() {
        let registry = registry();
        let err = apply_assignments(&registry, &["nowhere.port=1".into()]).unwrap_err();
        assert!(matches!(err, CliError::Core(e) if e.is_key_not_found()));
        assert!(registry.get("nowhere").is_none());
    }

    #[test]
    fn test_flag_specs_cover_tracked_keys() {
        let specs = flag_specs(&registry()).unwrap();
        let flags: Vec<&str> = specs.iter().map(|s| s.flag.as_str()).collect();
        assert_eq!(
            flags,
            vec!["root.threads", "svc.debug", "svc.host", "svc.level", "svc.port"]
        );
    }

    #[test]
    fn test_apply_typed_flags() {
        let registry = registry();
        apply_flags(
            &registry,
            ["--svc.port", "9000", "--svc.debug", "yes", "--svc.level", "debug"],
        )
        .unwrap();
        let svc = registry.get("svc").unwrap();
        assert_eq!(svc.resolved_lookup("port").unwrap(), Scalar::Integer(9000));
        assert_eq!(svc.resolved_lookup("debug").unwrap(), Scalar::Boolean(true));
        assert_eq!(svc.resolved_lookup("level").unwrap(), Scalar::from("debug"));
        assert_eq!(svc.resolved_lookup("host").unwrap(), Scalar::from("localhost"));
    }

    #[test]
    fn test_root_flag_is_qualified() {
        let registry = registry();
        apply_flags(&registry, ["--root.threads", "16"]).unwrap();
        assert_eq!(
            registry.root().resolved_lookup("threads").unwrap(),
            Scalar::Integer(16)
        );
        assert!(apply_flags(&registry, ["--threads", "16"]).is_err());
    }

    #[test]
    fn test_typed_flags_reject_bad_values() {
        let registry = registry();
        assert!(apply_flags(&registry, ["--svc.port", "many"]).is_err());
        assert!(apply_flags(&registry, ["--svc.level", "trace"]).is_err());
        assert!(apply_flags(&registry, ["--svc.token", "x"]).is_err());
    }

    #[test]
    fn test_duplicate_flag_names_are_user_errors() {
        let spec = |scope: &str, key: &str| FlagSpec {
            flag: "a.b.c".into(),
            scope: scope.into(),
            key: key.into(),
            kind: ValueKind::Integer,
            default: Some(Scalar::Integer(1)),
        };
        let err = check_unique(&[spec("a", "b.c"), spec("a.b", "c")]).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
        assert!(err.to_string().contains("--a.b.c"));
    }

    #[test]
    fn test_dotted_keys_cannot_shadow_flags() {
        let registry = Registry::new();
        registry.get_or_create_with("a.b", [("c", 2)]).unwrap();
        assert!(registry.get_or_create_with("a", [("b.c", 1)]).is_err());

        apply_flags(&registry, ["--a.b.c", "5"]).unwrap();
        assert_eq!(
            registry.get("a.b").unwrap().resolved_lookup("c").unwrap(),
            Scalar::Integer(5)
        );
    }

    #[test]
    fn test_split_overrides() {
        let args = ["scopes", "list", "--", "--svc.port", "1"].map(OsString::from);
        let (cli, overrides) = split_overrides(args);
        assert_eq!(cli, vec![OsString::from("scopes"), OsString::from("list")]);
        assert_eq!(overrides, vec![OsString::from("--svc.port"), OsString::from("1")]);
    }
}
