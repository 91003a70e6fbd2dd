//! Function table exposed to templates
//!
//! The table is static: every name maps to the kind of helper behind it and
//! `install` registers the whole set into a MiniJinja environment. Names
//! keep their Helm spelling (`toYaml`, `fromJsonArray`, ...) so charts can
//! be ported without renaming calls.
//!
//! `include`, `tpl`, `required` and `lookup` are late-bound: they need the
//! render context, so only inert stand-ins are installed here. A host
//! replaces them by calling `Environment::add_function` with the same name
//! after `install`.

use minijinja::{Environment, Error, Value};
use phf::phf_map;

use crate::bridge;
use crate::filter;

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Kind of helper registered under a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// YAML/JSON/TOML conversion
    Bridge,
    /// Key/value predicate filter
    Filter,
    /// Placeholder replaced by the host at render time
    LateBound,
}

static FUNCTIONS: phf::Map<&'static str, FunctionKind> = phf_map! {
    "toToml" => FunctionKind::Bridge,
    "toYaml" => FunctionKind::Bridge,
    "fromYaml" => FunctionKind::Bridge,
    "fromYamlArray" => FunctionKind::Bridge,
    "fromYamlDocument" => FunctionKind::Bridge,
    "toJson" => FunctionKind::Bridge,
    "fromJson" => FunctionKind::Bridge,
    "fromJsonArray" => FunctionKind::Bridge,
    "filter" => FunctionKind::Filter,
    "mustFilter" => FunctionKind::Filter,
    "include" => FunctionKind::LateBound,
    "tpl" => FunctionKind::LateBound,
    "required" => FunctionKind::LateBound,
    "lookup" => FunctionKind::LateBound,
};

/// All function names in the table
pub fn names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.keys().copied()
}

/// Kind of the function registered under `name`
pub fn kind(name: &str) -> Option<FunctionKind> {
    FUNCTIONS.get(name).copied()
}

/// Whether `name` is a placeholder the host must replace
pub fn is_late_bound(name: &str) -> bool {
    kind(name) == Some(FunctionKind::LateBound)
}

/// Register every function, placeholders included
pub fn install(env: &mut Environment<'_>) {
    install_core(env);
    install_placeholders(env);
}

/// Register the conversion and filter functions only
pub fn install_core(env: &mut Environment<'_>) {
    env.add_function("toToml", bridge::to_toml);
    env.add_function("toYaml", bridge::to_yaml);
    env.add_function("fromYaml", bridge::from_yaml);
    env.add_function("fromYamlArray", bridge::from_yaml_array);
    env.add_function("fromYamlDocument", bridge::from_yaml_document);
    env.add_function("toJson", bridge::to_json);
    env.add_function("fromJson", bridge::from_json);
    env.add_function("fromJsonArray", bridge::from_json_array);
    env.add_function("filter", filter::filter_fn);
    env.add_function("mustFilter", filter::must_filter_fn);
}

/// Register the late-bound placeholders
pub fn install_placeholders(env: &mut Environment<'_>) {
    env.add_function("include", include);
    env.add_function("tpl", tpl);
    env.add_function("required", required);
    env.add_function("lookup", lookup);
}

/// Suggest table names close to an unknown function name
pub fn suggest_function(name: &str) -> Option<String> {
    let mut matches: Vec<(usize, &str)> = names()
        .map(|candidate| (strsim::levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance > 0 && *distance <= MAX_SUGGESTION_DISTANCE)
        .collect();

    if matches.is_empty() {
        return None;
    }

    matches.sort();
    let suggestions: Vec<String> = matches
        .iter()
        .take(3)
        .map(|(_, candidate)| format!("`{}`", candidate))
        .collect();
    Some(format!("Did you mean {}?", suggestions.join(" or ")))
}

// ============ Late-bound placeholders ============

fn include(_name: String, _data: Value) -> String {
    "not implemented".to_string()
}

fn tpl(_template: String, _data: Value) -> Value {
    Value::from("not implemented")
}

fn required(_message: String, _value: Value) -> Result<Value, Error> {
    Ok(Value::from("not implemented"))
}

/// Without a cluster connection every lookup finds nothing
fn lookup(_api_version: String, _kind: String, _namespace: String, _name: String) -> Value {
    Value::from_serialize(serde_json::json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed() -> Environment<'static> {
        let mut env = Environment::new();
        install(&mut env);
        env
    }

    #[test]
    fn test_every_name_is_installed() {
        let env = installed();
        for name in names() {
            let template = format!("{{{{ {} is defined }}}}", name);
            assert_eq!(env.render_str(&template, ()).unwrap(), "true", "{}", name);
        }
    }

    #[test]
    fn test_core_only() {
        let mut env = Environment::new();
        install_core(&mut env);
        assert_eq!(env.render_str("{{ toYaml is defined }}", ()).unwrap(), "true");
        assert_eq!(env.render_str("{{ include is defined }}", ()).unwrap(), "false");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(kind("toToml"), Some(FunctionKind::Bridge));
        assert_eq!(kind("mustFilter"), Some(FunctionKind::Filter));
        assert_eq!(kind("nope"), None);
        assert!(is_late_bound("lookup"));
        assert!(!is_late_bound("fromJson"));
        assert_eq!(names().filter(|n| is_late_bound(n)).count(), 4);
        assert_eq!(names().count(), 14);
    }

    #[test]
    fn test_placeholders() {
        let env = installed();
        assert_eq!(
            env.render_str(r#"{{ include("helper", {}) }}"#, ()).unwrap(),
            "not implemented"
        );
        assert_eq!(
            env.render_str(r#"{{ tpl("name: x", {}) }}"#, ()).unwrap(),
            "not implemented"
        );
        assert_eq!(
            env.render_str(r#"{{ required("msg", none) }}"#, ()).unwrap(),
            "not implemented"
        );
        assert_eq!(
            env.render_str(
                r#"{{ lookup("v1", "Secret", "default", "s") | length }}"#,
                ()
            )
            .unwrap(),
            "0"
        );
    }

    #[test]
    fn test_placeholder_override() {
        let mut env = installed();
        env.add_function("include", |name: String, _data: Value| format!("<{}>", name));
        assert_eq!(
            env.render_str(r#"{{ include("helper", {}) }}"#, ()).unwrap(),
            "<helper>"
        );
    }

    #[test]
    fn test_suggest_function() {
        let suggestion = suggest_function("fromYml").unwrap();
        assert!(suggestion.contains("`fromYaml`"));
        assert!(suggest_function("somethingElseEntirely").is_none());
    }
}
