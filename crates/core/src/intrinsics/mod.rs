//! Intrinsic reference resolution.
//!
//! Extracts the logical names a property subtree points at through:
//! - `{"Ref": "Name"}`
//! - `{"Fn::GetAtt": ["Name", "Attr"]}` (or `"Name.Attr"`); the attribute is dropped
//! - `${Name}` / `${Name.Attr}` placeholders inside `Fn::Sub` templates
//!
//! Plain strings outside `Fn::Sub` are literals and are not scanned; callers
//! that know a string embeds a document use `resolve_interpolations`.
//!
//! Resolution is syntactic only. Conditions are not evaluated and references
//! are not followed, so the same subtree always yields the same result.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Reserved names that look like references but never denote a resource.
pub const PSEUDO_PARAMETERS: &[&str] = &[
    "AWS::AccountId",
    "AWS::NotificationARNs",
    "AWS::NoValue",
    "AWS::Partition",
    "AWS::Region",
    "AWS::StackId",
    "AWS::StackName",
    "AWS::URLSuffix",
];

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^${}]*)\}").expect("placeholder pattern is valid"));

static LOGICAL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("logical name pattern is valid"));

pub fn is_pseudo_parameter(name: &str) -> bool {
    PSEUDO_PARAMETERS.contains(&name) || name.starts_with("AWS::")
}

/// A reference construct that partially matched but whose name could not be
/// isolated. The construct is skipped; callers log these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceWarning {
    #[error("`Ref` argument is not a name: {found}")]
    MalformedRef { found: String },

    #[error("`Fn::GetAtt` argument has no resource name: {found}")]
    MalformedGetAtt { found: String },

    #[error("`Fn::Sub` argument is neither a string nor [string, variables]: {found}")]
    MalformedSub { found: String },

    #[error("placeholder `${{{placeholder}}}` does not name a resource")]
    InvalidPlaceholder { placeholder: String },

    #[error("unterminated `${{` placeholder in: {text}")]
    UnterminatedPlaceholder { text: String },
}

/// Names found in a subtree plus any constructs that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub names: BTreeSet<String>,
    pub warnings: Vec<ReferenceWarning>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fold another resolution into this one.
    pub fn extend(&mut self, other: Resolution) {
        self.names.extend(other.names);
        self.warnings.extend(other.warnings);
    }
}

/// Resolve every reference in `value`, recursing through objects and arrays.
pub fn resolve(value: &Value) -> Resolution {
    resolve_scoped(value, &BTreeSet::new())
}

/// Like `resolve`, but names in `locals` are bound variables and never reported.
pub fn resolve_scoped(value: &Value, locals: &BTreeSet<String>) -> Resolution {
    let mut out = Resolution::default();
    walk(value, locals, &mut out);
    out
}

/// Apply only the interpolation pattern to a raw string.
///
/// Used for embedded documents (such as a state-machine definition string)
/// where `${...}` is the only way a reference can be spelled. Names in `locals`
/// are variables bound elsewhere and are not reported.
pub fn resolve_interpolations(text: &str, locals: &BTreeSet<String>) -> Resolution {
    let mut out = Resolution::default();
    interpolate(text, locals, &mut out);
    out
}

/// First name in the resolution, for properties that hold exactly one reference.
pub fn resolve_single(value: &Value) -> Option<String> {
    resolve(value).names.into_iter().next()
}

fn walk(value: &Value, locals: &BTreeSet<String>, out: &mut Resolution) {
    match value {
        Value::Object(map) if map.len() == 1 => {
            let Some((key, arg)) = map.iter().next() else {
                return;
            };
            match key.as_str() {
                "Ref" => resolve_ref(arg, out),
                "Fn::GetAtt" => resolve_get_att(arg, locals, out),
                "Fn::Sub" => resolve_sub(arg, locals, out),
                _ => walk(arg, locals, out),
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                walk(child, locals, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, locals, out);
            }
        }
        Value::String(_) | Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn resolve_ref(arg: &Value, out: &mut Resolution) {
    match arg.as_str() {
        Some(name) if is_pseudo_parameter(name) => {}
        Some(name) if !name.is_empty() => {
            out.names.insert(name.to_string());
        }
        _ => out.warnings.push(ReferenceWarning::MalformedRef { found: arg.to_string() }),
    }
}

fn resolve_get_att(arg: &Value, locals: &BTreeSet<String>, out: &mut Resolution) {
    let name = match arg {
        Value::Array(parts) => {
            // The attribute part may itself be an intrinsic (`{"Ref": ...}`).
            for part in parts.iter().skip(1) {
                walk(part, locals, out);
            }
            parts.first().and_then(Value::as_str)
        }
        Value::String(dotted) => dotted.split('.').next(),
        _ => None,
    };

    match name {
        Some(name) if !name.is_empty() => {
            out.names.insert(name.to_string());
        }
        _ => out.warnings.push(ReferenceWarning::MalformedGetAtt { found: arg.to_string() }),
    }
}

fn resolve_sub(arg: &Value, locals: &BTreeSet<String>, out: &mut Resolution) {
    match arg {
        Value::String(text) => interpolate(text, locals, out),
        Value::Array(parts) => match (parts.first(), parts.get(1)) {
            (Some(Value::String(text)), None) => interpolate(text, locals, out),
            (Some(Value::String(text)), Some(Value::Object(vars))) => {
                for bound in vars.values() {
                    walk(bound, locals, out);
                }
                let mut scoped = locals.clone();
                scoped.extend(vars.keys().cloned());
                interpolate(text, &scoped, out);
            }
            _ => out.warnings.push(ReferenceWarning::MalformedSub { found: arg.to_string() }),
        },
        _ => out.warnings.push(ReferenceWarning::MalformedSub { found: arg.to_string() }),
    }
}

/// Scan `${...}` placeholders, reporting any that do not isolate a name.
fn interpolate(text: &str, locals: &BTreeSet<String>, out: &mut Resolution) {
    if !text.contains("${") {
        return;
    }

    // Text between placeholders; an opener left in any of it is unterminated.
    let mut unterminated = false;
    let mut last_end = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        unterminated |= text[last_end..whole.start()].contains("${");
        last_end = whole.end();
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

        // `${!Literal}` is an escaped literal.
        if inner.starts_with('!') || is_pseudo_parameter(inner) {
            continue;
        }

        let name = inner.split('.').next().unwrap_or_default();
        if LOGICAL_NAME.is_match(name) {
            if !locals.contains(name) {
                out.names.insert(name.to_string());
            }
        } else {
            out.warnings
                .push(ReferenceWarning::InvalidPlaceholder { placeholder: inner.to_string() });
        }
    }

    if unterminated || text[last_end..].contains("${") {
        out.warnings.push(ReferenceWarning::UnterminatedPlaceholder { text: text.to_string() });
    }
}
