// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

//! Variable rules and activation script rendering.
//!
//! Rules are processed in declaration order. `set` replaces any value
//! accumulated so far for a variable; `prepend`/`append` accumulate path
//! segments around it. Earlier-declared prepends end up at the front of
//! the final value, the inherited (or set) value sits in the middle, and
//! appends follow in declaration order, so first-match-wins search
//! variables behave as declared.
//!
//! Rendering never spawns a process; the output is a flat, ordered
//! sequence of `export` statements plus the optional hook body, consumed
//! by a shell via `source`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Platform path-list separator used when a rule gives none.
pub const DEFAULT_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Set a variable outright, discarding any prior value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SetEnv {
    pub set: String,
    pub value: String,
}

/// Prepend a segment to a path-list variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrependEnv {
    pub prepend: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Append a segment to a path-list variable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppendEnv {
    pub append: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Emit a comment line into the activation script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommentEnv {
    pub comment: String,
}

/// A single environment variable rule from the description document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EnvOp {
    Set(SetEnv),
    Prepend(PrependEnv),
    Append(AppendEnv),
    Comment(CommentEnv),
}

/// The middle of a composed variable value.
enum Base {
    /// Reference the variable's current value (`${VAR}`).
    Inherit,
    /// A literal value established by a `set` rule.
    Literal(String),
}

struct VarState {
    base: Base,
    prepends: Vec<String>,
    appends: Vec<String>,
    separator: String,
}

impl VarState {
    fn new() -> Self {
        Self {
            base: Base::Inherit,
            prepends: Vec::new(),
            appends: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Render variable rules and an optional hook into an activation script.
///
/// `artifact_paths` maps closure package names to their materialized
/// store paths, resolving `${pkg:NAME}` references in rule values.
/// Output is deterministic: variables are emitted in first-declaration
/// order, comments first, the hook last.
pub fn render_script(
    ops: &[EnvOp],
    artifact_paths: &BTreeMap<String, PathBuf>,
    hook: Option<&str>,
) -> crate::Result<String> {
    let mut order: Vec<String> = Vec::new();
    let mut vars: HashMap<String, VarState> = HashMap::new();
    let mut comments: Vec<String> = Vec::new();

    for op in ops {
        match op {
            EnvOp::Comment(c) => comments.push(c.comment.clone()),
            EnvOp::Set(s) => {
                let value = expand_value(&s.value, &s.set, artifact_paths)?;
                let state = var_state(&mut order, &mut vars, &s.set);
                state.base = Base::Literal(value);
                state.prepends.clear();
                state.appends.clear();
            }
            EnvOp::Prepend(p) => {
                let value = expand_value(&p.value, &p.prepend, artifact_paths)?;
                let state = var_state(&mut order, &mut vars, &p.prepend);
                if let Some(sep) = &p.separator {
                    state.separator = sep.clone();
                }
                state.prepends.push(value);
            }
            EnvOp::Append(a) => {
                let value = expand_value(&a.value, &a.append, artifact_paths)?;
                let state = var_state(&mut order, &mut vars, &a.append);
                if let Some(sep) = &a.separator {
                    state.separator = sep.clone();
                }
                state.appends.push(value);
            }
        }
    }

    let mut script = String::new();
    for comment in &comments {
        script.push_str("# ");
        script.push_str(comment);
        script.push('\n');
    }

    for name in &order {
        let state = &vars[name];
        let mut parts: Vec<String> = Vec::new();
        parts.extend(state.prepends.iter().map(|s| escape(s)));
        match &state.base {
            Base::Literal(value) => parts.push(escape(value)),
            // Inherited values only appear when segments accumulate
            // around them; a bare inherit would be a no-op assignment.
            Base::Inherit => parts.push(format!("${{{name}}}")),
        }
        parts.extend(state.appends.iter().map(|s| escape(s)));
        let value = parts.join(&state.separator);
        script.push_str(&format!("export {name}=\"{value}\"\n"));
    }

    if let Some(hook) = hook {
        if !script.is_empty() {
            script.push('\n');
        }
        script.push_str(hook);
        if !hook.ends_with('\n') {
            script.push('\n');
        }
    }

    Ok(script)
}

fn var_state<'a>(
    order: &mut Vec<String>,
    vars: &'a mut HashMap<String, VarState>,
    name: &str,
) -> &'a mut VarState {
    if !vars.contains_key(name) {
        order.push(name.to_string());
    }
    vars.entry(name.to_string()).or_insert_with(VarState::new)
}

/// Expand `${pkg:NAME}` references against the closure's artifact paths.
fn expand_value(
    value: &str,
    variable: &str,
    artifact_paths: &BTreeMap<String, PathBuf>,
) -> crate::Result<String> {
    const OPEN: &str = "${pkg:";

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let end = after.find('}').ok_or_else(|| {
            crate::Error::ValidationFailed(format!(
                "Unterminated package reference in value '{value}' for '{variable}'"
            ))
        })?;
        let name = &after[..end];
        let path = artifact_paths
            .get(name)
            .ok_or_else(|| crate::Error::UnresolvedReference {
                variable: variable.to_string(),
                package: name.to_string(),
            })?;
        out.push_str(&path.to_string_lossy());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Escape a literal for interpolation inside a double-quoted shell string.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '"' | '$' | '`' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
