//! Template variable extraction over the prompt macro language
//!
//! Chains independent regex passes over one template string: `{% for %}` and
//! `{% set %}` bind loop-local names first, then `{% if/elif %}` conditions
//! and `{{ }}` expressions contribute external references. Parsing is
//! best-effort: malformed constructs are skipped, never errors.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `{% for item in expr %}` / `{% for key, value in expr %}`
static FOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*for\s+(\w+)(?:\s*,\s*(\w+))?\s+in\s+(.+?)\s*%\}").unwrap());

/// `{% set name = expr %}`
static SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*set\s+(\w+)\s*=\s*(.+?)\s*%\}").unwrap());

/// `{% if expr %}` / `{% elif expr %}`
static COND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%\s*(?:if|elif)\s+(.+?)\s*%\}").unwrap());

/// `{{ expr }}`
static EXPR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap());

/// Any `{% ... %}` construct (for rename/existence scans)
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{%.*?%\}").unwrap());

/// Dotted-path identifier: `cast.inactive`, `user`, `npc.stats.hp`
static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*").unwrap());

/// Quoted string literals inside expressions
static STRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());

/// Literal keywords excluded from condition extraction
const CONDITION_KEYWORDS: &[&str] = &[
    "true", "false", "none", "null", "and", "or", "not", "in", "is",
];

/// Function-like names excluded from expression extraction
const CALLABLE_KEYWORDS: &[&str] = &["range", "dict", "list", "tuple", "set"];

/// Reserved dotted-path heads owned by the runtime, never agents
const SYSTEM_HEADS: &[&str] = &["turn", "cast", "session", "flow", "card"];

fn path_head(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Drop everything after the first pipe filter: `score | default(0)` → `score`
fn strip_filters(expr: &str) -> &str {
    expr.split('|').next().unwrap_or(expr).trim()
}

fn is_condition_keyword(path: &str) -> bool {
    CONDITION_KEYWORDS
        .iter()
        .any(|k| path.eq_ignore_ascii_case(k))
}

fn note(path: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    if seen.insert(path.to_string()) {
        out.push(path.to_string());
    }
}

/// Extract the ordered-unique set of external variable references from a
/// template. Loop-local names bound by `{% for %}` and `{% set %}` are
/// excluded; dotted paths are preserved (`cast.inactive`, not `cast`).
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut locals: HashSet<String> = HashSet::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    // Pass 1: for-loops bind their targets; the iterated collection is
    // itself a variable usage.
    for cap in FOR_RE.captures_iter(template) {
        locals.insert(cap[1].to_string());
        if let Some(value_var) = cap.get(2) {
            locals.insert(value_var.as_str().to_string());
        }
        let expr = strip_filters(&cap[3]);
        if let Some(path) = PATH_RE.find(expr) {
            let head = path_head(path.as_str());
            if !locals.contains(head) && !CALLABLE_KEYWORDS.contains(&head) {
                note(path.as_str(), &mut seen, &mut out);
            }
        }
    }

    // Pass 2: set-statements extract their right-hand side, then bind the
    // target for the remainder of the template (scope is not block-limited).
    for cap in SET_RE.captures_iter(template) {
        let rhs = strip_filters(&cap[2]);
        let rhs = STRING_RE.replace_all(rhs, " ");
        for path in PATH_RE.find_iter(&rhs) {
            let head = path_head(path.as_str());
            if locals.contains(head)
                || is_condition_keyword(path.as_str())
                || CALLABLE_KEYWORDS.contains(&head)
            {
                continue;
            }
            note(path.as_str(), &mut seen, &mut out);
        }
        locals.insert(cap[1].to_string());
    }

    // Pass 3: conditions
    for cap in COND_RE.captures_iter(template) {
        let cond = STRING_RE.replace_all(&cap[1], " ");
        for path in PATH_RE.find_iter(&cond) {
            if locals.contains(path_head(path.as_str())) || is_condition_keyword(path.as_str()) {
                continue;
            }
            note(path.as_str(), &mut seen, &mut out);
        }
    }

    // Pass 4: expressions. "history" expressions are reserved for the
    // runtime and skipped wholesale.
    for cap in EXPR_RE.captures_iter(template) {
        let raw = &cap[1];
        if raw.contains("history") {
            continue;
        }
        let expr = strip_filters(raw);
        let expr = STRING_RE.replace_all(expr, " ");
        for path in PATH_RE.find_iter(&expr) {
            let head = path_head(path.as_str());
            if locals.contains(head) || CALLABLE_KEYWORDS.contains(&head) {
                continue;
            }
            note(path.as_str(), &mut seen, &mut out);
        }
    }

    out
}

/// Project extracted references onto agent names.
///
/// With a known set, a reference counts as an agent when its dotted-path
/// head is in the set. Without one, every head that is not a reserved
/// system head is a candidate agent.
pub fn extract_agent_variables(
    template: &str,
    known_agents: Option<&HashSet<String>>,
) -> BTreeSet<String> {
    let mut agents = BTreeSet::new();
    for path in extract_variables(template) {
        let head = path_head(&path);
        let is_agent = match known_agents {
            Some(known) => known.contains(head),
            None => !SYSTEM_HEADS.contains(&head),
        };
        if is_agent {
            agents.insert(head.to_string());
        }
    }
    agents
}

/// Rewrite every reference to `old` as a dotted-path head into `new`:
/// `{{old}}` and `{{old.x}}` expression forms (whitespace tolerated), and
/// `old.` heads inside `{% %}` constructs. Longer identifiers that merely
/// contain `old` are untouched.
pub fn replace_agent_references(template: &str, old: &str, new: &str) -> String {
    let esc = regex::escape(old);

    let expr_head = Regex::new(&format!(r"(?P<open>\{{\{{\s*){esc}\.")).unwrap();
    let expr_exact = Regex::new(&format!(r"(?P<open>\{{\{{\s*){esc}(?P<close>\s*\}}\}})")).unwrap();
    let tag_head = Regex::new(&format!(r"(?P<pre>^|[^A-Za-z0-9_.]){esc}\.")).unwrap();

    let result = expr_head.replace_all(template, |caps: &Captures| {
        format!("{}{}.", &caps["open"], new)
    });
    let result = expr_exact.replace_all(&result, |caps: &Captures| {
        format!("{}{}{}", &caps["open"], new, &caps["close"])
    });
    let result = TAG_RE.replace_all(&result, |caps: &Captures| {
        tag_head
            .replace_all(&caps[0], |c: &Captures| format!("{}{}.", &c["pre"], new))
            .into_owned()
    });

    result.into_owned()
}

/// True iff the template references `name` as `{{name}}`, `{{name.`, or as
/// a dotted-path head inside any `{% %}` construct.
pub fn has_agent_references(template: &str, name: &str) -> bool {
    let esc = regex::escape(name);

    let expr = Regex::new(&format!(r"\{{\{{\s*{esc}\s*(\.|\}}\}})")).unwrap();
    if expr.is_match(template) {
        return true;
    }

    let tag_head = Regex::new(&format!(r"(^|[^A-Za-z0-9_.]){esc}\.")).unwrap();
    TAG_RE
        .find_iter(template)
        .any(|m| tag_head.is_match(m.as_str()))
}

/// Normalized identifier form of an agent name, usable as a dotted-path
/// head: lowercase, runs of other characters collapsed to `_`.
pub fn sanitize_agent_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}
