//! URL templating from the direct model.
//!
//! A data source URL may contain `%term` placeholders. The term map names,
//! for each term, a dotted path into the direct model; the value found there
//! is percent-encoded and substituted.

use std::collections::BTreeMap;

use serde_json::Value;

/// Resolve `%term` placeholders in `template`.
///
/// Terms absent from the model (or `null`) substitute an empty string.
/// Longer terms are substituted first so `%id` never clobbers `%idx`.
pub fn resolve_url(template: &str, term_map: &BTreeMap<String, String>, direct_model: Option<&Value>) -> String {
    if term_map.is_empty() {
        return template.to_string();
    }

    let mut terms: Vec<(&String, &String)> = term_map.iter().collect();
    terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut url = template.to_string();
    for (term, path) in terms {
        let placeholder = format!("%{}", term);
        if !url.contains(&placeholder) {
            continue;
        }
        let value = direct_model
            .and_then(|model| lookup(model, path))
            .map(render)
            .unwrap_or_default();
        url = url.replace(&placeholder, &urlencoding::encode(&value));
    }
    url
}

fn lookup<'a>(model: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(model, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
