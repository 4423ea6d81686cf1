use cadop_core::format::Envelope;
use std::collections::HashSet;

/// Keeps only the requested keys (case-insensitive) in each result object.
pub fn filter_fields(mut results: Vec<serde_json::Value>, fields: &[String]) -> Vec<serde_json::Value> {
    if fields.is_empty() {
        return results;
    }
    let want: HashSet<String> = fields.iter().map(|s| s.to_lowercase()).collect();
    for r in results.iter_mut() {
        if let Some(obj) = r.as_object_mut() {
            obj.retain(|k, _| want.contains(&k.to_lowercase()));
        }
    }
    results
}

pub fn restrict_envelope(envelope: Envelope, fields: &[String]) -> Envelope {
    match envelope {
        Envelope::Results { results } => Envelope::Results {
            results: filter_fields(results, fields),
        },
        other => other,
    }
}

pub fn render(envelope: &Envelope, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(envelope)
    } else {
        serde_json::to_string_pretty(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_requested_fields_only() {
        let results = vec![json!({"Razao_Social": "ALPHA", "UF": "SP", "relevance": 21})];
        let out = filter_fields(results, &["razao_social".to_string(), "RELEVANCE".to_string()]);
        assert_eq!(out, vec![json!({"Razao_Social": "ALPHA", "relevance": 21})]);
    }

    #[test]
    fn no_fields_means_everything() {
        let results = vec![json!({"a": 1, "b": 2})];
        assert_eq!(filter_fields(results.clone(), &[]), results);
    }

    #[test]
    fn errors_pass_through() {
        let env = restrict_envelope(Envelope::error("boom"), &["a".to_string()]);
        assert_eq!(render(&env, true).unwrap(), r#"{"error":"boom"}"#);
    }
}
