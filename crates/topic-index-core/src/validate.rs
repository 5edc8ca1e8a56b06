//! Record validator.
//!
//! Turns a [`RawTopic`] into a [`ValidatedTopic`] or a
//! [`ValidationError`] listing every violation of the first failing rule
//! category. Categories are checked in this order:
//!
//! 1. required fields (`id`, `title`, question/answer text)
//! 2. id pattern (`[a-z0-9]+(-[a-z0-9]+)*`)
//! 3. code examples have a language and a code body
//! 4. resource URLs parse as URIs
//! 5. no duplicate sub-ids within a child collection
//!
//! Validation is pure: no index state is read or written.

use std::collections::{BTreeSet, HashSet};

use sha2::{Digest, Sha256};

use crate::error::{Rule, ValidationError, Violation};
use crate::models::{
    CodeExample, Qa, RawTopic, Resource, Topic, TopicId, ValidatedTopic,
};

/// Validate and normalize a raw record.
pub fn validate(raw: &RawTopic) -> Result<ValidatedTopic, ValidationError> {
    let checks: [fn(&RawTopic) -> Vec<Violation>; 5] = [
        check_required,
        check_id_pattern,
        check_code_examples,
        check_resource_urls,
        check_sub_ids,
    ];

    for check in checks {
        let violations = check(raw);
        if !violations.is_empty() {
            return Err(ValidationError {
                topic_id: raw.id.clone(),
                violations,
            });
        }
    }

    let topic = normalize(raw);
    let content_hash = content_hash(&topic);
    Ok(ValidatedTopic {
        topic,
        content_hash,
    })
}

/// Whether `id` is lowercase alphanumeric words joined by single hyphens.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/// Trim and lower-case a facet value. Returns `None` for empty values.
pub fn normalize_facet(value: &str) -> Option<String> {
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn check_required(raw: &RawTopic) -> Vec<Violation> {
    let mut out = Vec::new();
    if is_blank(&raw.id) {
        out.push(Violation::new(Rule::Required, "id", "must not be empty"));
    }
    if is_blank(&raw.title) {
        out.push(Violation::new(Rule::Required, "title", "must not be empty"));
    }
    for (i, qa) in raw.questions.iter().enumerate() {
        if is_blank(&qa.question) {
            out.push(Violation::new(
                Rule::Required,
                format!("questions[{}].question", i),
                "must not be empty",
            ));
        }
        if is_blank(&qa.answer) {
            out.push(Violation::new(
                Rule::Required,
                format!("questions[{}].answer", i),
                "must not be empty",
            ));
        }
    }
    out
}

fn check_id_pattern(raw: &RawTopic) -> Vec<Violation> {
    let id = raw.id.as_deref().unwrap_or_default();
    if is_valid_id(id) {
        Vec::new()
    } else {
        vec![Violation::new(
            Rule::IdPattern,
            "id",
            format!("'{}' must be lowercase words separated by single hyphens", id),
        )]
    }
}

fn check_code_examples(raw: &RawTopic) -> Vec<Violation> {
    let mut out = Vec::new();
    for (i, ex) in raw.code_examples.iter().enumerate() {
        if is_blank(&ex.language) {
            out.push(Violation::new(
                Rule::CodeExample,
                format!("codeExamples[{}].language", i),
                "must not be empty",
            ));
        }
        // Code is opaque: whitespace-only still counts as empty.
        if is_blank(&ex.code) {
            out.push(Violation::new(
                Rule::CodeExample,
                format!("codeExamples[{}].code", i),
                "must not be empty",
            ));
        }
    }
    out
}

fn check_resource_urls(raw: &RawTopic) -> Vec<Violation> {
    let mut out = Vec::new();
    for (i, res) in raw.resources.iter().enumerate() {
        let path = format!("resources[{}].url", i);
        match res.url.as_deref().map(str::trim) {
            None | Some("") => out.push(Violation::new(Rule::ResourceUrl, path, "must not be empty")),
            Some(u) => {
                if let Err(e) = url::Url::parse(u) {
                    out.push(Violation::new(
                        Rule::ResourceUrl,
                        path,
                        format!("'{}' is not a valid URI: {}", u, e),
                    ));
                }
            }
        }
    }
    out
}

fn check_sub_ids(raw: &RawTopic) -> Vec<Violation> {
    let mut out = Vec::new();
    duplicate_ids(
        "codeExamples",
        raw.code_examples.iter().map(|c| c.id.as_deref()),
        &mut out,
    );
    duplicate_ids(
        "resources",
        raw.resources.iter().map(|r| r.id.as_deref()),
        &mut out,
    );
    duplicate_ids(
        "questions",
        raw.questions.iter().map(|q| q.id.as_deref()),
        &mut out,
    );
    out
}

fn duplicate_ids<'a>(
    collection: &str,
    ids: impl Iterator<Item = Option<&'a str>>,
    out: &mut Vec<Violation>,
) {
    let mut seen = HashSet::new();
    for (i, id) in ids.enumerate() {
        let Some(id) = id.map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen.insert(id) {
            out.push(Violation::new(
                Rule::DuplicateSubId,
                format!("{}[{}].id", collection, i),
                format!("duplicate id '{}'", id),
            ));
        }
    }
}

fn normalize(raw: &RawTopic) -> Topic {
    let tags: BTreeSet<String> = raw
        .tags
        .iter()
        .filter_map(|t| normalize_facet(t))
        .collect();

    Topic {
        id: TopicId::new(text(&raw.id)),
        title: text(&raw.title),
        subtitle: text(&raw.subtitle),
        summary: text(&raw.summary),
        analogy: text(&raw.analogy),
        explanation: text(&raw.explanation),
        key_points: raw
            .key_points
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        code_examples: raw
            .code_examples
            .iter()
            .map(|c| CodeExample {
                id: text(&c.id),
                title: text(&c.title),
                description: text(&c.description),
                language: c
                    .language
                    .as_deref()
                    .and_then(normalize_facet)
                    .unwrap_or_default(),
                code: c.code.clone().unwrap_or_default(),
            })
            .collect(),
        resources: raw
            .resources
            .iter()
            .map(|r| Resource {
                id: text(&r.id),
                title: text(&r.title),
                url: text(&r.url),
                description: text(&r.description),
                kind: r.kind.as_deref().and_then(normalize_facet).unwrap_or_default(),
            })
            .collect(),
        questions: raw
            .questions
            .iter()
            .map(|q| Qa {
                id: text(&q.id),
                question: text(&q.question),
                answer: text(&q.answer),
            })
            .collect(),
        category: raw
            .category
            .as_deref()
            .and_then(normalize_facet)
            .unwrap_or_default(),
        tags,
    }
}

/// SHA-256 over the topic's canonical JSON form.
pub fn content_hash(topic: &Topic) -> String {
    // Topic holds only strings, vectors and ordered sets, so serialization
    // is deterministic and cannot fail.
    let canonical = serde_json::to_vec(topic).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawCodeExample, RawQa, RawResource};

    fn raw(id: &str, title: &str) -> RawTopic {
        RawTopic {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_record_is_valid() {
        let v = validate(&raw("mutex-vs-semaphore", "Mutex vs Semaphore")).unwrap();
        assert_eq!(v.topic.id.as_str(), "mutex-vs-semaphore");
        assert_eq!(v.topic.summary, "");
        assert_eq!(v.content_hash.len(), 64);
    }

    #[test]
    fn test_missing_id_and_title_reported_together() {
        let err = validate(&RawTopic::default()).unwrap_err();
        let paths: Vec<&str> = err.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["id", "title"]);
        assert!(err.violations.iter().all(|v| v.rule == Rule::Required));
    }

    #[test]
    fn test_required_short_circuits_later_categories() {
        let mut r = raw("Bad_ID", "");
        r.code_examples.push(RawCodeExample::default());
        let err = validate(&r).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::Required));
        assert_eq!(err.violations.len(), 1);
    }

    #[test]
    fn test_id_pattern() {
        assert!(is_valid_id("hash-index"));
        assert!(is_valid_id("tcp-3way-handshake"));
        assert!(!is_valid_id("Hash-Index"));
        assert!(!is_valid_id("hash--index"));
        assert!(!is_valid_id("-hash"));
        assert!(!is_valid_id("hash_index"));
        assert!(!is_valid_id(""));

        let err = validate(&raw("Hash Index", "Hash Index")).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::IdPattern));
    }

    #[test]
    fn test_code_examples_collect_all_violations() {
        let mut r = raw("closures", "Closures");
        r.code_examples = vec![
            RawCodeExample {
                language: Some("  ".to_string()),
                code: Some("fn main() {}".to_string()),
                ..Default::default()
            },
            RawCodeExample {
                language: Some("go".to_string()),
                code: None,
                ..Default::default()
            },
        ];
        let err = validate(&r).unwrap_err();
        let paths: Vec<&str> = err.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["codeExamples[0].language", "codeExamples[1].code"]);
    }

    #[test]
    fn test_resource_url_must_parse() {
        let mut r = raw("closures", "Closures");
        r.resources = vec![
            RawResource {
                url: Some("https://doc.rust-lang.org/book/".to_string()),
                ..Default::default()
            },
            RawResource {
                url: Some("not a url".to_string()),
                ..Default::default()
            },
        ];
        let err = validate(&r).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "resources[1].url");
    }

    #[test]
    fn test_duplicate_sub_ids_within_collection() {
        let mut r = raw("closures", "Closures");
        r.questions = vec![
            RawQa {
                id: Some("q1".to_string()),
                question: Some("What?".to_string()),
                answer: Some("This.".to_string()),
            },
            RawQa {
                id: Some("q1".to_string()),
                question: Some("Why?".to_string()),
                answer: Some("Because.".to_string()),
            },
        ];
        r.resources = vec![RawResource {
            id: Some("q1".to_string()),
            url: Some("https://example.com".to_string()),
            ..Default::default()
        }];
        let err = validate(&r).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::DuplicateSubId));
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "questions[1].id");
    }

    #[test]
    fn test_empty_answer_is_required_violation() {
        let mut r = raw("closures", "Closures");
        r.questions.push(RawQa {
            question: Some("What is a closure?".to_string()),
            answer: Some(String::new()),
            ..Default::default()
        });
        let err = validate(&r).unwrap_err();
        assert_eq!(err.violations[0].path, "questions[0].answer");
    }

    #[test]
    fn test_facets_normalized_and_empty_dropped() {
        let mut r = raw("closures", "Closures");
        r.category = Some("  Languages ".to_string());
        r.tags = vec!["Rust".into(), " rust ".into(), "".into(), "  ".into()];
        r.code_examples.push(RawCodeExample {
            language: Some(" GO ".to_string()),
            code: Some("func main() {}".to_string()),
            ..Default::default()
        });
        r.resources.push(RawResource {
            url: Some("https://go.dev".to_string()),
            kind: Some(" ".to_string()),
            ..Default::default()
        });
        let t = validate(&r).unwrap().topic;
        assert_eq!(t.category, "languages");
        assert_eq!(t.tags.iter().collect::<Vec<_>>(), vec!["rust"]);
        assert_eq!(t.code_examples[0].language, "go");
        assert_eq!(t.resources[0].kind, "");
        let facets = t.facets();
        assert!(facets.contains(&("language", "go")));
        assert!(!facets.iter().any(|(k, _)| *k == "resource_type"));
    }

    #[test]
    fn test_content_hash_stable_and_content_sensitive() {
        let a = validate(&raw("closures", "Closures")).unwrap();
        let b = validate(&raw("closures", "  Closures  ")).unwrap();
        let c = validate(&raw("closures", "Closures in Rust")).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
    }
}
