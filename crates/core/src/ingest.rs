use crate::{IngestError, Post, SourceError};
use serde_json::Value;

/// Validates a `fetch-posts` payload: a JSON array whose elements are objects carrying a
/// string `content` field. Anything else is rejected before it can reach the chunker.
pub fn parse_posts(payload: Value) -> Result<Vec<Post>, SourceError> {
    let items = match payload {
        Value::Array(items) => items,
        other => {
            return Err(SourceError::MalformedSourceData(format!(
                "expected a JSON array of posts, got {}",
                kind_of(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let Some(object) = item.as_object() else {
                return Err(SourceError::MalformedSourceData(format!(
                    "post {position} is {}, not an object",
                    kind_of(&item)
                )));
            };
            match object.get("content") {
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(SourceError::MalformedSourceData(format!(
                        "post {position} has a {} `content` field",
                        kind_of(other)
                    )))
                }
                None => {
                    return Err(SourceError::MalformedSourceData(format!(
                        "post {position} has no `content` field"
                    )))
                }
            }
            serde_json::from_value(item).map_err(|error| {
                SourceError::MalformedSourceData(format!("post {position}: {error}"))
            })
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Joins every post's content with a single space, in source order.
pub fn assemble_corpus(posts: &[Post]) -> Result<String, IngestError> {
    let corpus = posts
        .iter()
        .map(|post| post.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    if corpus.trim().is_empty() {
        return Err(IngestError::EmptyCorpus);
    }
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::{assemble_corpus, parse_posts};
    use crate::{IngestError, Post, SourceError};
    use serde_json::json;

    #[test]
    fn well_formed_payload_keeps_extra_fields() -> Result<(), SourceError> {
        let posts = parse_posts(json!([
            {"id": 7, "title": "Spring", "link": "https://example.org/spring", "content": "Plant early."},
            {"content": "Water often."}
        ]))?;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title.as_deref(), Some("Spring"));
        assert_eq!(posts[1].content, "Water often.");
        Ok(())
    }

    #[test]
    fn non_array_payload_is_malformed() {
        let result = parse_posts(json!({"content": "not wrapped"}));
        assert!(matches!(result, Err(SourceError::MalformedSourceData(_))));
    }

    #[test]
    fn missing_or_mistyped_content_is_malformed() {
        for payload in [
            json!([{"content": "ok"}, {"title": "no body"}]),
            json!([{"content": 42}]),
            json!(["just a string"]),
        ] {
            match parse_posts(payload) {
                Err(SourceError::MalformedSourceData(details)) => {
                    assert!(details.starts_with("post "), "{details}")
                }
                other => panic!("expected malformed data, got {other:?}"),
            }
        }
    }

    #[test]
    fn corpus_is_space_joined() -> Result<(), IngestError> {
        let posts = vec![Post::from_content("First."), Post::from_content("Second.")];
        assert_eq!(assemble_corpus(&posts)?, "First. Second.");
        Ok(())
    }

    #[test]
    fn blank_posts_make_an_empty_corpus() {
        let posts = vec![Post::from_content(""), Post::from_content("  \n")];
        assert!(matches!(assemble_corpus(&posts), Err(IngestError::EmptyCorpus)));
        assert!(matches!(assemble_corpus(&[]), Err(IngestError::EmptyCorpus)));
    }
}
