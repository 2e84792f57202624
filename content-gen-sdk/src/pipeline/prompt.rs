//! Prompt templates, one per content type

use serde_json::{json, Value};

use super::schema::{DIFFICULTIES, PROJECT_CATEGORIES, VIDEO_CATEGORIES};
use super::{ContentType, Parameters};
use crate::error::PipelineError;

pub const PARAM_TOPIC: &str = "topic";
pub const PARAM_DIFFICULTY: &str = "difficulty";
pub const PARAM_CONTEXT: &str = "context";
pub const PARAM_STEP_COUNT: &str = "step_count";
pub const PARAM_TECHNOLOGIES: &str = "technologies";

/// A complete, canonical instance of the content type's JSON shape.
///
/// Embedded verbatim in the prompt; passes the validator with no coercions.
pub fn example_shape(content_type: ContentType) -> Value {
    match content_type {
        ContentType::Video => json!({
            "title": "Graph Traversal Explained: BFS and DFS",
            "youtubeId": "dQw4w9WgXcQ",
            "description": "Walks through breadth-first and depth-first search with animated examples.",
            "duration": "0:12:45",
            "category": "Tutorial",
            "tags": ["algorithms", "graphs"]
        }),
        ContentType::Roadmap => json!({
            "title": "Learning Rust",
            "description": "From first program to async services.",
            "difficulty": "Beginner",
            "steps": [
                {
                    "title": "Ownership and borrowing",
                    "description": "Understand moves, references and lifetimes.",
                    "duration": "4:00:00",
                    "resources": [
                        {"title": "The Rust Book, chapter 4", "url": "https://doc.rust-lang.org/book/ch04-00-understanding-ownership.html"},
                        {"title": "Rust by Example: Scoping", "url": "https://doc.rust-lang.org/rust-by-example/scope.html"}
                    ]
                }
            ]
        }),
        ContentType::Lesson => json!({
            "title": "Pattern Matching in Rust",
            "summary": "How match and if let destructure values.",
            "content": "# Pattern Matching\n\nUse `match` to branch on the shape of a value.",
            "difficulty": "Intermediate",
            "duration": "0:30:00",
            "tags": ["rust", "patterns"]
        }),
        ContentType::Project => json!({
            "title": "Command-line Todo Manager",
            "description": "A terminal todo list that persists tasks to a JSON file.",
            "technologies": ["Rust", "clap", "serde"],
            "category": "Tooling",
            "difficulty": "Beginner",
            "features": ["Add and complete tasks", "Filter by status"]
        }),
    }
}

/// Builds generation prompts from caller parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Compose the prompt for `content_type`.
    ///
    /// Fails with a configuration error when `topic` is missing or blank.
    pub fn build(&self, content_type: ContentType, parameters: &Parameters) -> Result<String, PipelineError> {
        let topic = parameters
            .get(PARAM_TOPIC)
            .filter(|value| !value.is_blank())
            .ok_or_else(|| {
                PipelineError::configuration(format!(
                    "missing required parameter '{}' for {} generation",
                    PARAM_TOPIC, content_type
                ))
            })?
            .to_string();

        let optional = |key: &str| {
            parameters
                .get(key)
                .filter(|value| !value.is_blank())
                .map(|value| value.to_string())
        };

        let mut lines: Vec<String> = Vec::new();
        lines.push(task_line(content_type, &topic));

        if let Some(difficulty) = optional(PARAM_DIFFICULTY) {
            lines.push(format!("Target audience level: {}.", difficulty));
        }
        if content_type == ContentType::Roadmap {
            if let Some(count) = optional(PARAM_STEP_COUNT) {
                lines.push(format!("Use exactly {} steps.", count));
            }
        }
        if content_type == ContentType::Project {
            if let Some(technologies) = optional(PARAM_TECHNOLOGIES) {
                lines.push(format!("The project must use: {}.", technologies));
            }
        }
        if let Some(context) = optional(PARAM_CONTEXT) {
            lines.push(format!("Additional context from the user: {}", context));
        }

        lines.push(String::new());
        lines.push("Guidelines:".to_string());
        lines.extend(guidelines(content_type).into_iter().map(|g| format!("- {}", g)));

        let shape = example_shape(content_type);
        let shape = serde_json::to_string_pretty(&shape).unwrap_or_else(|_| shape.to_string());

        lines.push(String::new());
        lines.push(
            "Respond with ONLY a single JSON object in exactly this shape. \
             No markdown, no code fences, no commentary before or after it:"
                .to_string(),
        );
        lines.push(shape);

        Ok(lines.join("\n"))
    }
}

fn task_line(content_type: ContentType, topic: &str) -> String {
    match content_type {
        ContentType::Video => format!("Suggest one existing YouTube video that teaches \"{}\".", topic),
        ContentType::Roadmap => format!("Create a step-by-step learning roadmap for \"{}\".", topic),
        ContentType::Lesson => format!("Write a self-contained lesson about \"{}\".", topic),
        ContentType::Project => format!("Propose a portfolio project that demonstrates \"{}\".", topic),
    }
}

fn one_of(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn guidelines(content_type: ContentType) -> Vec<String> {
    let difficulty = format!("`difficulty` must be one of: {}.", one_of(DIFFICULTIES));
    let duration = "Durations use the format H:MM:SS, for example \"0:12:45\".".to_string();

    match content_type {
        ContentType::Video => vec![
            "Only suggest a real, publicly available video; prefer videos with more than 100k views.".to_string(),
            "`youtubeId` is the 11-character id from the watch URL, not the URL itself.".to_string(),
            "Prefer videos whose thumbnail is served from YouTube's own image hosts.".to_string(),
            format!("`category` must be one of: {}.", one_of(VIDEO_CATEGORIES)),
            duration,
        ],
        ContentType::Roadmap => vec![
            "Order the steps from foundations to advanced material.".to_string(),
            "Include 2-3 resources with working URLs per step.".to_string(),
            difficulty,
            duration,
        ],
        ContentType::Lesson => vec![
            "`content` is Markdown and must stand on its own.".to_string(),
            "Escape newlines and quotes inside JSON strings.".to_string(),
            difficulty,
            duration,
        ],
        ContentType::Project => vec![
            "`technologies` lists concrete languages, frameworks or libraries.".to_string(),
            "List 3-6 features that can be built incrementally.".to_string(),
            format!("`category` must be one of: {}.", one_of(PROJECT_CATEGORIES)),
            difficulty,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{params, SchemaValidator};

    #[test]
    fn test_example_shapes_validate_without_coercions() {
        let validator = SchemaValidator::new();
        for content_type in ContentType::ALL {
            let shape = example_shape(content_type).to_string();
            let validated = validator.validate(content_type, &shape).unwrap();
            assert!(
                validated.coercions.is_empty(),
                "{} shape needed coercions: {:?}",
                content_type,
                validated.coercions
            );
            assert_eq!(validated.content.content_type(), content_type);
        }
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = PromptBuilder::new()
            .build(ContentType::Video, &params([("topic", "graph traversal")]))
            .unwrap();

        assert!(prompt.contains("graph traversal"));
        assert!(prompt.contains("ONLY a single JSON object"));
        assert!(prompt.contains("\"youtubeId\""));
        assert!(prompt.contains("100k views"));
        assert!(prompt.contains("\"Conference Talk\""));
    }

    #[test]
    fn test_roadmap_optional_parameters() {
        let parameters = params([
            ("topic", "Rust".into()),
            ("step_count", crate::pipeline::ParamValue::from(5i64)),
            ("difficulty", "Intermediate".into()),
            ("context", "I already know Go".into()),
        ]);
        let prompt = PromptBuilder::new().build(ContentType::Roadmap, &parameters).unwrap();

        assert!(prompt.contains("Use exactly 5 steps."));
        assert!(prompt.contains("Target audience level: Intermediate."));
        assert!(prompt.contains("I already know Go"));
        assert!(prompt.contains("2-3 resources with working URLs"));
    }

    #[test]
    fn test_type_specific_parameters_are_ignored_elsewhere() {
        let parameters = params([("topic", "Rust"), ("step_count", "7"), ("technologies", "axum")]);
        let prompt = PromptBuilder::new().build(ContentType::Lesson, &parameters).unwrap();
        assert!(!prompt.contains("Use exactly"));
        assert!(!prompt.contains("axum"));

        let prompt = PromptBuilder::new().build(ContentType::Project, &parameters).unwrap();
        assert!(prompt.contains("The project must use: axum."));
    }

    #[test]
    fn test_missing_topic_is_configuration_error() {
        let builder = PromptBuilder::new();
        for parameters in [params::<&str, &str, _>([]), params([("topic", "   ")]), params([("subject", "x")])] {
            let err = builder.build(ContentType::Project, &parameters).unwrap_err();
            assert!(matches!(err, PipelineError::Configuration(_)));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let parameters = params([("topic", "closures")]);
        let builder = PromptBuilder::new();
        assert_eq!(
            builder.build(ContentType::Lesson, &parameters).unwrap(),
            builder.build(ContentType::Lesson, &parameters).unwrap()
        );
    }
}
