//! Schema validation of model candidates
//!
//! One validator, one schema per `ContentType`. Required data that is missing
//! rejects the candidate; presentation-only data (durations, categories,
//! optional text) degrades gracefully and every repair is recorded as a
//! `Coercion`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::ContentType;
use crate::error::{PipelineError, ValidationError};

pub const VIDEO_CATEGORIES: &[&str] = &[
    "Tutorial",
    "Lecture",
    "Conference Talk",
    "Walkthrough",
    "Overview",
    "Other",
];

pub const PROJECT_CATEGORIES: &[&str] = &["Web", "Systems", "Data", "Tooling", "Mobile", "Game", "Other"];

pub const DIFFICULTIES: &[&str] = &["Beginner", "Intermediate", "Advanced"];

pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_DIFFICULTY: &str = "Beginner";
pub const ZERO_DURATION: &str = "0:00:00";

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid id regex"));

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,6}(?::\d{1,2}){0,2}$").expect("valid duration regex"));

/// `H:MM:SS` for a number of seconds
pub fn format_duration(total_seconds: u64) -> String {
    format!(
        "{}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// Canonicalize `SS`, `MM:SS` or `HH:MM:SS` to `H:MM:SS`.
///
/// Total: anything else becomes `0:00:00`.
pub fn canonicalize_duration(value: &str) -> String {
    let value = value.trim();
    if !DURATION.is_match(value) {
        return ZERO_DURATION.to_string();
    }

    let total = value
        .split(':')
        .try_fold(0u64, |acc, part| part.parse::<u64>().ok().map(|n| acc * 60 + n));

    match total {
        Some(seconds) => format_duration(seconds),
        None => ZERO_DURATION.to_string(),
    }
}

pub fn is_valid_youtube_id(value: &str) -> bool {
    YOUTUBE_ID.is_match(value)
}

/// A graceful repair applied to a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coercion {
    DefaultedField { field: String },
    CanonicalizedDuration { field: String, from: String, to: String },
    CategoryCoerced { field: String, from: String, to: String },
    ScalarLifted { field: String },
    DroppedResource { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSuggestion {
    pub title: String,
    pub youtube_id: String,
    pub description: String,
    pub duration: String,
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapResource {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapStep {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub resources: Vec<RoadmapResource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapSuggestion {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub steps: Vec<RoadmapStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSuggestion {
    pub title: String,
    pub summary: String,
    /// Markdown; rendered downstream, never here
    pub content: String,
    pub difficulty: String,
    pub duration: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSuggestion {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub category: String,
    pub difficulty: String,
    pub features: Vec<String>,
}

/// A candidate that passed its content type's schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValidatedContent {
    Video(VideoSuggestion),
    Roadmap(RoadmapSuggestion),
    Lesson(LessonSuggestion),
    Project(ProjectSuggestion),
}

impl ValidatedContent {
    pub fn content_type(&self) -> ContentType {
        match self {
            ValidatedContent::Video(_) => ContentType::Video,
            ValidatedContent::Roadmap(_) => ContentType::Roadmap,
            ValidatedContent::Lesson(_) => ContentType::Lesson,
            ValidatedContent::Project(_) => ContentType::Project,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ValidatedContent::Video(v) => &v.title,
            ValidatedContent::Roadmap(r) => &r.title,
            ValidatedContent::Lesson(l) => &l.title,
            ValidatedContent::Project(p) => &p.title,
        }
    }
}

/// Validation result together with the repairs that were needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub content: ValidatedContent,
    pub coercions: Vec<Coercion>,
}

/// Reads fields of one JSON object, recording coercions under a path prefix
struct FieldReader<'a, 'c> {
    object: &'a Map<String, Value>,
    prefix: String,
    coercions: &'c mut Vec<Coercion>,
}

impl<'a, 'c> FieldReader<'a, 'c> {
    fn new(object: &'a Map<String, Value>, prefix: impl Into<String>, coercions: &'c mut Vec<Coercion>) -> Self {
        Self {
            object,
            prefix: prefix.into(),
            coercions,
        }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    /// Present, non-null, non-blank string
    fn required_string(&self, key: &str) -> Result<String, ValidationError> {
        match self.object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            _ => Err(ValidationError::MissingField(self.path(key))),
        }
    }

    fn optional_string(&mut self, key: &str) -> String {
        match self.object.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => {
                self.coercions.push(Coercion::DefaultedField { field: self.path(key) });
                String::new()
            }
        }
    }

    fn duration(&mut self, key: &str) -> String {
        let raw = match self.object.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => {
                let canonical = n.as_u64().map(format_duration).unwrap_or_else(|| ZERO_DURATION.to_string());
                self.coercions.push(Coercion::CanonicalizedDuration {
                    field: self.path(key),
                    from: n.to_string(),
                    to: canonical.clone(),
                });
                return canonical;
            }
            _ => {
                self.coercions.push(Coercion::DefaultedField { field: self.path(key) });
                return ZERO_DURATION.to_string();
            }
        };

        let canonical = canonicalize_duration(&raw);
        if canonical != raw {
            self.coercions.push(Coercion::CanonicalizedDuration {
                field: self.path(key),
                from: raw,
                to: canonical.clone(),
            });
        }
        canonical
    }

    /// Case-insensitive match against a closed list; anything else is `default`
    fn enumerated(&mut self, key: &str, allowed: &[&str], default: &str) -> String {
        let raw = match self.object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                self.coercions.push(Coercion::DefaultedField { field: self.path(key) });
                return default.to_string();
            }
        };

        let canonical = allowed
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(&raw))
            .copied()
            .unwrap_or(default);

        if canonical != raw {
            self.coercions.push(Coercion::CategoryCoerced {
                field: self.path(key),
                from: raw,
                to: canonical.to_string(),
            });
        }
        canonical.to_string()
    }

    fn string_list(&mut self, key: &str, required: bool) -> Result<Vec<String>, ValidationError> {
        let items: Vec<String> = match self.object.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => {
                self.coercions.push(Coercion::ScalarLifted { field: self.path(key) });
                vec![s.trim().to_string()]
            }
            Some(Value::Number(n)) => {
                self.coercions.push(Coercion::ScalarLifted { field: self.path(key) });
                vec![n.to_string()]
            }
            Some(Value::Null) | None if !required => {
                self.coercions.push(Coercion::DefaultedField { field: self.path(key) });
                Vec::new()
            }
            _ => Vec::new(),
        };

        if required && items.is_empty() {
            return Err(ValidationError::MissingField(self.path(key)));
        }
        Ok(items)
    }

    /// Array of objects; a single object is lifted into a one-element array
    fn object_list(&mut self, key: &str, required: bool) -> Result<Vec<&'a Map<String, Value>>, ValidationError> {
        let items: Vec<&'a Map<String, Value>> = match self.object.get(key) {
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_object).collect(),
            Some(Value::Object(single)) => {
                self.coercions.push(Coercion::ScalarLifted { field: self.path(key) });
                vec![single]
            }
            Some(Value::Null) | None if !required => {
                self.coercions.push(Coercion::DefaultedField { field: self.path(key) });
                Vec::new()
            }
            _ => Vec::new(),
        };

        if required && items.is_empty() {
            return Err(ValidationError::MissingField(self.path(key)));
        }
        Ok(items)
    }
}

/// Validates candidates of every content type
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Parse `json_text` and check it against the schema of `content_type`
    pub fn validate(&self, content_type: ContentType, json_text: &str) -> Result<Validated, PipelineError> {
        let value: Value =
            serde_json::from_str(json_text).map_err(|e| ValidationError::Parse(e.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::Parse("expected a JSON object".to_string()))?;

        let mut coercions = Vec::new();
        let content = match content_type {
            ContentType::Video => ValidatedContent::Video(validate_video(object, &mut coercions)?),
            ContentType::Roadmap => ValidatedContent::Roadmap(validate_roadmap(object, &mut coercions)?),
            ContentType::Lesson => ValidatedContent::Lesson(validate_lesson(object, &mut coercions)?),
            ContentType::Project => ValidatedContent::Project(validate_project(object, &mut coercions)?),
        };

        Ok(Validated { content, coercions })
    }
}

fn validate_video(object: &Map<String, Value>, coercions: &mut Vec<Coercion>) -> Result<VideoSuggestion, ValidationError> {
    let mut fields = FieldReader::new(object, "", coercions);

    let title = fields.required_string("title")?;
    let youtube_id = fields.required_string("youtubeId")?;
    if !is_valid_youtube_id(&youtube_id) {
        return Err(ValidationError::InvalidIdentifier {
            field: "youtubeId".to_string(),
            value: youtube_id,
        });
    }

    Ok(VideoSuggestion {
        title,
        youtube_id,
        description: fields.optional_string("description"),
        duration: fields.duration("duration"),
        category: fields.enumerated("category", VIDEO_CATEGORIES, DEFAULT_CATEGORY),
        tags: fields.string_list("tags", false)?,
    })
}

fn validate_roadmap(
    object: &Map<String, Value>,
    coercions: &mut Vec<Coercion>,
) -> Result<RoadmapSuggestion, ValidationError> {
    let mut fields = FieldReader::new(object, "", coercions);

    let title = fields.required_string("title")?;
    let raw_steps = fields.object_list("steps", true)?;
    let description = fields.optional_string("description");
    let difficulty = fields.enumerated("difficulty", DIFFICULTIES, DEFAULT_DIFFICULTY);

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw_step) in raw_steps.into_iter().enumerate() {
        steps.push(validate_step(raw_step, index, coercions)?);
    }

    Ok(RoadmapSuggestion {
        title,
        description,
        difficulty,
        steps,
    })
}

fn validate_step(
    object: &Map<String, Value>,
    index: usize,
    coercions: &mut Vec<Coercion>,
) -> Result<RoadmapStep, ValidationError> {
    let prefix = format!("steps[{}]", index);
    let mut fields = FieldReader::new(object, prefix.clone(), coercions);

    let title = fields.required_string("title")?;
    let description = fields.optional_string("description");
    let duration = fields.duration("duration");
    let raw_resources = fields.object_list("resources", false)?;

    let mut resources = Vec::with_capacity(raw_resources.len());
    for (i, raw) in raw_resources.into_iter().enumerate() {
        match resource(raw) {
            Some(res) => resources.push(res),
            None => coercions.push(Coercion::DroppedResource {
                field: format!("{}.resources[{}]", prefix, i),
            }),
        }
    }

    Ok(RoadmapStep {
        title,
        description,
        duration,
        resources,
    })
}

/// A resource needs a title and an absolute http(s) URL
fn resource(object: &Map<String, Value>) -> Option<RoadmapResource> {
    let title = object.get("title")?.as_str()?.trim();
    let url = object.get("url")?.as_str()?.trim();

    let parsed = Url::parse(url).ok()?;
    if title.is_empty() || !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }

    Some(RoadmapResource {
        title: title.to_string(),
        url: url.to_string(),
    })
}

fn validate_lesson(
    object: &Map<String, Value>,
    coercions: &mut Vec<Coercion>,
) -> Result<LessonSuggestion, ValidationError> {
    let mut fields = FieldReader::new(object, "", coercions);

    let title = fields.required_string("title")?;
    let content = fields.required_string("content")?;

    Ok(LessonSuggestion {
        title,
        content,
        summary: fields.optional_string("summary"),
        difficulty: fields.enumerated("difficulty", DIFFICULTIES, DEFAULT_DIFFICULTY),
        duration: fields.duration("duration"),
        tags: fields.string_list("tags", false)?,
    })
}

fn validate_project(
    object: &Map<String, Value>,
    coercions: &mut Vec<Coercion>,
) -> Result<ProjectSuggestion, ValidationError> {
    let mut fields = FieldReader::new(object, "", coercions);

    let title = fields.required_string("title")?;
    let description = fields.required_string("description")?;
    let technologies = fields.string_list("technologies", true)?;

    Ok(ProjectSuggestion {
        title,
        description,
        technologies,
        category: fields.enumerated("category", PROJECT_CATEGORIES, DEFAULT_CATEGORY),
        difficulty: fields.enumerated("difficulty", DIFFICULTIES, DEFAULT_DIFFICULTY),
        features: fields.string_list("features", false)?,
    })
}
