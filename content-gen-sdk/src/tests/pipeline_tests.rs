//! End-to-end tests of the generation pipeline
//!
//! The generation endpoint is a scripted fake and the video lookup a mockall
//! mock, so every run is deterministic.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::join_all;
    use mockall::predicate::eq;
    use serde_json::json;

    use crate::config::PipelineConfig;
    use crate::core::MockVideoLookup;
    use crate::error::{PipelineError, ServiceError, ValidationError, VerificationError};
    use crate::pipeline::prompt::example_shape;
    use crate::pipeline::verify::VideoVerifier;
    use crate::pipeline::{
        params, CancellationFlag, ContentSuggestionService, ContentType, GenerationOutcome, ValidatedContent,
    };
    use crate::services::youtube::VideoMetadata;
    use crate::tests::ScriptedClient;

    fn metadata(id: &str, views: u64) -> VideoMetadata {
        VideoMetadata {
            id: id.to_string(),
            title: format!("Authoritative title of {}", id),
            channel_title: "Algorithms Channel".to_string(),
            published_at: None,
            thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)),
            view_count: views,
            like_count: Some(1_000),
            duration: Some("0:04:26".to_string()),
        }
    }

    /// Lookup that knows exactly one video
    fn lookup_knowing(known_id: &'static str, views: u64) -> MockVideoLookup {
        let mut lookup = MockVideoLookup::new();
        lookup.expect_lookup_video().returning(move |id| {
            if id == known_id {
                Ok(Some(metadata(id, views)))
            } else {
                Ok(None)
            }
        });
        lookup
    }

    fn video_answer(id: &str) -> String {
        json!({"title": "Graph Traversal", "youtubeId": id, "duration": "0:10:00", "category": "Tutorial"})
            .to_string()
    }

    fn service_with_lookup(client: Arc<ScriptedClient>, lookup: MockVideoLookup) -> ContentSuggestionService {
        let verifier = VideoVerifier::new(Arc::new(lookup)).unwrap();
        ContentSuggestionService::new(client).with_verifier(Arc::new(verifier))
    }

    #[tokio::test]
    async fn test_first_attempt_success_for_every_content_type() {
        for content_type in ContentType::ALL {
            let client = Arc::new(ScriptedClient::new([example_shape(content_type).to_string()]));
            let service = service_with_lookup(client.clone(), lookup_knowing("dQw4w9WgXcQ", 5_000_000));

            let outcome = service
                .generate(content_type, params([("topic", "anything")]))
                .await
                .unwrap();

            assert!(outcome.is_success(), "{} failed: {:?}", content_type, outcome.reason());
            assert_eq!(outcome.attempts(), 1);
            assert_eq!(client.calls(), 1);
            assert_eq!(outcome.content().unwrap().content_type(), content_type);
        }
    }

    #[tokio::test]
    async fn test_graph_traversal_scenario() {
        let answer = "```json\n{\"title\": \"Graph Traversal\", \"youtubeId\": \"dQw4w9WgXcQ\", \
                      \"duration\": \"4:26\", \"category\": \"Unknown\",}\n```";
        let client = Arc::new(ScriptedClient::new([answer]));

        let mut lookup = MockVideoLookup::new();
        lookup
            .expect_lookup_video()
            .with(eq("dQw4w9WgXcQ"))
            .times(1)
            .returning(|id| Ok(Some(metadata(id, 2_500_000))));
        let service = service_with_lookup(client.clone(), lookup);

        let outcome = service
            .generate(ContentType::Video, params([("topic", "graph traversal")]))
            .await
            .unwrap();

        assert_eq!(outcome.attempts(), 1);
        let video = outcome.content().unwrap().as_verified_video().unwrap();
        assert_eq!(video.suggestion.duration, "0:04:26");
        assert_eq!(video.suggestion.category, "Other");
        assert_eq!(video.metadata.view_count, 2_500_000);
        assert!(client.prompts()[0].contains("graph traversal"));
    }

    #[tokio::test]
    async fn test_not_found_twice_then_success() {
        let client = Arc::new(ScriptedClient::new([
            video_answer("aaaaaaaaaaa"),
            video_answer("bbbbbbbbbbb"),
            video_answer("ccccccccccc"),
        ]));
        let service = service_with_lookup(client.clone(), lookup_knowing("ccccccccccc", 300_000));

        let outcome = service
            .generate(ContentType::Video, params([("topic", "dynamic programming")]))
            .await
            .unwrap();

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(client.calls(), 3);
        let video = outcome.content().unwrap().as_verified_video().unwrap();
        assert_eq!(video.suggestion.youtube_id, "ccccccccccc");
        assert_eq!(video.metadata.title, "Authoritative title of ccccccccccc");
    }

    #[tokio::test]
    async fn test_low_quality_is_retried() {
        let client = Arc::new(ScriptedClient::new([video_answer("aaaaaaaaaaa")]));
        let service = service_with_lookup(client.clone(), lookup_knowing("aaaaaaaaaaa", 42));

        let outcome = service
            .generate(ContentType::Video, params([("topic", "sorting")]))
            .await
            .unwrap();

        assert!(!outcome.is_success());
        assert_eq!(client.calls(), 3);
        assert!(matches!(
            outcome.error(),
            Some(PipelineError::Verification(VerificationError::LowQuality { views: 42, .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_field_every_attempt() {
        let client = Arc::new(ScriptedClient::new([r#"{"summary": "no title, no content"}"#]));
        let service = ContentSuggestionService::new(client.clone());

        let outcome = service
            .generate(ContentType::Lesson, params([("topic", "iterators")]))
            .await
            .unwrap();

        assert_eq!(client.calls(), service.max_attempts());
        assert_eq!(outcome.attempts(), 3);
        assert!(matches!(
            outcome.error(),
            Some(PipelineError::Validation(ValidationError::MissingField(ref f))) if f == "title"
        ));

        // every attempt resends the identical prompt
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p == &prompts[0]));

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("title"));
        assert_eq!(value["attempts"], 3);
    }

    #[tokio::test]
    async fn test_recovers_from_prose_and_upstream_errors() {
        let client = Arc::new(ScriptedClient::with_results([
            Err(ServiceError::rate_limit("slow down")),
            Ok("I can't do that.".to_string()),
            Ok(format!(
                "Here is your project idea:\n{}\nGood luck!",
                json!({"title": "Chat server", "description": "Async chat", "technologies": ["tokio"]})
            )),
        ]));
        let service = ContentSuggestionService::new(client.clone());

        let outcome = service
            .suggest_project(params([("topic", "networking")]))
            .await
            .unwrap();

        assert_eq!(outcome.attempts(), 3);
        let content = outcome.content().unwrap().as_validated().unwrap();
        let ValidatedContent::Project(project) = content else {
            panic!("expected a project, got {:?}", content);
        };
        assert_eq!(project.technologies, vec!["tokio".to_string()]);
        assert_eq!(project.category, "Other");
    }

    #[tokio::test]
    async fn test_configuration_errors_happen_before_any_call() {
        let client = Arc::new(ScriptedClient::new([example_shape(ContentType::Video).to_string()]));
        let service = ContentSuggestionService::new(client.clone());

        let err = service.generate(ContentType::Video, params([("topic", " ")])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let err = service
            .generate_named("podcast", params([("topic", "rust")]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_named() {
        let client = Arc::new(ScriptedClient::new([example_shape(ContentType::Roadmap).to_string()]));
        let service = ContentSuggestionService::new(client);

        let outcome = service
            .generate_named("Roadmap", params([("topic", "rust"), ("step_count", "4")]))
            .await
            .unwrap();
        assert_eq!(outcome.content().unwrap().content_type(), ContentType::Roadmap);
    }

    #[tokio::test]
    async fn test_cancelled_run_sends_nothing() {
        let client = Arc::new(ScriptedClient::new([example_shape(ContentType::Lesson).to_string()]));
        let service = ContentSuggestionService::new(client.clone());
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let outcome = service
            .generate_with_cancellation(ContentType::Lesson, params([("topic", "macros")]), &cancel)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            GenerationOutcome::Failure {
                error: PipelineError::Cancelled,
                attempts: 0
            }
        ));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_configured_attempt_budget() {
        let client = Arc::new(ScriptedClient::new(["not json at all"]));
        let config = PipelineConfig {
            max_attempts: 5,
            ..PipelineConfig::default()
        };
        let service = ContentSuggestionService::with_config(client.clone(), &config);

        let outcome = service
            .generate(ContentType::Lesson, params([("topic", "unsafe")]))
            .await
            .unwrap();

        assert_eq!(outcome.attempts(), 5);
        assert_eq!(client.calls(), 5);
        assert!(matches!(outcome.error(), Some(PipelineError::Normalization(_))));
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_independent() {
        let client = Arc::new(ScriptedClient::new([example_shape(ContentType::Lesson).to_string()]));
        let service = ContentSuggestionService::new(client.clone());

        let runs = (0..8).map(|i| {
            let topic = format!("topic {}", i);
            let service = &service;
            async move { service.generate(ContentType::Lesson, params([("topic", topic)])).await }
        });
        let outcomes = join_all(runs).await;

        assert_eq!(client.calls(), 8);
        for outcome in outcomes {
            let outcome = outcome.unwrap();
            assert!(outcome.is_success());
            assert_eq!(outcome.attempts(), 1);
        }
    }

    #[tokio::test]
    async fn test_verified_outcome_serialization() {
        let client = Arc::new(ScriptedClient::new([video_answer("dQw4w9WgXcQ")]));
        let service = service_with_lookup(client, lookup_knowing("dQw4w9WgXcQ", 1_000_000));
        assert!(service.has_verifier(ContentType::Video));
        assert!(!service.has_verifier(ContentType::Lesson));

        let outcome = service
            .suggest_video(params([("topic", "graphs")]))
            .await
            .unwrap();
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["attempts"], 1);
        assert_eq!(value["data"]["type"], "video");
        assert_eq!(value["data"]["youtubeId"], "dQw4w9WgXcQ");
        assert_eq!(value["data"]["metadata"]["viewCount"], 1_000_000);
    }
}
