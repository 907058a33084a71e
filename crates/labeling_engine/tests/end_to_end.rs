use std::sync::Arc;

use labeling_core::{ImageClass, WorkflowState};
use labeling_engine::{
    image_id, EngineConfig, EngineHandle, HttpClassificationSink, RapidApiImageSource,
    SinkSettings, SourceSettings,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn session_searches_and_confirms_over_http() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Search/ImageSearchAPI"))
        .and(query_param("q", "tabby"))
        .and(query_param("pageNumber", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { "url": "https://img.example.com/1.jpg" },
                { "url": "https://img.example.com/2.jpg" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/image-classes/4/images"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let source = RapidApiImageSource::new(SourceSettings {
        base_url: server.uri(),
        ..SourceSettings::default()
    })
    .expect("source");
    let sink = HttpClassificationSink::new(SinkSettings {
        base_url: server.uri(),
        ..SinkSettings::default()
    })
    .expect("sink");
    let class = ImageClass::new(4, "tabby cats");
    let handle = EngineHandle::spawn(
        class.clone(),
        Arc::new(source),
        Arc::new(sink),
        EngineConfig::default(),
    );

    handle.start_search("tabby").await.expect("open");
    let first = handle.current_item().expect("first image");
    assert_eq!(first.id, image_id("https://img.example.com/1.jpg"));

    let state = handle.confirm(class).await.expect("open");
    assert!(matches!(state, WorkflowState::Ready { cursor: 1, .. }));
    assert_eq!(
        handle.current_item().map(|image| image.url),
        Some("https://img.example.com/2.jpg".to_string())
    );
}
