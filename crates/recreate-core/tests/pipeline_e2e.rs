use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use recreate_core::{
    ApiConfig, ImageRef, Pipeline, PipelineEvent, RecreateError, RequestSpec, RunOutcome, Stage,
};
use serde_json::json;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image-preview:generateContent";

fn config_for(server: &MockServer) -> ApiConfig {
    ApiConfig::new("test-key").with_endpoint(format!("{}{}", server.uri(), GENERATE_PATH))
}

/// A 10KB stand-in JPEG plus an output path inside the same temp dir.
fn fixture(refs: usize) -> (TempDir, RequestSpec, PathBuf) {
    let dir = tempdir().unwrap();
    let primary = dir.path().join("input.jpg");
    fs::write(&primary, vec![0xD8u8; 10 * 1024]).unwrap();
    let references = (0..refs)
        .map(|i| {
            let p = dir.path().join(format!("ref{}.jpg", i));
            fs::write(&p, b"reference bytes").unwrap();
            ImageRef::jpeg(p)
        })
        .collect();
    let spec =
        RequestSpec::new("Enhance quality", ImageRef::jpeg(primary)).with_references(references);
    let output = dir.path().join("out.jpg");
    (dir, spec, output)
}

fn success_body(data: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "ok" },
                    { "inlineData": { "mimeType": "image/jpeg", "data": data } },
                ]
            }
        }]
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_success_writes_decoded_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Enhance quality" }] }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success_body(&STANDARD.encode(b"ABC"))),
        )
        .expect(1)
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Completed(path) => assert_eq!(path, output),
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(fs::read(&output).unwrap(), b"ABC");
}

#[tokio::test(flavor = "multi_thread")]
async fn stages_are_reported_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success_body(&STANDARD.encode(b"ABC"))),
        )
        .mount(&server).await;

    let (_dir, spec, output) = fixture(1);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output).unwrap();
    let events = run.events().clone();
    run.wait();

    let stages: Vec<Stage> = events
        .try_iter()
        .filter_map(|e| match e {
            PipelineEvent::Stage(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Encoding,
            Stage::Sending,
            Stage::AwaitingResponse,
            Stage::Extracting,
            Stage::Persisting,
            Stage::Completed,
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn http_401_is_auth_error_and_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::AuthError { status }) => assert_eq!(status, 401),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn http_500_is_http_error_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::HttpError { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("backend exploded"));
        }
        other => panic!("expected HTTP error, got {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_second_reference_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server).await;

    let (dir, mut spec, output) = fixture(2);
    spec.references[1] = ImageRef::jpeg(dir.path().join("missing.jpg"));
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::FileNotFound { path }) => {
            assert!(path.ends_with("missing.jpg"))
        }
        other => panic!("expected file-not-found, got {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_during_request_yields_cancelled_and_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body(&STANDARD.encode(b"ABC")))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    // Cancel while the request is in flight: the run notices at the next
    // stage boundary, after the response lands but before extraction.
    for event in run.events().iter() {
        if matches!(event, PipelineEvent::Stage(Stage::AwaitingResponse)) {
            run.cancel();
            break;
        }
    }

    assert!(matches!(run.wait(), RunOutcome::Cancelled));
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_image_data_is_a_write_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("")))
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::WriteError { detail, .. }) => {
            assert!(detail.contains("empty"))
        }
        other => panic!("expected write error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn text_only_response_is_no_image_part_with_body() {
    let server = MockServer::start().await;
    let body = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "I cannot recreate this image." }] }
        }]
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::NoImagePart { body }) => {
            assert!(body.contains("I cannot recreate this image."))
        }
        other => panic!("expected no-image-part, got {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_start_while_running_is_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body(&STANDARD.encode(b"ABC")))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let pipeline = Pipeline::new(config_for(&server));
    let run = pipeline.start(spec.clone(), output.clone()).unwrap();

    let err = pipeline
        .start(spec, output.with_extension("second.jpg"))
        .unwrap_err();
    assert!(matches!(err, RecreateError::Busy));

    assert!(matches!(run.wait(), RunOutcome::Completed(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_is_reported_as_network_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body(&STANDARD.encode(b"ABC")))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server).await;

    let (_dir, spec, output) = fixture(0);
    let config = config_for(&server).with_timeout(Duration::from_millis(100));
    let pipeline = Pipeline::new(config);
    let run = pipeline.start(spec, output.clone()).unwrap();

    match run.wait() {
        RunOutcome::Failed(RecreateError::NetworkError { timeout, .. }) => assert!(timeout),
        other => panic!("expected network timeout, got {:?}", other),
    }
    assert!(!output.exists());
}
