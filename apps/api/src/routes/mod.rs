pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::intake::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Intake API
        .route(
            "/api/v1/intake/sessions",
            post(handlers::handle_start_session),
        )
        .route(
            "/api/v1/intake/sessions/:id",
            get(handlers::handle_get_session),
        )
        .route(
            "/api/v1/intake/sessions/:id/file",
            post(handlers::handle_submit_file),
        )
        .route(
            "/api/v1/intake/sessions/:id/text",
            post(handlers::handle_submit_text),
        )
        .route(
            "/api/v1/intake/sessions/:id/skip",
            post(handlers::handle_skip),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::extraction::{ContentExtractor, DOCX_MIME};
    use crate::intake::session::SessionStore;
    use crate::parser_client::tests::StubParser;

    const BOUNDARY: &str = "intake-test-boundary";

    fn app(parser: Arc<StubParser>) -> Router {
        app_with_config(Config::for_tests(), parser)
    }

    fn app_with_config(config: Config, parser: Arc<StubParser>) -> Router {
        build_router(AppState {
            config,
            extractor: Arc::new(ContentExtractor::new()),
            parser,
            sessions: SessionStore::new(),
        })
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, file_name: &str, mime: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"selected_interviewer\"\r\n\r\n{{\"id\":7}}\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn start_session(app: &Router, body: Value) -> Uuid {
        let response = app
            .clone()
            .oneshot(json_request("/api/v1/intake/sessions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        json["session_id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(StubParser::succeeding())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_text_submission_navigates_and_caches_job_name() {
        let parser = StubParser::succeeding();
        let app = app(parser.clone());
        let id = start_session(&app, json!({})).await;

        let response = app
            .clone()
            .oneshot(json_request(
                &format!("/api/v1/intake/sessions/{id}/text"),
                json!({ "content": "Go role", "selected_interviewer": {"id": 3} }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "navigated");
        assert_eq!(json["next_step"], "/interview/setup");
        assert_eq!(json["navigation"]["jobDescription"], "Go role");
        assert_eq!(json["navigation"]["selectedInterviewer"], json!({"id": 3}));
        assert_eq!(json["navigation"]["tags"], json!(["go", "distributed-systems"]));

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/intake/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["job_name"], "Backend Engineer");
        assert_eq!(json["state"], "success_navigated");
    }

    #[tokio::test]
    async fn test_blank_text_is_bad_request() {
        let parser = StubParser::succeeding();
        let app = app(parser.clone());
        let id = start_session(&app, json!({})).await;

        let response = app
            .oneshot(json_request(
                &format!("/api/v1/intake/sessions/{id}/text"),
                json!({ "content": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "Please enter a job description.");
        assert_eq!(parser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_skip_without_body() {
        let parser = StubParser::succeeding();
        let app = app(parser.clone());
        let id = start_session(&app, json!({})).await;

        let response = app
            .oneshot(
                Request::post(format!("/api/v1/intake/sessions/{id}/skip"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["navigation"]["jobDescription"], "");
        assert_eq!(json["navigation"]["selectedInterviewer"], Value::Null);
        assert_eq!(parser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_is_reported_in_outcome() {
        let app = app(StubParser::rejecting());
        let id = start_session(&app, json!({})).await;

        let response = app
            .oneshot(json_request(
                &format!("/api/v1/intake/sessions/{id}/text"),
                json!({ "content": "jd" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "failed", "message": "unparsable" })
        );
    }

    #[tokio::test]
    async fn test_docx_upload() {
        let parser = StubParser::succeeding();
        let app = app(parser.clone());
        let id = start_session(&app, json!({ "token": "session-tok" })).await;

        let bytes = crate::extraction::docx::tests::build_docx(&["Platform Engineer", "Rust"]);
        let mut request = multipart_request(
            &format!("/api/v1/intake/sessions/{id}/file"),
            "jd.docx",
            DOCX_MIME,
            &bytes,
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            "Bearer local-tok".parse().unwrap(),
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["navigation"]["jobDescription"], "Platform Engineer\nRust");
        assert_eq!(json["navigation"]["selectedInterviewer"], json!({"id": 7}));
        assert_eq!(
            parser.last_token.lock().unwrap().as_deref(),
            Some("local-tok")
        );
    }

    #[tokio::test]
    async fn test_upload_with_wrong_type_is_rejected() {
        let parser = StubParser::succeeding();
        let app = app(parser.clone());
        let id = start_session(&app, json!({})).await;

        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/intake/sessions/{id}/file"),
                "jd.txt",
                "text/plain",
                b"plain text job description",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "Please upload a PDF or DOCX file.");
        assert_eq!(parser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let response = app(StubParser::succeeding())
            .oneshot(json_request(
                &format!("/api/v1/intake/sessions/{}/text", Uuid::new_v4()),
                json!({ "content": "jd" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let parser = StubParser::succeeding();
        let config = Config {
            max_upload_bytes: 1024,
            ..Config::for_tests()
        };
        let app = app_with_config(config, parser.clone());
        let id = start_session(&app, json!({})).await;

        let response = app
            .oneshot(multipart_request(
                &format!("/api/v1/intake/sessions/{id}/file"),
                "jd.pdf",
                "application/pdf",
                &vec![b'x'; 8 * 1024],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(parser.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_bad_request() {
        let app = app(StubParser::succeeding());

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/intake/sessions")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"token": "#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let id = start_session(&app, json!({})).await;
        let response = app
            .oneshot(
                Request::post(format!("/api/v1/intake/sessions/{id}/skip"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_start_without_body_creates_session() {
        let app = app(StubParser::succeeding());
        let id = start_session(&app, json!({})).await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/intake/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let fresh: Uuid = body_json(response).await["session_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_ne!(fresh, id);
    }
}
