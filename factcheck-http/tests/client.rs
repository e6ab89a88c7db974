use factcheck_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde_json::{json, Value};
use std::borrow::Cow;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(&format!("{}/v1beta/", server.uri())).expect("valid base url")
}

#[tokio::test]
async fn query_auth_and_params_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("key", "secret-key"))
        .and(query_param("pageSize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let got: Value = client
        .get_json(
            "models",
            RequestOpts {
                auth: Some(Auth::Query {
                    name: "key",
                    value: Cow::Borrowed("secret-key"),
                }),
                query: Some(vec![("pageSize", Cow::Borrowed("50"))]),
                ..Default::default()
            },
        )
        .await
        .expect("request succeeds");

    assert_eq!(got, json!({"models": []}));
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/m:generateContent"))
        .and(body_json(json!({"hello": "world"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let got: Value = client_for(&server)
        .post_json(
            "models/m:generateContent",
            &json!({"hello": "world"}),
            RequestOpts::default(),
        )
        .await
        .expect("request succeeds");
    assert_eq!(got["ok"], json!(true));
}

#[tokio::test]
async fn error_status_is_a_single_attempt_with_extracted_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("models", RequestOpts::default())
        .await
        .expect_err("503 surfaces as an error");

    match err {
        HttpError::Api {
            status, message, ..
        } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "The model is overloaded. (UNAVAILABLE)");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_json::<Value>("models", RequestOpts::default())
        .await
        .expect_err("html is not json");
    assert!(matches!(err, HttpError::Decode(_, ref snippet) if snippet.contains("oops")));
}

#[tokio::test]
async fn network_errors_do_not_echo_query_secrets() {
    // Reserve a port, then close it so the connection is refused.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port");
    let client = HttpClient::new(&format!("http://{addr}/v1beta/")).expect("valid base url");

    let err = client
        .post_json::<_, Value>(
            "models/gemini-pro:generateContent",
            &json!({"contents": []}),
            RequestOpts {
                auth: Some(Auth::Query {
                    name: "key",
                    value: Cow::Borrowed("SUPER-SECRET-KEY"),
                }),
                ..Default::default()
            },
        )
        .await
        .expect_err("nothing listens on the port");

    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
    let shown = err.to_string();
    assert!(!shown.contains("SUPER-SECRET-KEY"), "secret leaked: {shown}");
    assert!(shown.starts_with("network error: "), "got {shown}");
}
