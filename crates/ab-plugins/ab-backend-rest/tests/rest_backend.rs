use std::net::TcpListener;

use ab_backend_rest::RestBackend;
use ab_core::{AppError, AuthSession, BlobStore, Bucket, Row, RowQuery, RowStore, Table};
use bytes::Bytes;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON: &str = "anon-key";

fn backend(server: &MockServer) -> RestBackend {
    let url = Url::parse(&server.uri()).unwrap();
    RestBackend::new(&url, SecretString::from(ANON.to_string())).unwrap()
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

async fn signed_in(server: &MockServer, user: Uuid) -> RestBackend {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "session-token",
            "token_type": "bearer",
            "user": { "id": user, "email": "mika@example.com" }
        })))
        .mount(server)
        .await;
    let rest = backend(server);
    rest.sign_in_with_password("mika@example.com", &SecretString::from("pw".to_string()))
        .await
        .unwrap();
    rest
}

#[tokio::test]
async fn select_renders_filters_and_uses_anon_key_when_signed_out() {
    let server = MockServer::start().await;
    let post = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/likes"))
        .and(query_param("select", "*"))
        .and(query_param("post_id", format!("in.({post})")))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", ANON))
        .and(header("authorization", format!("Bearer {ANON}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "post_id": post, "user_id": Uuid::new_v4() }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rest = backend(&server);
    assert_eq!(rest.current_actor().await.unwrap(), None);
    let rows = rest
        .select(
            Table::Likes,
            &RowQuery::new().in_list("post_id", [post]).order_by("created_at", false),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn sign_in_switches_bearer_to_session_token() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();
    let rest = signed_in(&server, user).await;

    let actor = rest.current_actor().await.unwrap().unwrap();
    assert_eq!(actor.id, user);
    assert_eq!(actor.email.as_deref(), Some("mika@example.com"));

    Mock::given(method("POST"))
        .and(path("/rest/v1/posts"))
        .and(header("authorization", "Bearer session-token"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "user_id": user, "content": "hello" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": user,
            "content": "hello",
            "created_at": "2025-03-01T12:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let stored = rest
        .insert(Table::Posts, row(json!({ "user_id": user, "content": "hello" })))
        .await
        .unwrap();
    assert_eq!(stored["content"], "hello");
    assert!(stored.contains_key("id"));
}

#[tokio::test]
async fn rejected_credentials_are_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let rest = backend(&server);
    let err = rest
        .sign_in_with_password("who@example.com", &SecretString::from("nope".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Unauthenticated);
    assert_eq!(rest.current_actor().await.unwrap(), None);
}

#[tokio::test]
async fn throttled_sign_in_is_not_reported_as_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let rest = backend(&server);
    let err = rest
        .sign_in_with_password("who@example.com", &SecretString::from("pw".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(ref msg) if msg.contains("429")), "{err:?}");
    assert_eq!(rest.current_actor().await.unwrap(), None);
}

#[tokio::test]
async fn unique_violation_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/event_attendees"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "code": "23505" })))
        .mount(&server)
        .await;

    let rest = backend(&server);
    let err = rest
        .insert(Table::EventAttendees, row(json!({ "event_id": Uuid::new_v4() })))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn server_errors_and_bad_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let rest = backend(&server);
    let err = rest.select(Table::Posts, &RowQuery::new()).await.unwrap_err();
    assert!(matches!(err, AppError::BackendUnavailable(_)));
    let err = rest.select(Table::Groups, &RowQuery::new()).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}

#[tokio::test]
async fn unreachable_host_is_backend_unavailable() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = Url::parse(&format!("http://{addr}")).unwrap();

    let rest = RestBackend::new(&url, SecretString::from(ANON.to_string())).unwrap();
    let err = rest.select(Table::Posts, &RowQuery::new()).await.unwrap_err();
    assert!(matches!(err, AppError::BackendUnavailable(_)));
}

#[tokio::test]
async fn upload_posts_bytes_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/posts/posts/abc.png"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "posts/posts/abc.png" })))
        .expect(1)
        .mount(&server)
        .await;

    let rest = backend(&server);
    rest.save_upload(Bucket::Posts, "posts/abc.png", Bytes::from_static(b"png"), &mime::IMAGE_PNG)
        .await
        .unwrap();
    assert_eq!(
        rest.public_url(Bucket::Posts, "posts/abc.png"),
        format!("{}/storage/v1/object/public/posts/posts/abc.png", server.uri())
    );
}

#[tokio::test]
async fn sign_out_clears_the_session() {
    let server = MockServer::start().await;
    let rest = signed_in(&server, Uuid::new_v4()).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    rest.sign_out().await.unwrap();
    assert_eq!(rest.current_actor().await.unwrap(), None);
}
