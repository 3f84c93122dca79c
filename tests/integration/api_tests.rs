//! API integration tests
//!
//! Run against a live server with a seeded database:
//! `cargo test -- --ignored`. The `admin` account must exist with password
//! `admin` and be a superuser; `patron` / `patron` must exist without grants.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8000";

fn api(path: &str) -> String {
    format!("{}/api/v1{}", BASE_URL, path)
}

/// Helper to get a bearer token for `username`
async fn get_auth_token(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(api("/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

fn unique_isbn() -> String {
    let digits: String = uuid::Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(10)
        .collect();
    format!("978{}", digits)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(api("/health"))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_hello() {
    let body: Value = Client::new()
        .get(format!("{}/api/1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(body, json!({ "message": "Hello World!" }));
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let response = Client::new()
        .post(api("/auth/login"))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_home_visits_follow_session_cookie() {
    let session = Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build client");

    let first: Value = session
        .get(format!("{}/catalog/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let second: Value = session
        .get(format!("{}/catalog/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(first["num_visits"], 1);
    assert_eq!(second["num_visits"], 2);

    let fresh: Value = Client::new()
        .get(format!("{}/catalog/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(fresh["num_visits"], 1);
}

#[tokio::test]
#[ignore]
async fn test_borrowed_requires_capability() {
    let client = Client::new();

    let anonymous = client
        .get(format!("{}/catalog/borrowed", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let patron = get_auth_token(&client, "patron", "patron").await;
    let forbidden = client
        .get(format!("{}/catalog/borrowed", BASE_URL))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let admin = get_auth_token(&client, "admin", "admin").await;
    let allowed = client
        .get(format!("{}/catalog/borrowed?sort=due_back", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client, "admin", "admin").await;
    let book = json!({
        "title": "The Left Hand of Darkness",
        "summary": "Gethen",
        "isbn": unique_isbn(),
        "genre": []
    });

    let created = client
        .post(api("/books"))
        .bearer_auth(&token)
        .json(&book)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await.expect("Failed to parse response");
    assert!(created["url"].as_str().unwrap().starts_with("/api/v1/books/"));

    let duplicate = client
        .post(api("/books"))
        .bearer_auth(&token)
        .json(&book)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    let body: Value = duplicate.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "ValidationError");

    let id = created["url"].as_str().unwrap().rsplit('/').next().unwrap().to_string();
    let deleted = client
        .delete(api(&format!("/books/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn test_author_list_page_out_of_range() {
    let response = Client::new()
        .get(format!("{}/catalog/author/?page=9999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
