//! API integration tests against an in-process server

use std::sync::Arc;

use reqwest::{multipart, Client, StatusCode};
use serde_json::{json, Value};

use maktaba_server::{
    api,
    config::{AppConfig, EmailConfig, StoreBackend, UploadsConfig},
    repository::Repository,
    services::{email::EmailService, Services},
    AppState,
};

struct TestServer {
    base: String,
    client: Client,
    _uploads: tempfile::TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Memory;
        config.uploads = UploadsConfig {
            directory: uploads.path().to_path_buf(),
            max_file_size: 1024,
        };

        let services = Services::new(
            Repository::in_memory(),
            Arc::new(EmailService::new(EmailConfig::default())),
            config.uploads.clone(),
        );
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, api::router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            _uploads: uploads,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn circulate(&self, path: &str, member: &str, book: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .header("member-id", member)
            .json(&json!({ "bookId": book }))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn seed(&self, copies: i32) -> (String, String) {
        let (status, author) = self
            .post(
                "/add-author",
                json!({
                    "name": { "en": "Ghassan Kanafani", "ar": "غسان كنفاني" },
                    "email": format!("{}@authors.example.org", uuid::Uuid::new_v4()),
                    "biography": { "en": "Palestinian writer", "ar": "كاتب فلسطيني" }
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, book) = self
            .post(
                "/add-book",
                json!({
                    "title": { "en": "Men in the Sun", "ar": "رجال في الشمس" },
                    "genre": "novel",
                    "numberOfAvailableCopies": copies,
                    "numberOfBorrowableDays": 14,
                    "minAge": 0,
                    "authorId": author["id"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, member) = self
            .post(
                "/add-member",
                json!({
                    "name": "Sara",
                    "username": format!("sara-{}", &uuid::Uuid::new_v4().to_string()[..8]),
                    "email": format!("{}@example.org", uuid::Uuid::new_v4()),
                    "birthDate": "1995-04-12"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        (
            member["id"].as_str().unwrap().to_string(),
            book["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let response = server.client.get(server.url("/ready")).send().await.unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_borrow_list_and_return() {
    let server = TestServer::start().await;
    let (member, book) = server.seed(1).await;

    let (status, body) = server.circulate("/borrow-book", &member, &book).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["bookId"], book.as_str());

    let (status, body) = server.circulate("/borrow-book", &member, &book).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NO_COPIES_AVAILABLE");

    let response = server
        .client
        .get(server.url("/borrowed-books"))
        .header("member-id", &member)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let loans = body["data"].as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["title"], "Men in the Sun");
    assert_eq!(loans[0]["daysLeft"], 14);
    assert_eq!(loans[0]["warningFlag"], false);
    assert_eq!(loans[0]["expiredFlag"], false);

    let (status, body) = server.circulate("/return-book", &member, &book).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "on_time");
    assert_eq!(body["data"]["returnRate"], 5);

    let (status, body) = server.circulate("/return-book", &member, &book).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "LOAN_NOT_FOUND");
}

#[tokio::test]
async fn test_member_header_is_required() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/borrow-book"))
        .json(&json!({ "bookId": uuid::Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = server
        .circulate("/borrow-book", "not-a-uuid", &uuid::Uuid::new_v4().to_string())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let server = TestServer::start().await;
    let (member, _) = server.seed(1).await;

    let response = server
        .client
        .post(server.url("/borrow-book"))
        .header("member-id", &member)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let response = server
        .client
        .post(server.url("/add-book"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = server
        .post(
            "/add-book",
            json!({
                "title": { "en": "Endless", "ar": "بلا نهاية" },
                "genre": "novel",
                "numberOfAvailableCopies": 1,
                "numberOfBorrowableDays": i32::MAX,
                "minAge": 0,
                "authorId": uuid::Uuid::new_v4()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_huge_page_lists_nothing() {
    let server = TestServer::start().await;
    server.seed(1).await;

    let response = server
        .client
        .get(server.url(&format!("/books?page={}", i64::MAX)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_subscribe_publish_and_kpis() {
    let server = TestServer::start().await;
    let (member, book) = server.seed(2).await;

    let (status, body) = server.circulate("/subscribe-book", &member, &book).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Subscribed to the book successfully.");

    let (status, body) = server.circulate("/subscribe-book", &member, &book).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_SUBSCRIBED");

    let (status, _) = server.post(&format!("/book/{}/publish", book), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.post(&format!("/book/{}/publish", book), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BOOK_ALREADY_PUBLISHED");

    let body: Value = server
        .client
        .get(server.url("/kpis"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["booksPublishRate"], "100.00%");
    assert_eq!(body["data"]["averageReturnRate"], "0.00%");

    let (status, _) = server.circulate("/unsubscribe-book", &member, &book).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.circulate("/unsubscribe-book", &member, &book).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_author_profile_language() {
    let server = TestServer::start().await;
    let (_, book) = server.seed(1).await;

    let book: Value = server
        .client
        .get(server.url(&format!("/book/{}", book)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let author_id = book["authorId"].as_str().unwrap();

    let profile: Value = server
        .client
        .get(server.url(&format!("/author-profile/{}", author_id)))
        .header("Accept-Language", "ar-SA,en;q=0.5")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "غسان كنفاني");
    assert_eq!(profile["biography"], "كاتب فلسطيني");

    let profile: Value = server
        .client
        .get(server.url(&format!("/author-profile/{}", author_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "Ghassan Kanafani");
}

#[tokio::test]
async fn test_cover_upload() {
    let server = TestServer::start().await;
    let (_, book) = server.seed(1).await;

    let text = multipart::Form::new().part(
        "image",
        multipart::Part::bytes(b"plain".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap(),
    );
    let response = server
        .client
        .post(server.url(&format!("/book/{}/cover", book)))
        .multipart(text)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_FILE_TYPE");

    let image = multipart::Form::new().part(
        "image",
        multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
            .file_name("cover.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let response = server
        .client
        .post(server.url(&format!("/book/{}/cover", book)))
        .multipart(image)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let cover = body["coverImageUrl"].as_str().unwrap();
    assert!(cover.starts_with("/uploads/"));

    let response = server
        .client
        .get(format!("{}{}", server.base, cover))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_list_books_empty_is_ok() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/books")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));
}
