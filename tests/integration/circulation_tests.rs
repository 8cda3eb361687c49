//! Circulation scenarios run against the in-memory store

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use maktaba_server::{
    config::UploadsConfig,
    error::{AppResult, ErrorCode},
    models::{
        author::CreateAuthor,
        book::{Book, CreateBook, UpdateBook},
        member::{CreateMember, Member},
        LocalizedNote, LocalizedText, ReturnOutcome,
    },
    repository::Repository,
    services::{email::Mailer, Services},
};

/// Mailer that keeps every message it is asked to send
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(Vec<String>, String, String)>>,
}

impl Mailer for RecordingMailer {
    fn send_email(&self, recipients: &[String], subject: &str, body: &str) -> AppResult<()> {
        self.sent
            .lock()
            .push((recipients.to_vec(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct Library {
    services: Services,
    mailer: Arc<RecordingMailer>,
    _uploads: tempfile::TempDir,
}

fn library() -> Library {
    let uploads = tempfile::tempdir().unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let services = Services::new(
        Repository::in_memory(),
        mailer.clone(),
        UploadsConfig {
            directory: uploads.path().to_path_buf(),
            max_file_size: 1024,
        },
    );
    Library {
        services,
        mailer,
        _uploads: uploads,
    }
}

impl Library {
    async fn book(&self, copies: i32, days: i32) -> Book {
        let author = self
            .services
            .authors
            .add_author(CreateAuthor {
                name: LocalizedText {
                    en: "Naguib Mahfouz".to_string(),
                    ar: "نجيب محفوظ".to_string(),
                },
                email: format!("{}@authors.example.org", Uuid::new_v4()),
                biography: LocalizedNote::default(),
                birth_date: None,
            })
            .await
            .unwrap();

        self.services
            .catalog
            .create_book(CreateBook {
                title: LocalizedText {
                    en: "Palace Walk".to_string(),
                    ar: "بين القصرين".to_string(),
                },
                description: LocalizedNote::default(),
                genre: "novel".to_string(),
                number_of_available_copies: copies,
                is_borrowable: Some(true),
                number_of_borrowable_days: Some(days),
                is_open_to_reviews: None,
                min_age: 12,
                author_id: author.id,
            })
            .await
            .unwrap()
    }

    async fn member(&self, username: &str) -> Member {
        self.services
            .members
            .add_member(CreateMember {
                name: username.to_string(),
                username: username.to_string(),
                email: format!("{}@example.org", username),
                birth_date: NaiveDate::from_ymd_opt(1990, 3, 1).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn copies(&self, book_id: Uuid) -> i32 {
        self.services
            .catalog
            .get_book(book_id)
            .await
            .unwrap()
            .number_of_available_copies
    }

    async fn rate(&self, member_id: Uuid) -> i32 {
        self.services
            .members
            .get_member(member_id)
            .await
            .unwrap()
            .return_rate
    }
}

#[tokio::test]
async fn test_single_copy_borrow_and_late_return() {
    let lib = library();
    let book = lib.book(1, 14).await;
    let first = lib.member("first").await;
    let second = lib.member("second").await;
    let start = Utc::now();

    let loan = lib
        .services
        .loans
        .borrow_book_at(first.id, book.id, start)
        .await
        .unwrap();
    assert_eq!(loan.return_date, start + Duration::days(14));
    assert_eq!(lib.copies(book.id).await, 0);

    let err = lib
        .services
        .loans
        .borrow_book_at(second.id, book.id, start)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoCopiesAvailable);
    assert_eq!(lib.copies(book.id).await, 0);

    let receipt = lib
        .services
        .loans
        .return_book_at(first.id, book.id, start + Duration::days(20))
        .await
        .unwrap();
    assert_eq!(receipt.outcome, ReturnOutcome::Late);
    // Already at the floor, so the penalty clamps to zero
    assert_eq!(receipt.return_rate, 0);
    assert_eq!(lib.rate(first.id).await, 0);
    assert_eq!(lib.copies(book.id).await, 1);

    let profile = lib.services.members.get_profile(first.id).await.unwrap();
    assert!(profile.borrowed_books.is_empty());
}

#[tokio::test]
async fn test_return_rate_moves_in_steps_of_five() {
    let lib = library();
    let book = lib.book(1, 7).await;
    let member = lib.member("reader").await;
    let mut now = Utc::now();

    for _ in 0..3 {
        lib.services.loans.borrow_book_at(member.id, book.id, now).await.unwrap();
        now += Duration::days(3);
        lib.services.loans.return_book_at(member.id, book.id, now).await.unwrap();
    }
    assert_eq!(lib.rate(member.id).await, 15);

    lib.services.loans.borrow_book_at(member.id, book.id, now).await.unwrap();
    now += Duration::days(8);
    let receipt = lib.services.loans.return_book_at(member.id, book.id, now).await.unwrap();
    assert_eq!(receipt.outcome, ReturnOutcome::Late);
    assert_eq!(receipt.return_rate, 10);
}

#[tokio::test]
async fn test_borrow_rules() {
    let lib = library();
    let book = lib.book(3, 14).await;
    let member = lib.member("keen").await;
    let now = Utc::now();

    lib.services.loans.borrow_book_at(member.id, book.id, now).await.unwrap();
    let err = lib
        .services
        .loans
        .borrow_book_at(member.id, book.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyBorrowed);
    assert_eq!(lib.copies(book.id).await, 2);

    let err = lib
        .services
        .loans
        .borrow_book_at(Uuid::new_v4(), book.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemberNotFound);

    let err = lib
        .services
        .loans
        .borrow_book_at(member.id, Uuid::new_v4(), now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BookNotFound);

    let closed = lib.book(1, 14).await;
    lib.services
        .catalog
        .update_book(
            closed.id,
            UpdateBook {
                is_borrowable: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let err = lib
        .services
        .loans
        .borrow_book_at(member.id, closed.id, now)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotBorrowable);
    assert_eq!(lib.copies(closed.id).await, 1);
}

#[tokio::test]
async fn test_age_restriction() {
    let lib = library();
    let book = lib.book(1, 14).await;
    let child = lib
        .services
        .members
        .add_member(CreateMember {
            name: "Young".to_string(),
            username: "young".to_string(),
            email: "young@example.org".to_string(),
            birth_date: Utc::now().date_naive() - Duration::days(365 * 8),
        })
        .await
        .unwrap();

    let err = lib.services.loans.borrow_book(child.id, book.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AgeRestricted);
    assert_eq!(lib.copies(book.id).await, 1);
}

#[tokio::test]
async fn test_returning_unborrowed_book_is_not_found() {
    let lib = library();
    let book = lib.book(1, 14).await;
    let member = lib.member("idle").await;

    let err = lib.services.loans.return_book(member.id, book.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::LoanNotFound);
    assert_eq!(lib.rate(member.id).await, 0);
    assert_eq!(lib.copies(book.id).await, 1);
}

#[tokio::test]
async fn test_active_loans_sorted_soonest_first() {
    let lib = library();
    let long = lib.book(1, 21).await;
    let short = lib.book(1, 2).await;
    let member = lib.member("busy").await;
    let now = Utc::now();

    lib.services.loans.borrow_book_at(member.id, long.id, now).await.unwrap();
    lib.services.loans.borrow_book_at(member.id, short.id, now).await.unwrap();

    let later = now + Duration::hours(36);
    let loans = lib.services.loans.active_loans_at(member.id, later).await.unwrap();
    assert_eq!(loans.len(), 2);
    assert_eq!(loans[0].book_id, short.id);
    assert_eq!(loans[0].days_left, 1);
    assert!(!loans[0].warning_flag);
    assert_eq!(loans[1].book_id, long.id);
    assert_eq!(loans[1].title.as_deref(), Some("Palace Walk"));

    let overdue = lib
        .services
        .loans
        .active_loans_at(member.id, now + Duration::days(3))
        .await
        .unwrap();
    assert!(overdue[0].expired_flag);
    assert!(overdue[0].warning_flag);
    assert!(!overdue[1].expired_flag);
}

#[tokio::test]
async fn test_subscriptions() {
    let lib = library();
    let book = lib.book(1, 14).await;
    let member = lib.member("fan").await;

    lib.services.subscriptions.subscribe(member.id, book.id).await.unwrap();
    let err = lib
        .services
        .subscriptions
        .subscribe(member.id, book.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadySubscribed);

    let err = lib
        .services
        .subscriptions
        .subscribe(member.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::BookNotFound);

    lib.services.subscriptions.unsubscribe(member.id, book.id).await.unwrap();
    // Not subscribed any more: still fine
    lib.services.subscriptions.unsubscribe(member.id, book.id).await.unwrap();
    assert!(lib.services.subscriptions.subscribers(book.id).await.unwrap().is_empty());

    let err = lib
        .services
        .subscriptions
        .unsubscribe(Uuid::new_v4(), book.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemberNotFound);
}

#[tokio::test]
async fn test_republish_notifies_each_subscriber() {
    let lib = library();
    let book = lib.book(1, 14).await;
    let amira = lib.member("amira").await;
    let karim = lib.member("karim").await;
    lib.services.subscriptions.subscribe(amira.id, book.id).await.unwrap();
    lib.services.subscriptions.subscribe(karim.id, book.id).await.unwrap();

    lib.services.publication.publish(book.id).await.unwrap();
    let err = lib.services.publication.publish(book.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BookAlreadyPublished);

    lib.services.publication.unpublish(book.id).await.unwrap();
    let published = lib.services.publication.publish(book.id).await.unwrap();
    assert!(published.is_published);
    assert!(published.published_date.is_some());

    let sent = lib.mailer.sent.lock();
    assert_eq!(sent.len(), 2);
    for (recipients, subject, body) in sent.iter() {
        let mut recipients = recipients.clone();
        recipients.sort();
        assert_eq!(recipients, vec!["amira@example.org", "karim@example.org"]);
        assert_eq!(subject, "Book Published");
        assert_eq!(body, "The book \"Palace Walk\" has been published.");
    }
}

#[tokio::test]
async fn test_kpis() {
    let lib = library();
    let kpis = lib.services.kpi.compute_kpis().await.unwrap();
    assert_eq!(kpis.books_publish_rate, "0%");
    assert_eq!(kpis.average_return_rate, "0%");

    let published = lib.book(1, 14).await;
    lib.book(1, 14).await;
    lib.services.publication.publish(published.id).await.unwrap();

    let member = lib.member("punctual").await;
    lib.member("newcomer").await;
    lib.services.loans.borrow_book(member.id, published.id).await.unwrap();
    lib.services.loans.return_book(member.id, published.id).await.unwrap();

    let kpis = lib.services.kpi.compute_kpis().await.unwrap();
    assert_eq!(kpis.books_publish_rate, "50.00%");
    assert_eq!(kpis.average_return_rate, "2.50%");
}

#[tokio::test]
async fn test_delete_guards() {
    let lib = library();
    let book = lib.book(2, 14).await;
    let member = lib.member("holder").await;
    lib.services.loans.borrow_book(member.id, book.id).await.unwrap();

    let err = lib.services.catalog.delete_book(book.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BookHasLoans);

    let err = lib.services.members.delete_member(member.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemberHasLoans);

    let err = lib.services.authors.delete_author(book.author_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AuthorHasBooks);

    lib.services.loans.return_book(member.id, book.id).await.unwrap();
    lib.services.catalog.delete_book(book.id).await.unwrap();
    lib.services.members.delete_member(member.id).await.unwrap();
    lib.services.authors.delete_author(book.author_id).await.unwrap();

    let err = lib.services.catalog.get_book(book.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BookNotFound);
}

#[tokio::test]
async fn test_duplicate_member_is_conflict() {
    let lib = library();
    lib.member("unique").await;

    let err = lib
        .services
        .members
        .add_member(CreateMember {
            name: "Other".to_string(),
            username: "UNIQUE".to_string(),
            email: "other@example.org".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyExists);
}

#[tokio::test]
async fn test_borrow_from_stale_read_is_rejected() {
    let lib = library();
    let book = lib.book(2, 14).await;
    let member = lib.member("racer").await;
    let now = Utc::now();

    let mut stale_member = lib.services.members.get_member(member.id).await.unwrap();
    let mut stale_book = lib.services.catalog.get_book(book.id).await.unwrap();

    lib.services.loans.borrow_book_at(member.id, book.id, now).await.unwrap();

    stale_book.take_copy().unwrap();
    stale_member.open_loan(&stale_book, now).unwrap();
    let err = lib
        .services
        .repository
        .circulation
        .commit(&stale_member, &stale_book)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StaleVersion);
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);

    assert_eq!(lib.copies(book.id).await, 1);
    let loans = lib.services.loans.active_loans_at(member.id, now).await.unwrap();
    assert_eq!(loans.len(), 1);

    // A return racing the same way leaves the loan in place
    let mut stale_member = lib.services.members.get_member(member.id).await.unwrap();
    let mut stale_book = lib.services.catalog.get_book(book.id).await.unwrap();
    lib.services.loans.return_book_at(member.id, book.id, now).await.unwrap();

    stale_member.close_loan(book.id).unwrap();
    stale_book.return_copy();
    let err = lib
        .services
        .repository
        .circulation
        .commit(&stale_member, &stale_book)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::StaleVersion);
    assert_eq!(lib.copies(book.id).await, 2);
    assert_eq!(lib.rate(member.id).await, 5);
}

#[tokio::test]
async fn test_borrow_window_is_bounded() {
    let lib = library();
    let book = lib.book(1, 14).await;

    let err = lib
        .services
        .catalog
        .update_book(
            book.id,
            UpdateBook {
                number_of_borrowable_days: Some(i32::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let member = lib.member("patient").await;
    let loan = lib
        .services
        .loans
        .borrow_book_at(member.id, book.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(loan.return_date - loan.borrowed_date, Duration::days(14));
}
