//! API integration tests
//!
//! Require a running server and database:
//! `cargo run` in one terminal, then `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique suffix so runs don't collide on unique columns
fn unique() -> String {
    format!("{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn create_book(client: &Client, copies: i16) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": format!("Test Book {}", unique()),
            "author": "Test Author",
            "genre": "fiction",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse book")
}

async fn create_member(client: &Client, max_books: i16) -> Value {
    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({
            "name": "Test Member",
            "email": format!("member{}@example.com", unique()),
            "max_books": max_books
        }))
        .send()
        .await
        .expect("Failed to create member");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse member")
}

async fn borrow(client: &Client, book_id: i64, member_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({
            "book_id": book_id,
            "member_id": member_id,
            "due_date": (Utc::now() + Duration::days(14)).to_rfc3339()
        }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_duplicate_isbn() {
    let client = Client::new();
    let isbn = format!("978-{}", &unique()[..10]);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "First Copyholder",
            "author": "Author",
            "isbn": isbn,
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Second Copyholder",
            "author": "Author",
            "isbn": isbn,
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_create_member_rejects_duplicate_email() {
    let client = Client::new();
    let email = format!("dup{}@example.com", unique());

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "name": "One", "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "name": "Two", "email": email }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_member_borrowing_cap_is_rejected_out_of_range() {
    let client = Client::new();

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({
            "name": "Greedy",
            "email": format!("greedy{}@example.com", unique()),
            "max_books": 50
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_last_copy_borrow_conflict_and_return_cycle() {
    let client = Client::new();

    let book = create_book(&client, 1).await;
    let member = create_member(&client, 5).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    // Borrow the only copy
    let response = borrow(&client, book_id, member_id).await;
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 0);

    // Second borrow on the same book fails
    let other = create_member(&client, 5).await;
    let response = borrow(&client, book_id, other["id"].as_i64().unwrap()).await;
    assert_eq!(response.status(), 409);

    // Return brings the copy back
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 1);

    // Second return of the same loan conflicts, counter untouched
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
#[ignore]
async fn test_borrowing_cap_enforced() {
    let client = Client::new();

    let book1 = create_book(&client, 1).await;
    let book2 = create_book(&client, 1).await;
    let member = create_member(&client, 1).await;
    let member_id = member["id"].as_i64().unwrap();

    let response = borrow(&client, book1["id"].as_i64().unwrap(), member_id).await;
    assert_eq!(response.status(), 201);

    let response = borrow(&client, book2["id"].as_i64().unwrap(), member_id).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_inactive_member_cannot_borrow() {
    let client = Client::new();

    let book = create_book(&client, 1).await;
    let member = create_member(&client, 5).await;
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/members/{}", BASE_URL, member_id))
        .json(&json!({ "membership_status": "suspended" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = borrow(&client, book["id"].as_i64().unwrap(), member_id).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_overdue_fine_computed_and_overridable() {
    let client = Client::new();

    let book = create_book(&client, 2).await;
    let member = create_member(&client, 5).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    // Three whole days past due: 3 x 0.50
    let response = borrow(&client, book_id, member_id).await;
    let loan: Value = response.json().await.unwrap();
    let due = chrono::DateTime::parse_from_rfc3339(loan["due_date"].as_str().unwrap()).unwrap();

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan["id"].as_i64().unwrap()))
        .json(&json!({ "return_date": (due + Duration::days(3)).to_rfc3339() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fine_amount"], "1.50");

    // Explicit fine of 0 wins even for an overdue return
    let response = borrow(&client, book_id, member_id).await;
    let loan: Value = response.json().await.unwrap();
    let due = chrono::DateTime::parse_from_rfc3339(loan["due_date"].as_str().unwrap()).unwrap();

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan["id"].as_i64().unwrap()))
        .json(&json!({
            "return_date": (due + Duration::days(10)).to_rfc3339(),
            "fine_amount": "0"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fine_amount"], "0.00");
}

#[tokio::test]
#[ignore]
async fn test_renew_moves_due_date_only() {
    let client = Client::new();

    let book = create_book(&client, 1).await;
    let member = create_member(&client, 5).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = borrow(&client, book_id, member["id"].as_i64().unwrap()).await;
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    let new_due = (Utc::now() + Duration::days(30)).to_rfc3339();
    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .json(&json!({ "due_date": new_due }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Availability untouched by the renewal
    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(book["available_copies"], 0);

    // Renewing a returned loan conflicts
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .json(&json!({ "due_date": (Utc::now() + Duration::days(30)).to_rfc3339() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_delete_blocked_by_active_loan() {
    let client = Client::new();

    let book = create_book(&client, 1).await;
    let member = create_member(&client, 5).await;
    let book_id = book["id"].as_i64().unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = borrow(&client, book_id, member_id).await;
    let loan: Value = response.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Once returned, both can go
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .delete(format!("{}/members/{}", BASE_URL, member_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_cannot_shrink_total_below_borrowed() {
    let client = Client::new();

    let book = create_book(&client, 2).await;
    let first = create_member(&client, 5).await;
    let second = create_member(&client, 5).await;
    let book_id = book["id"].as_i64().unwrap();

    let response = borrow(&client, book_id, first["id"].as_i64().unwrap()).await;
    assert_eq!(response.status(), 201);
    let response = borrow(&client, book_id, second["id"].as_i64().unwrap()).await;
    assert_eq!(response.status(), 201);
    let loan: Value = response.json().await.unwrap();

    // Both copies are out: shrinking to 0 fails validation, to 1 conflicts
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .json(&json!({ "total_copies": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .json(&json!({ "total_copies": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // After one return, shrinking to 1 recomputes availability to 0
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan["id"].as_i64().unwrap()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .json(&json!({ "total_copies": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_copies"], 1);
    assert_eq!(body["available_copies"], 0);
}

#[tokio::test]
#[ignore]
async fn test_overdue_listing_annotates_fines() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans/overdue", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    for entry in body.as_array().expect("Expected a list") {
        assert!(entry["days_overdue"].as_i64().unwrap() >= 0);
        assert!(entry["calculated_fine"].is_string());
    }
}

#[tokio::test]
#[ignore]
async fn test_get_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books"]["titles"].is_number());
    assert!(body["members"]["total"].is_number());
    assert!(body["loans"]["active"].is_number());
}
