//! API integration tests against a running server
//!
//! Start the server (`database.url = "memory://"` works) and run with
//! `cargo test --test api_tests -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get a dashboard token
async fn get_admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({ "password": "admin123" }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// First doctor and its cheapest active service
async fn first_doctor_and_service(client: &Client) -> (String, String) {
    let doctors: Value = client
        .get(format!("{}/doctors", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let doctor_id = doctors[0]["id"].as_str().expect("No doctor").to_string();

    let services: Value = client
        .get(format!("{}/services?doctor_id={}", BASE_URL, doctor_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let service_id = services[0]["id"].as_str().expect("No service").to_string();

    (doctor_id, service_id)
}

/// A free slot a few days ahead
async fn free_slot(client: &Client, doctor_id: &str) -> String {
    let today = chrono::Utc::now().date_naive();
    for days in 2..14 {
        let date = today + chrono::Duration::days(days);
        let body: Value = client
            .get(format!("{}/doctors/{}/availability?date={}", BASE_URL, doctor_id, date))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse response");

        if let Some(slot) = body["slots"]
            .as_array()
            .and_then(|slots| slots.iter().find(|s| s["booked"] == false))
        {
            return slot["start"].as_str().unwrap().to_string();
        }
    }
    panic!("No free slot in the next two weeks");
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
async fn test_admin_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({ "password": "admin123" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
#[ignore]
async fn test_admin_login_invalid_password() {
    let client = Client::new();

    let response = client
        .post(format!("{}/admin/login", BASE_URL))
        .json(&json!({ "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_bookings_unauthorized() {
    let client = Client::new();

    let response = client
        .get(format!("{}/admin/bookings", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_booking_lifecycle() {
    let client = Client::new();
    let (doctor_id, service_id) = first_doctor_and_service(&client).await;
    let slot = free_slot(&client, &doctor_id).await;

    let reference: Value = client
        .get(format!("{}/bookings/reference", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let request = json!({
        "bookingReference": reference["reference"],
        "doctorId": doctor_id,
        "serviceId": service_id,
        "patientName": "Integration Patient",
        "patientEmail": "integration@example.com",
        "patientPhone": "+919800000001",
        "mainConcern": "Follow-up",
        "appointmentDatetime": slot,
    });

    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.expect("Failed to parse response");
    let booking_id = created["booking"]["id"].as_str().unwrap().to_string();

    // Same slot again
    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let token = get_admin_token(&client).await;
    let response = client
        .put(format!("{}/admin/bookings/{}/status", BASE_URL, booking_id))
        .bearer_auth(&token)
        .json(&json!({ "status": "cancelled" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/admin/bookings/{}", BASE_URL, booking_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "cancelled");
    assert!(body["service"].is_object());
}
