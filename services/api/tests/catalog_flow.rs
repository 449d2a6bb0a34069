//! End-to-end admin and catalog flows against a real database
//!
//! Skipped when `DATABASE_URL` is not set.

mod support;

use auth::{
    models::{ProviderProfile, Role},
    repositories::user::upsert_provider_user,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use support::spawn_app_with_database;

fn listing(title: &str, images: &[&str]) -> Value {
    json!({
        "title": title,
        "description": "Three bedrooms, garden, quiet street",
        "state": "Lagos",
        "city": "Ikeja",
        "location": "GRA",
        "type": "house",
        "price": 1_250_000_000i64,
        "beds": 3,
        "baths": 2,
        "images": images,
        "videos": [],
        "featured": false,
        "status": "active"
    })
}

#[tokio::test]
async fn admin_manages_listings_and_public_sees_active_ones() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let (admin, token) = app.sign_in(Role::Admin).await;
    let title = format!("Test house {}", uuid::Uuid::new_v4().simple());

    let response = app
        .client
        .post(app.url("/api/admin/properties"))
        .bearer_auth(&token)
        .json(&listing(
            &title,
            &[
                "https://res.cloudinary.com/demo/image/upload/v1/real-estate/a.jpg",
                "https://res.cloudinary.com/demo/image/upload/v1/real-estate/b.jpg",
            ],
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["title"], title.as_str());
    assert_eq!(created["created_by"], admin.id.to_string());

    let page: Value = app
        .client
        .get(app.url("/api/properties"))
        .query(&[("search", title.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 12);

    // City matches whole names, case-insensitively; wildcards are literal.
    for (city, expected) in [("ikeja", 1), ("Ikej_", 0), ("%", 0)] {
        let page: Value = app
            .client
            .get(app.url("/api/properties"))
            .query(&[("search", title.as_str()), ("city", city)])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(page["total"], expected, "city {}", city);
    }

    // Archive it and drop one image; the public catalog no longer sees it.
    let mut replacement = listing(
        &title,
        &["https://res.cloudinary.com/demo/image/upload/v1/real-estate/a.jpg"],
    );
    replacement["status"] = json!("archived");
    let response = app
        .client
        .put(app.url(&format!("/api/admin/properties/{}", id)))
        .bearer_auth(&token)
        .json(&replacement)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["images"].as_array().unwrap().len(), 1);
    assert_eq!(updated["status"], "archived");

    let response = app
        .client
        .get(app.url(&format!("/api/properties/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .patch(app.url(&format!("/api/admin/properties/{}/featured", id)))
        .bearer_auth(&token)
        .json(&json!({ "featured": true }))
        .send()
        .await
        .unwrap();
    let featured: Value = response.json().await.unwrap();
    assert_eq!(featured["featured"], true);

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/properties/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/properties/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Property not found");
}

#[tokio::test]
async fn regular_users_are_forbidden_from_admin_routes() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let (user, token) = app.sign_in(Role::User).await;

    let me: Value = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["user"]["id"], user.id.to_string());
    assert!(me["user"].get("password_hash").is_none());

    let response = app
        .client
        .get(app.url("/api/admin/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Logout revokes the session server-side.
    app.client
        .post(app.url("/api/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let response = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn testimonials_are_moderated() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let (_, token) = app.sign_in(Role::Admin).await;
    let marker = uuid::Uuid::new_v4().simple().to_string();

    let response = app
        .client
        .post(app.url("/api/testimonials"))
        .json(&json!({ "name": "Ada", "role": "Buyer", "rating": 5, "text": marker }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["approved"], true);
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .patch(app.url(&format!("/api/admin/testimonials/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "approved": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let public: Vec<Value> = app
        .client
        .get(app.url("/api/testimonials"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(public.iter().all(|t| t["text"] != marker.as_str()));

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/testimonials/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url(&format!("/api/admin/testimonials/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Testimonial not found");
}

#[tokio::test]
async fn page_views_show_up_on_the_dashboard() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let (_, token) = app.sign_in(Role::Admin).await;
    let path = format!("/properties/{}", uuid::Uuid::new_v4().simple());

    for _ in 0..3 {
        let response = app
            .client
            .post(app.url("/api/track"))
            .header("X-Forwarded-For", "203.0.113.9")
            .json(&json!({ "path": path }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let dashboard: Value = app
        .client
        .get(app.url("/api/admin/analytics?days=7"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(dashboard["days"], 7);
    assert_eq!(dashboard["views_per_day"].as_array().unwrap().len(), 7);
    assert!(dashboard["total_views"].as_i64().unwrap() >= 3);
    assert!(
        dashboard["views_by_role"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["role"] == "guest")
    );
}

fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[tokio::test]
async fn signup_and_credential_login() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let email = format!("buyer-{}@example.com", uuid::Uuid::new_v4().simple());
    let signup = json!({ "name": "Ada", "email": email.to_uppercase(), "password": "garden-view-42" });

    let response = app
        .client
        .post(app.url("/api/users"))
        .json(&signup)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let response = app
        .client
        .post(app.url("/api/users"))
        .json(&signup)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User already exists");

    for (login_email, password) in [
        (email.as_str(), "garden-view-43"),
        ("nobody-here@example.com", "garden-view-42"),
    ] {
        let response = app
            .client
            .post(app.url("/api/auth/login"))
            .json(&json!({ "email": login_email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid email or password");
    }

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "garden-view-42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.len() > "session_token=".len());

    let me: Value = app
        .client
        .get(app.url("/api/me"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["user"]["email"], email.as_str());
}

#[tokio::test]
async fn google_only_accounts_cannot_use_password_login() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let email = format!("google-{}@example.com", uuid::Uuid::new_v4().simple());
    let profile = ProviderProfile {
        provider: "google".to_string(),
        provider_account_id: uuid::Uuid::new_v4().simple().to_string(),
        email: email.clone(),
        name: Some("Grace".to_string()),
        image: None,
        access_token: None,
        refresh_token: None,
        expires_at: None,
        id_token: None,
    };
    let user = upsert_provider_user(&app.pool, &profile).await.unwrap();
    assert!(user.password_hash.is_none());

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "garden-view-42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn admins_look_up_users_by_id() {
    let Some(app) = spawn_app_with_database().await else {
        return;
    };
    let (admin, token) = app.sign_in(Role::Admin).await;

    let found: Value = app
        .client
        .get(app.url(&format!("/api/admin/users/{}", admin.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["id"], admin.id.to_string());

    let response = app
        .client
        .get(app.url(&format!("/api/admin/users/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User not found");

    let response = app
        .client
        .get(app.url("/api/admin/users/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}
