use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tourdesk_api::{app, AppState};
use tourdesk_core::{GoogleIdentity, StaticGoogleVerifier};
use tourdesk_shared::Masked;
use tourdesk_store::app_config::{AuthConfig, UploadConfig};
use tourdesk_store::{MediaStore, MemoryStore};
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://localhost:5000";
const BOUNDARY: &str = "tourdesk-test-boundary";

struct TestApp {
    router: Router,
    state: AppState,
    uploads: TempDir,
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File(name, file_name, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn google_identity(sub: &str, email: &str, verified: bool) -> GoogleIdentity {
    GoogleIdentity {
        sub: sub.into(),
        email: email.into(),
        email_verified: verified,
        name: Some("Google User".into()),
        picture: Some("https://lh3.googleusercontent.com/a/pic".into()),
    }
}

fn setup() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let media = MediaStore::new(
        &UploadConfig {
            root: uploads.path().to_path_buf(),
            max_profile_bytes: 1024,
            max_package_image_bytes: 1024,
            max_package_images: 5,
        },
        PUBLIC_URL,
    );
    let auth = AuthConfig {
        jwt_secret: Masked::new("integration-secret".to_string()),
        jwt_expiration_seconds: 3600,
        google_client_id: Some("test-client".into()),
        admin_emails: vec!["admin@example.com".into()],
    };
    let google = StaticGoogleVerifier::new()
        .with_token("good-token", google_identity("g-1", "traveller@gmail.com", true))
        .with_token("unverified-token", google_identity("g-2", "shady@gmail.com", false));

    let state = AppState::in_memory(MemoryStore::new(), Arc::new(google), media, auth);
    TestApp {
        router: app(state.clone()),
        state,
        uploads,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn form(&self, method: &str, uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(multipart_body(parts))).unwrap()).await
    }

    async fn register(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .form(
                "POST",
                "/api/auth/reg",
                None,
                &[
                    Part::Text("email", email),
                    Part::Text("password", password),
                    Part::Text("name", "Test Person"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_package(&self, token: &str, from: &str, start: &str, end: &str) -> Value {
        let (status, body) = self
            .form(
                "POST",
                "/api/packages/create",
                Some(token),
                &[
                    Part::Text("fromLocation", from),
                    Part::Text("toLocation", "Porto"),
                    Part::Text("startDate", start),
                    Part::Text("endDate", end),
                    Part::Text("basePrice", "1000"),
                    Part::Text("includedServices", r#"{"food":true,"accommodation":false}"#),
                    Part::Text("foodPrice", "150"),
                    Part::Text("accommodationPrice", "400"),
                    Part::File("images", "beach view.png", "image/png", b"fake-png"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    fn path_of(&self, url: &str) -> PathBuf {
        let relative = url.strip_prefix(&format!("{PUBLIC_URL}/upload/")).unwrap();
        self.uploads.path().join(relative)
    }
}

#[tokio::test]
async fn health_check() {
    let app = setup();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_and_login_flow() {
    let app = setup();

    let (status, body) = app
        .form("POST", "/api/auth/reg", None, &[Part::Text("email", "a@example.com")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["statusCode"], json!(400));
    assert_eq!(body["message"], json!("Please enter name, email and password"));

    let token = app.register("Ana@Example.com", "s3cret!").await;

    let (status, body) = app
        .form(
            "POST",
            "/api/auth/reg",
            None,
            &[
                Part::Text("email", "ana@example.com"),
                Part::Text("password", "other"),
                Part::Text("name", "Dup"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("User already exists"));

    let (status, body) = app
        .json("POST", "/api/auth/login", None, json!({"email": "ana@example.com", "password": "nope"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], json!("Invalid credentials"));

    let (status, _) = app
        .json("POST", "/api/auth/login", None, json!({"email": "ghost@example.com", "password": "x"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json("POST", "/api/auth/login", None, json!({"email": "ana@example.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json("POST", "/api/auth/login", None, json!({"email": "ana@example.com", "password": "s3cret!"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], json!("user"));

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("ana@example.com"));
    assert!(body.get("passwordHash").is_none());

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], json!(401));

    let (status, _) = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_whitespace_is_preserved() {
    let app = setup();
    app.register("ws@example.com", "  padded pw  ").await;

    let (status, body) = app
        .json("POST", "/api/auth/login", None, json!({"email": "ws@example.com", "password": "  padded pw  "}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .json("POST", "/api/auth/login", None, json!({"email": "ws@example.com", "password": "padded pw"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = setup();
    let user = app.register("user@example.com", "pw").await;
    let admin = app.register("admin@example.com", "pw").await;

    let (status, body) = app.get("/api/auth/clients", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("Access denied. You must be an admin."));

    let (status, body) = app.get("/api/auth/clients", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], json!("user@example.com"));

    let (status, _) = app.get("/api/booking/analytics", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn google_login_creates_and_links_accounts() {
    let app = setup();

    let (status, body) = app.json("POST", "/api/auth/g-login", None, json!({"idToken": "unverified-token"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Google email not verified"));

    let (status, _) = app.json("POST", "/api/auth/g-login", None, json!({"idToken": "forged"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.json("POST", "/api/auth/g-login", None, json!({"idToken": "good-token"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], json!("traveller@gmail.com"));
    let id = body["user"]["id"].clone();

    // Google-only accounts cannot use password login
    let (status, body) = app
        .json("POST", "/api/auth/login", None, json!({"email": "traveller@gmail.com", "password": "x"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Please login with Google"));

    let (_, body) = app.json("POST", "/api/auth/g-login", None, json!({"idToken": "good-token"})).await;
    assert_eq!(body["user"]["id"], id);
}

#[tokio::test]
async fn profile_update_replaces_picture() {
    let app = setup();
    let token = app.register("pic@example.com", "pw").await;

    let (status, body) = app
        .form(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &[Part::Text("name", "Renamed"), Part::File("profilePicture", "me 1.png", "image/png", b"one")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["name"], json!("Renamed"));
    let first = body["user"]["profilePicture"].as_str().unwrap().to_string();
    assert!(app.path_of(&first).exists());

    let (status, body) = app
        .form(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &[Part::File("profilePicture", "me 2.png", "image/png", b"two")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["user"]["profilePicture"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(!app.path_of(&first).exists());
    assert!(app.path_of(&second).exists());

    let (status, body) = app
        .form(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &[Part::File("profilePicture", "notes.txt", "text/plain", b"hi")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Invalid file type"));
}

#[tokio::test]
async fn package_crud_and_listing() {
    let app = setup();
    let admin = app.register("admin@example.com", "pw").await;
    let user = app.register("user@example.com", "pw").await;

    let (status, _) = app
        .form("POST", "/api/packages/create", Some(&user), &[Part::Text("fromLocation", "Lisbon")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .form(
            "POST",
            "/api/packages/create",
            Some(&admin),
            &[
                Part::Text("fromLocation", "Lisbon"),
                Part::Text("toLocation", "Porto"),
                Part::Text("startDate", "2099-05-10"),
                Part::Text("endDate", "2099-05-01"),
                Part::Text("basePrice", "100"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("End date must be after start date"));

    let created = app.create_package(&admin, "Lisbon", "2099-05-01", "2099-05-10").await;
    app.create_package(&admin, "Madrid", "2099-06-01", "2099-06-10").await;
    app.create_package(&admin, "Lisbon North", "2000-01-01", "2000-01-05").await;

    assert_eq!(created["status"], json!("upcoming"));
    let image = created["images"][0].as_str().unwrap().to_string();
    assert!(image.starts_with("http://localhost:5000/upload/package/beach_view"));
    assert!(app.path_of(&image).exists());

    // uploaded files are served back
    let served = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(image.strip_prefix(PUBLIC_URL).unwrap())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);

    let (status, body) = app.get("/api/packages?fromLocation=lisbon&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["total"], json!(2));

    let (_, body) = app.get("/api/packages?status=completed", None).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["data"][0]["fromLocation"], json!("Lisbon North"));

    let (_, body) = app.get("/api/packages?sortBy=startDate&sortOrder=asc", None).await;
    assert_eq!(body["data"][0]["fromLocation"], json!("Lisbon North"));

    let (status, _) = app.get("/api/packages?minPrice=500&maxPrice=100", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = created["id"].as_str().unwrap();
    let (status, body) = app.get(&format!("/api/packages/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["basePrice"], json!(1000));

    let (status, _) = app.get(&format!("/api/packages/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // drop the old image, add a new one
    let (status, body) = app
        .form(
            "PUT",
            &format!("/api/packages/{id}"),
            Some(&admin),
            &[
                Part::Text("basePrice", "1200"),
                Part::Text("keepImages", "[]"),
                Part::File("images", "harbour.jpg", "image/jpeg", b"jpg"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["basePrice"], json!(1200));
    assert_eq!(body["fromLocation"], json!("Lisbon"));
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert!(!app.path_of(&image).exists());
    let replacement = images[0].as_str().unwrap().to_string();
    assert!(app.path_of(&replacement).exists());

    let (status, body) = app.json("DELETE", &format!("/api/packages/{id}"), Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(!app.path_of(&replacement).exists());

    let (status, _) = app.json("DELETE", &format!("/api/packages/{id}"), Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn too_many_images_are_rejected() {
    let app = setup();
    let admin = app.register("admin@example.com", "pw").await;

    let mut parts = vec![
        Part::Text("fromLocation", "Lisbon"),
        Part::Text("toLocation", "Porto"),
        Part::Text("startDate", "2099-05-01"),
        Part::Text("endDate", "2099-05-10"),
        Part::Text("basePrice", "100"),
    ];
    for _ in 0..6 {
        parts.push(Part::File("images", "a.png", "image/png", b"x"));
    }

    let (status, body) = app.form("POST", "/api/packages/create", Some(&admin), &parts).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("A package can have at most 5 images"));
    assert!(!app.uploads.path().join("package").exists());
}

#[tokio::test]
async fn oversized_prices_are_rejected() {
    let app = setup();
    let admin = app.register("admin@example.com", "pw").await;

    let max = i64::MAX.to_string();
    let parts = [
        Part::Text("fromLocation", "Lisbon"),
        Part::Text("toLocation", "Porto"),
        Part::Text("startDate", "2099-05-01"),
        Part::Text("endDate", "2099-05-10"),
        Part::Text("basePrice", &max),
        Part::Text("foodPrice", "1"),
    ];
    let (status, body) = app.form("POST", "/api/packages/create", Some(&admin), &parts).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("basePrice is too large"));
}

#[tokio::test]
async fn booking_lifecycle_and_analytics() {
    let app = setup();
    let admin = app.register("admin@example.com", "pw").await;
    let user = app.register("user@example.com", "pw").await;
    let other = app.register("other@example.com", "pw").await;

    let package = app.create_package(&admin, "Lisbon", "2099-05-01", "2099-05-10").await;
    let package_id = package["id"].as_str().unwrap();

    let mut events = app.state.events.subscribe();

    let (status, _) = app
        .json("POST", "/api/booking", Some(&user), json!({"packageId": uuid::Uuid::new_v4()}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // food is included (-150 when declined), accommodation is extra (+400)
    let (status, booking) = app
        .json(
            "POST",
            "/api/booking",
            Some(&user),
            json!({"packageId": package_id, "selectedServices": {"food": false, "accommodation": true}}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["totalPrice"], json!(1250));
    assert_eq!(booking["status"], json!("accepted"));
    assert_eq!(booking["bookingStatus"], json!("upcoming"));
    assert_eq!(booking["displayStatus"], json!("accepted"));
    assert_eq!(booking["user"]["email"], json!("user@example.com"));
    assert_eq!(booking["package"]["toLocation"], json!("Porto"));

    let event = events.try_recv().unwrap();
    assert_eq!(event.topic(), "booking.created");

    let (_, defaulted) = app.json("POST", "/api/booking", Some(&other), json!({"packageId": package_id})).await;
    assert_eq!(defaulted["totalPrice"], json!(1000));
    assert_eq!(defaulted["selectedServices"], json!({"food": true, "accommodation": false}));

    let (_, mine) = app.get("/api/booking", Some(&user)).await;
    assert_eq!(mine["count"], json!(1));

    let id = booking["id"].as_str().unwrap();
    let (status, _) = app.get(&format!("/api/booking/{id}"), Some(&other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/booking/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.json("PUT", &format!("/api/booking/{id}"), Some(&user), json!({"status": "cancelled"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.json("PUT", &format!("/api/booking/{id}"), Some(&admin), json!({"status": "lost"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .json("PUT", &format!("/api/booking/{id}"), Some(&admin), json!({"status": "cancelled"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["displayStatus"], json!("cancelled"));

    let (_, cancelled) = app.get("/api/booking/package?status=cancelled", Some(&admin)).await;
    assert_eq!(cancelled["count"], json!(1));
    let (_, for_package) = app.get(&format!("/api/booking/package?packageId={package_id}"), Some(&admin)).await;
    assert_eq!(for_package["count"], json!(2));

    let (status, stats) = app.get("/api/booking/analytics", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["success"], json!(true));
    assert_eq!(stats["totalBookings"], json!(2));
    assert_eq!(stats["statusCounts"]["cancelled"], json!(1));
    assert_eq!(stats["statusCounts"]["upcoming"], json!(1));
    assert_eq!(stats["topUsers"][0]["email"], json!("other@example.com"));
    assert_eq!(stats["topUsers"][0]["totalSpent"], json!(1000));

    let (_, stats) = app.get("/api/packages/analytics", Some(&admin)).await;
    let counts = stats["packagesCount"].as_array().unwrap();
    assert_eq!(counts.len(), 3);
    assert_eq!(stats["bookingsPerPackage"][0]["packageName"], json!("Lisbon → Porto"));
    assert_eq!(stats["bookingsPerPackage"][0]["bookingsCount"], json!(1));

    // deleting the package takes its bookings along
    app.json("DELETE", &format!("/api/packages/{package_id}"), Some(&admin), json!({})).await;
    let (_, all) = app.get("/api/booking/package", Some(&admin)).await;
    assert_eq!(all["count"], json!(0));
}

#[tokio::test]
async fn ended_packages_cannot_be_booked() {
    let app = setup();
    let admin = app.register("admin@example.com", "pw").await;
    let user = app.register("user@example.com", "pw").await;
    let package = app.create_package(&admin, "Lisbon", "2000-01-01", "2000-01-05").await;

    let (status, body) = app
        .json("POST", "/api/booking", Some(&user), json!({"packageId": package["id"]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Package has already ended and can no longer be booked"));
}
