use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router as MockRouter};
use serde_json::{Value, json};
use tutor_client::{
    AccountStatus, AdminConsole, ApiResponse, ClientConfig, Credentials, FetchStrategy,
    KeyValueStore, MemoryStorage, NO_RESPONSE, Period, PostStatus, Route, Strategies, TOKEN_KEY,
    USER_KEY,
};

const TOKEN: &str = "T1";

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Debug, Clone, Default)]
struct Backend {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Backend {
    fn requests(&self, path: &str) -> Vec<Seen> {
        self.seen
            .lock()
            .expect("mock log")
            .iter()
            .filter(|seen| seen.path == path)
            .cloned()
            .collect()
    }
}

fn tutor(id: &str, storage_id: &str, city: &str) -> Value {
    json!({
        "_id": storage_id,
        "tutorId": id,
        "name": format!("Tutor {id}"),
        "city": city,
        "status": "active",
        "verified": false,
        "createdAt": "2024-03-01T10:00:00Z"
    })
}

fn post(id: &str, status: &str, day: u32) -> Value {
    json!({
        "_id": format!("{:024x}", day),
        "requestId": id,
        "title": format!("Math lessons {id}"),
        "subject": "math",
        "location": { "city": "Hanoi" },
        "status": status,
        "createdAt": format!("2024-01-{day:02}T08:00:00Z")
    })
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn handle(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let query = Query::<HashMap<String, String>>::try_from_uri(&uri)
        .map(|Query(query)| query)
        .unwrap_or_default();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    backend.seen.lock().expect("mock log").push(Seen {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    if path == "/api/auth/login" {
        let valid = body["username"] == "admin" && body["password"] == "secret";
        return if valid {
            let user = json!({
                "_id": "u1",
                "id": "u1",
                "username": "admin",
                "role": "admin",
                "customId": "AD1"
            });
            reply(
                StatusCode::OK,
                json!({ "status": "success", "data": { "token": TOKEN, "user": user } }),
            )
        } else {
            reply(
                StatusCode::UNAUTHORIZED,
                json!({ "status": "error", "message": "Invalid credentials" }),
            )
        };
    }

    if authorization.as_deref() != Some(format!("Bearer {TOKEN}").as_str()) {
        return reply(
            StatusCode::UNAUTHORIZED,
            json!({ "status": "error", "message": "Token expired" }),
        );
    }

    match (method, path.as_str()) {
        (Method::GET, "/api/admin/users/limit") => {
            let user = json!({
                "_id": "u2",
                "userId": "USER_2",
                "username": "ann",
                "role": "parent",
                "status": "active"
            });
            let pagination = json!({ "page": 1, "limit": 10, "total": 1, "pages": 1 });
            let data = json!({ "users": [user], "pagination": pagination });
            reply(StatusCode::OK, json!({ "status": "success", "data": data }))
        }
        (Method::PATCH, "/api/admin/users/USER_2") => reply(
            StatusCode::OK,
            json!({ "status": "success", "message": "user updated" }),
        ),
        (Method::GET, "/api/admin/parents/limit") => reply(
            StatusCode::OK,
            json!([
                { "_id": "p1", "id": "p1", "parentId": "PARENT_1", "status": "active" },
                { "_id": "p2", "parentId": "PARENT_2", "status": null, "createdAt": null }
            ]),
        ),
        (Method::GET, "/api/admin/tutors") => {
            let tutors = [tutor("TUTOR_1", "t1", "Hanoi"), tutor("TUTOR_2", "t2", "Da Nang")];
            reply(
                StatusCode::OK,
                json!({ "status": "success", "data": { "tutors": tutors } }),
            )
        }
        (Method::GET, "/api/admin/tutors/TUTOR_9") => reply(
            StatusCode::OK,
            json!({ "status": "success", "data": { "tutor": tutor("TUTOR_9", "t9", "Hue") } }),
        ),
        (Method::PATCH, "/api/admin/tutors/TUTOR_1/verify") => reply(
            StatusCode::OK,
            json!({ "status": "success", "message": "tutor verified" }),
        ),
        (Method::PATCH, "/api/admin/tutors/TUTOR_2/status") => reply(
            StatusCode::OK,
            json!({ "status": "success", "message": "tutor status updated" }),
        ),
        (Method::GET, "/api/admin/posts") => {
            let mut posts: Vec<Value> = (1..=20)
                .map(|day| post(&format!("REQ_{day}"), "pending", day))
                .collect();
            posts.extend((21..=25).map(|day| post(&format!("REQ_{day}"), "approved", day)));
            reply(
                StatusCode::OK,
                json!({ "status": "success", "data": { "posts": posts } }),
            )
        }
        (Method::PATCH, "/api/admin/posts/REQ_3/status") => reply(
            StatusCode::OK,
            json!({ "status": "success", "data": { "requestId": "REQ_3" } }),
        ),
        (Method::DELETE, "/api/admin/posts/REQ_4") => StatusCode::NO_CONTENT.into_response(),
        (Method::GET, "/api/admin/statistics/users") => reply(
            StatusCode::OK,
            json!({
                "status": "success",
                "data": {
                    "totalUsers": 12,
                    "activeUsers": 9,
                    "monthlyStats": [{ "month": "2024-01", "count": 12 }]
                }
            }),
        ),
        (Method::GET, "/api/admin/statistics/tutors") => reply(
            StatusCode::OK,
            json!({ "status": "success", "data": { "totalTutors": 4 } }),
        ),
        (Method::GET, "/api/admin/statistics/posts") => reply(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "error", "message": "Post statistics unavailable" }),
        ),
        (Method::GET, "/api/admin/statistics/matches") => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "status": "error", "message": "Match statistics unavailable" }),
        ),
        (Method::GET, "/api/admin/statistics/recentUsers") => reply(
            StatusCode::OK,
            json!({
                "status": "success",
                "data": { "users": [{ "_id": "u9", "userId": "USER_9", "username": "new" }] }
            }),
        ),
        _ => reply(
            StatusCode::NOT_FOUND,
            json!({ "status": "error", "message": "Not found" }),
        ),
    }
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = MockRouter::new()
        .fallback(handle)
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });
    (format!("http://{addr}/api"), backend)
}

fn console(base_url: &str, storage: Arc<MemoryStorage>) -> AdminConsole {
    AdminConsole::with_strategies(
        ClientConfig::new(base_url),
        storage,
        Strategies {
            users: FetchStrategy::ServerPaginated,
            parents: FetchStrategy::ServerPaginated,
            teachers: FetchStrategy::FullSet,
            posts: FetchStrategy::FullSet,
        },
    )
    .expect("console must build")
}

async fn logged_in() -> (AdminConsole, Backend, Arc<MemoryStorage>) {
    let (base_url, backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::new());
    let console = console(&base_url, storage.clone());
    let response = console
        .auth()
        .login(&Credentials::new("admin", "secret"))
        .await;
    assert!(response.is_success(), "login failed: {response:?}");
    (console, backend, storage)
}

#[tokio::test]
async fn wrong_credentials_keep_console_anonymous() {
    let (base_url, backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::new());
    let console = console(&base_url, storage.clone());

    let response = console
        .auth()
        .login(&Credentials::new("admin", "wrong"))
        .await;

    assert_eq!(response, ApiResponse::error("Invalid credentials"));
    assert!(!console.auth().is_logged_in());
    assert_eq!(console.auth().error().as_deref(), Some("Invalid credentials"));
    assert_eq!(storage.get(TOKEN_KEY).expect("storage"), None);
    assert_eq!(console.navigator().target(), None);
    assert!(backend.requests("/api/auth/login")[0].authorization.is_none());
}

#[tokio::test]
async fn successful_login_persists_session() {
    let (console, _backend, storage) = logged_in().await;

    assert!(console.auth().is_logged_in());
    assert_eq!(console.auth().username(), "admin");
    assert_eq!(console.auth().custom_id(), "AD1");
    assert_eq!(storage.get(TOKEN_KEY).expect("storage").as_deref(), Some(TOKEN));
    let user = storage.get(USER_KEY).expect("storage").expect("user stored");
    assert!(user.contains("\"username\":\"admin\""));
    assert_eq!(console.navigate("/users"), Some(Route::Users));
}

#[tokio::test]
async fn unauthorized_response_clears_session_and_redirects() {
    let (base_url, _backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, "STALE").expect("storage");
    storage
        .set(USER_KEY, r#"{"username":"admin","role":"admin"}"#)
        .expect("storage");
    let console = console(&base_url, storage.clone());
    assert!(console.auth().is_logged_in());

    let response = console.users().fetch().await;

    assert_eq!(response.message(), Some("Token expired"));
    assert!(!console.auth().is_logged_in());
    assert_eq!(storage.get(TOKEN_KEY).expect("storage"), None);
    assert_eq!(storage.get(USER_KEY).expect("storage"), None);
    assert_eq!(console.navigator().target(), Some(Route::Login));
    assert_eq!(console.users().snapshot().error.as_deref(), Some("Token expired"));
}

#[tokio::test]
async fn guard_sends_anonymous_navigation_to_login() {
    let (base_url, _backend) = spawn_backend().await;
    let console = console(&base_url, Arc::new(MemoryStorage::new()));

    assert_eq!(console.navigate("/teachers/TUTOR_1"), Some(Route::Login));
    assert_eq!(console.navigate("/about"), Some(Route::Login));
    assert_eq!(console.navigate("/register"), Some(Route::Register));
    assert_eq!(console.navigate("/nowhere"), None);
}

#[tokio::test]
async fn empty_criteria_are_stripped_from_query() {
    let (console, backend, _storage) = logged_in().await;
    console.users().update_filters(|filters| {
        filters.role = Some(String::new());
        filters.status = Some("   ".to_string());
        filters.search = Some(" ann ".to_string());
    });

    let response = console.users().fetch().await;
    assert!(response.is_success());

    let seen = backend.requests("/api/admin/users/limit");
    let query = &seen[0].query;
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(query.get("search").map(String::as_str), Some("ann"));
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
    assert_eq!(query.get("limit").map(String::as_str), Some("10"));
    assert!(!query.contains_key("role"));
    assert!(!query.contains_key("status"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer T1"));
}

#[tokio::test]
async fn bare_array_response_becomes_list_page() {
    let (console, _backend, _storage) = logged_in().await;

    let page = console
        .parents()
        .fetch()
        .await
        .into_data()
        .expect("parents must load");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.pagination.total, 2);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(console.parents().snapshot().items.len(), 2);
}

#[tokio::test]
async fn verification_patches_only_matching_teacher() {
    let (console, backend, _storage) = logged_in().await;
    assert!(console.teachers().fetch().await.is_success());

    let response = console
        .teachers()
        .verify("TUTOR_1", true, Some("documents ok"))
        .await;
    assert!(response.is_success());

    let teachers = console.teachers().snapshot().items;
    let verified = teachers
        .iter()
        .find(|t| t.tutor_id.as_deref() == Some("TUTOR_1"))
        .expect("TUTOR_1 loaded");
    let untouched = teachers
        .iter()
        .find(|t| t.tutor_id.as_deref() == Some("TUTOR_2"))
        .expect("TUTOR_2 loaded");
    assert!(verified.verified);
    assert_eq!(verified.verification_note.as_deref(), Some("documents ok"));
    assert!(verified.verified_at.is_some());
    assert!(!untouched.verified);
    assert!(untouched.verified_at.is_none());

    let body = &backend.requests("/api/admin/tutors/TUTOR_1/verify")[0].body;
    assert_eq!(body, &json!({ "verified": true, "verificationNote": "documents ok" }));
    assert_eq!(console.teachers().statistics().verified, Some(1));
}

#[tokio::test]
async fn get_by_id_hits_server_once() {
    let (console, backend, _storage) = logged_in().await;

    let first = console.teachers().get_by_id("TUTOR_9").await;
    let second = console.teachers().get_by_id("t9").await;

    assert_eq!(first.data(), second.data());
    assert_eq!(backend.requests("/api/admin/tutors/TUTOR_9").len(), 1);
    assert_eq!(console.teachers().snapshot().items.len(), 1);
}

#[tokio::test]
async fn published_filter_selects_approved_posts() {
    let (console, _backend, _storage) = logged_in().await;
    assert!(console.posts().fetch().await.is_success());

    console
        .posts()
        .update_filters(|filters| filters.status = Some("published".to_string()));
    let posts = console.posts().filtered_items();

    assert_eq!(posts.len(), 5);
    assert!(posts.iter().all(|post| post.status == "approved"));
    assert_eq!(posts[0].request_id.as_deref(), Some("REQ_25"));
}

#[tokio::test]
async fn full_set_pagination_stays_within_limit() {
    let (console, _backend, _storage) = logged_in().await;
    assert!(console.posts().fetch().await.is_success());

    assert_eq!(console.posts().paginated_items().len(), 20);
    assert!(console.posts().change_page(2));
    let second = console.posts().paginated_items();
    let pagination = console.posts().snapshot().pagination;

    assert_eq!(second.len(), 5);
    assert_eq!(pagination.total, 25);
    assert_eq!(pagination.pages, 2);
    assert!(!console.posts().change_page(0));
}

#[tokio::test]
async fn server_page_never_exceeds_requested_limit() {
    let (console, _backend, _storage) = logged_in().await;
    console.parents().update_filters(|filters| filters.limit = 1);

    assert!(console.parents().fetch().await.is_success());
    let state = console.parents().snapshot();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].parent_id.as_deref(), Some("PARENT_1"));
    assert_eq!(state.pagination.total, 2);
    assert_eq!(state.pagination.pages, 2);
    assert!(console.parents().paginated_items().len() as u32 <= state.pagination.limit);

    assert!(console.parents().change_page(2));
    assert!(console.parents().fetch().await.is_success());
    let state = console.parents().snapshot();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].parent_id.as_deref(), Some("PARENT_2"));
    assert_eq!(state.items[0].status, "");
    assert!(state.items[0].created_at.is_none());
}

#[tokio::test]
async fn lookup_outside_server_page_goes_to_current_only() {
    let (base_url, backend) = spawn_backend().await;
    let console = AdminConsole::with_strategies(
        ClientConfig::new(base_url),
        Arc::new(MemoryStorage::new()),
        Strategies {
            teachers: FetchStrategy::ServerPaginated,
            ..Strategies::default()
        },
    )
    .expect("console must build");
    let login = console
        .auth()
        .login(&Credentials::new("admin", "secret"))
        .await;
    assert!(login.is_success());

    let first = console.teachers().get_by_id("TUTOR_9").await;
    let second = console.teachers().get_by_id("t9").await;

    assert!(first.is_success());
    assert_eq!(first.data(), second.data());
    let state = console.teachers().snapshot();
    assert!(state.items.is_empty());
    assert_eq!(
        state.current.as_ref().and_then(|t| t.tutor_id.as_deref()),
        Some("TUTOR_9")
    );
    assert_eq!(backend.requests("/api/admin/tutors/TUTOR_9").len(), 1);
}

#[tokio::test]
async fn statistics_keep_loaded_metrics_when_others_fail() {
    let (console, backend, _storage) = logged_in().await;
    console.statistics().set_period(Period::Week);

    let response = console.statistics().fetch_all().await;

    assert_eq!(response.message(), Some("Post statistics unavailable"));
    let state = console.statistics().snapshot();
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Post statistics unavailable"));
    assert_eq!(console.statistics().user_statistics().total_users, 12);
    assert_eq!(state.tutors.as_ref().map(|s| s.count("totalTutors")), Some(4));
    assert!(state.posts.is_none());
    assert!(state.matches.is_none());
    assert_eq!(state.recent_users.len(), 1);

    let seen = backend.requests("/api/admin/statistics/users");
    assert_eq!(seen[0].query.get("period").map(String::as_str), Some("week"));
    assert!(seen[0].query.contains_key("startDate"));
    assert!(seen[0].query.contains_key("endDate"));
    assert_eq!(state.filters.period, Period::Week);
    assert_eq!(state.filters.start_date, None);
    assert_eq!(state.filters.end_date, None);
}

#[tokio::test]
async fn teacher_status_change_is_written_through() {
    let (console, backend, _storage) = logged_in().await;
    assert!(console.teachers().fetch().await.is_success());

    let response = console
        .teachers()
        .update_status("TUTOR_2", AccountStatus::Suspended, Some("fake documents"))
        .await;
    assert!(response.is_success());

    let teachers = console.teachers().snapshot().items;
    let changed = teachers
        .iter()
        .find(|t| t.tutor_id.as_deref() == Some("TUTOR_2"))
        .expect("TUTOR_2 loaded");
    let untouched = teachers
        .iter()
        .find(|t| t.tutor_id.as_deref() == Some("TUTOR_1"))
        .expect("TUTOR_1 loaded");
    assert_eq!(changed.status, "suspended");
    assert_eq!(changed.status_note.as_deref(), Some("fake documents"));
    assert!(changed.status_updated_at.is_some());
    assert_eq!(untouched.status, "active");
    assert!(untouched.status_updated_at.is_none());

    let body = &backend.requests("/api/admin/tutors/TUTOR_2/status")[0].body;
    assert_eq!(body, &json!({ "status": "suspended", "statusNote": "fake documents" }));
}

#[tokio::test]
async fn post_review_and_delete_update_loaded_set() {
    let (console, backend, _storage) = logged_in().await;
    assert!(console.posts().fetch().await.is_success());

    let reviewed = console
        .posts()
        .review("REQ_3", PostStatus::Rejected, None)
        .await;
    assert!(reviewed.is_success());
    let deleted = console.posts().delete("REQ_4").await;
    assert!(deleted.is_success(), "204 must count as success: {deleted:?}");

    let state = console.posts().snapshot();
    let post = state
        .items
        .iter()
        .find(|p| p.request_id.as_deref() == Some("REQ_3"))
        .expect("REQ_3 kept");
    assert_eq!(post.status, "rejected");
    assert!(post.review_note.is_none());
    assert!(post.reviewed_at.is_some());
    assert!(!state.items.iter().any(|p| p.request_id.as_deref() == Some("REQ_4")));
    assert_eq!(state.items.len(), 24);
    assert_eq!(state.pagination.total, 24);

    let body = &backend.requests("/api/admin/posts/REQ_3/status")[0].body;
    assert_eq!(body, &json!({ "status": "rejected" }));
    assert_eq!(backend.requests("/api/admin/posts/REQ_4")[0].method, Method::DELETE);
}

#[tokio::test]
async fn user_update_merges_fields_locally() {
    let (console, backend, _storage) = logged_in().await;
    assert!(console.users().fetch().await.is_success());

    let patch = json!({ "username": "anna", "phone": "0901234567" });
    let patch = patch.as_object().cloned().expect("object patch");
    assert!(console.users().update("USER_2", patch).await.is_success());

    let user = console.users().snapshot().items[0].clone();
    assert_eq!(user.username, "anna");
    assert_eq!(user.phone.as_deref(), Some("0901234567"));
    assert_eq!(user.role, "parent");
    assert_eq!(user.storage_id.as_deref(), Some("u2"));

    let seen = backend.requests("/api/admin/users/USER_2");
    assert_eq!(seen[0].method, Method::PATCH);
    assert_eq!(seen[0].body, json!({ "username": "anna", "phone": "0901234567" }));
}

#[tokio::test]
async fn unreachable_backend_reports_no_response_and_keeps_session() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);

    let storage = Arc::new(MemoryStorage::new());
    storage.set(TOKEN_KEY, TOKEN).expect("storage");
    storage
        .set(USER_KEY, r#"{"username":"admin","role":"admin"}"#)
        .expect("storage");
    let console = console(&format!("http://{addr}/api"), storage.clone());

    let response = console.users().fetch().await;

    assert_eq!(response.message(), Some(NO_RESPONSE));
    assert!(console.auth().is_logged_in());
    assert_eq!(console.navigator().target(), None);
    assert_eq!(console.users().snapshot().error.as_deref(), Some(NO_RESPONSE));
    assert_eq!(storage.get(TOKEN_KEY).expect("storage").as_deref(), Some(TOKEN));

    let login = console
        .auth()
        .login(&Credentials::new("admin", "secret"))
        .await;
    assert_eq!(login.message(), Some(NO_RESPONSE));
}

#[tokio::test]
async fn post_storage_id_is_sent_untranslated() {
    let (console, backend, _storage) = logged_in().await;
    let storage_id = format!("{:024x}", 3);

    let response = console.posts().get(&storage_id).await;

    assert_eq!(response.message(), Some("Not found"));
    assert_eq!(
        backend
            .requests(&format!("/api/admin/posts/{storage_id}"))
            .len(),
        1
    );
    assert!(backend.requests("/api/admin/posts/REQ_3").is_empty());
    assert!(console.posts().snapshot().current.is_none());
}
