use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use shared::{
    domain::{EnrollmentId, UserId},
    error::ErrorCode,
    protocol::{FailedUser, IdValue, UserToAdd},
};
use tokio::{net::TcpListener, sync::Mutex};

const LOCKED_SECTION: i64 = 13;
const GARBLED_SECTION: i64 = 99;

#[derive(Clone, Default)]
struct ServerState {
    removed: Arc<Mutex<Vec<RemoveFromSectionForm>>>,
    added: Arc<Mutex<Vec<AddToSectionRequest>>>,
}

async fn member_list(Path(section_id): Path<i64>) -> String {
    format!(
        r#"<ul id="people-list"><li class="list-student"><a class="icon-removeUser" id="{}"></a><span class="studentName">Section {section_id}</span></li></ul>"#,
        section_id * 10
    )
}

async fn class_list(Path(section_id): Path<i64>) -> String {
    format!(r#"<ul id="people-in-course" data-section="{section_id}"></ul>"#)
}

async fn remove_handler(
    State(state): State<ServerState>,
    Form(form): Form<RemoveFromSectionForm>,
) -> impl IntoResponse {
    if form.section_id.0 == LOCKED_SECTION {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "message": "Registrar-fed sections cannot be edited."
            })),
        );
    }
    state.removed.lock().await.push(form);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn add_handler(
    State(state): State<ServerState>,
    Json(request): Json<AddToSectionRequest>,
) -> axum::response::Response {
    if request.section_id.0 == GARBLED_SECTION {
        return (StatusCode::OK, "<html>proxy login</html>").into_response();
    }
    let failed: Vec<_> = request
        .users_to_add
        .iter()
        .skip(1)
        .map(|user| {
            json!({
                "enrollment_user_id": user.enrollment_user_id.0.to_string(),
                "enrollment_role": user.enrollment_role,
                "enrollment_type": user.enrollment_type,
            })
        })
        .collect();
    let added = request.users_to_add.len() - failed.len();
    state.added.lock().await.push(request);
    Json(json!({ "added": added, "failed": failed })).into_response()
}

async fn spawn_roster_server() -> anyhow::Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let tool = Router::new()
        .route("/section_user_list/:section_id", get(member_list))
        .route("/sections/:section_id/classlist", get(class_list))
        .route("/remove_from_section", post(remove_handler))
        .route("/add_to_section", post(add_handler))
        .with_state(state.clone());
    let app = Router::new().nest("/tool/manage_sections", tool);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/tool/manage_sections"), state))
}

fn backend_for(base_url: &str) -> HttpRosterBackend {
    let endpoints = RosterEndpoints::new(base_url).expect("endpoints");
    HttpRosterBackend::new(endpoints, Duration::from_secs(5)).expect("backend")
}

fn user(id: i64) -> UserToAdd {
    UserToAdd {
        enrollment_user_id: UserId(id),
        enrollment_role: "Student".into(),
        enrollment_type: "StudentEnrollment".into(),
    }
}

#[test]
fn endpoints_resolve_under_the_tool_mount() {
    for base in [
        "https://lti.example.edu/tool/manage_sections",
        "https://lti.example.edu/tool/manage_sections/",
    ] {
        let endpoints = RosterEndpoints::new(base).expect("endpoints");
        assert_eq!(
            endpoints.member_list(SectionId(42)).expect("url").as_str(),
            "https://lti.example.edu/tool/manage_sections/section_user_list/42"
        );
        assert_eq!(
            endpoints.candidate_list(SectionId(42)).expect("url").as_str(),
            "https://lti.example.edu/tool/manage_sections/sections/42/classlist"
        );
        assert_eq!(
            endpoints.remove_from_section().expect("url").as_str(),
            "https://lti.example.edu/tool/manage_sections/remove_from_section"
        );
        assert_eq!(
            endpoints.add_to_section().expect("url").as_str(),
            "https://lti.example.edu/tool/manage_sections/add_to_section"
        );
    }
}

#[test]
fn malformed_base_url_is_rejected() {
    let err = RosterEndpoints::new("not a url").expect_err("invalid");
    assert!(matches!(err, RosterError::InvalidEndpoint(_)));
}

#[tokio::test]
async fn fetches_member_and_candidate_fragments() {
    let (base_url, _state) = spawn_roster_server().await.expect("spawn server");
    let backend = backend_for(&base_url);

    let members = backend
        .fetch_member_fragment(SectionId(7))
        .await
        .expect("members");
    assert!(members.contains(r#"id="70""#));
    assert!(members.contains("Section 7"));

    let candidates = backend
        .fetch_candidate_fragment(SectionId(7))
        .await
        .expect("candidates");
    assert!(candidates.contains(r#"data-section="7""#));
}

#[tokio::test]
async fn remove_posts_form_body() {
    let (base_url, state) = spawn_roster_server().await.expect("spawn server");
    let backend = backend_for(&base_url);
    let form = RemoveFromSectionForm {
        user_section_id: EnrollmentId(5521),
        section_id: SectionId(7),
    };

    backend.remove_from_section(&form).await.expect("remove");
    assert_eq!(*state.removed.lock().await, vec![form]);
}

#[tokio::test]
async fn rejected_remove_surfaces_server_message() {
    let (base_url, state) = spawn_roster_server().await.expect("spawn server");
    let backend = backend_for(&base_url);

    let err = backend
        .remove_from_section(&RemoveFromSectionForm {
            user_section_id: EnrollmentId(1),
            section_id: SectionId(LOCKED_SECTION),
        })
        .await
        .expect_err("locked section");
    assert!(err.is_transport_failure());
    match err {
        RosterError::Rejected { endpoint, source } => {
            assert!(endpoint.ends_with("/remove_from_section"));
            assert_eq!(source.status, 422);
            assert_eq!(source.code, ErrorCode::Unprocessable);
            assert_eq!(source.message, "Registrar-fed sections cannot be edited.");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(state.removed.lock().await.is_empty());
}

#[tokio::test]
async fn add_posts_json_and_reads_failed_list() {
    let (base_url, state) = spawn_roster_server().await.expect("spawn server");
    let backend = backend_for(&base_url);
    let request = AddToSectionRequest {
        section_id: SectionId(7),
        users_to_add: vec![user(1), user(2), user(3)],
    };

    let response = backend.add_to_section(&request).await.expect("add");
    assert_eq!(response.added, Some(1));
    assert_eq!(response.failed.len(), 2);
    assert!(matches!(
        &response.failed[0],
        FailedUser::Echoed { enrollment_user_id: IdValue::Text(raw), .. } if raw == "2"
    ));
    let failed_ids: Vec<_> = response
        .failed
        .iter()
        .filter_map(FailedUser::user_id)
        .collect();
    assert_eq!(failed_ids, vec![UserId(2), UserId(3)]);
    assert_eq!(*state.added.lock().await, vec![request]);
}

#[tokio::test]
async fn unreadable_add_response_is_reported() {
    let (base_url, _state) = spawn_roster_server().await.expect("spawn server");
    let backend = backend_for(&base_url);

    let err = backend
        .add_to_section(&AddToSectionRequest {
            section_id: SectionId(GARBLED_SECTION),
            users_to_add: vec![user(1)],
        })
        .await
        .expect_err("garbled body");
    assert!(matches!(err, RosterError::InvalidResponse { .. }));
    assert!(err.is_transport_failure());
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let backend = backend_for(&format!("http://{addr}/"));
    let err = backend
        .fetch_member_fragment(SectionId(1))
        .await
        .expect_err("connection refused");
    assert!(matches!(err, RosterError::Request { .. }));
}
