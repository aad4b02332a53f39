//! In-process stand-in for the portal backend, used by the HTTP tests.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PASSWORD: &str = "password123";
pub const RECRUITER_EMAIL: &str = "recruiter@example.com";
pub const COMPANY_EMAIL: &str = "contact@techventure.com";

#[derive(Clone)]
struct StubUser {
    id: &'static str,
    email: &'static str,
    role: &'static str,
    token: &'static str,
}

const USERS: [StubUser; 2] = [
    StubUser {
        id: "u-recruiter",
        email: RECRUITER_EMAIL,
        role: "recruiter",
        token: "tok-recruiter",
    },
    StubUser {
        id: "u-company",
        email: COMPANY_EMAIL,
        role: "company",
        token: "tok-company",
    },
];

#[derive(Default)]
pub struct StubState {
    pub jobs: Vec<Value>,
    pub recommendations: Vec<Value>,
    pub seen_auth: Vec<Option<String>>,
    next_id: u64,
}

impl StubState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

pub type Shared = Arc<Mutex<StubState>>;

fn seed(state: &mut StubState) {
    let company = json!({"_id": "c1", "name": "TechVenture"});
    state.jobs = vec![
        json!({"_id": "j1", "title": "Senior Rust Engineer", "department": "Engineering",
               "level": "Senior", "location": "Berlin", "remote": "Hybrid",
               "description": "Systems work", "skills": ["Rust"], "priority": "urgent",
               "status": "open", "company": company,
               "salaryRange": {"min": 90000, "max": 120000, "currency": "EUR"}}),
        json!({"_id": "j2", "id": "j2", "title": "Product Manager", "department": "Product",
               "level": "Mid", "location": "London", "remote": "On-site",
               "description": "Roadmaps", "skills": [], "priority": "normal",
               "status": "closed", "company": company}),
        json!({"_id": "j3", "title": "Growth Marketer", "department": "Marketing",
               "level": "Junior", "location": "Remote", "remote": "Remote",
               "description": "Funnels", "skills": ["SEO"], "priority": "normal",
               "status": "open", "company": {"_id": "c2", "name": "Seedling"},
               "salaryRange": {"currency": "USD"}}),
    ];
}

/// Start the stub on an ephemeral port; returns its API base URL.
pub async fn spawn() -> (String, Shared) {
    let mut state = StubState::default();
    seed(&mut state);
    let shared: Shared = Arc::new(Mutex::new(state));

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/stats/overview", get(stats))
        .route("/jobs/{id}", get(get_job))
        .route("/recommendations", get(list_recs).post(create_rec))
        .route("/recommendations/{id}/submit", post(submit_rec))
        .route("/recommendations/{id}/feedback", post(feedback_rec))
        .with_state(shared.clone());
    (serve(api).await, shared)
}

/// Serve `api` under `/api` on an ephemeral port; returns its base URL.
pub async fn serve(api: Router) -> String {
    let app = Router::new().nest("/api", api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn caller(state: &Shared, headers: &HeaderMap) -> Result<StubUser, Response> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().seen_auth.push(header.clone());

    let token = header.as_deref().and_then(|h| h.strip_prefix("Bearer "));
    USERS
        .iter()
        .find(|u| Some(u.token) == token)
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "No valid token"))
}

fn matches_filters(value: &Value, filters: &HashMap<String, String>) -> bool {
    filters
        .iter()
        .all(|(k, v)| value.get(k).and_then(Value::as_str) == Some(v.as_str()))
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match USERS.iter().find(|u| u.email == email) {
        Some(u) if password == PASSWORD => Json(json!({
            "token": u.token,
            "user": {"id": u.id, "role": u.role, "email": u.email}
        }))
        .into_response(),
        _ => fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn list_jobs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(filters): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = caller(&state, &headers) {
        return r;
    }
    let s = state.lock().unwrap();
    let jobs: Vec<Value> = s.jobs.iter().filter(|j| matches_filters(j, &filters)).cloned().collect();
    Json(jobs).into_response()
}

async fn get_job(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(r) = caller(&state, &headers) {
        return r;
    }
    let s = state.lock().unwrap();
    match s.jobs.iter().find(|j| j["_id"] == id.as_str()) {
        Some(job) => Json(job.clone()).into_response(),
        None => fail(StatusCode::NOT_FOUND, "Job not found"),
    }
}

async fn create_job(State(state): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.role != "company" {
        return fail(StatusCode::FORBIDDEN, "Only companies can post jobs");
    }
    for field in ["title", "description", "location"] {
        if body[field].as_str().is_none_or(str::is_empty) {
            return fail(StatusCode::BAD_REQUEST, &format!("{field} is required"));
        }
    }
    let mut s = state.lock().unwrap();
    body["_id"] = json!(s.next_id("job-"));
    body["status"] = json!("open");
    body["company"] = json!({"_id": "c1", "name": "TechVenture"});
    s.jobs.push(body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn stats(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = caller(&state, &headers) {
        return r;
    }
    let s = state.lock().unwrap();
    let open = s.jobs.iter().filter(|j| j["status"] == "open").count();
    let urgent = s
        .jobs
        .iter()
        .filter(|j| j["status"] == "open" && j["priority"] == "urgent")
        .count();
    Json(json!({"openJobs": open, "totalCompanies": 2, "urgentJobs": urgent})).into_response()
}

async fn list_recs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(filters): Query<HashMap<String, String>>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let s = state.lock().unwrap();
    let recs: Vec<Value> = s
        .recommendations
        .iter()
        .filter(|r| match user.role {
            "recruiter" => r["recruiter"] == user.id,
            _ => r["status"] != "draft",
        })
        .filter(|r| matches_filters(r, &filters))
        .cloned()
        .collect();
    Json(recs).into_response()
}

async fn create_rec(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user = match caller(&state, &headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.role != "recruiter" {
        return fail(StatusCode::FORBIDDEN, "Only recruiters can recommend");
    }
    let mut s = state.lock().unwrap();
    let job_id = body["jobId"].as_str().unwrap_or_default().to_string();
    let Some(job) = s.jobs.iter().find(|j| j["_id"] == job_id.as_str()).cloned() else {
        return fail(StatusCode::NOT_FOUND, "Job not found");
    };
    if body["candidate"]["name"].as_str().is_none_or(str::is_empty) {
        return fail(StatusCode::BAD_REQUEST, "candidate.name is required");
    }
    let rec = json!({
        "_id": s.next_id("rec-"),
        "job": {"_id": job["_id"], "title": job["title"], "company": job["company"]},
        "recruiter": user.id,
        "candidate": body["candidate"],
        "recruiterNotes": body["recruiterNotes"],
        "status": body["status"].as_str().unwrap_or("draft"),
    });
    s.recommendations.push(rec.clone());
    (StatusCode::CREATED, Json(rec)).into_response()
}

async fn submit_rec(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(r) = caller(&state, &headers) {
        return r;
    }
    let mut s = state.lock().unwrap();
    let Some(rec) = s.recommendations.iter_mut().find(|r| r["_id"] == id.as_str()) else {
        return fail(StatusCode::NOT_FOUND, "Recommendation not found");
    };
    if rec["status"] != "draft" {
        return fail(StatusCode::CONFLICT, "Recommendation already submitted");
    }
    rec["status"] = json!("submitted");
    Json(rec.clone()).into_response()
}

async fn feedback_rec(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let user = match caller(&state, &headers) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.role != "company" {
        return fail(StatusCode::FORBIDDEN, "Only companies can leave feedback");
    }
    let mut s = state.lock().unwrap();
    let Some(rec) = s.recommendations.iter_mut().find(|r| r["_id"] == id.as_str()) else {
        return fail(StatusCode::NOT_FOUND, "Recommendation not found");
    };
    rec["companyFeedback"] = body["feedback"].clone();
    rec["status"] = body["status"].clone();
    Json(rec.clone()).into_response()
}
