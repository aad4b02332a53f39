use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    Candidate, Feedback, Filters, Job, JobDraft, LoginResponse, NewRecommendation, Recommendation,
    RecommendationStatus, Session, Stats,
};
use crate::session::SessionStore;

/// Typed client for the portal backend.
///
/// The bearer token is read from the injected [`SessionStore`] when each
/// request is built, so a login or logout through any handle applies to the
/// next call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionStore) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        tracing::debug!(%method, path, status = status.as_u16(), "api response");
        let text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status, &text);
            tracing::warn!(%method, path, status = ?err.status(), error = %err, "api error");
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(format!("{method} {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, filters: &Filters) -> Result<T, ApiError> {
        let mut builder = self.request(Method::GET, path);
        if !filters.is_empty() {
            builder = builder.query(filters);
        }
        self.send(Method::GET, path, builder).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<&impl Serialize>) -> Result<T, ApiError> {
        let mut builder = self.request(Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(Method::POST, path, builder).await
    }

    // --- Auth ---

    /// Exchange credentials for a session and persist it. Any non-2xx
    /// response is an authentication failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response: LoginResponse = self
            .post("/auth/login", Some(&body))
            .await
            .map_err(|e| match e {
                ApiError::Validation { status, message }
                | ApiError::Server { status, message } => ApiError::Auth { status, message },
                ApiError::NotFound { message } => ApiError::Auth { status: 404, message },
                ApiError::Conflict { message } => ApiError::Auth { status: 409, message },
                other => other,
            })?;

        let user = match response.user {
            Some(user) if !response.token.is_empty() => user,
            _ => return Err(ApiError::Decode("login response carried no token".to_string())),
        };
        let session = Session {
            token: response.token,
            user,
        };
        self.session.save(&session)?;
        tracing::info!(email = %session.user.email, role = %session.role(), "logged in");
        Ok(session)
    }

    /// Drop the local session. The backend is not contacted.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.clear()?;
        tracing::info!("logged out");
        Ok(())
    }

    // --- Jobs ---

    pub async fn list_jobs(&self, filters: &Filters) -> Result<Vec<Job>, ApiError> {
        self.get("/jobs", filters).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        self.get(&format!("/jobs/{id}"), &Filters::new()).await
    }

    pub async fn create_job(&self, draft: &JobDraft) -> Result<Job, ApiError> {
        self.post("/jobs", Some(draft)).await
    }

    pub async fn job_stats(&self) -> Result<Stats, ApiError> {
        self.get("/jobs/stats/overview", &Filters::new()).await
    }

    // --- Recommendations ---

    pub async fn list_recommendations(&self, filters: &Filters) -> Result<Vec<Recommendation>, ApiError> {
        self.get("/recommendations", filters).await
    }

    pub async fn create_recommendation(
        &self,
        job_id: &str,
        candidate: Candidate,
        notes: &str,
        status: RecommendationStatus,
    ) -> Result<Recommendation, ApiError> {
        let body = NewRecommendation {
            job_id: job_id.to_string(),
            candidate,
            recruiter_notes: notes.to_string(),
            status,
        };
        self.post("/recommendations", Some(&body)).await
    }

    /// Move a draft to `submitted`. The backend answers 409 for anything
    /// that is not a draft.
    pub async fn submit_recommendation(&self, id: &str) -> Result<Recommendation, ApiError> {
        self.post(&format!("/recommendations/{id}/submit"), None::<&()>).await
    }

    pub async fn add_feedback(&self, id: &str, feedback: &Feedback) -> Result<Recommendation, ApiError> {
        self.post(&format!("/recommendations/{id}/feedback"), Some(feedback)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobLevel, JobStatus, Priority, RemoteMode, Role, SalaryRange, filters};
    use crate::stub::{self, COMPANY_EMAIL, PASSWORD, RECRUITER_EMAIL};

    async fn client() -> (ApiClient, stub::Shared, tempfile::TempDir) {
        let (url, state) = stub::spawn().await;
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_api_url(&url, dir.path().to_path_buf());
        let client = ApiClient::new(&config, SessionStore::open(dir.path())).unwrap();
        (client, state, dir)
    }

    fn candidate(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            current_role: "Engineer".to_string(),
            years_of_experience: Some(6),
            ..Default::default()
        }
    }

    fn draft(salary_range: Option<SalaryRange>) -> JobDraft {
        JobDraft {
            title: "Staff Engineer".to_string(),
            department: "Engineering".to_string(),
            level: JobLevel::Lead,
            location: "NYC".to_string(),
            remote: RemoteMode::Hybrid,
            description: "Lead the platform team".to_string(),
            skills: vec!["Rust".to_string(), "Kubernetes".to_string()],
            priority: Priority::Normal,
            salary_range,
        }
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let (client, _, _dir) = client().await;
        let session = client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        assert_eq!(session.role(), Role::Recruiter);
        assert_eq!(client.session().get(), Some(session));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_auth_error() {
        let (client, _, _dir) = client().await;
        let err = client.login(RECRUITER_EMAIL, "wrong").await.unwrap_err();

        match err {
            ApiError::Auth { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message.as_deref(), Some("Invalid credentials"));
            }
            other => panic!("expected auth error, got {other:?}"),
        }
        assert_eq!(client.session().get(), None);
    }

    #[tokio::test]
    async fn test_bearer_token_attached_only_when_logged_in() {
        let (client, state, _dir) = client().await;

        let err = client.list_jobs(&Filters::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth { status: 401, .. }));

        client.login(COMPANY_EMAIL, PASSWORD).await.unwrap();
        client.list_jobs(&Filters::new()).await.unwrap();

        let seen = state.lock().unwrap().seen_auth.clone();
        assert_eq!(seen, vec![None, Some("Bearer tok-company".to_string())]);
    }

    #[tokio::test]
    async fn test_logout_stops_sending_token() {
        let (client, _, _dir) = client().await;
        client.login(COMPANY_EMAIL, PASSWORD).await.unwrap();
        client.logout().unwrap();

        assert_eq!(client.session().get(), None);
        assert!(matches!(
            client.job_stats().await.unwrap_err(),
            ApiError::Auth { .. }
        ));
    }

    #[tokio::test]
    async fn test_status_filter_returns_only_open_jobs() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let jobs = client.list_jobs(&filters(&[("status", "open")])).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Open));

        let all = client.list_jobs(&Filters::new()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_list_tolerates_partial_salary_and_virtual_id() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let jobs = client.list_jobs(&Filters::new()).await.unwrap();
        let pm = jobs.iter().find(|j| j.id == "j2").unwrap();
        assert_eq!(pm.title, "Product Manager");
        let growth = jobs.iter().find(|j| j.id == "j3").unwrap();
        assert!(growth.salary_range.is_some());
        assert_eq!(growth.salary(), None);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let err = client.get_job("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(err.server_message(), Some("Job not found"));

        let job = client.get_job("j1").await.unwrap();
        assert_eq!(job.company_name(), Some("TechVenture"));
    }

    #[tokio::test]
    async fn test_create_job_with_and_without_salary() {
        let (client, _, _dir) = client().await;
        client.login(COMPANY_EMAIL, PASSWORD).await.unwrap();

        let range = SalaryRange::new(100000.0, 150000.0, "USD");
        let job = client.create_job(&draft(Some(range.clone()))).await.unwrap();
        assert_eq!(job.salary_range, Some(range));
        assert_eq!(job.skills, vec!["Rust", "Kubernetes"]);

        let job = client.create_job(&draft(None)).await.unwrap();
        assert_eq!(job.salary_range, None);
    }

    #[tokio::test]
    async fn test_rejected_job_payload_is_validation_error() {
        let (client, _, _dir) = client().await;
        client.login(COMPANY_EMAIL, PASSWORD).await.unwrap();

        let mut bad = draft(None);
        bad.title.clear();
        let err = client.create_job(&bad).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_stats() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let stats = client.job_stats().await.unwrap();
        assert_eq!(stats, Stats { open_jobs: 2, total_companies: 2, urgent_jobs: 1 });
    }

    #[tokio::test]
    async fn test_created_recommendation_is_listed_with_its_status() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let draft = client
            .create_recommendation("j1", candidate("Ada"), "Strong systems background", RecommendationStatus::Draft)
            .await
            .unwrap();
        let submitted = client
            .create_recommendation("j3", candidate("Grace"), "Great marketer", RecommendationStatus::Submitted)
            .await
            .unwrap();

        let listed = client.list_recommendations(&Filters::new()).await.unwrap();
        let find = |id: &str| listed.iter().find(|r| r.id == id).unwrap();
        assert_eq!(find(&draft.id).status, RecommendationStatus::Draft);
        assert_eq!(find(&submitted.id).status, RecommendationStatus::Submitted);
        assert_eq!(find(&draft.id).candidate.years_of_experience, Some(6));
        assert_eq!(find(&draft.id).recruiter_notes, "Strong systems background");
    }

    #[tokio::test]
    async fn test_resubmitting_is_a_conflict_and_keeps_status() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();

        let rec = client
            .create_recommendation("j1", candidate("Ada"), "notes", RecommendationStatus::Draft)
            .await
            .unwrap();
        let rec = client.submit_recommendation(&rec.id).await.unwrap();
        assert_eq!(rec.status, RecommendationStatus::Submitted);

        let err = client.submit_recommendation(&rec.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));

        let listed = client.list_recommendations(&Filters::new()).await.unwrap();
        assert_eq!(listed[0].status, RecommendationStatus::Submitted);
    }

    #[tokio::test]
    async fn test_company_feedback_round_trip() {
        let (client, _, _dir) = client().await;
        client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap();
        let rec = client
            .create_recommendation("j1", candidate("Ada"), "notes", RecommendationStatus::Submitted)
            .await
            .unwrap();

        client.login(COMPANY_EMAIL, PASSWORD).await.unwrap();
        let feedback = Feedback {
            feedback: "Let's talk".to_string(),
            status: RecommendationStatus::Shortlisted,
        };
        let updated = client.add_feedback(&rec.id, &feedback).await.unwrap();
        assert_eq!(updated.status, RecommendationStatus::Shortlisted);
        assert_eq!(updated.feedback(), Some("Let's talk"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        // Port 9 (discard) on loopback is closed in test environments.
        let config = Config::with_api_url("http://127.0.0.1:9/api", dir.path().to_path_buf());
        let client = ApiClient::new(&config, SessionStore::open(dir.path())).unwrap();

        let err = client.login(RECRUITER_EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(err.status(), None);
    }
}
