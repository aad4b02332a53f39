use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::guard::Route;
use crate::models::{
    Candidate, Feedback, Filters, Job, JobDraft, JobLevel, Priority, Recommendation,
    RecommendationStatus, RemoteMode, Role, SalaryRange, Session, Stats, filters,
};

/// Number of jobs shown on either dashboard.
pub const RECENT_JOBS: usize = 5;
pub const EMPTY_RECOMMENDATIONS: &str = "No recommendations yet";
pub const LOGIN_FAILED: &str = "Login failed";
pub const SUBMIT_CONFIRM: &str = "Submit this recommendation to the company?";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be a whole number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("status must be one of reviewed, shortlisted, interviewing, offered, rejected (got {0:?})")]
    InvalidFeedbackStatus(String),
    #[error("status must be draft or submitted (got {0:?})")]
    InvalidDraftStatus(String),
}

/// What a view shows when an action fails.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Form(#[from] FormError),
    /// A failed mutation; `ack` is the message the user acknowledges.
    #[error("{ack}")]
    Action {
        ack: &'static str,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Load(#[from] ApiError),
}

impl ViewError {
    fn action(ack: &'static str) -> impl FnOnce(ApiError) -> ViewError {
        move |source| ViewError::Action { ack, source }
    }
}

// --- Late-response guard ---

/// Generation counter owned by one view instance. Every load takes a
/// [`Ticket`]; a result is applied only if no newer load started and the
/// view was not unmounted in the meantime.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl ViewScope {
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn unmount(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

/// Local state of a mounted view plus its scope.
#[derive(Debug)]
pub struct View<T> {
    scope: ViewScope,
    state: ViewState<T>,
}

impl<T> Default for View<T> {
    fn default() -> Self {
        Self {
            scope: ViewScope::default(),
            state: ViewState::Loading,
        }
    }
}

// Loads still in flight against a dropped view must not apply.
impl<T> Drop for View<T> {
    fn drop(&mut self) {
        self.scope.unmount();
    }
}

impl<T> View<T> {
    #[cfg(test)]
    pub fn scope(&self) -> ViewScope {
        self.scope.clone()
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn begin(&mut self) -> Ticket {
        self.state = ViewState::Loading;
        self.scope.begin()
    }

    /// Apply a finished load. Returns false when the result was stale and
    /// discarded.
    pub fn settle(&mut self, ticket: Ticket, result: Result<T, ApiError>) -> bool {
        if !self.scope.is_current(ticket) {
            tracing::debug!("discarding stale view result");
            return false;
        }
        self.state = match result {
            Ok(data) => ViewState::Ready(data),
            Err(e) => {
                tracing::warn!(error = %e, "view load failed");
                ViewState::Failed(e.to_string())
            }
        };
        true
    }
}

/// Run `load` under a fresh ticket and settle the view with its outcome.
pub async fn mount<T, F>(view: &mut View<T>, load: F) -> bool
where
    F: Future<Output = Result<T, ApiError>>,
{
    let ticket = view.begin();
    let result = load.await;
    view.settle(ticket, result)
}

// --- Login ---

/// Log in and return the dashboard to land on, or the banner to show.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<Route, String> {
    match client.login(email, password).await {
        Ok(session) => Ok(Route::dashboard(session.role())),
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            Err(match e {
                ApiError::Network(_) | ApiError::Decode(_) | ApiError::Session(_) => LOGIN_FAILED.to_string(),
                other => other.server_message().unwrap_or(LOGIN_FAILED).to_string(),
            })
        }
    }
}

// --- Dashboards ---

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: Stats,
    pub jobs: Vec<Job>,
}

/// Stats and job list fetched together; either failing fails the whole
/// dashboard. Recruiters see open jobs, companies see all of theirs.
pub async fn load_dashboard(client: &ApiClient, session: &Session) -> Result<Dashboard, ApiError> {
    let job_filters = match session.role() {
        Role::Recruiter => filters(&[("status", "open")]),
        Role::Company => Filters::new(),
    };
    let (stats, mut jobs) = tokio::try_join!(client.job_stats(), client.list_jobs(&job_filters))?;
    jobs.truncate(RECENT_JOBS);
    Ok(Dashboard { stats, jobs })
}

// --- Recruiter job list ---

pub async fn load_open_jobs(client: &ApiClient) -> Result<Vec<Job>, ApiError> {
    client.list_jobs(&filters(&[("status", "open")])).await
}

/// Case-insensitive match on title or company name. An empty term matches
/// everything.
pub fn search_jobs<'a>(jobs: &'a [Job], term: &str) -> Vec<&'a Job> {
    let term = term.trim().to_lowercase();
    jobs.iter()
        .filter(|job| {
            term.is_empty()
                || job.title.to_lowercase().contains(&term)
                || job
                    .company_name()
                    .is_some_and(|name| name.to_lowercase().contains(&term))
        })
        .collect()
}

// --- Recommend form ---

/// Raw field values of the recommend-candidate form.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub current_role: String,
    pub current_company: String,
    pub linkedin_url: String,
    pub years_of_experience: String,
    pub recruiter_notes: String,
    pub status: RecommendationStatus,
}

impl Default for RecommendForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            current_role: String::new(),
            current_company: String::new(),
            linkedin_url: String::new(),
            years_of_experience: String::new(),
            recruiter_notes: String::new(),
            status: RecommendationStatus::Draft,
        }
    }
}

impl RecommendForm {
    pub fn validate(&self) -> Result<(Candidate, String, RecommendationStatus), FormError> {
        let name = required("name", &self.name)?;
        let email = required("email", &self.email)?;
        let current_role = required("current role", &self.current_role)?;
        let notes = required("notes", &self.recruiter_notes)?;
        if !matches!(
            self.status,
            RecommendationStatus::Draft | RecommendationStatus::Submitted
        ) {
            return Err(FormError::InvalidDraftStatus(self.status.to_string()));
        }

        let candidate = Candidate {
            name,
            email,
            phone: self.phone.trim().to_string(),
            current_role,
            current_company: self.current_company.trim().to_string(),
            linkedin_url: self.linkedin_url.trim().to_string(),
            years_of_experience: optional_number("years of experience", &self.years_of_experience)?,
        };
        Ok((candidate, notes, self.status.clone()))
    }
}

pub async fn load_recommend_target(client: &ApiClient, job_id: &str) -> Result<Job, ApiError> {
    client.get_job(job_id).await
}

/// Create the recommendation and return where to navigate next.
pub async fn submit_recommend_form(
    client: &ApiClient,
    job_id: &str,
    form: &RecommendForm,
) -> Result<(Recommendation, Route), ViewError> {
    let (candidate, notes, status) = form.validate()?;
    let rec = client
        .create_recommendation(job_id, candidate, &notes, status)
        .await
        .map_err(ViewError::action("Error creating recommendation"))?;
    Ok((rec, Route::RecruiterRecommendations))
}

// --- Post job form ---

#[derive(Debug, Clone, PartialEq)]
pub struct PostJobForm {
    pub title: String,
    pub department: String,
    pub level: JobLevel,
    pub location: String,
    pub remote: RemoteMode,
    pub description: String,
    /// Comma-separated.
    pub skills: String,
    pub priority: Priority,
    pub salary_min: String,
    pub salary_max: String,
    pub salary_currency: String,
}

impl Default for PostJobForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            department: "Engineering".to_string(),
            level: JobLevel::Mid,
            location: String::new(),
            remote: RemoteMode::Hybrid,
            description: String::new(),
            skills: String::new(),
            priority: Priority::Normal,
            salary_min: String::new(),
            salary_max: String::new(),
            salary_currency: "USD".to_string(),
        }
    }
}

impl PostJobForm {
    pub fn into_draft(self) -> Result<JobDraft, FormError> {
        let title = required("title", &self.title)?;
        let department = required("department", &self.department)?;
        let location = required("location", &self.location)?;
        let description = required("description", &self.description)?;

        let skills = self
            .skills
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        // Only a complete min/max pair becomes a salary range.
        let min = optional_number::<i64>("min salary", &self.salary_min)?;
        let max = optional_number::<i64>("max salary", &self.salary_max)?;
        let salary_range = match (min, max) {
            (Some(min), Some(max)) => Some(SalaryRange::new(
                min as f64,
                max as f64,
                self.salary_currency.trim(),
            )),
            _ => None,
        };

        Ok(JobDraft {
            title,
            department,
            level: self.level,
            location,
            remote: self.remote,
            description,
            skills,
            priority: self.priority,
            salary_range,
        })
    }
}

pub async fn post_job(client: &ApiClient, form: PostJobForm) -> Result<(Job, Route), ViewError> {
    let draft = form.into_draft()?;
    let job = client
        .create_job(&draft)
        .await
        .map_err(ViewError::action("Error posting job"))?;
    Ok((job, Route::CompanyDashboard))
}

// --- Recommendation lists ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecAction {
    Submit,
    Feedback,
}

/// The single action offered on a recommendation card, if any.
pub fn available_action(rec: &Recommendation, role: Role) -> Option<RecAction> {
    match role {
        Role::Recruiter if rec.status.can_submit() => Some(RecAction::Submit),
        Role::Company if rec.status != RecommendationStatus::Draft && rec.awaiting_feedback() => {
            Some(RecAction::Feedback)
        }
        _ => None,
    }
}

pub async fn load_recommendations(client: &ApiClient) -> Result<Vec<Recommendation>, ApiError> {
    client.list_recommendations(&Filters::new()).await
}

/// Submit a draft, then refetch the list.
pub async fn submit_and_refresh(client: &ApiClient, id: &str) -> Result<Vec<Recommendation>, ViewError> {
    client
        .submit_recommendation(id)
        .await
        .map_err(ViewError::action("Error submitting recommendation"))?;
    Ok(load_recommendations(client).await?)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackForm {
    pub feedback: String,
    pub status: String,
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<Feedback, FormError> {
        let feedback = required("feedback", &self.feedback)?;
        let raw = required("status", &self.status)?;
        let status = RecommendationStatus::from(raw.to_lowercase());
        if !status.is_feedback_status() {
            return Err(FormError::InvalidFeedbackStatus(raw));
        }
        Ok(Feedback { feedback, status })
    }
}

/// Record company feedback, then refetch the list.
pub async fn feedback_and_refresh(
    client: &ApiClient,
    id: &str,
    form: &FeedbackForm,
) -> Result<Vec<Recommendation>, ViewError> {
    let feedback = form.validate()?;
    client
        .add_feedback(id, &feedback)
        .await
        .map_err(ViewError::action("Error adding feedback"))?;
    Ok(load_recommendations(client).await?)
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Missing(field));
    }
    Ok(value.to_string())
}

fn optional_number<N: std::str::FromStr>(field: &'static str, value: &str) -> Result<Option<N>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| FormError::NotANumber {
            field,
            value: value.to_string(),
        })
}
