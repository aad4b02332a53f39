use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Query filters passed through to list endpoints, e.g. `status=open`.
pub type Filters = BTreeMap<String, String>;

pub fn filters(pairs: &[(&str, &str)]) -> Filters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Recruiter,
    Company,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Recruiter => "recruiter",
            Role::Company => "company",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Login responses send `id`; stored user documents send `_id`, which
    /// lands in `extra`. See [`User::user_id`].
    #[serde(default)]
    pub id: String,
    pub role: Role,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    // Whatever else the backend sends about the user (company link, timestamps).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    pub fn user_id(&self) -> &str {
        if !self.id.is_empty() {
            return &self.id;
        }
        self.extra.get("_id").and_then(|v| v.as_str()).unwrap_or_default()
    }
}

/// Authenticated identity plus the bearer token issued for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
    pub user: Option<User>,
}

// --- Jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum JobLevel {
    Junior,
    Mid,
    Senior,
    Lead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum RemoteMode {
    #[serde(rename = "On-site")]
    OnSite,
    Remote,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Urgent,
}

macro_rules! open_status {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A status this client does not know about, kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $text,)+
                    $name::Other(s) => s,
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => $name::$variant,)+
                    _ => $name::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> String {
                status.as_str().to_string()
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name::from(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_status!(JobStatus {
    Open => "open",
    Closed => "closed",
});

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Open
    }
}

open_status!(RecommendationStatus {
    Draft => "draft",
    Submitted => "submitted",
    Reviewed => "reviewed",
    Shortlisted => "shortlisted",
    Interviewing => "interviewing",
    Offered => "offered",
    Rejected => "rejected",
});

impl Default for RecommendationStatus {
    fn default() -> Self {
        RecommendationStatus::Draft
    }
}

impl RecommendationStatus {
    /// Statuses a company may set when leaving feedback.
    pub const FEEDBACK: [RecommendationStatus; 5] = [
        RecommendationStatus::Reviewed,
        RecommendationStatus::Shortlisted,
        RecommendationStatus::Interviewing,
        RecommendationStatus::Offered,
        RecommendationStatus::Rejected,
    ];

    /// Only drafts may be submitted to the company.
    pub fn can_submit(&self) -> bool {
        *self == RecommendationStatus::Draft
    }

    pub fn is_feedback_status(&self) -> bool {
        Self::FEEDBACK.contains(self)
    }
}

/// Either bound may be missing or fractional in stored jobs; only a range
/// with both bounds counts as a salary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub currency: String,
}

impl SalaryRange {
    pub fn new(min: f64, max: f64, currency: impl Into<String>) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            currency: currency.into(),
        }
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.min?, self.max?))
    }
}

impl fmt::Display for SalaryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds() {
            Some((min, max)) => write!(f, "{} {} - {}", self.currency, format_amount(min), format_amount(max)),
            None => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The backend returns either a bare id or the populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompanyRef {
    Populated(Company),
    Id(String),
}

impl CompanyRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            CompanyRef::Populated(c) if !c.name.is_empty() => Some(&c.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub department: String,
    pub level: JobLevel,
    #[serde(default)]
    pub location: String,
    pub remote: RemoteMode,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn company_name(&self) -> Option<&str> {
        self.company.as_ref().and_then(CompanyRef::name)
    }

    pub fn is_urgent(&self) -> bool {
        self.priority == Priority::Urgent
    }

    /// The salary range, if both bounds are known.
    pub fn salary(&self) -> Option<&SalaryRange> {
        self.salary_range.as_ref().filter(|r| r.bounds().is_some())
    }
}

/// Payload for `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    pub department: String,
    pub level: JobLevel,
    pub location: String,
    pub remote: RemoteMode,
    pub description: String,
    pub skills: Vec<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub open_jobs: u64,
    #[serde(default)]
    pub total_companies: u64,
    #[serde(default)]
    pub urgent_jobs: u64,
}

// --- Recommendations ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub current_role: String,
    #[serde(default)]
    pub current_company: String,
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobRef {
    Populated(JobSummary),
    Id(String),
}

impl JobRef {
    pub fn id(&self) -> &str {
        match self {
            JobRef::Populated(j) => &j.id,
            JobRef::Id(id) => id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            JobRef::Populated(j) if !j.title.is_empty() => Some(&j.title),
            _ => None,
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        match self {
            JobRef::Populated(j) => j.company.as_ref().and_then(CompanyRef::name),
            JobRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRef>,
    pub candidate: Candidate,
    #[serde(default)]
    pub recruiter_notes: String,
    #[serde(default)]
    pub status: RecommendationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Recommendation {
    /// Feedback only carries meaning once the company has seen the record.
    pub fn feedback(&self) -> Option<&str> {
        if matches!(
            self.status,
            RecommendationStatus::Draft | RecommendationStatus::Submitted
        ) {
            return None;
        }
        self.company_feedback.as_deref().filter(|f| !f.is_empty())
    }

    pub fn awaiting_feedback(&self) -> bool {
        self.company_feedback.as_deref().is_none_or(str::is_empty)
    }
}

/// Payload for `POST /recommendations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecommendation {
    pub job_id: String,
    pub candidate: Candidate,
    pub recruiter_notes: String,
    pub status: RecommendationStatus,
}

/// Payload for `POST /recommendations/:id/feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub feedback: String,
    pub status: RecommendationStatus,
}

/// Whole amounts group thousands; fractional ones keep two decimals.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let whole = group_thousands(cents / 100);
    match (cents % 100).abs() {
        0 => whole,
        frac => format!("{whole}.{frac:02}"),
    }
}

pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}
