use std::fmt;

use crate::models::{Role, Session};

/// Every navigable view of the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    RecruiterDashboard,
    RecruiterJobs,
    Recommend { job_id: String },
    RecruiterRecommendations,
    CompanyDashboard,
    PostJob,
    CompanyRecommendations,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no such page: {0}")]
pub struct RouteError(pub String);

impl Route {
    pub fn parse(path: &str) -> Result<Route, RouteError> {
        let trimmed = path.trim().trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        let route = match segments.as_slice() {
            // The root only ever forwards to the login page.
            [] | ["login"] => Route::Login,
            ["recruiter", "dashboard"] => Route::RecruiterDashboard,
            ["recruiter", "jobs"] => Route::RecruiterJobs,
            ["recruiter", "recommend", id] => Route::Recommend { job_id: id.to_string() },
            ["recruiter", "recommendations"] => Route::RecruiterRecommendations,
            ["company", "dashboard"] => Route::CompanyDashboard,
            ["company", "jobs", "new"] => Route::PostJob,
            ["company", "recommendations"] => Route::CompanyRecommendations,
            _ => return Err(RouteError(path.to_string())),
        };
        Ok(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::RecruiterDashboard => "/recruiter/dashboard".to_string(),
            Route::RecruiterJobs => "/recruiter/jobs".to_string(),
            Route::Recommend { job_id } => format!("/recruiter/recommend/{job_id}"),
            Route::RecruiterRecommendations => "/recruiter/recommendations".to_string(),
            Route::CompanyDashboard => "/company/dashboard".to_string(),
            Route::PostJob => "/company/jobs/new".to_string(),
            Route::CompanyRecommendations => "/company/recommendations".to_string(),
        }
    }

    /// Role a session must hold to render this view. `None` means the view
    /// is reachable without logging in.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Login => None,
            Route::RecruiterDashboard
            | Route::RecruiterJobs
            | Route::Recommend { .. }
            | Route::RecruiterRecommendations => Some(Role::Recruiter),
            Route::CompanyDashboard | Route::PostJob | Route::CompanyRecommendations => {
                Some(Role::Company)
            }
        }
    }

    pub fn is_guarded(&self) -> bool {
        *self != Route::Login
    }

    pub fn dashboard(role: Role) -> Route {
        match role {
            Role::Recruiter => Route::RecruiterDashboard,
            Role::Company => Route::CompanyDashboard,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Redirect(Route),
}

/// Decide whether a view requiring `required` may render for `session`.
///
/// No session goes to the login page. A session of the wrong role is sent
/// to its own dashboard rather than refused. With no required role any
/// session is accepted.
pub fn authorize(session: Option<&Session>, required: Option<Role>) -> Access {
    let Some(session) = session else {
        return Access::Redirect(Route::Login);
    };
    match required {
        Some(role) if role != session.role() => Access::Redirect(Route::dashboard(session.role())),
        _ => Access::Allowed,
    }
}

/// Resolve the view that actually renders when `route` is requested.
pub fn resolve(route: Route, session: Option<&Session>) -> Route {
    if !route.is_guarded() {
        return route;
    }
    match authorize(session, route.required_role()) {
        Access::Allowed => route,
        Access::Redirect(target) => {
            tracing::info!(requested = %route, redirect = %target, "guard redirect");
            target
        }
    }
}

/// Parse `path` and resolve it against `session`.
pub fn navigate(path: &str, session: Option<&Session>) -> Result<Route, RouteError> {
    Ok(resolve(Route::parse(path)?, session))
}

/// Where a freshly logged-in user lands.
pub fn landing(session: &Session) -> Route {
    Route::dashboard(session.role())
}

/// Navigation bar entries for a role, in display order.
pub fn nav_links(role: Role) -> [(&'static str, Route); 3] {
    match role {
        Role::Recruiter => [
            ("Dashboard", Route::RecruiterDashboard),
            ("Jobs", Route::RecruiterJobs),
            ("Recommendations", Route::RecruiterRecommendations),
        ],
        Role::Company => [
            ("Dashboard", Route::CompanyDashboard),
            ("Post Job", Route::PostJob),
            ("Recommendations", Route::CompanyRecommendations),
        ],
    }
}
