mod api;
mod config;
mod error;
mod guard;
mod models;
mod session;
#[cfg(test)]
mod stub;
mod tui;
mod views;

use anyhow::{Context, Result, bail};
use api::ApiClient;
use clap::{Parser, Subcommand};
use config::Config;
use guard::Route;
use models::{JobLevel, Priority, Recommendation, RecommendationStatus, RemoteMode, Role, Session};
use session::SessionStore;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use views::{FeedbackForm, PostJobForm, RecAction, RecommendForm, View, ViewState};

#[derive(Parser)]
#[command(name = "vcportal")]
#[command(about = "VC portfolio platform - connecting recruiters with portfolio companies")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "VCPORTAL_API_URL")]
    api_url: Option<String>,

    /// Directory holding the saved session
    #[arg(long, global = true, env = "VCPORTAL_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "VCPORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the saved session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Open a portal page by path, e.g. /recruiter/jobs
    Open {
        path: String,
    },

    /// Show your dashboard
    Dashboard,

    /// List open positions (recruiters)
    Jobs {
        /// Match against title or company name
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Recommend a candidate for a job (recruiters)
    Recommend {
        /// Job ID
        job_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long)]
        current_role: String,

        #[arg(long, default_value = "")]
        current_company: String,

        #[arg(long, default_value = "")]
        linkedin_url: String,

        #[arg(long, default_value = "")]
        years: String,

        /// Private notes: why is this candidate a good fit?
        #[arg(short, long)]
        notes: String,

        /// Submit to the company right away instead of saving a draft
        #[arg(long)]
        submit: bool,
    },

    /// Recommendations
    Recs {
        #[command(subcommand)]
        command: RecCommands,
    },

    /// Interactive browser
    Browse {
        #[command(subcommand)]
        command: BrowseCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Show job details
    Show {
        /// Job ID
        id: String,
    },

    /// Post a new job (companies)
    Post {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "Engineering")]
        department: String,

        #[arg(long, value_enum, default_value_t = JobLevel::Mid)]
        level: JobLevel,

        #[arg(long)]
        location: String,

        #[arg(long, value_enum, default_value_t = RemoteMode::Hybrid)]
        remote: RemoteMode,

        #[arg(long)]
        description: String,

        /// Comma-separated, e.g. "React, Node.js"
        #[arg(long, default_value = "")]
        skills: String,

        #[arg(long, value_enum, default_value_t = Priority::Normal)]
        priority: Priority,

        #[arg(long, default_value = "")]
        salary_min: String,

        #[arg(long, default_value = "")]
        salary_max: String,

        /// USD, EUR, GBP or AED
        #[arg(long, default_value = "USD")]
        currency: String,
    },
}

#[derive(Subcommand)]
enum RecCommands {
    /// List recommendations visible to you
    List,

    /// Submit a draft to the company (recruiters)
    Submit {
        id: String,

        /// Skip the confirmation question
        #[arg(short, long)]
        yes: bool,
    },

    /// Leave feedback on a recommendation (companies)
    Feedback {
        id: String,

        #[arg(short, long)]
        feedback: String,

        /// reviewed, shortlisted, interviewing, offered or rejected
        #[arg(short, long)]
        status: String,
    },
}

#[derive(Subcommand)]
enum BrowseCommands {
    /// Open positions with search (recruiters)
    Jobs,
    /// Your recommendations
    Recs,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the guard for `requested`. Returns the session and the route that
/// should actually render, or `None` when the caller must log in first.
fn enter(store: &SessionStore, requested: Route) -> Option<(Session, Route)> {
    let session = store.get();
    let resolved = guard::resolve(requested.clone(), session.as_ref());
    if resolved == Route::Login {
        println!("Not logged in. Run: vcportal login --email <email>");
        return None;
    }
    if resolved != requested {
        println!("Redirected to {resolved}");
    }
    session.map(|s| (s, resolved))
}

fn recommendations_route(store: &SessionStore) -> Route {
    match store.get().map(|s| s.role()) {
        Some(Role::Company) => Route::CompanyRecommendations,
        _ => Route::RecruiterRecommendations,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::from_env(cli.api_url, cli.session_dir);
    tracing::debug!(api_url = %config.api_url, session_dir = %config.session_dir.display(), "config loaded");
    let store = SessionStore::open(&config.session_dir);
    let client = ApiClient::new(&config, store.clone()).context("Failed to set up HTTP client")?;

    match cli.command {
        Commands::Login { email, password } => {
            let mut changes = store.subscribe();
            match views::login(&client, &email, &password).await {
                Ok(landing) => {
                    if let Some(session) = changes.borrow_and_update().as_ref() {
                        println!("Logged in as {} ({})", session.user.email, session.role());
                    }
                    print_nav(&store);
                    render(&client, landing).await?;
                }
                Err(banner) => bail!("{banner}"),
            }
        }

        Commands::Logout => {
            client.logout().context("Failed to clear session")?;
            println!("Logged out.");
        }

        Commands::Whoami => match store.get() {
            Some(session) => {
                println!("{} ({})", session.user.email, session.role());
                println!("ID: {}", session.user.user_id());
                if let Some(name) = &session.user.name {
                    println!("Name: {name}");
                }
                println!("Session: {}", store.dir().display());
                print_nav(&store);
            }
            None => println!("Not logged in."),
        },

        Commands::Open { path } => {
            let route = guard::navigate(&path, store.get().as_ref())?;
            if route == Route::Login {
                println!("Run: vcportal login --email <email>");
            } else {
                render(&client, route).await?;
            }
        }

        Commands::Dashboard => {
            let Some(session) = store.get() else {
                println!("Not logged in. Run: vcportal login --email <email>");
                return Ok(());
            };
            render(&client, guard::landing(&session)).await?;
        }

        Commands::Jobs { search } => {
            let Some((_, route)) = enter(&store, Route::RecruiterJobs) else {
                return Ok(());
            };
            if route == Route::RecruiterJobs {
                let jobs = views::load_open_jobs(&client).await?;
                print_jobs(&views::search_jobs(&jobs, search.as_deref().unwrap_or("")));
            } else {
                render(&client, route).await?;
            }
        }

        Commands::Job { command } => match command {
            JobCommands::Show { id } => {
                // Any logged-in user may look at a single job.
                if store.get().is_none() {
                    println!("Not logged in. Run: vcportal login --email <email>");
                    return Ok(());
                }
                let job = client.get_job(&id).await.with_context(|| format!("Job {id} not available"))?;
                print_job(&job);
            }

            JobCommands::Post {
                title,
                department,
                level,
                location,
                remote,
                description,
                skills,
                priority,
                salary_min,
                salary_max,
                currency,
            } => {
                let Some((_, route)) = enter(&store, Route::PostJob) else {
                    return Ok(());
                };
                if route != Route::PostJob {
                    return render(&client, route).await;
                }
                let form = PostJobForm {
                    title,
                    department,
                    level,
                    location,
                    remote,
                    description,
                    skills,
                    priority,
                    salary_min,
                    salary_max,
                    salary_currency: currency,
                };
                let (job, next) = views::post_job(&client, form).await?;
                println!("Job posted successfully! (ID: {})", job.id);
                render(&client, next).await?;
            }
        },

        Commands::Recommend {
            job_id,
            name,
            email,
            phone,
            current_role,
            current_company,
            linkedin_url,
            years,
            notes,
            submit,
        } => {
            let requested = Route::Recommend { job_id: job_id.clone() };
            let Some((_, route)) = enter(&store, requested.clone()) else {
                return Ok(());
            };
            if route != requested {
                return render(&client, route).await;
            }
            let job = views::load_recommend_target(&client, &job_id)
                .await
                .with_context(|| format!("Job {job_id} not available"))?;
            println!("Recommending for: {}", describe_job(&job));

            let form = RecommendForm {
                name,
                email,
                phone,
                current_role,
                current_company,
                linkedin_url,
                years_of_experience: years,
                recruiter_notes: notes,
                status: if submit {
                    RecommendationStatus::Submitted
                } else {
                    RecommendationStatus::Draft
                },
            };
            let (rec, next) = views::submit_recommend_form(&client, &job.id, &form).await?;
            println!("Recommendation created successfully! (ID: {}, {})", rec.id, rec.status);
            render(&client, next).await?;
        }

        Commands::Recs { command } => match command {
            RecCommands::List => render(&client, recommendations_route(&store)).await?,

            RecCommands::Submit { id, yes } => {
                let Some((session, route)) = enter(&store, Route::RecruiterRecommendations) else {
                    return Ok(());
                };
                if route != Route::RecruiterRecommendations {
                    return render(&client, route).await;
                }
                if !yes && !confirm(views::SUBMIT_CONFIRM, &mut std::io::stdin().lock())? {
                    println!("Cancelled.");
                    return Ok(());
                }
                let recs = views::submit_and_refresh(&client, &id).await?;
                println!("Recommendation submitted successfully!");
                print_recommendations(&recs, session.role());
            }

            RecCommands::Feedback { id, feedback, status } => {
                let Some((session, route)) = enter(&store, Route::CompanyRecommendations) else {
                    return Ok(());
                };
                if route != Route::CompanyRecommendations {
                    return render(&client, route).await;
                }
                let form = FeedbackForm { feedback, status };
                let recs = views::feedback_and_refresh(&client, &id, &form).await?;
                println!("Feedback added successfully!");
                print_recommendations(&recs, session.role());
            }
        },

        Commands::Browse { command } => match command {
            BrowseCommands::Jobs => {
                let Some((_, route)) = enter(&store, Route::RecruiterJobs) else {
                    return Ok(());
                };
                if route != Route::RecruiterJobs {
                    return render(&client, route).await;
                }
                tui::browse_jobs(views::load_open_jobs(&client).await?)?;
            }
            BrowseCommands::Recs => {
                let Some((session, route)) = enter(&store, recommendations_route(&store)) else {
                    return Ok(());
                };
                let recs = views::load_recommendations(&client).await?;
                if matches!(route, Route::RecruiterRecommendations | Route::CompanyRecommendations) {
                    tui::browse_recommendations(&client, &session, recs)?;
                }
            }
        },
    }

    Ok(())
}

/// Render a read-only view after passing it through the guard.
async fn render(client: &ApiClient, requested: Route) -> Result<()> {
    let Some((session, route)) = enter(client.session(), requested) else {
        return Ok(());
    };

    match route {
        Route::RecruiterDashboard | Route::CompanyDashboard => {
            let mut view = View::default();
            views::mount(&mut view, views::load_dashboard(client, &session)).await;
            match view.state() {
                ViewState::Ready(dashboard) => print_dashboard(dashboard, session.role()),
                ViewState::Failed(e) => bail!("Failed to load dashboard: {e}"),
                ViewState::Loading => println!("Loading..."),
            }
        }
        Route::RecruiterJobs => {
            let jobs = views::load_open_jobs(client).await?;
            println!("All Open Positions\n");
            print_jobs(&jobs.iter().collect::<Vec<_>>());
        }
        Route::RecruiterRecommendations | Route::CompanyRecommendations => {
            let recs = views::load_recommendations(client).await?;
            print_recommendations(&recs, session.role());
        }
        Route::Recommend { job_id } => {
            let job = views::load_recommend_target(client, &job_id).await?;
            println!("Recommend Candidate\n");
            print_job(&job);
            println!("\nRun: vcportal recommend {job_id} --name ... --email ... --current-role ... --notes ...");
        }
        Route::PostJob => {
            println!("Post New Job\n");
            println!("Run: vcportal job post --title ... --location ... --description ...");
        }
        Route::Login => {}
    }
    Ok(())
}

fn print_nav(store: &SessionStore) {
    if let Some(session) = store.get() {
        let mut links: Vec<String> = guard::nav_links(session.role())
            .iter()
            .map(|(label, route)| format!("{label} ({route})"))
            .collect();
        links.push("Logout (vcportal logout)".to_string());
        println!("{}", links.join("  |  "));
    }
}

fn print_dashboard(dashboard: &views::Dashboard, role: Role) {
    let stats = &dashboard.stats;
    match role {
        Role::Recruiter => {
            println!("Recruiter Dashboard\n");
            println!("{:<22} {}", "Open Positions:", stats.open_jobs);
            println!("{:<22} {}", "Portfolio Companies:", stats.total_companies);
            println!("{:<22} {}", "Urgent Roles:", stats.urgent_jobs);
            println!("\nRecent Open Positions");
        }
        Role::Company => {
            println!("Company Dashboard\n");
            println!("{:<22} {}", "Your Open Jobs:", stats.open_jobs);
            println!("{:<22} {}", "Urgent Roles:", stats.urgent_jobs);
            println!("\nYour Job Postings");
        }
    }
    print_jobs(&dashboard.jobs.iter().collect::<Vec<_>>());
}

fn print_jobs(jobs: &[&models::Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<26} {:<8} {:<28} {:<18} {:<8} {:>24}",
        "ID", "STATUS", "TITLE", "COMPANY", "LEVEL", "SALARY"
    );
    println!("{}", "-".repeat(117));
    for job in jobs {
        let salary = job
            .salary()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        let title = if job.is_urgent() {
            format!("{} [urgent]", job.title)
        } else {
            job.title.clone()
        };
        println!(
            "{:<26} {:<8} {:<28} {:<18} {:<8} {:>24}",
            truncate(&job.id, 24),
            job.status,
            truncate(&title, 26),
            truncate(job.company_name().unwrap_or(""), 16),
            format!("{:?}", job.level),
            salary
        );
    }
}

fn describe_job(job: &models::Job) -> String {
    match job.company_name() {
        Some(company) => format!("{} at {} ({})", job.title, company, job.location),
        None => format!("{} ({})", job.title, job.location),
    }
}

fn print_job(job: &models::Job) {
    println!("Job {}", job.id);
    println!("Title: {}", job.title);
    if let Some(company) = job.company_name() {
        println!("Company: {company}");
    }
    println!("Status: {}", job.status);
    println!("Department: {}", job.department);
    println!("Level: {:?}", job.level);
    println!("Location: {} ({:?})", job.location, job.remote);
    if job.is_urgent() {
        println!("Priority: urgent");
    }
    if let Some(range) = job.salary() {
        println!("Salary: {range}");
    }
    if !job.skills.is_empty() {
        println!("Skills: {}", job.skills.join(", "));
    }
    if let Some(created) = job.created_at {
        println!("Posted: {}", created.format("%Y-%m-%d"));
    }
    if !job.description.is_empty() {
        println!("\n{}", textwrap::fill(&job.description, 80));
    }
}

fn print_recommendations(recs: &[Recommendation], role: Role) {
    match role {
        Role::Recruiter => println!("My Recommendations\n"),
        Role::Company => println!("Candidate Recommendations\n"),
    }
    if recs.is_empty() {
        println!("{}", views::EMPTY_RECOMMENDATIONS);
        return;
    }
    for rec in recs {
        println!("[{}] {} - {}", rec.status, rec.candidate.name, rec.candidate.current_role);
        println!("  ID: {}", rec.id);
        if let Some(job) = &rec.job {
            let title = job.title().unwrap_or(job.id());
            match (role, job.company_name()) {
                (Role::Recruiter, Some(company)) => println!("  For: {title} at {company}"),
                _ => println!("  For: {title}"),
            }
        }
        match role {
            Role::Recruiter => println!("  Your notes: {}", rec.recruiter_notes),
            Role::Company => println!("  Email: {}", rec.candidate.email),
        }
        if let Some(feedback) = rec.feedback() {
            let label = match role {
                Role::Recruiter => "Company feedback",
                Role::Company => "Your feedback",
            };
            println!("  {label}: {feedback}");
        }
        match views::available_action(rec, role) {
            Some(RecAction::Submit) => println!("  -> vcportal recs submit {}", rec.id),
            Some(RecAction::Feedback) => {
                println!("  -> vcportal recs feedback {} --feedback ... --status ...", rec.id)
            }
            None => {}
        }
        println!();
    }
}

/// Ask a yes/no question on stdout; only an explicit yes confirms.
fn confirm(question: &str, input: &mut impl BufRead) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer).context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
