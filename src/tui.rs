use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::ApiClient;
use crate::models::{Job, Recommendation, RecommendationStatus, Role, Session};
use crate::views::{self, FeedbackForm, RecAction};

type Term = Terminal<CrosstermBackend<std::io::Stdout>>;

/// Drive an API future from the synchronous event loop.
fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
}

fn with_terminal(body: impl FnOnce(&mut Term) -> Result<()>) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
}

/// One-line text entry shown in the footer.
struct Prompt {
    label: &'static str,
    buffer: String,
}

enum PromptKey {
    Pending,
    Done(String),
    Cancelled,
}

impl Prompt {
    fn new(label: &'static str, initial: &str) -> Self {
        Self {
            label,
            buffer: initial.to_string(),
        }
    }

    fn handle(&mut self, code: KeyCode) -> PromptKey {
        match code {
            KeyCode::Enter => PromptKey::Done(std::mem::take(&mut self.buffer)),
            KeyCode::Esc => PromptKey::Cancelled,
            KeyCode::Backspace => {
                self.buffer.pop();
                PromptKey::Pending
            }
            KeyCode::Char(c) => {
                self.buffer.push(c);
                PromptKey::Pending
            }
            _ => PromptKey::Pending,
        }
    }

    fn line(&self) -> String {
        format!(" {}: {}_", self.label, self.buffer)
    }
}

struct Cursor {
    selected: usize,
    scroll_offset: u16,
}

impl Cursor {
    fn new() -> Self {
        Self {
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn next(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

fn split(frame: &Frame) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[0]);
    (cols[0], cols[1], rows[1])
}

fn heading(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().add_modifier(Modifier::BOLD)))
}

fn dim(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

fn wrapped(lines: &mut Vec<Line<'static>>, text: &str) {
    for line in textwrap::fill(text, 70).lines() {
        lines.push(Line::from(format!("  {line}")));
    }
}

// --- Job browser ---

struct JobBrowser {
    jobs: Vec<Job>,
    search: String,
    cursor: Cursor,
    prompt: Option<Prompt>,
}

impl JobBrowser {
    fn visible(&self) -> Vec<&Job> {
        views::search_jobs(&self.jobs, &self.search)
    }
}

/// Browse open positions with a detail pane and live search.
pub fn browse_jobs(jobs: Vec<Job>) -> Result<()> {
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }
    let mut state = JobBrowser {
        jobs,
        search: String::new(),
        cursor: Cursor::new(),
        prompt: None,
    };
    with_terminal(|terminal| job_loop(terminal, &mut state))
}

fn job_loop(terminal: &mut Term, state: &mut JobBrowser) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.cursor.selected));
        terminal.draw(|frame| draw_jobs(frame, state, &mut list_state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(prompt) = state.prompt.as_mut() {
            match prompt.handle(key.code) {
                PromptKey::Pending => {}
                PromptKey::Done(term) => {
                    state.search = term;
                    state.prompt = None;
                    state.cursor = Cursor::new();
                }
                PromptKey::Cancelled => state.prompt = None,
            }
            continue;
        }

        let len = state.visible().len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => state.cursor.next(len),
            KeyCode::Up | KeyCode::Char('k') => state.cursor.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => state.cursor.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => state.cursor.scroll_up(),
            KeyCode::Char('/') => state.prompt = Some(Prompt::new("Search jobs", &state.search)),
            _ => {}
        }
    }
    Ok(())
}

fn draw_jobs(frame: &mut Frame, state: &JobBrowser, list_state: &mut ListState) {
    let (left, right, footer) = split(frame);
    let visible = state.visible();

    let items: Vec<ListItem> = visible
        .iter()
        .map(|job| {
            let flag = if job.is_urgent() { "!" } else { " " };
            let company = job.company_name().unwrap_or("?");
            ListItem::new(format!("{flag} {} | {company}", crate::truncate(&job.title, 35)))
        })
        .collect();

    let title = if state.search.is_empty() {
        format!(" Open Positions ({}) ", visible.len())
    } else {
        format!(" Open Positions ({}) matching \"{}\" ", visible.len(), state.search)
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, left, list_state);

    let detail = match visible.get(state.cursor.selected) {
        Some(job) => job_detail(job),
        None => Text::raw("No jobs match"),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.cursor.scroll_offset, 0));
    frame.render_widget(detail_widget, right);

    let help = match &state.prompt {
        Some(prompt) => prompt.line(),
        None => " j/k:navigate  J/K:scroll  /:search  q:quit".to_string(),
    };
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), footer);
}

fn job_detail(job: &Job) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = vec![heading(job.title.clone())];

    if let Some(company) = job.company_name() {
        lines.push(Line::from(format!("at {company}")));
    }
    if job.is_urgent() {
        lines.push(Line::from(Span::styled("Urgent", Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(format!(
        "{} | {:?} | {} | {:?}",
        job.location, job.level, job.department, job.remote
    )));
    if let Some(range) = job.salary() {
        lines.push(Line::from(format!("Salary: {range}")));
    }
    lines.push(dim(format!("Recommend: vcportal recommend {}", job.id)));
    lines.push(Line::from(""));

    if !job.skills.is_empty() {
        lines.push(heading("Skills"));
        lines.push(Line::from(format!("  {}", job.skills.join(", "))));
        lines.push(Line::from(""));
    }

    lines.push(heading("Description"));
    if job.description.is_empty() {
        lines.push(dim("  (none)"));
    } else {
        wrapped(&mut lines, &job.description);
    }

    Text::from(lines)
}

// --- Recommendation browser ---

enum RecPrompt {
    ConfirmSubmit { id: String },
    FeedbackText(Prompt),
    FeedbackStatus { feedback: String, prompt: Prompt },
}

/// Only `y`/`Y` confirms; any other key cancels.
fn confirms(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('y' | 'Y'))
}

/// Mutations block the event loop until the refetched list arrives, so a
/// result always belongs to the list on screen.
struct RecBrowser<'a> {
    client: &'a ApiClient,
    role: Role,
    recs: Vec<Recommendation>,
    cursor: Cursor,
    prompt: Option<RecPrompt>,
    message: Option<String>,
}

impl RecBrowser<'_> {
    fn current(&self) -> Option<&Recommendation> {
        self.recs.get(self.cursor.selected)
    }

    fn apply(&mut self, result: Result<Vec<Recommendation>, views::ViewError>, ok: &str) {
        match result {
            Ok(recs) => {
                self.recs = recs;
                self.cursor.clamp(self.recs.len());
                self.message = Some(ok.to_string());
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    /// Ask before submitting; the draft is only sent once confirmed.
    fn ask_submit(&mut self) {
        let Some(rec) = self.current() else { return };
        if views::available_action(rec, self.role) == Some(RecAction::Submit) {
            self.prompt = Some(RecPrompt::ConfirmSubmit { id: rec.id.clone() });
        }
    }

    fn submit(&mut self, id: &str) {
        let result = block_on(views::submit_and_refresh(self.client, id));
        self.apply(result, "Recommendation submitted successfully!");
    }

    fn send_feedback(&mut self, feedback: String, status: String) {
        let Some(rec) = self.current() else { return };
        let id = rec.id.clone();
        let form = FeedbackForm { feedback, status };
        let result = block_on(views::feedback_and_refresh(self.client, &id, &form));
        self.apply(result, "Feedback added successfully!");
    }
}

/// Browse recommendations. Recruiters can submit drafts; companies can
/// leave feedback on entries that have none yet.
pub fn browse_recommendations(client: &ApiClient, session: &Session, recs: Vec<Recommendation>) -> Result<()> {
    if recs.is_empty() {
        println!("{}", views::EMPTY_RECOMMENDATIONS);
        return Ok(());
    }
    let mut state = RecBrowser {
        client,
        role: session.role(),
        recs,
        cursor: Cursor::new(),
        prompt: None,
        message: None,
    };
    with_terminal(|terminal| rec_loop(terminal, &mut state))
}

fn rec_loop(terminal: &mut Term, state: &mut RecBrowser<'_>) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.cursor.selected));
        terminal.draw(|frame| draw_recs(frame, state, &mut list_state))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(prompt) = state.prompt.take() {
            state.prompt = match prompt {
                RecPrompt::ConfirmSubmit { id } => {
                    if confirms(key.code) {
                        state.submit(&id);
                    }
                    None
                }
                RecPrompt::FeedbackText(mut p) => match p.handle(key.code) {
                    PromptKey::Pending => Some(RecPrompt::FeedbackText(p)),
                    PromptKey::Done(feedback) if !feedback.trim().is_empty() => Some(RecPrompt::FeedbackStatus {
                        feedback,
                        prompt: Prompt::new("Status (reviewed/shortlisted/interviewing/offered/rejected)", ""),
                    }),
                    PromptKey::Done(_) | PromptKey::Cancelled => None,
                },
                RecPrompt::FeedbackStatus { feedback, mut prompt } => match prompt.handle(key.code) {
                    PromptKey::Pending => Some(RecPrompt::FeedbackStatus { feedback, prompt }),
                    PromptKey::Done(status) => {
                        state.send_feedback(feedback, status);
                        None
                    }
                    PromptKey::Cancelled => None,
                },
            };
            continue;
        }

        state.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => state.cursor.next(state.recs.len()),
            KeyCode::Up | KeyCode::Char('k') => state.cursor.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => state.cursor.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => state.cursor.scroll_up(),
            KeyCode::Char('s') => state.ask_submit(),
            KeyCode::Char('f') => {
                let offered = state
                    .current()
                    .and_then(|rec| views::available_action(rec, state.role));
                if offered == Some(RecAction::Feedback) {
                    state.prompt = Some(RecPrompt::FeedbackText(Prompt::new("Feedback", "")));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn status_style(status: &RecommendationStatus) -> Style {
    match status {
        RecommendationStatus::Draft => Style::default().fg(Color::DarkGray),
        RecommendationStatus::Submitted => Style::default().fg(Color::Yellow),
        RecommendationStatus::Reviewed | RecommendationStatus::Interviewing => Style::default().fg(Color::Cyan),
        RecommendationStatus::Shortlisted | RecommendationStatus::Offered => Style::default().fg(Color::Green),
        RecommendationStatus::Rejected => Style::default().fg(Color::Red),
        RecommendationStatus::Other(_) => Style::default(),
    }
}

fn draw_recs(frame: &mut Frame, state: &RecBrowser<'_>, list_state: &mut ListState) {
    let (left, right, footer) = split(frame);

    let items: Vec<ListItem> = state
        .recs
        .iter()
        .map(|rec| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<12} ", rec.status), status_style(&rec.status)),
                Span::raw(crate::truncate(&rec.candidate.name, 30)),
            ]))
        })
        .collect();

    let title = match state.role {
        Role::Recruiter => " My Recommendations ",
        Role::Company => " Candidate Recommendations ",
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, left, list_state);

    let detail = match state.current() {
        Some(rec) => rec_detail(rec, state.role),
        None => Text::raw("No recommendation selected"),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.cursor.scroll_offset, 0));
    frame.render_widget(detail_widget, right);

    let help = match (&state.prompt, &state.message) {
        (Some(RecPrompt::ConfirmSubmit { .. }), _) => format!(" {} (y/n)", views::SUBMIT_CONFIRM),
        (Some(RecPrompt::FeedbackText(p)), _) | (Some(RecPrompt::FeedbackStatus { prompt: p, .. }), _) => p.line(),
        (None, Some(message)) => format!(" {message}"),
        (None, None) => match state.role {
            Role::Recruiter => " j/k:navigate  J/K:scroll  s:submit draft  q:quit".to_string(),
            Role::Company => " j/k:navigate  J/K:scroll  f:add feedback  q:quit".to_string(),
        },
    };
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), footer);
}

fn rec_detail(rec: &Recommendation, role: Role) -> Text<'static> {
    let candidate = &rec.candidate;
    let mut lines: Vec<Line<'static>> = vec![heading(candidate.name.clone())];
    if !candidate.current_role.is_empty() {
        let at = if candidate.current_company.is_empty() {
            String::new()
        } else {
            format!(" at {}", candidate.current_company)
        };
        lines.push(Line::from(format!("{}{at}", candidate.current_role)));
    }
    lines.push(Line::from(Span::styled(
        format!("Status: {}", rec.status),
        status_style(&rec.status),
    )));

    if let Some(job) = &rec.job {
        let title = job.title().unwrap_or(job.id());
        match (role, job.company_name()) {
            (Role::Recruiter, Some(company)) => lines.push(Line::from(format!("For: {title} at {company}"))),
            _ => lines.push(Line::from(format!("For: {title}"))),
        }
    }
    lines.push(Line::from(format!("Email: {}", candidate.email)));
    if !candidate.phone.is_empty() {
        lines.push(Line::from(format!("Phone: {}", candidate.phone)));
    }
    if !candidate.linkedin_url.is_empty() {
        lines.push(Line::from(format!("LinkedIn: {}", candidate.linkedin_url)));
    }
    if let Some(years) = candidate.years_of_experience {
        lines.push(Line::from(format!("Experience: {years} years")));
    }
    lines.push(Line::from(""));

    if role == Role::Recruiter && !rec.recruiter_notes.is_empty() {
        lines.push(heading("Your notes"));
        wrapped(&mut lines, &rec.recruiter_notes);
        lines.push(Line::from(""));
    }

    if let Some(feedback) = rec.feedback() {
        lines.push(heading(match role {
            Role::Recruiter => "Company feedback",
            Role::Company => "Your feedback",
        }));
        wrapped(&mut lines, feedback);
    }

    Text::from(lines)
}
