use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use hypertext::{prelude::*, Raw};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::TaskApi;
use crate::notify::{render_notices, Notice};
use crate::schedule::render_schedule;
use crate::task::{Task, TaskForm, TaskId};

const HX_RESWAP: HeaderName = HeaderName::from_static("hx-reswap");

const PRIORITIES: [&str; 3] = ["High", "Medium", "Low"];

#[derive(Clone)]
pub struct AppState {
    pub api: TaskApi,
    /// Default per-day hour budget passed to the schedule request.
    pub daily_hours: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(homepage))
        .route("/tasks", get(tasks_list).post(add_task))
        .route("/tasks/{id}", axum::routing::delete(delete_task))
        .route("/tasks/{id}/done", post(mark_done))
        .route("/schedule", get(generate_schedule))
        .route("/health", get(health))
}

// ============================================================================
// Action responses
// ============================================================================

/// What an action hands back to the browser: the replacement for its target
/// region (or nothing, leaving the region as it was) plus toasts.
struct ActionResponse {
    body: Option<String>,
    notices: Vec<Notice>,
}

impl ActionResponse {
    fn swap(body: String) -> Self {
        Self { body: Some(body), notices: Vec::new() }
    }

    fn keep() -> Self {
        Self { body: None, notices: Vec::new() }
    }

    fn notify(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        let toasts = render_notices(&self.notices);
        match self.body {
            Some(body) => Html(body + &toasts).into_response(),
            None => (
                [(HX_RESWAP, HeaderValue::from_static("none"))],
                Html(toasts),
            )
                .into_response(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

// GET / - Page shell; the task list loads itself once
pub async fn homepage() -> Html<String> {
    let html = maud! {
        !DOCTYPE
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Task Planner" }
                link rel="stylesheet" href="/static/app.css";
                script src="https://unpkg.com/htmx.org@2.0.4" {}
            }
            body {
                h1 { "Task Planner" }

                section .panel {
                    h2 { "Add Task" }
                    (Raw::dangerously_create(&render_task_form()))
                }

                section .panel {
                    h2 { "Tasks" }
                    (Raw::dangerously_create(
                        r##"<div id="task-list" hx-get="/tasks" hx-trigger="load" hx-swap="innerHTML"></div>"##
                    ))
                }

                section .panel {
                    h2 { "Schedule" }
                    (Raw::dangerously_create(&render_schedule_form()))
                    div id="schedule" {}
                }

                div .toasts id="toasts" {}
            }
        }
    };

    Html(html.render().into_inner())
}

// GET /tasks - Fetch and render the whole list
async fn tasks_list(State(state): State<AppState>) -> ActionResponse {
    match state.api.list_tasks().await {
        Ok(tasks) => ActionResponse::swap(render_task_list(&tasks, Utc::now())),
        Err(_) => ActionResponse::keep().notify(Notice::error("Unable to load tasks!")),
    }
}

// POST /tasks - Validate, create, then reload the list
async fn add_task(State(state): State<AppState>, Form(form): Form<TaskForm>) -> ActionResponse {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(e) => {
            info!(error = %e, "rejected task form");
            return ActionResponse::keep().notify(Notice::error(e.to_string()));
        }
    };

    if let Err(e) = state.api.create_task(&draft).await {
        warn!(error = %e, name = %draft.name, "failed to add task");
        return ActionResponse::keep().notify(Notice::error("Failed to add task!"));
    }
    info!(name = %draft.name, "task added");

    let mut response =
        ActionResponse::swap(render_task_form()).notify(Notice::success("Task added successfully!"));
    match state.api.list_tasks().await {
        Ok(tasks) => {
            let list = render_task_list(&tasks, Utc::now());
            if let Some(body) = response.body.as_mut() {
                body.push_str(&format!(
                    r#"<div id="task-list" hx-swap-oob="innerHTML">{}</div>"#,
                    list
                ));
            }
        }
        Err(_) => response = response.notify(Notice::error("Unable to load tasks!")),
    }
    response
}

// DELETE /tasks/{id} - Delete, then reload the list
async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> ActionResponse {
    let id = TaskId::new(id);
    if let Err(e) = state.api.delete_task(&id).await {
        warn!(error = %e, task_id = %id, "failed to delete task");
        return ActionResponse::keep().notify(Notice::error("Failed to delete task!"));
    }
    info!(task_id = %id, "task deleted");
    reload_after(&state.api, Notice::success("Task deleted!")).await
}

// POST /tasks/{id}/done - Mark finished, then reload the list
async fn mark_done(State(state): State<AppState>, Path(id): Path<String>) -> ActionResponse {
    let id = TaskId::new(id);
    if let Err(e) = state.api.mark_done(&id).await {
        warn!(error = %e, task_id = %id, "failed to mark task done");
        return ActionResponse::keep().notify(Notice::error("Failed to update task!"));
    }
    info!(task_id = %id, "task marked done");
    reload_after(&state.api, Notice::success("Task marked as done!")).await
}

/// Report a successful mutation and re-render the list from a fresh fetch.
/// A failed fetch leaves whatever was last rendered.
async fn reload_after(api: &TaskApi, done: Notice) -> ActionResponse {
    match api.list_tasks().await {
        Ok(tasks) => ActionResponse::swap(render_task_list(&tasks, Utc::now())).notify(done),
        Err(_) => ActionResponse::keep()
            .notify(done)
            .notify(Notice::error("Unable to load tasks!")),
    }
}

#[derive(Deserialize)]
struct ScheduleQuery {
    #[serde(default)]
    daily_hours: Option<String>,
}

// GET /schedule - Fetch and render the schedule
async fn generate_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> ActionResponse {
    let daily_hours = query
        .daily_hours
        .as_deref()
        .and_then(parse_daily_hours)
        .or(state.daily_hours);

    match state.api.get_schedule(daily_hours).await {
        Ok(schedule) => {
            info!(days = schedule.days().len(), "schedule generated");
            ActionResponse::swap(render_schedule(&schedule)).notify(Notice::success("Schedule Updated!"))
        }
        Err(e) => {
            warn!(error = %e, "failed to generate schedule");
            ActionResponse::keep().notify(Notice::error("Failed to generate schedule"))
        }
    }
}

fn parse_daily_hours(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|h| h.is_finite() && *h > 0.0)
}

// GET /health - Local liveness plus an upstream probe
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let upstream = match state.api.health().await {
        Ok(()) => "ok",
        Err(_) => "unreachable",
    };
    Json(json!({ "status": "ok", "upstream": upstream }))
}

// ============================================================================
// Rendering
// ============================================================================

/// Full replacement for the `#task-list` region.
pub fn render_task_list(tasks: &[Task], now: DateTime<Utc>) -> String {
    if tasks.is_empty() {
        return maud! {
            p .empty-list { "No tasks yet." }
        }
        .render()
        .into_inner();
    }

    let items: Vec<String> = tasks
        .iter()
        .map(|task| render_task_list_item(task, now))
        .collect();

    maud! {
        ul .task-list {
            (Raw::dangerously_create(&items.join("\n")))
        }
    }
    .render()
    .into_inner()
}

fn render_task_list_item(task: &Task, now: DateTime<Utc>) -> String {
    let label_class = match (task.is_overdue(now), task.done) {
        (true, true) => "task-label overdue done",
        (true, false) => "task-label overdue",
        (false, true) => "task-label done",
        (false, false) => "task-label",
    };
    let label = format!("{} ({}h, {})", task.name, task.estimated_hours, task.priority);
    let id = task_path_segment(&task.id);

    let mut buttons = String::new();
    if !task.done {
        buttons.push_str(&format!(
            r##"<button class="btn" hx-post="/tasks/{}/done" hx-target="#task-list" hx-swap="innerHTML">Done</button>"##,
            id
        ));
    }
    buttons.push_str(&format!(
        r##"<button class="btn btn-danger" hx-delete="/tasks/{}" hx-target="#task-list" hx-swap="innerHTML">Delete</button>"##,
        id
    ));

    maud! {
        li .task-list-item {
            span class=(label_class) { (label) }
            (Raw::dangerously_create(&buttons))
        }
    }
    .render()
    .into_inner()
}

/// The id as a single URL path segment. Everything outside the unreserved set is
/// percent-encoded, which also keeps it inert inside an HTML attribute.
fn task_path_segment(id: &TaskId) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}

/// The add-task form in its empty state. Swapped back in after a successful add.
fn render_task_form() -> String {
    let options: String = PRIORITIES
        .iter()
        .map(|p| {
            if *p == crate::task::DEFAULT_PRIORITY {
                format!(r#"<option value="{p}" selected>{p}</option>"#)
            } else {
                format!(r#"<option value="{p}">{p}</option>"#)
            }
        })
        .collect();

    format!(
        r#"<form id="task-form" hx-post="/tasks" hx-target="this" hx-swap="outerHTML">
    <div class="field-row"><label for="task-name">Name</label><input id="task-name" name="name" type="text"></div>
    <div class="field-row"><label for="task-hours">Hours</label><input id="task-hours" name="estimated_hours" type="number" step="0.25"></div>
    <div class="field-row"><label for="task-deadline">Deadline</label><input id="task-deadline" name="deadline" type="date"></div>
    <div class="field-row"><label for="task-priority">Priority</label><select id="task-priority" name="priority">{options}</select></div>
    <button class="btn btn-default" type="submit">Add Task</button>
</form>"#
    )
}

fn render_schedule_form() -> String {
    r##"<form id="schedule-form" hx-get="/schedule" hx-target="#schedule" hx-swap="innerHTML">
    <div class="field-row"><label for="daily-hours">Hours per day</label><input id="daily-hours" name="daily_hours" type="number" step="0.5" min="0"></div>
    <button class="btn" id="btnSchedule" type="submit">Generate Schedule</button>
</form>"##
        .to_string()
}
