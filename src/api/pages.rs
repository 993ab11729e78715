//! Dashboard HTML page handler.
//!
//! Renders every memo and every todo into a single self-contained page.

use super::AppState;
use crate::memos::Memo;
use crate::tasks::TaskView;
use axum::extract::State;
use axum::response::Html;

pub async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let memos = state.memos.get_all().await;
    let tasks = state.tasks.get_all().await;
    let tasks = state.tasks.view_all(tasks);

    Html(render_dashboard(&memos, &tasks))
}

fn render_dashboard(memos: &[Memo], tasks: &[TaskView]) -> String {
    let memo_items = if memos.is_empty() {
        "<p class=\"empty\">메모가 없습니다.</p>".to_string()
    } else {
        memos.iter().map(render_memo).collect::<Vec<_>>().join("\n")
    };

    let task_items = if tasks.is_empty() {
        "<p class=\"empty\">할 일이 없습니다.</p>".to_string()
    } else {
        tasks.iter().map(render_task).collect::<Vec<_>>().join("\n")
    };

    let completed = tasks.iter().filter(|t| t.task.completed).count();

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="utf-8">
<title>메모장 + TODO 리스트</title>
<link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
<header>
  <h1>메모장 + TODO 리스트</h1>
  <div class="stats">
    <span class="stat">메모 {memo_count}개</span>
    <span class="stat">할 일 {task_count}개 (완료 {completed}개)</span>
  </div>
</header>
<main>
  <section id="memos">
    <h2>메모</h2>
    {memo_items}
  </section>
  <section id="todos">
    <h2>할 일</h2>
    {task_items}
  </section>
</main>
<script src="/static/js/app.js"></script>
</body>
</html>
"#,
        memo_count = memos.len(),
        task_count = tasks.len(),
    )
}

fn render_memo(memo: &Memo) -> String {
    let tags: String = memo
        .tags
        .iter()
        .map(|tag| format!("<span class=\"tag\">#{}</span>", escape_html(tag)))
        .collect();

    format!(
        r#"<article class="memo" data-id="{id}">
  <h3>{title}</h3>
  <p>{content}</p>
  <div class="tags">{tags}</div>
  <time>{updated}</time>
</article>"#,
        id = escape_html(&memo.id),
        title = escape_html(&memo.title),
        content = escape_html(&memo.content),
        updated = memo.updated_at.format("%Y-%m-%d %H:%M"),
    )
}

fn render_task(view: &TaskView) -> String {
    let task = &view.task;
    let mut classes = vec!["todo"];
    if task.completed {
        classes.push("completed");
    }
    if view.is_overdue {
        classes.push("overdue");
    }

    let due = match (task.due_date, task.due_time.as_deref()) {
        (Some(date), Some(time)) => format!("{} {}", date, escape_html(time)),
        (Some(date), None) => date.to_string(),
        (None, _) => "-".to_string(),
    };
    let remaining = view
        .time_remaining
        .as_deref()
        .map(escape_html)
        .unwrap_or_default();
    let description = task
        .description
        .as_deref()
        .map(|d| format!("<p>{}</p>", escape_html(d)))
        .unwrap_or_default();

    format!(
        r#"<article class="{classes}" data-id="{id}">
  <input type="checkbox"{checked} disabled>
  <h3>{title}</h3>
  {description}
  <span class="due">{due}</span>
  <span class="remaining">{remaining}</span>
</article>"#,
        classes = classes.join(" "),
        id = escape_html(&task.id),
        checked = if task.completed { " checked" } else { "" },
        title = escape_html(&task.title),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
