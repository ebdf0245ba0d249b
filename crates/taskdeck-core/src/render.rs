use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_date, format_timestamp};
use crate::task::{Priority, Task};

pub const EMPTY_STATE: &str = "No tasks found.";

/// Completion progress over the entire store, independent of filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|t| t.completed).count(),
            total: tasks.len(),
        }
    }

    /// `round(completed / total * 100)`, 0 for an empty store.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let ratio = self.completed as f64 / self.total as f64;
        (ratio * 100.0).round() as u8
    }

    pub fn count_label(&self) -> String {
        if self.total == 1 {
            "1 task".to_string()
        } else {
            format!("{} tasks", self.total)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, writer, tasks, progress), fields(rows = tasks.len()))]
    pub fn render_board<W: Write>(
        &self,
        mut writer: W,
        tasks: &[Task],
        progress: Progress,
    ) -> anyhow::Result<()> {
        self.render_progress(&mut writer, progress)?;
        writeln!(writer)?;

        if tasks.is_empty() {
            writeln!(writer, "{EMPTY_STATE}")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Title".to_string(),
            "Priority".to_string(),
            "Category".to_string(),
            "Deadline".to_string(),
            "Created".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let check = if task.completed { "[x]" } else { "[ ]" };
            let title = if task.completed {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };
            let deadline = task.deadline.map(format_date).unwrap_or_default();

            rows.push(Row {
                cells: vec![
                    self.paint(&task.id.to_string(), "33"),
                    check.to_string(),
                    title,
                    self.paint(task.priority.as_str(), priority_color(task.priority)),
                    self.paint(&task.category, "36"),
                    deadline,
                    format_timestamp(task.created_at),
                ],
                detail: task
                    .has_description()
                    .then(|| task.description.trim().to_string()),
            });
        }

        write_table(&mut writer, headers, rows)?;
        Ok(())
    }

    pub fn render_progress<W: Write>(&self, mut writer: W, progress: Progress) -> anyhow::Result<()> {
        writeln!(
            writer,
            "Progress: {}% ({}/{} done) | {}",
            progress.percent(),
            progress.completed,
            progress.total,
            progress.count_label()
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, writer, task), fields(id = %task.id))]
    pub fn render_task<W: Write>(&self, mut writer: W, task: &Task) -> anyhow::Result<()> {
        writeln!(writer, "id          {}", task.id)?;
        writeln!(writer, "title       {}", task.title)?;
        writeln!(
            writer,
            "status      {}",
            if task.completed { "completed" } else { "active" }
        )?;
        writeln!(writer, "priority    {}", task.priority)?;
        writeln!(writer, "category    {}", task.category)?;
        if let Some(deadline) = task.deadline {
            writeln!(writer, "deadline    {}", format_date(deadline))?;
        }
        writeln!(writer, "created     {}", format_timestamp(task.created_at))?;
        if task.has_description() {
            writeln!(writer, "description {}", task.description.trim())?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

struct Row {
    cells: Vec<String>,
    detail: Option<String>,
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Row>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.cells.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let indent = widths[0] + widths[1] + 2;

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.cells.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;

        if let Some(detail) = row.detail {
            writeln!(writer, "{}{}", " ".repeat(indent), detail)?;
        }
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{EMPTY_STATE, Progress, Renderer, strip_ansi};
    use crate::task::{Priority, Task, TaskId};

    fn task(id: u64, title: &str, completed: bool) -> Task {
        Task {
            id: TaskId(id),
            title: title.to_string(),
            description: String::new(),
            priority: Priority::High,
            category: "work".to_string(),
            deadline: None,
            completed,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 5)
                .and_then(|d| d.and_hms_opt(10, 0, 0))
                .expect("valid timestamp"),
        }
    }

    fn render(display: &[Task], progress: Progress) -> String {
        let mut out = Vec::new();
        Renderer::plain()
            .render_board(&mut out, display, progress)
            .expect("render board");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn progress_rounds_over_whole_store() {
        let tasks = vec![task(1, "a", false), task(2, "b", true)];
        assert_eq!(Progress::from_tasks(&tasks).percent(), 50);

        let tasks = vec![task(1, "a", true), task(2, "b", false), task(3, "c", false)];
        assert_eq!(Progress::from_tasks(&tasks).percent(), 33);

        let tasks = vec![task(1, "a", true), task(2, "b", true), task(3, "c", false)];
        assert_eq!(Progress::from_tasks(&tasks).percent(), 67);

        assert_eq!(Progress::from_tasks(&[]).percent(), 0);
    }

    #[test]
    fn count_label_is_pluralised() {
        assert_eq!(Progress::from_tasks(&[]).count_label(), "0 tasks");
        assert_eq!(Progress::from_tasks(&[task(1, "a", false)]).count_label(), "1 task");
        assert_eq!(
            Progress::from_tasks(&[task(1, "a", false), task(2, "b", false)]).count_label(),
            "2 tasks"
        );
    }

    #[test]
    fn empty_display_shows_empty_state() {
        let text = render(&[], Progress::from_tasks(&[]));
        assert!(text.contains("Progress: 0%"));
        assert!(text.contains("0 tasks"));
        assert!(text.contains(EMPTY_STATE));
        assert!(!text.contains("Title"));
    }

    #[test]
    fn rows_show_badges_dates_and_description() {
        let mut shown = task(4, "Write changelog", true);
        shown.description = "cover the API changes".to_string();
        shown.deadline = NaiveDate::from_ymd_opt(2025, 2, 14);

        let text = render(&[shown.clone()], Progress::from_tasks(&[shown]));
        assert!(text.contains("[x]"));
        assert!(text.contains("Write changelog"));
        assert!(text.contains("high"));
        assert!(text.contains("work"));
        assert!(text.contains("Feb 14, 2025"));
        assert!(text.contains("Jan 5, 2025"));
        assert!(text.contains("cover the API changes"));
        assert!(text.contains("100%"));
        assert!(!text.contains(EMPTY_STATE));
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mhigh\x1b[0m"), "high");
    }
}
