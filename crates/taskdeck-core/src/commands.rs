use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, DeleteOutcome};
use crate::backend::TaskBackend;
use crate::cli::{AddArgs, Command, EditArgs, ListArgs};
use crate::config::Config;
use crate::datetime::parse_deadline;
use crate::filter::{FilterCriteria, Selection, SortKey, Tab};
use crate::render::Renderer;
use crate::task::{DraftPatch, Priority, TaskDraft, TaskId};
use crate::theme::{Theme, ThemeFile};
use crate::ui::{AutoConfirm, Confirm};

/// Everything a command needs besides the application state.
pub struct Session<'a, W> {
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub theme: &'a ThemeFile,
    pub confirm: &'a mut dyn Confirm,
    pub out: W,
}

#[instrument(skip(app, ctx, command))]
pub async fn dispatch<B, W>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    command: Option<Command>,
) -> anyhow::Result<()>
where
    B: TaskBackend,
    W: Write,
{
    let command = command.unwrap_or_else(|| Command::List(ListArgs::default()));
    debug!(?command, "dispatching command");

    match command {
        Command::Health => return cmd_health(app, ctx).await,
        Command::Theme { value } => return cmd_theme(ctx, value.as_deref()),
        _ => {}
    }

    app.refresh()
        .await
        .context("failed to load tasks from the backend")?;

    match command {
        Command::List(args) => cmd_list(app, ctx, &args),
        Command::Add(args) => cmd_add(app, ctx, args).await,
        Command::Edit(args) => cmd_edit(app, ctx, args).await,
        Command::Show { id } => cmd_show(app, ctx, &id),
        Command::Toggle { id } => cmd_toggle(app, ctx, &id).await,
        Command::Delete { id, yes } => cmd_delete(app, ctx, &id, yes).await,
        Command::Categories => cmd_categories(app, ctx),
        Command::Progress => {
            ctx.renderer.render_progress(&mut ctx.out, app.progress())?;
            Ok(())
        }
        Command::Health | Command::Theme { .. } => Ok(()),
    }
}

/// Builds filter criteria from list flags, falling back to the configured
/// defaults.
pub fn criteria_from_args(cfg: &Config, args: &ListArgs) -> anyhow::Result<FilterCriteria> {
    let tab = args
        .tab
        .clone()
        .or_else(|| cfg.get("default.tab"))
        .map(|raw| raw.parse::<Tab>())
        .transpose()?
        .unwrap_or_default();
    let sort = args
        .sort
        .clone()
        .or_else(|| cfg.get("default.sort"))
        .map(|raw| raw.parse::<SortKey>())
        .transpose()?
        .unwrap_or_default();
    let category = match args.category.as_deref() {
        Some(raw) => raw.trim().parse::<Selection<String>>()?,
        None => Selection::All,
    };
    let priority = match args.priority.as_deref() {
        Some(raw) => raw.parse::<Selection<Priority>>()?,
        None => Selection::All,
    };

    Ok(FilterCriteria {
        tab,
        category,
        priority,
        search: args.search.clone().unwrap_or_default(),
        sort,
    })
}

fn render_board<B: TaskBackend, W: Write>(app: &App<B>, ctx: &mut Session<'_, W>) -> anyhow::Result<()> {
    ctx.renderer
        .render_board(&mut ctx.out, &app.display(), app.progress())
}

fn parse_id(raw: &str) -> anyhow::Result<TaskId> {
    Ok(raw.parse::<TaskId>()?)
}

fn parse_deadline_arg(raw: &str) -> anyhow::Result<Option<chrono::NaiveDate>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_deadline(raw)
        .map(Some)
        .ok_or_else(|| anyhow!("invalid deadline: {raw} (expected YYYY-MM-DD)"))
}

fn cmd_list<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    args: &ListArgs,
) -> anyhow::Result<()> {
    let criteria = criteria_from_args(ctx.cfg, args)?;
    app.set_criteria(criteria);
    render_board(app, ctx)
}

#[instrument(skip(app, ctx, args))]
async fn cmd_add<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    args: AddArgs,
) -> anyhow::Result<()> {
    info!("command add");

    let mut draft = TaskDraft::new(args.title.join(" "));
    if let Some(description) = args.description {
        draft.description = description;
    }
    if let Some(priority) = args.priority {
        draft.priority = priority.parse()?;
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if let Some(deadline) = args.deadline {
        draft.deadline = parse_deadline_arg(&deadline)?;
    }

    let created = app.create(draft).await.context("failed to create task")?;
    writeln!(ctx.out, "Created task {}.", created.id)?;
    app.set_criteria(criteria_from_args(ctx.cfg, &ListArgs::default())?);
    render_board(app, ctx)
}

#[instrument(skip(app, ctx, args))]
async fn cmd_edit<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    args: EditArgs,
) -> anyhow::Result<()> {
    info!("command edit");

    let id = parse_id(&args.id)?;
    let patch = DraftPatch {
        title: args.title,
        description: args.description,
        priority: args.priority.map(|raw| raw.parse()).transpose()?,
        category: args.category,
        deadline: if args.clear_deadline {
            Some(None)
        } else {
            args.deadline
                .as_deref()
                .map(parse_deadline_arg)
                .transpose()?
        },
    };
    if patch.is_empty() {
        return Err(anyhow!("nothing to change for task {id}"));
    }

    let mut draft = app.begin_edit(id)?;
    draft.apply(patch);
    let updated = match app.submit_edit(draft).await {
        Ok(task) => task,
        Err(err) => {
            app.cancel_edit();
            return Err(err).with_context(|| format!("failed to update task {id}"));
        }
    };

    writeln!(ctx.out, "Updated task {}.", updated.id)?;
    app.set_criteria(criteria_from_args(ctx.cfg, &ListArgs::default())?);
    render_board(app, ctx)
}

fn cmd_show<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    id: &str,
) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let task = app
        .store()
        .get(id)
        .ok_or_else(|| anyhow!("task {id} not found"))?;
    ctx.renderer.render_task(&mut ctx.out, task)
}

#[instrument(skip(app, ctx))]
async fn cmd_toggle<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    id: &str,
) -> anyhow::Result<()> {
    info!("command toggle");

    let id = parse_id(id)?;
    let task = app
        .toggle(id)
        .await
        .with_context(|| format!("failed to toggle task {id}"))?;
    let state = if task.completed { "completed" } else { "active" };
    writeln!(ctx.out, "Task {id} marked {state}.")?;
    app.set_criteria(criteria_from_args(ctx.cfg, &ListArgs::default())?);
    render_board(app, ctx)
}

#[instrument(skip(app, ctx))]
async fn cmd_delete<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
    id: &str,
    yes: bool,
) -> anyhow::Result<()> {
    info!("command delete");

    let id = parse_id(id)?;
    let mut auto = AutoConfirm(true);
    let gate: &mut dyn Confirm = if yes { &mut auto } else { &mut *ctx.confirm };

    let outcome = app
        .delete(id, gate)
        .await
        .with_context(|| format!("failed to delete task {id}"))?;
    match outcome {
        DeleteOutcome::Deleted(task) => {
            writeln!(ctx.out, "Deleted task {} \"{}\".", task.id, task.title)?;
            app.set_criteria(criteria_from_args(ctx.cfg, &ListArgs::default())?);
            render_board(app, ctx)
        }
        DeleteOutcome::Cancelled => {
            writeln!(ctx.out, "Kept task {id}.")?;
            Ok(())
        }
    }
}

fn cmd_categories<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
) -> anyhow::Result<()> {
    let categories = app.store().categories();
    if categories.is_empty() {
        writeln!(ctx.out, "No categories.")?;
        return Ok(());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for task in app.store().tasks() {
        *counts.entry(task.category.as_str()).or_insert(0) += 1;
    }

    let width = categories.iter().map(|c| c.width()).max().unwrap_or(0);
    for category in &categories {
        let count = counts.get(category.as_str()).copied().unwrap_or(0);
        let pad = width - category.width();
        writeln!(ctx.out, "{category}{:pad$} {count}", "")?;
    }
    Ok(())
}

async fn cmd_health<B: TaskBackend, W: Write>(
    app: &mut App<B>,
    ctx: &mut Session<'_, W>,
) -> anyhow::Result<()> {
    let status = app.health().await.context("backend health check failed")?;
    writeln!(ctx.out, "backend: {status}")?;
    Ok(())
}

fn cmd_theme<W: Write>(ctx: &mut Session<'_, W>, value: Option<&str>) -> anyhow::Result<()> {
    let current = ctx.theme.load()?;
    let next = match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => {
            writeln!(ctx.out, "{current}")?;
            return Ok(());
        }
        Some(v) if v == "toggle" => current.toggled(),
        Some(v) => v.parse::<Theme>()?,
    };

    ctx.theme.save(next)?;
    writeln!(ctx.out, "{next}")?;
    Ok(())
}
