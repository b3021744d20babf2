//! Record command handlers, shared by every entity kind.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tabled::Tabled;

use syncboard_core::{
    AdditionalTask, CoreError, Deviation, Entity, EntityId, EntityView, Project, WireEntity,
    Workspace,
};

use crate::cli::{FieldArgs, KindCommand, ListArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

/// A kind the CLI can list and show.
pub trait Listed: WireEntity + Serialize {
    type Row: Tabled;

    fn row(&self) -> Self::Row;

    /// Label/value pairs for the single-record view.
    fn details(&self) -> Vec<(&'static str, String)>;

    fn view(workspace: &Workspace) -> &EntityView<Self>;
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle<E: Listed>(ctx: &Context, cmd: KindCommand) -> Result<(), CliError> {
    let view = E::view(&ctx.workspace);

    match cmd {
        KindCommand::List(args) => {
            apply_filters(view, &args)?;
            let items = view.items();
            let out = output::render_list(
                ctx.format,
                items.as_slice(),
                |e| e.row(),
                |e| e.id().to_string(),
            );
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        KindCommand::Get { id } => {
            let id = EntityId::from(id);
            let record = view.get(&id).ok_or_else(|| {
                CliError::from(CoreError::NotFound {
                    kind: E::KIND,
                    id: id.clone(),
                })
            })?;
            show(ctx, &record);
            Ok(())
        }

        KindCommand::Create(fields) => {
            let draft: E::Draft = parse_fields(&fields)?;
            let created = ctx.persist(view.create_entity(draft).await).await?;
            show(ctx, &created);
            Ok(())
        }

        KindCommand::Update { id, fields } => {
            let id = EntityId::from(id);
            let patch: E::Patch = parse_fields(&fields)?;
            let updated = ctx.persist(view.update_entity(&id, patch).await).await?;
            show(ctx, &updated);
            Ok(())
        }

        KindCommand::Delete { id } => {
            let id = EntityId::from(id);
            ctx.persist(view.delete_entity(&id).await).await
        }

        KindCommand::Pin { id } => {
            let id = EntityId::from(id);
            let toggled = ctx.persist(view.toggle_pinned(&id).await).await?;
            show(ctx, &toggled);
            Ok(())
        }
    }
}

pub(super) fn show<E: Listed>(ctx: &Context, record: &Arc<E>) {
    let out = output::render_single(
        ctx.format,
        record,
        |e| render_details(&e.details()),
        |e| e.id().to_string(),
    );
    output::print_output(&out, ctx.quiet);
}

fn render_details(details: &[(&'static str, String)]) -> String {
    let width = details.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in details {
        if value.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{label:<width$}  {value}");
    }
    out.trim_end().to_owned()
}

// ── Filters ─────────────────────────────────────────────────────────

fn apply_filters<E: Entity>(view: &EntityView<E>, args: &ListArgs) -> Result<(), CliError> {
    view.clear_filters();
    if let Some(search) = &args.search {
        view.set_filter_parameter("query", search.as_str())?;
    }
    for expr in &args.filter {
        let (name, value) = split_assignment("--filter", expr)?;
        view.set_filter_parameter(name, value)?;
    }
    Ok(())
}

// ── Field assignments ───────────────────────────────────────────────

/// Build a draft or patch from `--set` / `--set-json` pairs. Fields the
/// target type does not know are rejected rather than dropped.
pub(crate) fn parse_fields<T>(fields: &FieldArgs) -> Result<T, CliError>
where
    T: Serialize + DeserializeOwned,
{
    let mut object = serde_json::Map::new();
    for expr in &fields.set {
        let (key, text) = split_assignment("--set", expr)?;
        object.insert(key.to_owned(), text_value(key, text));
    }
    for expr in &fields.set_json {
        let (key, raw) = split_assignment("--set-json", expr)?;
        let value = serde_json::from_str(raw).map_err(|e| CliError::Validation {
            field: key.to_owned(),
            reason: format!("invalid JSON: {e}"),
        })?;
        object.insert(key.to_owned(), value);
    }
    if object.is_empty() {
        return Err(CliError::Validation {
            field: "fields".into(),
            reason: "nothing to set; pass --set FIELD=TEXT or --set-json FIELD=JSON".into(),
        });
    }

    let keys: Vec<String> = object.keys().cloned().collect();
    let parsed: T =
        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            CliError::Validation {
                field: "fields".into(),
                reason: e.to_string(),
            }
        })?;

    let known = serde_json::to_value(&parsed)?;
    if let Some(unknown) = keys.iter().find(|k| known.get(k.as_str()).is_none()) {
        return Err(CliError::Validation {
            field: unknown.clone(),
            reason: "no such field".into(),
        });
    }
    Ok(parsed)
}

fn split_assignment<'a>(flag: &str, expr: &'a str) -> Result<(&'a str, &'a str), CliError> {
    match expr.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::Validation {
            field: flag.into(),
            reason: format!("expected NAME=VALUE, got '{expr}'"),
        }),
    }
}

/// Plain text, except numeric ids, which stay numbers so they match
/// the ids the store hands out.
fn text_value(key: &str, text: &str) -> serde_json::Value {
    let is_id = key == "id" || key.ends_with("_id");
    match text.parse::<u64>() {
        Ok(n) if is_id => serde_json::Value::from(n),
        _ => serde_json::Value::from(text),
    }
}

// ── Table rows & details ────────────────────────────────────────────

fn opt<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

#[derive(Tabled)]
pub struct ProjectRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "")]
    pinned: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl Listed for Project {
    type Row = ProjectRow;

    fn row(&self) -> ProjectRow {
        ProjectRow {
            id: self.id.to_string(),
            pinned: if self.pinned { "★" } else { "" },
            name: self.name.clone(),
            code: opt(self.code.as_ref()),
            customer: opt(self.customer.as_ref()),
            status: self.status.to_string(),
        }
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Code", opt(self.code.as_ref())),
            ("Customer", opt(self.customer.as_ref())),
            ("Status", self.status.to_string()),
            ("Pinned", if self.pinned { "yes" } else { "no" }.into()),
            ("Description", opt(self.description.as_ref())),
            ("Created", opt(self.created_at.as_ref())),
        ]
    }

    fn view(workspace: &Workspace) -> &EntityView<Self> {
        workspace.projects()
    }
}

#[derive(Tabled)]
pub struct DeviationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Project")]
    project: String,
}

impl Listed for Deviation {
    type Row = DeviationRow;

    fn row(&self) -> DeviationRow {
        DeviationRow {
            id: self.id.to_string(),
            title: self.title.clone(),
            severity: self.severity.to_string(),
            status: self.status.to_string(),
            project: opt(self.project_id.as_ref()),
        }
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.to_string()),
            ("Title", self.title.clone()),
            ("Severity", self.severity.to_string()),
            ("Status", self.status.to_string()),
            ("Project", opt(self.project_id.as_ref())),
            ("Reported by", opt(self.reported_by.as_ref())),
            ("Description", opt(self.description.as_ref())),
            ("Created", opt(self.created_at.as_ref())),
        ]
    }

    fn view(workspace: &Workspace) -> &EntityView<Self> {
        workspace.deviations()
    }
}

#[derive(Tabled)]
pub struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Hours")]
    hours: String,
    #[tabled(rename = "From deviation")]
    source: String,
}

impl Listed for AdditionalTask {
    type Row = TaskRow;

    fn row(&self) -> TaskRow {
        TaskRow {
            id: self.id.to_string(),
            title: self.title.clone(),
            status: self.status.to_string(),
            project: opt(self.project_id.as_ref()),
            hours: opt(self.estimated_hours.as_ref()),
            source: opt(self.source_deviation_id.as_ref()),
        }
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.to_string()),
            ("Title", self.title.clone()),
            ("Status", self.status.to_string()),
            ("Project", opt(self.project_id.as_ref())),
            ("Estimated hours", opt(self.estimated_hours.as_ref())),
            ("From deviation", opt(self.source_deviation_id.as_ref())),
            ("Description", opt(self.description.as_ref())),
            ("Created", opt(self.created_at.as_ref())),
        ]
    }

    fn view(workspace: &Workspace) -> &EntityView<Self> {
        workspace.additional_tasks()
    }
}
