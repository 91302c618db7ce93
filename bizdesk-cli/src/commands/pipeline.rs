//! Pipeline command handlers
//!
//! Handles all pipeline-related CLI commands: creation, listing, tree and
//! detail views, stage items, status changes, and structure edits. All of
//! them work on the local store.

use anyhow::{Context, Result, anyhow};
use bizdesk_core::domain::log::{ActivityLog, Actor};
use bizdesk_core::domain::pipeline::{PipelineItem, PipelineNode, PipelineStatus, Priority, StageName};
use bizdesk_core::dto::pipeline::PipelineSummary;
use bizdesk_core::service::{NewPipeline, PipelineService};
use bizdesk_core::store::FileStore;
use bizdesk_core::tree::{ForestIssue, count_nodes};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::*;
use std::sync::Arc;

use crate::config::Config;
use crate::id_resolver::{IdOrPrefix, resolve_item_id, resolve_pipeline_id};

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create a pipeline together with its first stage item
    Create {
        /// Pipeline name
        name: String,

        /// Parent pipeline ID or prefix
        #[arg(long)]
        parent: Option<IdOrPrefix>,

        /// Start as pending approval instead of active
        #[arg(long)]
        pending: bool,

        /// Stage for the first item
        #[arg(long, default_value = "RFQ", value_parser = parse_stage)]
        stage: StageName,

        #[command(flatten)]
        item: ItemArgs,
    },
    /// List all pipelines
    List,
    /// Show pipelines as a tree
    Tree,
    /// Show pipeline details with stage items
    Show {
        /// Pipeline ID or unambiguous prefix
        id: IdOrPrefix,
    },
    /// Add an item to a stage
    AddItem {
        /// Pipeline ID or unambiguous prefix
        id: IdOrPrefix,

        #[arg(long, default_value = "RFQ", value_parser = parse_stage)]
        stage: StageName,

        #[command(flatten)]
        item: ItemArgs,
    },
    /// Remove an item
    RemoveItem {
        /// Pipeline ID or unambiguous prefix
        id: IdOrPrefix,
        /// Item ID or unambiguous prefix
        item: IdOrPrefix,
    },
    /// Move an item to another stage
    MoveItem {
        /// Pipeline ID or unambiguous prefix
        id: IdOrPrefix,
        /// Item ID or unambiguous prefix
        item: IdOrPrefix,
        /// Target stage
        #[arg(long, value_parser = parse_stage)]
        to: StageName,
    },
    /// Rename a pipeline
    Rename { id: IdOrPrefix, name: String },
    /// Approve a pending pipeline
    Approve { id: IdOrPrefix },
    /// Reject a pipeline
    Reject {
        id: IdOrPrefix,
        /// Why the pipeline is rejected
        #[arg(short, long)]
        reason: String,
    },
    /// Mark an active pipeline completed
    Complete { id: IdOrPrefix },
    /// Delete a pipeline and all pipelines below it
    Delete { id: IdOrPrefix },
    /// Move a pipeline under another one
    Move {
        id: IdOrPrefix,
        /// New parent; omit to move to the top level
        #[arg(long)]
        parent: Option<IdOrPrefix>,
    },
    /// Show the activity history of a pipeline
    Logs { id: IdOrPrefix },
    /// Check the stored pipelines for structural problems
    Validate {
        /// Drop orphaned and cyclic records from the store
        #[arg(long)]
        repair: bool,
    },
}

/// Stage item fields
#[derive(Args, Debug)]
pub struct ItemArgs {
    /// Company the item is for
    #[arg(long)]
    company: String,

    #[arg(long, default_value = "")]
    contact: String,

    #[arg(long, default_value = "")]
    department: String,

    #[arg(long, default_value = "")]
    state: String,

    #[arg(long, default_value = "")]
    description: String,

    #[arg(long, default_value = "")]
    source: String,

    /// Item date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long)]
    deadline: Option<NaiveDate>,

    #[arg(long, default_value = "medium", value_parser = parse_priority)]
    priority: Priority,

    /// Extra stage fields as key=value pairs (e.g., bill_number=B-10)
    #[arg(short, long, value_parser = parse_key_val)]
    field: Vec<(String, String)>,
}

impl ItemArgs {
    fn into_item(self) -> PipelineItem {
        let mut item = PipelineItem::new(self.company);
        item.contact = self.contact;
        item.department = self.department;
        item.state = self.state;
        item.description = self.description;
        item.source = self.source;
        item.date = self.date;
        item.deadline = self.deadline;
        item.priority = self.priority;
        item.extra = self
            .field
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        item
    }
}

fn parse_stage(s: &str) -> Result<StageName> {
    StageName::parse(s).ok_or_else(|| anyhow!("unknown stage `{}`", s))
}

fn parse_priority(s: &str) -> Result<Priority> {
    match s.to_ascii_lowercase().as_str() {
        "high" => Ok(Priority::High),
        "medium" => Ok(Priority::Medium),
        "low" => Ok(Priority::Low),
        _ => Err(anyhow!("priority must be high, medium or low")),
    }
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}

/// Handle pipeline commands
///
/// # Arguments
/// * `command` - The pipeline command to execute
/// * `config` - The CLI configuration
pub fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let store = config.open_store()?;
    let actor = config.actor(&store);
    let service = PipelineService::new(store);

    match command {
        PipelineCommands::Create {
            name,
            parent,
            pending,
            stage,
            item,
        } => create_pipeline(&service, &actor, name, parent, pending, stage, item),
        PipelineCommands::List => list_pipelines(&service),
        PipelineCommands::Tree => print_tree(&service),
        PipelineCommands::Show { id } => {
            let node = service.get(resolve(&service, &id)?)?;
            print_pipeline_details(&node);
            Ok(())
        }
        PipelineCommands::AddItem { id, stage, item } => {
            let id = resolve(&service, &id)?;
            let node = service.add_item(id, stage, item.into_item(), &actor)?;
            success(&format!("Item added to {} in '{}'", stage, node.name));
            Ok(())
        }
        PipelineCommands::RemoveItem { id, item } => {
            let node = service.get(resolve(&service, &id)?)?;
            let item_id = resolve_item_id(&node, &item)?;
            let node = service.remove_item(node.id, item_id, &actor)?;
            success(&format!("Item {} removed from '{}'", item_id, node.name));
            if !node.should_save() {
                println!(
                    "  {}",
                    "Pipeline has no items left and is no longer stored.".yellow()
                );
            }
            Ok(())
        }
        PipelineCommands::MoveItem { id, item, to } => {
            let node = service.get(resolve(&service, &id)?)?;
            let item_id = resolve_item_id(&node, &item)?;
            service.move_item(node.id, item_id, to, &actor)?;
            success(&format!("Item {} moved to {}", item_id, to));
            Ok(())
        }
        PipelineCommands::Rename { id, name } => {
            let node = service.rename(resolve(&service, &id)?, &name, &actor)?;
            success(&format!("Pipeline renamed to '{}'", node.name));
            Ok(())
        }
        PipelineCommands::Approve { id } => {
            let node = service.approve(resolve(&service, &id)?, &actor)?;
            success(&format!("Pipeline '{}' approved", node.name));
            Ok(())
        }
        PipelineCommands::Reject { id, reason } => {
            let node = service.reject(resolve(&service, &id)?, &reason, &actor)?;
            success(&format!("Pipeline '{}' rejected", node.name));
            Ok(())
        }
        PipelineCommands::Complete { id } => {
            let node = service.complete(resolve(&service, &id)?, &actor)?;
            success(&format!("Pipeline '{}' completed", node.name));
            Ok(())
        }
        PipelineCommands::Delete { id } => {
            let removed = service.delete(resolve(&service, &id)?)?;
            success(&format!("Deleted {} pipeline(s)", removed.len()));
            for id in removed {
                println!("  {}", id.to_string().dimmed());
            }
            Ok(())
        }
        PipelineCommands::Move { id, parent } => {
            let id = resolve(&service, &id)?;
            let parent = parent.map(|p| resolve(&service, &p)).transpose()?;
            let node = service.move_under(id, parent, &actor)?;
            match parent {
                Some(p) => success(&format!("Pipeline '{}' moved under {}", node.name, p)),
                None => success(&format!("Pipeline '{}' moved to the top level", node.name)),
            }
            Ok(())
        }
        PipelineCommands::Logs { id } => {
            let id = resolve(&service, &id)?;
            print_activity(&service.activity(id)?);
            Ok(())
        }
        PipelineCommands::Validate { repair } => validate_pipelines(&service, repair),
    }
}

type Service = PipelineService<Arc<FileStore>>;

fn resolve(service: &Service, id: &IdOrPrefix) -> Result<uuid::Uuid> {
    resolve_pipeline_id(&service.list(), id)
}

fn success(message: &str) {
    println!("{}", format!("✓ {}", message).green().bold());
}

/// Create a new pipeline with its first item
fn create_pipeline(
    service: &Service,
    actor: &Actor,
    name: String,
    parent: Option<IdOrPrefix>,
    pending: bool,
    stage: StageName,
    item: ItemArgs,
) -> Result<()> {
    let parent_id = parent.map(|p| resolve(service, &p)).transpose()?;
    let status = if pending {
        PipelineStatus::Pending
    } else {
        PipelineStatus::Active
    };

    let node = service
        .create(
            NewPipeline {
                name,
                parent_id,
                status,
                first_item: Some((stage, item.into_item())),
            },
            actor,
        )
        .context("Failed to create pipeline")?;

    success("Pipeline created successfully!");
    println!("  ID:     {}", node.id.to_string().cyan());
    println!("  Name:   {}", node.name.bold());
    println!("  Status: {}", status_label(&node.status));
    if let Some(parent) = node.parent_id {
        println!("  Parent: {}", parent.to_string().dimmed());
    }

    Ok(())
}

/// List all pipelines, flattened
fn list_pipelines(service: &Service) -> Result<()> {
    let summaries = PipelineSummary::from_forest(&service.list());

    if summaries.is_empty() {
        println!("{}", "No pipelines found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} pipeline(s):", summaries.len()).bold());
    println!();
    for summary in &summaries {
        print_pipeline_summary(summary);
    }

    Ok(())
}

fn print_tree(service: &Service) -> Result<()> {
    let forest = service.list();
    if forest.is_empty() {
        println!("{}", "No pipelines found.".yellow());
        return Ok(());
    }

    fn walk(node: &PipelineNode, depth: usize) {
        println!(
            "{}{} {} {} {}",
            "  ".repeat(depth),
            "▸".cyan(),
            node.name.bold(),
            status_label(&node.status),
            format!("({} items) {}", node.item_count(), short_id(node.id)).dimmed()
        );
        for child in &node.children {
            walk(child, depth + 1);
        }
    }

    for root in &forest {
        walk(root, 0);
    }
    println!();
    println!(
        "{}",
        format!("{} pipeline(s) in {} tree(s)", count_nodes(&forest), forest.len()).dimmed()
    );
    Ok(())
}

fn validate_pipelines(service: &Service, repair: bool) -> Result<()> {
    let issues = service.check();
    if issues.is_empty() {
        success("No structural problems found");
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} problem(s):", issues.len()).red().bold()
    );
    for issue in &issues {
        let line = match issue {
            ForestIssue::DuplicateId(id) => format!("duplicate id {}", id),
            ForestIssue::Orphan { id, parent_id } => {
                format!("{} points at missing parent {}", id, parent_id)
            }
            ForestIssue::Cycle(id) => format!("{} is part of a parent cycle", id),
        };
        println!("  {} {}", "✗".red(), line);
    }

    if repair {
        let dropped = service.repair().context("Failed to repair pipeline store")?;
        success(&format!("Dropped {} unreachable record(s)", dropped));
        return Ok(());
    }
    Err(anyhow!("pipeline store has {} structural problem(s)", issues.len()))
}

fn status_label(status: &PipelineStatus) -> ColoredString {
    match status {
        PipelineStatus::Active => "active".green(),
        PipelineStatus::Pending => "pending".yellow(),
        PipelineStatus::Rejected { .. } => "rejected".red(),
        PipelineStatus::Completed { .. } => "completed".blue(),
    }
}

fn short_id(id: uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Print a pipeline summary
fn print_pipeline_summary(summary: &PipelineSummary) {
    println!("  {} {}", "▸".cyan(), summary.name.bold());
    println!("    ID:       {}", summary.id.to_string().dimmed());
    println!("    Status:   {}", summary.status);
    println!("    Owner:    {}", summary.owner.dimmed());
    println!(
        "    Items:    {} ({} sub-pipeline(s))",
        summary.item_count, summary.child_count
    );
    println!(
        "    Updated:  {}",
        summary
            .updated_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed pipeline information
fn print_pipeline_details(node: &PipelineNode) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:       {}", node.id.to_string().cyan());
    println!("  Name:     {}", node.name.bold());
    println!("  Status:   {}", status_label(&node.status));
    println!("  Owner:    {}", node.user_name);
    if let Some(parent) = node.parent_id {
        println!("  Parent:   {}", parent);
    }
    println!("  Created:  {}", node.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:  {}", node.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(info) = node.status.rejection_info() {
        println!(
            "  Rejected: {} by {} ({})",
            info.rejected_at.format("%Y-%m-%d %H:%M:%S"),
            info.rejected_by_name,
            info.reason.red()
        );
    }
    if let Some(at) = node.status.completed_at() {
        println!("  Completed: {}", at.format("%Y-%m-%d %H:%M:%S"));
    }

    println!("\n{}", "Stages:".bold());
    for stage in &node.stages {
        let count = format!("({})", stage.items.len());
        if stage.items.is_empty() {
            println!("  {} {}", stage.name.to_string().dimmed(), count.dimmed());
            continue;
        }
        println!("  {} {}", stage.name.to_string().bold(), count);
        for item in &stage.items {
            let deadline = item
                .deadline
                .map(|d| format!(" due {}", d))
                .unwrap_or_default();
            println!(
                "    - {} {} [{}]{}",
                item.company_name,
                short_id(item.id).dimmed(),
                item.priority,
                deadline.yellow()
            );
        }
    }

    if !node.children.is_empty() {
        println!("\n{}", "Sub-pipelines:".bold());
        for child in &node.children {
            println!(
                "  {} {} {}",
                "▸".cyan(),
                child.name,
                status_label(&child.status)
            );
        }
    }
}

fn print_activity(logs: &[ActivityLog]) {
    if logs.is_empty() {
        println!("{}", "No activity recorded.".yellow());
        return;
    }

    for entry in logs {
        let who = entry.user_name.as_deref().unwrap_or("system");
        let details = entry
            .details
            .as_deref()
            .map(|d| format!(" - {}", d))
            .unwrap_or_default();
        println!(
            "{} {} {}{}",
            entry
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            entry.action.cyan(),
            who,
            details
        );
    }
}
