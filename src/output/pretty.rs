use colored::Colorize;

use crate::backend::{Assignment, Client, Memory, Profile, Project, KNOWN_MEMORY_TYPES};
use crate::features::selection::MemorySelection;
use crate::features::sync::{Operation, OperationStatus, QueueStats};

fn rule() -> String {
    "─".repeat(60)
}

fn status_badge(status: Option<&str>) -> String {
    match status {
        Some("active") => "active".green().to_string(),
        Some("completed") => "completed".blue().to_string(),
        Some("draft") => "draft".yellow().to_string(),
        Some(other) => other.dimmed().to_string(),
        None => "-".dimmed().to_string(),
    }
}

/// Format a list of projects as pretty output
pub fn format_projects_pretty(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "Projects (0)\n  No projects".to_string();
    }

    let mut output = format!("Projects ({})\n", projects.len());
    output.push_str(&rule());
    output.push('\n');

    for project in projects {
        let mut line = format!("{}  {}", project.name.bold(), status_badge(project.status.as_deref()));
        if let Some(cost_center) = &project.cost_center {
            line.push_str(&format!("  {}", cost_center.cyan()));
        }
        line.push_str(&format!(
            "  {}",
            format!("{} memories", project.memories_count).dimmed()
        ));
        line.push_str(&format!("  {}", project.id.dimmed()));
        output.push_str(&line);
        output.push('\n');
    }

    output
}

/// Format a single project as pretty output
pub fn format_project_pretty(project: &Project) -> String {
    let mut output = format!("{}\n", project.name.bold());
    output.push_str(&format!("  {}: {}\n", "ID".dimmed(), project.id));
    output.push_str(&format!(
        "  {}: {}\n",
        "Status".dimmed(),
        status_badge(project.status.as_deref())
    ));
    if let Some(client_id) = &project.client_id {
        output.push_str(&format!("  {}: {}\n", "Client".dimmed(), client_id));
    }
    if let Some(cost_center) = &project.cost_center {
        output.push_str(&format!("  {}: {}\n", "Cost center".dimmed(), cost_center));
    }
    output.push_str(&format!("  {}: {}\n", "Memories".dimmed(), project.memories_count));
    if let Some(created) = &project.created_at {
        output.push_str(&format!("  {}: {}\n", "Created".dimmed(), created));
    }
    output
}

/// Format the memories of one project
pub fn format_memories_pretty(project_id: &str, memories: &[Memory]) -> String {
    if memories.is_empty() {
        return format!("Memories of {project_id} (0)\n  No memories");
    }

    let mut output = format!("Memories of {project_id} ({})\n", memories.len());
    output.push_str(&rule());
    output.push('\n');

    for memory in memories {
        output.push_str(&format!(
            "{}  v{}  {}  {}\n",
            memory.memory_type.bold(),
            memory.version.as_deref().unwrap_or("-"),
            status_badge(memory.status.as_deref()),
            memory.id.dimmed()
        ));
    }
    output
}

/// Known memory types, checked when selected
pub fn format_memory_types_pretty(selection: Option<&MemorySelection>) -> String {
    let mut output = String::from("Memory types\n");
    for memory_type in KNOWN_MEMORY_TYPES {
        let line = match selection {
            Some(sel) if sel.contains(memory_type) => format!("  {} {}\n", "[x]".green(), memory_type.bold()),
            Some(_) => format!("  [ ] {memory_type}\n"),
            None => format!("  - {memory_type}\n"),
        };
        output.push_str(&line);
    }
    output
}

/// Format memory assignments
pub fn format_assignments_pretty(assignments: &[Assignment]) -> String {
    if assignments.is_empty() {
        return "Assignments (0)\n  No assignments".to_string();
    }

    let mut output = format!("Assignments ({})\n", assignments.len());
    output.push_str(&rule());
    output.push('\n');

    for assignment in assignments {
        let who = assignment
            .user
            .as_ref()
            .and_then(|u| u.full_name.clone())
            .unwrap_or_else(|| assignment.user_id.clone());
        let mut line = format!("{} → {}", assignment.memory_id.cyan(), who.bold());
        if let Some(at) = &assignment.assigned_at {
            line.push_str(&format!("  {}", at.dimmed()));
        }
        line.push_str(&format!("  {}", assignment.id.dimmed()));
        output.push_str(&line);
        output.push('\n');
    }
    output
}

pub fn format_clients_pretty(clients: &[Client]) -> String {
    if clients.is_empty() {
        return "Clients (0)\n  No clients".to_string();
    }

    let mut output = format!("Clients ({})\n", clients.len());
    for client in clients {
        output.push_str(&format!("  {}  {}\n", client.name.bold(), client.id.dimmed()));
    }
    output
}

pub fn format_profiles_pretty(profiles: &[Profile]) -> String {
    if profiles.is_empty() {
        return "Users (0)\n  No users".to_string();
    }

    let mut output = format!("Users ({})\n", profiles.len());
    for profile in profiles {
        let role = profile
            .role
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        output.push_str(&format!(
            "  {}  {}  {}\n",
            profile.full_name.as_deref().unwrap_or("(unnamed)").bold(),
            role.cyan(),
            profile.id.dimmed()
        ));
    }
    output
}

/// Format queued operations
pub fn format_operations_pretty(operations: &[Operation]) -> String {
    if operations.is_empty() {
        return "Queue (0)\n  Nothing queued".to_string();
    }

    let mut output = format!("Queue ({})\n", operations.len());
    output.push_str(&rule());
    output.push('\n');

    for op in operations {
        let status = match op.status {
            OperationStatus::Pending => "pending".yellow(),
            OperationStatus::Failed => "failed".red(),
        };
        output.push_str(&format!(
            "#{:<4} {:<15} {:<8} {}\n",
            op.id.unwrap_or_default(),
            op.operation_type.as_str(),
            status,
            op.summary()
        ));
        if op.attempts > 0 {
            output.push_str(&format!(
                "      {} attempt(s), last error: {}\n",
                op.attempts,
                op.last_error.as_deref().unwrap_or("-").dimmed()
            ));
        }
    }
    output
}

/// Format queue statistics
pub fn format_queue_stats_pretty(stats: &QueueStats) -> String {
    let mut lines = vec!["Sync Queue Status".bold().to_string(), "─".repeat(40)];

    lines.push(format!(
        "  Pending:  {} {}",
        stats.pending,
        if stats.pending > 0 {
            "operations waiting".dimmed()
        } else {
            "".dimmed()
        }
    ));
    lines.push(format!(
        "  Failed:   {} {}",
        stats.failed,
        if stats.failed > 0 {
            "parked (use `mecal sync retry`)".red()
        } else {
            "".dimmed()
        }
    ));
    if let Some(oldest) = stats.oldest_pending {
        lines.push(format!(
            "  Oldest:   {}",
            oldest.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    lines.join("\n")
}
