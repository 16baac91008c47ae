//! Task management commands for CLI.

use clap::Subcommand;
use dayweave_core::calendar::{TaskId, UserId};
use dayweave_core::NewTask;

use super::{open_planner, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a backlog task
    Create {
        /// Owner user ID
        user: UserId,
        /// Task name
        name: String,
        /// Estimated duration in minutes
        #[arg(long)]
        minutes: i64,
        /// Priority; higher is picked first (default: 0)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        priority: i32,
        /// User the task is delegated to
        #[arg(long)]
        assignee: Option<UserId>,
    },
    /// List tasks of a user
    List {
        /// Owner user ID
        user: UserId,
        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },
    /// Mark a task as done
    Complete {
        /// Task ID
        id: TaskId,
    },
}

pub fn run(action: TaskAction) -> CmdResult {
    let planner = open_planner()?;

    match action {
        TaskAction::Create {
            user,
            name,
            minutes,
            priority,
            assignee,
        } => {
            let task = NewTask {
                assignee_id: assignee,
                ..NewTask::new(user, name, minutes, priority)
            };
            print_json(&planner.create_task(task)?)?;
        }
        TaskAction::List { user, open } => {
            let tasks: Vec<_> = planner
                .list_tasks(user)?
                .into_iter()
                .filter(|t| !open || !t.is_done())
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Complete { id } => print_json(&planner.complete_task(id)?)?,
    }
    Ok(())
}
