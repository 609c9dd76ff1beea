//! # Routine CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create an empty store
//! - `status` - Dashboard of every system (default)
//! - `steps` - List, add, edit and remove steps
//! - `groups` - List, add, edit, show and remove groups
//! - `system` - Show or replace the items of a system
//! - `compact` - Reclaim unused space in the database file

mod commands;

use crate::config::{Backend, CliOverrides, Settings};
use crate::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Routine - steps, groups and recurring systems
///
/// Build reusable steps, collect them into ordered groups, and lay steps and
/// groups out in the Daily, Saturday, Sunday, Weekly and Monthly systems.
#[derive(Parser, Debug)]
#[command(name = "routine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the routine database [default: routine.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend [default: redb]
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show every system with its item count and total time
    Status,

    /// Manage the step library
    Steps {
        #[command(subcommand)]
        action: StepCommand,
    },

    /// Manage groups of steps
    Groups {
        #[command(subcommand)]
        action: GroupCommand,
    },

    /// Show or arrange a system
    System {
        #[command(subcommand)]
        action: SystemCommand,
    },

    /// Reclaim unused space in the database file
    Compact,
}

/// Editable fields of a step.
#[derive(Args, Debug, Clone)]
pub struct StepFields {
    /// Step name (unique)
    pub name: String,

    /// Free-text description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Estimated minutes
    #[arg(short = 't', long = "time")]
    pub estimated_time: Option<u32>,

    /// Icon (defaults to ➡️)
    #[arg(short, long)]
    pub icon: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

/// Editable fields of a group.
#[derive(Args, Debug, Clone)]
pub struct GroupFields {
    /// Group name (unique)
    pub name: String,

    /// Free-text description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Icon (defaults to 📦)
    #[arg(short, long)]
    pub icon: Option<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum StepCommand {
    /// List all steps by name
    List,

    /// Create a step
    Add(StepFields),

    /// Replace a step's fields
    Edit {
        id: u64,

        #[command(flatten)]
        fields: StepFields,
    },

    /// Delete a step and remove it from every group and system
    Rm { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// List all groups by name
    List,

    /// Create a group
    Add {
        #[command(flatten)]
        fields: GroupFields,

        /// Step ids in order (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        steps: Vec<u64>,
    },

    /// Replace a group's fields, and its steps when --steps is given
    Edit {
        id: u64,

        #[command(flatten)]
        fields: GroupFields,

        /// Step ids in order (comma-separated); `--steps` alone clears the group
        #[arg(short, long, value_delimiter = ',', num_args = 0..)]
        steps: Option<Vec<u64>>,
    },

    /// Show a group with its steps and total time
    Show { id: u64 },

    /// Delete a group and remove it from every system
    Rm { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommand {
    /// List the systems
    List,

    /// Show a system's items and total time
    Show {
        /// Daily, Saturday, Sunday, Weekly or Monthly
        name: String,
    },

    /// Replace a system's items; references to missing records are skipped
    Set {
        /// Daily, Saturday, Sunday, Weekly or Monthly
        name: String,

        /// Items in order, e.g. step-3 group-1
        items: Vec<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// The command-line part of the configuration.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            database: self.database.clone(),
            backend: self.backend,
            config: self.config.clone(),
        }
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::resolve(cli.overrides())?;
    run(&settings, cli.json_mode, cli.command)
}

/// Execute one command against resolved settings.
pub fn run(
    settings: &Settings,
    json_mode: bool,
    command: Option<Commands>,
) -> Result<(), AppError> {
    tracing::debug!(
        database = %settings.database.display(),
        backend = %settings.backend,
        "resolved configuration"
    );

    match command {
        Some(Commands::Init { force }) => cmd_init(settings, force),
        Some(Commands::Status) | None => cmd_status(settings, json_mode),
        Some(Commands::Steps { action }) => match action {
            StepCommand::List => cmd_steps_list(settings, json_mode),
            StepCommand::Add(fields) => cmd_steps_add(settings, json_mode, fields),
            StepCommand::Edit { id, fields } => cmd_steps_edit(settings, json_mode, id, fields),
            StepCommand::Rm { id } => cmd_steps_rm(settings, json_mode, id),
        },
        Some(Commands::Groups { action }) => match action {
            GroupCommand::List => cmd_groups_list(settings, json_mode),
            GroupCommand::Add { fields, steps } => {
                cmd_groups_add(settings, json_mode, fields, &steps)
            }
            GroupCommand::Edit { id, fields, steps } => {
                cmd_groups_edit(settings, json_mode, id, fields, steps.as_deref())
            }
            GroupCommand::Show { id } => cmd_groups_show(settings, json_mode, id),
            GroupCommand::Rm { id } => cmd_groups_rm(settings, json_mode, id),
        },
        Some(Commands::System { action }) => match action {
            SystemCommand::List => cmd_system_list(json_mode),
            SystemCommand::Show { name } => cmd_system_show(settings, json_mode, &name),
            SystemCommand::Set { name, items } => {
                cmd_system_set(settings, json_mode, &name, &items)
            }
        },
        Some(Commands::Compact) => cmd_compact(settings, json_mode),
    }
}
