use std::path::PathBuf;

use clap::Subcommand;

use crate::ai::AssetType;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and invite code)
    Init {
        /// Data directory for the database and settings
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Invite code students register with (random if omitted)
        #[arg(long)]
        invite_code: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Create student accounts that finish setup on first login
    SeedStudents {
        /// Data directory for the database and settings
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Number of accounts to create
        #[arg(long, short = 'n', default_value = "25")]
        count: u32,

        /// Username prefix; accounts are numbered from 1
        #[arg(long, default_value = "leerling")]
        prefix: String,
    },

    /// List all accounts
    Users {
        /// Data directory for the database and settings
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in to a Vibe Coder server
    Login {
        /// Server URL (e.g. localhost:8080)
        #[arg(long)]
        server: Option<String>,

        /// Username
        #[arg(long, short)]
        username: Option<String>,

        /// Password (not needed before profile setup)
        #[arg(long, env = "VIBECODER_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Finish profile setup: pick a display name and password
    Setup {
        /// Display name
        #[arg(long)]
        display_name: Option<String>,

        /// New password
        #[arg(long, env = "VIBECODER_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Log out and remove stored credentials
    Logout,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List your projects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a project
    Create {
        /// Project title
        title: String,

        /// Start from a workspace directory or snapshot file instead of the starter template
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Download a project as a snapshot file
    Pull {
        /// Project ID
        id: String,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Upload a workspace directory or snapshot file into a project
    Push {
        /// Project ID
        id: String,

        /// Workspace directory or snapshot file
        path: PathBuf,

        /// Keep the previous code as a version
        #[arg(long)]
        save_version: bool,
    },

    /// Delete a project and its versions
    Delete {
        /// Project ID
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Skip interactive prompts (requires --yes)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List saved versions of a project
    Versions {
        /// Project ID
        id: String,
    },

    /// Check a project out and autosave edits until Ctrl-C
    Edit {
        /// Project ID
        id: String,

        /// Snapshot file (*.json) or directory for index.html, style.css and script.js
        path: PathBuf,

        /// Seconds of quiet before an autosave
        #[arg(long)]
        delay: Option<u64>,

        /// Keep a version when the final save happens on exit
        #[arg(long)]
        version_on_exit: bool,
    },
}

#[derive(clap::Args)]
pub struct ChatArgs {
    /// Question for the tutor (starts a conversation if omitted)
    pub message: Option<String>,

    /// Snapshot file or workspace directory the question is about
    #[arg(long, short)]
    pub snapshot: PathBuf,

    /// Write the tutor's code blocks into the workspace
    #[arg(long)]
    pub apply: bool,

    /// Ask the tutor to look for mistakes, optionally quoting an error message
    #[arg(
        long,
        value_name = "ERROR",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with_all = ["message", "explain"]
    )]
    pub debug: Option<String>,

    /// Ask the tutor to explain the code, or just the given part of it
    #[arg(
        long,
        value_name = "PART",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "message"
    )]
    pub explain: Option<String>,
}

impl ChatArgs {
    /// The first question: typed, or built from `--debug` / `--explain`.
    #[must_use]
    pub fn question(&self) -> Option<String> {
        let non_empty = |s: &String| (!s.trim().is_empty()).then(|| s.clone());
        if let Some(error) = &self.debug {
            return Some(crate::ai::debug_question(non_empty(error).as_deref()));
        }
        if let Some(part) = &self.explain {
            return Some(crate::ai::explain_question(non_empty(part).as_deref()));
        }
        self.message.clone()
    }
}

#[derive(clap::Args)]
pub struct ImageArgs {
    /// What to draw
    pub prompt: String,

    /// Kind of game asset
    #[arg(long, value_enum)]
    pub asset_type: Option<AssetType>,
}
