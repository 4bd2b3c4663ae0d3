use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vibecoder::ai::TutorService;
use vibecoder::cli::{
    AdminCommands, AuthCommands, ChatArgs, ImageArgs, ProjectCommands, run_admin_init,
    run_admin_seed_students, run_admin_users, run_auth_login, run_auth_logout, run_auth_setup,
    run_chat, run_image, run_preview, run_project_create, run_project_delete, run_project_edit,
    run_project_list, run_project_pull, run_project_push, run_project_versions,
};
use vibecoder::config::{AiConfig, CONFIG_FILE_NAME, ServerConfig};
use vibecoder::server::{AppState, create_router};
use vibecoder::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "vibecoder")]
#[command(about = "A coding playground for students", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and settings
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Log in and out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage your projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Render a workspace directory or snapshot file to a single HTML page
    Preview {
        /// Workspace directory or snapshot file
        path: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Ask the AI tutor about your code
    Chat(ChatArgs),

    /// Generate an image asset for a game
    Image(ImageArgs),
}

async fn serve(host: String, port: u16, data_dir: String) -> anyhow::Result<()> {
    let data_path = PathBuf::from(data_dir);
    if !data_path.join(CONFIG_FILE_NAME).exists() {
        bail!("Server not initialized. Run 'vibecoder admin init' first.");
    }
    let config = ServerConfig::from_data_dir(host, port, data_path)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    let pruned = store.delete_expired_sessions(Utc::now())?;
    if pruned > 0 {
        info!("Removed {pruned} expired session(s)");
    }

    let tutor = TutorService::from_config(&AiConfig::from_env());
    let state = Arc::new(
        AppState::new(Arc::new(store), config.invite_code.clone())
            .with_session_ttl_days(config.session_ttl_days)
            .with_autosave_secs(config.autosave_secs)
            .with_tutor(tutor),
    );

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vibecoder=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                invite_code,
                non_interactive,
            } => run_admin_init(data_dir, invite_code, non_interactive)?,
            AdminCommands::SeedStudents {
                data_dir,
                count,
                prefix,
            } => run_admin_seed_students(data_dir, count, prefix)?,
            AdminCommands::Users { data_dir, json } => run_admin_users(data_dir, json)?,
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => serve(host, port, data_dir).await?,
        Commands::Auth { command } => match command {
            AuthCommands::Login {
                server,
                username,
                password,
                non_interactive,
            } => run_auth_login(server, username, password, non_interactive).await?,
            AuthCommands::Setup {
                display_name,
                password,
                non_interactive,
            } => run_auth_setup(display_name, password, non_interactive).await?,
            AuthCommands::Logout => run_auth_logout().await?,
        },
        Commands::Project { command } => match command {
            ProjectCommands::List { json } => run_project_list(json).await?,
            ProjectCommands::Create { title, from } => run_project_create(title, from).await?,
            ProjectCommands::Pull { id, output } => run_project_pull(id, output).await?,
            ProjectCommands::Push {
                id,
                path,
                save_version,
            } => run_project_push(id, path, save_version).await?,
            ProjectCommands::Delete {
                id,
                yes,
                non_interactive,
            } => run_project_delete(id, yes, non_interactive).await?,
            ProjectCommands::Versions { id } => run_project_versions(id).await?,
            ProjectCommands::Edit {
                id,
                path,
                delay,
                version_on_exit,
            } => {
                let delay = delay.map(|secs| Duration::from_secs(secs.max(1)));
                run_project_edit(id, path, delay, version_on_exit).await?;
            }
        },
        Commands::Preview { path, output } => run_preview(path, output).await?,
        Commands::Chat(args) => {
            let question = args.question();
            run_chat(args.snapshot, question, args.apply).await?;
        }
        Commands::Image(args) => run_image(args.prompt, args.asset_type).await?,
    }

    Ok(())
}
