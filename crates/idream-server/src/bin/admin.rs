//! Out-of-band account administration against the server's database.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use idream_db::Database;
use idream_types::models::Role;

#[derive(Parser, Debug)]
#[command(name = "idream-admin", version, about = "Manage IDream accounts")]
struct Args {
    /// SQLite database used by the server.
    #[arg(long, env = "IDREAM_DB_PATH", default_value = "idream.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Give an existing account the admin role.
    GrantAdmin { username: String },
    /// Approve a registered investor so they can browse and make offers.
    ApproveInvestor { username: String },
    /// Print every account.
    ListUsers,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idream_db=info".into()),
        )
        .init();

    let args = Args::parse();
    let db = Database::open(&args.db)
        .with_context(|| format!("opening {}", args.db.display()))?;

    match args.command {
        Command::GrantAdmin { username } => {
            let user = db.set_role(&username, Role::Admin)?;
            println!("{} is now an admin", user.username);
        }
        Command::ApproveInvestor { username } => {
            let row = db
                .get_user_by_username(&username)?
                .with_context(|| format!("no user named '{}'", username))?;
            let user = db.approve_investor(row.user.id)?;
            println!("{} approved", user.username);
        }
        Command::ListUsers => {
            for user in db.list_users()? {
                println!(
                    "{}  {:<24} {:<9} subscribed={} approved={}",
                    user.id,
                    user.username,
                    user.role.as_str(),
                    user.subscribed,
                    user.approved
                );
            }
        }
    }

    Ok(())
}
