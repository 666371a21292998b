//! User command - register and inspect users

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;
use simplebank_core::services::CreateUserRequest;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Login name (lowercase letters, digits, underscore)
        #[arg(long)]
        username: String,
        /// Full name
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        /// Password (at least 6 characters)
        #[arg(long, env = "SIMPLEBANK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a user
    Show {
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        UserCommands::Create { username, full_name, email, password, json } => {
            let user = ctx.user_service.create_user(&CreateUserRequest {
                username,
                password,
                full_name,
                email,
            })?;
            if json {
                return output::json(&user);
            }
            output::success(&format!("Created user {}", user.username));
        }
        UserCommands::Show { username, json } => {
            let user = ctx.user_service.get_user(&username)?;
            if json {
                return output::json(&user);
            }
            let mut table = output::create_table();
            table.add_row(vec!["Username", &user.username]);
            table.add_row(vec!["Full name", &user.full_name]);
            table.add_row(vec!["Email", &user.email]);
            let created = user.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
            table.add_row(vec!["Created", &created]);
            println!("{}", table);
        }
    }
    Ok(())
}
