use clap::Parser;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

use admingate_backend::app_data::AppData;
use admingate_backend::cli::{Cli, Command};
use admingate_backend::config::logging::init_logging;
use admingate_backend::config::AppSettings;
use admingate_backend::services::authorization::SUPERUSER_ROLE;
use admingate_backend::stores::{RoleStore, SettingsStore, UserStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging()?;

    let cli = Cli::parse();
    let settings = AppSettings::from_env()?;

    let db = Database::connect(&settings.database_url).await?;
    Migrator::up(&db, None).await?;
    SettingsStore::new(db.clone()).ensure_defaults().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            tracing::info!("Migrations are up to date");
        }
        Command::SeedSuperuser { email, name } => {
            seed_superuser(&db, &email, &name).await?;
        }
        Command::Serve => {
            let data = AppData::new(db, &settings);
            let route = admingate_backend::build_route(data, &settings.base_url);

            tracing::info!(address = %settings.bind_address, "Starting server");
            poem::Server::new(poem::listener::TcpListener::bind(&settings.bind_address))
                .run(route)
                .await?;
        }
    }

    Ok(())
}

/// Create the superuser account and role if they do not exist yet
async fn seed_superuser(
    db: &sea_orm::DatabaseConnection,
    email: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_store = UserStore::new(db.clone());
    let role_store = RoleStore::new(db.clone());

    let role = match role_store.find_by_name(SUPERUSER_ROLE).await? {
        Some(role) => role,
        None => role_store.create(SUPERUSER_ROLE.to_string(), None).await?,
    };

    let user = match user_store.find_by_email(email).await? {
        Some(user) => user,
        None => {
            user_store
                .create_user(name.to_string(), email.to_string(), None, true)
                .await?
        }
    };

    let already_assigned = user_store
        .roles_of(&user.id)
        .await?
        .iter()
        .any(|r| r.id == role.id);
    if !already_assigned {
        let mut role_ids: Vec<String> = user_store
            .roles_of(&user.id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        role_ids.push(role.id);
        user_store.sync_roles(&user.id, &role_ids).await?;
    }

    tracing::info!(email = %email, "Superuser ready");
    Ok(())
}
