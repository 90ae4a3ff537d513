use clap::Parser;
use roster::cli::{
    Args, SeedOutcome, build_config, init_logging, load_admin_password, load_jwt_secret,
    open_database, seed_default_admin,
};
use roster::run_server;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let admin_password = match load_admin_password(args.admin_password_file.as_deref()) {
        Ok(password) => password,
        Err(e) => {
            error!(path = ?args.admin_password_file, error = %e, "Failed to read admin password file");
            std::process::exit(1);
        }
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    match seed_default_admin(
        &db,
        &args.admin_username,
        admin_password.as_deref(),
        args.bcrypt_cost,
    )
    .await
    {
        Ok(SeedOutcome::Created(id)) => {
            info!(user_id = id, username = %args.admin_username, "Default admin created");
        }
        Ok(SeedOutcome::MissingPassword) => {
            warn!(
                "No users exist and no admin password is configured. Set ADMIN_PASSWORD or use --admin-password-file"
            );
        }
        Ok(SeedOutcome::NoAdmin) => {
            warn!("No admin user exists. User management is unavailable until one is assigned");
        }
        Ok(SeedOutcome::Skipped) => {}
        Err(e) => {
            error!(error = %e, "Failed to create default admin");
            std::process::exit(1);
        }
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => warn!(error = %e, "Failed to read local address"),
    }

    let config = build_config(&args, db, jwt_secret);

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
