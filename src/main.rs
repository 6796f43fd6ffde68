use bkbs_admin::cli::{
    Args, build_config, handle_create_admin, init_logging, load_secret, open_database,
    parse_expiry,
};
use bkbs_admin::password::PasswordHasher;
use bkbs_admin::{init_cleanup, run_server};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret("JWT_ACCESS_SECRET", args.access_secret_file.as_deref())
    else {
        std::process::exit(1);
    };
    let Some(refresh_secret) =
        load_secret("JWT_REFRESH_SECRET", args.refresh_secret_file.as_deref())
    else {
        std::process::exit(1);
    };

    let Some(access_expire) = parse_expiry("access-expire", &args.access_expire) else {
        std::process::exit(1);
    };
    let Some(refresh_expire) = parse_expiry("refresh-expire", &args.refresh_expire) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if args.create_admin {
        handle_create_admin(&db, &PasswordHasher::new(args.bcrypt_cost)).await;
    }

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();

    let config = build_config(
        db,
        access_secret,
        refresh_secret,
        access_expire,
        refresh_expire,
        args.bcrypt_cost,
        args.secure_cookies,
    );

    info!(address = %local_addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
