//! SmartSpace - campus room booking service
//!
//! Serves the booking API: conflict checks, day and month availability,
//! the booking lifecycle and the administrator console endpoints.

use std::env;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use smartspace::{
    api, config,
    db::{self, RoomRepository},
    middleware::{
        self,
        rate_limit::{auth_rate_limit_config, spawn_rate_limit_cleanup, RateLimitState},
        security_headers::{api_cache_control_middleware, security_headers_middleware},
    },
    models::{CreateRoomRequest, RoomStatus, RoomType},
    services::{self, AccountError, AuthService},
    utils::logging::init_logging,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("SmartSpace {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive so file output is flushed
    let _log_guard = init_logging(&config.logging, None);

    info!("SmartSpace starting up");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    if let Some(pos) = args.iter().position(|arg| arg == "--create-admin") {
        return create_admin(&config, db, &args[pos + 1..]).await;
    }

    if args.iter().any(|arg| arg == "--seed-rooms") {
        return seed_rooms(&db).await;
    }

    let mailer = services::mailer_from_config(config.email.as_ref())
        .context("Failed to initialize mailer")?;
    info!("Email transport: {}", mailer.name());

    let state = AppState::build(config.clone(), db, mailer).await?;
    info!(
        "Organization time zone: {} ({})",
        config.organization.timezone_name, config.organization.utc_offset
    );

    let _reminder_scheduler = if config.reminders.enabled {
        info!("Starting reminder scheduler ({})", config.reminders.cron);
        Some(services::scheduler::start_reminder_scheduler(
            state.db.clone(),
            state.timezone,
            state.notifier.clone(),
            config.reminders.cron.clone(),
        ))
    } else {
        info!("Reminder scheduler is disabled");
        None
    };

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    if let Some(ref tls_config) = config.server.tls {
        info!("Starting HTTPS server on https://{}", addr);
        let rustls_config = create_rustls_config(tls_config)?;

        axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)?
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .context("HTTPS server error")?;
    } else {
        info!("Starting HTTP server on http://{}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("HTTP server error")?;
    }

    Ok(())
}

/// Build the rustls server configuration from PEM files
fn create_rustls_config(
    tls_config: &config::TlsConfig,
) -> Result<axum_server::tls_rustls::RustlsConfig> {
    use axum_server::tls_rustls::RustlsConfig;
    use rustls::crypto::aws_lc_rs::default_provider;
    use rustls::ServerConfig;

    let cert_file = std::fs::File::open(&tls_config.cert_file)
        .with_context(|| format!("Failed to open certificate file: {:?}", tls_config.cert_file))?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .filter_map(|r| r.ok())
        .collect();
    if certs.is_empty() {
        anyhow::bail!("No certificates found in {:?}", tls_config.cert_file);
    }

    let key_file = std::fs::File::open(&tls_config.key_file)
        .with_context(|| format!("Failed to open key file: {:?}", tls_config.key_file))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .with_context(|| format!("Failed to read private key: {:?}", tls_config.key_file))?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {:?}", tls_config.key_file))?;

    let versions: Vec<&'static rustls::SupportedProtocolVersion> =
        if tls_config.min_version == "1.3" {
            vec![&rustls::version::TLS13]
        } else {
            vec![&rustls::version::TLS12, &rustls::version::TLS13]
        };
    info!("TLS minimum version: {}", tls_config.min_version);

    let mut server_config = ServerConfig::builder_with_provider(default_provider().into())
        .with_protocol_versions(&versions)
        .context("Failed to set TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Failed to build TLS server config")?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

/// Create the SQLite file's directory when it does not exist yet
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, config: &AppConfig) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_rate_limit = RateLimitState::new(auth_rate_limit_config());
    spawn_rate_limit_cleanup(auth_rate_limit.clone());

    // Authentication must not be applied globally, otherwise login and the
    // public availability endpoints become unusable.
    let router = Router::new()
        .nest("/api/v1", api::public_routes(Some(auth_rate_limit)))
        .nest(
            "/api/v1",
            api::protected_routes().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::auth_middleware,
            )),
        )
        .layer(axum::middleware::from_fn(api_cache_control_middleware))
        .with_state(state)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(trace_layer);

    if config.server.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// `--create-admin <username> <email> <password>`
async fn create_admin(config: &AppConfig, db: db::DbPool, args: &[String]) -> Result<()> {
    let [username, email, password, ..] = args else {
        anyhow::bail!("Usage: smartspace --create-admin <username> <email> <password>");
    };

    let service = AuthService::new(db, config.auth.password_min_length);
    match service.create_admin(username, email, password).await {
        Ok(user) => {
            println!("Administrator '{}' created ({})", user.username, user.id);
            println!(
                "Restart the running server so '{}' joins the notification recipients.",
                user.email
            );
            Ok(())
        }
        Err(AccountError::Other(e)) => Err(e.context("Failed to create administrator")),
        Err(e) => anyhow::bail!("Cannot create administrator: {}", e),
    }
}

/// `--seed-rooms`: insert a demo room set into an empty catalogue
async fn seed_rooms(db: &db::DbPool) -> Result<()> {
    let repo = RoomRepository::new(db);
    if repo.count().await? > 0 {
        warn!("Rooms already exist, skipping seed");
        println!("Rooms already exist; nothing seeded.");
        return Ok(());
    }

    let demo = [
        ("Lab Komputer 1", RoomType::Lab, 40, &["Projector", "PC", "AC"][..]),
        ("Lab Komputer 2", RoomType::Lab, 35, &["Projector", "PC", "AC"][..]),
        ("Ruang Kelas A101", RoomType::Classroom, 50, &["Projector", "Whiteboard"][..]),
        ("Ruang Kelas A102", RoomType::Classroom, 45, &["Whiteboard"][..]),
        ("Aula Utama", RoomType::Hall, 300, &["Sound System", "Stage", "Projector"][..]),
    ];

    for (name, room_type, capacity, facilities) in demo {
        let room = repo
            .create(&CreateRoomRequest {
                name: name.to_string(),
                room_type,
                capacity,
                facilities: facilities.iter().map(|f| f.to_string()).collect(),
                description: String::new(),
                is_active: true,
                status: RoomStatus::Available,
                maintenance_note: None,
            })
            .await?;
        println!("Created room '{}' ({})", room.name, room.id);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"SmartSpace {}

USAGE:
    smartspace [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --seed-rooms            Insert a demo room set when no rooms exist, then exit
    --create-admin <USERNAME> <EMAIL> <PASSWORD>
                            Create an administrator account, then exit.
                            A running server picks the new address up on restart.

ENVIRONMENT:
    SMARTSPACE_CONFIG       Path to configuration file
    DATABASE_URL            Overrides database.url
    JWT_SECRET              Overrides auth.jwt_secret
    SMARTSPACE_UTC_OFFSET   Overrides organization.utc_offset

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by SMARTSPACE_CONFIG
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/smartspace/config.yaml
    5. The user configuration directory (smartspace/config.yaml)"#,
        env!("CARGO_PKG_VERSION")
    );
}
