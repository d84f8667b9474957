mod cli;
mod config;
mod render;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use backup_core::{DbConfig, DownloadRequest, SessionPhase};
use backup_engine::{ArchiveDownloader, Clock, ReqwestTransport, ServiceSettings, SessionController};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use engine_logging::{engine_error, engine_info, LogDestination};
use log::LevelFilter;

use crate::cli::{Args, Command, DbArgs, FormArgs, LogTarget};
use crate::config::{AppConfig, DatabaseConfig};
use crate::render::TerminalRenderer;

const EXIT_FAILED: u8 = 1;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log, args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn init_logging(target: LogTarget, verbose: u8) {
    let destination = match target {
        LogTarget::File => LogDestination::File,
        LogTarget::Terminal => LogDestination::Terminal,
        LogTarget::Both => LogDestination::Both,
    };
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if !engine_logging::initialize(destination, level) {
        eprintln!("warning: logging could not be initialized");
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = config::load(args.config.as_deref())?;
    let settings = service_settings(&config, &args);
    engine_info!("Using backup service at {}", settings.base_url);

    match args.command {
        Command::Start { form, db } => run_backup(&config, settings, form, db).await,
        Command::TestDb { db } => {
            let Some(db) = resolve_db(&config, &db) else {
                bail!("no database configured; pass --db-host/--db-name/--db-user or add `database` to the config file");
            };
            run_test_db(settings, db).await
        }
        Command::Download {
            archive_id,
            schema,
            password,
            print_url,
        } => {
            let request = DownloadRequest {
                archive_id,
                password: password.unwrap_or_else(|| config.form.password.clone()),
                file_name: schema.unwrap_or_else(|| config.form.to_schema.clone()),
            };
            run_download(settings, request, print_url).await
        }
    }
}

fn service_settings(config: &AppConfig, args: &Args) -> ServiceSettings {
    let mut settings = config.service.to_settings();
    if let Some(base_url) = &args.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(dir) = &args.download_dir {
        settings.download_dir = dir.clone();
    }
    settings
}

/// Command-line database flags layered over the config file's `database`.
fn resolve_db(config: &AppConfig, args: &DbArgs) -> Option<DbConfig> {
    if args.is_empty() {
        return config.database.clone().map(DbConfig::from);
    }
    let base = config.database.clone().unwrap_or(DatabaseConfig {
        host: "localhost".to_string(),
        port: 5432,
        name: String::new(),
        user: String::new(),
        password: String::new(),
    });
    Some(DbConfig {
        host: args.db_host.clone().unwrap_or(base.host),
        port: args.db_port.unwrap_or(base.port),
        name: args.db_name.clone().unwrap_or(base.name),
        user: args.db_user.clone().unwrap_or(base.user),
        password: args.db_password.clone().unwrap_or(base.password),
    })
}

fn utc_clock() -> Clock {
    Arc::new(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

async fn run_backup(
    config: &AppConfig,
    settings: ServiceSettings,
    form_args: FormArgs,
    db_args: DbArgs,
) -> anyhow::Result<ExitCode> {
    let mut form = config.form.to_form(resolve_db(config, &db_args));
    if let Some(tenants) = form_args.tenants {
        form.tenant_ids = tenants;
    }
    if let Some(schema) = form_args.schema {
        form.to_schema = schema;
    }
    if let Some(password) = form_args.password {
        form.password = password;
    }
    let request = form.to_request();
    if request.tenant_ids.is_empty() {
        bail!("at least one tenant id is required");
    }
    if request.to_schema.is_empty() {
        bail!("a target schema is required");
    }

    let controller = SessionController::over_http(settings, utc_clock());
    let mut views = controller.subscribe();
    let mut renderer = TerminalRenderer::new(io::stdout());

    let session_id = controller.start(request);
    engine_info!("Started backup session {}", session_id);

    loop {
        let view = views.borrow_and_update().clone();
        renderer.render(&view).context("writing to stdout")?;
        if view.session_id == session_id && view.phase.is_terminal() && !view.downloading {
            return Ok(exit_code(view.phase));
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    bail!("session controller stopped unexpectedly");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                engine_info!("Interrupt received, cancelling session {}", session_id);
                controller.cancel();
            }
        }
    }
}

fn exit_code(phase: SessionPhase) -> ExitCode {
    match phase {
        SessionPhase::Completed => ExitCode::SUCCESS,
        SessionPhase::Cancelled => ExitCode::from(EXIT_CANCELLED),
        _ => ExitCode::from(EXIT_FAILED),
    }
}

async fn run_test_db(settings: ServiceSettings, db: DbConfig) -> anyhow::Result<ExitCode> {
    let controller = SessionController::over_http(settings, utc_clock());
    let response = controller
        .test_connection(&db)
        .await
        .context("testing database connection")?;

    println!("{}", response.message);
    println!(
        "  {}@{}:{}/{}",
        response.database.user, response.database.host, response.database.port, response.database.database
    );
    if let Some(error) = &response.error {
        println!("  error: {error}");
    }
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

async fn run_download(
    settings: ServiceSettings,
    request: DownloadRequest,
    print_url: bool,
) -> anyhow::Result<ExitCode> {
    let download_dir = settings.download_dir.clone();
    let transport = Arc::new(ReqwestTransport::new(settings));

    if print_url {
        let url = transport.download_url(&request)?;
        println!("{url}");
        return Ok(ExitCode::SUCCESS);
    }

    let downloader = ArchiveDownloader::new(transport, download_dir);
    let saved = downloader
        .download(&request)
        .await
        .with_context(|| format!("downloading archive {}", request.archive_id))?;
    println!("Saved {} ({} bytes)", saved.path.display(), saved.byte_len);
    Ok(ExitCode::SUCCESS)
}
