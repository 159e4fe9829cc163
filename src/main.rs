use chrono::Duration;
use credential_activity::configuration::{get_configuration, Settings};
use credential_activity::credentials::{
    CredentialContext, InMemoryUserRegistry, PgUserRegistry, UserRegistry,
};
use credential_activity::events::{EventBus, LoggingSubscriber};
use credential_activity::login::SessionLoginService;
use credential_activity::mail::{LogMailer, Mailer, SmtpMailer};
use credential_activity::startup;
use credential_activity::telemetry::{get_subscriber, init_subscriber, LogFormat};
use dotenv::dotenv;
use sqlx::PgPool;
use std::io::{Error, ErrorKind};
use std::net::TcpListener;
use std::sync::Arc;

async fn build_registry(configuration: &Settings) -> std::io::Result<Arc<dyn UserRegistry>> {
    let reset_token_ttl = Duration::minutes(configuration.credentials.reset_token_ttl_minutes);
    let database = match configuration.database.as_ref() {
        Some(database) => database,
        None => {
            tracing::warn!("No database configured, users are kept in memory");
            return Ok(Arc::new(InMemoryUserRegistry::new(reset_token_ttl)));
        }
    };
    let connection_pool = PgPool::connect(database.connection_string().as_str())
        .await
        .map_err(|err| Error::new(ErrorKind::Other, format!("Failed to connect to database: {}", err)))?;
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .map_err(|err| Error::new(ErrorKind::Other, format!("Failed to migrate the database: {}", err)))?;
    Ok(Arc::new(PgUserRegistry::new(connection_pool, reset_token_ttl)))
}

fn build_mailer(configuration: &Settings) -> std::io::Result<Arc<dyn Mailer>> {
    match configuration.email.as_ref() {
        Some(email) => {
            let mailer = SmtpMailer::new(email)
                .map_err(|err| Error::new(ErrorKind::Other, err.to_string()))?;
            Ok(Arc::new(mailer))
        }
        None => {
            tracing::warn!("No SMTP server configured, emails are only logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber(
        "credential_activity",
        "info",
        LogFormat::from_env(),
        std::io::stdout,
    );
    init_subscriber(subscriber).map_err(|err| Error::new(ErrorKind::Other, err.to_string()))?;

    let configuration = get_configuration("configuration").map_err(|err| {
        Error::new(
            ErrorKind::Other,
            format!(
                "Failed to read `configuration.json`. Please make sure it exists and is valid JSON. {}",
                err
            ),
        )
    })?;

    let listener = TcpListener::bind((
        configuration.application_host.as_str(),
        configuration.application_port,
    ))?;

    let registry = build_registry(&configuration).await?;
    let login = SessionLoginService::new(
        registry.clone(),
        Duration::days(configuration.credentials.session_ttl_days),
        configuration.credentials.after_login_url.clone(),
    );
    let context = CredentialContext {
        registry,
        mailer: build_mailer(&configuration)?,
        events: EventBus::new().subscribe(Arc::new(LoggingSubscriber)),
        login: Arc::new(login),
        settings: configuration.credentials.clone(),
    };

    startup::run_server(listener, context, configuration.frontend_url.clone())?.await
}
