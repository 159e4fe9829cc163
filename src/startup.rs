use crate::credentials::CredentialContext;
use crate::routes::{activation_source, health_check, password_source};
use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use actix_cors::Cors;
use actix_web::http::header;

fn configure_cors(frontend_url: &str) -> Cors {
    let mut cors = Cors::default();
    cors = if frontend_url == "*" {
        cors.allow_any_origin()
    } else {
        cors.allowed_origin(frontend_url)
    };
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
        .allowed_header(header::CONTENT_TYPE)
        .expose_headers(vec![header::LOCATION])
        .max_age(3600)
}

pub fn run_server(
    listener: TcpListener,
    context: CredentialContext,
    frontend_url: String,
) -> Result<Server, std::io::Error> {
    let context = Data::new(context);

    let server: Server = HttpServer::new(move || {
        let cors = configure_cors(frontend_url.as_str());
        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .service(activation_source())
            .service(password_source())
            .route("/", web::get().to(health_check))
            .app_data(context.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
