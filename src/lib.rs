pub mod configuration;
pub mod credentials;
pub mod events;
pub mod flash;
pub mod login;
pub mod mail;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod util;
