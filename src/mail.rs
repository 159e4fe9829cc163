use actix_web::web;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use crate::configuration::EmailSettings;

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("mail worker was cancelled")]
    Blocking(#[from] actix_web::error::BlockingError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    sender: Mailbox,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(settings: &EmailSettings) -> Result<Self, MailError> {
        let builder = if settings.tls {
            SmtpTransport::relay(settings.smtp_host.as_str())?
        } else {
            SmtpTransport::builder_dangerous(settings.smtp_host.as_str())
        };
        let builder = builder.port(settings.smtp_port);
        let builder = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(SmtpMailer {
            sender: settings.sender.parse::<Mailbox>()?,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(email.subject.as_str());
        for recipient in email.to.iter() {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }
        let message = builder.multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))?;

        let transport = self.transport.clone();
        match web::block(move || transport.send(&message)).await? {
            Ok(_) => {
                tracing::info!("Email sent to {:?} successfully!", email.to);
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to send email {:#?}", err);
                Err(MailError::Transport(err))
            }
        }
    }
}

/// Writes mail to the log instead of delivering it. Used when no SMTP server is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = ?email.to,
            subject = email.subject.as_str(),
            "Email not delivered, no SMTP server configured:\n{}",
            email.text
        );
        Ok(())
    }
}

pub enum MailTemplate<'a> {
    ForgotPassword { link: &'a str, username: &'a str },
}

pub struct RenderedMail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

const STYLE: &str = "
        <style>
            body {
                font-family: Arial, sans-serif;
                background-color: #f4f4f4;
                margin: 0;
                padding: 0;
            }
            .container {
                width: 100%;
                max-width: 600px;
                margin: 0 auto;
                background-color: #ffffff;
                padding: 20px;
                border-radius: 8px;
            }
            .content {
                margin: 20px 0;
                font-size: 16px;
                line-height: 1.6;
                color: #333333;
            }
            .button {
                display: block;
                width: fit-content;
                margin: 20px auto;
                padding: 10px 20px;
                color: #ffffff;
                background-color: #4CAF50;
                border-radius: 4px;
                text-decoration: none;
            }
            .footer {
                text-align: center;
                font-size: 14px;
                color: #777777;
            }
        </style>
    ";

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl MailTemplate<'_> {
    pub fn render(&self) -> RenderedMail {
        match self {
            MailTemplate::ForgotPassword { link, username } => RenderedMail {
                subject: "Password reset request".to_string(),
                html: format!(
                    r##"
                        <!DOCTYPE html>
                        <html lang="en">
                        <head>
                            <meta charset="UTF-8">
                            {}
                        </head>
                        <body>
                            <div class="container">
                                <div class="content">
                                    <p>Hello {},</p>
                                    <p>We received a request to reset your password. Follow the link below to choose a new one. If you did not request a password reset, please ignore this email.</p>
                                    <a class="button" href="{}">Reset password</a>
                                </div>
                                <div class="footer">
                                    <p>If the button does not work, copy this address into your browser: {}</p>
                                </div>
                            </div>
                        </body>
                        </html>
                    "##,
                    STYLE,
                    escape_html(username),
                    escape_html(link),
                    escape_html(link)
                ),
                text: format!(
                    "Hello {},\n\nWe received a request to reset your password. Open the following link to choose a new one:\n\n{}\n\nIf you did not request a password reset, please ignore this email.\n",
                    username, link
                ),
            },
        }
    }
}

pub async fn send_templated_mail(
    mailer: &dyn Mailer,
    recipients: &[&str],
    template: MailTemplate<'_>,
) -> Result<(), MailError> {
    let rendered = template.render();
    mailer
        .send(OutgoingEmail {
            to: recipients.iter().map(|r| r.to_string()).collect(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        })
        .await
}
