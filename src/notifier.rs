use lettre::{
    address::AddressError,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, Message, SmtpTransport, Transport,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub sender_name: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No transport configured; the notification only went to the log.
    Discarded,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> Result<Delivery, NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

pub struct SmtpNotifier {
    transport: Option<(SmtpTransport, Address)>,
}

impl SmtpNotifier {
    pub fn new(settings: Option<&SmtpSettings>) -> Result<Self, NotifyError> {
        let Some(settings) = settings else {
            info!("SMTP not configured, notifications will only be logged");
            return Ok(Self::unconfigured());
        };

        let sender = parse_address(&settings.user)?;
        let credentials = Credentials::new(settings.user.clone(), settings.password.clone());
        let builder = match settings.port {
            587 => SmtpTransport::starttls_relay(&settings.host)?,
            465 => SmtpTransport::relay(&settings.host)?,
            _ => SmtpTransport::builder_dangerous(&settings.host),
        };
        let transport = builder
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        info!(host = %settings.host, port = settings.port, "SMTP transport configured");
        Ok(Self {
            transport: Some((transport, sender)),
        })
    }

    pub fn unconfigured() -> Self {
        Self { transport: None }
    }
}

fn parse_address(address: &str) -> Result<Address, NotifyError> {
    address.parse::<Address>().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

impl Notifier for SmtpNotifier {
    fn deliver(&self, notification: &Notification) -> Result<Delivery, NotifyError> {
        let Some((transport, sender)) = &self.transport else {
            info!(
                recipient = %notification.recipient,
                subject = %notification.subject,
                body = %notification.text_body,
                "[DEV] SMTP not configured, discarding notification"
            );
            return Ok(Delivery::Discarded);
        };

        let recipient = parse_address(&notification.recipient)?;
        let message = Message::builder()
            .from(Mailbox::new(
                Some(notification.sender_name.clone()),
                sender.clone(),
            ))
            .to(Mailbox::new(None, recipient))
            .subject(notification.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                notification.text_body.clone(),
                notification.html_body.clone(),
            ))?;

        transport.send(&message)?;
        debug!(recipient = %notification.recipient, "Notification sent");
        Ok(Delivery::Sent)
    }
}
