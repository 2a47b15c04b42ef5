use crate::{configuration::Configuration, notifier::SmtpSettings, staff_directory::StaffEntry};
use clap::Parser;

const DEFAULT_INBOX: &str = "inbox@example.com";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Contact form and appointment booking backend")]
pub struct ConfigurationHandler {
    /// Name used in email subjects and sender names
    #[arg(long, env = "SITE_NAME", default_value = "Appointment Manager")]
    site_name: String,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// PostgreSQL connection string; appointments stay in memory without it
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// CA certificate used to verify the database server
    #[arg(long, env = "DATABASE_SSL_ROOT_CERT")]
    database_ssl_root_cert: Option<String>,

    #[arg(long, env = "SMTP_HOST")]
    smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    smtp_port: u16,

    #[arg(long, env = "SMTP_USER")]
    smtp_user: Option<String>,

    #[arg(long, env = "SMTP_PASS", hide_env_values = true)]
    smtp_pass: Option<String>,

    /// Inbox for contact messages and the fallback staff member
    #[arg(long, env = "TO_EMAIL")]
    to_email: Option<String>,

    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173,http://127.0.0.1:5173,http://localhost:5174,http://127.0.0.1:5174"
    )]
    cors_origins: Vec<String>,

    #[arg(skip)]
    staff: Vec<StaffEntry>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        let mut configuration = Self::parse();
        configuration.staff = StaffEntry::from_lookup(|key| std::env::var(key).ok());
        configuration
    }
}

fn with_ssl_root_cert(database_url: &str, root_cert: &str) -> String {
    let separator = if database_url.contains('?') { '&' } else { '?' };
    format!("{database_url}{separator}sslmode=verify-full&sslrootcert={root_cert}")
}

impl Configuration for ConfigurationHandler {
    fn site_name(&self) -> String {
        self.site_name.clone()
    }

    fn host(&self) -> String {
        self.host.clone()
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn database_url(&self) -> Option<String> {
        let database_url = self.database_url.as_deref()?;
        Some(match self.database_ssl_root_cert.as_deref() {
            Some(root_cert) => with_ssl_root_cert(database_url, root_cert),
            None => database_url.to_string(),
        })
    }

    fn smtp_settings(&self) -> Option<SmtpSettings> {
        match (&self.smtp_host, &self.smtp_user, &self.smtp_pass) {
            (Some(host), Some(user), Some(password)) => Some(SmtpSettings {
                host: host.clone(),
                port: self.smtp_port,
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    fn contact_inbox(&self) -> String {
        self.to_email
            .clone()
            .or_else(|| self.smtp_user.clone())
            .unwrap_or_else(|| DEFAULT_INBOX.to_string())
    }

    fn staff_entries(&self) -> Vec<StaffEntry> {
        self.staff.clone()
    }

    fn allowed_origins(&self) -> Vec<String> {
        self.cors_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}
