use crate::{notifier::SmtpSettings, staff_directory::StaffEntry};

pub trait Configuration: Clone + Send + Sync + 'static {
    fn site_name(&self) -> String;
    fn host(&self) -> String;
    fn port(&self) -> u16;
    /// `None` keeps appointments in memory only.
    fn database_url(&self) -> Option<String>;
    /// `None` when outbound email is disabled.
    fn smtp_settings(&self) -> Option<SmtpSettings>;
    fn contact_inbox(&self) -> String;
    fn staff_entries(&self) -> Vec<StaffEntry>;
    fn allowed_origins(&self) -> Vec<String>;
}
