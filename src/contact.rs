use crate::{
    error::BookingError,
    messages::contact_notification,
    notifier::{Delivery, Notifier},
    types::ContactMessage,
};
use std::sync::Arc;
use tracing::info;

/// Forwards contact form submissions to the general inbox.
#[derive(Clone)]
pub struct ContactService {
    notifier: Arc<dyn Notifier>,
    site_name: Arc<str>,
    inbox: Arc<str>,
}

impl ContactService {
    pub fn new(notifier: Arc<dyn Notifier>, site_name: &str, inbox: &str) -> Self {
        Self {
            notifier,
            site_name: Arc::from(site_name),
            inbox: Arc::from(inbox),
        }
    }

    pub fn submit_contact(&self, message: &ContactMessage) -> Result<Delivery, BookingError> {
        let notification = contact_notification(&self.site_name, &self.inbox, message);
        let delivery = self
            .notifier
            .deliver(&notification)
            .map_err(BookingError::DeliveryFailure)?;
        info!(?delivery, from = %message.email, "Contact message handled");
        Ok(delivery)
    }
}
