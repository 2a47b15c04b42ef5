use crate::notifier::Notification;
use crate::types::{Appointment, ContactMessage, Staff};

const APPOINTMENT_SUBJECT: &str = "New Appointment Booking";
const CONTACT_SUBJECT: &str = "New Contact Form Submission";

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => "-",
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn html_lines(text: &str) -> String {
    escape_html(text).replace('\n', "<br/>")
}

pub fn contact_notification(
    site_name: &str,
    inbox: &str,
    message: &ContactMessage,
) -> Notification {
    let subject = match message.subject.as_deref() {
        Some(subject) if !subject.trim().is_empty() => format!("[Contact] {subject}"),
        _ => CONTACT_SUBJECT.to_string(),
    };
    let phone = or_dash(message.phone.as_deref());
    let topic = or_dash(message.subject.as_deref());

    let text_body = format!(
        "New enquiry from {site_name} website:\n\n\
         Name: {}\n\
         Email: {}\n\
         Phone: {phone}\n\
         Subject: {topic}\n\
         Message:\n{}",
        message.name, message.email, message.message
    );
    let html_body = format!(
        "<h2>New enquiry from {}</h2>\n\
         <p><strong>Name:</strong> {}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Phone:</strong> {}</p>\n\
         <p><strong>Subject:</strong> {}</p>\n\
         <p><strong>Message:</strong></p>\n\
         <p>{}</p>",
        escape_html(&format!("{site_name} website")),
        escape_html(&message.name),
        escape_html(&message.email),
        escape_html(phone),
        escape_html(topic),
        html_lines(&message.message),
    );

    Notification {
        recipient: inbox.to_string(),
        sender_name: format!("{site_name} Website"),
        subject,
        text_body,
        html_body,
    }
}

pub fn appointment_notification(
    site_name: &str,
    staff: &Staff,
    appointment: &Appointment,
) -> Notification {
    let when = appointment
        .start_time
        .format("%A, %b %d %Y at %I:%M %p")
        .to_string();
    let phone = or_dash(Some(appointment.phone.as_str()));
    let notes = or_dash(Some(appointment.notes.as_str()));

    let text_body = format!(
        "New appointment booked\n\n\
         Staff: {}\n\
         When: {when}\n\
         Duration: {} minutes\n\
         Client: {} ({}, {phone})\n\
         Notes:\n{notes}",
        staff.name, appointment.duration_min, appointment.name, appointment.email
    );
    let html_body = format!(
        "<h2>New appointment booked</h2>\n\
         <p><strong>Staff:</strong> {}</p>\n\
         <p><strong>When:</strong> {when}</p>\n\
         <p><strong>Duration:</strong> {} minutes</p>\n\
         <p><strong>Client:</strong> {} ({}, {})</p>\n\
         <p><strong>Notes:</strong><br/>{}</p>",
        escape_html(&staff.name),
        appointment.duration_min,
        escape_html(&appointment.name),
        escape_html(&appointment.email),
        escape_html(phone),
        html_lines(notes),
    );

    Notification {
        recipient: staff.email.clone(),
        sender_name: format!("{site_name} Booking"),
        subject: APPOINTMENT_SUBJECT.to_string(),
        text_body,
        html_body,
    }
}
