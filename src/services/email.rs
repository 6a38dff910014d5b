//! Email notifier: booking confirmation to the patient and a new-booking notice to the doctor

use async_trait::async_trait;
use chrono::FixedOffset;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use super::notifications::{BookingNotification, Notifier};
use crate::{
    config::{ClinicConfig, EmailConfig},
    error::{AppError, AppResult},
};

/// Subject and plain-text body of one outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
    clinic: ClinicConfig,
    offset: FixedOffset,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, clinic: ClinicConfig, offset: FixedOffset) -> Self {
        Self {
            config,
            clinic,
            offset,
        }
    }

    /// Date and time of the appointment in the clinic's local time
    fn appointment_when(&self, n: &BookingNotification) -> (String, String) {
        let local = n.booking.appointment_datetime.with_timezone(&self.offset);
        (
            local.format("%A, %B %-d, %Y").to_string(),
            local.format("%I:%M %p").to_string(),
        )
    }

    pub fn compose_patient_message(&self, n: &BookingNotification) -> ComposedEmail {
        let (date, time) = self.appointment_when(n);
        let booking = &n.booking;
        let body = format!(
            r#"Dear {patient},

Your consultation booking has been received.

Booking Details:
- Booking ID: {reference}
- Doctor: {doctor}
- Service: {service}
- Date: {date}
- Time: {time}
- Duration: {duration} minutes
- Fee: {currency}{price}
- Timezone: {timezone}

Your Main Concern: {concern}

Our team will contact you shortly on {phone} for payment and further instructions.

For any queries, please contact us at {doctor_email}

Best regards,
{clinic}
"#,
            patient = booking.patient_name,
            reference = booking.booking_reference,
            doctor = n.doctor.name,
            service = n.service.name,
            duration = n.service.duration_minutes,
            currency = self.clinic.currency_symbol,
            price = n.service.price,
            timezone = booking.timezone,
            concern = booking.main_concern,
            phone = booking.patient_phone,
            doctor_email = n.doctor.email,
            clinic = self.clinic.name,
        );

        ComposedEmail {
            to: booking.patient_email.clone(),
            subject: format!("Booking {} received", booking.booking_reference),
            body,
        }
    }

    pub fn compose_doctor_message(&self, n: &BookingNotification) -> ComposedEmail {
        let (date, time) = self.appointment_when(n);
        let booking = &n.booking;
        let locality = [&booking.patient_city, &booking.patient_state, &booking.patient_pincode]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        let body = format!(
            r#"New Booking Received!

Booking Details:
- Booking ID: {reference}
- Patient Name: {patient}
- Patient Email: {email}
- Patient Phone: {phone}
- Service: {service}
- Date: {date}
- Time: {time}
- Duration: {duration} minutes
- Fee: {currency}{price}
- Timezone: {timezone}

Patient Address:
{address}
{locality}

Main Concern: {concern}

Comments: {comments}

Please follow up with the patient for payment and further instructions.
"#,
            reference = booking.booking_reference,
            patient = booking.patient_name,
            email = booking.patient_email,
            phone = booking.patient_phone,
            service = n.service.name,
            duration = n.service.duration_minutes,
            currency = self.clinic.currency_symbol,
            price = n.service.price,
            timezone = booking.timezone,
            address = booking.patient_address.as_deref().unwrap_or("Not provided"),
            concern = booking.main_concern,
            comments = booking.comments.as_deref().unwrap_or("None"),
        );

        ComposedEmail {
            to: n.doctor.email.clone(),
            subject: format!("New booking {} from {}", booking.booking_reference, booking.patient_name),
            body,
        }
    }

    fn build_message(&self, email: &ComposedEmail) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or(&self.clinic.name);
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Notification(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&email.to)
            .map_err(|e| AppError::Notification(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(&email.body)),
                    ),
            )
            .map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))
    }

    fn mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Notification(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

/// HTML alternative of a plain-text body. Patient input is escaped.
fn html_body(text: &str) -> String {
    format!(
        r#"<html><body><pre>{}</pre></body></html>"#,
        html_escape::encode_safe(text)
    )
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &BookingNotification) -> AppResult<()> {
        let messages = [
            self.build_message(&self.compose_patient_message(notification))?,
            self.build_message(&self.compose_doctor_message(notification))?,
        ];
        let mailer = self.mailer()?;

        // SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            for message in &messages {
                mailer
                    .send(message)
                    .map_err(|e| AppError::Notification(format!("Failed to send email: {}", e)))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| AppError::Notification(format!("Email task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::tests::sample_notification;
    use chrono::{TimeZone, Utc};

    fn notifier() -> EmailNotifier {
        EmailNotifier::new(
            EmailConfig::default(),
            ClinicConfig::default(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap(),
        )
    }

    #[test]
    fn test_patient_message_uses_clinic_time() {
        let mut n = sample_notification();
        // 04:00 UTC is 09:30 IST
        n.booking.appointment_datetime = Utc.with_ymd_and_hms(2025, 6, 10, 4, 0, 0).unwrap();

        let email = notifier().compose_patient_message(&n);
        assert_eq!(email.to, "nisha@example.com");
        assert!(email.subject.contains("QW12ER34"));
        assert!(email.body.contains("Date: Tuesday, June 10, 2025"));
        assert!(email.body.contains("Time: 09:30 AM"));
        assert!(email.body.contains("Fee: ₹700"));
        assert!(email.body.contains("Duration: 30 minutes"));
        assert!(email.body.contains("Your Main Concern: Persistent cough"));
    }

    #[test]
    fn test_doctor_message_fills_missing_fields() {
        let mut n = sample_notification();
        n.booking.patient_address = None;
        n.booking.comments = None;

        let email = notifier().compose_doctor_message(&n);
        assert_eq!(email.to, "doctor@clinic.local");
        assert!(email.body.contains("Patient Phone: +919822222222"));
        assert!(email.body.contains("Not provided\nPune 411001"));
        assert!(email.body.contains("Comments: None"));
    }

    #[test]
    fn test_patient_text_is_escaped_in_html_part() {
        let mut n = sample_notification();
        n.booking.patient_name = "<script>alert('x')</script>".to_string();
        n.booking.comments = Some(r#"<a href="https://evil.example">call me</a> & more"#.to_string());

        let email = notifier().compose_doctor_message(&n);
        let html = html_body(&email.body);

        assert!(html.starts_with("<html><body><pre>"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<a href"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
        // plain-text part keeps the original characters
        assert!(email.body.contains("<script>alert('x')</script>"));
    }

    #[test]
    fn test_messages_build() {
        let n = sample_notification();
        let notifier = notifier();
        assert!(notifier.build_message(&notifier.compose_patient_message(&n)).is_ok());
        assert!(notifier.build_message(&notifier.compose_doctor_message(&n)).is_ok());
    }
}
