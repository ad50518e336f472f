//! Template rendering and phone normalization
//!
//! Pure helpers shared by the notification service and its tests.

use agendapro_domain::constants::DEFAULT_COUNTRY_CODE;
use agendapro_domain::{Appointment, Client};

/// Substitute the template placeholders from client and appointment data
///
/// `{name}`, `{email}`, `{date}`, `{service}` and `{time}` are replaced;
/// anything else in braces is left verbatim. Dates render as DD/MM/YYYY,
/// times as HH:MM, and a missing client email renders as an empty string.
pub fn render_template(content: &str, client: &Client, appointment: &Appointment) -> String {
    content
        .replace("{name}", &client.name)
        .replace("{email}", client.email.as_deref().unwrap_or(""))
        .replace("{date}", &appointment.date.format("%d/%m/%Y").to_string())
        .replace("{service}", &appointment.service_name)
        .replace("{time}", &appointment.start_time.format("%H:%M").to_string())
}

/// Normalize a phone number for the gateway
///
/// Strips every non-digit character and prefixes the country code when the
/// number does not already carry it. Returns `None` when no digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with(DEFAULT_COUNTRY_CODE) {
        Some(digits)
    } else {
        Some(format!("{DEFAULT_COUNTRY_CODE}{digits}"))
    }
}

#[cfg(test)]
mod tests {
    use agendapro_domain::{AppointmentStatus, MessagesSent};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    use super::*;

    fn sample() -> (Client, Appointment) {
        let now = Utc::now();
        let tenant_id = Uuid::new_v4();
        let client = Client {
            id: Uuid::new_v4(),
            tenant_id,
            name: "Maria Silva".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: Some("(11) 99999-8888".to_string()),
            created_at: now,
            updated_at: now,
        };
        let appointment = Appointment {
            id: Uuid::new_v4(),
            tenant_id,
            client_id: client.id,
            service_id: Uuid::new_v4(),
            service_name: "Corte de Cabelo".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            duration_minutes: 60,
            price: 50.0,
            status: AppointmentStatus::Pending,
            google_event_id: None,
            is_synced_to_google: false,
            messages_sent: MessagesSent::default(),
            created_at: now,
            updated_at: now,
        };
        (client, appointment)
    }

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let (client, appointment) = sample();
        let rendered = render_template(
            "Olá {name} ({email}), seu {service} é em {date} às {time}.",
            &client,
            &appointment,
        );
        assert_eq!(
            rendered,
            "Olá Maria Silva (maria@example.com), seu Corte de Cabelo é em 05/03/2024 às 09:30."
        );
    }

    #[test]
    fn test_render_missing_email_is_empty() {
        let (mut client, appointment) = sample();
        client.email = None;
        let rendered = render_template("Contato: {email}.", &client, &appointment);
        assert_eq!(rendered, "Contato: .");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let (client, appointment) = sample();
        let rendered = render_template("Oi {name}, código {code}", &client, &appointment);
        assert_eq!(rendered, "Oi Maria Silva, código {code}");
    }

    #[test]
    fn test_render_replaces_repeated_placeholders() {
        let (client, appointment) = sample();
        let rendered = render_template("{name} e {name}", &client, &appointment);
        assert_eq!(rendered, "Maria Silva e Maria Silva");
    }

    #[test]
    fn test_normalize_strips_and_prefixes() {
        assert_eq!(normalize_phone("(11) 99999-8888").as_deref(), Some("5511999998888"));
    }

    #[test]
    fn test_normalize_keeps_existing_country_code() {
        assert_eq!(normalize_phone("+55 11 99999-8888").as_deref(), Some("5511999998888"));
    }

    #[test]
    fn test_normalize_empty_is_none() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("abc"), None);
    }
}
