use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use htmlescape::encode_minimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::MailConfig;
use crate::state::AppState;

const MAX_FIELD_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 4000;

/// Submissions faster than this are assumed to come from bots. The form
/// script reports how long the visitor spent on the page.
const MIN_DWELL_MS: u64 = 3000;

const GENERIC_FAILURE: &str =
    "Não foi possível enviar sua mensagem. Tente novamente ou fale conosco pelo WhatsApp.";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("{0}")]
    Validation(String),
    #[error("mail provider request failed")]
    Provider,
}

/// Body of `POST /api/contato`. Unknown fields are ignored; every field is
/// optional at the serde level so validation can produce friendlier errors
/// than a deserialization failure.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    /// Page the form was submitted from, for triage.
    pub page: String,
    /// Honeypot. Real visitors never see this field.
    pub website: String,
    pub elapsed_ms: Option<u64>,
}

/// Body of `POST /api/agendamento`.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct SchedulingPayload {
    pub responsavel: GuardianFields,
    pub aluno: StudentFields,
    pub mensagem: String,
    pub website: String,
    pub elapsed_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct GuardianFields {
    pub nome: String,
    pub telefone: String,
    pub email: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct StudentFields {
    pub nome: String,
    pub serie: String,
}

#[derive(Serialize, Debug)]
pub struct RelayResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    fn sent(id: String) -> Self {
        RelayResponse {
            ok: true,
            id: Some(id),
            error: None,
        }
    }

    fn rejected(error: String) -> Self {
        RelayResponse {
            ok: false,
            id: None,
            error: Some(error),
        }
    }
}

fn clip(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

fn spam_signals(website: &str, elapsed_ms: Option<u64>) -> bool {
    !website.trim().is_empty() || elapsed_ms.map_or(false, |ms| ms < MIN_DWELL_MS)
}

fn field_row(label: &str, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    format!("<p><strong>{label}:</strong> {}</p>\n", encode_minimal(value))
}

/// A contact submission with every field trimmed and clipped.
#[derive(Debug)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
    pub page: String,
}

impl ContactMessage {
    pub fn from_payload(payload: &ContactPayload) -> Self {
        ContactMessage {
            name: clip(&payload.name, MAX_FIELD_CHARS),
            email: clip(&payload.email, MAX_FIELD_CHARS),
            phone: clip(&payload.phone, MAX_FIELD_CHARS),
            subject: clip(&payload.subject, MAX_FIELD_CHARS),
            message: clip(&payload.message, MAX_MESSAGE_CHARS),
            page: clip(&payload.page, MAX_FIELD_CHARS),
        }
    }

    /// The relay needs at least one way to reach back (or something to
    /// read): message, email or phone.
    pub fn validate(&self) -> Result<(), MailError> {
        if self.message.is_empty() && self.email.is_empty() && self.phone.is_empty() {
            return Err(MailError::Validation(
                "Informe uma mensagem, e-mail ou telefone para contato.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn subject_line(&self) -> String {
        if self.subject.is_empty() {
            "Contato pelo site".to_string()
        } else {
            format!("Contato pelo site: {}", self.subject)
        }
    }

    pub fn to_html(&self) -> String {
        let mut body = String::from("<h2>Novo contato pelo site</h2>\n");
        body.push_str(&field_row("Nome", &self.name));
        body.push_str(&field_row("E-mail", &self.email));
        body.push_str(&field_row("Telefone", &self.phone));
        body.push_str(&field_row("Página", &self.page));
        if !self.message.is_empty() {
            body.push_str(&format!(
                "<blockquote>{}</blockquote>\n",
                encode_minimal(&self.message)
            ));
        }
        body
    }
}

/// A visit-scheduling submission with clipped fields.
#[derive(Debug)]
pub struct SchedulingMessage {
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_email: String,
    pub student_name: String,
    pub student_grade: String,
    pub message: String,
}

impl SchedulingMessage {
    pub fn from_payload(payload: &SchedulingPayload) -> Self {
        SchedulingMessage {
            guardian_name: clip(&payload.responsavel.nome, MAX_FIELD_CHARS),
            guardian_phone: clip(&payload.responsavel.telefone, MAX_FIELD_CHARS),
            guardian_email: clip(&payload.responsavel.email, MAX_FIELD_CHARS),
            student_name: clip(&payload.aluno.nome, MAX_FIELD_CHARS),
            student_grade: clip(&payload.aluno.serie, MAX_FIELD_CHARS),
            message: clip(&payload.mensagem, MAX_MESSAGE_CHARS),
        }
    }

    pub fn validate(&self) -> Result<(), MailError> {
        let mut missing = Vec::new();
        if self.guardian_name.is_empty() {
            missing.push("responsavel.nome");
        }
        if self.guardian_phone.is_empty() {
            missing.push("responsavel.telefone");
        }
        if self.guardian_email.is_empty() {
            missing.push("responsavel.email");
        }
        if self.student_name.is_empty() {
            missing.push("aluno.nome");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MailError::Validation(format!(
                "Campos obrigatórios ausentes: {}.",
                missing.join(", ")
            )))
        }
    }

    pub fn subject_line(&self) -> String {
        format!("Agendamento de visita — {}", self.guardian_name)
    }

    pub fn to_html(&self) -> String {
        let mut body = String::from("<h2>Novo agendamento de visita</h2>\n");
        body.push_str(&field_row("Responsável", &self.guardian_name));
        body.push_str(&field_row("Telefone", &self.guardian_phone));
        body.push_str(&field_row("E-mail", &self.guardian_email));
        body.push_str(&field_row("Aluno(a)", &self.student_name));
        body.push_str(&field_row("Série pretendida", &self.student_grade));
        if !self.message.is_empty() {
            body.push_str(&format!(
                "<blockquote>{}</blockquote>\n",
                encode_minimal(&self.message)
            ));
        }
        body
    }
}

#[derive(Deserialize)]
struct ProviderResponse {
    id: Option<String>,
}

/// Forwards rendered messages to the transactional email API. With no API
/// key configured the message is logged and reported as sent, so forms keep
/// working in development.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: MailConfig,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Mailer {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn deliver(&self, subject: &str, html: &str) -> Result<String, MailError> {
        let Some(api_key) = &self.config.api_key else {
            info!(subject, body = html, "no mail API key configured, logging message instead");
            return Ok("dev-fallback".to_string());
        };

        let request = serde_json::json!({
            "from": self.config.from,
            "to": [self.config.to],
            "subject": subject,
            "html": html,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("mail provider request failed: {e}");
                MailError::Provider
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(%status, detail, "mail provider rejected the message");
            return Err(MailError::Provider);
        }

        let parsed: ProviderResponse = response.json().await.map_err(|e| {
            error!("mail provider returned an unreadable response: {e}");
            MailError::Provider
        })?;
        Ok(parsed.id.unwrap_or_else(|| "sent".to_string()))
    }
}

pub async fn contact(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactPayload>,
) -> (StatusCode, Json<RelayResponse>) {
    if spam_signals(&payload.website, payload.elapsed_ms) {
        info!("contact submission flagged as spam, accepting without delivery");
        return (
            StatusCode::OK,
            Json(RelayResponse::sent("accepted".to_string())),
        );
    }

    let message = ContactMessage::from_payload(&payload);
    if let Err(e) = message.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RelayResponse::rejected(e.to_string())),
        );
    }

    match state
        .mailer
        .deliver(&message.subject_line(), &message.to_html())
        .await
    {
        Ok(id) => (StatusCode::OK, Json(RelayResponse::sent(id))),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(RelayResponse::rejected(GENERIC_FAILURE.to_string())),
        ),
    }
}

pub async fn scheduling(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SchedulingPayload>,
) -> (StatusCode, Json<RelayResponse>) {
    if spam_signals(&payload.website, payload.elapsed_ms) {
        info!("scheduling submission flagged as spam, accepting without delivery");
        return (
            StatusCode::OK,
            Json(RelayResponse::sent("accepted".to_string())),
        );
    }

    let message = SchedulingMessage::from_payload(&payload);
    if let Err(e) = message.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RelayResponse::rejected(e.to_string())),
        );
    }

    match state
        .mailer
        .deliver(&message.subject_line(), &message.to_html())
        .await
    {
        Ok(id) => (StatusCode::OK, Json(RelayResponse::sent(id))),
        Err(_) => (
            StatusCode::BAD_GATEWAY,
            Json(RelayResponse::rejected(GENERIC_FAILURE.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_submissions_with_no_reachable_field() {
        let payload = ContactPayload {
            name: "Maria".to_string(),
            ..ContactPayload::default()
        };
        let message = ContactMessage::from_payload(&payload);
        assert!(message.validate().is_err());
    }

    #[test]
    fn accepts_any_single_contact_channel() {
        for payload in [
            ContactPayload { message: "Olá".to_string(), ..ContactPayload::default() },
            ContactPayload { email: "a@b.com".to_string(), ..ContactPayload::default() },
            ContactPayload { phone: "11 99999-0000".to_string(), ..ContactPayload::default() },
        ] {
            assert!(ContactMessage::from_payload(&payload).validate().is_ok());
        }
    }

    #[test]
    fn whitespace_only_fields_do_not_pass_validation() {
        let payload = ContactPayload {
            message: "   \n ".to_string(),
            ..ContactPayload::default()
        };
        assert!(ContactMessage::from_payload(&payload).validate().is_err());
    }

    #[test]
    fn fields_are_clipped_to_their_maximum_length() {
        let payload = ContactPayload {
            name: "x".repeat(5000),
            message: "y".repeat(50_000),
            ..ContactPayload::default()
        };
        let message = ContactMessage::from_payload(&payload);
        assert_eq!(message.name.chars().count(), MAX_FIELD_CHARS);
        assert_eq!(message.message.chars().count(), MAX_MESSAGE_CHARS);
    }

    #[test]
    fn mail_body_escapes_markup_in_every_field() {
        let payload = ContactPayload {
            name: "<b>Maria</b>".to_string(),
            email: "maria@example.com".to_string(),
            subject: "\"orçamento\" & matrícula".to_string(),
            message: "<script>alert('x')</script>".to_string(),
            ..ContactPayload::default()
        };
        let message = ContactMessage::from_payload(&payload);
        let html = message.to_html();
        assert!(!html.contains("<b>"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&quot;orçamento&quot; &amp; matrícula"));
    }

    #[test]
    fn honeypot_and_fast_submissions_are_flagged() {
        assert!(spam_signals("http://spam.example", None));
        assert!(spam_signals("", Some(120)));
        assert!(!spam_signals("", Some(10_000)));
        assert!(!spam_signals("", None));
    }

    #[test]
    fn scheduling_reports_each_missing_required_field() {
        let payload = SchedulingPayload {
            responsavel: GuardianFields {
                nome: "João".to_string(),
                ..GuardianFields::default()
            },
            ..SchedulingPayload::default()
        };
        let err = SchedulingMessage::from_payload(&payload)
            .validate()
            .unwrap_err()
            .to_string();
        assert!(err.contains("responsavel.telefone"));
        assert!(err.contains("responsavel.email"));
        assert!(err.contains("aluno.nome"));
        assert!(!err.contains("responsavel.nome"));
    }

    #[tokio::test]
    async fn delivery_without_credentials_uses_the_dev_fallback() {
        let mailer = Mailer::new(MailConfig {
            api_key: None,
            api_url: "https://api.example.com/emails".to_string(),
            from: "site@example.com".to_string(),
            to: "dest@example.com".to_string(),
        });
        let id = mailer.deliver("Contato pelo site", "<p>oi</p>").await.unwrap();
        assert_eq!(id, "dev-fallback");
    }
}
