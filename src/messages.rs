//! User-facing error texts, one exhaustive table per locale.
//!
//! Presentation only. Missing detail fields render as placeholder text,
//! never as an error. Internal details (e.g. `cause`) are never rendered.

use serde_json::{Map, Value};

use crate::model::ErrorCode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    Fr,
}

impl Locale {
    pub fn message(self, code: ErrorCode) -> &'static str {
        match self {
            Locale::Fr => match code {
                ErrorCode::InvalidFormat => "Le format du fichier n'est pas pris en charge.",
                ErrorCode::FileTooLarge => "Le fichier est trop volumineux.",
                ErrorCode::InvalidRequest => "La requête est invalide.",
                ErrorCode::Unauthorized => "Accès non autorisé.",
                ErrorCode::PoorImageQuality => "La qualité de l'image est insuffisante pour l'analyse.",
                ErrorCode::NoTextDetected => "Aucun texte n'a été détecté sur l'image.",
                ErrorCode::RateLimitExceeded => "Trop de requêtes ont été envoyées.",
                ErrorCode::ProcessingError => "Une erreur est survenue lors du traitement du ticket.",
                ErrorCode::ServiceUnavailable => "Le service est temporairement indisponible.",
            },
        }
    }

    pub fn suggestion(self, code: ErrorCode) -> &'static str {
        match self {
            Locale::Fr => match code {
                ErrorCode::InvalidFormat => "Envoyez une image JPEG ou PNG, ou un document PDF.",
                ErrorCode::FileTooLarge => "Réduisez la taille du fichier (10 Mo maximum) ou compressez l'image.",
                ErrorCode::InvalidRequest => "Vérifiez les champs de la requête puis réessayez.",
                ErrorCode::Unauthorized => "Vérifiez vos identifiants d'accès.",
                ErrorCode::PoorImageQuality => {
                    "Reprenez la photo avec un meilleur éclairage, sans flou et en cadrant tout le ticket."
                }
                ErrorCode::NoTextDetected => "Assurez-vous que le ticket est lisible et occupe l'essentiel de l'image.",
                ErrorCode::RateLimitExceeded => "Patientez quelques instants avant de réessayer.",
                ErrorCode::ProcessingError => "Réessayez plus tard. Si le problème persiste, contactez le support.",
                ErrorCode::ServiceUnavailable => "Réessayez dans quelques minutes.",
            },
        }
    }

    pub fn detailed_message(self, code: ErrorCode, details: Option<&Map<String, Value>>) -> String {
        let field = |key: &str| details.and_then(|d| d.get(key)).and_then(detail_text);

        match self {
            Locale::Fr => match code {
                ErrorCode::InvalidFormat => format!(
                    "Le format « {} » n'est pas pris en charge. Formats acceptés : {}.",
                    field("receivedFormat").unwrap_or_else(|| "inconnu".into()),
                    field("supportedFormats").unwrap_or_else(|| "jpeg, png, pdf".into()),
                ),
                ErrorCode::FileTooLarge => format!(
                    "Le fichier ({}) dépasse la taille maximale autorisée ({}).",
                    byte_field(details, "fileSize").unwrap_or_else(|| "taille inconnue".into()),
                    byte_field(details, "maxSize").unwrap_or_else(|| "limite non précisée".into()),
                ),
                ErrorCode::PoorImageQuality => match field("qualityScore") {
                    Some(score) => format!("{} Score de qualité : {}.", self.message(code), score),
                    None => self.message(code).to_string(),
                },
                ErrorCode::RateLimitExceeded => format!(
                    "{} Réessayez dans {}.",
                    self.message(code),
                    field("retryAfter")
                        .map(|s| format!("{} secondes", s))
                        .unwrap_or_else(|| "quelques instants".into()),
                ),
                ErrorCode::ProcessingError => format!(
                    "Une erreur est survenue lors de l'étape « {} ».",
                    field("stage").unwrap_or_else(|| "traitement".into()),
                ),
                ErrorCode::ServiceUnavailable => format!(
                    "Le service « {} » est temporairement indisponible.",
                    field("service").unwrap_or_else(|| "d'analyse".into()),
                ),
                ErrorCode::InvalidRequest
                | ErrorCode::Unauthorized
                | ErrorCode::NoTextDetected => self.message(code).to_string(),
            },
        }
    }
}

fn detail_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(detail_text).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn byte_field(details: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    let bytes = details?.get(key)?.as_f64()?;
    let megabytes = bytes / (1024.0 * 1024.0);
    Some(format!("{:.1} Mo", megabytes).replace('.', ","))
}

fn lookup(code: &str) -> Option<ErrorCode> {
    match code.parse::<ErrorCode>() {
        Ok(code) => Some(code),
        Err(err) => {
            tracing::warn!(%err, "Using default error text");
            None
        }
    }
}

/// Message for a raw code token; unknown tokens get a generic text.
pub fn localized_message(code: &str) -> &'static str {
    lookup(code).map_or("Une erreur inattendue est survenue.", |c| Locale::default().message(c))
}

pub fn detailed_error_message(code: &str, details: Option<&Map<String, Value>>) -> String {
    match lookup(code) {
        Some(c) => Locale::default().detailed_message(c, details),
        None => "Une erreur inattendue est survenue.".to_string(),
    }
}

pub fn error_suggestion(code: &str) -> &'static str {
    lookup(code).map_or("Réessayez plus tard ou contactez le support.", |c| Locale::default().suggestion(c))
}
