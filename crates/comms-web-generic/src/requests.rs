//! JSON request bodies accepted by the gateway.
//!
//! Field names are documented in camelCase but bind case-insensitively, so
//! `phoneNumber`, `PhoneNumber` and `phonenumber` are the same field. When a
//! body spells one field several ways, the exact camelCase key wins. Unknown
//! fields are ignored. Empty strings are accepted as-is.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const DEFAULT_TEMPLATE_NAME: &str = "appointment_reminder";
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub subject: String,
    pub html_content: String,
    /// Recipient email address
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SmsRequest {
    pub message: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppRequest {
    pub phone_number: String,
    #[serde(default = "default_template_name")]
    #[cfg_attr(feature = "openapi", schema(default = "appointment_reminder"))]
    pub template_name: String,
    #[serde(default = "default_template_language")]
    #[cfg_attr(feature = "openapi", schema(default = "en"))]
    pub template_language: String,
    /// Bound in order to placeholders `value1..valueN`
    #[serde(default)]
    pub template_parameters: Vec<String>,
}

/// A JSON request body whose field names bind case-insensitively.
pub trait RequestBody: DeserializeOwned {
    /// Canonical camelCase field names.
    const FIELDS: &'static [&'static str];

    fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        serde_json::from_value(canonicalize(value, Self::FIELDS))
    }
}

impl RequestBody for EmailRequest {
    const FIELDS: &'static [&'static str] = &["subject", "htmlContent", "recipient"];
}

impl RequestBody for SmsRequest {
    const FIELDS: &'static [&'static str] = &["message", "phoneNumber"];
}

impl RequestBody for WhatsAppRequest {
    const FIELDS: &'static [&'static str] = &[
        "phoneNumber",
        "templateName",
        "templateLanguage",
        "templateParameters",
    ];
}

/// Rename object keys to their canonical spelling and drop unknown ones.
fn canonicalize(value: Value, fields: &[&str]) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let mut exact = Map::new();
    let mut folded = Map::new();
    for (key, v) in map {
        match fields.iter().find(|f| f.eq_ignore_ascii_case(&key)) {
            Some(f) if *f == key => {
                exact.insert(key, v);
            }
            Some(f) => {
                folded.insert((*f).to_string(), v);
            }
            None => {}
        }
    }
    folded.extend(exact);
    Value::Object(folded)
}

fn default_template_name() -> String {
    DEFAULT_TEMPLATE_NAME.to_string()
}

fn default_template_language() -> String {
    DEFAULT_TEMPLATE_LANGUAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_defaults_apply_when_omitted() {
        let req: WhatsAppRequest = serde_json::from_str(r#"{"phoneNumber":"+1555"}"#).unwrap();
        assert_eq!(req.template_name, "appointment_reminder");
        assert_eq!(req.template_language, "en");
        assert!(req.template_parameters.is_empty());
    }

    #[test]
    fn whatsapp_explicit_values_win() {
        let req: WhatsAppRequest = serde_json::from_str(
            r#"{"phoneNumber":"+1555","templateName":"shipping","templateLanguage":"es","templateParameters":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(req.template_name, "shipping");
        assert_eq!(req.template_language, "es");
        assert_eq!(req.template_parameters, vec!["a", "b"]);
    }

    #[test]
    fn accepts_pascal_case_fields() {
        let req = EmailRequest::from_json(
            br#"{"Subject":"s","HtmlContent":"<b>x</b>","Recipient":"a@b.c"}"#,
        )
        .unwrap();
        assert_eq!(req.html_content, "<b>x</b>");
        assert_eq!(req.recipient, "a@b.c");
    }

    #[test]
    fn field_names_bind_case_insensitively() {
        let req = SmsRequest::from_json(br#"{"phonenumber":"+1555","MESSAGE":"hi"}"#).unwrap();
        assert_eq!(req.phone_number, "+1555");
        assert_eq!(req.message, "hi");

        let req = WhatsAppRequest::from_json(
            br#"{"PHONENUMBER":"+1","templatename":"shipping","TemplateParameters":["a"]}"#,
        )
        .unwrap();
        assert_eq!(req.template_name, "shipping");
        assert_eq!(req.template_language, "en");
        assert_eq!(req.template_parameters, vec!["a"]);
    }

    #[test]
    fn exact_spelling_wins_over_other_casings() {
        let req =
            SmsRequest::from_json(br#"{"PhoneNumber":"+2","phoneNumber":"+1","message":"m"}"#)
                .unwrap();
        assert_eq!(req.phone_number, "+1");
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        assert!(SmsRequest::from_json(b"[]").is_err());
        assert!(SmsRequest::from_json(b"null").is_err());
        assert!(SmsRequest::from_json(b"").is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        assert!(serde_json::from_str::<SmsRequest>(r#"{"message":"hi"}"#).is_err());
        assert!(serde_json::from_str::<EmailRequest>(r#"{"subject":"s","recipient":"r"}"#).is_err());
        assert!(serde_json::from_str::<WhatsAppRequest>(r#"{"templateName":"x"}"#).is_err());
    }

    #[test]
    fn null_and_wrong_types_are_rejected() {
        assert!(
            serde_json::from_str::<SmsRequest>(r#"{"message":null,"phoneNumber":"+1"}"#).is_err()
        );
        assert!(
            serde_json::from_str::<WhatsAppRequest>(
                r#"{"phoneNumber":"+1","templateParameters":"Monday"}"#
            )
            .is_err()
        );
    }

    #[test]
    fn empty_strings_are_accepted() {
        let req = SmsRequest::from_json(br#"{"message":"","phoneNumber":"","extra":1}"#).unwrap();
        assert_eq!(req.message, "");
        assert_eq!(req.phone_number, "");
    }
}
