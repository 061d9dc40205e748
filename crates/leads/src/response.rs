use serde::Deserialize;
use serde_json::Value;

/// Body returned by the leads endpoint. Every field is optional; deployments
/// differ in which id key they use and whether they send a reason at all.
/// Fields are kept as raw JSON so one oddly typed field cannot hide the rest.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LeadsResponse {
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "leadId")]
    lead_id_camel: Option<Value>,
    #[serde(default)]
    lead_id: Option<Value>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl LeadsResponse {
    /// Lenient parse: an empty or non-JSON body yields `None`.
    pub fn parse(body: &str) -> Option<Self> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }

    /// `false` or `"false"`; anything else is not an explicit decline.
    pub fn declined(&self) -> bool {
        match &self.success {
            Some(Value::Bool(success)) => !success,
            Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("false"),
            _ => false,
        }
    }

    pub fn lead_id(&self) -> Option<String> {
        [&self.id, &self.lead_id_camel, &self.lead_id]
            .into_iter()
            .flatten()
            .find_map(identifier_text)
    }

    pub fn reason(&self) -> Option<String> {
        [&self.message, &self.error].into_iter().flatten().find_map(reason_text)
    }
}

fn reason_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(reason_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(fields) => return fields.get("message").and_then(reason_text),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn identifier_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::LeadsResponse;

    #[test]
    fn picks_first_usable_identifier_key() {
        let camel = LeadsResponse::parse(r#"{"success":true,"leadId":"CRM-7"}"#);
        let snake = LeadsResponse::parse(r#"{"lead_id":"CRM-8","id":""}"#);
        let numeric = LeadsResponse::parse(r#"{"id":981}"#);

        assert_eq!(camel.and_then(|body| body.lead_id()), Some("CRM-7".to_string()));
        assert_eq!(snake.and_then(|body| body.lead_id()), Some("CRM-8".to_string()));
        assert_eq!(numeric.and_then(|body| body.lead_id()), Some("981".to_string()));
    }

    #[test]
    fn reason_prefers_message_then_error_text_or_object() {
        let message = LeadsResponse::parse(r#"{"message":"Telefone inválido","error":"x"}"#)
            .and_then(|body| body.reason());
        let error_text =
            LeadsResponse::parse(r#"{"error":"duplicate lead"}"#).and_then(|body| body.reason());
        let error_object = LeadsResponse::parse(r#"{"error":{"message":"email bounced"}}"#)
            .and_then(|body| body.reason());
        let blank = LeadsResponse::parse(r#"{"message":"  "}"#).and_then(|body| body.reason());

        assert_eq!(message.as_deref(), Some("Telefone inválido"));
        assert_eq!(error_text.as_deref(), Some("duplicate lead"));
        assert_eq!(error_object.as_deref(), Some("email bounced"));
        assert_eq!(blank, None);
    }

    #[test]
    fn empty_or_html_bodies_do_not_parse() {
        assert_eq!(LeadsResponse::parse(""), None);
        assert_eq!(LeadsResponse::parse("<html>bad gateway</html>"), None);
    }

    #[test]
    fn explicit_false_success_is_a_decline() {
        let body = LeadsResponse::parse(r#"{"success":false}"#).expect("json body");
        assert!(body.declined());
        assert!(!LeadsResponse::default().declined());
    }

    #[test]
    fn oddly_typed_fields_do_not_hide_a_decline() {
        let listed = LeadsResponse::parse(r#"{"success":false,"message":["email invalid"]}"#)
            .expect("json body");
        let quoted = LeadsResponse::parse(r#"{"success":"false"}"#).expect("json body");
        let truthy = LeadsResponse::parse(r#"{"success":"true","id":5}"#).expect("json body");

        assert!(listed.declined());
        assert_eq!(listed.reason().as_deref(), Some("email invalid"));
        assert!(quoted.declined());
        assert!(!truthy.declined());
        assert_eq!(truthy.lead_id().as_deref(), Some("5"));
    }
}
