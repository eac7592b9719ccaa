use serde::{Deserialize, Serialize};

/// Body of `POST mercadopago/payment/preference`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRequest {
    pub campaign_id: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub anonymous: bool,
}

impl PreferenceRequest {
    #[must_use]
    pub fn new(campaign_id: impl Into<String>, amount: f64) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            amount,
            donor_email: None,
            donor_name: None,
            message: None,
            anonymous: false,
        }
    }

    #[must_use]
    pub fn with_donor(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.donor_name = Some(name.into());
        self.donor_email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// Hosted-checkout handoff returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "init_point")]
    pub init_point: Option<String>,
    #[serde(default, alias = "sandbox_init_point")]
    pub sandbox_init_point: Option<String>,
}

impl PaymentPreference {
    /// URL to send the donor to.
    ///
    /// Prefers the sandbox link when `sandbox` is set, falling back to the
    /// other link if only one was issued. `None` means no redirect is possible.
    #[must_use]
    pub fn checkout_url(&self, sandbox: bool) -> Option<&str> {
        let (first, second) = if sandbox {
            (&self.sandbox_init_point, &self.init_point)
        } else {
            (&self.init_point, &self.sandbox_init_point)
        };
        first
            .as_deref()
            .or(second.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_url_prefers_requested_mode() {
        let pref: PaymentPreference = serde_json::from_str(
            r#"{"id":"p1","initPoint":"https://pay/live","sandboxInitPoint":"https://pay/sandbox"}"#,
        )
        .unwrap();
        assert_eq!(pref.checkout_url(false), Some("https://pay/live"));
        assert_eq!(pref.checkout_url(true), Some("https://pay/sandbox"));
    }

    #[test]
    fn checkout_url_falls_back_to_available_link() {
        let pref: PaymentPreference =
            serde_json::from_str(r#"{"init_point":"https://pay/live"}"#).unwrap();
        assert_eq!(pref.checkout_url(true), Some("https://pay/live"));
    }

    #[test]
    fn checkout_url_none_without_links() {
        let pref: PaymentPreference = serde_json::from_str(r#"{"id":"p1"}"#).unwrap();
        assert_eq!(pref.checkout_url(false), None);
    }

    #[test]
    fn request_serializes_camel_case_without_empty_fields() {
        let req = PreferenceRequest::new("c1", 500.0).with_message("¡Fuerza!");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["campaignId"], "c1");
        assert_eq!(json["message"], "¡Fuerza!");
        assert!(json.get("donorEmail").is_none());
        assert_eq!(json["anonymous"], false);
    }
}
