use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// An inbound payload that is relayed as exactly one chat line.
pub trait Notification {
    /// Short label used for logging and metric labels.
    const KIND: &'static str;

    /// Render the payload as a single line, fields in their documented order.
    fn to_line(&self) -> String;
}

/// Generic alert posted by monitoring tools.
///
/// Every field is optional on the wire; missing ones deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertInfo {
    pub sender: String,
    pub title: String,
    pub description: String,
}

impl Notification for AlertInfo {
    const KIND: &'static str = "alert";

    fn to_line(&self) -> String {
        format!(
            "Sender: {}, Title: {}, Description: {}",
            single_line(&self.sender),
            single_line(&self.title),
            single_line(&self.description)
        )
    }
}

/// SMS forwarded by a phone-side forwarding app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmsInfo {
    pub from: String,
    pub text: String,
    /// Unix timestamp (ms) at which the SMS was sent.
    pub sent_stamp: i64,
    /// Unix timestamp (ms) at which the phone received it.
    pub received_stamp: i64,
    /// SIM slot label reported by the phone.
    pub sim: String,
}

impl Notification for SmsInfo {
    const KIND: &'static str = "sms";

    fn to_line(&self) -> String {
        format!(
            "From: {}, Text: {}",
            single_line(&self.from),
            single_line(&self.text)
        )
    }
}

/// Replace characters that would terminate or corrupt an IRC line.
fn single_line(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n', '\0']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace("\r\n", " ")
            .replace(['\r', '\n'], " ")
            .replace('\0', ""),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn alert_line_keeps_field_order() {
        let alert: AlertInfo = serde_json::from_str(
            r#"{"sender":"svc-a","title":"disk full","description":"/var 95%"}"#,
        )
        .unwrap();
        assert_eq!(
            alert.to_line(),
            "Sender: svc-a, Title: disk full, Description: /var 95%"
        );
    }

    #[test]
    fn sms_line_uses_from_and_text() {
        let sms: SmsInfo = serde_json::from_str(
            r#"{"from":"+15550100","text":"code 1234","sentStamp":1700000000000,"receivedStamp":1700000000500,"sim":"SIM1"}"#,
        )
        .unwrap();
        assert_eq!(sms.sent_stamp, 1_700_000_000_000);
        assert_eq!(sms.received_stamp, 1_700_000_000_500);
        assert_eq!(sms.sim, "SIM1");
        assert_eq!(sms.to_line(), "From: +15550100, Text: code 1234");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let alert: AlertInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(alert, AlertInfo::default());
        assert_eq!(alert.to_line(), "Sender: , Title: , Description: ");
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        assert!(serde_json::from_str::<SmsInfo>(r#"{"sentStamp":"yesterday"}"#).is_err());
        assert!(serde_json::from_str::<AlertInfo>(r#"{"sender":42}"#).is_err());
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("two\nlines", "two lines")]
    #[case("crlf\r\nend", "crlf end")]
    #[case("lone\rcr", "lone cr")]
    #[case("nul\0byte", "nulbyte")]
    fn line_breaks_are_flattened(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(single_line(input), expected);
    }

    #[test]
    fn multi_line_description_stays_one_message() {
        let alert = AlertInfo {
            sender: "cron".into(),
            title: "job failed".into(),
            description: "exit 1\nsee logs".into(),
        };
        let line = alert.to_line();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            "Sender: cron, Title: job failed, Description: exit 1 see logs"
        );
    }
}
