/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw
/// config text.
///
/// Unresolvable variables without a fallback are left as-is, so a missing
/// secret shows up verbatim in validation output instead of as an empty
/// string.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated placeholder: emit the remainder untouched.
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => {
                out.push_str("${");
                out.push_str(body);
                out.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "RELAY_SASL_PASS" => Some("hunter2".to_string()),
            "RELAY_CHANNEL" => Some("#ops".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_vars() {
        assert_eq!(
            substitute_env_with(
                "sasl_password = \"${RELAY_SASL_PASS}\"\nchannel = \"${RELAY_CHANNEL}\"",
                lookup
            ),
            "sasl_password = \"hunter2\"\nchannel = \"#ops\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${RELAY_NOT_SET}", lookup),
            "${RELAY_NOT_SET}"
        );
    }

    #[test]
    fn uses_fallback_when_unset() {
        assert_eq!(
            substitute_env_with("port = ${RELAY_PORT:-6697}", lookup),
            "port = 6697"
        );
        assert_eq!(
            substitute_env_with("${RELAY_CHANNEL:-#default}", lookup),
            "#ops"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text $HOME"), "plain text $HOME");
    }
}
