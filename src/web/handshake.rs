//! The popup page that hands a token back to the CMS window that opened it
//!
//! Wire contract with the CMS: the page first posts `authorizing:<provider>`
//! to any origin, waits for the opener to answer, then posts
//! `authorization:<provider>:success:<json>` to the origin that answered.

use askama::Template;
use serde::Serialize;

#[derive(Serialize)]
struct SuccessPayload<'a> {
    token: &'a str,
    provider: &'a str,
}

#[derive(Template)]
#[template(path = "authorize.html")]
pub(crate) struct AuthorizePage {
    /// Already a safe JavaScript string literal
    authorizing_message: String,
    /// Already a safe JavaScript string literal
    success_message: String,
}

impl AuthorizePage {
    pub(crate) fn new(token: &str, provider: &str) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(&SuccessPayload { token, provider })?;
        Ok(Self {
            authorizing_message: script_string_literal(&authorizing_signal(provider))?,
            success_message: script_string_literal(&format!(
                "authorization:{provider}:success:{payload}"
            ))?,
        })
    }
}

pub(crate) fn authorizing_signal(provider: &str) -> String {
    format!("authorizing:{provider}")
}

/// Quote `value` as a JavaScript string literal that can sit inside a `<script>` element.
///
/// JSON string syntax is valid JavaScript; on top of that, markup-significant
/// characters and the two JSON-legal line terminators are `\u` escaped.
pub(crate) fn script_string_literal(value: &str) -> Result<String, serde_json::Error> {
    let quoted = serde_json::to_string(value)?;
    let mut escaped = String::with_capacity(quoted.len());
    for c in quoted.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}
