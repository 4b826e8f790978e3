//! Schema-tolerant parsing of Coinbase deep-link returns.

use crate::url_encoding::decode_query;

/// `error` values that mean the user backed out rather than being refused.
const CANCEL_ERRORS: &[&str] = &["user_cancelled", "user_canceled", "cancelled", "canceled"];

/// Coinbase reports both a refusal and a tapped cancel as `access_denied`;
/// only the description tells them apart.
const ACCESS_DENIED: &str = "access_denied";

/// A deep link split into the parts the return handler looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    params: Vec<(String, String)>,
}

/// What a matching return URL carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnPayload {
    Authorized { code: String, granted_scope: Option<String> },
    Cancelled,
    Denied(Option<String>),
}

impl ReturnUrl {
    /// Parses `scheme://host/path?query#fragment`. Returns `None` for anything else.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let without_fragment = url.split('#').next().unwrap_or_default();
        let (scheme, rest) = without_fragment.split_once("://")?;
        if !is_valid_scheme(scheme) {
            return None;
        }
        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, query),
            None => (rest, ""),
        };
        let (host, path) = match location.find('/') {
            Some(idx) => (&location[..idx], &location[idx..]),
            None => (location, ""),
        };
        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            path: path.trim_end_matches('/').to_string(),
            params: decode_query(query),
        })
    }

    /// Value of `key`. Missing, or present several times with different values, is `None`.
    pub fn param(&self, key: &str) -> Option<&str> {
        let mut values = self.params.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str());
        let first = values.next()?;
        if values.any(|other| other != first) {
            return None;
        }
        Some(first)
    }

    /// Whether `key` appears at all.
    pub fn has_param(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    /// Scheme, host and path match `redirect_uri`, the URI the attempt was launched with.
    /// An unparseable `redirect_uri` matches nothing.
    pub fn is_return_to(&self, redirect_uri: &str) -> bool {
        match Self::parse(redirect_uri) {
            Some(expected) => self.scheme == expected.scheme && self.host == expected.host && self.path == expected.path,
            None => false,
        }
    }

    /// The correlation token, if exactly one non-empty value is present.
    pub fn state(&self) -> Option<&str> {
        self.param("state").filter(|s| !s.is_empty())
    }

    /// Classifies the payload. Errors win over codes; a URL with neither is a denial.
    pub fn payload(&self) -> ReturnPayload {
        if self.has_param("error") {
            let error = self.param("error").unwrap_or_default();
            let description = self.param("error_description").filter(|d| !d.is_empty());
            let mentions_cancel = description.is_some_and(|d| d.to_ascii_lowercase().contains("cancel"));
            if CANCEL_ERRORS.iter().any(|e| error.eq_ignore_ascii_case(e))
                || (error.eq_ignore_ascii_case(ACCESS_DENIED) && mentions_cancel)
            {
                return ReturnPayload::Cancelled;
            }
            let reason = description.or(Some(error).filter(|e| !e.is_empty())).map(str::to_string);
            return ReturnPayload::Denied(reason);
        }
        if matches!(self.param("cancel"), Some("1") | Some("true")) {
            return ReturnPayload::Cancelled;
        }
        match self.param("code").filter(|c| !c.is_empty()) {
            Some(code) => ReturnPayload::Authorized {
                code: code.to_string(),
                granted_scope: self.param("scope").map(str::to_string),
            },
            None => ReturnPayload::Denied(Some("missing authorization code".to_string())),
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
