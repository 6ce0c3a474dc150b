//! Authentication challenge handling.
//!
//! An [`Authenticator`] answers `401 Unauthorized` (or, as the proxy
//! authenticator, `407 Proxy Authentication Required`) with a new request
//! carrying credentials, or gives up by returning `None`.

use crate::{Request, Response, Result, Route, header};

/// Answers authentication challenges.
pub trait Authenticator: Send + Sync {
    /// Returns a request that satisfies the challenge in `response`, or
    /// `None` to give up and deliver `response` to the caller.
    fn authenticate(&self, route: Option<&Route>, response: &Response) -> Result<Option<Request>>;
}

/// An authenticator that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthenticator;

impl Authenticator for NoAuthenticator {
    fn authenticate(&self, _route: Option<&Route>, _response: &Response) -> Result<Option<Request>> {
        Ok(None)
    }
}

/// One scheme offered in a `WWW-Authenticate` or `Proxy-Authenticate`
/// header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    scheme: String,
    params: Vec<(String, String)>,
}

impl Challenge {
    /// Authentication scheme, e.g. `Basic`.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The `realm` parameter.
    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }

    /// A parameter by case-insensitive name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parses one header value such as `Basic realm="api", charset="UTF-8"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
        if scheme.is_empty() {
            return None;
        }

        let params = rest
            .split(',')
            .filter_map(|param| {
                let (key, value) = param.split_once('=')?;
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((key.trim().to_string(), value.to_string()))
            })
            .collect();

        Some(Self {
            scheme: scheme.to_string(),
            params,
        })
    }
}

/// The challenges of a `401` or `407` response.
///
/// Other status codes have none.
#[must_use]
pub fn challenges(response: &Response) -> Vec<Challenge> {
    let name = match response.code() {
        401 => header::WWW_AUTHENTICATE,
        407 => header::PROXY_AUTHENTICATE,
        _ => return Vec::new(),
    };
    response
        .headers()
        .values(name.as_str())
        .into_iter()
        .filter_map(Challenge::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn response(code: u16, header: &str, value: &str) -> Response {
        Response::builder()
            .request(Request::get("http://a/").expect("valid request"))
            .code(code)
            .header(header, value)
            .build()
            .expect("valid response")
    }

    #[test]
    fn parse_basic_challenge() {
        let_assert!(Some(challenge) = Challenge::parse(r#"Basic realm="api", charset="UTF-8""#));
        check!(challenge.scheme() == "Basic");
        check!(challenge.realm() == Some("api"));
        check!(challenge.param("Charset") == Some("UTF-8"));
    }

    #[test]
    fn parse_scheme_only() {
        let_assert!(Some(challenge) = Challenge::parse("Negotiate"));
        check!(challenge.scheme() == "Negotiate");
        check!(challenge.realm().is_none());
        check!(Challenge::parse("  ").is_none());
    }

    #[test]
    fn challenges_depend_on_status() {
        let unauthorized = response(401, "WWW-Authenticate", r#"Basic realm="a""#);
        check!(challenges(&unauthorized).len() == 1);

        let proxy = response(407, "Proxy-Authenticate", r#"Basic realm="p""#);
        let proxy_challenges = challenges(&proxy);
        let_assert!([challenge] = proxy_challenges.as_slice());
        check!(challenge.realm() == Some("p"));

        let ok = response(200, "WWW-Authenticate", r#"Basic realm="a""#);
        check!(challenges(&ok).is_empty());
    }

    #[test]
    fn no_authenticator_gives_up() {
        let unauthorized = response(401, "WWW-Authenticate", "Basic");
        let_assert!(Ok(None) = NoAuthenticator.authenticate(None, &unauthorized));
    }
}
