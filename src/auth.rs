use reqwest::RequestBuilder;
use reqwest::header::COOKIE;

/// Attaches the caller's credentials to outbound portal requests.
pub trait AuthProvider: Send + Sync {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder;
}

/// No credentials. The backend answers 401 for anything gated.
#[derive(Debug, Default, Clone)]
pub struct Anonymous;

impl AuthProvider for Anonymous {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
    }
}

/// Cookie-based portal session.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    cookie: String,
}

impl SessionCookie {
    /// Accepts either a bare session token or a full `name=value` cookie string.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cookie = if value.contains('=') {
            value
        } else {
            format!("session={value}")
        };
        SessionCookie { cookie }
    }

    pub fn header_value(&self) -> &str {
        &self.cookie
    }
}

impl AuthProvider for SessionCookie {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(COOKIE, &self.cookie)
    }
}
