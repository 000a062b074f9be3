//! Transport-neutral view of an incoming request.

/// Request method, reduced to what the server distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            other => Self::Other(other.to_string()),
        }
    }

    /// Safe methods that may receive `304 Not Modified`.
    pub fn is_get_or_head(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

/// Method, target and headers of one request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw request target, e.g. `/dist/index-ab12cd34.js?v=1`.
    pub url: String,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::Head
    }

    /// Whether the client accepts content-coding `token`.
    pub fn accepts_encoding(&self, token: &str) -> bool {
        accepts_encoding(self.header("Accept-Encoding"), token)
    }
}

/// Check an `Accept-Encoding` value for `token`.
///
/// Tokens compare case-insensitively; `q=0` excludes a coding. `*` is not
/// expanded.
pub fn accepts_encoding(header: Option<&str>, token: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    header.split(',').any(|item| {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or_default().trim();
        if !coding.eq_ignore_ascii_case(token) {
            return false;
        }
        !parts.any(|param| is_zero_quality(param.trim()))
    })
}

fn is_zero_quality(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("q")
        && value.trim().parse::<f32>().is_ok_and(|q| q == 0.0)
}
