use crate::url_encoding::parse_query;

/// Query parameters of the redirect back from the authorization server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parses a raw query string, with or without the leading `?`.
    /// The first occurrence of a repeated parameter wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in parse_query(query) {
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    /// Parses the query part of a full redirect URL, ignoring any fragment.
    pub fn from_url(url: &str) -> Self {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        match without_fragment.split_once('?') {
            Some((_, query)) => Self::from_query(query),
            None => Self::default(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_redirect() {
        let params = CallbackParams::from_url("https://app.local/cb?state=S1&code=C%2B1#_");
        assert_eq!(params.state.as_deref(), Some("S1"));
        assert_eq!(params.code.as_deref(), Some("C+1"));
        assert!(!params.is_error());
    }

    #[test]
    fn parses_error_redirect() {
        let params = CallbackParams::from_query(
            "error=access_denied&error_description=User+said+no&state=S1",
        );
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User said no"));
        assert!(params.code.is_none());
    }

    #[test]
    fn url_without_query_is_empty() {
        assert_eq!(CallbackParams::from_url("https://app.local/cb"), CallbackParams::default());
    }
}
