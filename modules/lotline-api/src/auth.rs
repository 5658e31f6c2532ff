use axum::http::{header, HeaderMap};

/// Check the continuation shared secret. When no secret is configured the
/// endpoint is open (single-operator deployments behind a private network).
pub fn check_shared_secret(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return false;
    };
    let Ok(auth_str) = auth.to_str() else {
        return false;
    };
    let Some(presented) = auth_str.strip_prefix("Bearer ") else {
        return false;
    };

    constant_time_eq(presented.as_bytes(), expected.as_bytes())
}

/// Byte comparison that doesn't short-circuit on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_configured_secret_means_open() {
        assert!(check_shared_secret(&HeaderMap::new(), None));
    }

    #[test]
    fn matching_bearer_token_passes() {
        assert!(check_shared_secret(
            &headers_with("Bearer s3cret"),
            Some("s3cret")
        ));
    }

    #[test]
    fn wrong_or_missing_token_fails() {
        assert!(!check_shared_secret(&HeaderMap::new(), Some("s3cret")));
        assert!(!check_shared_secret(
            &headers_with("Bearer nope"),
            Some("s3cret")
        ));
        assert!(!check_shared_secret(
            &headers_with("Basic s3cret"),
            Some("s3cret")
        ));
    }
}
