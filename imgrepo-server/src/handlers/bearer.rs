use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::infra::errors::AppError;

/// Session token carried as `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("malformed authorization header"))?;

        Ok(Self(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn accepts_bearer_scheme() {
        let token = extract(Some("Bearer abc123")).await.unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[tokio::test]
    async fn rejects_missing_or_foreign_schemes() {
        for header in [None, Some("Basic dXNlcjpwdw=="), Some("Bearer   ")] {
            let err = extract(header).await.unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        }
    }
}
