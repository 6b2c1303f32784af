use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{is_valid_tenant, TenantScope};
use crate::error::AppError;
use crate::server::AppState;

const ORG_PATH_PREFIX: &str = "/org/";

/// Resolve the tenant of a request.
///
/// With a configured header the tenant is that header. Otherwise it is the
/// `id_org` segment of `/org/{id_org}/...`. Either way it is mandatory.
pub fn extract_tenant(
    tenant_header: Option<&str>,
    headers: &HeaderMap,
    path: &str,
) -> Result<TenantScope, AppError> {
    let tenant = match tenant_header {
        Some(name) => headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .unwrap_or_default(),
        None => path
            .strip_prefix(ORG_PATH_PREFIX)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or_default(),
    };

    if tenant.is_empty() {
        return Err(AppError::validation("missing tenant"));
    }
    if !is_valid_tenant(tenant) {
        return Err(AppError::validation("invalid tenant"));
    }

    Ok(TenantScope::new(tenant))
}

/// Resolves the request tenant into a `TenantScope` extension and strips the
/// tenant prefix from the response body.
pub async fn tenant_scope(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let scope = match extract_tenant(
        state.settings.tenant.header.as_deref(),
        req.headers(),
        &path,
    ) {
        Ok(scope) => scope,
        Err(e) => {
            tracing::warn!(path = %path, "Rejected request without a usable tenant");
            return e.into_response();
        }
    };

    req.extensions_mut().insert(scope.clone());
    let response = next.run(req).await;

    unscope_response(&scope, response).await
}

async fn unscope_response(scope: &TenantScope, response: Response) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("failed to buffer response: {}", e))
                .into_response()
        }
    };

    let body = match std::str::from_utf8(&bytes) {
        Ok(text) => Body::from(scope.unscope(text)),
        Err(_) => Body::from(bytes),
    };

    // The rewritten body is shorter
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_header_mode_reads_header() {
        let scope = extract_tenant(Some("x-org"), &headers("x-org", "acme"), "/tag/t").unwrap();
        assert_eq!(scope.tenant(), "acme");
    }

    #[test]
    fn test_header_mode_requires_header() {
        let err = extract_tenant(Some("x-org"), &HeaderMap::new(), "/tag/t").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e == &["missing tenant"]));
    }

    #[test]
    fn test_header_mode_ignores_path() {
        let err = extract_tenant(Some("x-org"), &HeaderMap::new(), "/org/acme/tag/t");
        assert!(err.is_err());
    }

    #[test]
    fn test_path_mode_reads_org_segment() {
        let scope = extract_tenant(None, &HeaderMap::new(), "/org/acme/tag/t").unwrap();
        assert_eq!(scope.tenant(), "acme");
    }

    #[test]
    fn test_path_mode_requires_org_segment() {
        for path in ["/tag/t", "/org//tag/t", "/acme%7Cnews"] {
            let err = extract_tenant(None, &HeaderMap::new(), path).unwrap_err();
            assert!(matches!(err, AppError::Validation(ref e) if e == &["missing tenant"]));
        }
    }

    #[test]
    fn test_json_escaped_tenant_is_rejected() {
        let err = extract_tenant(Some("x-org"), &headers("x-org", r#"a"b"#), "/trans").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e == &["invalid tenant"]));

        let err = extract_tenant(None, &HeaderMap::new(), r"/org/a\b/trans").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e == &["invalid tenant"]));
    }

    #[test]
    fn test_separator_in_tenant_is_rejected() {
        let err = extract_tenant(Some("x-org"), &headers("x-org", "a|b"), "/trans").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e == &["invalid tenant"]));
    }

    #[tokio::test]
    async fn test_unscope_response_rewrites_body() {
        let response = Response::builder()
            .header(header::CONTENT_LENGTH, "22")
            .body(Body::from(r#"{"queues":["acme|a"]}"#))
            .unwrap();

        let response = unscope_response(&TenantScope::new("acme"), response).await;
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"queues":["a"]}"#);
    }
}
