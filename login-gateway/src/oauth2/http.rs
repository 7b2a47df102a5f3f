//! HTTP transport for provider requests
//!
//! Each provider client builds one [`reqwest::Client`] with [`http_client`]
//! and reuses it for the token exchange and profile requests.

use super::types::OAuthError;

/// User agent sent with every provider request (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("login-gateway/", env!("CARGO_PKG_VERSION"));

/// Errors from the token exchange transport
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// Request could not be built, sent or read
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// Response could not be assembled
    #[error(transparent)]
    Http(#[from] http::Error),
}

/// Build the client a provider keeps for its lifetime
///
/// Redirects are disabled, since token and profile endpoints must answer
/// directly.
///
/// # Errors
///
/// Returns [`OAuthError::Generic`] if the TLS backend cannot be initialized
pub fn http_client() -> Result<reqwest::Client, OAuthError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| OAuthError::Generic(format!("Failed to build HTTP client: {e}")))
}

/// Send an `oauth2` token request through `client`
///
/// Response bodies are fully buffered.
///
/// # Errors
///
/// Returns error if the request fails or the response body cannot be read
pub async fn send_token_request(
    client: &reqwest::Client,
    request: oauth2::HttpRequest,
) -> Result<oauth2::HttpResponse, HttpClientError> {
    let method = request.method().clone();
    let url = request.uri().to_string();
    let headers = request.headers().clone();
    let body = request.into_body();

    let mut request_builder = client.request(method, &url).body(body);
    for (name, value) in &headers {
        request_builder = request_builder.header(name.as_str(), value.as_bytes());
    }

    let response = request_builder.send().await?;

    let status_code = response.status();
    let headers = response.headers().to_owned();
    let body = response.bytes().await?.to_vec();

    let mut builder = http::Response::builder().status(status_code);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }

    Ok(builder.body(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        routing::post,
        Router,
    };

    async fn serve(app: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn token_request(url: String) -> oauth2::HttpRequest {
        http::Request::builder()
            .method(http::Method::POST)
            .uri(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(b"grant_type=authorization_code&code=abc".to_vec())
            .unwrap()
    }

    #[tokio::test]
    async fn test_token_request_round_trip() {
        let app = Router::new().route(
            "/token",
            post(|body: String| async move {
                assert!(body.contains("code=abc"));
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"access_token":"t","token_type":"bearer"}"#,
                )
            }),
        );
        let addr = serve(app).await;

        let response = send_token_request(&http_client().unwrap(), token_request(format!("http://{addr}/token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(String::from_utf8_lossy(response.body()).contains("access_token"));
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let app = Router::new().route(
            "/token",
            post(|| async { (StatusCode::FOUND, [(header::LOCATION, "/elsewhere")]) }),
        );
        let addr = serve(app).await;

        let client = http_client().unwrap();
        for _ in 0..2 {
            let response = send_token_request(&client, token_request(format!("http://{addr}/token")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FOUND);
        }
    }
}
