// The token gateway served over a real socket, backed by a mocked identity provider.

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use http::StatusCode;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::{json, Value};

    use crate::cache::token_cache::TokenCache;
    use crate::config::settings::SettingsConfig;
    use crate::server::server::router;
    use crate::server::token_routes::TokenRoutesState;
    use crate::sources::Source;
    use crate::tests::common::{build_reqwest_client, machine_source, session_source_config, spawn_axum};

    async fn start_gateway(idp: &MockServer) -> String {
        let machine = Arc::new(TokenCache::new(
            machine_source(idp.url("/oauth/token")),
            Duration::from_secs(300),
        ));
        let user = Arc::new(TokenCache::new(
            Source::new(
                "user",
                session_source_config(idp.url("/api/user-token"), "appSession=gone"),
                build_reqwest_client(),
            ),
            Duration::from_secs(300),
        ));
        let caches = HashMap::from([("machine".to_owned(), machine), ("user".to_owned(), user)]);

        let mut settings = SettingsConfig::default();
        settings.metrics.is_enabled = true;
        let app = router(&settings, TokenRoutesState::new(caches, Some("machine".to_owned()))).await;
        let (_handle, addr) = spawn_axum(app).await;
        format!("http://{}", addr)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn token_route_serves_cached_token() {
        let idp = MockServer::start_async().await;
        let issue = idp
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(200)
                    .json_body(json!({"access_token": "abc", "expires_in": 3600, "token_type": "Bearer"}));
            })
            .await;
        let base = start_gateway(&idp).await;
        let client = build_reqwest_client();

        for _ in 0..3 {
            let response = client.get(format!("{}/api/token", base)).send().await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["access_token"], "abc");
            assert_eq!(body["token_type"], "Bearer");
            let expires_in = body["expires_in"].as_u64().unwrap();
            assert!(expires_in <= 3600 && expires_in > 3500, "expires_in {}", expires_in);
        }
        assert_eq!(issue.hits_async().await, 1);

        let named = client.get(format!("{}/api/token/machine", base)).send().await.unwrap();
        assert_eq!(named.status(), StatusCode::OK);
        assert_eq!(issue.hits_async().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalidate_route_forces_refetch() {
        let idp = MockServer::start_async().await;
        let issue = idp
            .mock_async(|when, then| {
                when.method(POST).path("/oauth/token");
                then.status(200).json_body(json!({"access_token": "abc", "expires_in": 3600}));
            })
            .await;
        let base = start_gateway(&idp).await;
        let client = build_reqwest_client();

        client.get(format!("{}/api/token", base)).send().await.unwrap();
        let invalidated = client.post(format!("{}/api/token/invalidate", base)).send().await.unwrap();
        assert_eq!(invalidated.status(), StatusCode::NO_CONTENT);
        client.get(format!("{}/api/token", base)).send().await.unwrap();

        assert_eq!(issue.hits_async().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn errors_map_to_status_codes() {
        let idp = MockServer::start_async().await;
        idp.mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(500).body("boom");
        })
        .await;
        idp.mock_async(|when, then| {
            when.method(GET).path("/api/user-token");
            then.status(401);
        })
        .await;
        let base = start_gateway(&idp).await;
        let client = build_reqwest_client();

        let failed = client.get(format!("{}/api/token", base)).send().await.unwrap();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = failed.json().await.unwrap();
        assert_eq!(body["error"], "Internal server error");

        let anonymous = client.get(format!("{}/api/token/user", base)).send().await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let unknown = client.get(format!("{}/api/token/nope", base)).send().await.unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn health_and_metrics() {
        let idp = MockServer::start_async().await;
        idp.mock_async(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).json_body(json!({"access_token": "abc", "expires_in": 3600}));
        })
        .await;
        let base = start_gateway(&idp).await;
        let client = build_reqwest_client();

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health, json!({"status": "ok"}));

        client.get(format!("{}/api/token", base)).send().await.unwrap();
        let metrics = client
            .get(format!("{}/metrics", base))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("applyflow_token_fetch_requests_total"));
        assert!(metrics.contains("applyflow_token_cache_misses_total"));
    }
}
