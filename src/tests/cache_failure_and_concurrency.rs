// Cache behaviour that needs precise control over the source: failures on a
// warm cache and concurrent callers.

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::task::JoinSet;

    use crate::cache::token_cache::TokenCache;
    use crate::error::AuthError;
    use crate::helpers::time::ManualClock;
    use crate::tests::common::{issued, ScriptedSource};

    const BUFFER: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn failed_refresh_keeps_the_valid_token() {
        let source = ScriptedSource::new(3600);
        let clock = ManualClock::default();
        let cache = TokenCache::with_clock(source.clone(), BUFFER, Arc::new(clock.clone()));

        assert_eq!(cache.get_token().await.unwrap(), "token-1");

        source.fail_next();
        let err = cache.refresh().await.unwrap_err();
        assert!(matches!(err, AuthError::Fetch { .. }));

        assert_eq!(cache.peek().await.unwrap().value, "token-1");
        assert_eq!(cache.get_token().await.unwrap(), "token-1");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_on_stale_token_keeps_it_cached_until_replaced() {
        let source = ScriptedSource::new(3600);
        let clock = ManualClock::default();
        let cache = TokenCache::with_clock(source.clone(), BUFFER, Arc::new(clock.clone()));
        cache.get_token().await.unwrap();

        clock.advance(Duration::from_secs(3400));
        source.fail_next();
        assert!(cache.get_token().await.is_err());
        assert_eq!(cache.peek().await.unwrap().value, "token-1");

        // the next call retries and replaces it
        assert_eq!(cache.get_token().await.unwrap(), "token-3");
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn short_lived_tokens_are_fetched_every_time() {
        let source = ScriptedSource::new(3600);
        source.push(Ok(issued("short", 120)));
        let cache = TokenCache::with_clock(source.clone(), BUFFER, Arc::new(ManualClock::default()));

        assert_eq!(cache.get_token().await.unwrap(), "short");
        assert_eq!(cache.get_token().await.unwrap(), "token-2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_fetch() {
        let source = ScriptedSource::new(3600).with_delay(Duration::from_millis(200));
        let cache = Arc::new(TokenCache::new(source.clone(), BUFFER));

        let mut callers = JoinSet::new();
        for _ in 0..16 {
            let cache = cache.clone();
            callers.spawn(async move { cache.get_token().await });
        }

        let mut tokens = Vec::new();
        while let Some(joined) = callers.join_next().await {
            tokens.push(joined.unwrap().unwrap());
        }

        assert_eq!(tokens.len(), 16);
        assert!(tokens.iter().all(|t| t == "token-1"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn callers_waiting_on_a_failed_fetch_retry_it() {
        let source = ScriptedSource::new(3600).with_delay(Duration::from_millis(100));
        source.fail_next();
        let cache = Arc::new(TokenCache::new(source.clone(), BUFFER));

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_token().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_token().await })
        };

        assert!(first.await.unwrap().is_err());
        assert_eq!(second.await.unwrap().unwrap(), "token-2");
        assert_eq!(source.calls(), 2);
    }
}
