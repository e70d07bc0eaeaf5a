//! Outbound rate limiting
//!
//! Fixed-window limiter keyed by caller. `ThrottledModel` wraps any
//! `LanguageModel` and waits for a slot per model profile before each call.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::Result;

use super::model::{LanguageModel, ModelProfile};
use super::types::Message;

/// Window state for one key
#[derive(Clone)]
struct WindowState {
    request_count: u32,
    window_start: Instant,
}

/// In-memory fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Take a slot for `key` if one is free in the current window
    pub async fn check(&self, key: &str) -> bool {
        self.try_acquire(key).await.is_ok()
    }

    /// Wait until a slot for `key` is free, then take it
    pub async fn acquire(&self, key: &str) {
        loop {
            match self.try_acquire(key).await {
                Ok(()) => return,
                Err(wait) => {
                    debug!("Rate limit reached for {}, waiting {:?}", key, wait);
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Take a slot, or return how long until the window resets
    async fn try_acquire(&self, key: &str) -> std::result::Result<(), Duration> {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        let state = windows.entry(key.to_string()).or_insert(WindowState {
            request_count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(state.window_start) >= self.window {
            state.request_count = 0;
            state.window_start = now;
        }

        if state.request_count >= self.max_requests {
            let elapsed = now.duration_since(state.window_start);
            return Err(self.window.saturating_sub(elapsed).max(Duration::from_millis(1)));
        }

        state.request_count += 1;
        Ok(())
    }

    /// Drop expired windows
    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;
        let now = Instant::now();
        windows.retain(|_, state| now.duration_since(state.window_start) < self.window);
    }
}

/// A `LanguageModel` that waits for a rate-limit slot before each call
pub struct ThrottledModel<M> {
    inner: M,
    limiter: RateLimiter,
}

impl<M: LanguageModel> ThrottledModel<M> {
    pub fn new(inner: M, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    async fn wait(&self, profile: ModelProfile) {
        if !self.limiter.check(profile.as_str()).await {
            warn!("LLM rate limit reached for {} profile, delaying call", profile);
            self.limiter.acquire(profile.as_str()).await;
        }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for ThrottledModel<M> {
    async fn invoke(&self, profile: ModelProfile, messages: &[Message]) -> Result<String> {
        self.wait(profile).await;
        self.inner.invoke(profile, messages).await
    }

    async fn invoke_structured(
        &self,
        profile: ModelProfile,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value> {
        self.wait(profile).await;
        self.inner.invoke_structured(profile, messages, schema).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn invoke(&self, _profile: ModelProfile, _messages: &[Message]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.check("basic").await);
        assert!(limiter.check("basic").await);
        assert!(limiter.check("basic").await);
        assert!(!limiter.check("basic").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check("basic").await);
        assert!(!limiter.check("basic").await);
        assert!(limiter.check("reasoning").await);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_next_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));
        limiter.acquire("basic").await;

        let started = Instant::now();
        limiter.acquire("basic").await;
        assert!(started.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_windows() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));
        assert!(limiter.check("basic").await);
        tokio::time::sleep(Duration::from_millis(60)).await;
        limiter.cleanup().await;
        assert!(limiter.windows.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_throttled_model_delays_only_when_over_limit() {
        let model = ThrottledModel::new(
            CountingModel {
                calls: AtomicUsize::new(0),
            },
            RateLimiter::new(2, Duration::from_millis(150)),
        );

        let started = Instant::now();
        for _ in 0..2 {
            model.invoke(ModelProfile::Basic, &[]).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(100));

        model.invoke(ModelProfile::Basic, &[]).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(140));
        assert_eq!(model.inner().calls.load(Ordering::SeqCst), 3);
    }
}
