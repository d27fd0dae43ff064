// File: fetcher.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ConfigParameter;
use crate::errors::{ScrapeError, ScrapeResult};
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::{debug, info};
use reqwest::blocking::Client;
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Plain byte retrieval. Implementations know nothing about what they fetch.
pub trait Fetch {
    fn fetch(&self, url: &str) -> ScrapeResult<Vec<u8>>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        (**self).fetch(url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ConfigParameter) -> Self {
        Self::new(config.max_attempts(), config.backoff(), config.max_backoff())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the next try, after `failed` attempts have failed.
    pub fn delay_for(&self, failed: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpFetcher {
    pub fn new(config: &ConfigParameter) -> ScrapeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout()))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Network {
                url: String::new(),
                attempts: 0,
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let rate_limiter =
            NonZeroU32::new(config.rate_limit()).map(|n| RateLimiter::direct(Quota::per_second(n)));

        Ok(Self {
            client,
            retry: RetryPolicy::from_config(config),
            rate_limiter,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn wait_for_quota(&self) {
        if let Some(limiter) = &self.rate_limiter {
            let clock = DefaultClock::default();
            while let Err(not_until) = limiter.check() {
                thread::sleep(not_until.wait_time_from(clock.now()));
            }
        }
    }

    fn fetch_once(&self, url: &str, attempt: u32) -> ScrapeResult<Vec<u8>> {
        self.wait_for_quota();

        let network = |e: reqwest::Error| ScrapeError::Network {
            url: url.to_string(),
            attempts: attempt,
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Remote {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(network)?;
        Ok(body.to_vec())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        info!("GET {}", url);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, attempt) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts() => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.retry.max_attempts(),
                        url,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
