//! Single-owner fetching of remote samples
//!
//! Both workers need remote data, but only one request may be in flight at a
//! time. The [`FetchBroker`] serializes them: workers post an [`Endpoint`]
//! request and await the parsed reply, while exactly one task runs
//! [`FetchBroker::serve`] with the network [`Transport`].
//!
//! Replies are per-endpoint immutable values, so a time fetch can never be
//! observed by the carousel or vice versa.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, warn};
use thiserror::Error;

use crate::config::ClockConfig;
use crate::sample::{self, MessageText, TimeSample};

/// Size of the response body buffer the fetch owner needs
pub const BODY_BUF_SIZE: usize = 2048;

/// Why a fetch produced no sample
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport failure")]
    Transport,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("body is not UTF-8")]
    Utf8,
    #[error("malformed JSON")]
    Json,
    #[error("field out of range")]
    OutOfRange,
    #[error("response larger than body buffer")]
    BufferTooSmall,
}

/// Remote document to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Time,
    Text,
}

impl Endpoint {
    pub fn url(self, config: &ClockConfig) -> &'static str {
        match self {
            Endpoint::Time => config.time_url,
            Endpoint::Text => config.text_url,
        }
    }
}

/// HTTP GET of a whole body into a caller-provided buffer
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get<'b>(&mut self, url: &str, buf: &'b mut [u8]) -> Result<&'b [u8], FetchError>;
}

/// What the workers see: a fetch that completes with a parsed value
#[allow(async_fn_in_trait)]
pub trait SampleSource {
    async fn fetch_time(&self) -> Result<TimeSample, FetchError>;
    async fn fetch_message(&self) -> Result<MessageText, FetchError>;
}

/// Request queue plus one reply slot per endpoint
pub struct FetchBroker<M: RawMutex> {
    requests: Channel<M, Endpoint, 2>,
    time_reply: Signal<M, Result<TimeSample, FetchError>>,
    text_reply: Signal<M, Result<MessageText, FetchError>>,
}

impl<M: RawMutex> FetchBroker<M> {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            time_reply: Signal::new(),
            text_reply: Signal::new(),
        }
    }

    /// Run the fetch owner forever
    pub async fn serve<T: Transport>(&self, config: &ClockConfig, transport: &mut T, body_buf: &mut [u8]) -> ! {
        loop {
            self.serve_one(config, transport, body_buf).await;
        }
    }

    /// Answer exactly one pending request
    pub async fn serve_one<T: Transport>(&self, config: &ClockConfig, transport: &mut T, body_buf: &mut [u8]) {
        let endpoint = self.requests.receive().await;
        let url = endpoint.url(config);
        debug!("Fetching {:?} from {}", endpoint, url);

        let body = transport
            .get(url, body_buf)
            .await
            .and_then(|bytes| core::str::from_utf8(bytes).map_err(|_| FetchError::Utf8));

        match endpoint {
            Endpoint::Time => {
                let reply = body.and_then(sample::parse_time_sample);
                if let Err(e) = &reply {
                    warn!("Time fetch failed: {}", e);
                }
                self.time_reply.signal(reply);
            }
            Endpoint::Text => {
                let reply = body.and_then(sample::parse_message);
                if let Err(e) = &reply {
                    warn!("Text fetch failed: {}", e);
                }
                self.text_reply.signal(reply);
            }
        }
    }
}

impl<M: RawMutex> Default for FetchBroker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SampleSource for FetchBroker<M> {
    async fn fetch_time(&self) -> Result<TimeSample, FetchError> {
        self.time_reply.reset();
        self.requests.send(Endpoint::Time).await;
        self.time_reply.wait().await
    }

    async fn fetch_message(&self) -> Result<MessageText, FetchError> {
        self.text_reply.reset();
        self.requests.send(Endpoint::Text).await;
        self.text_reply.wait().await
    }
}
