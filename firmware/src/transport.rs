//! HTTPS GET over embassy-net with reqwless
//!
//! One connection per request, TLS without certificate verification. The
//! fetch owner is the only caller, so the TLS buffers are owned here.

use alloc::boxed::Box;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::TcpClient;
use log::{debug, warn};
use matrix_clock_core::fetch::{FetchError, Transport};
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::request::Method;

/// TLS buffer sizes
pub const TLS_READ_BUF_SIZE: usize = 16640;
pub const TLS_WRITE_BUF_SIZE: usize = 4096;

/// Sockets and buffers per connection
pub const TCP_SOCKETS: usize = 1;
pub const TCP_BUF_SIZE: usize = 4096;

pub type Tcp = TcpClient<'static, TCP_SOCKETS, TCP_BUF_SIZE, TCP_BUF_SIZE>;

pub struct HttpsTransport {
    tcp: &'static Tcp,
    dns: &'static DnsSocket<'static>,
    // Allocate TLS buffers on the heap to save stack
    tls_read_buf: Box<[u8; TLS_READ_BUF_SIZE]>,
    tls_write_buf: Box<[u8; TLS_WRITE_BUF_SIZE]>,
    seed: u64,
}

impl HttpsTransport {
    pub fn new(tcp: &'static Tcp, dns: &'static DnsSocket<'static>, seed: u64) -> Self {
        Self {
            tcp,
            dns,
            tls_read_buf: Box::new([0u8; TLS_READ_BUF_SIZE]),
            tls_write_buf: Box::new([0u8; TLS_WRITE_BUF_SIZE]),
            seed,
        }
    }
}

impl Transport for HttpsTransport {
    async fn get<'b>(&mut self, url: &str, buf: &'b mut [u8]) -> Result<&'b [u8], FetchError> {
        // Fresh seed per handshake
        self.seed = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let tls = TlsConfig::new(
            self.seed,
            &mut self.tls_read_buf[..],
            &mut self.tls_write_buf[..],
            TlsVerify::None,
        );
        let mut client = HttpClient::new_with_tls(self.tcp, self.dns, tls);

        let mut request = client.request(Method::GET, url).await.map_err(|e| {
            warn!("Connecting to {} failed: {:?}", url, e);
            FetchError::Transport
        })?;
        let response = request.send(buf).await.map_err(|e| {
            warn!("Request to {} failed: {:?}", url, e);
            FetchError::Transport
        })?;

        if !response.status.is_successful() {
            return Err(FetchError::Status(response.status.0));
        }

        let body = response.body().read_to_end().await.map_err(|e| match e {
            reqwless::Error::BufferTooSmall => FetchError::BufferTooSmall,
            e => {
                warn!("Reading body from {} failed: {:?}", url, e);
                FetchError::Transport
            }
        })?;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
