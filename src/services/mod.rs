pub mod spotify;
pub mod token;

pub use spotify::SpotifyClient;
pub use token::{token_source, TokenSource};

use crate::config::Config;
use reqwest::Client;

/// Shared outbound client; connection pool is reused across token and search calls.
pub fn http_client(config: &Config) -> reqwest::Result<Client> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(timeout) = config.http_timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
