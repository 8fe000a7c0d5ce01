use super::client::HttpClient;
use reqwest::blocking::{Client, Request, Response};

/// Plain blocking client with reqwest's default timeouts.
pub struct BasicClient(Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for BasicClient {
    fn execute(&self, req: Request) -> reqwest::Result<Response> {
        self.0.execute(req)
    }
}
