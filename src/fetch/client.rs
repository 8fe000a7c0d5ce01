use reqwest::blocking::{Request, Response};

/// Minimal blocking HTTP seam so callers can wrap or swap the transport.
pub trait HttpClient {
    fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
