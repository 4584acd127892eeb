use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for feed requests. Authentication is layered on by
/// wrapping one client in another (see [`super::auth::ApiKey`]).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
