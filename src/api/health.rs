use poem_openapi::payload::PlainText;
use poem_openapi::OpenApi;

/// Liveness probe
pub struct HealthApi;

#[OpenApi]
impl HealthApi {
    #[oai(path = "/health", method = "get")]
    async fn health(&self) -> PlainText<&'static str> {
        PlainText("ok")
    }
}
