pub mod api;
pub mod app_data;
pub mod cli;
pub mod config;
pub mod errors;
pub mod services;
pub mod stores;
pub mod types;

use poem::{Endpoint, EndpointExt, Route};
use poem_openapi::OpenApiService;

use crate::api::{AdminApi, AuthApi, HealthApi, SessionsApi};
use crate::app_data::AppData;

/// Assemble the HTTP route tree over the shared application state
///
/// Used by the server command and by integration tests, which drive it
/// through `poem::test::TestClient`.
pub fn build_route(data: AppData, base_url: &str) -> impl Endpoint {
    let api_service = OpenApiService::new(
        (
            AuthApi::new(data.clone()),
            SessionsApi::new(data.clone()),
            AdminApi::new(data.clone()),
            HealthApi,
        ),
        "admingate-backend",
        env!("CARGO_PKG_VERSION"),
    )
    .server(base_url.to_string());

    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/", api_service)
        .nest("/docs", ui)
        .with(poem::middleware::Tracing)
}
