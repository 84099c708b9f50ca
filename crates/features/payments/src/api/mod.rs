//! Payment endpoints: developer accounts under `/api/v1/payments`, per-listing settings under
//! `/api/v1/apps/{key}/payments`.

mod accounts;
mod apps;

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use mkt_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(accounts::list_accounts, accounts::create_account))
        .routes(routes!(accounts::retrieve_account, accounts::update_account, accounts::cancel_account))
        .routes(routes!(accounts::retrieve_terms, accounts::update_terms))
        .routes(routes!(accounts::retrieve_in_app_key, accounts::create_in_app_key))
        .routes(routes!(accounts::in_app_key_secret))
        .routes(routes!(apps::retrieve_monetization, apps::update_monetization))
        .routes(routes!(apps::retrieve_in_app_config, apps::reset_in_app_config))
        .routes(routes!(apps::in_app_config_secret))
        .routes(routes!(apps::portal))
}

/// Renders a secret as `text/plain`.
fn plain_text(secret: String) -> Response {
    ([(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))], secret).into_response()
}
