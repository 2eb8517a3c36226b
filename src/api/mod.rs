use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::ServeConfig;
use crate::core::{
    BuyerMode, DisplayQuote, Quote, QuoteInput, RateTables, RegionRate, compute,
    split_for_display,
};
use crate::lead::{CalculatedResults, LeadForm, SubmitError, WebhookClient};

const DEFAULT_PRICE: f64 = 200_000.0;
const DEFAULT_REGION: &str = "Madrid";
const DEFAULT_AGE: u32 = 30;

const SUBMIT_FAILED: &str = "Could not submit your details. Please try again later.";

pub struct AppState {
    pub tables: RateTables,
    pub webhook: Option<WebhookClient>,
}

impl AppState {
    pub fn from_config(config: &ServeConfig) -> Result<Self, SubmitError> {
        let webhook = config
            .webhook_url
            .as_deref()
            .map(|url| WebhookClient::new(url, config.webhook_timeout))
            .transpose()?;
        Ok(Self {
            tables: config.tables.clone(),
            webhook,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct QuotePayload {
    price: Option<f64>,
    #[serde(alias = "community")]
    region: Option<String>,
    age: Option<u32>,
    buying_with: Option<BuyerMode>,
}

#[derive(Debug)]
struct QuoteRequest {
    input: QuoteInput,
    mode: BuyerMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    buying_with: BuyerMode,
    quote: Quote,
    display: DisplayQuote,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionsResponse<'a> {
    regions: &'a [RegionRate],
    default_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadResponse {
    status: &'static str,
    calculated_results: CalculatedResults,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/regions", get(regions_handler))
        .route(
            "/api/quote",
            get(quote_get_handler).post(quote_post_handler),
        )
        .route("/api/leads", post(lead_post_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let submission = if state.webhook.is_some() {
        "enabled"
    } else {
        "disabled"
    };
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, lead_submission = submission, "down-payment API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Response {
    json_response(
        StatusCode::OK,
        RegionsResponse {
            regions: &state.tables.regions,
            default_rate: state.tables.default_transfer_tax,
        },
    )
}

async fn quote_get_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Query<QuotePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => quote_handler_impl(&state, payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn quote_post_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuotePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => quote_handler_impl(&state, payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

fn quote_handler_impl(state: &AppState, payload: QuotePayload) -> Response {
    let request = match quote_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };

    let response = build_quote_response(&state.tables, &request);
    debug!(
        region = %request.input.region,
        age = request.input.buyer_age,
        months = response.quote.chosen_term_months,
        fallback = response.quote.used_fallback,
        "quote computed"
    );
    json_response(StatusCode::OK, response)
}

async fn lead_post_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LeadForm>, JsonRejection>,
) -> Response {
    let Some(webhook) = state.webhook.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Lead submission is not configured",
        );
    };

    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };

    let payload = match form.prepare(&state.tables, Utc::now()) {
        Ok(payload) => payload,
        Err(e) => return bad_request(&e.to_string()),
    };

    match webhook.submit(&payload).await {
        Ok(()) => json_response(
            StatusCode::OK,
            LeadResponse {
                status: "received",
                calculated_results: payload.calculated_results,
            },
        ),
        Err(e) => {
            error!(error = %e, "lead submission failed");
            error_response(StatusCode::BAD_GATEWAY, SUBMIT_FAILED)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn bad_request(msg: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, msg)
}

#[cfg(test)]
fn quote_request_from_json(json: &str) -> Result<QuoteRequest, String> {
    let payload = serde_json::from_str::<QuotePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    quote_request_from_payload(payload)
}

fn quote_request_from_payload(payload: QuotePayload) -> Result<QuoteRequest, String> {
    let price = payload.price.unwrap_or(DEFAULT_PRICE);
    if !price.is_finite() || price <= 0.0 {
        return Err("price must be > 0".to_string());
    }

    Ok(QuoteRequest {
        input: QuoteInput::new(
            price,
            payload.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            payload.age.unwrap_or(DEFAULT_AGE),
        ),
        mode: payload.buying_with.unwrap_or_default(),
    })
}

fn build_quote_response(tables: &RateTables, request: &QuoteRequest) -> QuoteResponse {
    let quote = compute(tables, &request.input);
    QuoteResponse {
        buying_with: request.mode,
        quote,
        display: split_for_display(&quote, request.mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_request_defaults_to_wizard_values() {
        let request = quote_request_from_json("{}").expect("empty payload is valid");
        assert_eq!(request.input.price, DEFAULT_PRICE);
        assert_eq!(request.input.region, "Madrid");
        assert_eq!(request.input.buyer_age, 30);
        assert_eq!(request.mode, BuyerMode::Alone);
    }

    #[test]
    fn quote_request_parses_web_keys() {
        let json = r#"{
          "price": 350000,
          "community": "País Vasco",
          "age": 27,
          "buyingWith": "partner"
        }"#;
        let request = quote_request_from_json(json).expect("json should parse");
        assert_eq!(request.input.price, 350_000.0);
        assert_eq!(request.input.region, "País Vasco");
        assert_eq!(request.input.buyer_age, 27);
        assert_eq!(request.mode, BuyerMode::Partner);
    }

    #[test]
    fn quote_request_rejects_non_positive_price() {
        let err = quote_request_from_json(r#"{ "price": 0 }"#).expect_err("zero price");
        assert!(err.contains("price"));
        let err = quote_request_from_json(r#"{ "price": -5 }"#).expect_err("negative price");
        assert!(err.contains("price"));
    }

    #[test]
    fn quote_request_rejects_unknown_buyer_mode() {
        let err = quote_request_from_json(r#"{ "buyingWith": "trio" }"#).expect_err("bad mode");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn quote_response_serialization_contains_expected_fields() {
        let request = quote_request_from_json(r#"{ "buyingWith": "partner" }"#)
            .expect("json should parse");
        let response = build_quote_response(&RateTables::spanish(), &request);
        let value = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(value["buyingWith"], "partner");
        assert_eq!(value["quote"]["traditionalDownPayment"], 44_000);
        assert_eq!(value["quote"]["optimizedDownPayment"], 14_833);
        assert_eq!(value["quote"]["savings"], 29_167);
        assert_eq!(value["quote"]["monthlyRentEquivalent"], 833);
        assert_eq!(value["quote"]["chosenTermMonths"], 60);
        assert_eq!(value["quote"]["usedFallback"], false);
        assert_eq!(value["display"]["savings"], 14_583);
        assert_eq!(value["display"]["perPerson"], true);
    }
}
