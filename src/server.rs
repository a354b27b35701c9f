// An HTTP front for a `LocalOracle`, so the attack can be run against a
// network service.
//
//   GET /check?iv=<hex>&ciphertext=<hex>
//
// 200: padding is valid, 403: padding is invalid, 400: malformed request.
use crate::{Block, LocalOracle, AES_BLOCK_SIZE};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

use std::{collections::HashMap, sync::Arc};

pub fn router(oracle: LocalOracle) -> Router {
    Router::new()
        .route("/check", get(check_padding))
        .with_state(Arc::new(oracle))
}

/// Bind `address` and serve the oracle in the background. Returns the base
/// URL of the server.
pub async fn spawn_oracle_server(
    address: impl ToSocketAddrs,
    oracle: LocalOracle,
) -> std::io::Result<String> {
    let listener = TcpListener::bind(address).await?;
    let addr = listener.local_addr()?;
    let app = router(oracle);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "padding oracle server stopped");
        }
    });
    info!(%addr, "padding oracle listening");
    Ok(format!("http://{}", addr))
}

/// Bind `address` and serve the oracle until the server fails.
pub async fn serve(address: impl ToSocketAddrs, oracle: LocalOracle) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!(addr = %listener.local_addr()?, "padding oracle listening");
    axum::serve(listener, router(oracle)).await
}

async fn check_padding(
    State(oracle): State<Arc<LocalOracle>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let iv = match hex_param(&params, "iv") {
        Ok(bytes) => match Block::<AES_BLOCK_SIZE>::try_from(bytes) {
            Ok(iv) => iv,
            Err(bytes) => {
                return (
                    StatusCode::BAD_REQUEST,
                    format!("'iv' must be {AES_BLOCK_SIZE} bytes, got {}", bytes.len()),
                )
                    .into_response();
            }
        },
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };
    let ciphertext = match hex_param(&params, "ciphertext") {
        Ok(bytes) => bytes,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    // A configured delay sleeps, so keep it off the async workers.
    let verdict =
        tokio::task::spawn_blocking(move || oracle.ciphertext_padding_valid(&iv, &ciphertext))
            .await;
    match verdict {
        Ok(true) => (StatusCode::OK, "valid padding").into_response(),
        Ok(false) => (StatusCode::FORBIDDEN, "invalid padding").into_response(),
        Err(e) => {
            error!(error = %e, "padding check panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn hex_param(params: &HashMap<String, String>, name: &str) -> Result<Vec<u8>, String> {
    let value = params
        .get(name)
        .ok_or_else(|| format!("Missing '{name}' parameter"))?;
    hex::decode(value).map_err(|e| format!("Illegal '{name}': {e}"))
}
