//! Settings API endpoints - JSON API

use axum::extract::State;
use axum::Json;
use feedesk_config::Config;

use crate::AppState;

/// Web app URL with everything between the host and the last 4 characters hidden
pub fn masked_endpoint(endpoint: &str) -> String {
    let Some(scheme_end) = endpoint.find("://") else {
        return endpoint.to_string();
    };
    let host_end = endpoint[scheme_end + 3..]
        .find('/')
        .map(|i| scheme_end + 3 + i)
        .unwrap_or(endpoint.len());
    let chars: Vec<char> = endpoint[host_end..].chars().collect();
    if chars.len() <= 8 {
        return endpoint.to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}/…{}", &endpoint[..host_end], tail)
}

/// Loaded configuration with the endpoint masked (JSON API)
pub async fn api_settings(State(state): State<AppState>) -> Json<Config> {
    let mut config = state.config.clone();
    config.gateway.endpoint = masked_endpoint(&config.gateway.endpoint);
    Json(config)
}
