//! Recipient list parsing endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::recipient::{parse_csv, parse_manual, Recipient};

#[derive(Debug, Deserialize)]
pub struct ParseRecipientsRequest {
    /// Raw CSV text or newline-separated numbers
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct RecipientListResponse {
    pub recipients: Vec<Recipient>,
    pub total: usize,
}

impl From<Vec<Recipient>> for RecipientListResponse {
    fn from(recipients: Vec<Recipient>) -> Self {
        let total = recipients.len();
        Self { recipients, total }
    }
}

/// POST /api/v1/recipients/csv - Parse a `nama,nomor` CSV list
#[tracing::instrument(name = "http.parse_csv", skip_all, fields(content_len = request.content.len()))]
pub async fn parse_csv_recipients(
    Json(request): Json<ParseRecipientsRequest>,
) -> Result<Json<RecipientListResponse>> {
    let recipients = parse_csv(&request.content)?;
    Ok(Json(recipients.into()))
}

/// POST /api/v1/recipients/manual - Parse one number per line
#[tracing::instrument(name = "http.parse_manual", skip_all, fields(content_len = request.content.len()))]
pub async fn parse_manual_recipients(
    Json(request): Json<ParseRecipientsRequest>,
) -> Result<Json<RecipientListResponse>> {
    let recipients = parse_manual(&request.content)?;
    Ok(Json(recipients.into()))
}
