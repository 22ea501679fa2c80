//! Template analysis and rendering endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::TemplateMetrics;
use crate::template::{
    analyze, render, sample_bindings, Bindings, RenderedMessage, ThreadChoice,
    DEFAULT_PREVIEW_COUNT,
};

/// Upper bound on previews generated per request
const MAX_PREVIEW_COUNT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct AnalyzeTemplateRequest {
    pub template: String,
    /// Bindings used for the previews; defaults to a sample name
    #[serde(default)]
    pub sample: Option<Bindings>,
    #[serde(default)]
    pub preview_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct IssueView {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeTemplateResponse {
    pub valid: bool,
    pub issues: Vec<IssueView>,
    pub variables: Vec<String>,
    /// Serialized as a string: the count can exceed JSON's safe integer range
    pub variations: String,
    pub previews: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenderTemplateRequest {
    pub template: String,
    #[serde(default)]
    pub bindings: Bindings,
}

/// POST /api/v1/templates/analyze - Lint, count and preview a template
#[tracing::instrument(
    name = "http.analyze_template",
    skip(request),
    fields(template_len = request.template.len())
)]
pub async fn analyze_template(
    Json(request): Json<AnalyzeTemplateRequest>,
) -> Result<Json<AnalyzeTemplateResponse>> {
    let sample = request.sample.unwrap_or_else(sample_bindings);
    let count = request
        .preview_count
        .unwrap_or(DEFAULT_PREVIEW_COUNT)
        .min(MAX_PREVIEW_COUNT);

    let analysis = analyze(&request.template, &sample, count, &mut ThreadChoice);
    TemplateMetrics::record_analyzed();

    Ok(Json(AnalyzeTemplateResponse {
        valid: analysis.is_valid(),
        issues: analysis
            .issues
            .iter()
            .map(|issue| IssueView {
                code: issue.code(),
                message: issue.to_string(),
            })
            .collect(),
        variables: analysis.variables,
        variations: analysis.variations.to_string(),
        previews: analysis.previews,
    }))
}

/// POST /api/v1/templates/render - Render once with explicit bindings
#[tracing::instrument(
    name = "http.render_template",
    skip(request),
    fields(template_len = request.template.len(), bindings = request.bindings.len())
)]
pub async fn render_template(
    Json(request): Json<RenderTemplateRequest>,
) -> Result<Json<RenderedMessage>> {
    let rendered = render(&request.template, &request.bindings, &mut ThreadChoice);
    TemplateMetrics::record_rendered();

    Ok(Json(rendered))
}
