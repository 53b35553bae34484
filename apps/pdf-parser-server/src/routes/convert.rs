//! Conversion endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::convert::{decode_pdf_base64, normalize, ConversionOptions, ConvertRequest, ConvertResponse};
use crate::error::{Result, ServiceError};
use crate::state::AppState;

/// `POST /v1/convert`
///
/// Validation happens before any conversion work: bad base64, an unknown
/// `output_format` or malformed languages answer 400 without touching the
/// extractor.
pub async fn convert(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("convert", %request_id);

    async move {
        let Json(request) = payload.map_err(|rejection| {
            ServiceError::InvalidInput(format!("invalid request body: {}", rejection.body_text()))
        })?;

        let pdf = decode_pdf_base64(&request.pdf_base64)?;
        let options = ConversionOptions::build(&request, &state.config().conversion.default_languages)?;

        tracing::info!(
            pdf_bytes = pdf.len(),
            format = %options.output_format,
            force_ocr = options.force_ocr,
            paginate = options.paginate_output,
            languages = ?options.languages,
            "Conversion requested"
        );

        let executor = state.executor();
        let result = executor.execute(pdf, options, executor.deadline()).await?;

        Ok(Json(normalize(result)))
    }
    .instrument(span)
    .await
}
