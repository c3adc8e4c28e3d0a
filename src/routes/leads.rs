//! Lead capture route handlers

use crate::error::ApiResult;
use crate::leads;
use crate::models::{
    Consultation, ConsultationForm, Inquiry, InquiryForm, SuccessResponse, Valuation,
    ValuationForm,
};
use crate::state::SharedState;
use axum::{extract::State, http::StatusCode, Json};

type Created<T> = ApiResult<(StatusCode, Json<SuccessResponse<T>>)>;

/// POST /api/inquiries
pub async fn submit_inquiry(
    State(state): State<SharedState>,
    Json(form): Json<InquiryForm>,
) -> Created<Inquiry> {
    let inquiry = leads::submit_inquiry(state.store.as_ref(), state.mailer.as_ref(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Inquiry submitted successfully!", inquiry)),
    ))
}

/// POST /api/valuations
pub async fn submit_valuation(
    State(state): State<SharedState>,
    Json(form): Json<ValuationForm>,
) -> Created<Valuation> {
    let valuation =
        leads::submit_valuation(state.store.as_ref(), state.mailer.as_ref(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Valuation request submitted successfully!",
            valuation,
        )),
    ))
}

/// POST /api/consultations
pub async fn submit_consultation(
    State(state): State<SharedState>,
    Json(form): Json<ConsultationForm>,
) -> Created<Consultation> {
    let consultation =
        leads::submit_consultation(state.store.as_ref(), state.mailer.as_ref(), form).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Consultation request submitted successfully!",
            consultation,
        )),
    ))
}
