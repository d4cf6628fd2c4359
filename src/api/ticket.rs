use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::context::AppContext;
use crate::domain::ticket::{Ticket, TicketRequest};
use crate::error::{AppError, AppResult};

fn ticket_body(body: Result<Json<TicketRequest>, JsonRejection>) -> AppResult<TicketRequest> {
    body.map(|Json(request)| request)
        .map_err(|err| AppError::InvalidInput(format!("invalid JSON body: {err}")))
}

pub async fn create_ticket(
    State(ctx): State<AppContext>,
    body: Result<Json<TicketRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let request = ticket_body(body)?;
    let ticket = ctx.issue_tracker.create_ticket(request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(ctx): State<AppContext>,
    Path(ticket_id): Path<String>,
) -> AppResult<Json<Ticket>> {
    let ticket = ctx.issue_tracker.get_ticket(&ticket_id).await?;
    Ok(Json(ticket))
}

pub async fn update_ticket(
    State(ctx): State<AppContext>,
    Path(ticket_id): Path<String>,
    body: Result<Json<TicketRequest>, JsonRejection>,
) -> AppResult<Json<Ticket>> {
    let request = ticket_body(body)?;
    let ticket = ctx.issue_tracker.update_ticket(&ticket_id, request).await?;
    Ok(Json(ticket))
}
