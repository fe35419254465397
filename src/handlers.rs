// handlers.rs
use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::Stream;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{FilterParam, ListPollsQuery, Me, NewPoll, PollFilter, ProfileRequest, VoteRequest};
use crate::session::Session;
use crate::AppState;

/// List polls, newest first, as the session user sees them
pub async fn list_polls(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListPollsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = match query.filter {
        FilterParam::All => PollFilter::All,
        FilterParam::Mine => PollFilter::CreatedBy(session.user_id),
    };

    let polls = state.polls.list_polls(session.user_id, filter).await?;
    Ok(Json(polls))
}

pub async fn create_poll(
    State(state): State<AppState>,
    session: Session,
    Json(new_poll): Json<NewPoll>,
) -> AppResult<impl IntoResponse> {
    let poll = state.polls.create_poll(&session, new_poll).await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

/// Delete a poll (creator only)
pub async fn delete_poll(
    State(state): State<AppState>,
    session: Session,
    Path(poll_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.polls.delete_poll(&session, poll_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Vote for an option
pub async fn vote(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<VoteRequest>,
) -> AppResult<impl IntoResponse> {
    let vote = state.polls.cast_vote(&session, request.option_id).await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

pub async fn me(State(state): State<AppState>, session: Session) -> AppResult<impl IntoResponse> {
    let profile = state.polls.profile(session.user_id).await?;
    Ok(Json(Me {
        user_id: session.user_id,
        email: session.email,
        profile,
    }))
}

pub async fn create_profile(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<ProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = state.polls.create_profile(&session, &request.username).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<ProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let profile = state.polls.update_profile(&session, &request.username).await?;
    Ok(Json(profile))
}

/// Change notifications; clients re-fetch `/api/polls` on every event
pub async fn changes(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(state.polls.feed().events()).keep_alive(KeepAlive::default())
}

pub async fn health() -> &'static str {
    "ok"
}
