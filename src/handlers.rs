// src/handlers.rs
use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use http::{header::SET_COOKIE, HeaderMap};
use tracing::debug;

use crate::error::PollError;
use crate::flash::{self, Flash};
use crate::id::is_poll_id;
use crate::identity::ClientIp;
use crate::models::{CreatePollForm, VoteForm};
use crate::services;
use crate::state::AppState;
use crate::views;

type HandlerResult = Result<Response, PollError>;

/// Location of a poll page, or the home page when the id cannot be a poll.
fn poll_path(poll_id: &str) -> String {
    if is_poll_id(poll_id) {
        format!("/poll/{poll_id}")
    } else {
        "/".to_string()
    }
}

fn page(html: String, consumed: Option<Flash>) -> Response {
    let mut response = Html(html).into_response();
    if consumed.is_some() {
        response
            .headers_mut()
            .append(SET_COOKIE, flash::clear_cookie());
    }
    response
}

fn redirect_with(to: &str, flash: Flash) -> Response {
    let mut response = Redirect::to(to).into_response();
    response.headers_mut().append(SET_COOKIE, flash.set_cookie());
    response
}

/// Turns a user-facing failure into a redirect carrying its message.
fn recover(e: PollError, to: &str) -> HandlerResult {
    match Flash::from_error(&e) {
        Some(flash) => Ok(redirect_with(to, flash)),
        None => Err(e),
    }
}

pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> HandlerResult {
    let polls = services::list_recent(&state.pool, state.recent_limit).await?;
    let flash = Flash::from_headers(&headers);

    Ok(page(views::home(&polls, flash.as_ref()), flash))
}

pub async fn create_form() -> Html<String> {
    Html(views::create_form(&CreatePollForm::default(), None))
}

pub async fn create_poll(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Form(form): Form<CreatePollForm>,
) -> HandlerResult {
    match services::create_poll(&state.pool, &form, &ip).await {
        Ok(poll) => Ok(redirect_with(
            &poll_path(&poll.id),
            Flash::PollCreated(poll.id),
        )),
        Err(e @ PollError::Validation { field }) => {
            debug!("Poll form from {ip} rejected, {field} is blank");
            Ok(Html(views::create_form(&form, Some(&e.to_string()))).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn view_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> HandlerResult {
    let view = match services::get_poll_view(&state.pool, &poll_id, &ip).await {
        Ok(view) => view,
        Err(e) => return recover(e, "/"),
    };

    let flash = Flash::from_headers(&headers);
    let is_creator = view.poll.creator_ip == ip;

    Ok(page(
        views::poll_page(&view, is_creator, flash.as_ref()),
        flash,
    ))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ClientIp(ip): ClientIp,
    Form(form): Form<VoteForm>,
) -> HandlerResult {
    let back = poll_path(&poll_id);

    match services::cast_vote(&state.pool, &poll_id, form.choice(), &ip).await {
        Ok(()) => Ok(redirect_with(&back, Flash::VoteSubmitted)),
        Err(PollError::PollNotFound) => recover(PollError::PollNotFound, "/"),
        Err(e) => recover(e, &back),
    }
}

pub async fn results(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> HandlerResult {
    let results = match services::compute_results(&state.pool, &poll_id).await {
        Ok(results) => results,
        Err(e) => return recover(e, "/"),
    };

    let flash = Flash::from_headers(&headers);
    let is_creator = results.poll.creator_ip == ip;

    Ok(page(
        views::results_page(&results, is_creator, flash.as_ref()),
        flash,
    ))
}

pub async fn close_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
    ClientIp(ip): ClientIp,
) -> HandlerResult {
    match services::close_poll(&state.pool, &poll_id, &ip).await {
        Ok(()) => Ok(redirect_with(
            &format!("{}/results", poll_path(&poll_id)),
            Flash::PollClosed,
        )),
        Err(PollError::PollNotFound) => recover(PollError::PollNotFound, "/"),
        Err(e) => recover(e, &poll_path(&poll_id)),
    }
}
