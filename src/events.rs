use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Extension, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::{models::{CurrentUser, UserId}, AppState};

pub const CART_UPDATED: &str = "cartUpdated";
pub const ORDERS_UPDATED: &str = "ordersUpdated";

/// Change notification for one user's other open clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    pub user_id: UserId,
    pub name: &'static str,
}

pub fn notify(state: &AppState, user_id: &UserId, names: &[&'static str]) {
    for &name in names {
        // no subscribers is fine
        let _ = state.events_tx.send(UserEvent {
            user_id: user_id.clone(),
            name,
        });
    }
}

pub async fn sse_events(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let stream = futures_util::stream::unfold((rx, u.id), |(mut rx, me)| async move {
        let evt = loop {
            match rx.recv().await {
                Ok(ev) if ev.user_id == me => break Event::default().event(ev.name).data("1"),
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => break Event::default().event("ping").data("lagged"),
                Err(RecvError::Closed) => return None,
            }
        };

        Some((Ok(evt), (rx, me)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(20))
            .text("keep-alive"),
    )
}
