use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{
    future,
    stream::{self, Stream, StreamExt},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::auth::identity::SessionUser;
use crate::errors::AppError;
use crate::selection::capture::{CaptureService, SelectionCreated, SubmittedRaster};
use crate::selection::geometry::Point;
use crate::selection::menu::{ActionOutcome, HighlightColor, MenuAction};
use crate::selection::store::StoredSelection;
use crate::selection::tracker::{ReleaseOutcome, SelectionTracker};
use crate::selection::SELECTION_EVENT;
use crate::state::AppState;

fn first_page() -> u32 {
    1
}

fn unit_ratio() -> f64 {
    1.0
}

/// A complete pointer gesture over one page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureRequest {
    pub start: Point,
    #[serde(default)]
    pub moves: Vec<Point>,
    pub end: Point,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "unit_ratio")]
    pub device_pixel_ratio: f64,
    /// PNG data URL the viewer rendered for the selected region.
    #[serde(default)]
    pub image_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub captured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<StoredSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<Point>,
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub action: String,
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub closed: bool,
    pub outcome: ActionOutcome,
}

/// POST /api/selections
///
/// Replays the gesture through the tracker. Clicks and failed captures answer
/// `{captured: false}`.
pub async fn handle_capture(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Json(gesture): Json<GestureRequest>,
) -> Json<CaptureResponse> {
    let capturer = CaptureService::new(
        claims.user_id.to_string(),
        Box::new(SubmittedRaster::new(gesture.image_data)),
        state.selections.clone(),
        state.events.clone(),
    );

    let mut tracker = SelectionTracker::new(gesture.page, gesture.device_pixel_ratio);
    tracker.pointer_down(gesture.start);
    for point in gesture.moves {
        tracker.pointer_move(point);
    }
    tracker.pointer_move(gesture.end);

    let response = match tracker.pointer_up(&capturer).await {
        ReleaseOutcome::Captured(selection) => CaptureResponse {
            captured: true,
            selection: Some(selection),
            menu: tracker.menu_anchor(),
        },
        ReleaseOutcome::Click | ReleaseOutcome::Failed | ReleaseOutcome::Ignored => {
            CaptureResponse {
                captured: false,
                selection: None,
                menu: None,
            }
        }
    };
    Json(response)
}

/// GET /api/selections
pub async fn handle_list(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Result<Json<Vec<StoredSelection>>, AppError> {
    let owner = claims.user_id.to_string();
    Ok(Json(state.selections.list(&owner).await?))
}

/// GET /api/selections/recent
pub async fn handle_recent(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Result<Json<StoredSelection>, AppError> {
    let owner = claims.user_id.to_string();
    state
        .selections
        .recent(&owner)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No selection captured yet".to_string()))
}

/// GET /api/selections/menu
pub async fn handle_menu(SessionUser(_): SessionUser) -> Json<Value> {
    let colors: Vec<Value> = HighlightColor::ALL
        .into_iter()
        .map(|c| json!({ "name": c.name(), "hex": c.hex(), "action": MenuAction::Highlight(c).wire_name() }))
        .collect();
    let actions: Vec<String> = MenuAction::all()
        .into_iter()
        .filter(|a| !matches!(a, MenuAction::Highlight(_)))
        .map(MenuAction::wire_name)
        .collect();
    Json(json!({ "colors": colors, "actions": actions }))
}

/// POST /api/selections/actions
///
/// Reopens the menu over the caller's most recent capture and applies the chosen action.
/// The menu always closes. Without a capture there is nothing to act on.
pub async fn handle_action(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Json(body): Json<ActionBody>,
) -> Result<Json<ActionResponse>, AppError> {
    let action = MenuAction::parse(&body.action)
        .ok_or_else(|| AppError::Validation(format!("Unknown action: {}", body.action)))?;

    let selection = state
        .selections
        .recent(&claims.user_id.to_string())
        .await?
        .ok_or_else(|| AppError::NotFound("No selection captured yet".to_string()))?;
    if let Some(page) = body.page.filter(|p| *p != selection.page) {
        debug!("Action sent from page {page} applies to capture on page {}", selection.page);
    }

    let mut tracker = SelectionTracker::reopen(selection);
    let request = tracker
        .choose_action(action)
        .ok_or_else(|| AppError::Conflict("Selection menu is not open".to_string()))?;

    let outcome = state.actions.perform(action, &request).await;
    Ok(Json(ActionResponse {
        closed: true,
        outcome,
    }))
}

/// Capture notifications addressed to `owner`. Ends when every sender is gone.
pub fn owner_events(
    receiver: broadcast::Receiver<SelectionCreated>,
    owner: String,
) -> impl Stream<Item = SelectionCreated> {
    stream::unfold(receiver, move |mut receiver| {
        let owner = owner.clone();
        async move {
            loop {
                match receiver.recv().await {
                    Ok(created) if created.owner == owner => return Some((created, receiver)),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Selection event stream lagged by {skipped} events");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    })
}

fn to_sse_event(created: &SelectionCreated) -> Option<Event> {
    Event::default()
        .event(SELECTION_EVENT)
        .json_data(created)
        .map_err(|e| warn!("Dropping unserializable selection event: {e}"))
        .ok()
}

/// GET /api/selections/events
///
/// Streams this caller's `pdf-selection-created` notifications.
pub async fn handle_events(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = owner_events(state.events.subscribe(), claims.user_id.to_string())
        .filter_map(|created| future::ready(to_sse_event(&created).map(Ok::<_, Infallible>)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::selection::capture::{sample_png, to_data_url, Capturer};
    use crate::selection::geometry::{CaptureRegion, Rect};
    use crate::selection::store::InMemoryCaptureStore;

    async fn capture_for(
        owner: &str,
        page: u32,
        store: &Arc<InMemoryCaptureStore>,
        events: &broadcast::Sender<SelectionCreated>,
    ) -> StoredSelection {
        let region = CaptureRegion::new(
            Rect::from_corners(Point::new(0.0, 0.0), Point::new(30.0, 20.0)),
            page,
            1.0,
        );
        let (width, height) = region.pixel_size();
        let raster = SubmittedRaster::new(Some(to_data_url(&sample_png(width, height))));
        CaptureService::new(owner, Box::new(raster), store.clone(), events.clone())
            .capture(region)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_each_stream_sees_only_its_owner() {
        let store = Arc::new(InMemoryCaptureStore::new());
        let (events, _) = broadcast::channel(16);
        let alice = Box::pin(owner_events(events.subscribe(), "alice".to_string()));
        let mut bob = Box::pin(owner_events(events.subscribe(), "bob".to_string()));

        let first = capture_for("alice", 1, &store, &events).await;
        let second = capture_for("bob", 2, &store, &events).await;
        let third = capture_for("alice", 3, &store, &events).await;
        drop(events);

        let seen: Vec<SelectionCreated> = alice.collect().await;
        assert_eq!(
            seen.iter().map(|e| e.selection.clone()).collect::<Vec<_>>(),
            vec![first, third]
        );
        assert!(seen.iter().all(|e| e.owner == "alice"));

        let created = bob.next().await.unwrap();
        assert_eq!(created.owner, "bob");
        assert_eq!(created.selection, second);
        assert!(bob.next().await.is_none());
    }

    #[tokio::test]
    async fn test_events_are_named_and_serialized() {
        let store = Arc::new(InMemoryCaptureStore::new());
        let (events, _) = broadcast::channel(4);
        let mut stream = Box::pin(owner_events(events.subscribe(), "alice".to_string()));
        let selection = capture_for("alice", 4, &store, &events).await;

        let created = stream.next().await.unwrap();
        assert!(to_sse_event(&created).is_some());
        let wire = serde_json::to_value(&created).unwrap();
        assert_eq!(wire["page"], 4);
        assert_eq!(wire["imageData"], selection.image_data);
        assert_eq!(SELECTION_EVENT, "pdf-selection-created");
    }
}
