use tracing::warn;

use crate::selection::capture::Capturer;
use crate::selection::geometry::{CaptureRegion, Point, Rect};
use crate::selection::menu::{ActionRequest, MenuAction};
use crate::selection::store::StoredSelection;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerState {
    Idle,
    Selecting { origin: Point, current: Point },
    /// `anchor` is absent when the menu was reopened from a stored capture.
    MenuOpen {
        anchor: Option<Point>,
        selection: StoredSelection,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// Pointer-up without a preceding pointer-down.
    Ignored,
    /// The drag did not exceed the size threshold.
    Click,
    Captured(StoredSelection),
    Failed,
}

/// Pointer gesture state machine for one viewer.
///
/// idle -> selecting -> idle (click or failed capture) | menu open -> idle.
/// A pointer-down in any state starts a fresh selection. Choosing an action is the only
/// way out of menu open other than a new pointer-down.
pub struct SelectionTracker {
    state: TrackerState,
    page: u32,
    device_pixel_ratio: f64,
}

impl SelectionTracker {
    pub fn new(page: u32, device_pixel_ratio: f64) -> Self {
        Self {
            state: TrackerState::Idle,
            page,
            device_pixel_ratio,
        }
    }

    /// Tracker with the menu open over an earlier capture, so a later request can choose
    /// an action for it.
    pub fn reopen(selection: StoredSelection) -> Self {
        Self {
            page: selection.page,
            device_pixel_ratio: 1.0,
            state: TrackerState::MenuOpen {
                anchor: None,
                selection,
            },
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.state = TrackerState::Selecting {
            origin: at,
            current: at,
        };
    }

    pub fn pointer_move(&mut self, to: Point) {
        if let TrackerState::Selecting { current, .. } = &mut self.state {
            *current = to;
        }
    }

    /// Rectangle of the drag in progress, if any.
    pub fn current_rect(&self) -> Option<Rect> {
        match self.state {
            TrackerState::Selecting { origin, current } => Some(Rect::from_corners(origin, current)),
            _ => None,
        }
    }

    pub async fn pointer_up(&mut self, capturer: &dyn Capturer) -> ReleaseOutcome {
        let Some(rect) = self.current_rect() else {
            return ReleaseOutcome::Ignored;
        };
        self.state = TrackerState::Idle;

        if !rect.is_selection() {
            return ReleaseOutcome::Click;
        }

        let region = CaptureRegion::new(rect, self.page, self.device_pixel_ratio);
        match capturer.capture(region).await {
            Ok(selection) => {
                self.state = TrackerState::MenuOpen {
                    anchor: Some(rect.menu_anchor()),
                    selection: selection.clone(),
                };
                ReleaseOutcome::Captured(selection)
            }
            Err(e) => {
                warn!("Error capturing selection: {e}");
                ReleaseOutcome::Failed
            }
        }
    }

    pub fn menu_anchor(&self) -> Option<Point> {
        match &self.state {
            TrackerState::MenuOpen { anchor, .. } => *anchor,
            _ => None,
        }
    }

    /// Closes the menu and returns the request the chosen action applies to.
    pub fn choose_action(&mut self, action: MenuAction) -> Option<ActionRequest> {
        match std::mem::replace(&mut self.state, TrackerState::Idle) {
            TrackerState::MenuOpen { selection, .. } => {
                Some(ActionRequest::for_selection(action, &selection))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use tokio::sync::broadcast;

    use super::*;
    use crate::selection::capture::{sample_png, to_data_url, CaptureService, SubmittedRaster};
    use crate::selection::menu::HighlightColor;
    use crate::selection::store::{CaptureStore, InMemoryCaptureStore};

    struct Harness {
        store: Arc<InMemoryCaptureStore>,
        events: broadcast::Receiver<crate::selection::capture::SelectionCreated>,
        service: CaptureService,
    }

    fn harness(image: Option<String>) -> Harness {
        let store = Arc::new(InMemoryCaptureStore::new());
        let (tx, events) = broadcast::channel(16);
        let service = CaptureService::new(
            "owner",
            Box::new(SubmittedRaster::new(image)),
            store.clone(),
            tx,
        );
        Harness {
            store,
            events,
            service,
        }
    }

    /// PNG data URL sized for the region a drag from `from` to `to` covers.
    fn image_for(from: Point, to: Point, dpr: f64) -> Option<String> {
        let (width, height) = CaptureRegion::new(Rect::from_corners(from, to), 1, dpr).pixel_size();
        Some(to_data_url(&sample_png(width, height)))
    }

    fn square_image() -> Option<String> {
        image_for(Point::new(0.0, 0.0), Point::new(50.0, 50.0), 1.0)
    }

    async fn drag(tracker: &mut SelectionTracker, h: &Harness, from: Point, to: Point) -> ReleaseOutcome {
        tracker.pointer_down(from);
        tracker.pointer_move(Point::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0));
        tracker.pointer_move(to);
        tracker.pointer_up(&h.service).await
    }

    #[tokio::test]
    async fn test_small_drag_is_a_click() {
        let h = harness(square_image());
        let mut tracker = SelectionTracker::new(1, 1.0);
        let outcome = drag(&mut tracker, &h, Point::new(5.0, 5.0), Point::new(12.0, 40.0)).await;
        assert_eq!(outcome, ReleaseOutcome::Click);
        assert_eq!(tracker.state(), &TrackerState::Idle);
        assert!(h.store.list("owner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_drag_captures_and_opens_menu() {
        let (from, to) = (Point::new(100.0, 80.0), Point::new(20.0, 20.0));
        let h = harness(image_for(from, to, 2.0));
        let mut tracker = SelectionTracker::new(3, 2.0);
        let outcome = drag(&mut tracker, &h, from, to).await;

        let ReleaseOutcome::Captured(selection) = outcome else {
            panic!("expected capture, got {outcome:?}");
        };
        assert_eq!(selection.page, 3);
        assert_eq!(tracker.menu_anchor(), Some(Point::new(60.0, 20.0)));
        assert_eq!(h.store.list("owner").await.unwrap(), vec![selection]);
    }

    #[tokio::test]
    async fn test_failed_capture_closes_silently() {
        let h = harness(None);
        let mut tracker = SelectionTracker::new(1, 1.0);
        let outcome = drag(&mut tracker, &h, Point::new(0.0, 0.0), Point::new(50.0, 50.0)).await;
        assert_eq!(outcome, ReleaseOutcome::Failed);
        assert_eq!(tracker.state(), &TrackerState::Idle);
    }

    #[tokio::test]
    async fn test_pointer_up_without_down_is_ignored() {
        let h = harness(square_image());
        let mut tracker = SelectionTracker::new(1, 1.0);
        tracker.pointer_move(Point::new(50.0, 50.0));
        assert_eq!(tracker.pointer_up(&h.service).await, ReleaseOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_pointer_down_while_menu_open_starts_new_selection() {
        let h = harness(square_image());
        let mut tracker = SelectionTracker::new(1, 1.0);
        drag(&mut tracker, &h, Point::new(0.0, 0.0), Point::new(50.0, 50.0)).await;
        assert!(tracker.menu_anchor().is_some());

        tracker.pointer_down(Point::new(7.0, 7.0));
        assert!(tracker.menu_anchor().is_none());
        assert!(matches!(tracker.state(), TrackerState::Selecting { .. }));
    }

    #[tokio::test]
    async fn test_any_action_closes_menu() {
        let h = harness(square_image());
        let mut tracker = SelectionTracker::new(4, 1.0);
        drag(&mut tracker, &h, Point::new(0.0, 0.0), Point::new(50.0, 50.0)).await;

        let request = tracker
            .choose_action(MenuAction::Highlight(HighlightColor::Green))
            .unwrap();
        assert_eq!(request.action, "highlight-green");
        assert_eq!(request.page, 4);
        assert!(request.image_data.is_some());
        assert_eq!(tracker.state(), &TrackerState::Idle);
        assert!(tracker.choose_action(MenuAction::Copy).is_none());
    }

    #[tokio::test]
    async fn test_wrongly_sized_image_fails_capture() {
        let h = harness(image_for(Point::new(0.0, 0.0), Point::new(20.0, 20.0), 1.0));
        let mut tracker = SelectionTracker::new(1, 1.0);
        let outcome = drag(&mut tracker, &h, Point::new(0.0, 0.0), Point::new(50.0, 50.0)).await;
        assert_eq!(outcome, ReleaseOutcome::Failed);
        assert!(h.store.list("owner").await.unwrap().is_empty());
    }

    #[test]
    fn test_reopened_menu_applies_action_to_stored_capture() {
        let stored = StoredSelection {
            image_data: "data:image/png;base64,AAAA".into(),
            timestamp: chrono::Utc::now(),
            page: 7,
        };
        let mut tracker = SelectionTracker::reopen(stored.clone());
        assert_eq!(tracker.menu_anchor(), None);

        let request = tracker.choose_action(MenuAction::Explain).unwrap();
        assert_eq!(request.action, "explain");
        assert_eq!(request.page, 7);
        assert_eq!(request.image_data, Some(stored.image_data));
        assert_eq!(tracker.state(), &TrackerState::Idle);
    }

    proptest! {
        #[test]
        fn prop_capture_happens_exactly_when_threshold_is_exceeded(
            x0 in -200.0f64..200.0, y0 in -200.0f64..200.0,
            x1 in -200.0f64..200.0, y1 in -200.0f64..200.0,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (stored, notified, outcome) = runtime.block_on(async {
                let (from, to) = (Point::new(x0, y0), Point::new(x1, y1));
                let mut h = harness(image_for(from, to, 1.0));
                let mut tracker = SelectionTracker::new(1, 1.0);
                let outcome = drag(&mut tracker, &h, from, to).await;
                let stored = h.store.list("owner").await.unwrap().len();
                let mut notified = 0;
                while h.events.try_recv().is_ok() {
                    notified += 1;
                }
                (stored, notified, outcome)
            });

            let big = (x1 - x0).abs() > 10.0 && (y1 - y0).abs() > 10.0;
            prop_assert_eq!(stored, usize::from(big));
            prop_assert_eq!(notified, usize::from(big));
            prop_assert_eq!(matches!(outcome, ReleaseOutcome::Captured(_)), big);
        }
    }
}
