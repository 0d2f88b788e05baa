//! The fixed action menu shown over a captured region.
//!
//! Actions are extension points: the default [`LoggingActionHandler`] only logs them, and
//! copy hands back a clipboard string.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::selection::store::StoredSelection;

pub const COPY_CLIPBOARD_TEXT: &str = "Selected PDF content copied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
    Pink,
    Orange,
    Purple,
}

impl HighlightColor {
    pub const ALL: [HighlightColor; 6] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Orange,
        HighlightColor::Purple,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
            HighlightColor::Orange => "orange",
            HighlightColor::Purple => "purple",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "#FFEB3B",
            HighlightColor::Green => "#4CAF50",
            HighlightColor::Blue => "#2196F3",
            HighlightColor::Pink => "#E91E63",
            HighlightColor::Orange => "#FF9800",
            HighlightColor::Purple => "#9C27B0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Highlight(HighlightColor),
    Explain,
    Summarize,
    Rewrite,
    Copy,
}

impl MenuAction {
    /// Parses the wire form: `explain`, `summarize`, `rewrite`, `copy`, `highlight-<color>`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "explain" => Some(MenuAction::Explain),
            "summarize" => Some(MenuAction::Summarize),
            "rewrite" => Some(MenuAction::Rewrite),
            "copy" => Some(MenuAction::Copy),
            other => {
                let color = other.strip_prefix("highlight-")?;
                HighlightColor::ALL
                    .into_iter()
                    .find(|c| c.name() == color)
                    .map(MenuAction::Highlight)
            }
        }
    }

    pub fn wire_name(self) -> String {
        match self {
            MenuAction::Highlight(color) => format!("highlight-{}", color.name()),
            MenuAction::Explain => "explain".to_string(),
            MenuAction::Summarize => "summarize".to_string(),
            MenuAction::Rewrite => "rewrite".to_string(),
            MenuAction::Copy => "copy".to_string(),
        }
    }

    /// Every entry of the menu, highlights first.
    pub fn all() -> Vec<MenuAction> {
        HighlightColor::ALL
            .into_iter()
            .map(MenuAction::Highlight)
            .chain([
                MenuAction::Explain,
                MenuAction::Summarize,
                MenuAction::Rewrite,
                MenuAction::Copy,
            ])
            .collect()
    }
}

/// The selection an action applies to, snapshotted when the menu closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action: String,
    pub image_data: Option<String>,
    pub page: u32,
    pub timestamp: String,
}

impl ActionRequest {
    pub fn for_selection(action: MenuAction, selection: &StoredSelection) -> Self {
        Self {
            action: action.wire_name(),
            image_data: Some(selection.image_data.clone()),
            page: selection.page,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    Logged,
    Copied { clipboard_text: String },
    Nothing,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn perform(&self, action: MenuAction, request: &ActionRequest) -> ActionOutcome;
}

pub struct LoggingActionHandler;

#[async_trait]
impl ActionHandler for LoggingActionHandler {
    async fn perform(&self, action: MenuAction, request: &ActionRequest) -> ActionOutcome {
        match action {
            MenuAction::Copy => match request.image_data {
                Some(_) => ActionOutcome::Copied {
                    clipboard_text: COPY_CLIPBOARD_TEXT.to_string(),
                },
                None => ActionOutcome::Nothing,
            },
            MenuAction::Highlight(color) => {
                info!(page = request.page, "Highlight with color: {}", color.name());
                ActionOutcome::Logged
            }
            MenuAction::Explain | MenuAction::Summarize | MenuAction::Rewrite => {
                info!(page = request.page, "{} selected region", request.action);
                ActionOutcome::Logged
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(image: Option<&str>) -> ActionRequest {
        ActionRequest {
            action: "copy".into(),
            image_data: image.map(String::from),
            page: 1,
            timestamp: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_menu_has_six_colors_and_four_other_actions() {
        let all = MenuAction::all();
        assert_eq!(all.len(), 10);
        assert_eq!(
            all.iter()
                .filter(|a| matches!(a, MenuAction::Highlight(_)))
                .count(),
            6
        );
    }

    #[test]
    fn test_parse_accepts_every_wire_name() {
        for action in MenuAction::all() {
            assert_eq!(MenuAction::parse(&action.wire_name()), Some(action));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_actions() {
        assert_eq!(MenuAction::parse("highlight-red"), None);
        assert_eq!(MenuAction::parse("translate"), None);
        assert_eq!(MenuAction::parse("highlight-"), None);
    }

    #[tokio::test]
    async fn test_copy_needs_an_image() {
        let handler = LoggingActionHandler;
        assert_eq!(
            handler.perform(MenuAction::Copy, &request(Some("data:image/png;base64,AA"))).await,
            ActionOutcome::Copied {
                clipboard_text: COPY_CLIPBOARD_TEXT.to_string()
            }
        );
        assert_eq!(
            handler.perform(MenuAction::Copy, &request(None)).await,
            ActionOutcome::Nothing
        );
    }

    #[tokio::test]
    async fn test_text_actions_are_logged_only() {
        let outcome = LoggingActionHandler
            .perform(MenuAction::Summarize, &request(Some("x")))
            .await;
        assert_eq!(outcome, ActionOutcome::Logged);
    }
}
