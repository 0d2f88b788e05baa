//! Capture pipeline: rasterize the region, encode it as a PNG data URL, persist it for the
//! owner, then notify listeners.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::selection::geometry::CaptureRegion;
use crate::selection::store::{CaptureStore, StoredSelection};
use crate::selection::SelectionError;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const PIXEL_TOLERANCE: u32 = 1;

/// Produces PNG bytes for a region of the rendered page.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, region: &CaptureRegion) -> Result<Vec<u8>, SelectionError>;
}

/// Anything that can turn a finished selection into a stored capture.
#[async_trait]
pub trait Capturer: Send + Sync {
    async fn capture(&self, region: CaptureRegion) -> Result<StoredSelection, SelectionError>;
}

/// Payload of a [`crate::selection::SELECTION_EVENT`] notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCreated {
    #[serde(skip)]
    pub owner: String,
    #[serde(flatten)]
    pub selection: StoredSelection,
}

pub fn to_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png))
}

/// Decodes a PNG data URL and checks it carries a PNG with a non-empty header.
pub fn decode_png_data_url(data_url: &str) -> Result<Vec<u8>, SelectionError> {
    let encoded = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| SelectionError::Raster("image is not a PNG data URL".to_string()))?;
    let png = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SelectionError::Raster(format!("invalid base64: {e}")))?;
    png_dimensions(&png)?;
    Ok(png)
}

/// Width and height from the IHDR chunk.
fn png_dimensions(png: &[u8]) -> Result<(u32, u32), SelectionError> {
    if png.len() < 24 || png[..8] != PNG_SIGNATURE || &png[12..16] != b"IHDR" {
        return Err(SelectionError::Raster("not a PNG image".to_string()));
    }
    let width = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let height = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    if width == 0 || height == 0 {
        return Err(SelectionError::Raster("PNG has no pixels".to_string()));
    }
    Ok((width, height))
}

/// Rounding on the client may differ from ours by a pixel.
fn fits_region(actual: (u32, u32), expected: (u32, u32)) -> bool {
    actual.0.abs_diff(expected.0) <= PIXEL_TOLERANCE
        && actual.1.abs_diff(expected.1) <= PIXEL_TOLERANCE
}

/// Server-side rasterizer for a page the browser rendered: the client submits the PNG it
/// drew for the region and this checks it is a PNG of the region's pixel size.
pub struct SubmittedRaster {
    data_url: Option<String>,
}

impl SubmittedRaster {
    pub fn new(data_url: Option<String>) -> Self {
        Self { data_url }
    }
}

#[async_trait]
impl Rasterizer for SubmittedRaster {
    async fn rasterize(&self, region: &CaptureRegion) -> Result<Vec<u8>, SelectionError> {
        let data_url = self
            .data_url
            .as_deref()
            .ok_or_else(|| SelectionError::Raster("no image submitted for region".to_string()))?;
        let png = decode_png_data_url(data_url)?;
        let actual = png_dimensions(&png)?;
        let expected = region.pixel_size();
        if !fits_region(actual, expected) {
            return Err(SelectionError::Raster(format!(
                "image is {}x{} but the region needs {}x{}",
                actual.0, actual.1, expected.0, expected.1
            )));
        }
        debug!(
            "Accepted {} byte PNG for page {} at scale {}",
            png.len(),
            region.page,
            region.scale
        );
        Ok(png)
    }
}

pub struct CaptureService {
    owner: String,
    rasterizer: Box<dyn Rasterizer>,
    store: Arc<dyn CaptureStore>,
    events: broadcast::Sender<SelectionCreated>,
}

impl CaptureService {
    pub fn new(
        owner: impl Into<String>,
        rasterizer: Box<dyn Rasterizer>,
        store: Arc<dyn CaptureStore>,
        events: broadcast::Sender<SelectionCreated>,
    ) -> Self {
        Self {
            owner: owner.into(),
            rasterizer,
            store,
            events,
        }
    }
}

#[async_trait]
impl Capturer for CaptureService {
    async fn capture(&self, region: CaptureRegion) -> Result<StoredSelection, SelectionError> {
        let png = self.rasterizer.rasterize(&region).await?;
        let selection = StoredSelection {
            image_data: to_data_url(&png),
            timestamp: Utc::now(),
            page: region.page,
        };

        self.store.append(&self.owner, &selection).await?;

        let event = SelectionCreated {
            owner: self.owner.clone(),
            selection: selection.clone(),
        };
        if self.events.send(event).is_err() {
            debug!("No listeners for selection events");
        }

        info!("Captured selection on page {} for {}", selection.page, self.owner);
        Ok(selection)
    }
}

/// Minimal PNG header (signature + IHDR) for a `width` x `height` image.
#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut png = PNG_SIGNATURE.to_vec();
    png.extend_from_slice(&13u32.to_be_bytes());
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&width.to_be_bytes());
    png.extend_from_slice(&height.to_be_bytes());
    png.extend_from_slice(&[8, 6, 0, 0, 0]);
    png.extend_from_slice(&[0, 0, 0, 0]);
    png
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::geometry::{Point, Rect};
    use crate::selection::store::InMemoryCaptureStore;

    fn region() -> CaptureRegion {
        let rect = Rect::from_corners(Point::new(0.0, 0.0), Point::new(40.0, 30.0));
        CaptureRegion::new(rect, 2, 1.0)
    }

    #[test]
    fn test_data_url_decodes_back_to_png() {
        let png = sample_png(80, 60);
        let url = to_data_url(&png);
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_png_data_url(&url).unwrap(), png);
    }

    #[test]
    fn test_rejects_non_png_payloads() {
        assert!(decode_png_data_url("data:image/jpeg;base64,AAAA").is_err());
        assert!(decode_png_data_url("data:image/png;base64,!!!").is_err());
        let not_png = to_data_url(b"GIF89a-and-then-some-more-bytes");
        assert!(decode_png_data_url(&not_png).is_err());
        assert!(decode_png_data_url(&to_data_url(&sample_png(0, 10))).is_err());
    }

    #[tokio::test]
    async fn test_submitted_raster_requires_an_image() {
        let err = SubmittedRaster::new(None).rasterize(&region()).await;
        assert!(matches!(err, Err(SelectionError::Raster(_))));
    }

    #[tokio::test]
    async fn test_submitted_raster_must_match_region_size() {
        let rect = Rect::from_corners(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        let region = CaptureRegion::new(rect, 1, 2.0);
        assert_eq!(region.pixel_size(), (800, 400));

        let tiny = SubmittedRaster::new(Some(to_data_url(&sample_png(1, 1))));
        let err = tiny.rasterize(&region).await;
        assert!(matches!(err, Err(SelectionError::Raster(msg)) if msg.contains("800x400")));

        let exact = SubmittedRaster::new(Some(to_data_url(&sample_png(800, 400))));
        assert!(exact.rasterize(&region).await.is_ok());
        let off_by_one = SubmittedRaster::new(Some(to_data_url(&sample_png(801, 399))));
        assert!(off_by_one.rasterize(&region).await.is_ok());
        let off_by_two = SubmittedRaster::new(Some(to_data_url(&sample_png(802, 400))));
        assert!(off_by_two.rasterize(&region).await.is_err());
    }

    #[tokio::test]
    async fn test_capture_persists_and_notifies() {
        let store = Arc::new(InMemoryCaptureStore::new());
        let (tx, mut rx) = broadcast::channel(4);
        let raster = SubmittedRaster::new(Some(to_data_url(&sample_png(80, 60))));
        let service = CaptureService::new("u1", Box::new(raster), store.clone(), tx);

        let selection = service.capture(region()).await.unwrap();
        assert_eq!(selection.page, 2);
        assert_eq!(store.recent("u1").await.unwrap(), Some(selection.clone()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.owner, "u1");
        assert_eq!(event.selection, selection);
        let wire = serde_json::to_value(&event).unwrap();
        assert!(wire.get("owner").is_none());
        assert!(wire["imageData"].is_string());
    }

    #[tokio::test]
    async fn test_failed_raster_stores_nothing() {
        let store = Arc::new(InMemoryCaptureStore::new());
        let (tx, mut rx) = broadcast::channel(4);
        let raster = SubmittedRaster::new(Some("data:text/plain,hello".to_string()));
        let service = CaptureService::new("u1", Box::new(raster), store.clone(), tx);

        assert!(service.capture(region()).await.is_err());
        assert!(store.list("u1").await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
