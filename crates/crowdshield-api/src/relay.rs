//! Latest-frame relay for the live video stream.
//!
//! The vision pipeline POSTs each annotated frame; viewers pull a
//! multipart MJPEG stream. Only the most recent frame is kept: a single
//! slot, overwritten on every submit, copied out per viewer per tick.
//! Slow viewers silently skip frames rather than queueing them.

use std::convert::Infallible;
use std::sync::Mutex;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use bytes::{BufMut, Bytes, BytesMut};
use crowdshield_core::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use serde_json::json;
use tokio::sync::Notify;

use crate::error::ApiResult;
use crate::state::AppState;

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

#[derive(Clone)]
struct FrameSlot {
    seq: u64,
    jpeg: Bytes,
}

pub struct FrameRelay {
    jpeg_quality: u8,
    slot: Mutex<Option<FrameSlot>>,
    arrived: Notify,
}

impl FrameRelay {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality,
            slot: Mutex::new(None),
            arrived: Notify::new(),
        }
    }

    /// Decode `payload`, re-encode it as JPEG, and replace the slot.
    /// A payload that does not decode leaves the slot untouched.
    /// Decode and encode happen outside the lock; the hold time is one
    /// pointer swap.
    pub fn submit(&self, payload: &[u8]) -> Result<u64> {
        let img = image::load_from_memory(payload).map_err(|e| Error::Decode(e.to_string()))?;

        let mut encoded = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality);
        img.write_with_encoder(encoder)
            .map_err(|e| Error::Decode(e.to_string()))?;
        let jpeg = Bytes::from(encoded);

        let seq = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            let seq = slot.as_ref().map(|s| s.seq + 1).unwrap_or(1);
            *slot = Some(FrameSlot { seq, jpeg });
            seq
        };
        self.arrived.notify_waiters();
        Ok(seq)
    }

    /// Current frame, if one has arrived. The returned `Bytes` is a
    /// refcounted view; cloning it out of the slot is O(1).
    pub fn latest(&self) -> Option<(u64, Bytes)> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|s| (s.seq, s.jpeg.clone()))
    }

    /// Current frame, suspending until the first one arrives.
    pub async fn next_frame(&self) -> (u64, Bytes) {
        loop {
            let arrived = self.arrived.notified();
            if let Some(frame) = self.latest() {
                return frame;
            }
            arrived.await;
        }
    }
}

/// One multipart part: boundary, content-type header, JPEG body.
fn mjpeg_part(jpeg: &Bytes) -> Bytes {
    let mut part = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + 2);
    part.put_slice(PART_HEADER);
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// `POST /frame` - multipart upload of one encoded image.
pub async fn receive_frame(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(e.to_string()))?
    {
        if field.name() == Some("frame") {
            let payload = field
                .bytes()
                .await
                .map_err(|e| Error::Validation(e.to_string()))?;
            state.relay.submit(&payload)?;
            return Ok(Json(json!({ "ok": true })));
        }
    }

    Err(Error::Validation("multipart field 'frame' missing".into()).into())
}

/// `GET /video` - infinite multipart MJPEG stream, paced at the
/// configured frame rate. Each viewer reads the slot at its own cadence.
pub async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let relay = state.relay.clone();
    let ticker = tokio::time::interval(state.config.frame_interval());

    let stream = futures::stream::unfold((relay, ticker), |(relay, mut ticker)| async move {
        ticker.tick().await;
        let (_seq, jpeg) = relay.next_frame().await;
        let chunk = mjpeg_part(&jpeg);
        Some((Ok::<Bytes, Infallible>(chunk), (relay, ticker)))
    });

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )],
        Body::from_stream(stream),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    fn png_frame(shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([shade, shade, shade]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn submit_stores_jpeg_and_bumps_sequence() {
        let relay = FrameRelay::new(80);
        assert!(relay.latest().is_none());

        let seq1 = relay.submit(&png_frame(10)).unwrap();
        let seq2 = relay.submit(&png_frame(200)).unwrap();
        assert!(seq2 > seq1);

        let (seq, jpeg) = relay.latest().unwrap();
        assert_eq!(seq, seq2);
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8][..]);
    }

    #[test]
    fn malformed_payload_leaves_slot_unchanged() {
        let relay = FrameRelay::new(80);
        relay.submit(&png_frame(50)).unwrap();
        let before = relay.latest().unwrap();

        let err = relay.submit(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let after = relay.latest().unwrap();
        assert_eq!(before.0, after.0);
        assert_eq!(before.1, after.1);
    }

    #[test]
    fn readers_only_ever_see_the_newest_frame() {
        let relay = FrameRelay::new(80);
        relay.submit(&png_frame(10)).unwrap();
        let (seq_f1, _) = relay.latest().unwrap();
        relay.submit(&png_frame(200)).unwrap();

        // F1 is unreachable once F2 has landed.
        let (seq, _) = relay.latest().unwrap();
        assert!(seq > seq_f1);
        let (seq, _) = relay.latest().unwrap();
        assert!(seq > seq_f1);
    }

    #[tokio::test]
    async fn next_frame_waits_for_first_submit() {
        let relay = Arc::new(FrameRelay::new(80));

        let waiter = {
            let relay = relay.clone();
            tokio::spawn(async move { relay.next_frame().await })
        };

        // Give the waiter time to park on the notify.
        tokio::time::sleep(Duration::from_millis(20)).await;
        relay.submit(&png_frame(99)).unwrap();

        let (seq, _jpeg) = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn mjpeg_part_is_boundary_delimited() {
        let jpeg = Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let part = mjpeg_part(&jpeg);
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"\xFF\xD9\r\n"));
    }
}
