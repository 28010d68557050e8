//! The per-video processing pipeline.
//!
//! Five stages, strictly ordered: fetch, transcode, analyze, persist,
//! cleanup. Any stage error aborts the remaining stages; cleanup runs
//! regardless, including after a timeout, and never propagates its own
//! errors. There is no persisted
//! partial progress: a redelivered message re-runs the pipeline from the
//! start, and the persist stage is written so re-running converges to the
//! same record.

use std::path::Path;

use tokio::sync::watch;
use tracing::{info, warn};

use vidpipe_metadata::MetadataError;
use vidpipe_models::{VideoId, VideoRecord};

use crate::context::ProcessingContext;
use crate::error::{WorkerError, WorkerResult};
use crate::scratch::ScratchDir;

/// Run the full pipeline for one video.
///
/// The per-message timeout bounds the stages only; on expiry the stage
/// future is dropped, which kills a still-running transcoder subprocess,
/// and the scratch directory is still reaped below.
pub async fn process_video(
    ctx: &ProcessingContext,
    video_id: &VideoId,
    filename: &str,
    cancel: Option<watch::Receiver<bool>>,
) -> WorkerResult<()> {
    let scratch = ScratchDir::create(Path::new(&ctx.config.work_dir), video_id).await?;

    let timeout = ctx.config.message_timeout;
    let result = match tokio::time::timeout(
        timeout,
        run_stages(ctx, video_id, filename, &scratch, cancel),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(WorkerError::Timeout(timeout.as_secs())),
    };

    scratch.cleanup().await;
    result
}

async fn run_stages(
    ctx: &ProcessingContext,
    video_id: &VideoId,
    filename: &str,
    scratch: &ScratchDir,
    cancel: Option<watch::Receiver<bool>>,
) -> WorkerResult<()> {
    let input = scratch.input_path(filename);
    ctx.storage
        .download_file(filename, &input)
        .await
        .map_err(|source| WorkerError::Fetch {
            video_id: video_id.to_string(),
            source,
        })?;
    info!(video_id = %video_id, key = %filename, "Fetched source object");

    let output = scratch.output_path(video_id);
    ctx.transcoder
        .transcode(&input, &output, cancel)
        .await
        .map_err(|source| WorkerError::Transcode {
            video_id: video_id.to_string(),
            source,
        })?;

    let label = ctx
        .analyzer
        .analyze(&output)
        .await
        .map_err(|source| WorkerError::Analyze {
            video_id: video_id.to_string(),
            source,
        })?;
    info!(video_id = %video_id, result = %label, "Analysis complete");

    persist(ctx, video_id, filename, &label).await
}

/// Merge-write the processed record.
///
/// The existing record keeps its intake fields (title, upload date,
/// metadata); description, tags, URL and status are rewritten. A missing
/// intake record is synthesized so the video still converges to a
/// well-formed processed record.
async fn persist(
    ctx: &ProcessingContext,
    video_id: &VideoId,
    filename: &str,
    label: &str,
) -> WorkerResult<()> {
    let url = ctx.storage.object_url(filename);

    let existing = match ctx.metadata.get_video(video_id).await {
        Ok(record) => record,
        Err(MetadataError::NotFound(_)) => {
            warn!(video_id = %video_id, "No intake record found, synthesizing one");
            VideoRecord::new_uploaded(video_id.clone(), filename, url.clone())
        }
        Err(source) => {
            return Err(WorkerError::Persist {
                video_id: video_id.to_string(),
                source,
            })
        }
    };

    let processed = existing.into_processed(label, url);
    ctx.metadata
        .put_video(&processed)
        .await
        .map_err(|source| WorkerError::Persist {
            video_id: video_id.to_string(),
            source,
        })?;

    info!(video_id = %video_id, "Updated video record");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestHarness;
    use std::collections::HashMap;
    use vidpipe_models::VideoStatus;
    use vidpipe_storage::object_url_for;

    #[tokio::test]
    async fn success_merges_intake_record() {
        let harness = TestHarness::new();
        let video_id = VideoId::from_string("v1");
        harness.storage.insert_object("v1-clip.mp4", b"source bytes");

        let mut intake = VideoRecord::new_uploaded(
            video_id.clone(),
            "clip.mp4",
            object_url_for("videos", "v1-clip.mp4"),
        );
        intake.metadata = Some(HashMap::from([("camera".to_string(), "drone".to_string())]));
        let upload_date = intake.upload_date;
        harness.metadata.seed(intake);

        process_video(&harness.ctx, &video_id, "v1-clip.mp4", None)
            .await
            .unwrap();

        let record = harness.metadata.record("v1").unwrap();
        assert_eq!(record.status, VideoStatus::Processed);
        assert_eq!(record.title, "clip.mp4");
        assert_eq!(record.upload_date, upload_date);
        assert_eq!(
            record.metadata.as_ref().unwrap().get("camera").unwrap(),
            "drone"
        );
        assert!(record.has_processed_tags());
        assert_eq!(record.url, object_url_for("videos", "v1-clip.mp4"));
        assert!(record.description.starts_with("Transcoded and processed:"));
    }

    #[tokio::test]
    async fn missing_intake_record_is_synthesized() {
        let harness = TestHarness::new();
        let video_id = VideoId::from_string("v2");
        harness.storage.insert_object("v2-clip.mp4", b"source bytes");

        process_video(&harness.ctx, &video_id, "v2-clip.mp4", None)
            .await
            .unwrap();

        let record = harness.metadata.record("v2").unwrap();
        assert_eq!(record.status, VideoStatus::Processed);
        assert!(record.has_processed_tags());
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_any_write() {
        let harness = TestHarness::new();
        let video_id = VideoId::from_string("v3");
        // No object seeded: the fetch stage fails.

        let err = process_video(&harness.ctx, &video_id, "v3-clip.mp4", None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("fetch"));
        assert!(harness.metadata.record("v3").is_none());
        assert!(harness.transcoder.calls().is_empty());
    }

    #[tokio::test]
    async fn transcode_failure_aborts_before_any_write() {
        let harness = TestHarness::new();
        let video_id = VideoId::from_string("v4");
        harness.storage.insert_object("v4-clip.mp4", b"source bytes");
        harness.transcoder.fail_next();

        let err = process_video(&harness.ctx, &video_id, "v4-clip.mp4", None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some("transcode"));
        assert!(harness.metadata.record("v4").is_none());
    }

    #[tokio::test]
    async fn scratch_is_cleaned_up_on_success_and_failure() {
        let harness = TestHarness::new();
        harness.storage.insert_object("v5-clip.mp4", b"source bytes");

        process_video(&harness.ctx, &VideoId::from_string("v5"), "v5-clip.mp4", None)
            .await
            .unwrap();
        let _ = process_video(&harness.ctx, &VideoId::from_string("v6"), "missing.mp4", None)
            .await;

        let entries: Vec<_> = std::fs::read_dir(&harness.ctx.config.work_dir)
            .unwrap()
            .collect();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn reinvocation_uses_a_fresh_scratch_path() {
        let harness = TestHarness::new();
        let video_id = VideoId::from_string("v7");
        harness.storage.insert_object("v7-clip.mp4", b"source bytes");

        process_video(&harness.ctx, &video_id, "v7-clip.mp4", None)
            .await
            .unwrap();
        process_video(&harness.ctx, &video_id, "v7-clip.mp4", None)
            .await
            .unwrap();

        let downloads = harness.storage.downloads();
        assert_eq!(downloads.len(), 2);
        assert_ne!(downloads[0].parent(), downloads[1].parent());
    }
}
