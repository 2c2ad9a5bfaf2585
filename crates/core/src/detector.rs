use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::{
    annotation::{ShotAnnotation, ShotAnnotator},
    error::DetectionServiceError,
    files::non_empty_len,
    types::ShotBoundary,
};

/// Detect shots in one segment file. Offsets are local to the segment.
///
/// A missing or empty segment is skipped with a warning and yields no shots.
pub async fn detect_shots(
    annotator: &dyn ShotAnnotator,
    segment_path: &Path,
) -> Result<Vec<ShotBoundary>, DetectionServiceError> {
    if non_empty_len(segment_path).await.is_none() {
        warn!(path = %segment_path.display(), "Segment file is missing or empty, skipping");
        return Ok(Vec::new());
    }

    let payload = fs::read(segment_path)
        .await
        .map_err(|source| DetectionServiceError::ReadSegment {
            path: segment_path.to_path_buf(),
            source,
        })?;

    let annotations = annotator.annotate(payload).await?;
    let shots: Vec<ShotBoundary> = annotations.iter().map(ShotAnnotation::to_boundary).collect();

    info!(path = %segment_path.display(), shots = shots.len(), "Shots detected");
    Ok(shots)
}
