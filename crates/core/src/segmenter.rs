use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    config::{MEDIA_EXTENSION, SEGMENT_PREFIX, segment_pattern},
    error::SegmentationError,
    files::non_empty_len,
    media::MediaEngine,
    types::{SegmentFile, SegmentSpan},
};

/// Nominal contiguous spans covering `[0, total)` in parts of `part` seconds.
pub fn plan_segments(total: f64, part: f64) -> Vec<SegmentSpan> {
    if !(total > 0.0 && part > 0.0) {
        return Vec::new();
    }
    let count = (total / part).ceil() as usize;
    (0..count)
        .map(|index| {
            let start = index as f64 * part;
            SegmentSpan {
                index,
                start,
                end: (start + part).min(total),
            }
        })
        .collect()
}

/// Ordinal of a segment file name like `part007.mp4`.
pub fn segment_ordinal(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(MEDIA_EXTENSION)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Segment files in `dir`, in ordinal order.
pub async fn discover_segments(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(ordinal) = segment_ordinal(&name.to_string_lossy()) {
            found.push((ordinal, entry.path()));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

async fn remove_stale_segments(dir: &Path) -> std::io::Result<()> {
    for path in discover_segments(dir).await? {
        fs::remove_file(&path).await?;
    }
    Ok(())
}

/// Segments found on disk, with the nominal plan they were checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub segments: Vec<SegmentFile>,
    /// Empty when the source duration could not be probed.
    pub plan: Vec<SegmentSpan>,
}

impl Segmentation {
    pub fn matches_plan(&self) -> bool {
        self.plan.is_empty() || self.plan.len() == self.segments.len()
    }
}

/// Split `source` into parts of `part_duration` seconds inside `dir`.
///
/// Files left behind by a failed split are not removed here; they are
/// filtered by the shot detector's size check.
pub async fn segment(
    engine: &dyn MediaEngine,
    source: &Path,
    part_duration: f64,
    dir: &Path,
) -> Result<Segmentation, SegmentationError> {
    fs::create_dir_all(dir).await?;
    remove_stale_segments(dir).await?;

    engine
        .split(source, part_duration, &segment_pattern(dir))
        .await
        .map_err(|source_err| SegmentationError::SplitFailed {
            video: source.to_path_buf(),
            source: source_err,
        })?;

    let paths = discover_segments(dir).await?;
    if paths.is_empty() {
        return Err(SegmentationError::NoSegments {
            dir: dir.to_path_buf(),
        });
    }

    let plan = match engine.probe_duration(source).await {
        Ok(total) => plan_segments(total, part_duration),
        Err(e) => {
            warn!(video = %source.display(), error = %e, "Could not probe source, segment count unchecked");
            Vec::new()
        }
    };
    let mut segments = Vec::with_capacity(paths.len());
    let mut offset = 0.0;
    for (index, path) in paths.into_iter().enumerate() {
        let next_offset = if non_empty_len(&path).await.is_none() {
            offset
        } else {
            match engine.probe_duration(&path).await {
                Ok(duration) => offset + duration,
                Err(e) => {
                    // Resume on the planned boundary
                    let next = plan
                        .get(index)
                        .map_or(offset + part_duration, |span| span.end.max(offset));
                    warn!(segment = index, path = %path.display(), error = %e, next, "Could not probe segment, assuming planned end");
                    next
                }
            }
        };
        segments.push(SegmentFile {
            index,
            path,
            start_offset: offset,
        });
        offset = next_offset;
    }

    let segmentation = Segmentation { segments, plan };
    if !segmentation.matches_plan() {
        warn!(
            planned = segmentation.plan.len(),
            produced = segmentation.segments.len(),
            dir = %dir.display(),
            "Segment count differs from the planned split"
        );
    }

    info!(count = segmentation.segments.len(), dir = %dir.display(), "Source split into segments");
    Ok(segmentation)
}
