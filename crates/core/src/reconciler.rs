use crate::{
    config::TimelineMode,
    types::{SceneInterval, SegmentShots, ShotBoundary},
};

/// Concatenate per-segment shot lists in segment order.
///
/// Nothing is reordered, merged or deduplicated.
pub fn reconcile(lists: &[Vec<ShotBoundary>]) -> Vec<SceneInterval> {
    lists
        .iter()
        .flat_map(|shots| shots.iter().copied().map(SceneInterval::from))
        .collect()
}

/// Build the source timeline from per-segment shots under `mode`.
pub fn reconcile_with(segments: &[SegmentShots], mode: TimelineMode) -> Vec<SceneInterval> {
    match mode {
        TimelineMode::Concatenate => {
            let lists: Vec<Vec<ShotBoundary>> =
                segments.iter().map(|s| s.shots.clone()).collect();
            reconcile(&lists)
        }
        TimelineMode::SegmentOffset => segments
            .iter()
            .flat_map(|s| {
                let offset = s.segment.start_offset;
                s.shots.iter().map(move |shot| shot.shifted(offset))
            })
            .collect(),
    }
}

/// Index of the first interval that starts before its predecessor.
pub fn first_regression(scenes: &[SceneInterval]) -> Option<usize> {
    scenes
        .windows(2)
        .position(|pair| pair[1].start < pair[0].start)
        .map(|i| i + 1)
}
