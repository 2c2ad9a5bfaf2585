use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{info, warn};

use crate::{
    config::{CutMode, PipelineConfig},
    error::{CutBatchError, CutError, CutVerificationError},
    files::non_empty_len,
    media::MediaEngine,
    types::{CutClip, SceneInterval, SkippedInterval},
};

#[derive(Debug, Default)]
pub struct CutReport {
    pub clips: Vec<CutClip>,
    pub skipped: Vec<SkippedInterval>,
    pub failures: Vec<CutError>,
}

impl CutReport {
    /// Fails if any single cut failed. Written clips stay on disk either way.
    pub fn into_result(self) -> Result<(Vec<CutClip>, Vec<SkippedInterval>), CutBatchError> {
        if self.failures.is_empty() {
            Ok((self.clips, self.skipped))
        } else {
            Err(CutBatchError {
                failures: self.failures,
                written: self.clips,
            })
        }
    }
}

/// Cut one clip per valid interval of `scenes` out of `source`.
///
/// Each interval keeps its ordinal as the clip index, so skipped intervals
/// leave gaps in the output names. At most `config.cut_concurrency` cuts run
/// at once.
pub async fn cut(
    engine: Arc<dyn MediaEngine>,
    config: &PipelineConfig,
    source: &Path,
    scenes: &[SceneInterval],
) -> CutReport {
    let mut report = CutReport::default();
    let permits = Arc::new(Semaphore::new(config.cut_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut task_index = HashMap::new();

    for (index, interval) in scenes.iter().copied().enumerate() {
        let duration = match interval.validate() {
            Ok(duration) => duration,
            Err(reason) => {
                warn!(index, start = interval.start, end = interval.end, %reason, "Skipping invalid scene interval");
                report.skipped.push(SkippedInterval {
                    index,
                    interval,
                    reason,
                });
                continue;
            }
        };

        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        let source = source.to_path_buf();
        let output = config.clip_path(index);
        let mode = config.cut_mode;

        let handle = tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return Err(CutError::Aborted {
                        index,
                        reason: e.to_string(),
                    });
                }
            };
            cut_one(
                engine.as_ref(),
                &source,
                index,
                interval,
                duration,
                output,
                mode,
            )
            .await
        });
        task_index.insert(handle.id(), index);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, Ok(clip))) => report.clips.push(clip),
            Ok((_, Err(e))) => {
                warn!(index = e.index(), error = %e, "Clip failed");
                report.failures.push(e);
            }
            Err(join_error) => {
                let index = task_index.get(&join_error.id()).copied().unwrap_or_default();
                report.failures.push(CutError::Aborted {
                    index,
                    reason: join_error.to_string(),
                });
            }
        }
    }

    report.clips.sort_by_key(|c| c.index);
    report.failures.sort_by_key(CutError::index);
    report
}

async fn cut_one(
    engine: &dyn MediaEngine,
    source: &Path,
    index: usize,
    interval: SceneInterval,
    duration: f64,
    output: PathBuf,
    mode: CutMode,
) -> Result<CutClip, CutError> {
    engine
        .trim(source, interval.start, duration, &output, mode)
        .await
        .map_err(|source| CutError::Engine { index, source })?;

    let Some(bytes) = non_empty_len(&output).await else {
        return Err(CutVerificationError {
            index,
            path: output,
        }
        .into());
    };

    info!(index, path = %output.display(), bytes, "Clip written");
    Ok(CutClip {
        index,
        path: output,
        interval,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::error::MediaError;

    /// Writes a clip per trim; indices in `empty` get a 0-byte file and in
    /// `broken` an engine error.
    #[derive(Default)]
    struct FakeTrimmer {
        empty: HashSet<usize>,
        broken: HashSet<usize>,
        calls: Mutex<Vec<(f64, f64, PathBuf)>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    fn clip_index(path: &Path) -> usize {
        let name = path.file_stem().unwrap().to_string_lossy();
        name.trim_start_matches("clip_").parse().unwrap()
    }

    #[async_trait]
    impl MediaEngine for FakeTrimmer {
        async fn split(&self, _: &Path, _: f64, _: &Path) -> Result<(), MediaError> {
            unreachable!()
        }

        async fn trim(
            &self,
            _: &Path,
            start: f64,
            duration: f64,
            output: &Path,
            _: CutMode,
        ) -> Result<(), MediaError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            self.calls
                .lock()
                .unwrap()
                .push((start, duration, output.to_path_buf()));
            let index = clip_index(output);
            if self.broken.contains(&index) {
                return Err(MediaError::Failed {
                    tool: "ffmpeg".into(),
                    status: "exit status: 1".into(),
                    stderr: "boom".into(),
                });
            }
            let bytes: &[u8] = if self.empty.contains(&index) { b"" } else { b"clip" };
            std::fs::write(output, bytes).unwrap();
            Ok(())
        }

        async fn probe_duration(&self, _: &Path) -> Result<f64, MediaError> {
            unreachable!()
        }
    }

    fn config(dir: &Path, concurrency: usize) -> PipelineConfig {
        let mut config = PipelineConfig::new("u");
        config.downloads_dir = dir.join("downloads");
        config.cuts_dir = dir.join("cuts");
        config.cut_concurrency = concurrency;
        std::fs::create_dir_all(&config.cuts_dir).unwrap();
        config
    }

    #[tokio::test]
    async fn invalid_intervals_are_skipped_and_keep_their_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), 4);
        let engine = Arc::new(FakeTrimmer::default());
        let scenes = [
            SceneInterval::new(5.0, 5.0),
            SceneInterval::new(-1.0, 3.0),
            SceneInterval::new(2.0, 7.0),
        ];

        let report = cut(engine.clone(), &config, Path::new("video.mp4"), &scenes).await;

        assert!(report.failures.is_empty());
        assert_eq!(
            report.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(report.clips.len(), 1);
        assert_eq!(report.clips[0].index, 2);
        assert_eq!(report.clips[0].path, config.clip_path(2));

        let calls = engine.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(2.0, 5.0, config.clip_path(2))]);
        assert!(!config.clip_path(0).exists());
        assert!(!config.clip_path(1).exists());
    }

    #[tokio::test]
    async fn empty_output_fails_verification_without_touching_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), 8);
        let engine = Arc::new(FakeTrimmer {
            empty: HashSet::from([1]),
            ..Default::default()
        });
        let scenes = [
            SceneInterval::new(0.0, 10.0),
            SceneInterval::new(10.0, 25.0),
            SceneInterval::new(25.0, 40.0),
        ];

        let report = cut(engine, &config, Path::new("video.mp4"), &scenes).await;

        assert_eq!(
            report.clips.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            CutError::Verification(CutVerificationError { index: 1, .. })
        ));
        assert!(config.clip_path(0).exists());
        assert!(config.clip_path(2).exists());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.written.len(), 2);
        assert!(err.to_string().starts_with("1 of 3 clip(s) failed"));
    }

    #[tokio::test]
    async fn engine_errors_are_aggregated() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), 2);
        let engine = Arc::new(FakeTrimmer {
            broken: HashSet::from([0, 2]),
            ..Default::default()
        });
        let scenes = [
            SceneInterval::new(0.0, 1.0),
            SceneInterval::new(1.0, 2.0),
            SceneInterval::new(2.0, 3.0),
        ];

        let report = cut(engine, &config, Path::new("video.mp4"), &scenes).await;

        assert_eq!(
            report.failures.iter().map(CutError::index).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(report.clips.len(), 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path(), 2);
        let engine = Arc::new(FakeTrimmer::default());
        let scenes: Vec<_> = (0..8)
            .map(|i| SceneInterval::new(i as f64, i as f64 + 1.0))
            .collect();

        let report = cut(engine.clone(), &config, Path::new("video.mp4"), &scenes).await;

        assert_eq!(report.clips.len(), 8);
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
        assert!(report.into_result().is_ok());
    }
}
