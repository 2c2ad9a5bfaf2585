use std::time::Duration;

use crate::types::{RunSummary, SceneInterval};

/// Format seconds as HH:MM:SS.mmm timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let mins = (total_millis / 60_000) % 60;
    let secs = (total_millis / 1000) % 60;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn format_scene(index: usize, scene: &SceneInterval) -> String {
    format!(
        "#{:<4} {} - {}  ({:.3}s)",
        index,
        format_timestamp(scene.start),
        format_timestamp(scene.end),
        scene.end - scene.start
    )
}

/// Format a run summary as human-readable text
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("Source: {}\n", summary.source.display()));
    output.push_str(&format!(
        "Segments: {} | Scenes: {} | Clips: {}\n",
        summary.segments,
        summary.scenes.len(),
        summary.clips.len()
    ));

    if !summary.skipped_segments.is_empty() {
        let skipped = summary
            .skipped_segments
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!("Segments without detection: {}\n", skipped));
    }

    output.push('\n');
    for clip in &summary.clips {
        output.push_str(&format!(
            "{}  -> {}\n",
            format_scene(clip.index, &clip.interval),
            clip.path.display()
        ));
    }

    if !summary.skipped_intervals.is_empty() {
        output.push_str("\nSkipped intervals:\n");
        for skipped in &summary.skipped_intervals {
            output.push_str(&format!(
                "{}  ({})\n",
                format_scene(skipped.index, &skipped.interval),
                skipped.reason
            ));
        }
    }

    output
}
