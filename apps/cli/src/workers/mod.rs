pub mod acquire_source;
pub mod cli_completion_sink;
pub mod cut_clips;
pub mod detect_shots;
pub mod events;
pub mod progress_tracker;
pub mod reconcile_timeline;
pub mod split_segments;
