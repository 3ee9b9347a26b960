pub mod division_resolution;
pub mod event_comparison;
