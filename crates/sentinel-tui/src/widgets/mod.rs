pub mod live_indicator;
pub mod toasts;
