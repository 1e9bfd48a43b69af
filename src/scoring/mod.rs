//! Derived scores: in-race speed index and post-position bias.

pub mod bias;
pub mod speed;

pub use bias::{BiasTable, CourseKey};
pub use speed::{compute_speed_scores, SpeedScore, SpeedSettings};
