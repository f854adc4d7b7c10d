pub mod capabilities;
pub mod dispatch;
pub mod planner;
