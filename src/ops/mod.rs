pub mod adjustments;
pub mod ai;
pub mod canvas_ops;
pub mod filters;
pub mod live;
