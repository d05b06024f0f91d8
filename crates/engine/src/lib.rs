pub mod delivery;
pub mod finalize;
pub mod frame_state;
pub mod portfolio;
pub mod profiler;
pub mod rewards;
pub mod segmentation;
pub mod source_impls;
pub mod store_impls;
pub mod targeting;
