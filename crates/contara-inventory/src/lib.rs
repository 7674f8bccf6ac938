pub mod allocator;
pub mod layers;
pub mod recost;

pub use allocator::{
    AllocationOutcome, AllocationRequest, ShortfallPolicy, allocate, plan_allocation,
};
pub use layers::{ManualLayerInput, ReceiptInput, create_manual_layer, post_receipt};
pub use recost::{ItemFailure, NormalizationReport, plan_item_recost, run_normalization};
