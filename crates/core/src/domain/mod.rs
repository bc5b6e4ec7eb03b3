pub mod analysis;
pub mod decision;
pub mod ticker;
