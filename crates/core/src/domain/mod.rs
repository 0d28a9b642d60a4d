pub mod bid;
pub mod boq;
pub mod budget;
pub mod context;
pub mod selection;
pub mod supplier;
