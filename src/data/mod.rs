pub mod batcher;
pub mod batchitem;
pub mod csdi;
pub mod csdiitem;
pub mod file;
pub mod mcar;
pub mod memory;
pub mod series;
pub mod source;
