pub mod archive;
pub mod findings;
pub mod range;
pub mod report;
pub mod serialize;
