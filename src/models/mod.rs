pub mod scan;

pub use scan::{ScanStatus, Vulnerability};
