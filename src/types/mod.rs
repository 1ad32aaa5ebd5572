pub mod analysis;
pub mod report;
pub mod series;

pub use analysis::*;
pub use report::*;
pub use series::*;
