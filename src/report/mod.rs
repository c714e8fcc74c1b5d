/// Report assembly, recommendations and persistence
pub mod assembler;
pub mod recommendations;
mod store;

pub use assembler::{Report, ReportAssembler};
pub use recommendations::{recommend, Recommendation, RecommendationKind};
