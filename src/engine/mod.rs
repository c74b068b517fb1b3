// ==========================================
// Engine layer - ingestion business rules
// ==========================================
// Responsibility: validation, write planning, transactional writes,
// run reporting.
// Red line: no UI logic; database access only through the repository.
// ==========================================

pub mod ingestor;
pub mod planner;
pub mod reporter;
pub mod validator;
pub mod writer;

pub use ingestor::CatalogIngestor;
pub use planner::BatchPlanner;
pub use reporter::{
    RunReport, RunReporter, EXIT_FATAL, EXIT_OK, EXIT_VALIDATION_ERRORS, EXIT_WRITE_FAILURES,
};
pub use validator::RowValidator;
pub use writer::{TransactionalWriter, WritePhaseResult};
