pub mod dcf;
pub mod inputs;
pub mod projection;
pub mod sensitivity;
pub mod wacc;

pub use dcf::{calculate_dcf, valuate, DcfInput, ValuationResult};
pub use inputs::{
    DcfAssumptions, FetchedFinancials, FinancialInputs, NormalizedAssumptions,
    TerminalAssumption, TerminalMethod,
};
pub use projection::{project, project_normalized, ProjectedYear};
pub use sensitivity::{
    exit_multiple_sensitivity, sensitivity, ExitMultipleTable, SensitivityRequest,
    SensitivityTable, Sweep,
};
