pub mod check;
pub mod edit;
pub mod filters;
