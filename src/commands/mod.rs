pub mod justification;
