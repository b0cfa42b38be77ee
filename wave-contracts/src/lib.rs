//! ABOUTME: Contract Validator component

pub mod validator;

pub use validator::ContractValidator;
