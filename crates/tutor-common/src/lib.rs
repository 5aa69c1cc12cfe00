//! tutor-common: error type, response envelope and pagination shared by all
//! Tutor Cerdas crates.

pub mod error;
pub mod pagination;
pub mod response;

pub use error::{ApiError, ApiResult, FieldError};
pub use pagination::{Page, Pagination};
pub use response::{ApiMessage, ApiResponse};
