//! # Blogicum Shared
//!
//! Types that cross the HTTP boundary: raw form payloads as the browser
//! submits them, and the payload of rendered error pages.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
