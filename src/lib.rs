//! Extraction of a student's academic records from two unrelated back-ends:
//! the transcript system's rendered PDF documents and the HTML student portal.
//! Both are read through [`source::AcademicSource`] into the types of [`model`].

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod report;
pub mod source;

pub use error::{Result, ScrapeError};
pub use source::{AcademicSource, PortalSource, Reported, TranscriptSource};
