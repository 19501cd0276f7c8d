//! Plant disease diagnosis service.
//!
//! A user uploads a plant photo, the image is sent to an inference backend
//! and the diagnosis is rendered back. The `/analyze-plant` proxy relays
//! images to a multimodal chat-completion API with a fixed rubric.

pub mod analysis;
pub mod config;
pub mod error;
pub mod intake;
pub mod page;
pub mod proxy;
pub mod report;
pub mod session;
pub mod web;

pub use analysis::{AnalysisClient, AnalysisResult, Diagnosis, DiagnosisFormat};
pub use config::{Backend, Config};
pub use error::ErrorKind;
pub use intake::{select_file, ImageSource, SelectedImage, UploadedFile};
pub use session::{Phase, SessionId, SessionStore, UiState};
