//! Shared core for the A.K ai mobile client.
//!
//! All application state and logic live here; platform shells (iOS, Android,
//! Web) render the [`ViewModel`] and fulfil capability requests (image
//! generation calls, timers, file saves), feeding results back as [`Event`]s.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod capabilities;
pub mod event;
pub mod media;
pub mod model;
pub mod plans;

use serde::{Deserialize, Serialize};

pub use app::{
    App, AuthView, CurrentImageView, ErrorView, GenerateView, HistoryItem, MainView, PlanView,
    ProfileView, ViewModel,
};
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::{
    AspectRatio, AuthPhase, GeneratedImage, History, ImageId, Model, Screen, Session,
    StagedReference, WorkflowPhase,
};
pub use plans::{Plan, PlanTier};

pub const STARTING_CREDITS: u32 = 50;
pub const DAILY_FREE_LIMIT: u32 = 10;
pub const TEXT_GENERATION_COST: u32 = 10;
pub const REFERENCE_GENERATION_COST: u32 = 20;
pub const UPSCALE_COST: u32 = 5;
pub const OTP_SEND_DELAY_MS: u64 = 1500;
pub const DEMO_OTP_CODE: &str = "123456";
pub const MAX_REFERENCE_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// House style applied to every text-to-image prompt before it leaves the core.
pub const PROMPT_STYLE_PREFIX: &str = "4K, photorealistic, ultra-detailed: ";

/// Fixed instruction sent with every upscale request.
pub const UPSCALE_INSTRUCTION: &str = "Upscale this image to 4K ultra-high resolution. \
     Enhance details, sharpness, and clarity without altering the original composition or subject.";

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate image. Please try again.";
pub const UPSCALE_FAILED_MESSAGE: &str = "Failed to upscale image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input (bad data URI, oversized reference image, wrong code).
    Validation,
    /// Refused before any remote call: daily limit reached or not enough credits.
    Eligibility,
    /// The remote service failed or returned no usable image.
    Generation,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Eligibility => "ELIGIBILITY_ERROR",
            Self::Generation => "GENERATION_ERROR",
        }
    }
}

/// A user-facing error. `message` is safe to display; transport detail stays
/// in `internal_message` and is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;
