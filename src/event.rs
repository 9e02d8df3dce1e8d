use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capabilities::ImageGenResult;
use crate::model::{AspectRatio, Screen};
use crate::plans::PlanTier;

/// Everything that can happen to the core: user actions from the shell and
/// completions of capability requests. Large payloads are boxed to keep the
/// enum small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // Auth
    IdentifierSubmitted { identifier: String },
    OtpSendElapsed,
    CodeSubmitted { code: String },
    AuthBackRequested,
    LogoutRequested,

    // Navigation
    ScreenSelected { screen: Screen },

    // Generate workflow
    PromptChanged { text: String },
    AspectRatioSelected { ratio: AspectRatio },
    ReferenceImageAttached { data: Vec<u8>, mime_type: String },
    ReferenceImageCleared,
    GenerateRequested,
    GenerationCompleted { op_id: Uuid, result: Box<ImageGenResult> },
    UpscaleRequested,
    UpscaleCompleted { op_id: Uuid, result: Box<ImageGenResult> },
    DownloadRequested,

    // Billing
    PurchaseRequested { tier: PlanTier },

    // Errors
    ErrorDismissed,
}

impl Event {
    /// Stable name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IdentifierSubmitted { .. } => "identifier_submitted",
            Self::OtpSendElapsed => "otp_send_elapsed",
            Self::CodeSubmitted { .. } => "code_submitted",
            Self::AuthBackRequested => "auth_back_requested",
            Self::LogoutRequested => "logout_requested",
            Self::ScreenSelected { .. } => "screen_selected",
            Self::PromptChanged { .. } => "prompt_changed",
            Self::AspectRatioSelected { .. } => "aspect_ratio_selected",
            Self::ReferenceImageAttached { .. } => "reference_image_attached",
            Self::ReferenceImageCleared => "reference_image_cleared",
            Self::GenerateRequested => "generate_requested",
            Self::GenerationCompleted { .. } => "generation_completed",
            Self::UpscaleRequested => "upscale_requested",
            Self::UpscaleCompleted { .. } => "upscale_completed",
            Self::DownloadRequested => "download_requested",
            Self::PurchaseRequested { .. } => "purchase_requested",
            Self::ErrorDismissed => "error_dismissed",
        }
    }
}
