//! Image Generation Gateway capability.
//!
//! The shell owns the vendor SDK and credentials; the core only describes the
//! three logical operations and consumes their results. One request per
//! operation: no retry, no timeout, no caching.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::AspectRatio;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum ImageGenOperation {
    GenerateFromText {
        prompt: String,
        aspect_ratio: AspectRatio,
    },
    GenerateWithReference {
        prompt: String,
        image_base64: String,
        mime_type: String,
    },
    Upscale {
        image_base64: String,
        mime_type: String,
        instruction: String,
    },
}

impl Operation for ImageGenOperation {
    type Output = ImageGenResult;
}

/// Image bytes as produced by the vendor, still base64; the core wraps them
/// into a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenOutput {
    pub image_base64: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageGenError {
    #[error("no image in the service response")]
    NoImage,

    #[error("image service request failed: {reason}")]
    Failed { reason: String },
}

pub type ImageGenResult = Result<ImageGenOutput, ImageGenError>;

#[derive(Clone)]
pub struct ImageGen<Ev> {
    context: CapabilityContext<ImageGenOperation, Ev>,
}

impl<Ev> Capability<Ev> for ImageGen<Ev> {
    type Operation = ImageGenOperation;
    type MappedSelf<MappedEv> = ImageGen<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        ImageGen::new(self.context.map_event(f))
    }
}

impl<Ev> ImageGen<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<ImageGenOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn generate_from_text<F>(&self, prompt: String, aspect_ratio: AspectRatio, make_event: F)
    where
        F: FnOnce(ImageGenResult) -> Ev + Send + 'static,
    {
        self.request(
            ImageGenOperation::GenerateFromText {
                prompt,
                aspect_ratio,
            },
            make_event,
        );
    }

    pub fn generate_with_reference<F>(
        &self,
        prompt: String,
        image_base64: String,
        mime_type: String,
        make_event: F,
    ) where
        F: FnOnce(ImageGenResult) -> Ev + Send + 'static,
    {
        self.request(
            ImageGenOperation::GenerateWithReference {
                prompt,
                image_base64,
                mime_type,
            },
            make_event,
        );
    }

    pub fn upscale<F>(
        &self,
        image_base64: String,
        mime_type: String,
        instruction: String,
        make_event: F,
    ) where
        F: FnOnce(ImageGenResult) -> Ev + Send + 'static,
    {
        self.request(
            ImageGenOperation::Upscale {
                image_base64,
                mime_type,
                instruction,
            },
            make_event,
        );
    }

    fn request<F>(&self, operation: ImageGenOperation, make_event: F)
    where
        F: FnOnce(ImageGenResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
