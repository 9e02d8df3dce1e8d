mod delay;
mod file_saver;
mod image_gen;

pub use self::delay::{Delay, DelayOperation};
pub use self::file_saver::{FileSaver, FileSaverOperation};
pub use self::image_gen::{
    ImageGen, ImageGenError, ImageGenOperation, ImageGenOutput, ImageGenResult,
};

// Crux's built-in Render capability covers view invalidation as-is.
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

// The Effect derive reads the field types syntactically, so they have to be
// spelled out as `Capability<Event>` rather than through aliases.
#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub image_gen: ImageGen<Event>,
    pub delay: Delay<Event>,
    pub file_saver: FileSaver<Event>,
}
