use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

use crate::plans::{Plan, PlanTier};
use crate::{AppError, DAILY_FREE_LIMIT, STARTING_CREDITS};

/// Identity of a generated image, derived from its creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    #[must_use]
    pub fn from_timestamp(created_at: DateTime<Utc>) -> Self {
        Self(created_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One generated image. Identity fields are fixed at creation; only
/// (`image_url`, `is_upscaled`) may change, together, at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub id: ImageId,
    pub prompt: String,
    pub image_url: String,
    pub timestamp: String,
    pub reference_image_url: Option<String>,
    pub is_upscaled: bool,
}

impl GeneratedImage {
    #[must_use]
    pub fn new(
        prompt: String,
        image_url: String,
        reference_image_url: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ImageId::from_timestamp(created_at),
            prompt,
            image_url,
            timestamp: created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            reference_image_url,
            is_upscaled: false,
        }
    }
}

/// Most-recent-first list of generated images. Append-only within a session;
/// the single mutation is the in-place swap performed by an upscale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<GeneratedImage>,
}

impl History {
    pub fn append(&mut self, record: GeneratedImage) {
        self.entries.push_front(record);
    }

    /// Marks the matching record as upscaled and swaps its image. Returns
    /// whether a record was updated; unknown ids are a no-op.
    pub fn replace_image(&mut self, id: &ImageId, new_image_url: String) -> bool {
        match self.entries.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.image_url = new_image_url;
                record.is_upscaled = true;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImage> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The authenticated account. One shared instance owned by the model; every
/// mutation goes through these methods so the invariants hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identifier: String,
    pub credit_balance: u32,
    pub plan: PlanTier,
    pub daily_generation_count: u32,
    pub last_generation_date: NaiveDate,
}

impl Session {
    #[must_use]
    pub fn new(identifier: String, today: NaiveDate) -> Self {
        Self {
            identifier,
            credit_balance: STARTING_CREDITS,
            plan: PlanTier::Free,
            daily_generation_count: 0,
            last_generation_date: today,
        }
    }

    /// Clamped at zero; the balance never goes negative.
    pub fn deduct_credits(&mut self, amount: u32) {
        self.credit_balance = self.credit_balance.saturating_sub(amount);
    }

    /// Counts a Free-tier generation against the daily quota. Paid tiers pay
    /// with credits instead, so this is a no-op for them.
    pub fn record_free_generation(&mut self) {
        if self.plan.is_free() {
            self.daily_generation_count += 1;
        }
    }

    pub fn purchase_plan(&mut self, plan: &Plan) {
        self.credit_balance += plan.credit_grant;
        self.plan = plan.tier;
    }

    /// Resets the daily counter once per calendar-day change. Safe to call on
    /// every state observation; repeated calls on the same day do nothing.
    /// The counter is only meaningful on the Free tier.
    pub fn rollover_daily_count(&mut self, today: NaiveDate) {
        if self.plan.is_free() && self.last_generation_date != today {
            self.daily_generation_count = 0;
            self.last_generation_date = today;
        }
    }

    #[must_use]
    pub fn generations_left(&self) -> u32 {
        DAILY_FREE_LIMIT.saturating_sub(self.daily_generation_count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    Generate,
    History,
    Profile,
}

/// Two-step sign-in gate. Purely a demo flow: the "sent" code is fixed and
/// nothing is verified server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthPhase {
    #[default]
    AwaitingIdentifier,
    SendingCode {
        identifier: String,
    },
    AwaitingCode {
        identifier: String,
    },
}

/// Generate and upscale are mutually exclusive against the displayed image
/// slot, so a single phase value gates both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowPhase {
    #[default]
    Idle,
    Submitting,
    Upscaling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl AspectRatio {
    #[must_use]
    pub const fn ratio(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Square => "Square",
            Self::Landscape => "Landscape",
            Self::Portrait => "Portrait",
        }
    }
}

/// A staged reference image, encoded once for both preview and upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedReference {
    pub image_base64: String,
    pub mime_type: String,
    pub preview_uri: String,
}

// Payloads are large and uninteresting; log sizes, not contents.
impl fmt::Debug for StagedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedReference")
            .field("mime_type", &self.mime_type)
            .field("image_base64_len", &self.image_base64.len())
            .finish()
    }
}

/// Bookkeeping for an in-flight generation. The op id ties the completion
/// event back to this attempt; anything else that comes back is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGeneration {
    pub op_id: Uuid,
    pub prompt: String,
    pub reference_preview: Option<String>,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpscale {
    pub op_id: Uuid,
    pub target: ImageId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub auth: AuthPhase,
    pub session: Option<Session>,
    pub active_screen: Screen,

    // Generate workflow
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference: Option<StagedReference>,
    pub current_image: Option<GeneratedImage>,
    pub workflow: WorkflowPhase,
    pub pending_generation: Option<PendingGeneration>,
    pub pending_upscale: Option<PendingUpscale>,

    pub history: History,

    pub active_error: Option<AppError>,
}

impl Model {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }
}
