//! The app: event handling and the view projection.
//!
//! `update` is the single mutation point for the whole model. Every handler
//! finishes by asking the shell to re-render when something observable
//! changed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capabilities::{Capabilities, ImageGenResult};
use crate::event::Event;
use crate::media;
use crate::model::{
    AspectRatio, AuthPhase, GeneratedImage, Model, PendingGeneration, PendingUpscale, Screen,
    Session, StagedReference, WorkflowPhase,
};
use crate::plans::{self, PlanTier};
use crate::{
    AppError, ErrorKind, DAILY_FREE_LIMIT, DEMO_OTP_CODE, GENERATION_FAILED_MESSAGE,
    MAX_REFERENCE_IMAGE_BYTES, OTP_SEND_DELAY_MS, PROMPT_STYLE_PREFIX, REFERENCE_GENERATION_COST,
    TEXT_GENERATION_COST, UPSCALE_COST, UPSCALE_FAILED_MESSAGE, UPSCALE_INSTRUCTION,
};

#[derive(Default)]
pub struct App;

impl App {
    fn check_eligibility(session: &Session, cost: u32) -> Result<(), AppError> {
        if session.plan.is_free() {
            if session.daily_generation_count >= DAILY_FREE_LIMIT {
                return Err(AppError::new(
                    ErrorKind::Eligibility,
                    format!(
                        "You've reached your daily limit of {DAILY_FREE_LIMIT} free generations."
                    ),
                ));
            }
        } else if session.credit_balance < cost {
            return Err(AppError::new(ErrorKind::Eligibility, "Not enough credits!"));
        }
        Ok(())
    }

    fn begin_generation(model: &mut Model, caps: &Capabilities) {
        let Some(session) = model.session.as_ref() else {
            return;
        };
        if model.workflow != WorkflowPhase::Idle {
            return;
        }

        let prompt = model.prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }

        let cost = if model.reference.is_some() {
            REFERENCE_GENERATION_COST
        } else {
            TEXT_GENERATION_COST
        };

        if let Err(error) = Self::check_eligibility(session, cost) {
            model.set_error(error);
            caps.render.render();
            return;
        }

        let op_id = Uuid::new_v4();
        model.pending_generation = Some(PendingGeneration {
            op_id,
            prompt: prompt.clone(),
            reference_preview: model.reference.as_ref().map(|r| r.preview_uri.clone()),
            cost,
        });
        model.workflow = WorkflowPhase::Submitting;
        model.clear_error();

        match model.reference.as_ref() {
            Some(reference) => caps.image_gen.generate_with_reference(
                prompt,
                reference.image_base64.clone(),
                reference.mime_type.clone(),
                move |result| Event::GenerationCompleted {
                    op_id,
                    result: Box::new(result),
                },
            ),
            None => caps.image_gen.generate_from_text(
                format!("{PROMPT_STYLE_PREFIX}{prompt}"),
                model.aspect_ratio,
                move |result| Event::GenerationCompleted {
                    op_id,
                    result: Box::new(result),
                },
            ),
        }

        caps.render.render();
    }

    fn finish_generation(
        op_id: Uuid,
        result: ImageGenResult,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if !model
            .pending_generation
            .as_ref()
            .is_some_and(|p| p.op_id == op_id)
        {
            tracing::debug!(%op_id, "ignoring stale generation completion");
            return;
        }
        let Some(pending) = model.pending_generation.take() else {
            return;
        };
        model.workflow = WorkflowPhase::Idle;

        match result {
            Ok(output) => {
                let image_url = media::data_uri(&output.mime_type, &output.image_base64);
                let record = GeneratedImage::new(
                    pending.prompt,
                    image_url,
                    pending.reference_preview,
                    Utc::now(),
                );
                model.history.append(record.clone());
                model.current_image = Some(record);

                // Exactly one of the two accounting paths, never both.
                if let Some(session) = model.session.as_mut() {
                    if session.plan.is_free() {
                        session.record_free_generation();
                        session.last_generation_date = Utc::now().date_naive();
                    } else {
                        session.deduct_credits(pending.cost);
                    }
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "image generation failed");
                model.set_error(
                    AppError::new(ErrorKind::Generation, GENERATION_FAILED_MESSAGE)
                        .with_internal(error.to_string()),
                );
            }
        }

        caps.render.render();
    }

    fn begin_upscale(model: &mut Model, caps: &Capabilities) {
        let Some(session) = model.session.as_ref() else {
            return;
        };
        if model.workflow != WorkflowPhase::Idle {
            return;
        }
        let Some(image) = model.current_image.as_ref() else {
            return;
        };
        if image.is_upscaled {
            return;
        }

        if session.credit_balance < UPSCALE_COST {
            model.set_error(AppError::new(
                ErrorKind::Eligibility,
                format!("Not enough credits for upscaling! ({UPSCALE_COST} required)"),
            ));
            caps.render.render();
            return;
        }

        let parts = match media::parse_data_uri(&image.image_url) {
            Ok(parts) => parts,
            Err(error) => {
                model.set_error(error);
                caps.render.render();
                return;
            }
        };

        let op_id = Uuid::new_v4();
        model.pending_upscale = Some(PendingUpscale {
            op_id,
            target: image.id.clone(),
        });
        model.workflow = WorkflowPhase::Upscaling;
        model.clear_error();

        caps.image_gen.upscale(
            parts.base64_payload,
            parts.mime_type,
            UPSCALE_INSTRUCTION.to_string(),
            move |result| Event::UpscaleCompleted {
                op_id,
                result: Box::new(result),
            },
        );

        caps.render.render();
    }

    fn finish_upscale(op_id: Uuid, result: ImageGenResult, model: &mut Model, caps: &Capabilities) {
        if !model
            .pending_upscale
            .as_ref()
            .is_some_and(|p| p.op_id == op_id)
        {
            tracing::debug!(%op_id, "ignoring stale upscale completion");
            return;
        }
        let Some(pending) = model.pending_upscale.take() else {
            return;
        };
        model.workflow = WorkflowPhase::Idle;

        match result {
            Ok(output) => {
                let new_url = media::data_uri(&output.mime_type, &output.image_base64);

                // Displayed image and its history record change identically.
                if let Some(current) = model.current_image.as_mut() {
                    if current.id == pending.target {
                        current.image_url = new_url.clone();
                        current.is_upscaled = true;
                    }
                }
                model.history.replace_image(&pending.target, new_url);

                if let Some(session) = model.session.as_mut() {
                    session.deduct_credits(UPSCALE_COST);
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "image upscale failed");
                model.set_error(
                    AppError::new(ErrorKind::Generation, UPSCALE_FAILED_MESSAGE)
                        .with_internal(error.to_string()),
                );
            }
        }

        caps.render.render();
    }

    fn reset_to_signed_out(model: &mut Model) {
        *model = Model::default();
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        tracing::debug!(event = event.name(), "update");

        // The daily quota follows the calendar, not the session: refresh it
        // on every observation so a stale counter never blocks a generation.
        if let Some(session) = model.session.as_mut() {
            session.rollover_daily_count(Utc::now().date_naive());
        }

        match event {
            Event::IdentifierSubmitted { identifier } => {
                if !matches!(model.auth, AuthPhase::AwaitingIdentifier) || model.session.is_some() {
                    return;
                }
                let identifier = identifier.trim().to_string();
                if identifier.is_empty() {
                    return;
                }
                model.auth = AuthPhase::SendingCode { identifier };
                caps.delay.start(OTP_SEND_DELAY_MS, Event::OtpSendElapsed);
                caps.render.render();
            }

            Event::OtpSendElapsed => {
                if let AuthPhase::SendingCode { identifier } = &model.auth {
                    model.auth = AuthPhase::AwaitingCode {
                        identifier: identifier.clone(),
                    };
                    caps.render.render();
                }
            }

            Event::CodeSubmitted { code } => {
                let AuthPhase::AwaitingCode { identifier } = &model.auth else {
                    return;
                };
                if code == DEMO_OTP_CODE {
                    model.session = Some(Session::new(identifier.clone(), Utc::now().date_naive()));
                    model.auth = AuthPhase::AwaitingIdentifier;
                    model.active_screen = Screen::Generate;
                    model.clear_error();
                } else {
                    model.set_error(AppError::new(
                        ErrorKind::Validation,
                        format!("Invalid code. Please use {DEMO_OTP_CODE} for this demo."),
                    ));
                }
                caps.render.render();
            }

            Event::AuthBackRequested => {
                if matches!(model.auth, AuthPhase::AwaitingCode { .. }) {
                    model.auth = AuthPhase::AwaitingIdentifier;
                    model.clear_error();
                    caps.render.render();
                }
            }

            Event::LogoutRequested => {
                if model.session.is_none() {
                    return;
                }
                // Also drops any pending op id, so an in-flight completion
                // can never land on a fresh session.
                Self::reset_to_signed_out(model);
                caps.render.render();
            }

            Event::ScreenSelected { screen } => {
                if model.session.is_some() {
                    model.active_screen = screen;
                    caps.render.render();
                }
            }

            Event::PromptChanged { text } => {
                model.prompt = text;
                caps.render.render();
            }

            Event::AspectRatioSelected { ratio } => {
                model.aspect_ratio = ratio;
                caps.render.render();
            }

            Event::ReferenceImageAttached { data, mime_type } => {
                if data.len() > MAX_REFERENCE_IMAGE_BYTES {
                    model.set_error(AppError::new(
                        ErrorKind::Validation,
                        format!(
                            "The reference image is too large. Please use an image smaller than {} MB.",
                            MAX_REFERENCE_IMAGE_BYTES / 1_000_000
                        ),
                    ));
                    caps.render.render();
                    return;
                }
                let image_base64 = media::encode_base64(&data);
                let preview_uri = media::data_uri(&mime_type, &image_base64);
                model.reference = Some(StagedReference {
                    image_base64,
                    mime_type,
                    preview_uri,
                });
                caps.render.render();
            }

            Event::ReferenceImageCleared => {
                model.reference = None;
                caps.render.render();
            }

            Event::GenerateRequested => Self::begin_generation(model, caps),

            Event::GenerationCompleted { op_id, result } => {
                Self::finish_generation(op_id, *result, model, caps);
            }

            Event::UpscaleRequested => Self::begin_upscale(model, caps),

            Event::UpscaleCompleted { op_id, result } => {
                Self::finish_upscale(op_id, *result, model, caps);
            }

            Event::DownloadRequested => {
                if let Some(image) = &model.current_image {
                    let filename = media::download_filename(&image.prompt, &image.image_url);
                    caps.file_saver.save(image.image_url.clone(), filename);
                }
            }

            Event::PurchaseRequested { tier } => {
                let Some(session) = model.session.as_mut() else {
                    return;
                };
                let Some(plan) = plans::find(tier) else {
                    return;
                };
                session.purchase_plan(plan);
                model.active_screen = Screen::Profile;
                caps.render.render();
            }

            Event::ErrorDismissed => {
                model.clear_error();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        let auth = match (&model.session, &model.auth) {
            (Some(_), _) => AuthView::SignedIn,
            (None, AuthPhase::AwaitingIdentifier) => AuthView::AwaitingIdentifier,
            (None, AuthPhase::SendingCode { identifier }) => AuthView::SendingCode {
                identifier: identifier.clone(),
            },
            (None, AuthPhase::AwaitingCode { identifier }) => AuthView::AwaitingCode {
                identifier: identifier.clone(),
                demo_code_hint: DEMO_OTP_CODE.to_string(),
            },
        };

        let main = model.session.as_ref().map(|session| {
            let generation_cost = if model.reference.is_some() {
                REFERENCE_GENERATION_COST
            } else {
                TEXT_GENERATION_COST
            };

            let generations_left = session.plan.is_free().then(|| session.generations_left());

            let can_generate = model.workflow == WorkflowPhase::Idle
                && !model.prompt.trim().is_empty()
                && Self::check_eligibility(session, generation_cost).is_ok();

            let current_image = model.current_image.as_ref().map(|image| CurrentImageView {
                id: image.id.as_str().to_string(),
                prompt: image.prompt.clone(),
                image_url: image.image_url.clone(),
                is_upscaled: image.is_upscaled,
                can_upscale: !image.is_upscaled
                    && model.workflow == WorkflowPhase::Idle
                    && session.credit_balance >= UPSCALE_COST,
            });

            let history = model
                .history
                .iter()
                .map(|record| HistoryItem {
                    id: record.id.as_str().to_string(),
                    prompt: record.prompt.clone(),
                    image_url: record.image_url.clone(),
                    timestamp: record.timestamp.clone(),
                    reference_image_url: record.reference_image_url.clone(),
                    is_upscaled: record.is_upscaled,
                })
                .collect();

            let plans = plans::CATALOG
                .iter()
                .map(|plan| PlanView {
                    tier: plan.tier,
                    name: plan.tier.label().to_string(),
                    price: plan.price.to_string(),
                    credit_grant: plan.credit_grant,
                    features: plan.features.iter().map(ToString::to_string).collect(),
                    popular: plan.popular,
                })
                .collect();

            MainView {
                active_screen: model.active_screen,
                generate: GenerateView {
                    prompt: model.prompt.clone(),
                    aspect_ratio: model.aspect_ratio,
                    generation_cost,
                    upscale_cost: UPSCALE_COST,
                    is_free_plan: session.plan.is_free(),
                    generations_left,
                    credit_balance: session.credit_balance,
                    can_generate,
                    is_generating: model.workflow == WorkflowPhase::Submitting,
                    is_upscaling: model.workflow == WorkflowPhase::Upscaling,
                    reference_preview: model.reference.as_ref().map(|r| r.preview_uri.clone()),
                    current_image,
                },
                history,
                profile: ProfileView {
                    identifier: session.identifier.clone(),
                    plan: session.plan,
                    plan_label: session.plan.label().to_string(),
                    credit_balance: session.credit_balance,
                    generations_left,
                    plans,
                    payment_badges: plans::PAYMENT_BADGES
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                },
            }
        });

        let error = model.active_error.as_ref().map(|error| ErrorView {
            code: error.code().to_string(),
            message: error.message.clone(),
        });

        ViewModel { auth, main, error }
    }
}

/// Serializable snapshot handed to the shell on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub auth: AuthView,
    /// Present only when signed in; the shell shows the login flow otherwise.
    pub main: Option<MainView>,
    pub error: Option<ErrorView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthView {
    AwaitingIdentifier,
    SendingCode {
        identifier: String,
    },
    AwaitingCode {
        identifier: String,
        demo_code_hint: String,
    },
    SignedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainView {
    pub active_screen: Screen,
    pub generate: GenerateView,
    pub history: Vec<HistoryItem>,
    pub profile: ProfileView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateView {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub generation_cost: u32,
    pub upscale_cost: u32,
    pub is_free_plan: bool,
    /// `None` on paid tiers, where credits are authoritative.
    pub generations_left: Option<u32>,
    pub credit_balance: u32,
    pub can_generate: bool,
    pub is_generating: bool,
    pub is_upscaling: bool,
    pub reference_preview: Option<String>,
    pub current_image: Option<CurrentImageView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentImageView {
    pub id: String,
    pub prompt: String,
    pub image_url: String,
    pub is_upscaled: bool,
    pub can_upscale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub prompt: String,
    pub image_url: String,
    pub timestamp: String,
    pub reference_image_url: Option<String>,
    pub is_upscaled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub identifier: String,
    pub plan: PlanTier,
    pub plan_label: String,
    pub credit_balance: u32,
    pub generations_left: Option<u32>,
    pub plans: Vec<PlanView>,
    pub payment_badges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanView {
    pub tier: PlanTier,
    pub name: String,
    pub price: String,
    pub credit_grant: u32,
    pub features: Vec<String>,
    pub popular: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorView {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crux_core::App as _;

    fn free_session() -> Session {
        Session::new("alice@example.com".into(), Utc::now().date_naive())
    }

    mod eligibility_tests {
        use super::*;

        #[test]
        fn free_tier_is_gated_by_the_daily_limit_not_credits() {
            let mut session = free_session();
            session.credit_balance = 0;
            assert!(App::check_eligibility(&session, TEXT_GENERATION_COST).is_ok());

            session.daily_generation_count = DAILY_FREE_LIMIT;
            let error = App::check_eligibility(&session, TEXT_GENERATION_COST).unwrap_err();
            assert_eq!(error.kind, ErrorKind::Eligibility);
            assert!(error.message.contains("daily limit of 10"));
        }

        #[test]
        fn paid_tier_is_gated_by_credits_not_the_daily_limit() {
            let mut session = free_session();
            session.plan = PlanTier::Pro;
            session.daily_generation_count = DAILY_FREE_LIMIT + 5;
            session.credit_balance = 15;

            assert!(App::check_eligibility(&session, TEXT_GENERATION_COST).is_ok());

            let error = App::check_eligibility(&session, REFERENCE_GENERATION_COST).unwrap_err();
            assert_eq!(error.kind, ErrorKind::Eligibility);
            assert!(error.message.contains("credits"));
        }
    }

    mod view_tests {
        use super::*;

        #[test]
        fn signed_out_view_has_no_main_content() {
            let model = Model::default();
            let view = App.view(&model);
            assert_eq!(view.auth, AuthView::AwaitingIdentifier);
            assert!(view.main.is_none());
            assert!(view.error.is_none());
        }

        #[test]
        fn free_tier_view_reports_remaining_generations() {
            let mut model = Model {
                session: Some(free_session()),
                prompt: "a red fox".into(),
                ..Model::default()
            };
            model.session.as_mut().unwrap().daily_generation_count = 3;

            let view = App.view(&model);
            let main = view.main.unwrap();
            assert!(main.generate.is_free_plan);
            assert_eq!(main.generate.generations_left, Some(7));
            assert!(main.generate.can_generate);
            assert_eq!(main.generate.generation_cost, TEXT_GENERATION_COST);
        }

        #[test]
        fn paid_tier_view_hides_the_daily_counter() {
            let mut model = Model {
                session: Some(free_session()),
                ..Model::default()
            };
            let session = model.session.as_mut().unwrap();
            session.plan = PlanTier::Max;

            let view = App.view(&model);
            let main = view.main.unwrap();
            assert!(!main.generate.is_free_plan);
            assert_eq!(main.generate.generations_left, None);
            assert_eq!(main.profile.generations_left, None);
        }

        #[test]
        fn reference_attachment_raises_the_displayed_cost() {
            let model = Model {
                session: Some(free_session()),
                reference: Some(StagedReference {
                    image_base64: "QUJD".into(),
                    mime_type: "image/png".into(),
                    preview_uri: "data:image/png;base64,QUJD".into(),
                }),
                ..Model::default()
            };

            let view = App.view(&model);
            let generate = view.main.unwrap().generate;
            assert_eq!(generate.generation_cost, REFERENCE_GENERATION_COST);
            assert_eq!(
                generate.reference_preview.as_deref(),
                Some("data:image/png;base64,QUJD")
            );
        }

        #[test]
        fn upscaled_image_cannot_be_upscaled_again() {
            let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
            let mut image = GeneratedImage::new(
                "fox".into(),
                "data:image/png;base64,xx".into(),
                None,
                at,
            );
            image.is_upscaled = true;

            let model = Model {
                session: Some(free_session()),
                current_image: Some(image),
                ..Model::default()
            };

            let view = App.view(&model);
            let current = view.main.unwrap().generate.current_image.unwrap();
            assert!(current.is_upscaled);
            assert!(!current.can_upscale);
        }

        #[test]
        fn busy_workflow_blocks_generate_and_upscale() {
            let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
            let model = Model {
                session: Some(free_session()),
                prompt: "fox".into(),
                workflow: WorkflowPhase::Submitting,
                current_image: Some(GeneratedImage::new(
                    "fox".into(),
                    "data:image/png;base64,xx".into(),
                    None,
                    at,
                )),
                ..Model::default()
            };

            let view = App.view(&model);
            let generate = view.main.unwrap().generate;
            assert!(generate.is_generating);
            assert!(!generate.can_generate);
            assert!(!generate.current_image.unwrap().can_upscale);
        }

        #[test]
        fn profile_lists_the_catalog_and_payment_badges() {
            let model = Model {
                session: Some(free_session()),
                ..Model::default()
            };
            let view = App.view(&model);
            let profile = view.main.unwrap().profile;
            assert_eq!(profile.plans.len(), 2);
            assert_eq!(profile.plans[0].name, "Pro");
            assert!(profile.plans[0].popular);
            assert_eq!(profile.payment_badges.len(), 3);
        }

        #[test]
        fn errors_surface_with_a_machine_readable_code() {
            let mut model = Model::default();
            model.set_error(AppError::new(ErrorKind::Eligibility, "Not enough credits!"));

            let view = App.view(&model);
            let error = view.error.unwrap();
            assert_eq!(error.code, "ELIGIBILITY_ERROR");
            assert_eq!(error.message, "Not enough credits!");
        }
    }
}
