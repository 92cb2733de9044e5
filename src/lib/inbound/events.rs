//! Auto-trigger subscriber: turns `CardCreated` events into pipeline runs.
//! This event-bus path is authoritative; the direct-invocation path in
//! [`crate::inbound::http::handlers::analyze`] still passes through the
//! same orchestrator idempotency gate.
//!
//! Bound to [`crate::outbound::event_bus::InProcessEventBus`]'s concrete
//! receiver rather than the `EventBus` port: publishing is the outbound
//! capability the pipeline depends on, but consuming is purely an inbound
//! wiring concern specific to the in-process transport chosen for this
//! deployment.

use tokio::sync::broadcast;

use crate::domain::pipeline::events::DomainEvent;
use crate::domain::pipeline::models::{PipelineInput, PipelineMode};
use crate::domain::pipeline::ports::PipelineService;

/// Consumes `receiver` until the channel closes, running the pipeline for
/// every `CardCreated` event. `CardValuationCompleted` events are ignored;
/// nothing in this deployment currently subscribes to them.
///
/// When `auto_trigger_revalue` is `false`, `CardCreated` events are
/// observed but not acted on — this deployment relies solely on direct
/// invocation (`inbound::http::handlers::analyze`) to start analysis. This
/// is the deliberate reading of `autoTriggerRevalue` adopted for this
/// build: the external create-card collaborator, which would be the
/// natural source of a dedicated "revalue requested" event, is out of
/// scope here, so a single flag gates the only inbound auto-trigger signal
/// actually available (see `DESIGN.md`).
pub async fn run<PS: PipelineService>(
    mut receiver: broadcast::Receiver<DomainEvent>,
    pipeline_service: PS,
    auto_trigger_revalue: bool,
) {
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Closed) => return,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged, some CardCreated events were dropped");
                continue;
            }
        };

        let DomainEvent::CardCreated(created) = event else {
            continue;
        };

        if !auto_trigger_revalue {
            tracing::debug!(card_id = %created.card_id, "auto-trigger disabled, ignoring CardCreated");
            continue;
        }

        let input = PipelineInput {
            user_id: created.user_id,
            card_id: created.card_id,
            request_id: format!("card-created:{}", created.card_id),
            image_ref: created.front_s3_key,
            expected_set: None,
            expected_rarity: None,
            mode: PipelineMode::NewCard,
            force_refresh: false,
        };

        let card_id = input.card_id;
        match pipeline_service.submit(input).await {
            Ok(_) => tracing::info!(card_id = %card_id, "auto-triggered analysis completed"),
            Err(error) => tracing::error!(card_id = %card_id, error = %error, "auto-triggered analysis failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::card::models::Card;
    use crate::domain::pipeline::events::CardCreated;
    use crate::domain::pipeline::models::PipelineOutcome;

    #[derive(Clone)]
    struct CountingPipelineService(Arc<AtomicUsize>);

    impl PipelineService for CountingPipelineService {
        async fn submit(&self, input: PipelineInput) -> anyhow::Result<PipelineOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PipelineOutcome::Completed(Card {
                user_id: input.user_id,
                card_id: input.card_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
                front_image_ref: input.image_ref,
                back_image_ref: None,
                identification: None,
                pricing: None,
                authenticity: None,
                ocr_metadata: None,
            }))
        }
    }

    fn card_created_event() -> DomainEvent {
        DomainEvent::CardCreated(CardCreated {
            card_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            front_s3_key: "images/front.jpg".to_string(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn card_created_triggers_submission_when_auto_trigger_enabled() {
        let (sender, receiver) = tokio::sync::broadcast::channel(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let service = CountingPipelineService(calls.clone());

        sender.send(card_created_event()).unwrap();
        drop(sender);

        run(receiver, service, true).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn card_created_is_ignored_when_auto_trigger_disabled() {
        let (sender, receiver) = tokio::sync::broadcast::channel(4);
        let calls = Arc::new(AtomicUsize::new(0));
        let service = CountingPipelineService(calls.clone());

        sender.send(card_created_event()).unwrap();
        drop(sender);

        run(receiver, service, false).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
