//! Record lifecycle engine
//!
//! `New → InStorage → Released`. Every transition is a compare-and-set
//! inside one redb write transaction; the CRM push that follows is best
//! effort and never rolls the local transition back.

use std::sync::Arc;

use serde::Serialize;
use shared::models::{
    PushOutcome, RecordFields, RecordStatus, RecordView, StorageRecord,
};
use shared::util::now_millis;

use super::error::RecordError;
use super::push::PushPolicy;
use super::status_label::StatusMapping;
use super::validation::{normalize_fields, validate_fields};
use crate::crm::{CrmError, MappedOrder, OrderApi};
use crate::db::{BatchInsert, NewRecord, RecordStore};

/// Actor recorded on reconciled records
pub const CRM_ACTOR: &str = "retailcrm";

/// A completed transition and what happened to its CRM push
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub record: StorageRecord,
    pub push: PushOutcome,
}

pub struct LifecycleEngine {
    store: RecordStore,
    api: Option<Arc<dyn OrderApi>>,
    policy: PushPolicy,
    mapping: StatusMapping,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("crm_linked", &self.api.is_some())
            .field("policy", &self.policy)
            .field("mapping", &self.mapping)
            .finish()
    }
}

impl LifecycleEngine {
    pub fn new(
        store: RecordStore,
        api: Option<Arc<dyn OrderApi>>,
        policy: PushPolicy,
        mapping: StatusMapping,
    ) -> Self {
        Self {
            store,
            api,
            policy,
            mapping,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn mapping(&self) -> &StatusMapping {
        &self.mapping
    }

    /// Attach the derived status label
    pub fn view(&self, record: StorageRecord) -> RecordView {
        let label = self.mapping.label_for(&record);
        RecordView {
            status_label: label.text().to_string(),
            status_mismatch: label.is_mismatch(),
            record,
        }
    }

    pub fn get(&self, record_id: &str) -> Result<StorageRecord, RecordError> {
        self.store
            .get_record(record_id)?
            .ok_or_else(|| RecordError::NotFound(record_id.to_string()))
    }

    // ========== Creation ==========

    /// Walk-in intake: validated against the form schema, stored immediately
    pub fn create_direct(
        &self,
        fields: RecordFields,
        actor: &str,
    ) -> Result<StorageRecord, RecordError> {
        let fields = normalize_fields(fields);
        let schema = self.store.form_config()?;
        validate_fields(&schema, &fields)?;

        let record = self.store.insert_record(NewRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            status: RecordStatus::InStorage,
            fields,
            created_at: now_millis(),
            created_by: actor.to_string(),
            external_ref: None,
        })?;

        tracing::info!(
            record_id = %record.record_id,
            sequence_number = record.sequence_number,
            actor = %actor,
            "Record created"
        );
        Ok(record)
    }

    /// Mirror one CRM order; `None` if it is already known
    pub fn create_from_external(
        &self,
        mapped: MappedOrder,
    ) -> Result<Option<StorageRecord>, RecordError> {
        let mut result = self.create_from_external_batch(vec![mapped])?;
        Ok(result.inserted.pop())
    }

    /// Mirror many CRM orders in one transaction, in input order
    pub fn create_from_external_batch(
        &self,
        batch: Vec<MappedOrder>,
    ) -> Result<BatchInsert, RecordError> {
        let created_at = now_millis();
        let batch = batch
            .into_iter()
            .map(|mapped| NewRecord {
                record_id: uuid::Uuid::new_v4().to_string(),
                status: RecordStatus::New,
                fields: mapped.fields,
                created_at,
                created_by: CRM_ACTOR.to_string(),
                external_ref: Some(mapped.external),
            })
            .collect();
        Ok(self.store.insert_batch(batch)?)
    }

    /// Record the CRM's current status for orders already mirrored
    ///
    /// Feeds the sentinel check in [`check_transition`].
    pub fn refresh_external_statuses(
        &self,
        statuses: &[(String, String)],
    ) -> Result<usize, RecordError> {
        Ok(self.store.refresh_external_statuses(statuses)?)
    }

    // ========== Transitions ==========

    /// `New → InStorage`
    pub async fn take_into_storage(
        &self,
        record_id: &str,
        actor: &str,
    ) -> Result<Transition, RecordError> {
        let sentinel = self.mapping.stored.clone();
        let (record, ()) = self.store.update_record(record_id, |record| {
            check_transition(record, RecordStatus::New, &sentinel)?;
            record.status = RecordStatus::InStorage;
            record.stored_at = Some(now_millis());
            record.stored_by = Some(actor.to_string());
            Ok::<_, RecordError>(())
        })?;

        tracing::info!(record_id = %record_id, actor = %actor, "Record taken into storage");
        Ok(self.push_status(record, &sentinel).await)
    }

    /// `InStorage → Released`
    pub async fn release(&self, record_id: &str, actor: &str) -> Result<Transition, RecordError> {
        let sentinel = self.mapping.released.clone();
        let (record, ()) = self.store.update_record(record_id, |record| {
            check_transition(record, RecordStatus::InStorage, &sentinel)?;
            record.status = RecordStatus::Released;
            record.released_at = Some(now_millis());
            record.released_by = Some(actor.to_string());
            Ok::<_, RecordError>(())
        })?;

        tracing::info!(record_id = %record_id, actor = %actor, "Record released");
        Ok(self.push_status(record, &sentinel).await)
    }

    /// Push the CRM status matching the local state again
    ///
    /// Shares the attempt budget with the transitions. A record whose CRM
    /// status already matches is reported as pushed without a new call.
    pub async fn retry_push(&self, record_id: &str) -> Result<Transition, RecordError> {
        let record = self.get(record_id)?;
        let Some(external) = &record.external_ref else {
            return Err(RecordError::NotExternal(record_id.to_string()));
        };
        let Some(target) = self.mapping.target_for(record.status).map(str::to_string) else {
            return Err(RecordError::InvalidTransition {
                current: record.status,
                expected: RecordStatus::InStorage,
            });
        };

        if external.status == target {
            return Ok(Transition {
                record,
                push: PushOutcome::Pushed { status: target },
            });
        }
        Ok(self.push_status(record, &target).await)
    }

    // ========== CRM push ==========

    /// Best-effort push of `target` to the CRM, bounded by the policy
    ///
    /// The attempt is persisted before the network call. Bookkeeping
    /// failures are logged; the returned record is the freshest we have.
    async fn push_status(&self, record: StorageRecord, target: &str) -> Transition {
        let Some(external) = &record.external_ref else {
            return Transition {
                record,
                push: PushOutcome::NotLinked,
            };
        };
        let order_number = external.order_number.clone();

        let Some(api) = &self.api else {
            tracing::warn!(record_id = %record.record_id, "CRM not configured, status not pushed");
            let attempt = external.sync_attempts;
            return Transition {
                record,
                push: PushOutcome::Failed {
                    attempt,
                    error: CrmError::NotConfigured.to_string(),
                },
            };
        };

        let policy = self.policy;
        let reserved = self.store.update_record(&record.record_id, |r| {
            let attempt = r.external_ref.as_mut().and_then(|ext| policy.begin_attempt(ext));
            Ok::<_, RecordError>(attempt)
        });
        let (record, attempt) = match reserved {
            Ok((updated, Some(attempt))) => (updated, attempt),
            Ok((updated, None)) => {
                let attempts = updated
                    .external_ref
                    .as_ref()
                    .map(|ext| ext.sync_attempts)
                    .unwrap_or_default();
                tracing::warn!(
                    record_id = %updated.record_id,
                    attempts,
                    "CRM push attempts exhausted"
                );
                return Transition {
                    record: updated,
                    push: PushOutcome::Exhausted { attempts },
                };
            }
            Err(e) => {
                tracing::error!(record_id = %record.record_id, error = %e, "Failed to reserve push attempt");
                return Transition {
                    push: PushOutcome::Failed {
                        attempt: 0,
                        error: e.to_string(),
                    },
                    record,
                };
            }
        };

        let result = api.set_order_status(&order_number, target).await;
        let error = result.as_ref().err().map(ToString::to_string);
        let recorded = self.store.update_record(&record.record_id, |r| {
            if let Some(ext) = r.external_ref.as_mut() {
                match &error {
                    None => {
                        ext.status = target.to_string();
                        ext.last_sync_error = None;
                        ext.last_synced_at = Some(now_millis());
                    }
                    Some(message) => ext.last_sync_error = Some(message.clone()),
                }
            }
            Ok::<_, RecordError>(())
        });
        let record = match recorded {
            Ok((updated, ())) => updated,
            Err(e) => {
                tracing::error!(record_id = %record.record_id, error = %e, "Failed to record push result");
                record
            }
        };

        let push = match error {
            None => {
                tracing::info!(
                    record_id = %record.record_id,
                    order_number = %order_number,
                    status = %target,
                    attempt,
                    "CRM status pushed"
                );
                PushOutcome::Pushed {
                    status: target.to_string(),
                }
            }
            Some(error) => {
                tracing::warn!(
                    record_id = %record.record_id,
                    order_number = %order_number,
                    attempt,
                    error = %error,
                    "CRM status push failed"
                );
                PushOutcome::Failed { attempt, error }
            }
        };
        Transition { record, push }
    }
}

/// Status precondition first, then the CRM sentinel guard
fn check_transition(
    record: &StorageRecord,
    expected: RecordStatus,
    sentinel: &str,
) -> Result<(), RecordError> {
    if record.status != expected {
        return Err(RecordError::InvalidTransition {
            current: record.status,
            expected,
        });
    }
    if let Some(ext) = &record.external_ref
        && ext.status == sentinel
    {
        return Err(RecordError::ConflictWithExternalState {
            external_status: ext.status.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::MockOrderApi;
    use shared::models::ExternalRef;

    struct Harness {
        engine: LifecycleEngine,
        api: Arc<MockOrderApi>,
    }

    fn harness() -> Harness {
        let api = Arc::new(MockOrderApi::new());
        let engine = LifecycleEngine::new(
            RecordStore::open_in_memory().unwrap(),
            Some(api.clone() as Arc<dyn OrderApi>),
            PushPolicy::default(),
            StatusMapping::default(),
        );
        Harness { engine, api }
    }

    fn intake_fields() -> RecordFields {
        [
            ("full_name", "Иван Петров"),
            ("phone", "+79001234567"),
            ("car_brand", "Lada Vesta"),
            ("parameters", "Nokian Nordman 7"),
            ("size", "4 шт."),
            ("storage_location", "Бекетова 3а.к15"),
        ]
        .into_iter()
        .collect()
    }

    fn mapped(external_id: &str, status: &str) -> MappedOrder {
        MappedOrder {
            external: ExternalRef::new(external_id, format!("{external_id}A"), status),
            fields: [("full_name", "Ivan Petrov"), ("size", "2 шт.")]
                .into_iter()
                .collect(),
        }
    }

    fn imported(h: &Harness, external_id: &str, status: &str) -> StorageRecord {
        h.engine
            .create_from_external(mapped(external_id, status))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_create_direct_numbers_increase() {
        let h = harness();
        let mut last = 0;
        for _ in 0..5 {
            let record = h.engine.create_direct(intake_fields(), "anna").unwrap();
            assert!(record.sequence_number > last);
            assert_eq!(record.status, RecordStatus::InStorage);
            assert_eq!(record.created_by, "anna");
            assert_eq!(record.stored_by.as_deref(), Some("anna"));
            last = record.sequence_number;
        }
    }

    #[test]
    fn test_create_direct_names_missing_field() {
        let h = harness();
        let mut fields = intake_fields();
        fields.insert("full_name", "");
        let err = h.engine.create_direct(fields, "anna").unwrap_err();
        assert!(matches!(err, RecordError::Validation { field, .. } if field == "full_name"));
        assert_eq!(h.engine.store().record_count().unwrap(), 0);
    }

    #[test]
    fn test_create_from_external_is_idempotent() {
        let h = harness();
        let first = h.engine.create_from_external(mapped("X1", "in-stock")).unwrap();
        let second = h.engine.create_from_external(mapped("X1", "in-stock")).unwrap();

        let first = first.unwrap();
        assert_eq!(first.status, RecordStatus::New);
        assert_eq!(first.created_by, CRM_ACTOR);
        assert!(second.is_none());
        assert_eq!(h.engine.store().record_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_take_pushes_stored_status() {
        let h = harness();
        let record = imported(&h, "X1", "in-stock");

        let t = h
            .engine
            .take_into_storage(&record.record_id, "boris")
            .await
            .unwrap();
        assert_eq!(t.record.status, RecordStatus::InStorage);
        assert_eq!(t.record.stored_by.as_deref(), Some("boris"));
        assert_eq!(
            t.push,
            PushOutcome::Pushed {
                status: "на хранении".into()
            }
        );

        let ext = t.record.external_ref.as_ref().unwrap();
        assert_eq!(ext.status, "на хранении");
        assert_eq!(ext.sync_attempts, 1);
        assert!(ext.last_synced_at.is_some());
        assert_eq!(
            h.api.pushes(),
            vec![("X1A".to_string(), "на хранении".to_string())]
        );
        assert!(!h.engine.view(t.record).status_mismatch);
    }

    #[tokio::test]
    async fn test_take_requires_new() {
        let h = harness();
        let record = h.engine.create_direct(intake_fields(), "anna").unwrap();

        let err = h
            .engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::InvalidTransition {
                current: RecordStatus::InStorage,
                expected: RecordStatus::New
            }
        ));
        assert_eq!(h.engine.get(&record.record_id).unwrap(), record);
    }

    #[tokio::test]
    async fn test_release_requires_in_storage() {
        let h = harness();
        let record = imported(&h, "X1", "in-stock");

        let err = h
            .engine
            .release(&record.record_id, "anna")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::InvalidTransition {
                current: RecordStatus::New,
                expected: RecordStatus::InStorage
            }
        ));
        assert_eq!(h.engine.get(&record.record_id).unwrap(), record);
        assert!(h.api.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_released_is_terminal() {
        let h = harness();
        let record = h.engine.create_direct(intake_fields(), "anna").unwrap();
        let t = h.engine.release(&record.record_id, "anna").await.unwrap();
        assert_eq!(t.record.status, RecordStatus::Released);
        assert_eq!(t.push, PushOutcome::NotLinked);

        let err = h.engine.release(&record.record_id, "anna").await.unwrap_err();
        assert!(matches!(err, RecordError::InvalidTransition { .. }));
        let err = h
            .engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_release_conflicts_with_released_external_status() {
        let h = harness();
        let record = imported(&h, "X1", "in-stock");
        h.engine
            .store()
            .update_record(&record.record_id, |r| {
                r.status = RecordStatus::InStorage;
                if let Some(ext) = r.external_ref.as_mut() {
                    ext.status = "выдан клиенту".into();
                }
                Ok::<_, RecordError>(())
            })
            .unwrap();

        let err = h
            .engine
            .release(&record.record_id, "anna")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::ConflictWithExternalState { ref external_status } if external_status == "выдан клиенту"
        ));
        let stored = h.engine.get(&record.record_id).unwrap();
        assert_eq!(stored.status, RecordStatus::InStorage);
        assert!(stored.released_at.is_none());
        assert!(h.api.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_take_conflicts_with_stored_external_status() {
        let h = harness();
        let record = imported(&h, "X1", "на хранении");

        let err = h
            .engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::ConflictWithExternalState { .. }));
        assert_eq!(
            h.engine.get(&record.record_id).unwrap().status,
            RecordStatus::New
        );
    }

    #[tokio::test]
    async fn test_failed_push_keeps_transition() {
        let h = harness();
        h.api.set_fail_pushes(true);
        let record = imported(&h, "X1", "in-stock");

        let t = h
            .engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();
        assert_eq!(t.record.status, RecordStatus::InStorage);
        assert!(matches!(t.push, PushOutcome::Failed { attempt: 1, .. }));

        let ext = t.record.external_ref.as_ref().unwrap();
        assert_eq!(ext.status, "in-stock");
        assert!(ext.last_sync_error.is_some());
        // CRM still says in-stock while the tire is stored
        assert!(h.engine.view(t.record).status_mismatch);
    }

    #[tokio::test]
    async fn test_repeated_take_is_rejected_without_push() {
        let h = harness();
        h.api.set_fail_pushes(true);
        let record = imported(&h, "X1", "in-stock");
        h.engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();

        // Only the first take transitions; the rest never reach the CRM
        for _ in 0..3 {
            let err = h
                .engine
                .take_into_storage(&record.record_id, "anna")
                .await
                .unwrap_err();
            assert!(matches!(err, RecordError::InvalidTransition { .. }));
        }
        assert_eq!(h.api.pushes().len(), 1);
        let stored = h.engine.get(&record.record_id).unwrap();
        assert_eq!(stored.external_ref.unwrap().sync_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_push_stops_at_cap() {
        let h = harness();
        h.api.set_fail_pushes(true);
        let record = imported(&h, "X1", "in-stock");
        h.engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();

        let mut outcomes = Vec::new();
        for _ in 0..4 {
            outcomes.push(h.engine.retry_push(&record.record_id).await.unwrap().push);
        }

        assert_eq!(h.api.pushes().len(), 3);
        assert!(matches!(outcomes[0], PushOutcome::Failed { attempt: 2, .. }));
        assert!(matches!(outcomes[1], PushOutcome::Failed { attempt: 3, .. }));
        assert_eq!(outcomes[2], PushOutcome::Exhausted { attempts: 3 });
        assert_eq!(outcomes[3], PushOutcome::Exhausted { attempts: 3 });
    }

    #[tokio::test]
    async fn test_take_and_release_share_budget() {
        let h = harness();
        h.api.set_fail_pushes(true);
        let record = imported(&h, "X1", "in-stock");
        h.engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();
        h.engine.retry_push(&record.record_id).await.unwrap();
        h.engine.retry_push(&record.record_id).await.unwrap();

        let t = h.engine.release(&record.record_id, "anna").await.unwrap();
        assert_eq!(t.record.status, RecordStatus::Released);
        assert_eq!(t.push, PushOutcome::Exhausted { attempts: 3 });
        assert_eq!(h.api.pushes().len(), 3);
    }

    #[tokio::test]
    async fn test_retry_push_after_recovery() {
        let h = harness();
        h.api.set_fail_pushes(true);
        let record = imported(&h, "X1", "in-stock");
        h.engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();

        h.api.set_fail_pushes(false);
        let t = h.engine.retry_push(&record.record_id).await.unwrap();
        assert_eq!(
            t.push,
            PushOutcome::Pushed {
                status: "на хранении".into()
            }
        );
        let ext = t.record.external_ref.unwrap();
        assert!(ext.last_sync_error.is_none());

        // Already in sync: no further call
        h.engine.retry_push(&record.record_id).await.unwrap();
        assert_eq!(h.api.pushes().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_push_rejects_local_and_new_records() {
        let h = harness();
        let local = h.engine.create_direct(intake_fields(), "anna").unwrap();
        assert!(matches!(
            h.engine.retry_push(&local.record_id).await.unwrap_err(),
            RecordError::NotExternal(_)
        ));

        let fresh = imported(&h, "X1", "in-stock");
        assert!(matches!(
            h.engine.retry_push(&fresh.record_id).await.unwrap_err(),
            RecordError::InvalidTransition { .. }
        ));

        assert!(matches!(
            h.engine.retry_push("missing").await.unwrap_err(),
            RecordError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_without_crm_client_push_is_not_attempted() {
        let engine = LifecycleEngine::new(
            RecordStore::open_in_memory().unwrap(),
            None,
            PushPolicy::default(),
            StatusMapping::default(),
        );
        let record = engine
            .create_from_external(mapped("X1", "in-stock"))
            .unwrap()
            .unwrap();

        let t = engine
            .take_into_storage(&record.record_id, "anna")
            .await
            .unwrap();
        assert!(matches!(t.push, PushOutcome::Failed { attempt: 0, .. }));
        assert_eq!(t.record.external_ref.unwrap().sync_attempts, 0);
    }
}
