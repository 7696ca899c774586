//! The registry: requirement store, certification registry and issuer
//! guard behind one serialized state machine.
//!
//! Mutations (`set_requirements`, `certify`, `revoke`, `transfer_issuer`)
//! take the write lock for the whole authorize / validate / apply / audit
//! step. Reads take the read lock and always see the last completed
//! mutation. If the audit sink rejects an event, the stored value is
//! restored before the error is returned, so no call ever half-applies.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, error, info, warn};

use crate::access::IssuerGuard;
use crate::audit::{AuditEntry, AuditEvent, AuditSink, MemoryAuditLog};
use crate::certification::{self, CertificationRecord, CertificationState, RevocationReason};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::identity::{ClassId, PrincipalId};
use crate::requirement::{evaluate_detailed, Claims, Evaluation, RequirementSet};
use crate::storage::{
    self, certification_key, certification_prefix, requirements_key, requirements_prefix,
    KeyValueStore, MemoryStore, ISSUER_KEY,
};

struct RegistryState<S> {
    guard: IssuerGuard,
    store: S,
}

/// Credential registry over a key-value store and an audit sink.
pub struct Registry<S: KeyValueStore = MemoryStore> {
    state: RwLock<RegistryState<S>>,
    audit: Arc<dyn AuditSink>,
    config: RegistryConfig,
}

impl Registry<MemoryStore> {
    /// A fresh registry with in-memory storage and audit log.
    pub fn in_memory(issuer: PrincipalId) -> Result<Self> {
        Self::initialize(
            issuer,
            MemoryStore::new(),
            Arc::new(MemoryAuditLog::new()),
            RegistryConfig::default(),
        )
    }
}

impl<S: KeyValueStore> Registry<S> {
    // ── Construction ──────────────────────────────────────────────────────────

    /// Initialize a new registry in `store` with `issuer` as the authority.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyInitialized` if the store already holds
    /// an issuer.
    pub fn initialize(
        issuer: PrincipalId,
        mut store: S,
        audit: Arc<dyn AuditSink>,
        config: RegistryConfig,
    ) -> Result<Self> {
        if store.get(ISSUER_KEY)?.is_some() {
            return Err(RegistryError::AlreadyInitialized);
        }
        store.put(ISSUER_KEY, &storage::encode(&issuer)?)?;
        info!("registry initialized with issuer {issuer}");

        Ok(Self {
            state: RwLock::new(RegistryState {
                guard: IssuerGuard::new(issuer),
                store,
            }),
            audit,
            config,
        })
    }

    /// Open a registry previously initialized in `store`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the store was never initialized.
    pub fn open(store: S, audit: Arc<dyn AuditSink>, config: RegistryConfig) -> Result<Self> {
        let issuer: PrincipalId = storage::load(&store, ISSUER_KEY)?.ok_or_else(|| {
            RegistryError::NotFound("registry issuer (registry not initialized)".into())
        })?;
        debug!("registry opened, issuer {issuer}");

        Ok(Self {
            state: RwLock::new(RegistryState {
                guard: IssuerGuard::new(issuer),
                store,
            }),
            audit,
            config,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The audit sink this registry writes to.
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RegistryState<S>>> {
        self.state
            .read()
            .map_err(|e| RegistryError::StorageError(format!("registry lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RegistryState<S>>> {
        self.state
            .write()
            .map_err(|e| RegistryError::StorageError(format!("registry lock poisoned: {e}")))
    }

    /// Store `value` under `key` and append `event`; undo the store write if
    /// the audit append fails.
    fn commit(
        audit: &dyn AuditSink,
        store: &mut S,
        key: &str,
        value: &[u8],
        event: AuditEvent,
    ) -> Result<AuditEntry> {
        let previous = store.get(key)?;
        store.put(key, value)?;

        match audit.append(event) {
            Ok(entry) => Ok(entry),
            Err(e) => {
                let restored = match previous {
                    Some(bytes) => store.put(key, &bytes),
                    None => store.delete(key).map(|_| ()),
                };
                if let Err(restore_err) = restored {
                    error!("failed to roll back {key} after audit error: {restore_err}");
                }
                Err(e)
            }
        }
    }

    // ── Access control ────────────────────────────────────────────────────────

    /// The current issuer.
    pub fn issuer(&self) -> Result<PrincipalId> {
        Ok(self.read()?.guard.issuer().clone())
    }

    /// Hand the issuer role to `new_issuer`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` unless `caller` is the issuer.
    pub fn transfer_issuer(&self, caller: &PrincipalId, new_issuer: PrincipalId) -> Result<bool> {
        let mut state = self.write()?;
        let mut guard = state.guard.clone();
        let previous = guard.transfer(caller, new_issuer.clone()).inspect_err(|_| {
            warn!("rejected issuer transfer by {caller}");
        })?;

        let event = AuditEvent::IssuerTransferred {
            previous: previous.clone(),
            new_issuer: new_issuer.clone(),
        };
        Self::commit(
            self.audit.as_ref(),
            &mut state.store,
            ISSUER_KEY,
            &storage::encode(&new_issuer)?,
            event,
        )?;
        state.guard = guard;

        info!("issuer transferred from {previous} to {new_issuer}");
        Ok(true)
    }

    // ── Requirement store ─────────────────────────────────────────────────────

    /// Replace the requirement set of `class`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` unless `caller` is the issuer,
    /// and `RegistryError::InvalidRequirement` if the set is too large, pairs
    /// an operator with a variant it is not defined for, or (with
    /// `strict_type_tags`) carries a mismatched metadata type tag.
    pub fn set_requirements(
        &self,
        caller: &PrincipalId,
        class: ClassId,
        requirements: RequirementSet,
    ) -> Result<bool> {
        let mut state = self.write()?;
        state.guard.authorize(caller).inspect_err(|_| {
            warn!("rejected requirement change for class {class} by {caller}");
        })?;

        if requirements.len() > self.config.max_clauses {
            return Err(RegistryError::InvalidRequirement {
                index: self.config.max_clauses,
                reason: format!(
                    "{} clauses exceeds the limit of {}",
                    requirements.len(),
                    self.config.max_clauses
                ),
            });
        }
        requirements.validate()?;

        for (index, clause) in requirements.clauses.iter().enumerate() {
            if clause.type_tag_matches() {
                continue;
            }
            let reason = format!(
                "type tag '{}' does not match {} value",
                clause.metadata.type_tag,
                clause.expected.kind()
            );
            if self.config.strict_type_tags {
                return Err(RegistryError::InvalidRequirement { index, reason });
            }
            warn!("class {class} clause {index}: {reason}");
        }

        let key = requirements_key(class);
        let value = storage::encode(&requirements)?;
        let clauses = requirements.len();
        let relation = requirements.relation;
        let event = AuditEvent::RequirementsChanged {
            class,
            requirements,
        };
        Self::commit(self.audit.as_ref(), &mut state.store, &key, &value, event)?;

        info!("requirements for class {class} set: {clauses} clause(s), relation {relation}");
        Ok(true)
    }

    /// The requirement set of `class`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no set was ever stored for `class`.
    pub fn get_requirements(&self, class: ClassId) -> Result<RequirementSet> {
        let state = self.read()?;
        storage::load(&state.store, &requirements_key(class))?.ok_or_else(|| {
            debug!("no requirements for class {class}");
            RegistryError::NotFound(format!("requirements for class {class}"))
        })
    }

    /// Classes that have a requirement set, in ascending order.
    pub fn requirement_classes(&self) -> Result<Vec<ClassId>> {
        let state = self.read()?;
        let prefix = requirements_prefix();

        let mut classes: Vec<ClassId> = state
            .store
            .keys_with_prefix(prefix)?
            .iter()
            .filter_map(|k| k[prefix.len()..].parse::<u64>().ok())
            .map(ClassId)
            .collect();
        classes.sort();
        Ok(classes)
    }

    // ── Requirement evaluator ─────────────────────────────────────────────────

    /// Evaluate `claims` against the requirements of `class`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for a class without requirements and
    /// `RegistryError::InvalidComparison` for a claim of the wrong variant.
    pub fn evaluate(&self, class: ClassId, claims: &Claims) -> Result<bool> {
        self.evaluate_detailed(class, claims).map(|e| e.passed)
    }

    /// Like [`Registry::evaluate`], reporting every clause outcome.
    pub fn evaluate_detailed(&self, class: ClassId, claims: &Claims) -> Result<Evaluation> {
        let requirements = self.get_requirements(class)?;
        let evaluation = evaluate_detailed(&requirements, claims)?;
        debug!(
            "evaluated class {class}: passed={} failed={:?}",
            evaluation.passed,
            evaluation.failed_indexes()
        );
        Ok(evaluation)
    }

    // ── Certification registry ────────────────────────────────────────────────

    /// Certify `principal` for `class` on the strength of an attestation
    /// produced and checked outside the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` unless `caller` is the issuer,
    /// and `RegistryError::AttestationRejected` if `attested` is false.
    pub fn certify(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
        class: ClassId,
        attested: bool,
    ) -> Result<bool> {
        let mut state = self.write()?;
        state.guard.authorize(caller).inspect_err(|_| {
            warn!("rejected certify of {principal} for class {class} by {caller}");
        })?;

        if !attested {
            warn!("attestation rejected for {principal} in class {class}");
            return Err(RegistryError::AttestationRejected {
                principal: principal.to_string(),
                class: class.0,
            });
        }

        let key = certification_key(class, principal);
        let current: Option<CertificationRecord> = storage::load(&state.store, &key)?;
        let next = certification::issue(current, principal, class, crate::time::now_micros());

        let event = AuditEvent::Certified {
            principal: principal.clone(),
            class,
        };
        Self::commit(
            self.audit.as_ref(),
            &mut state.store,
            &key,
            &storage::encode(&next)?,
            event,
        )?;

        info!(
            "certified {principal} for class {class} (issue #{})",
            next.issue_count
        );
        Ok(true)
    }

    /// Revoke the certification of `principal` for `class` as a manual
    /// revocation.
    pub fn revoke(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
        class: ClassId,
    ) -> Result<bool> {
        self.revoke_with_reason(caller, principal, class, RevocationReason::ManualRevocation)
    }

    /// Revoke the certification of `principal` for `class`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` unless `caller` is the issuer,
    /// and `RegistryError::NothingToRevoke` if `principal` was never
    /// certified for `class`.
    pub fn revoke_with_reason(
        &self,
        caller: &PrincipalId,
        principal: &PrincipalId,
        class: ClassId,
        reason: RevocationReason,
    ) -> Result<bool> {
        let mut state = self.write()?;
        state.guard.authorize(caller).inspect_err(|_| {
            warn!("rejected revoke of {principal} for class {class} by {caller}");
        })?;

        let key = certification_key(class, principal);
        let current: Option<CertificationRecord> = storage::load(&state.store, &key)?;
        let next = certification::revoke(
            current,
            principal,
            class,
            reason.clone(),
            crate::time::now_micros(),
        )
        .inspect_err(|_| warn!("nothing to revoke for {principal} in class {class}"))?;

        let event = AuditEvent::Revoked {
            principal: principal.clone(),
            class,
            reason: reason.clone(),
        };
        Self::commit(
            self.audit.as_ref(),
            &mut state.store,
            &key,
            &storage::encode(&next)?,
            event,
        )?;

        info!("revoked {principal} for class {class} ({reason})");
        Ok(true)
    }

    /// Does `principal` currently hold an active certification for `class`?
    ///
    /// Never fails: absent, revoked and unreadable records all answer false.
    pub fn is_verified(&self, principal: &PrincipalId, class: ClassId) -> bool {
        match self.status(principal, class) {
            Ok(state) => state == CertificationState::Active,
            Err(e) => {
                warn!("is_verified({principal}, {class}) treated as false: {e}");
                false
            }
        }
    }

    /// Certification state of `principal` for `class`.
    pub fn status(&self, principal: &PrincipalId, class: ClassId) -> Result<CertificationState> {
        let record = self.certification(principal, class)?;
        Ok(certification::state_of(record.as_ref()))
    }

    /// The stored certification record, if any.
    pub fn certification(
        &self,
        principal: &PrincipalId,
        class: ClassId,
    ) -> Result<Option<CertificationRecord>> {
        let state = self.read()?;
        storage::load(&state.store, &certification_key(class, principal))
    }

    /// Every certification record of `class`, ordered by principal.
    pub fn certifications(&self, class: ClassId) -> Result<Vec<CertificationRecord>> {
        let state = self.read()?;
        let mut records = Vec::new();
        for key in state.store.keys_with_prefix(&certification_prefix(class))? {
            if let Some(record) = storage::load(&state.store, &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
