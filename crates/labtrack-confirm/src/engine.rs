//! Confirmation engine
//!
//! One reconciliation path, parameterised by a [`ConfirmStrategy`]:
//! validator, executor per labware, watermark pass, comment recorder. All of
//! it runs in a single store transaction.

use crate::comments::record_comments;
use crate::config::ConfirmConfig;
use crate::error::{ConfirmError, Problem};
use crate::executor::ConfirmExecutor;
use crate::strategy::ConfirmStrategy;
use crate::validator::{ConfirmValidator, ValidatedRequest};
use crate::watermark::raise_watermarks;
use chrono::Utc;
use labtrack_model::{ConfirmationRequest, Operation, OperationResult, User};
use labtrack_store::{ConfirmStore, TransactionalStore};

/// Plan confirmation engine
///
/// # Example
///
/// ```rust
/// use labtrack_confirm::{ConfirmEngine, SectionStrategy};
/// use labtrack_model::{ConfirmationRequest, User, UserId};
/// use labtrack_store::MemoryStore;
///
/// let engine = ConfirmEngine::new(SectionStrategy);
/// let store = MemoryStore::new();
/// let user = User { id: UserId(1), username: "tech".into() };
///
/// let err = engine.confirm(&store, &user, &ConfirmationRequest::default()).unwrap_err();
/// assert!(err.is_user_correctable());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfirmEngine<S> {
    strategy: S,
    config: ConfirmConfig,
}

impl<S: ConfirmStrategy> ConfirmEngine<S> {
    /// Create engine with default configuration
    #[inline]
    #[must_use]
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            config: ConfirmConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: ConfirmConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConfirmConfig {
        &self.config
    }

    /// Confirm a request in its own transaction
    ///
    /// Nothing is written unless every labware succeeds.
    ///
    /// # Errors
    /// Returns [`ConfirmError::Validation`] with every problem found, or an
    /// integrity or store error that aborted the transaction
    pub fn confirm<T: TransactionalStore + ?Sized>(
        &self,
        store: &T,
        user: &User,
        request: &ConfirmationRequest,
    ) -> Result<OperationResult, ConfirmError> {
        let span = tracing::info_span!(
            "confirm",
            strategy = self.strategy.name(),
            user = %user.username,
            labware = request.labware.len(),
        );
        let _enter = span.enter();
        store.transaction(|tx| self.confirm_in(tx, user, request))
    }

    /// Confirm a request inside an already open transaction
    ///
    /// # Errors
    /// As [`confirm`](Self::confirm); the caller decides whether to roll back
    pub fn confirm_in<R: ConfirmStore + ?Sized>(
        &self,
        tx: &mut R,
        user: &User,
        request: &ConfirmationRequest,
    ) -> Result<OperationResult, ConfirmError> {
        let validated =
            ConfirmValidator::new(&self.strategy, &self.config).validate(tx, request, Utc::now())?;
        self.execute(tx, user, &validated).map_err(|err| {
            if let ConfirmError::Integrity(ref integrity) = err {
                tracing::error!(error = %integrity, "confirmation aborted");
            }
            err
        })
    }

    /// Dry run: the problems `confirm` would report, without writing
    ///
    /// # Errors
    /// Returns error only if the store itself fails
    pub fn check<T: TransactionalStore + ?Sized>(
        &self,
        store: &T,
        request: &ConfirmationRequest,
    ) -> Result<Vec<Problem>, ConfirmError> {
        let validator = ConfirmValidator::new(&self.strategy, &self.config);
        let outcome = store.transaction(|tx| {
            validator
                .validate(tx, request, Utc::now())
                .map(|_| ())
        });
        match outcome {
            Ok(()) => Ok(Vec::new()),
            Err(ConfirmError::Validation(problems)) => Ok(problems),
            Err(err) => Err(err),
        }
    }

    /// Apply a validated request
    ///
    /// # Errors
    /// Returns an integrity or store error; the transaction must be rolled back
    pub fn execute<R: ConfirmStore + ?Sized>(
        &self,
        tx: &mut R,
        user: &User,
        validated: &ValidatedRequest,
    ) -> Result<OperationResult, ConfirmError> {
        let mut executor = ConfirmExecutor::new(&self.strategy, &self.config);
        let mut outcomes = Vec::with_capacity(validated.len());
        for labware in validated.labware() {
            let span = tracing::info_span!(
                "labware",
                barcode = %labware.labware().barcode,
                discard = labware.is_discard(),
            );
            let _enter = span.enter();
            outcomes.push(executor.execute(tx, user, validated.index(), labware)?);
        }

        let operations: Vec<Operation> = outcomes
            .iter()
            .filter_map(|outcome| outcome.operation.clone())
            .collect();
        let raises = raise_watermarks(tx, &operations)?;

        for (labware, outcome) in validated.labware().iter().zip(&outcomes) {
            record_comments(
                tx,
                &outcome.labware,
                outcome.operation.as_ref().map(|op| op.id),
                labware.comments(),
            )?;
        }

        tracing::info!(
            operations = operations.len(),
            labware = outcomes.len(),
            derived = executor.derived(),
            watermarks = raises.len(),
            "confirmation complete"
        );
        Ok(OperationResult {
            operations,
            labware: outcomes.into_iter().map(|outcome| outcome.labware).collect(),
        })
    }
}
