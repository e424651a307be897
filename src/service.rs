//! Owner of the published index.
//!
//! Readers call [`IndexService::snapshot`] and keep the returned `Arc` for
//! the rest of their request. Rebuilds are coalesced: each one takes a
//! [`RebuildTicket`], starting a new rebuild cancels the previous ticket's
//! token, and only the newest ticket may publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

use crate::errors::IndexError;
use crate::index::Index;
use crate::loader::{self, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// The published index has nothing in it: no selection was configured,
    /// or the selected folder held no definitions or enums. The
    /// [`RebuildOutcome`] tells the two apart.
    Empty,
    Loading,
    Ready,
}

#[derive(Debug, Clone)]
pub struct RebuildTicket {
    generation: u64,
    token: CancellationToken,
}

impl RebuildTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancelled as soon as a newer rebuild starts.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Published { opcodes: usize, classes: usize, enums: usize },
    NotConfigured,
    Superseded,
}

#[derive(Debug)]
struct Inner {
    state: ServiceState,
    current: CancellationToken,
}

#[derive(Debug)]
pub struct IndexService {
    index: ArcSwap<Index>,
    generation: AtomicU64,
    inner: Mutex<Inner>,
}

impl Default for IndexService {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexService {
    pub fn new() -> Self {
        Self {
            index: ArcSwap::from_pointee(Index::default()),
            generation: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                state: ServiceState::Empty,
                current: CancellationToken::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Arc<Index> {
        self.index.load_full()
    }

    pub fn state(&self) -> ServiceState {
        self.lock().state
    }

    pub fn begin_rebuild(&self) -> RebuildTicket {
        let mut inner = self.lock();
        inner.current.cancel();
        inner.current = CancellationToken::new();
        inner.state = ServiceState::Loading;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "index rebuild started");
        RebuildTicket {
            generation,
            token: inner.current.clone(),
        }
    }

    fn is_current(&self, ticket: &RebuildTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Swap in `index` if `ticket` is still the newest rebuild.
    fn publish(&self, ticket: &RebuildTicket, index: Index) -> RebuildOutcome {
        let mut inner = self.lock();
        if !self.is_current(ticket) {
            tracing::debug!(generation = ticket.generation, "discarding superseded index");
            return RebuildOutcome::Superseded;
        }

        inner.state = if index.is_empty() {
            ServiceState::Empty
        } else {
            ServiceState::Ready
        };
        let outcome = RebuildOutcome::Published {
            opcodes: index.commands_by_name().len(),
            classes: index.commands_by_class().len(),
            enums: index.enums().len(),
        };
        self.index.store(Arc::new(index));
        outcome
    }

    /// Load `selection` and publish the result under `ticket`.
    ///
    /// `None` means no folder or version is known; an empty index is
    /// published. On failure the previously published index stays in place.
    pub async fn complete_rebuild(
        &self,
        ticket: RebuildTicket,
        selection: Option<Selection>,
    ) -> Result<RebuildOutcome, IndexError> {
        let Some(selection) = selection else {
            tracing::info!("no definitions folder or game version configured");
            return Ok(match self.publish(&ticket, Index::default()) {
                RebuildOutcome::Published { .. } => RebuildOutcome::NotConfigured,
                other => other,
            });
        };

        match loader::load_index(&selection).await {
            Ok(index) => {
                let outcome = self.publish(&ticket, index);
                if let RebuildOutcome::Published {
                    opcodes,
                    classes,
                    enums,
                } = &outcome
                {
                    tracing::info!(
                        version = %selection.version,
                        opcodes,
                        classes,
                        enums,
                        "index published"
                    );
                }
                Ok(outcome)
            },
            Err(err) => {
                self.abandon_rebuild(&ticket);
                tracing::error!(version = %selection.version, error = %err, "index rebuild failed");
                Err(err)
            },
        }
    }

    /// Give up on `ticket` without publishing. The previously published
    /// index stays in place.
    pub fn abandon_rebuild(&self, ticket: &RebuildTicket) {
        let mut inner = self.lock();
        if self.is_current(ticket) {
            inner.state = if self.index.load().is_empty() {
                ServiceState::Empty
            } else {
                ServiceState::Ready
            };
        }
    }

    pub async fn rebuild(&self, selection: Option<Selection>) -> Result<RebuildOutcome, IndexError> {
        let ticket = self.begin_rebuild();
        self.complete_rebuild(ticket, selection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_cancels_previous() {
        let service = IndexService::new();
        assert_eq!(service.state(), ServiceState::Empty);

        let first = service.begin_rebuild();
        assert_eq!(service.state(), ServiceState::Loading);
        assert!(!first.token().is_cancelled());

        let second = service.begin_rebuild();
        assert!(first.token().is_cancelled());
        assert!(!second.token().is_cancelled());
        assert!(second.generation() > first.generation());
    }

    #[tokio::test]
    async fn test_not_configured_publishes_empty() {
        let service = IndexService::new();
        let outcome = service.rebuild(None).await.unwrap();
        assert_eq!(outcome, RebuildOutcome::NotConfigured);
        assert_eq!(service.state(), ServiceState::Empty);
        assert!(service.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_stale_ticket_is_superseded() {
        let service = IndexService::new();
        let stale = service.begin_rebuild();
        let _fresh = service.begin_rebuild();
        let outcome = service.complete_rebuild(stale, None).await.unwrap();
        assert_eq!(outcome, RebuildOutcome::Superseded);
        assert_eq!(service.state(), ServiceState::Loading);
    }
}
