// Copyright 2026 the Carryover Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The paint-to-commit driver.
//!
//! [`TransactionCoordinator`] owns the [`ItemResourceCache`], the
//! [`DiscardLedger`], a [`RemoteChannel`] and a [`ResourceAllocator`], and
//! moves through the following states:
//!
//! ```text
//!            begin_transaction
//!   Idle ──────────────────────► Building ──┬── end_transaction ──► Committed
//!     ▲                                     │
//!     │                                     └── abandon / incomplete ──► Incomplete
//!     │
//!   Committed | Incomplete ── begin_transaction ──► Building
//!
//!   any ── destroy ──► Destroyed
//! ```
//!
//! A building transaction is represented by a [`Transaction`] token returned
//! from [`begin_transaction`](TransactionCoordinator::begin_transaction). The
//! token carries the command buffer under construction and must be handed
//! back to exactly one of
//! [`end_transaction`](TransactionCoordinator::end_transaction) or
//! [`abandon_transaction`](TransactionCoordinator::abandon_transaction).
//!
//! # Commit order
//!
//! 1. The command buffer (with its resource side-table) is sent.
//! 2. The cache rotates generations; evicted identifiers enter the ledger.
//! 3. The ledger is flushed as a separate, later message.
//!
//! Discards therefore never overtake the commands that last referenced them.

use hashbrown::HashSet;

use crate::cache::ItemResourceCache;
use crate::channel::{ChannelError, RemoteChannel};
use crate::command::{CommandBuffer, DrawCommand, DrawOp, TransactionId};
use crate::config::CoordinatorConfig;
use crate::error::{SendStage, TransactionError};
use crate::handle::{HandleId, ImageBinding, ResourceHandle, ResourceKind, UpdateForSource};
use crate::item::{DisplayItem, DisplayListProducer, FrameId, ItemContent, ItemKey};
use crate::ledger::DiscardLedger;
use crate::resource::{AnimationId, ImageKey, PipelineId, RemoteId, ResourceAllocator};
use crate::trace::{
    CommitEvent, DiscardFlushEvent, EmptyTransactionEvent, IncompleteEvent, ItemSkippedEvent,
    TransactionBeginEvent, Tracer, TransportErrorEvent, count,
};

#[cfg(feature = "trace-rich")]
use crate::trace::ItemBoundEvent;

/// Lifecycle state of a [`TransactionCoordinator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// No transaction has run yet.
    Idle,
    /// A transaction is being built.
    Building,
    /// The last transaction was sent.
    Committed,
    /// The last transaction was abandoned.
    Incomplete,
    /// The coordinator was torn down.
    Destroyed,
}

/// A transaction under construction.
///
/// Obtained from [`TransactionCoordinator::begin_transaction`] and consumed by
/// [`end_transaction`](TransactionCoordinator::end_transaction) or
/// [`abandon_transaction`](TransactionCoordinator::abandon_transaction).
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    buffer: CommandBuffer,
    skipped: usize,
    incomplete: bool,
}

impl Transaction {
    /// The transaction's id.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The command buffer built so far.
    #[must_use]
    pub fn buffer(&self) -> &CommandBuffer {
        &self.buffer
    }

    /// Number of items skipped because their source was not ready.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns `true` if the transaction was marked incomplete.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

/// What happened to a single pushed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A draw command was appended.
    Emitted,
    /// The item's source was not ready; nothing was appended.
    Skipped,
}

/// Counters for a committed transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    /// The committed transaction.
    pub transaction: TransactionId,
    /// Draw commands sent.
    pub commands: usize,
    /// Resource updates sent.
    pub resource_updates: usize,
    /// Items skipped as not ready.
    pub skipped: usize,
    /// Handles evicted by generation rotation.
    pub evicted: usize,
    /// Identifiers sent in the discard batch.
    pub discarded: usize,
}

/// Result of [`TransactionCoordinator::end_transaction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The transaction was sent and the cache rotated.
    Committed(CommitSummary),
    /// The transaction was marked incomplete and rolled back.
    Incomplete(TransactionId),
}

/// Result of [`TransactionCoordinator::end_empty_transaction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyTransactionOutcome {
    /// The last built command list was re-sent under this id.
    Resent(TransactionId),
    /// Reuse is not possible; the caller must run a full build.
    RebuildRequired,
}

/// Result of [`TransactionCoordinator::paint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintOutcome {
    /// An empty transaction re-sent the previous command list.
    Reused(TransactionId),
    /// A full build ran.
    Built(TransactionOutcome),
}

/// Drives paint-to-commit cycles against one remote process.
#[derive(Debug)]
pub struct TransactionCoordinator<C, A> {
    config: CoordinatorConfig,
    channel: C,
    allocator: A,
    cache: ItemResourceCache,
    ledger: DiscardLedger,
    state: TransactionState,
    building: Option<TransactionId>,
    last_built: Option<CommandBuffer>,
    mutated: HashSet<FrameId>,
    last_allocated: TransactionId,
    last_sent: TransactionId,
    composited: TransactionId,
    first_paint: bool,
}

impl<C: RemoteChannel, A: ResourceAllocator> TransactionCoordinator<C, A> {
    /// Creates a coordinator in the [`Idle`](TransactionState::Idle) state.
    #[must_use]
    pub fn new(config: CoordinatorConfig, channel: C, allocator: A) -> Self {
        Self {
            config,
            channel,
            allocator,
            cache: ItemResourceCache::new(),
            ledger: DiscardLedger::with_capacity(config.ledger_capacity),
            state: TransactionState::Idle,
            building: None,
            last_built: None,
            mutated: HashSet::new(),
            last_allocated: TransactionId(0),
            last_sent: TransactionId(0),
            composited: TransactionId(0),
            first_paint: false,
        }
    }

    /// Starts building a transaction.
    ///
    /// # Errors
    ///
    /// [`AlreadyBuilding`](TransactionError::AlreadyBuilding) if a transaction
    /// is open, [`Destroyed`](TransactionError::Destroyed) after
    /// [`destroy`](Self::destroy).
    pub fn begin_transaction(
        &mut self,
        tracer: &mut Tracer<'_>,
    ) -> Result<Transaction, TransactionError> {
        self.ensure_not_building()?;
        let id = self.allocate_transaction_id();
        self.building = Some(id);
        self.state = TransactionState::Building;
        tracer.transaction_begin(&TransactionBeginEvent {
            transaction: id,
            recyclable: count(self.cache.previous_len()),
        });
        Ok(Transaction {
            id,
            buffer: CommandBuffer::with_capacity(id, self.config.command_capacity),
            skipped: 0,
            incomplete: false,
        })
    }

    /// Processes one display item into `txn`.
    ///
    /// Resource-less items emit a command directly. Resource items obtain a
    /// handle from the cache and bring it up to date; if the source is not
    /// ready the item is skipped and traced.
    ///
    /// # Errors
    ///
    /// Invalid-state errors if `txn` is not the building transaction.
    pub fn push_item(
        &mut self,
        txn: &mut Transaction,
        item: &DisplayItem,
        tracer: &mut Tracer<'_>,
    ) -> Result<ItemOutcome, TransactionError> {
        self.check(txn)?;
        txn.buffer.add_participant(item.key.frame);

        let op = match item.content {
            ItemContent::Solid { color } => Some(DrawOp::Solid { color }),
            ItemContent::Image { source, rendering } => {
                let id = self.bind(txn.id, item.key, ResourceKind::Image, tracer);
                self.cache
                    .handle_mut(id)
                    .and_then(ResourceHandle::as_image_mut)
                    .and_then(|image| {
                        image.update_for_source(
                            &source,
                            &mut self.allocator,
                            &mut txn.buffer.resources,
                        )
                    })
                    .map(|binding| match binding {
                        ImageBinding::Image(key) => DrawOp::Image { key, rendering },
                        ImageBinding::Pipeline(pipeline) => DrawOp::Pipeline {
                            pipeline,
                            rendering,
                        },
                    })
            }
            ItemContent::Animated { source, color } => {
                let id = self.bind(txn.id, item.key, ResourceKind::Animation, tracer);
                self.cache
                    .handle_mut(id)
                    .and_then(ResourceHandle::as_animation_mut)
                    .and_then(|animation| {
                        animation.update_for_source(
                            &source,
                            &mut self.allocator,
                            &mut txn.buffer.resources,
                        )
                    })
                    .map(|animation| DrawOp::Animated {
                        animation,
                        property: source.property,
                        color,
                    })
            }
        };

        let Some(op) = op else {
            txn.skipped += 1;
            if let Some(kind) = item.content.resource_kind() {
                tracer.item_skipped(&ItemSkippedEvent {
                    transaction: txn.id,
                    item: item.key,
                    kind,
                });
            }
            return Ok(ItemOutcome::Skipped);
        };

        txn.buffer.push(DrawCommand {
            item: item.key,
            bounds: item.bounds,
            op,
        });
        Ok(ItemOutcome::Emitted)
    }

    /// Marks `txn` incomplete. Ending it will roll back instead of commit.
    ///
    /// # Errors
    ///
    /// Invalid-state errors if `txn` is not the building transaction.
    pub fn set_transaction_incomplete(
        &mut self,
        txn: &mut Transaction,
    ) -> Result<(), TransactionError> {
        self.check(txn)?;
        txn.incomplete = true;
        Ok(())
    }

    /// Abandons `txn`: commands are dropped, the cache is rolled back and
    /// nothing is sent.
    ///
    /// # Errors
    ///
    /// Invalid-state errors if `txn` is not the building transaction.
    pub fn abandon_transaction(
        &mut self,
        txn: Transaction,
        tracer: &mut Tracer<'_>,
    ) -> Result<TransactionId, TransactionError> {
        self.check(&txn)?;
        Ok(self.roll_back(txn, tracer))
    }

    /// Ends `txn`.
    ///
    /// An incomplete transaction is rolled back. Otherwise the command buffer
    /// is sent, the cache rotates, and the ledger is flushed.
    ///
    /// # Errors
    ///
    /// Invalid-state errors if `txn` is not the building transaction.
    ///
    /// [`Transport`](TransactionError::Transport) if a send fails. Local
    /// state is committed regardless. When the command buffer is lost the
    /// ledger keeps every pending discard for the next successful send; when
    /// the discard batch is lost it is retried on the next flush.
    ///
    /// A lost command buffer also loses its resource side-table, but the
    /// handles it touched still record the content as uploaded. An identifier
    /// first added in that transaction is unknown to the remote process, and
    /// later transactions that reuse the handle reference it without adding
    /// it again.
    pub fn end_transaction(
        &mut self,
        txn: Transaction,
        tracer: &mut Tracer<'_>,
    ) -> Result<TransactionOutcome, TransactionError> {
        self.check(&txn)?;
        if txn.incomplete {
            return Ok(TransactionOutcome::Incomplete(self.roll_back(txn, tracer)));
        }

        let Transaction {
            id,
            mut buffer,
            skipped,
            ..
        } = txn;
        buffer.first_paint = self.first_paint;

        let sent = self.channel.send_commands(&buffer);
        let evicted = self.cache.end_transaction(&mut self.ledger);
        self.mutated.clear();
        self.building = None;
        self.state = TransactionState::Committed;

        if let Err(source) = sent {
            // The remote never saw this list, so it must not be replayed.
            self.last_built = None;
            return Err(transport_failure(id, SendStage::Commands, source, tracer));
        }
        self.last_sent = id;
        self.first_paint = false;

        tracer.commit(&CommitEvent {
            transaction: id,
            commands: count(buffer.commands.len()),
            resource_updates: count(buffer.resources.len()),
            skipped: count(skipped),
            evicted: count(evicted),
        });
        let mut summary = CommitSummary {
            transaction: id,
            commands: buffer.commands.len(),
            resource_updates: buffer.resources.len(),
            skipped,
            evicted,
            discarded: 0,
        };
        self.last_built = Some(buffer);

        summary.discarded = self.flush_discards(id, tracer)?;
        Ok(TransactionOutcome::Committed(summary))
    }

    /// Attempts to re-send the last built command list without rebuilding.
    ///
    /// Reuse requires that empty transactions are enabled, that a committed
    /// build exists, and that no mutated frame contributed to it. The
    /// resource side-table is not re-sent.
    ///
    /// # Errors
    ///
    /// Invalid-state errors while building or after destroy;
    /// [`Transport`](TransactionError::Transport) if a send fails.
    pub fn end_empty_transaction(
        &mut self,
        tracer: &mut Tracer<'_>,
    ) -> Result<EmptyTransactionOutcome, TransactionError> {
        self.ensure_not_building()?;

        let reusable = self.config.empty_transactions
            && self
                .last_built
                .as_ref()
                .is_some_and(|last| !last.involves_any(self.mutated.iter()));
        let mut replay = match &self.last_built {
            Some(last) if reusable => last.replay(self.last_allocated.next()),
            last => {
                tracer.empty_transaction(&EmptyTransactionEvent {
                    transaction: last.as_ref().map_or(self.last_sent, |b| b.transaction),
                    reused: false,
                });
                return Ok(EmptyTransactionOutcome::RebuildRequired);
            }
        };

        let id = replay.transaction;
        self.last_allocated = id;
        replay.first_paint = self.first_paint;
        if let Err(source) = self.channel.send_commands(&replay) {
            return Err(transport_failure(id, SendStage::Commands, source, tracer));
        }
        self.last_sent = id;
        self.first_paint = false;
        self.state = TransactionState::Committed;
        tracer.empty_transaction(&EmptyTransactionEvent {
            transaction: id,
            reused: true,
        });

        self.flush_discards(id, tracer)?;
        Ok(EmptyTransactionOutcome::Resent(id))
    }

    /// Runs one paint cycle for `producer`.
    ///
    /// Records the producer's mutated frames, tries an empty transaction when
    /// the producer reports no changes, and otherwise builds and commits
    /// every item in order.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying operations.
    pub fn paint<P: DisplayListProducer + ?Sized>(
        &mut self,
        producer: &P,
        tracer: &mut Tracer<'_>,
    ) -> Result<PaintOutcome, TransactionError> {
        for &frame in producer.mutated_frames() {
            self.mark_mutated(frame);
        }
        if !producer.has_changes()
            && let EmptyTransactionOutcome::Resent(id) = self.end_empty_transaction(tracer)?
        {
            return Ok(PaintOutcome::Reused(id));
        }

        let mut txn = self.begin_transaction(tracer)?;
        for item in producer.items() {
            self.push_item(&mut txn, item, tracer)?;
        }
        self.end_transaction(txn, tracer).map(PaintOutcome::Built)
    }

    /// Records that `frame` changed since the last committed build.
    pub fn mark_mutated(&mut self, frame: FrameId) {
        self.mutated.insert(frame);
    }

    /// Returns whether `frame` is marked mutated.
    #[must_use]
    pub fn is_mutated(&self, frame: FrameId) -> bool {
        self.mutated.contains(&frame)
    }

    /// Records that the remote process composited `transaction`.
    pub fn did_composite(&mut self, transaction: TransactionId) {
        self.composited = self.composited.max(transaction);
    }

    /// Returns `true` if a sent transaction has not been composited yet.
    #[must_use]
    pub fn is_composite_pending(&self) -> bool {
        self.last_sent > self.composited
    }

    /// The most recently composited transaction.
    #[must_use]
    pub fn last_composited(&self) -> Option<TransactionId> {
        (self.composited.0 != 0).then_some(self.composited)
    }

    /// Flags the next sent command buffer as the scene's first paint.
    pub fn set_first_paint(&mut self) {
        self.first_paint = true;
    }

    /// Queues an image key owned outside the cache for discard.
    ///
    /// Returns `false` if it was already pending or the coordinator is
    /// destroyed.
    pub fn add_image_key_for_discard(&mut self, key: ImageKey) -> bool {
        self.add_for_discard(RemoteId::Image(key))
    }

    /// Queues an animation id owned outside the cache for discard.
    pub fn add_animation_for_discard(&mut self, animation: AnimationId) -> bool {
        self.add_for_discard(RemoteId::Animation(animation))
    }

    /// Queues a pipeline id owned outside the cache for discard.
    pub fn add_pipeline_for_discard(&mut self, pipeline: PipelineId) -> bool {
        self.add_for_discard(RemoteId::Pipeline(pipeline))
    }

    /// Drops every pending discard without sending it.
    ///
    /// Only correct when the remote process is already gone and has released
    /// the resources itself.
    pub fn discard_local(&mut self) {
        self.ledger.clear();
    }

    /// Evicts both cache generations and flushes the ledger.
    ///
    /// The last build is forgotten, so the next empty transaction is refused.
    /// Returns the number of handles evicted.
    ///
    /// # Errors
    ///
    /// Invalid-state errors while building or after destroy;
    /// [`Transport`](TransactionError::Transport) if the discard batch is
    /// lost (it stays pending).
    pub fn clear_cached_resources(
        &mut self,
        tracer: &mut Tracer<'_>,
    ) -> Result<usize, TransactionError> {
        self.ensure_not_building()?;
        let evicted = self.cache.evict_all(&mut self.ledger);
        self.last_built = None;
        self.flush_discards(self.last_sent, tracer)?;
        Ok(evicted)
    }

    /// Tears down the coordinator.
    ///
    /// Any building transaction is rolled back, every handle is evicted, and
    /// the ledger is flushed. Afterwards every operation fails with
    /// [`Destroyed`](TransactionError::Destroyed). Calling `destroy` twice is
    /// a no-op. Returns the number of handles evicted.
    ///
    /// # Errors
    ///
    /// [`Transport`](TransactionError::Transport) if the final discard batch
    /// is lost. The ledger is emptied either way since no later send is
    /// possible.
    pub fn destroy(&mut self, tracer: &mut Tracer<'_>) -> Result<usize, TransactionError> {
        if self.state == TransactionState::Destroyed {
            return Ok(0);
        }
        let evicted = self.cache.evict_all(&mut self.ledger);
        self.building = None;
        self.last_built = None;
        self.mutated.clear();
        self.state = TransactionState::Destroyed;

        let flushed = self.flush_discards(self.last_sent, tracer);
        self.ledger.clear();
        flushed.map(|_| evicted)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The item resource cache.
    #[must_use]
    pub fn cache(&self) -> &ItemResourceCache {
        &self.cache
    }

    /// Pending discards.
    #[must_use]
    pub fn ledger(&self) -> &DiscardLedger {
        &self.ledger
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The remote channel.
    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The remote channel, mutably.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The resource allocator.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The last command buffer that was built and sent, if reusable.
    #[must_use]
    pub fn last_built(&self) -> Option<&CommandBuffer> {
        self.last_built.as_ref()
    }

    /// Id of the last transaction the channel accepted.
    #[must_use]
    pub fn last_sent(&self) -> Option<TransactionId> {
        (self.last_sent.0 != 0).then_some(self.last_sent)
    }

    // -- internals ---------------------------------------------------------

    fn allocate_transaction_id(&mut self) -> TransactionId {
        self.last_allocated = self.last_allocated.next();
        self.last_allocated
    }

    fn ensure_not_building(&self) -> Result<(), TransactionError> {
        if self.state == TransactionState::Destroyed {
            return Err(TransactionError::Destroyed);
        }
        match self.building {
            Some(id) => Err(TransactionError::AlreadyBuilding(id)),
            None => Ok(()),
        }
    }

    fn check(&self, txn: &Transaction) -> Result<(), TransactionError> {
        if self.state == TransactionState::Destroyed {
            return Err(TransactionError::Destroyed);
        }
        match self.building {
            None => Err(TransactionError::NotBuilding),
            Some(expected) if expected != txn.id => Err(TransactionError::StaleTransaction {
                expected,
                got: txn.id,
            }),
            Some(_) => Ok(()),
        }
    }

    fn bind(
        &mut self,
        transaction: TransactionId,
        key: ItemKey,
        kind: ResourceKind,
        tracer: &mut Tracer<'_>,
    ) -> HandleId {
        let (id, _lookup) = self.cache.get_or_create(key, kind);
        #[cfg(feature = "trace-rich")]
        tracer.item_bound(&ItemBoundEvent {
            transaction,
            item: key,
            kind,
            lookup: _lookup,
        });
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (transaction, tracer);
        }
        id
    }

    fn roll_back(&mut self, txn: Transaction, tracer: &mut Tracer<'_>) -> TransactionId {
        self.cache.rollback();
        self.building = None;
        self.state = TransactionState::Incomplete;
        tracer.incomplete(&IncompleteEvent {
            transaction: txn.id,
            commands_dropped: count(txn.buffer.commands.len()),
        });
        txn.id
    }

    fn flush_discards(
        &mut self,
        transaction: TransactionId,
        tracer: &mut Tracer<'_>,
    ) -> Result<usize, TransactionError> {
        match self.ledger.flush(&mut self.channel) {
            Ok(0) => Ok(0),
            Ok(sent) => {
                tracer.discard_flush(&DiscardFlushEvent {
                    transaction,
                    discarded: count(sent),
                });
                Ok(sent)
            }
            Err(source) => Err(transport_failure(
                transaction,
                SendStage::Discards,
                source,
                tracer,
            )),
        }
    }

    fn add_for_discard(&mut self, id: RemoteId) -> bool {
        self.state != TransactionState::Destroyed && self.ledger.add(id)
    }
}

fn transport_failure(
    transaction: TransactionId,
    stage: SendStage,
    source: ChannelError,
    tracer: &mut Tracer<'_>,
) -> TransactionError {
    tracer.transport_error(&TransportErrorEvent { transaction, stage });
    TransactionError::Transport {
        transaction,
        stage,
        source,
    }
}
