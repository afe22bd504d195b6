//! The table: every piece, its stacking, and who may touch it.
//!
//! Pieces live in one arena keyed by [`PieceId`]. Stacking is an id
//! relation inside that arena (`above` / `below` on each piece), and a
//! separate z-order list records draw order from bottom to top. A piece is
//! always later in the z-order than the piece it rests on.
//!
//! Every mutating operation validates first and mutates second, so a
//! refused request leaves the table untouched.

use std::collections::{BTreeMap, BTreeSet};

use gamebox_protocol::{ConnectionId, FlipMode, PieceId, PieceSnapshot, Vec2};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Animation, Piece, PieceSpec, TableConfig, TableError};

/// Claims dropped by [`Table::release_client`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Released {
    /// Pieces the client had selected.
    pub deselected: Vec<PieceId>,
    /// Pieces the client owned.
    pub disowned: Vec<PieceId>,
}

impl Released {
    pub fn is_empty(&self) -> bool {
        self.deselected.is_empty() && self.disowned.is_empty()
    }
}

/// The shared object graph of one table session.
///
/// A table is owned by the session loop and mutated from that task only.
#[derive(Debug)]
pub struct Table {
    pieces: BTreeMap<PieceId, Piece>,
    /// Draw order, bottom to top.
    order: Vec<PieceId>,
    /// Last id handed out.
    next_id: u16,
    config: TableConfig,
}

impl Table {
    pub fn new(config: TableConfig) -> Self {
        Self {
            pieces: BTreeMap::new(),
            order: Vec::new(),
            next_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    /// Pieces in draw order, bottom to top.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.order.iter().filter_map(|id| self.pieces.get(id))
    }

    /// The draw order, bottom to top.
    pub fn z_order(&self) -> &[PieceId] {
        &self.order
    }

    /// CREATE payloads for every piece, in draw order.
    pub fn snapshots(&self) -> Vec<PieceSnapshot> {
        self.pieces().map(Piece::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn piece(&self, id: PieceId) -> Result<&Piece, TableError> {
        self.pieces.get(&id).ok_or(TableError::NotFound(id))
    }

    fn piece_mut(&mut self, id: PieceId) -> Result<&mut Piece, TableError> {
        self.pieces.get_mut(&id).ok_or(TableError::NotFound(id))
    }

    /// Checks that `client` may change `id`: it must hold the selection,
    /// and nobody else may own the piece.
    fn controlled(
        &self,
        client: ConnectionId,
        id: PieceId,
    ) -> Result<&Piece, TableError> {
        let piece = self.piece(id)?;
        if piece.selected_by != Some(client) {
            return Err(TableError::Unauthorized {
                piece: id,
                reason: "selection not held",
            });
        }
        if piece.owned_by.is_some_and(|owner| owner != client) {
            return Err(TableError::Unauthorized {
                piece: id,
                reason: "owned by another client",
            });
        }
        Ok(piece)
    }

    /// A stack moves or turns as a whole only if none of the pieces
    /// riding on it belongs to someone else.
    fn not_owned_by_others(
        &self,
        client: ConnectionId,
        ids: &[PieceId],
    ) -> Result<(), TableError> {
        let blocked = ids.iter().copied().find(|id| {
            self.pieces
                .get(id)
                .is_some_and(|p| p.owned_by.is_some_and(|owner| owner != client))
        });
        match blocked {
            Some(piece) => Err(TableError::Unauthorized {
                piece,
                reason: "stacked piece owned by another client",
            }),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Puts a new piece on top of the table at `location`.
    ///
    /// A new piece starts unstacked, unselected and unowned.
    ///
    /// # Errors
    /// - [`TableError::Invalid`] if `location` is not finite.
    /// - [`TableError::TableFull`] if every id is in use.
    pub fn create(
        &mut self,
        spec: PieceSpec,
        location: Vec2,
    ) -> Result<&Piece, TableError> {
        if !is_finite(location) {
            return Err(TableError::Invalid {
                piece: PieceId::NONE,
                reason: "location is not finite",
            });
        }
        let id = self.allocate_id()?;

        tracing::info!(piece = %id, class_id = %spec.class_id, %location, "piece created");
        self.order.push(id);
        Ok(&*self
            .pieces
            .entry(id)
            .or_insert_with(|| Piece::new(id, spec, location)))
    }

    /// Next free id after the last one handed out, skipping 0 and every
    /// id still in use.
    fn allocate_id(&mut self) -> Result<PieceId, TableError> {
        if self.pieces.len() >= usize::from(u16::MAX) {
            return Err(TableError::TableFull);
        }
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            let id = PieceId(self.next_id);
            if id != PieceId::NONE && !self.pieces.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Selection and ownership
    // -----------------------------------------------------------------------

    /// Takes (`select = true`) or releases the selection of `id`.
    ///
    /// Returns the holder afterwards. Selecting a piece the client already
    /// holds succeeds without change.
    ///
    /// # Errors
    /// - [`TableError::AlreadySelected`] if another client holds it.
    /// - [`TableError::Unauthorized`] if another client owns it, or on a
    ///   release of a selection the client does not hold.
    pub fn select(
        &mut self,
        client: ConnectionId,
        id: PieceId,
        select: bool,
    ) -> Result<Option<ConnectionId>, TableError> {
        let piece = self.piece_mut(id)?;

        if select {
            if piece.owned_by.is_some_and(|owner| owner != client) {
                return Err(TableError::Unauthorized {
                    piece: id,
                    reason: "owned by another client",
                });
            }
            if let Some(holder) = piece.selected_by.filter(|&h| h != client) {
                return Err(TableError::AlreadySelected { piece: id, holder });
            }
            piece.selected_by = Some(client);
        } else {
            if piece.selected_by != Some(client) {
                return Err(TableError::Unauthorized {
                    piece: id,
                    reason: "selection not held",
                });
            }
            piece.selected_by = None;
        }

        tracing::debug!(piece = %id, %client, select, "selection changed");
        Ok(piece.selected_by)
    }

    /// Claims (`own = true`) or gives up ownership of `id`.
    ///
    /// Returns the owner afterwards.
    ///
    /// # Errors
    /// - [`TableError::AlreadyOwned`] if another client owns it.
    /// - [`TableError::Unauthorized`] when disowning a piece the client
    ///   does not own.
    pub fn own(
        &mut self,
        client: ConnectionId,
        id: PieceId,
        own: bool,
    ) -> Result<Option<ConnectionId>, TableError> {
        let piece = self.piece_mut(id)?;

        if own {
            if let Some(owner) = piece.owned_by.filter(|&o| o != client) {
                return Err(TableError::AlreadyOwned { piece: id, owner });
            }
            piece.owned_by = Some(client);
        } else {
            if piece.owned_by != Some(client) {
                return Err(TableError::Unauthorized {
                    piece: id,
                    reason: "not the owner",
                });
            }
            piece.owned_by = None;
        }

        tracing::debug!(piece = %id, %client, own, "ownership changed");
        Ok(piece.owned_by)
    }

    /// Drops every selection and ownership `client` holds.
    pub fn release_client(&mut self, client: ConnectionId) -> Released {
        let mut released = Released::default();
        for piece in self.pieces.values_mut() {
            if piece.selected_by == Some(client) {
                piece.selected_by = None;
                released.deselected.push(piece.id);
            }
            if piece.owned_by == Some(client) {
                piece.owned_by = None;
                released.disowned.push(piece.id);
            }
        }
        if !released.is_empty() {
            tracing::debug!(
                %client,
                deselected = released.deselected.len(),
                disowned = released.disowned.len(),
                "released client claims"
            );
        }
        released
    }

    // -----------------------------------------------------------------------
    // Stacking
    // -----------------------------------------------------------------------

    /// Every piece resting on `id`, directly or transitively.
    ///
    /// The walk never revisits a piece, so it terminates even on a
    /// corrupted (cyclic) graph; `id` itself is never included.
    pub fn above_closure(&self, id: PieceId) -> Vec<PieceId> {
        let mut visited = BTreeSet::from([id]);
        let mut closure = Vec::new();
        let mut pending: Vec<PieceId> = self
            .pieces
            .get(&id)
            .map(|piece| piece.above.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(next) = pending.pop() {
            if !visited.insert(next) {
                continue;
            }
            closure.push(next);
            if let Some(piece) = self.pieces.get(&next) {
                pending.extend(piece.above.iter().rev().copied());
            }
        }
        closure
    }

    /// `true` if no piece rests on itself, directly or transitively.
    pub fn check_acyclic(&self) -> bool {
        self.pieces.keys().all(|&id| !self.reaches(id, id))
    }

    /// Whether `target` is reachable from `from` through `above` links.
    fn reaches(&self, from: PieceId, target: PieceId) -> bool {
        let mut visited = BTreeSet::new();
        let mut pending = vec![from];
        while let Some(next) = pending.pop() {
            let Some(piece) = self.pieces.get(&next) else {
                continue;
            };
            for &up in &piece.above {
                if up == target {
                    return true;
                }
                if visited.insert(up) {
                    pending.push(up);
                }
            }
        }
        false
    }

    /// Unlinks `id` from the piece it rests on.
    fn detach(&mut self, id: PieceId) {
        let Some(parent) = self.pieces.get_mut(&id).and_then(|p| p.below.take())
        else {
            return;
        };
        if let Some(parent) = self.pieces.get_mut(&parent) {
            parent.above.retain(|&up| up != id);
        }
    }

    fn attach(&mut self, id: PieceId, base: PieceId) {
        if let Some(base) = self.pieces.get_mut(&base) {
            base.above.push(id);
        }
        if let Some(piece) = self.pieces.get_mut(&id) {
            piece.below = Some(base);
        }
    }

    /// Hands the pieces resting directly on `id` down to whatever `id`
    /// rests on, at `id`'s place in that stack. With nothing below `id`
    /// they become free-standing.
    fn hand_down_stack(&mut self, id: PieceId) {
        let Some(piece) = self.pieces.get_mut(&id) else {
            return;
        };
        let children = std::mem::take(&mut piece.above);
        let parent = piece.below;

        for child in &children {
            if let Some(child) = self.pieces.get_mut(child) {
                child.below = parent;
            }
        }
        if let Some(parent) = parent.and_then(|p| self.pieces.get_mut(&p)) {
            let at = parent
                .above
                .iter()
                .position(|&up| up == id)
                .unwrap_or(parent.above.len());
            parent.above.splice(at..at, children);
        }
    }

    /// The top-most piece, outside `exclude`, that a piece of `size`
    /// resting at `at` would land on.
    fn find_base(
        &self,
        at: Vec2,
        size: Vec2,
        exclude: &BTreeSet<PieceId>,
    ) -> Option<PieceId> {
        let footprint = crate::Rect::centered(at, size);
        self.order.iter().rev().copied().find(|candidate| {
            !exclude.contains(candidate)
                && self
                    .pieces
                    .get(candidate)
                    .is_some_and(|p| p.footprint().overlaps(&footprint))
        })
    }

    /// Moves `ids` to the top of the draw order, keeping their relative
    /// order.
    fn raise(&mut self, ids: &BTreeSet<PieceId>) {
        let (raised, rest): (Vec<PieceId>, Vec<PieceId>) =
            self.order.iter().copied().partition(|id| ids.contains(id));
        self.order = rest;
        self.order.extend(raised);
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Moves `id` to `target` over `duration` seconds (0 = instantly).
    ///
    /// The piece lands on the top-most piece its footprint overlaps at the
    /// destination and, with `snap_to_stack`, snaps to that base's stack
    /// delta; otherwise it snaps to its own grid. With `carry_stack`
    /// everything resting on it moves by the same displacement; without,
    /// those pieces stay behind on whatever it rested on.
    ///
    /// Returns the destination of every piece that moved, mover first.
    ///
    /// # Errors
    /// - [`TableError::NotFound`] / [`TableError::Unauthorized`] per
    ///   the usual control rules.
    /// - [`TableError::Unauthorized`] naming the piece if anything carried
    ///   along is owned by another client.
    /// - [`TableError::Invalid`] for a non-finite target, a negative or
    ///   non-finite duration, or a displacement that would leave any moved
    ///   piece at a non-finite location.
    pub fn move_piece(
        &mut self,
        client: ConnectionId,
        id: PieceId,
        target: Vec2,
        duration: f32,
    ) -> Result<Vec<(PieceId, Vec2)>, TableError> {
        if !is_finite(target) {
            return Err(TableError::Invalid {
                piece: id,
                reason: "target is not finite",
            });
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(TableError::Invalid {
                piece: id,
                reason: "duration must be finite and non-negative",
            });
        }
        let mover = self.controlled(client, id)?;
        let origin = mover.resting_location();
        let size = mover.size;
        let grid = mover.grid_size;

        let carried = if self.config.carry_stack {
            self.above_closure(id)
        } else {
            Vec::new()
        };
        self.not_owned_by_others(client, &carried)?;

        let group: BTreeSet<PieceId> =
            std::iter::once(id).chain(carried.iter().copied()).collect();
        let base = self.find_base(target, size, &group);
        let destination = match base.and_then(|b| self.pieces.get(&b)) {
            Some(base) if self.config.snap_to_stack => {
                base.resting_location() + base.stack_delta
            }
            _ => target.snapped(grid),
        };
        let delta = destination - origin;

        let mut moved = Vec::with_capacity(group.len());
        for pid in std::iter::once(id).chain(carried) {
            if let Some(piece) = self.pieces.get(&pid) {
                let dest = piece.resting_location() + delta;
                if !is_finite(dest) {
                    return Err(TableError::Invalid {
                        piece: pid,
                        reason: "destination is not finite",
                    });
                }
                moved.push((pid, dest));
            }
        }

        if !self.config.carry_stack {
            self.hand_down_stack(id);
        }
        self.detach(id);
        for &(pid, dest) in &moved {
            if let Some(piece) = self.pieces.get_mut(&pid) {
                set_destination(piece, dest, duration);
            }
        }
        if let Some(base) = base {
            self.attach(id, base);
        }
        self.raise(&group);

        tracing::debug!(
            piece = %id,
            %client,
            %destination,
            base = ?base,
            carried = moved.len() - 1,
            "piece moved"
        );
        Ok(moved)
    }

    /// Changes the visible face of `id`. Returns the new flag.
    pub fn flip(
        &mut self,
        client: ConnectionId,
        id: PieceId,
        mode: FlipMode,
    ) -> Result<bool, TableError> {
        self.controlled(client, id)?;
        let piece = self.piece_mut(id)?;
        piece.flipped = match mode {
            FlipMode::FaceDown => true,
            FlipMode::FaceUp => false,
            FlipMode::Toggle => !piece.flipped,
        };
        tracing::debug!(piece = %id, %client, flipped = piece.flipped, "piece flipped");
        Ok(piece.flipped)
    }

    /// Rotates `id` and everything resting on it by `step` degrees.
    ///
    /// Returns the new rotation of every affected piece. Refused with
    /// [`TableError::Unauthorized`] if a piece on the stack is owned by
    /// another client.
    pub fn rotate(
        &mut self,
        client: ConnectionId,
        id: PieceId,
        step: u16,
    ) -> Result<Vec<(PieceId, u16)>, TableError> {
        self.controlled(client, id)?;
        let carried = self.above_closure(id);
        self.not_owned_by_others(client, &carried)?;

        let group: Vec<PieceId> = std::iter::once(id).chain(carried).collect();
        let mut rotated = Vec::with_capacity(group.len());
        for pid in group {
            if let Some(piece) = self.pieces.get_mut(&pid) {
                piece.rotation = ((u32::from(piece.rotation) + u32::from(step))
                    % 360) as u16;
                rotated.push((pid, piece.rotation));
            }
        }
        tracing::debug!(piece = %id, %client, step, "piece rotated");
        Ok(rotated)
    }

    /// Randomly permutes the locations and draw slots of `ids`.
    ///
    /// Stacking among the shuffled pieces is rebuilt from scratch: each
    /// lands on the top-most piece below it in the new draw order that it
    /// overlaps. Pieces that rested on a shuffled piece, but were not
    /// shuffled themselves, are left free-standing.
    ///
    /// Returns each shuffled piece with its new location, bottom to top.
    ///
    /// # Errors
    /// - [`TableError::Invalid`] for fewer than two pieces or a duplicate.
    /// - [`TableError::NotFound`] / [`TableError::Unauthorized`] if any
    ///   listed piece fails the control rules. Nothing is changed.
    pub fn shuffle<R: Rng + ?Sized>(
        &mut self,
        client: ConnectionId,
        ids: &[PieceId],
        rng: &mut R,
    ) -> Result<Vec<(PieceId, Vec2)>, TableError> {
        let first = ids.first().copied().unwrap_or(PieceId::NONE);
        if ids.len() < 2 {
            return Err(TableError::Invalid {
                piece: first,
                reason: "shuffle needs at least two pieces",
            });
        }
        let set: BTreeSet<PieceId> = ids.iter().copied().collect();
        if set.len() != ids.len() {
            return Err(TableError::Invalid {
                piece: first,
                reason: "duplicate piece in shuffle",
            });
        }
        for &id in ids {
            self.controlled(client, id)?;
        }

        let slots: Vec<usize> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, id)| set.contains(id))
            .map(|(slot, _)| slot)
            .collect();
        let locations: Vec<Vec2> = slots
            .iter()
            .filter_map(|&slot| self.pieces.get(&self.order[slot]))
            .map(Piece::resting_location)
            .collect();
        let mut permuted: Vec<PieceId> =
            slots.iter().map(|&slot| self.order[slot]).collect();
        permuted.shuffle(rng);

        // Unlink the shuffled pieces from everything.
        for &id in &permuted {
            self.detach(id);
            let children = self
                .pieces
                .get_mut(&id)
                .map(|piece| std::mem::take(&mut piece.above))
                .unwrap_or_default();
            for child in children {
                if let Some(child) = self.pieces.get_mut(&child) {
                    child.below = None;
                }
            }
        }

        for ((&slot, &location), &id) in slots.iter().zip(&locations).zip(&permuted) {
            self.order[slot] = id;
            if let Some(piece) = self.pieces.get_mut(&id) {
                piece.location = location;
                piece.animation = None;
            }
        }

        // Restack bottom to top, only onto pieces lower in the draw order.
        for &slot in &slots {
            let id = self.order[slot];
            let Some(footprint) = self.pieces.get(&id).map(Piece::footprint) else {
                continue;
            };
            let base = self.order[..slot].iter().rev().copied().find(|below| {
                self.pieces
                    .get(below)
                    .is_some_and(|p| p.footprint().overlaps(&footprint))
            });
            if let Some(base) = base {
                self.attach(id, base);
            }
        }

        tracing::debug!(%client, count = ids.len(), "pieces shuffled");
        Ok(slots
            .iter()
            .map(|&slot| self.order[slot])
            .zip(locations)
            .collect())
    }

    /// Takes `id` off the table and returns it.
    ///
    /// Whatever rested on it drops onto whatever it rested on, in its
    /// place; the stack closes up. The piece's selection and ownership go
    /// with it.
    pub fn remove(
        &mut self,
        client: ConnectionId,
        id: PieceId,
    ) -> Result<Piece, TableError> {
        self.controlled(client, id)?;

        self.hand_down_stack(id);
        self.detach(id);
        self.order.retain(|&other| other != id);
        let piece = self.pieces.remove(&id).ok_or(TableError::NotFound(id))?;

        tracing::info!(piece = %id, %client, "piece removed");
        Ok(piece)
    }

    // -----------------------------------------------------------------------
    // Animation
    // -----------------------------------------------------------------------

    /// Advances every animation by `dt` seconds.
    ///
    /// Returns `true` while any piece is still moving.
    pub fn animate(&mut self, dt: f32) -> bool {
        let mut running = false;
        for piece in self.pieces.values_mut() {
            running |= piece.advance(dt);
        }
        running
    }

    pub fn is_animating(&self) -> bool {
        self.pieces.values().any(Piece::is_animating)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

fn is_finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

fn set_destination(piece: &mut Piece, destination: Vec2, duration: f32) {
    if duration > 0.0 {
        piece.animation = Some(Animation {
            target: destination,
            remaining: duration,
        });
    } else {
        piece.location = destination;
        piece.animation = None;
    }
}

// =========================================================================
// Tests
// =========================================================================
