//! Controller state behind the mutex.

use std::collections::BTreeSet;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use emporium_core::{Cart, CartError, CartMutation, UserId};

use super::{CartView, Identity};
use crate::action::ActionKey;
use crate::error::ClientError;
use crate::summary::CartSummary;

/// The signed-in identity and the token that cancels its requests.
pub(super) struct Session {
    pub identity: Identity,
    pub cancel: CancellationToken,
}

/// What a request needs to run after the lock is released.
#[derive(Clone)]
pub(super) struct Ticket {
    pub epoch: u64,
    pub token: SecretString,
    pub cancel: CancellationToken,
}

impl Ticket {
    /// A token for one request; cancelled by sign-out or by its own timeout.
    pub fn child(&self) -> CancellationToken {
        self.cancel.child_token()
    }
}

/// A mutation published ahead of the server.
///
/// Kept after confirmation while an older mutation is still unconfirmed, since
/// until then the shadow is rebuilt from a snapshot that predates it.
struct Optimistic {
    seq: u64,
    mutation: CartMutation,
    /// Authoritative snapshot when the mutation was issued.
    base: Option<Cart>,
    /// Version the server committed it at.
    committed: Option<u64>,
}

impl Optimistic {
    fn base_version(&self) -> u64 {
        self.base.as_ref().map_or(0, |cart| cart.version)
    }
}

#[derive(Default)]
pub(super) struct ControllerState {
    pub session: Option<Session>,
    /// Bumped on every identity change; responses from older epochs are ignored.
    pub epoch: u64,
    /// Last snapshot the server returned.
    authoritative: Option<Cart>,
    /// Issue order.
    optimistic: Vec<Optimistic>,
    pub pending: BTreeSet<ActionKey>,
    pub fetches: usize,
    pub error: Option<ClientError>,
    next_seq: u64,
}

impl ControllerState {
    pub fn ticket(&self) -> Option<Ticket> {
        self.session.as_ref().map(|session| Ticket {
            epoch: self.epoch,
            token: session.identity.token.clone(),
            cancel: session.cancel.clone(),
        })
    }

    /// Forget everything tied to the current identity and start a new epoch.
    pub fn reset(&mut self, session: Option<Session>) {
        if let Some(old) = self.session.take() {
            old.cancel.cancel();
        }
        self.epoch += 1;
        self.session = session;
        self.authoritative = None;
        self.optimistic.clear();
        self.pending.clear();
        self.fetches = 0;
        self.error = None;
    }

    /// Record a mutation as optimistically applied. Returns its sequence number.
    pub fn push_optimistic(&mut self, mutation: CartMutation) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.optimistic.push(Optimistic {
            seq,
            mutation,
            base: self.authoritative.clone(),
            committed: None,
        });
        seq
    }

    /// Drop a mutation the server never committed. Confirmed ones are kept.
    pub fn discard(&mut self, seq: u64) {
        self.optimistic
            .retain(|pending| pending.seq != seq || pending.committed.is_some());
        self.prune();
    }

    /// Mark a mutation as committed by the server at `version`.
    pub fn confirm(&mut self, seq: u64, version: u64) {
        if let Some(pending) = self.optimistic.iter_mut().find(|p| p.seq == seq) {
            pending.committed = Some(version);
        }
        self.prune();
    }

    /// Forget confirmed mutations already contained in the snapshot the
    /// shadow is rebuilt from.
    fn prune(&mut self) {
        let anchor = self
            .optimistic
            .iter()
            .find(|pending| pending.committed.is_none())
            .map(Optimistic::base_version);
        self.optimistic.retain(|pending| match (pending.committed, anchor) {
            (None, _) => true,
            (Some(committed), Some(anchor)) => committed > anchor,
            (Some(_), None) => false,
        });
    }

    /// Whether a snapshot has been loaded for this session.
    pub const fn has_snapshot(&self) -> bool {
        self.authoritative.is_some()
    }

    /// Check that `mutation` applies to the current shadow.
    pub fn preview(&self, mutation: &CartMutation) -> Result<(), CartError> {
        let Some(mut cart) = self.shadow().or_else(|| self.user_id().map(Cart::empty)) else {
            return Ok(());
        };
        cart.apply(mutation)
    }

    /// Take a server snapshot unless it is older than the one already held.
    pub fn adopt(&mut self, cart: Cart) -> bool {
        if let Some(current) = &self.authoritative
            && cart.version < current.version
        {
            tracing::debug!(
                stale = cart.version,
                current = current.version,
                "discarding stale cart snapshot"
            );
            return false;
        }
        self.authoritative = Some(cart);
        true
    }

    /// The shadow cart: the authoritative snapshot with every unconfirmed
    /// mutation re-applied in issue order.
    ///
    /// A snapshot newer than an unconfirmed mutation's base may or may not
    /// contain it. Until that mutation is confirmed, the shadow is rebuilt
    /// from its base instead, replaying the mutations confirmed since then in
    /// commit order before the unconfirmed ones. A pending add is never
    /// counted twice.
    pub fn shadow(&self) -> Option<Cart> {
        let latest = self.authoritative.as_ref().map_or(0, |cart| cart.version);
        let oldest = self
            .optimistic
            .iter()
            .find(|pending| pending.committed.is_none());

        let anchor = match oldest {
            Some(pending) if pending.base_version() < latest => pending.base.as_ref(),
            _ => self.authoritative.as_ref(),
        };
        let mut cart = match (anchor, &self.session) {
            (Some(cart), _) => cart.clone(),
            (None, Some(session)) if !self.optimistic.is_empty() => {
                Cart::empty(session.identity.user_id)
            }
            _ => return None,
        };
        let anchor_version = cart.version;

        let mut confirmed: Vec<&Optimistic> = self
            .optimistic
            .iter()
            .filter(|p| p.committed.is_some_and(|version| version > anchor_version))
            .collect();
        confirmed.sort_by_key(|p| p.committed);
        let unconfirmed = self.optimistic.iter().filter(|p| p.committed.is_none());

        for pending in confirmed.into_iter().chain(unconfirmed) {
            // The server decides; a mutation that does not apply locally
            // (e.g. updating a line this client has not seen) just has no preview.
            if let Err(e) = cart.apply(&pending.mutation) {
                tracing::trace!(error = %e, "optimistic mutation has no local effect");
            }
        }

        Some(cart)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(|session| session.identity.user_id)
    }

    pub fn view(&self) -> CartView {
        let cart = self.shadow();
        CartView {
            user_id: self.user_id(),
            summary: CartSummary::of(cart.as_ref()),
            cart,
            loading: self.fetches > 0,
            error: self.error.clone(),
            pending: self.pending.clone(),
        }
    }
}
