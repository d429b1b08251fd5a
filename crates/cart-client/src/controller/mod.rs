//! Cart Client Controller.
//!
//! Holds the shadow cart for the signed-in user and runs every intent through
//! the same lifecycle:
//!
//! 1. apply the mutation optimistically and publish the new view
//! 2. mark the action key pending
//! 3. send the request, bounded by the timeout and the session's cancel token
//! 4. on success adopt the server snapshot (unless a newer one is already held)
//! 5. on failure drop the optimistic mutation, record the error and re-fetch
//! 6. unmark the key on every exit path
//!
//! Concurrent actions on different keys each keep their own optimistic
//! mutation, so one rolling back never discards another's effect.

mod state;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use emporium_core::api::CreateOrderRequest;
use emporium_core::{
    Cart, CartError, CartMutation, Order, ProductId, ProductSnapshot, ShippingAddress, UserId,
};

use self::state::{ControllerState, Session, Ticket};
use crate::action::ActionKey;
use crate::api::CartApi;
use crate::error::ClientError;
use crate::summary::CartSummary;

/// Who the cart belongs to, and the bearer token that proves it.
#[derive(Debug, Clone)]
pub struct Identity {
    user_id: UserId,
    token: SecretString,
}

impl Identity {
    #[must_use]
    pub const fn new(user_id: UserId, token: SecretString) -> Self {
        Self { user_id, token }
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Everything a consumer renders. Published on every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    /// Signed-in user, if any.
    pub user_id: Option<UserId>,
    /// The shadow cart. `None` when signed out or not yet fetched.
    pub cart: Option<Cart>,
    pub summary: CartSummary,
    /// A loader-visible fetch is in flight.
    pub loading: bool,
    /// Last failure, cleared when the next action starts.
    pub error: Option<ClientError>,
    /// Actions currently in flight.
    pub pending: BTreeSet<ActionKey>,
}

/// Client-resident cart state machine.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct CartController {
    api: Arc<dyn CartApi>,
    timeout: Duration,
    state: Mutex<ControllerState>,
    view: watch::Sender<CartView>,
}

impl std::fmt::Debug for CartController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartController")
            .field("timeout", &self.timeout)
            .field("view", &*self.view.borrow())
            .finish_non_exhaustive()
    }
}

/// Clears a pending key (and any optimistic mutation it still owns) when the
/// action ends, however it ends.
struct InFlight<'a> {
    controller: &'a CartController,
    ticket: Ticket,
    key: Option<ActionKey>,
    seq: Option<u64>,
    loading: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.epoch != self.ticket.epoch {
            return;
        }
        if let Some(key) = self.key {
            state.pending.remove(&key);
        }
        if let Some(seq) = self.seq {
            state.discard(seq);
        }
        if self.loading {
            state.fetches = state.fetches.saturating_sub(1);
        }
        self.controller.publish(&state);
    }
}

impl CartController {
    /// Create a signed-out controller.
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, timeout: Duration) -> Self {
        let state = ControllerState::default();
        let (view, _) = watch::channel(state.view());
        Self {
            api,
            timeout,
            state: Mutex::new(state),
            view,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ControllerState) {
        self.view.send_replace(state.view());
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Receive every published [`CartView`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.view.subscribe()
    }

    /// The current view.
    #[must_use]
    pub fn view(&self) -> CartView {
        self.view.borrow().clone()
    }

    /// The shadow cart.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.view.borrow().cart.clone()
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.view.borrow().summary
    }

    /// Whether an action with this key is in flight. Callers should disable
    /// the control that triggers it while this is true.
    #[must_use]
    pub fn is_action_pending(&self, key: ActionKey) -> bool {
        self.lock().pending.contains(&key)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ClientError> {
        self.lock().error.clone()
    }

    pub fn clear_error(&self) {
        let mut state = self.lock();
        state.error = None;
        self.publish(&state);
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Sign in, switch user, or sign out.
    ///
    /// A new user starts a fresh session: requests of the previous one are
    /// cancelled, its shadow cart is dropped, and the cart is fetched once.
    /// Signing out clears the shadow cart without a request. A new token for
    /// the same user replaces the credential, and retries the fetch only if no
    /// cart has loaded yet or the last load failed.
    ///
    /// # Errors
    ///
    /// Returns the initial fetch's error.
    #[instrument(skip(self, identity), fields(user_id = ?identity.as_ref().map(Identity::user_id)))]
    pub async fn set_identity(&self, identity: Option<Identity>) -> Result<(), ClientError> {
        {
            let mut state = self.lock();

            if let (Some(session), Some(next)) = (state.session.as_mut(), identity.as_ref())
                && session.identity.user_id == next.user_id
            {
                session.identity = next.clone();
                if state.has_snapshot() && state.error.is_none() {
                    return Ok(());
                }
                tracing::debug!("new token for same user, retrying cart fetch");
            } else {
                let signed_in = identity.is_some();
                state.reset(identity.map(|identity| Session {
                    identity,
                    cancel: CancellationToken::new(),
                }));
                self.publish(&state);

                if !signed_in {
                    tracing::debug!("signed out, cart cleared");
                    return Ok(());
                }
            }
        }

        self.fetch_cart().await.map(|_| ())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch the authoritative cart with the loader visible.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when signed out; otherwise the request's error, which
    /// is also recorded in the error slot.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<Cart, ClientError> {
        let in_flight = {
            let mut state = self.lock();
            let ticket = state.ticket().ok_or(ClientError::Unauthenticated)?;
            state.fetches += 1;
            state.error = None;
            self.publish(&state);
            InFlight {
                controller: self,
                ticket,
                key: None,
                seq: None,
                loading: true,
            }
        };

        let ticket = &in_flight.ticket;
        let cancel = ticket.child();
        let result = self
            .bounded(&cancel, self.api.fetch_cart(&ticket.token, &cancel))
            .await;

        let mut state = self.lock();
        if state.epoch != ticket.epoch {
            return Err(ClientError::Cancelled);
        }
        match result {
            Ok(cart) => {
                state.adopt(cart.clone());
                self.publish(&state);
                Ok(cart)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch cart");
                state.error = Some(err.clone());
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// The user's orders, newest first. Does not touch the cart or error slot.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when signed out; otherwise the request's error.
    #[instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, ClientError> {
        let ticket = self.lock().ticket().ok_or(ClientError::Unauthenticated)?;
        let cancel = ticket.child();
        self.bounded(&cancel, self.api.list_orders(&ticket.token, &cancel))
            .await
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Add `quantity` of a product, or increase an existing line.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero; see [`Self::update_quantity`] for the rest.
    pub async fn add_to_cart(
        &self,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<Cart, ClientError> {
        if quantity == 0 {
            return Err(ClientError::InvalidQuantity(0));
        }
        self.mutate(CartMutation::Add { product, quantity }).await
    }

    /// Overwrite a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` for a negative quantity (nothing is attempted)
    /// - `Unauthenticated` when signed out (nothing is attempted)
    /// - `ActionPending` when the same action is already in flight
    /// - `InvalidState` when the resulting cart total cannot be represented
    ///   (nothing is attempted)
    /// - the request's error, after the shadow cart has been rolled back
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Cart, ClientError> {
        if quantity < 0 {
            return Err(ClientError::InvalidQuantity(quantity));
        }
        self.mutate(CartMutation::SetQuantity {
            product_id,
            quantity,
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<Cart, ClientError> {
        self.mutate(CartMutation::Remove { product_id }).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn clear_cart(&self) -> Result<Cart, ClientError> {
        self.mutate(CartMutation::Clear).await
    }

    /// Place an order for the whole cart.
    ///
    /// Not optimistic: on success the cart is re-fetched, since the server has
    /// already emptied it.
    ///
    /// # Errors
    ///
    /// `InvalidState` when the cart is empty; otherwise as for any action.
    #[instrument(skip(self, shipping_address))]
    pub async fn place_order(&self, shipping_address: ShippingAddress) -> Result<Order, ClientError> {
        let in_flight = self.begin(ActionKey::Checkout, None)?;
        let ticket = &in_flight.ticket;

        let request = CreateOrderRequest { shipping_address };
        let cancel = ticket.child();
        let result = self
            .bounded(&cancel, self.api.create_order(&ticket.token, &request, &cancel))
            .await;

        match result {
            Ok(order) => {
                tracing::info!(order_number = %order.order_number, "order placed");
                if let Err(e) = self.refetch(ticket).await {
                    tracing::warn!(error = %e, "failed to refresh cart after order");
                }
                Ok(order)
            }
            Err(err) => {
                let mut state = self.lock();
                if state.epoch == ticket.epoch {
                    state.error = Some(err.clone());
                    self.publish(&state);
                }
                Err(err)
            }
        }
    }

    /// Run one optimistic action through its full lifecycle.
    #[instrument(skip(self, mutation), fields(action = %ActionKey::for_mutation(&mutation)))]
    async fn mutate(&self, mutation: CartMutation) -> Result<Cart, ClientError> {
        let key = ActionKey::for_mutation(&mutation);
        let in_flight = self.begin(key, Some(&mutation))?;
        let ticket = &in_flight.ticket;

        let cancel = ticket.child();
        let result = self
            .bounded(&cancel, self.api.mutate_cart(&ticket.token, &mutation, &cancel))
            .await;

        let err = match result {
            // Optimistic -> reconciled
            Ok(cart) => {
                let mut state = self.lock();
                if state.epoch != ticket.epoch {
                    return Err(ClientError::Cancelled);
                }
                if let Some(seq) = in_flight.seq {
                    state.confirm(seq, cart.version);
                }
                state.adopt(cart.clone());
                self.publish(&state);
                tracing::debug!(version = cart.version, "action reconciled");
                return Ok(cart);
            }
            // Optimistic -> rolled back
            Err(err) => err,
        };

        {
            let mut state = self.lock();
            if state.epoch != ticket.epoch {
                return Err(err);
            }
            if let Some(seq) = in_flight.seq {
                state.discard(seq);
            }
            state.error = Some(err.clone());
            self.publish(&state);
        }
        tracing::warn!(error = %err, "action failed, rolling back");

        if let Err(e) = self.refetch(ticket).await {
            tracing::warn!(error = %e, "failed to re-fetch cart after rollback");
        }
        Err(err)
    }

    /// Mark `key` pending and publish the optimistic mutation, if any.
    fn begin(
        &self,
        key: ActionKey,
        mutation: Option<&CartMutation>,
    ) -> Result<InFlight<'_>, ClientError> {
        let mut state = self.lock();

        let Some(ticket) = state.ticket() else {
            state.error = Some(ClientError::Unauthenticated);
            self.publish(&state);
            return Err(ClientError::Unauthenticated);
        };

        if state.pending.contains(&key) {
            return Err(ClientError::ActionPending(key));
        }

        // A mutation whose totals cannot be represented never reaches the server.
        if let Some(mutation) = mutation
            && let Err(e @ (CartError::QuantityOverflow(_) | CartError::TotalOverflow)) =
                state.preview(mutation)
        {
            tracing::warn!(error = %e, "rejecting action before it is sent");
            let err = ClientError::InvalidState(e.to_string());
            state.error = Some(err.clone());
            self.publish(&state);
            return Err(err);
        }

        state.pending.insert(key);
        state.error = None;
        let seq = mutation.map(|mutation| state.push_optimistic(mutation.clone()));
        self.publish(&state);

        Ok(InFlight {
            controller: self,
            ticket,
            key: Some(key),
            seq,
            loading: false,
        })
    }

    /// Fetch the authoritative cart without the loader or the error slot.
    async fn refetch(&self, ticket: &Ticket) -> Result<(), ClientError> {
        let cancel = ticket.child();
        let cart = self
            .bounded(&cancel, self.api.fetch_cart(&ticket.token, &cancel))
            .await?;

        let mut state = self.lock();
        if state.epoch == ticket.epoch {
            state.adopt(cart);
            self.publish(&state);
        }
        Ok(())
    }

    /// Race a request against its cancel token and the timeout. On timeout
    /// the token is cancelled so the transport aborts too.
    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        request: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        tokio::select! {
            result = request => result,
            () = cancel.cancelled() => Err(ClientError::Cancelled),
            () = tokio::time::sleep(self.timeout) => {
                cancel.cancel();
                Err(ClientError::Timeout(self.timeout))
            }
        }
    }
}
