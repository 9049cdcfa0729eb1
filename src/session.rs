use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, error};

use crate::gateway::{Gateway, SessionEvent};
use crate::listeners::{Listeners, Subscription};
use crate::model::User;

#[derive(Debug)]
struct StoreState {
    user: Option<User>,
    loading: bool,
}

/// Who is signed in right now, for everything that renders.
///
/// The store starts out loading. `mount` performs one fetch of the
/// current user and then follows the gateway's session notifications
/// until `teardown`.
pub struct SessionStore<'g, G: Gateway + ?Sized> {
    gateway: &'g G,
    state: Rc<RefCell<StoreState>>,
    listeners: Listeners<Option<User>>,
    upstream: Option<Subscription>,
}

impl<'g, G: Gateway + ?Sized> SessionStore<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        SessionStore {
            gateway,
            state: Rc::new(RefCell::new(StoreState {
                user: None,
                loading: true,
            })),
            listeners: Listeners::new(),
            upstream: None,
        }
    }

    pub fn mount(&mut self) {
        self.teardown();

        let user = self.gateway.current_user().unwrap_or_else(|err| {
            error!(%err, "failed to fetch the current user");
            None
        });
        {
            let mut state = self.state.borrow_mut();
            state.user = user.clone();
            state.loading = false;
        }
        self.listeners.emit(&user);

        let state = Rc::clone(&self.state);
        let listeners = self.listeners.clone();
        self.upstream = Some(self.gateway.on_session_change(Box::new(
            move |event: &SessionEvent| {
                let user = event.user().cloned();
                debug!(signed_in = user.is_some(), "session store updated");
                {
                    let mut state = state.borrow_mut();
                    state.user = user.clone();
                    state.loading = false;
                }
                listeners.emit(&user);
            },
        )));
    }

    /// Stop following the gateway. The last known user is kept.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.upstream.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.upstream.is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Be told whenever the signed-in user changes.
    pub fn subscribe(&self, callback: Box<dyn Fn(&Option<User>)>) -> Subscription {
        self.listeners.subscribe(callback)
    }
}

impl<'g, G: Gateway + ?Sized> Drop for SessionStore<'g, G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqliteGateway;
    use chrono::Duration;

    #[test]
    fn loading_until_mounted() {
        let gateway = SqliteGateway::open_in_memory(Duration::hours(1)).unwrap();
        let mut store = SessionStore::new(&gateway);
        assert!(store.is_loading());
        assert_eq!(store.user(), None);

        store.mount();
        assert!(!store.is_loading());
        assert_eq!(store.user(), None);
    }

    #[test]
    fn follows_sign_in_and_sign_out() {
        let gateway = SqliteGateway::open_in_memory(Duration::hours(1)).unwrap();
        let mut store = SessionStore::new(&gateway);
        store.mount();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let _subscription = {
            let seen = Rc::clone(&seen);
            store.subscribe(Box::new(move |user: &Option<User>| {
                seen.borrow_mut().push(user.as_ref().map(|u| u.email.clone()));
            }))
        };

        gateway.sign_up("ada@example.com", "hunter22").unwrap();
        assert_eq!(store.user().map(|u| u.email), Some("ada@example.com".to_string()));

        gateway.sign_out().unwrap();
        assert_eq!(store.user(), None);
        assert_eq!(
            *seen.borrow(),
            vec![Some("ada@example.com".to_string()), None]
        );
    }

    #[test]
    fn mount_picks_up_existing_session_and_teardown_detaches() {
        let gateway = SqliteGateway::open_in_memory(Duration::hours(1)).unwrap();
        let session = gateway.sign_up("ada@example.com", "hunter22").unwrap();

        let mut store = SessionStore::new(&gateway);
        store.mount();
        assert_eq!(store.user(), Some(session.user.clone()));
        assert!(store.is_mounted());

        store.teardown();
        assert!(!store.is_mounted());
        gateway.sign_out().unwrap();
        assert_eq!(store.user(), Some(session.user));
    }
}
