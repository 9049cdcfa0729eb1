use tracing::{error, info};

use crate::gateway::Gateway;
use crate::guard::Route;

pub const MISSING_CREDENTIALS: &str = "Email and password are required";

/// Sign in and return where to go next: the account page, or the error
/// page carrying the gateway's message.
pub fn login<G: Gateway + ?Sized>(gateway: &G, email: &str, password: &str) -> Route {
    if email.trim().is_empty() || password.is_empty() {
        return Route::error(MISSING_CREDENTIALS);
    }
    match gateway.sign_in(email, password) {
        Ok(session) => {
            info!(email = %session.user.email, "login succeeded");
            Route::Account
        }
        Err(err) => Route::error(&err.to_string()),
    }
}

pub fn signup<G: Gateway + ?Sized>(gateway: &G, email: &str, password: &str) -> Route {
    if email.trim().is_empty() || password.is_empty() {
        return Route::error(MISSING_CREDENTIALS);
    }
    match gateway.sign_up(email, password) {
        Ok(session) => {
            info!(email = %session.user.email, "signup succeeded");
            Route::Account
        }
        Err(err) => Route::error(&err.to_string()),
    }
}

/// Sign out and go to the login page, whatever the gateway says.
pub fn sign_out<G: Gateway + ?Sized>(gateway: &G) -> Route {
    if let Err(err) = gateway.sign_out() {
        error!(%err, "sign out failed");
    }
    Route::Login
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SqliteGateway;
    use crate::tasks::testing::CountingGateway;
    use chrono::Duration;

    fn gateway() -> CountingGateway {
        CountingGateway::new(SqliteGateway::open_in_memory(Duration::hours(1)).unwrap())
    }

    #[test]
    fn missing_credentials_never_reach_the_gateway() {
        let gateway = gateway();
        assert_eq!(login(&gateway, "", "secret"), Route::error(MISSING_CREDENTIALS));
        assert_eq!(signup(&gateway, "ada@example.com", ""), Route::error(MISSING_CREDENTIALS));
        assert_eq!(gateway.calls.get(), 0);
    }

    #[test]
    fn signup_then_login_lands_on_account() {
        let gateway = gateway();
        assert_eq!(signup(&gateway, "ada@example.com", "hunter22"), Route::Account);
        assert_eq!(sign_out(&gateway), Route::Login);
        assert_eq!(
            login(&gateway, "ada@example.com", "nope-nope"),
            Route::error("Invalid login credentials")
        );
        assert_eq!(login(&gateway, "ada@example.com", "hunter22"), Route::Account);
    }
}
