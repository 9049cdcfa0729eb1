use crate::gateway::Gateway;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
}

pub const NAV_ITEMS: [NavItem; 5] = [
    NavItem { href: "/dashboard", label: "Dashboard" },
    NavItem { href: "/tasks", label: "Tasks" },
    NavItem { href: "/recipes", label: "Recipes" },
    NavItem { href: "/scanner", label: "Scanner" },
    NavItem { href: "/profile", label: "Profile" },
];

/// Pages that render without the navigation bar.
pub const HIDDEN_ON: [&str; 2] = ["/login", "/error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavBar {
    Hidden,
    /// The session is still being fetched; nothing is drawn yet.
    Loading,
    SignedIn {
        active: Option<NavItem>,
        email: String,
        avatar: char,
    },
    SignedOut {
        active: Option<NavItem>,
    },
}

impl NavBar {
    pub fn for_path<G: Gateway + ?Sized>(pathname: &str, store: &SessionStore<G>) -> NavBar {
        if HIDDEN_ON.contains(&pathname) {
            return NavBar::Hidden;
        }
        if store.is_loading() {
            return NavBar::Loading;
        }

        let active = NAV_ITEMS.iter().copied().find(|item| item.href == pathname);
        match store.user() {
            Some(user) => NavBar::SignedIn {
                active,
                avatar: user
                    .email
                    .chars()
                    .next()
                    .map(|c| c.to_ascii_uppercase())
                    .unwrap_or('?'),
                email: user.email,
            },
            None => NavBar::SignedOut { active },
        }
    }
}
