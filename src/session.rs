//! Session state of one run against the internal API.
//!
//! The `arl` cookie is fixed at construction. The API token and license
//! token are filled in once by a successful bootstrap and never refreshed:
//! a token that stops working ends the run rather than triggering a second
//! bootstrap.

use veil::Redact;

use crate::{arl::Arl, protocol::gateway::UserData};

#[derive(Clone, PartialEq, Eq, Redact)]
pub struct Session {
    arl: Arl,

    #[redact]
    api_token: Option<String>,

    #[redact]
    license_token: Option<String>,

    user_id: Option<u64>,
}

impl Session {
    #[must_use]
    pub fn new(arl: Arl) -> Self {
        Self {
            arl,
            api_token: None,
            license_token: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn arl(&self) -> &Arl {
        &self.arl
    }

    /// Token for authenticated gateway calls, once bootstrapped.
    #[must_use]
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    /// Token for media URL requests, if the account has one.
    #[must_use]
    pub fn license_token(&self) -> Option<&str> {
        self.license_token.as_deref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.api_token.is_some()
    }

    /// Stores the tokens of a bootstrap response.
    ///
    /// Only call this for a logged-in user with an API token; see
    /// [`UserData::is_logged_in`].
    pub(crate) fn authorize(&mut self, user_data: UserData, api_token: String) {
        self.user_id = Some(user_data.user.id);
        self.license_token = user_data.user.options.license_token;
        self.api_token = Some(api_token);
    }
}
