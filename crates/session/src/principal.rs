use common::UserId;

/// An authenticated principal.
///
/// The email and display name are snapshots taken at sign-in; they are
/// copied into the user document when it is first created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable unique identifier assigned by the identity provider.
    pub uid: UserId,

    /// Email address, if the provider exposes one.
    pub email: Option<String>,

    /// Display name, if the provider exposes one.
    pub display_name: Option<String>,
}

impl Principal {
    /// Creates a principal with no profile fields.
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    /// Sets the email snapshot.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name snapshot.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
