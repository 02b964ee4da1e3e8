use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::kv::KvStore;
use crate::model::TakenBy;

/// Key the signed-in state is persisted under
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Professor,
    Ta,
}

/// Signed-in user data structure
///
/// Never carries the password or its hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier, also used as the recorder id on sessions
    pub id: String,

    /// Display name
    pub name: String,

    /// Login email address
    pub email: String,

    /// Professor or teaching assistant
    pub role: Role,

    /// Department shown on the profile
    pub department: String,

    /// Optional avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl User {
    /// The identity stamped on sessions this user records.
    pub fn as_recorder(&self) -> TakenBy {
        TakenBy {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Fields a signed-in user may change on their profile
///
/// `None` leaves the current value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub profile_image: Option<String>,
}

/// Persisted authentication state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthState {
    user: Option<User>,
    is_authenticated: bool,
}

/// Directory entry: a user and the Argon2 hash of their password.
struct Account {
    user: User,
    password_hash: String,
}

/// Authentication store
///
/// Holds the signed-in user and mirrors every change into a [`KvStore`]
/// so the session survives a restart.
pub struct AuthStore {
    kv: KvStore,
    state: AuthState,
    directory: Vec<Account>,
}

impl AuthStore {
    /// Open the authentication store
    ///
    /// Restores any persisted session from `kv`. A persisted value that no
    /// longer decodes is discarded and the store starts signed out.
    ///
    /// # Arguments
    /// * `kv` - The key-value store holding the session
    ///
    /// # Returns
    /// * `Result<AuthStore, AuthError>` - The store, or an error if the user directory could not be built
    ///
    /// # Examples
    /// ```
    /// use attendance::auth::AuthStore;
    /// use attendance::kv::KvStore;
    ///
    /// let auth = AuthStore::open(KvStore::in_memory()).unwrap();
    /// assert!(!auth.is_authenticated());
    /// ```
    pub fn open(kv: KvStore) -> Result<Self, AuthError> {
        let mut state: AuthState = match kv.get(AUTH_STORAGE_KEY) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable session state: {}", e);
                AuthState::default()
            }),
            None => AuthState::default(),
        };
        state.is_authenticated &= state.user.is_some();

        Ok(AuthStore {
            kv,
            state,
            directory: built_in_directory()?,
        })
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    /// The signed-in user, or `AuthError::NotAuthenticated`
    pub fn require_user(&self) -> Result<&User, AuthError> {
        match (&self.state.user, self.state.is_authenticated) {
            (Some(user), true) => Ok(user),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Verify credentials and sign in
    ///
    /// # Arguments
    /// * `email` - Login email
    /// * `password` - Plaintext password, checked against the stored Argon2 hash
    ///
    /// # Returns
    /// * `Result<bool, AuthError>` - True when signed in, false if the credentials do not match
    ///
    /// # Errors
    /// * Returns an error if the new state cannot be persisted
    pub fn login(&mut self, email: &str, password: &str) -> Result<bool, AuthError> {
        let Some(account) = self.directory.iter().find(|a| a.user.email == email) else {
            info!("Login rejected for unknown email {}", email);
            return Ok(false);
        };

        if !verify_password(password, &account.password_hash)? {
            info!("Login rejected for {}", email);
            return Ok(false);
        }

        let state = AuthState {
            user: Some(account.user.clone()),
            is_authenticated: true,
        };
        self.persist(&state)?;
        self.state = state;
        info!("{} signed in", email);
        Ok(true)
    }

    /// Sign out and forget the persisted user
    ///
    /// The user stays signed in if the change cannot be persisted.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        let state = AuthState::default();
        self.persist(&state)?;
        self.state = state;
        info!("Signed out");
        Ok(())
    }

    /// Merge profile changes into the signed-in user
    ///
    /// Does nothing when nobody is signed in.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), AuthError> {
        let Some(current) = &self.state.user else {
            return Ok(());
        };
        let mut user = current.clone();

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(department) = update.department {
            user.department = department;
        }
        if let Some(image) = update.profile_image {
            user.profile_image = Some(image);
        }

        let state = AuthState {
            user: Some(user),
            is_authenticated: self.state.is_authenticated,
        };
        self.persist(&state)?;
        self.state = state;
        Ok(())
    }

    // Writes `state` through to the kv store; callers adopt it only on success
    fn persist(&mut self, state: &AuthState) -> Result<(), AuthError> {
        let json = serde_json::to_string(state)?;
        self.kv.set(AUTH_STORAGE_KEY, json)?;
        Ok(())
    }
}

fn built_in_directory() -> Result<Vec<Account>, AuthError> {
    let users = [
        User {
            id: "1".to_string(),
            name: "Dr. Rahul Sharma".to_string(),
            email: "rahul.sharma@iiita.ac.in".to_string(),
            role: Role::Professor,
            department: "Computer Science".to_string(),
            profile_image: Some(
                "https://images.pexels.com/photos/2379005/pexels-photo-2379005.jpeg?auto=compress&cs=tinysrgb&w=100"
                    .to_string(),
            ),
        },
        User {
            id: "2".to_string(),
            name: "Priya Mishra".to_string(),
            email: "priya.mishra@iiita.ac.in".to_string(),
            role: Role::Ta,
            department: "Computer Science".to_string(),
            profile_image: Some(
                "https://images.pexels.com/photos/415829/pexels-photo-415829.jpeg?auto=compress&cs=tinysrgb&w=100"
                    .to_string(),
            ),
        },
    ];

    users
        .into_iter()
        .map(|user| -> Result<Account, AuthError> {
            Ok(Account {
                user,
                password_hash: hash_password("password123")?,
            })
        })
        .collect()
}

/// Hash a password using Argon2
///
/// # Returns
/// * `Result<String, AuthError>` - The PHC-formatted password hash
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}

/// Verify a password against a stored Argon2 hash
fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_and_logout() {
        let mut auth = AuthStore::open(KvStore::in_memory()).unwrap();
        assert!(auth.require_user().is_err());

        assert!(!auth.login("rahul.sharma@iiita.ac.in", "wrong").unwrap());
        assert!(!auth.login("nobody@iiita.ac.in", "password123").unwrap());
        assert!(!auth.is_authenticated());

        assert!(auth.login("priya.mishra@iiita.ac.in", "password123").unwrap());
        let user = auth.require_user().unwrap();
        assert_eq!(user.id, "2");
        assert_eq!(user.role, Role::Ta);
        assert_eq!(user.as_recorder().name, "Priya Mishra");

        auth.logout().unwrap();
        assert!(auth.user().is_none());
        assert!(matches!(
            auth.require_user(),
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.bin.gz");

        let mut auth = AuthStore::open(KvStore::open(&path).unwrap()).unwrap();
        assert!(auth.login("rahul.sharma@iiita.ac.in", "password123").unwrap());
        auth.update_profile(ProfileUpdate {
            department: Some("Information Technology".to_string()),
            ..Default::default()
        })
        .unwrap();
        drop(auth);

        let restored = AuthStore::open(KvStore::open(&path).unwrap()).unwrap();
        assert!(restored.is_authenticated());
        let user = restored.user().unwrap();
        assert_eq!(user.name, "Dr. Rahul Sharma");
        assert_eq!(user.department, "Information Technology");
    }

    #[test]
    fn test_persisted_shape() {
        let mut kv = KvStore::in_memory();
        kv.set(
            AUTH_STORAGE_KEY,
            r#"{"user":{"id":"9","name":"Guest","email":"g@x","role":"professor","department":"Maths"},"isAuthenticated":true}"#
                .to_string(),
        )
        .unwrap();

        let auth = AuthStore::open(kv).unwrap();
        let user = auth.require_user().unwrap();
        assert_eq!(user.id, "9");
        assert_eq!(user.role, Role::Professor);
        assert!(user.profile_image.is_none());
    }

    #[test]
    fn test_unreadable_state_starts_signed_out() {
        let mut kv = KvStore::in_memory();
        kv.set(AUTH_STORAGE_KEY, "{not json".to_string()).unwrap();
        let auth = AuthStore::open(kv).unwrap();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_update_profile_requires_user() {
        let mut auth = AuthStore::open(KvStore::in_memory()).unwrap();
        auth.update_profile(ProfileUpdate {
            name: Some("Someone".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(auth.user().is_none());
    }

    #[test]
    fn test_authenticated_flag_without_user_is_ignored() {
        let mut kv = KvStore::in_memory();
        kv.set(
            AUTH_STORAGE_KEY,
            r#"{"user":null,"isAuthenticated":true}"#.to_string(),
        )
        .unwrap();

        let auth = AuthStore::open(kv).unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.require_user().is_err());
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("db");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let mut auth = AuthStore::open(KvStore::open(blocker.join("kv.bin.gz")).unwrap()).unwrap();
        assert!(auth.login("rahul.sharma@iiita.ac.in", "password123").is_err());
        assert!(!auth.is_authenticated());
        assert!(auth.user().is_none());
    }

    #[test]
    fn test_failed_logout_stays_signed_in() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db");
        let path = db.join("kv.bin.gz");

        let mut auth = AuthStore::open(KvStore::open(&path).unwrap()).unwrap();
        assert!(auth.login("priya.mishra@iiita.ac.in", "password123").unwrap());

        std::fs::remove_dir_all(&db).unwrap();
        std::fs::write(&db, b"file, not a directory").unwrap();

        assert!(auth.logout().is_err());
        assert!(auth.is_authenticated());
        assert!(auth
            .update_profile(ProfileUpdate {
                name: Some("Renamed".to_string()),
                ..Default::default()
            })
            .is_err());
        assert_eq!(auth.require_user().unwrap().name, "Priya Mishra");
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("other", &hash).unwrap());
        assert!(verify_password("s3cret", "garbage").is_err());
    }
}
