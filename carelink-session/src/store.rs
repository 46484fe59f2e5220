//! Session store port and the typed local mirror on top of it
//!
//! The store holds a handful of JSON values under fixed keys. `Mirror`
//! gives typed access to the users map, the current user and the token maps.

use carelink_common::UserRecord;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Keys understood by a session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// email -> UserRecord
    Users,
    /// email of the signed-in user
    CurrentUser,
    /// token -> email
    VerifyTokens,
    /// token -> email
    ResetTokens,
    /// Session issued by the hosted auth service
    RemoteSession,
}

impl StoreKey {
    pub fn name(&self) -> &'static str {
        match self {
            StoreKey::Users => "users",
            StoreKey::CurrentUser => "currentUser",
            StoreKey::VerifyTokens => "verifyTokens",
            StoreKey::ResetTokens => "resetTokens",
            StoreKey::RemoteSession => "remoteSession",
        }
    }
}

/// Key/value storage for session state
pub trait SessionStore: Send + Sync {
    fn get(&self, key: StoreKey) -> AuthResult<Option<Value>>;
    fn set(&self, key: StoreKey, value: Value) -> AuthResult<()>;
    fn delete(&self, key: StoreKey) -> AuthResult<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> AuthResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::Store("session store lock poisoned".to_string()))
}

/// In-process store, used by tests and short-lived sessions
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<StoreKey, Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: StoreKey) -> AuthResult<Option<Value>> {
        Ok(lock(&self.entries)?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: Value) -> AuthResult<()> {
        lock(&self.entries)?.insert(key, value);
        Ok(())
    }

    fn delete(&self, key: StoreKey) -> AuthResult<()> {
        lock(&self.entries)?.remove(&key);
        Ok(())
    }
}

/// Store persisted as one JSON object in a file
///
/// A missing file is an empty store. An unreadable one is logged and
/// treated as empty, then overwritten on the next write.
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> AuthResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(
                    "Session file {} is not a JSON object, starting empty",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: StoreKey) -> AuthResult<Option<Value>> {
        let _guard = lock(&self.guard)?;
        Ok(self.read_all()?.remove(key.name()))
    }

    fn set(&self, key: StoreKey, value: Value) -> AuthResult<()> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_all()?;
        map.insert(key.name().to_string(), value);
        self.write_all(map)
    }

    fn delete(&self, key: StoreKey) -> AuthResult<()> {
        let _guard = lock(&self.guard)?;
        let mut map = self.read_all()?;
        if map.remove(key.name()).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }
}

pub type UsersMap = BTreeMap<String, UserRecord>;
pub type TokenMap = BTreeMap<String, String>;

/// Which token map an operation works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verify,
    Reset,
}

impl TokenKind {
    fn key(&self) -> StoreKey {
        match self {
            TokenKind::Verify => StoreKey::VerifyTokens,
            TokenKind::Reset => StoreKey::ResetTokens,
        }
    }
}

/// Typed view of the local mirror
#[derive(Clone)]
pub struct Mirror {
    store: Arc<dyn SessionStore>,
}

impl Mirror {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Raw JSON object under `key`; anything else reads as empty
    fn raw_map(&self, key: StoreKey) -> AuthResult<Map<String, Value>> {
        match self.store.get(key)? {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => {
                warn!("'{}' entry is not a JSON object, starting empty", key.name());
                Ok(Map::new())
            }
        }
    }

    /// Decode entries one by one, skipping the ones that do not decode
    fn decode_entries<T: DeserializeOwned>(
        key: StoreKey,
        map: Map<String, Value>,
    ) -> BTreeMap<String, T> {
        map.into_iter()
            .filter_map(|(id, value)| match serde_json::from_value(value) {
                Ok(decoded) => Some((id, decoded)),
                Err(e) => {
                    warn!("Skipping malformed '{}' entry {}: {}", key.name(), id, e);
                    None
                }
            })
            .collect()
    }

    /// Decodable user records; malformed ones are skipped, not dropped
    pub fn users(&self) -> AuthResult<UsersMap> {
        Ok(Self::decode_entries(StoreKey::Users, self.raw_map(StoreKey::Users)?))
    }

    pub fn user(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let Some(value) = self.raw_map(StoreKey::Users)?.remove(email) else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Stored record for {} is malformed: {}", email, e);
                Ok(None)
            }
        }
    }

    /// Read-modify-write of one record; sibling entries are written back verbatim
    fn modify_user<F>(&self, email: &str, create: bool, f: F) -> AuthResult<Option<UserRecord>>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut users = self.raw_map(StoreKey::Users)?;
        let mut record = match users.remove(email) {
            Some(value) => serde_json::from_value::<UserRecord>(value).map_err(|e| {
                AuthError::Store(format!("Stored record for {} is malformed: {}", email, e))
            })?,
            None if create => UserRecord::new(email),
            None => return Ok(None),
        };

        f(&mut record);
        users.insert(email.to_string(), serde_json::to_value(&record)?);
        self.store.set(StoreKey::Users, Value::Object(users))?;
        Ok(Some(record))
    }

    /// Apply `f` to the record for `email`, creating it first if absent
    pub fn update_user<F>(&self, email: &str, f: F) -> AuthResult<UserRecord>
    where
        F: FnOnce(&mut UserRecord),
    {
        self.modify_user(email, true, f)?
            .ok_or_else(|| AuthError::Store(format!("Record for {} was not written", email)))
    }

    /// Apply `f` only when a record for `email` exists
    pub fn update_existing<F>(&self, email: &str, f: F) -> AuthResult<Option<UserRecord>>
    where
        F: FnOnce(&mut UserRecord),
    {
        self.modify_user(email, false, f)
    }

    pub fn current_user(&self) -> AuthResult<Option<String>> {
        Ok(self
            .store
            .get(StoreKey::CurrentUser)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|email| !email.is_empty()))
    }

    pub fn set_current_user(&self, email: Option<&str>) -> AuthResult<()> {
        match email {
            Some(email) => self
                .store
                .set(StoreKey::CurrentUser, Value::String(email.to_string())),
            None => self.store.delete(StoreKey::CurrentUser),
        }
    }

    pub fn tokens(&self, kind: TokenKind) -> AuthResult<TokenMap> {
        Ok(Self::decode_entries(kind.key(), self.raw_map(kind.key())?))
    }

    pub fn insert_token(&self, kind: TokenKind, token: &str, email: &str) -> AuthResult<()> {
        let mut tokens = self.raw_map(kind.key())?;
        tokens.insert(token.to_string(), Value::String(email.to_string()));
        self.store.set(kind.key(), Value::Object(tokens))
    }

    /// Remove `token` and return the email it was issued for
    pub fn take_token(&self, kind: TokenKind, token: &str) -> AuthResult<Option<String>> {
        let mut tokens = self.raw_map(kind.key())?;
        let Some(value) = tokens.remove(token) else {
            return Ok(None);
        };
        self.store.set(kind.key(), Value::Object(tokens))?;
        Ok(value.as_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_store_get_set_delete() {
        let store = MemorySessionStore::new();
        assert!(store.get(StoreKey::Users).unwrap().is_none());
        store.set(StoreKey::CurrentUser, json!("a@example.com")).unwrap();
        assert_eq!(
            store.get(StoreKey::CurrentUser).unwrap(),
            Some(json!("a@example.com"))
        );
        store.delete(StoreKey::CurrentUser).unwrap();
        assert!(store.get(StoreKey::CurrentUser).unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileSessionStore::new(&path)
            .set(StoreKey::CurrentUser, json!("a@example.com"))
            .unwrap();

        let reopened = FileSessionStore::new(&path);
        assert_eq!(
            reopened.get(StoreKey::CurrentUser).unwrap(),
            Some(json!("a@example.com"))
        );
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["currentUser"], "a@example.com");
    }

    #[test]
    fn test_file_store_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.get(StoreKey::Users).unwrap().is_none());
        store.set(StoreKey::Users, json!({})).unwrap();
        assert_eq!(store.get(StoreKey::Users).unwrap(), Some(json!({})));
    }

    #[test]
    fn test_mirror_malformed_users_reads_empty() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(StoreKey::Users, json!("oops")).unwrap();
        let mirror = Mirror::new(store);
        assert!(mirror.users().unwrap().is_empty());
    }

    #[test]
    fn test_update_user_creates_and_update_existing_does_not() {
        let mirror = Mirror::new(Arc::new(MemorySessionStore::new()));

        assert!(mirror
            .update_existing("a@example.com", |u| u.verified = true)
            .unwrap()
            .is_none());
        assert!(mirror.user("a@example.com").unwrap().is_none());

        let record = mirror
            .update_user("a@example.com", |u| u.verified = true)
            .unwrap();
        assert!(record.verified);
        assert!(mirror.user("a@example.com").unwrap().unwrap().verified);
    }

    #[test]
    fn test_malformed_sibling_survives_update() {
        let store = Arc::new(MemorySessionStore::new());
        let odd = json!({"email": "odd@example.com", "verified": "yes"});
        store
            .set(
                StoreKey::Users,
                json!({
                    "good@example.com": {"email": "good@example.com", "verified": true, "role": "Parent"},
                    "odd@example.com": odd.clone()
                }),
            )
            .unwrap();
        let mirror = Mirror::new(store.clone());

        let users = mirror.users().unwrap();
        assert_eq!(users.len(), 1);
        assert!(mirror.user("odd@example.com").unwrap().is_none());

        mirror
            .update_user("new@example.com", |u| u.verified = true)
            .unwrap();
        mirror
            .update_existing("good@example.com", |u| u.role = Some(carelink_common::Role::Provider))
            .unwrap();

        let raw = store.get(StoreKey::Users).unwrap().unwrap();
        assert_eq!(raw["odd@example.com"], odd);
        assert_eq!(raw["good@example.com"]["role"], "Provider");
        assert_eq!(raw["new@example.com"]["verified"], true);
    }

    #[test]
    fn test_malformed_target_record_is_not_overwritten() {
        let store = Arc::new(MemorySessionStore::new());
        let odd = json!({"email": "odd@example.com", "verified": "yes"});
        store
            .set(StoreKey::Users, json!({"odd@example.com": odd.clone()}))
            .unwrap();
        let mirror = Mirror::new(store.clone());

        assert!(matches!(
            mirror.update_user("odd@example.com", |u| u.verified = true),
            Err(AuthError::Store(_))
        ));
        let raw = store.get(StoreKey::Users).unwrap().unwrap();
        assert_eq!(raw["odd@example.com"], odd);
    }

    #[test]
    fn test_tokens_redeem_once_and_keep_siblings() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .set(StoreKey::VerifyTokens, json!({"junk": 7}))
            .unwrap();
        let mirror = Mirror::new(store.clone());

        mirror
            .insert_token(TokenKind::Verify, "abc", "a@example.com")
            .unwrap();
        assert_eq!(mirror.tokens(TokenKind::Verify).unwrap().len(), 1);
        assert_eq!(
            mirror.take_token(TokenKind::Verify, "abc").unwrap().as_deref(),
            Some("a@example.com")
        );
        assert!(mirror.take_token(TokenKind::Verify, "abc").unwrap().is_none());
        assert_eq!(store.get(StoreKey::VerifyTokens).unwrap(), Some(json!({"junk": 7})));
    }

    #[test]
    fn test_empty_current_user_is_none() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(StoreKey::CurrentUser, json!("")).unwrap();
        assert!(Mirror::new(store).current_user().unwrap().is_none());
    }
}
