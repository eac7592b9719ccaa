use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use parking_lot::Mutex;
use time::Duration;

use crate::error::Error;
use crate::session::{MirrorRecord, SessionMirror};

const REFRESH_SUFFIX: &str = "_refresh";

/// Cookie names and attributes for the session mirror.
#[derive(Debug, Clone)]
pub(crate) struct CookieSettings {
    pub(crate) token_name: String,
    pub(crate) user_name: String,
    pub(crate) ttl_days: i64,
    pub(crate) secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            token_name: "causas_token".into(),
            user_name: "causas_user".into(),
            ttl_days: 7,
            secure: true,
        }
    }
}

impl CookieSettings {
    fn refresh_name(&self) -> String {
        format!("{}{REFRESH_SUFFIX}", self.token_name)
    }

    fn names(&self) -> [String; 3] {
        [
            self.token_name.clone(),
            self.refresh_name(),
            self.user_name.clone(),
        ]
    }

    fn build(&self, name: String, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/".to_string())
            .max_age(Duration::days(self.ttl_days))
            .build()
    }

    fn removal(name: String) -> Cookie<'static> {
        Cookie::build((name, ""))
            .path("/".to_string())
            .max_age(Duration::ZERO)
            .build()
    }
}

/// Read the mirror record carried by a request's cookies.
///
/// Cookies that fail decryption are treated as absent.
pub(crate) fn read_record(jar: &PrivateCookieJar, settings: &CookieSettings) -> MirrorRecord {
    let value = |name: &str| jar.get(name).map(|c| c.value().to_string());
    MirrorRecord {
        token: value(&settings.token_name),
        refresh_token: value(&settings.refresh_name()),
        user: value(&settings.user_name),
    }
}

/// Session mirror backed by encrypted browser cookies.
///
/// Writes are staged on the jar; hand it back with
/// [`into_jar`](CookieMirror::into_jar) so they reach the response.
pub struct CookieMirror {
    jar: Mutex<PrivateCookieJar>,
    key: Key,
    settings: CookieSettings,
}

impl CookieMirror {
    pub(crate) fn new(jar: PrivateCookieJar, key: Key, settings: CookieSettings) -> Self {
        Self {
            jar: Mutex::new(jar),
            key,
            settings,
        }
    }

    /// Current record, including writes staged in this request.
    #[must_use]
    pub fn record(&self) -> MirrorRecord {
        read_record(&self.jar.lock(), &self.settings)
    }

    /// The jar with every staged write, ready to be returned from a handler.
    #[must_use]
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar.into_inner()
    }

    fn update(&self, f: impl FnOnce(PrivateCookieJar) -> PrivateCookieJar) {
        let mut guard = self.jar.lock();
        let jar = std::mem::replace(&mut *guard, PrivateCookieJar::new(self.key.clone()));
        *guard = f(jar);
    }
}

impl SessionMirror for CookieMirror {
    fn load(&self) -> Result<Option<MirrorRecord>, Error> {
        let record = self.record();
        let empty = record.token.is_none() && record.user.is_none();
        Ok((!empty).then_some(record))
    }

    fn persist(&self, record: &MirrorRecord) -> Result<(), Error> {
        let settings = &self.settings;
        let entries = [
            (settings.token_name.clone(), record.token.clone()),
            (settings.refresh_name(), record.refresh_token.clone()),
            (settings.user_name.clone(), record.user.clone()),
        ];
        self.update(|jar| {
            entries.into_iter().fold(jar, |jar, (name, value)| match value {
                Some(value) => jar.add(settings.build(name, value)),
                None => jar.remove(CookieSettings::removal(name)),
            })
        });
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let names = self.settings.names();
        self.update(|jar| {
            names
                .into_iter()
                .fold(jar, |jar, name| jar.remove(CookieSettings::removal(name)))
        });
        Ok(())
    }
}
