use tokio::sync::RwLock;

/// The dashboard's "current user" selection.
///
/// There is no credential check; switching is an explicit request, and a
/// single request may override it with the `X-User-Id` header.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub async fn current_user_id(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn switch_to(&self, user_id: String) -> Option<String> {
        self.current.write().await.replace(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn switch_replaces_previous_user() {
        let store = SessionStore::new(Some("U-1".into()));
        assert_eq!(store.switch_to("U-2".into()).await.as_deref(), Some("U-1"));
        assert_eq!(store.current_user_id().await.as_deref(), Some("U-2"));
        assert!(SessionStore::default().current_user_id().await.is_none());
    }
}
