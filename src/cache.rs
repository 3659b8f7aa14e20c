use crate::models::SimplifiedProduct;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SWEEP_THRESHOLD: usize = 1000;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: SimplifiedProduct,
    stored_at: Instant,
}

impl CacheEntry {
    // Expirée strictement après le TTL : à l'instant exact du TTL, l'entrée est encore servie.
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

// Cache des produits simplifiés, indexé par code-barres canonique.
// L'expiration est paresseuse à la lecture ; un balayage complet des entrées expirées
// est déclenché quand le nombre d'entrées dépasse `sweep_threshold`.
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    sweep_threshold: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(sweep_threshold)),
            ttl,
            sweep_threshold,
        }
    }

    pub async fn get(&self, key: &str) -> Option<SimplifiedProduct> {
        let now = Instant::now();

        // --- Lecture : plusieurs lecteurs peuvent consulter le cache en même temps ---
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(now, self.ttl) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        } // Le verrou en lecture est libéré ici.

        // --- Entrée expirée : suppression sous verrou en écriture ---
        // On revérifie, une écriture concurrente a pu la remplacer entre-temps.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired(now, self.ttl) {
                entries.remove(key);
                debug!("Cache entry expired: {}", key);
            } else {
                return Some(entry.value.clone());
            }
        }
        None
    }

    pub async fn put(&self, key: impl Into<String>, value: SimplifiedProduct) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: now,
            },
        );

        if entries.len() > self.sweep_threshold {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
            debug!(
                "Cache cleanup: removed {} expired entries",
                before - entries.len()
            );
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_SWEEP_THRESHOLD)
    }
}
