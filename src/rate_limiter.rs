// Limiteur de débit en mémoire, à fenêtres fixes, pour protéger les quotas de l'API amont.
// Chaque catégorie (produit, recherche, facette) a sa propre fenêtre et son propre verrou.
use crate::models::{CategoryStatus, RateLimitStatus};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Product,
    Search,
    // Aucune route ne l'utilise pour l'instant, mais le quota amont existe.
    Facet,
}

impl Category {
    fn index(self) -> usize {
        match self {
            Category::Product => 0,
            Category::Search => 1,
            Category::Facet => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Product => "product",
            Category::Search => "search",
            Category::Facet => "facet",
        }
    }
}

// Nombre maximal de requêtes par fenêtre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Limit {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub product: Limit,
    pub search: Limit,
    pub facet: Limit,
}

impl RateLimits {
    fn for_category(&self, category: Category) -> Limit {
        match category {
            Category::Product => self.product,
            Category::Search => self.search,
            Category::Facet => self.facet,
        }
    }
}

impl Default for RateLimits {
    // Quotas publiés par OpenFoodFacts.
    fn default() -> Self {
        Self {
            product: Limit::per_minute(100),
            search: Limit::per_minute(10),
            facet: Limit::per_minute(2),
        }
    }
}

#[derive(Debug)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

impl RateWindow {
    // Une fenêtre dont l'échéance est atteinte (`>=`, jamais `>`) est expirée :
    // on repart de zéro avec une nouvelle échéance avant toute lecture ou incrémentation.
    fn refresh(&mut self, now: Instant, window: Duration) {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }
    }

    fn remaining_time(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    windows: [Mutex<RateWindow>; 3],
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        // Échéance initiale = maintenant : la première vérification ouvre une fenêtre neuve.
        let now = Instant::now();
        let window = || {
            Mutex::new(RateWindow {
                count: 0,
                reset_at: now,
            })
        };
        Self {
            limits,
            windows: [window(), window(), window()],
        }
    }

    // Indique si une requête est permise, sans consommer le quota.
    pub async fn can_make(&self, category: Category) -> bool {
        let limit = self.limits.for_category(category);
        let now = Instant::now();
        let mut window = self.windows[category.index()].lock().await;
        window.refresh(now, limit.window);

        let allowed = window.count < limit.max_requests;
        if !allowed {
            warn!(
                "Rate limit exceeded for {} queries. Requests: {}/{}, reset in: {}ms",
                category.as_str(),
                window.count,
                limit.max_requests,
                window.remaining_time(now).as_millis()
            );
        }
        allowed
    }

    // Comptabilise une requête effectuée. À appeler une seule fois par appel amont, après `can_make`.
    pub async fn record(&self, category: Category) {
        let limit = self.limits.for_category(category);
        let now = Instant::now();
        let mut window = self.windows[category.index()].lock().await;
        window.refresh(now, limit.window);
        window.count += 1;

        debug!(
            "Request recorded for {} queries. Current count: {}/{}, reset in: {}ms",
            category.as_str(),
            window.count,
            limit.max_requests,
            window.remaining_time(now).as_millis()
        );
    }

    // Vérification et comptabilisation atomiques, sous un seul verrou.
    // Évite qu'une rafale de requêtes concurrentes passe la vérification avant le premier `record`.
    // En cas de refus, retourne le temps restant avant la prochaine fenêtre.
    pub async fn try_acquire(&self, category: Category) -> Result<(), Duration> {
        let limit = self.limits.for_category(category);
        let now = Instant::now();
        let mut window = self.windows[category.index()].lock().await;
        window.refresh(now, limit.window);

        if window.count >= limit.max_requests {
            let wait = window.remaining_time(now);
            warn!(
                "Rate limit exceeded for {} queries. Requests: {}/{}, reset in: {}ms",
                category.as_str(),
                window.count,
                limit.max_requests,
                wait.as_millis()
            );
            return Err(wait);
        }

        window.count += 1;
        debug!(
            "Request recorded for {} queries. Current count: {}/{}",
            category.as_str(),
            window.count,
            limit.max_requests
        );
        Ok(())
    }

    // Temps restant avant la fin de la fenêtre courante (zéro si elle est déjà échue).
    pub async fn reset_time_remaining(&self, category: Category) -> Duration {
        let window = self.windows[category.index()].lock().await;
        window.remaining_time(Instant::now())
    }

    // Instantané en lecture seule ; aucune fenêtre n'est modifiée.
    pub async fn status(&self) -> RateLimitStatus {
        RateLimitStatus {
            product_queries: self.category_status(Category::Product).await,
            search_queries: self.category_status(Category::Search).await,
            facet_queries: self.category_status(Category::Facet).await,
        }
    }

    async fn category_status(&self, category: Category) -> CategoryStatus {
        let limit = self.limits.for_category(category);
        let now = Instant::now();
        let window = self.windows[category.index()].lock().await;

        // Une fenêtre échue compte comme vide, même si elle n'a pas encore été réinitialisée.
        let count = if now >= window.reset_at { 0 } else { window.count };

        CategoryStatus {
            remaining: limit.max_requests.saturating_sub(count),
            reset_in: window.remaining_time(now).as_millis() as u64,
            limit: limit.max_requests,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}
