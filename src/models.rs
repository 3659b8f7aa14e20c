use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Forme simplifiée exposée aux clients ---
// Tous les champs hormis `barcode` sont optionnels : une clé absente signifie que la donnée
// n'existait pas en amont. `skip_serializing_if` garantit qu'aucun `null` n'est émis.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedProduct {
    pub barcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nova_group: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecoscore: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutriments: Option<Nutriments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutriscore: Option<Score>,
}

impl SimplifiedProduct {
    // Produit vide : seul le code-barres est connu.
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            name: None,
            brand: None,
            image_url: None,
            categories: None,
            ingredients: None,
            allergens: None,
            nutrition_grade: None,
            nova_group: None,
            ecoscore: None,
            nutriments: None,
            nutriscore: None,
        }
    }
}

// Note + score, partagé par l'Eco-Score et le Nutri-Score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Score {
    pub fn is_empty(&self) -> bool {
        self.grade.is_none() && self.score.is_none()
    }
}

// Valeurs nutritionnelles pour 100 g.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutriments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proteins_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugars_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium_100g: Option<f64>,
}

impl Nutriments {
    pub fn is_empty(&self) -> bool {
        *self == Nutriments::default()
    }
}

// --- Données brutes de l'API amont ---
// Le schéma amont compte des dizaines de champs, souvent absents ou mal typés.
// On le garde sous forme d'objet JSON opaque et on le lit champ par champ.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProduct(pub Map<String, Value>);

impl RawProduct {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    // Chaîne non vide.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    // Liste de tags ; les éléments qui ne sont pas des chaînes sont ignorés.
    pub fn tags(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
    }

    // Nombre, accepté aussi sous forme de chaîne numérique ("4", "12.5").
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(value_as_number)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}

pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Enveloppe de `/api/v2/product/{code}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductEnvelope {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub product: Option<RawProduct>,
}

impl ProductEnvelope {
    // Retourne le produit, sauf si l'amont signale son absence (`status == 0` ou pas de `product`).
    pub fn into_product(self) -> Option<RawProduct> {
        if self.status == Some(0) {
            return None;
        }
        self.product
    }
}

// Enveloppe de `/api/v2/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchEnvelope {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub products: Vec<RawProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub products: Vec<SimplifiedProduct>,
    pub total_count: u64,
}

// --- État des quotas ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatus {
    pub remaining: u32,
    // Millisecondes avant la fin de la fenêtre courante.
    pub reset_in: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub product_queries: CategoryStatus,
    pub search_queries: CategoryStatus,
    pub facet_queries: CategoryStatus,
}

// --- Enveloppes HTTP ---

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
            pagination: None,
            timestamp: current_timestamp(),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: None,
            pagination: None,
            timestamp: current_timestamp(),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub version: &'static str,
}

// Réponse de `/health/detailed` : état du processus en plus de l'état simple.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealth {
    pub status: &'static str,
    pub message: String,
    pub timestamp: String,
    pub system: SystemInfo,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub uptime_secs: u64,
    pub platform: &'static str,
    pub arch: &'static str,
    pub pid: u32,
    pub cache_entries: usize,
}

// Réponse de `/api/v1` : liste des points d'entrée disponibles.
#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub message: &'static str,
    pub status: &'static str,
    pub timestamp: String,
    pub endpoints: ApiEndpoints,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiEndpoints {
    pub barcode: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub service: &'static str,
    pub rate_limits: RateLimitStatus,
}

// Horodatage RFC 3339 utilisé dans toutes les réponses.
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
