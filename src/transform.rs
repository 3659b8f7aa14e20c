// Conversion d'un produit brut OpenFoodFacts vers la forme simplifiée.
// Chaque champ n'est recopié que s'il est présent en amont : jamais de valeur par défaut inventée.
use crate::models::{value_as_number, Nutriments, RawProduct, Score, SimplifiedProduct};
use serde_json::{Map, Value};

pub fn transform_product(raw: &RawProduct, barcode: &str) -> SimplifiedProduct {
    let mut product = SimplifiedProduct::new(barcode);

    product.name = raw.text("product_name").map(str::to_owned);
    product.brand = raw.text("brands").and_then(first_brand);
    product.image_url = raw.text("image_front_url").map(str::to_owned);
    product.categories = raw.tags("categories_tags").map(clean_tags);
    product.ingredients = raw.text("ingredients_text").map(str::to_owned);
    product.allergens = raw.tags("allergens_tags").map(clean_tags);
    product.nutrition_grade = raw.text("nutrition_grades").map(str::to_owned);
    // `Some(0)` est une valeur réelle et doit être conservée.
    product.nova_group = raw.integer("nova_group");

    product.ecoscore = non_empty_score(Score {
        grade: raw.text("ecoscore_grade").map(str::to_owned),
        score: raw.number("ecoscore_score"),
    });

    product.nutriments = raw.object("nutriments").and_then(extract_nutriments);

    // La note Nutri-Score dédiée est prioritaire, sinon on retombe sur `nutrition_grades`.
    product.nutriscore = non_empty_score(Score {
        grade: raw
            .text("nutriscore_grade")
            .or_else(|| raw.text("nutrition_grades"))
            .map(str::to_owned),
        score: raw
            .object("nutriscore_data")
            .and_then(|data| data.get("score"))
            .and_then(value_as_number),
    });

    product
}

// Premier élément de la liste de marques séparées par des virgules.
fn first_brand(brands: &str) -> Option<String> {
    brands
        .split(',')
        .next()
        .map(str::trim)
        .filter(|brand| !brand.is_empty())
        .map(str::to_owned)
}

fn clean_tags(tags: Vec<&str>) -> Vec<String> {
    tags.into_iter().map(clean_tag).collect()
}

// "en:breakfast-cereals" -> "breakfast cereals"
pub fn clean_tag(tag: &str) -> String {
    strip_language_prefix(tag).replace('-', " ")
}

fn strip_language_prefix(tag: &str) -> &str {
    let bytes = tag.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_lowercase()
        && bytes[1].is_ascii_lowercase()
        && bytes[2] == b':'
    {
        &tag[3..]
    } else {
        tag
    }
}

fn non_empty_score(score: Score) -> Option<Score> {
    (!score.is_empty()).then_some(score)
}

fn extract_nutriments(raw: &Map<String, Value>) -> Option<Nutriments> {
    let field = |key: &str| raw.get(key).and_then(value_as_number);

    let nutriments = Nutriments {
        energy_kcal_100g: field("energy-kcal_100g"),
        proteins_100g: field("proteins_100g"),
        carbohydrates_100g: field("carbohydrates_100g"),
        fat_100g: field("fat_100g"),
        fiber_100g: field("fiber_100g"),
        sugars_100g: field("sugars_100g"),
        salt_100g: field("salt_100g"),
        sodium_100g: field("sodium_100g"),
    };

    (!nutriments.is_empty()).then_some(nutriments)
}
