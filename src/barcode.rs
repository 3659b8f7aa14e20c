// Normalisation et validation des codes-barres (EAN-8, UPC-A, EAN-13, GTIN-14).

// Longueurs acceptées après normalisation.
const VALID_LENGTHS: [usize; 4] = [8, 12, 13, 14];

// Met un code-barres brut sous forme canonique : chiffres uniquement, complété à gauche par des zéros.
// - 7 chiffres ou moins : complété à 8 (convention EAN-8).
// - 9 à 12 chiffres : complété à 13 (convention EAN-13 / UPC).
// - Sinon, la chaîne de chiffres est retournée telle quelle ; c'est `is_valid` qui tranchera.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        0..=7 => format!("{:0>8}", digits),
        9..=12 => format!("{:0>13}", digits),
        _ => digits,
    }
}

// Vrai si la chaîne est entièrement numérique et d'une longueur reconnue.
pub fn is_valid(canonical: &str) -> bool {
    !canonical.is_empty()
        && canonical.bytes().all(|b| b.is_ascii_digit())
        && VALID_LENGTHS.contains(&canonical.len())
}
