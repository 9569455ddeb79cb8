//! Normalisation de texte pour la recherche et les comparaisons

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Replie un texte pour la comparaison: minuscules, décomposition canonique
/// (NFD) puis suppression des marques combinantes.
///
/// La mise en minuscules a lieu avant la décomposition: certains caractères
/// (`İ` par exemple) produisent une marque combinante en minuscule, qui doit
/// elle aussi disparaître pour que `fold(fold(x)) == fold(x)`.
pub fn fold(text: &str) -> String {
    strip_accents(&text.to_lowercase())
}

/// Décomposition canonique (NFD) puis suppression des marques combinantes,
/// sans toucher à la casse
pub fn strip_accents(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Forme composée canonique (NFC)
///
/// Deux noms visuellement identiques saisis avec des séquences de marques
/// différentes deviennent égaux octet à octet.
pub fn compose(text: &str) -> String {
    text.nfc().collect()
}
