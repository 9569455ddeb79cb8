//! Index de recherche en mémoire
//!
//! Construit une seule fois au démarrage depuis le backend, puis figé: les
//! lectures concurrentes ne prennent aucun verrou.
//!
//! La recherche est un parcours linéaire plafonné. Une correspondance peut
//! commencer n'importe où dans le nom replié, ce qu'un index de préfixes ne
//! sait pas servir; les volumes (quelques dizaines de milliers de communes)
//! restent largement compatibles avec un parcours en mémoire.

use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::error::ContoursError;
use crate::store::{BoundarySession, BoundaryStore};
use crate::text::fold;
use crate::types::{CirconscriptionEntry, CommuneEntry, DepartementEntry};

/// Nombre maximal de résultats par catégorie
pub const MAX_RESULTS: usize = 10;

/// Catégories interrogées par une recherche
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    #[default]
    All,
    Departement,
    Circonscription,
    Commune,
}

impl SearchScope {
    fn includes(self, other: SearchScope) -> bool {
        self == SearchScope::All || self == other
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SearchScope::All),
            "departement" => Ok(SearchScope::Departement),
            "circonscription" => Ok(SearchScope::Circonscription),
            "commune" => Ok(SearchScope::Commune),
            _ => Err(format!(
                "Invalid search type: {}. Use: all, departement, circonscription, commune",
                s
            )),
        }
    }
}

/// Résultats d'une recherche, dans l'ordre alphabétique de l'index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub departements: Vec<DepartementEntry>,
    pub circonscriptions: Vec<CirconscriptionEntry>,
    pub communes: Vec<CommuneEntry>,
}

/// Entrée de l'index avec ses clés de comparaison pré-calculées
#[derive(Debug)]
struct Indexed<T> {
    entry: T,
    name_key: String,
    code_key: Option<String>,
}

impl<T> Indexed<T> {
    fn matches(&self, folded: &str, lowered: &str) -> bool {
        self.name_key.contains(folded)
            || self
                .code_key
                .as_deref()
                .is_some_and(|code| code.contains(lowered))
    }
}

/// Instantané immuable des trois catégories
#[derive(Debug, Default)]
pub struct SearchIndex {
    departements: Vec<Indexed<DepartementEntry>>,
    circonscriptions: Vec<Indexed<CirconscriptionEntry>>,
    communes: Vec<Indexed<CommuneEntry>>,
}

impl SearchIndex {
    /// Construit l'index et trie chaque catégorie par nom replié
    ///
    /// L'ordre ne dépend donc pas de la collation du backend: "Évry" se
    /// range entre "Abbéville" et "Zèbre".
    pub fn new(
        departements: Vec<DepartementEntry>,
        circonscriptions: Vec<CirconscriptionEntry>,
        communes: Vec<CommuneEntry>,
    ) -> Self {
        Self {
            departements: snapshot(departements, true, |d| (d.name.as_str(), d.code.as_str())),
            circonscriptions: snapshot(circonscriptions, false, |c| {
                (c.name.as_str(), c.departement.as_str())
            }),
            communes: snapshot(communes, true, |c| (c.name.as_str(), c.code.as_str())),
        }
    }

    /// Construit l'index en parcourant le backend (une projection par catégorie)
    ///
    /// Toute erreur est fatale: le service ne doit pas démarrer sans index.
    pub async fn build<S: BoundaryStore>(store: &S) -> Result<Self, ContoursError> {
        let session = store.open_session().await.map_err(init_failure)?;

        let departements = session.departements().await.map_err(init_failure)?;
        let circonscriptions = session.circonscriptions().await.map_err(init_failure)?;
        let communes = session.communes().await.map_err(init_failure)?;

        info!(
            backend = store.backend_name(),
            departements = departements.len(),
            circonscriptions = circonscriptions.len(),
            communes = communes.len(),
            "Search index built"
        );

        Ok(Self::new(departements, circonscriptions, communes))
    }

    /// Recherche insensible aux accents et à la casse
    ///
    /// Une requête vide renvoie trois listes vides sans parcourir l'index.
    pub fn search(&self, query: &str, scope: SearchScope) -> SearchResults {
        let mut results = SearchResults::default();
        if query.is_empty() {
            return results;
        }

        let folded = fold(query);
        let lowered = query.to_lowercase();

        if scope.includes(SearchScope::Departement) {
            results.departements = collect_matches(&self.departements, &folded, &lowered);
        }
        if scope.includes(SearchScope::Circonscription) {
            results.circonscriptions = collect_matches(&self.circonscriptions, &folded, &lowered);
        }
        if scope.includes(SearchScope::Commune) {
            results.communes = collect_matches(&self.communes, &folded, &lowered);
        }

        results
    }

    pub fn departements(&self) -> impl Iterator<Item = &DepartementEntry> {
        self.departements.iter().map(|i| &i.entry)
    }

    pub fn circonscriptions(&self) -> impl Iterator<Item = &CirconscriptionEntry> {
        self.circonscriptions.iter().map(|i| &i.entry)
    }

    pub fn communes(&self) -> impl Iterator<Item = &CommuneEntry> {
        self.communes.iter().map(|i| &i.entry)
    }
}

/// Calcule les clés de comparaison puis trie par (nom replié, nom, clé secondaire)
///
/// `keys` renvoie le nom et la clé secondaire (code ou département). Le code
/// n'est cherchable que si `searchable_code` est vrai.
fn snapshot<T>(
    entries: Vec<T>,
    searchable_code: bool,
    keys: impl Fn(&T) -> (&str, &str),
) -> Vec<Indexed<T>> {
    let mut indexed: Vec<Indexed<T>> = entries
        .into_iter()
        .map(|entry| {
            let (name, secondary) = keys(&entry);
            Indexed {
                name_key: fold(name),
                code_key: searchable_code.then(|| secondary.to_lowercase()),
                entry,
            }
        })
        .collect();

    indexed.sort_by(|a, b| {
        let (a_name, a_secondary) = keys(&a.entry);
        let (b_name, b_secondary) = keys(&b.entry);
        a.name_key
            .cmp(&b.name_key)
            .then_with(|| a_name.cmp(b_name))
            .then_with(|| a_secondary.cmp(b_secondary))
    });
    indexed
}

/// Parcours dans l'ordre de l'index, arrêté au dixième résultat
fn collect_matches<T: Clone>(entries: &[Indexed<T>], folded: &str, lowered: &str) -> Vec<T> {
    entries
        .iter()
        .filter(|i| i.matches(folded, lowered))
        .take(MAX_RESULTS)
        .map(|i| i.entry.clone())
        .collect()
}

fn init_failure(err: ContoursError) -> ContoursError {
    match err {
        ContoursError::InitializationFailure { .. } => err,
        other => ContoursError::initialization("Failed to build search index", Some(other.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundaryFilter, BoundaryRow};
    use async_trait::async_trait;

    fn commune(code: &str, name: &str, departement: &str) -> CommuneEntry {
        CommuneEntry {
            code: code.into(),
            name: name.into(),
            departement: departement.into(),
        }
    }

    fn sample_index() -> SearchIndex {
        let departements = vec![
            DepartementEntry {
                code: "01".into(),
                name: "Ain".into(),
            },
            DepartementEntry {
                code: "2A".into(),
                name: "Corse-du-Sud".into(),
            },
            DepartementEntry {
                code: "54".into(),
                name: "Meurthe-et-Moselle".into(),
            },
            DepartementEntry {
                code: "75".into(),
                name: "Paris".into(),
            },
        ];
        let circonscriptions = vec![
            CirconscriptionEntry {
                name: "1ère circonscription".into(),
                departement: "Meurthe-et-Moselle".into(),
            },
            CirconscriptionEntry {
                name: "1ère circonscription".into(),
                departement: "Paris".into(),
            },
            CirconscriptionEntry {
                name: "2ème circonscription".into(),
                departement: "Paris".into(),
            },
        ];
        let communes = vec![
            commune("01053", "Bourg-en-Bresse", "Ain"),
            commune("54231", "Fléville-devant-Nancy", "Meurthe-et-Moselle"),
            commune("54395", "Nancy", "Meurthe-et-Moselle"),
            commune("75056", "Paris", "Paris"),
        ];
        SearchIndex::new(departements, circonscriptions, communes)
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = sample_index();
        for scope in [
            SearchScope::All,
            SearchScope::Departement,
            SearchScope::Circonscription,
            SearchScope::Commune,
        ] {
            assert_eq!(index.search("", scope), SearchResults::default());
        }
    }

    #[test]
    fn test_accent_insensitive_commune() {
        let index = sample_index();
        let results = index.search("fleville", SearchScope::Commune);
        assert_eq!(results.communes.len(), 1);
        assert_eq!(results.communes[0].code, "54231");
        assert!(results.departements.is_empty());
        assert!(results.circonscriptions.is_empty());

        let upper = index.search("FLÉVILLE", SearchScope::Commune);
        assert_eq!(upper.communes, results.communes);
    }

    #[test]
    fn test_substring_anywhere_in_name() {
        let index = sample_index();
        let results = index.search("nancy", SearchScope::Commune);
        let codes: Vec<&str> = results.communes.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["54231", "54395"]);
    }

    #[test]
    fn test_code_match_departement_and_commune() {
        let index = sample_index();
        let results = index.search("2a", SearchScope::Departement);
        assert_eq!(results.departements.len(), 1);
        assert_eq!(results.departements[0].name, "Corse-du-Sud");

        let results = index.search("7505", SearchScope::All);
        assert_eq!(results.communes.len(), 1);
        assert_eq!(results.communes[0].name, "Paris");
    }

    #[test]
    fn test_circonscription_matches_name_only() {
        let index = sample_index();
        let results = index.search("1ere", SearchScope::Circonscription);
        assert_eq!(results.circonscriptions.len(), 2);
        assert_eq!(results.circonscriptions[0].departement, "Meurthe-et-Moselle");
        assert_eq!(results.circonscriptions[1].departement, "Paris");
    }

    #[test]
    fn test_results_capped_and_ordered() {
        let communes: Vec<CommuneEntry> = (0..50)
            .map(|i| commune(&format!("99{:03}", i), &format!("Saint-Martin {:02}", i), "Test"))
            .collect();
        let index = SearchIndex::new(vec![], vec![], communes);

        let results = index.search("saint", SearchScope::Commune);
        assert_eq!(results.communes.len(), MAX_RESULTS);
        let names: Vec<&str> = results.communes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names[0], "Saint-Martin 00");
        assert_eq!(names[9], "Saint-Martin 09");
    }

    #[test]
    fn test_order_ignores_accents() {
        let communes = vec![
            commune("80001", "Abbéville", "Somme"),
            commune("99002", "Zèbre", "Test"),
            commune("91228", "Évry", "Essonne"),
        ];
        let index = SearchIndex::new(vec![], vec![], communes);

        let names: Vec<&str> = index.communes().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Abbéville", "Évry", "Zèbre"]);

        let results = index.search("e", SearchScope::Commune);
        let names: Vec<&str> = results.communes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Abbéville", "Évry", "Zèbre"]);
    }

    #[test]
    fn test_circonscriptions_ordered_by_departement_on_ties() {
        let circonscriptions = vec![
            CirconscriptionEntry {
                name: "1ère circonscription".into(),
                departement: "Paris".into(),
            },
            CirconscriptionEntry {
                name: "1ère circonscription".into(),
                departement: "Ain".into(),
            },
        ];
        let index = SearchIndex::new(vec![], circonscriptions, vec![]);
        let deps: Vec<&str> = index
            .circonscriptions()
            .map(|c| c.departement.as_str())
            .collect();
        assert_eq!(deps, vec!["Ain", "Paris"]);
    }

    /// Backend dont une projection échoue
    struct BrokenStore;

    struct BrokenSession;

    #[async_trait]
    impl BoundaryStore for BrokenStore {
        type Session = BrokenSession;

        async fn open_session(&self) -> Result<BrokenSession, ContoursError> {
            Ok(BrokenSession)
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    #[async_trait]
    impl BoundarySession for BrokenSession {
        async fn count(&self, _filter: &BoundaryFilter) -> Result<u64, ContoursError> {
            Ok(0)
        }

        async fn fetch(
            &self,
            _filter: &BoundaryFilter,
            _limit: u64,
        ) -> Result<Vec<BoundaryRow>, ContoursError> {
            Ok(vec![])
        }

        async fn departements(&self) -> Result<Vec<DepartementEntry>, ContoursError> {
            Ok(vec![])
        }

        async fn circonscriptions(&self) -> Result<Vec<CirconscriptionEntry>, ContoursError> {
            Err(ContoursError::backend("connection reset"))
        }

        async fn communes(&self) -> Result<Vec<CommuneEntry>, ContoursError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_build_failure_is_initialization_failure() {
        let err = SearchIndex::build(&BrokenStore).await.unwrap_err();
        match err {
            ContoursError::InitializationFailure {
                source: Some(source),
                ..
            } => {
                let inner = source
                    .downcast_ref::<ContoursError>()
                    .expect("backend error kept as source");
                assert!(matches!(inner, ContoursError::BackendUnavailable(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("all".parse::<SearchScope>().unwrap(), SearchScope::All);
        assert_eq!(
            "commune".parse::<SearchScope>().unwrap(),
            SearchScope::Commune
        );
        assert!("ville".parse::<SearchScope>().is_err());
    }
}
