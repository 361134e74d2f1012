//! Movie catalog: movies plus per-user scores.
//!
//! Stands in for the relational store. A movie's `score` is the average of
//! all user scores and `count` the number of users that scored it.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::MovieId;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 50;
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub score: f64,
    pub count: u32,
    pub image: String,
}

/// Client-supplied movie fields (create/update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDraft {
    pub title: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub image: String,
}

impl MovieDraft {
    pub fn validate(&self) -> DomainResult<()> {
        let len = self.title.trim().chars().count();
        if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "title length must be between {TITLE_MIN_LEN} and {TITLE_MAX_LEN}"
            )));
        }
        validate_score(self.score)
    }
}

/// One user's score for one movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub movie_id: MovieId,
    pub email: String,
    pub score: f64,
}

impl ScoreSubmission {
    pub fn validate(&self) -> DomainResult<()> {
        let email = self.email.trim();
        let well_formed = email.split_once('@').is_some_and(|(user, domain)| {
            !user.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
        if !well_formed {
            return Err(DomainError::validation("email must be a valid address"));
        }
        validate_score(self.score)
    }
}

fn validate_score(score: f64) -> DomainResult<()> {
    if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return Err(DomainError::validation(format!(
            "score must be between {SCORE_MIN} and {SCORE_MAX}"
        )));
    }
    Ok(())
}

/// Catalog storage contract.
pub trait MovieCatalog: Send + Sync {
    fn list(&self) -> DomainResult<Vec<Movie>>;
    fn get(&self, id: MovieId) -> DomainResult<Movie>;
    fn insert(&self, draft: MovieDraft) -> DomainResult<Movie>;
    fn update(&self, id: MovieId, draft: MovieDraft) -> DomainResult<Movie>;
    fn delete(&self, id: MovieId) -> DomainResult<()>;
    /// Record (or replace) a user's score and recompute the movie's average.
    fn save_score(&self, submission: ScoreSubmission) -> DomainResult<Movie>;
}

#[derive(Debug, Default)]
struct CatalogState {
    next_id: u64,
    movies: BTreeMap<MovieId, Movie>,
    scores: HashMap<(MovieId, String), f64>,
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed movies, ignoring drafts that fail validation.
    pub fn with_movies(drafts: impl IntoIterator<Item = MovieDraft>) -> Self {
        let catalog = Self::new();
        for draft in drafts {
            if let Err(e) = catalog.insert(draft) {
                tracing::warn!(error = %e, "skipping invalid seed movie");
            }
        }
        catalog
    }

    fn poisoned() -> DomainError {
        tracing::error!("catalog lock poisoned");
        DomainError::unavailable("catalog lock poisoned")
    }
}

impl MovieCatalog for InMemoryCatalog {
    fn list(&self) -> DomainResult<Vec<Movie>> {
        let state = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(state.movies.values().cloned().collect())
    }

    fn get(&self, id: MovieId) -> DomainResult<Movie> {
        let state = self.inner.read().map_err(|_| Self::poisoned())?;
        state.movies.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn insert(&self, draft: MovieDraft) -> DomainResult<Movie> {
        draft.validate()?;
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;

        state.next_id += 1;
        let movie = Movie {
            id: MovieId::new(state.next_id),
            title: draft.title.trim().to_string(),
            score: draft.score,
            count: draft.count,
            image: draft.image,
        };
        state.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    fn update(&self, id: MovieId, draft: MovieDraft) -> DomainResult<Movie> {
        draft.validate()?;
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;

        let movie = state.movies.get_mut(&id).ok_or(DomainError::NotFound)?;
        movie.title = draft.title.trim().to_string();
        movie.score = draft.score;
        movie.count = draft.count;
        movie.image = draft.image;
        Ok(movie.clone())
    }

    fn delete(&self, id: MovieId) -> DomainResult<()> {
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        state.movies.remove(&id).ok_or(DomainError::NotFound)?;
        state.scores.retain(|(movie_id, _), _| *movie_id != id);
        Ok(())
    }

    fn save_score(&self, submission: ScoreSubmission) -> DomainResult<Movie> {
        submission.validate()?;
        let mut state = self.inner.write().map_err(|_| Self::poisoned())?;
        if !state.movies.contains_key(&submission.movie_id) {
            return Err(DomainError::NotFound);
        }

        let id = submission.movie_id;
        let email = submission.email.trim().to_ascii_lowercase();
        state.scores.insert((id, email), submission.score);

        let (sum, count) = state
            .scores
            .iter()
            .filter(|((movie_id, _), _)| *movie_id == id)
            .fold((0.0_f64, 0_u32), |(sum, n), (_, v)| (sum + v, n + 1));

        let movie = state.movies.get_mut(&id).ok_or(DomainError::NotFound)?;
        movie.count = count;
        movie.score = if count == 0 { 0.0 } else { sum / f64::from(count) };
        Ok(movie.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn draft(title: &str) -> MovieDraft {
        MovieDraft {
            title: title.to_string(),
            score: 0.0,
            count: 0,
            image: "https://img/1.jpg".to_string(),
        }
    }

    fn score(movie_id: MovieId, email: &str, value: f64) -> ScoreSubmission {
        ScoreSubmission {
            movie_id,
            email: email.to_string(),
            score: value,
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let catalog = InMemoryCatalog::new();
        let a = catalog.insert(draft("The Witcher")).unwrap();
        let b = catalog.insert(draft("Venom")).unwrap();
        assert_eq!(a.id, MovieId::new(1));
        assert_eq!(b.id, MovieId::new(2));
        assert_eq!(catalog.list().unwrap().len(), 2);
    }

    #[test]
    fn title_length_is_validated() {
        let catalog = InMemoryCatalog::new();
        assert!(matches!(catalog.insert(draft("ab")), Err(DomainError::Validation(_))));
        assert!(matches!(catalog.insert(draft(&"x".repeat(51))), Err(DomainError::Validation(_))));
    }

    #[test]
    fn update_and_delete_missing_movie_is_not_found() {
        let catalog = InMemoryCatalog::new();
        assert_eq!(catalog.update(MovieId::new(9), draft("Dune")), Err(DomainError::NotFound));
        assert_eq!(catalog.delete(MovieId::new(9)), Err(DomainError::NotFound));
    }

    #[test]
    fn scores_are_averaged_per_user() {
        let catalog = InMemoryCatalog::new();
        let m = catalog.insert(draft("Matrix Resurrections")).unwrap();

        catalog.save_score(score(m.id, "maria@gmail.com", 4.0)).unwrap();
        let updated = catalog.save_score(score(m.id, "alex@gmail.com", 3.0)).unwrap();
        assert_eq!(updated.count, 2);
        assert!((updated.score - 3.5).abs() < f64::EPSILON);

        // Re-scoring replaces the user's previous score.
        let updated = catalog.save_score(score(m.id, "MARIA@gmail.com", 2.0)).unwrap();
        assert_eq!(updated.count, 2);
        assert!((updated.score - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn score_submission_is_validated() {
        let catalog = InMemoryCatalog::new();
        let m = catalog.insert(draft("Shang-Chi")).unwrap();

        for bad in [
            score(m.id, "not-an-email", 3.0),
            score(m.id, "a@b.com", 5.5),
            score(m.id, "a@b.com", f64::NAN),
        ] {
            assert!(matches!(catalog.save_score(bad), Err(DomainError::Validation(_))));
        }
        assert_eq!(
            catalog.save_score(score(MovieId::new(99), "a@b.com", 3.0)),
            Err(DomainError::NotFound)
        );
    }

    #[test]
    fn score_submission_uses_camel_case_on_the_wire() {
        let s: ScoreSubmission =
            serde_json::from_str(r#"{"movieId": 1, "email": "maria@gmail.com", "score": 4.5}"#)
                .unwrap();
        assert_eq!(s.movie_id, MovieId::new(1));
    }

    #[test]
    fn deleting_a_movie_drops_its_scores() {
        let catalog = InMemoryCatalog::new();
        let m = catalog.insert(draft("Spider-Man")).unwrap();
        catalog.save_score(score(m.id, "maria@gmail.com", 4.0)).unwrap();
        catalog.delete(m.id).unwrap();

        let again = catalog.insert(draft("Spider-Man")).unwrap();
        let updated = catalog.save_score(score(again.id, "alex@gmail.com", 1.0)).unwrap();
        assert_eq!(updated.count, 1);
    }

    #[test]
    fn poisoned_catalog_is_unavailable() {
        let catalog = std::sync::Arc::new(InMemoryCatalog::with_movies([draft("The Witcher")]));

        let shared = catalog.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.inner.write().unwrap();
            panic!("writer died while holding the lock");
        })
        .join();

        assert!(matches!(catalog.list(), Err(DomainError::Unavailable(_))));
        assert!(matches!(catalog.get(MovieId::new(1)), Err(DomainError::Unavailable(_))));
        assert!(matches!(catalog.insert(draft("Venom")), Err(DomainError::Unavailable(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: the average always stays inside the score range and the
        /// count equals the number of distinct users.
        #[test]
        fn average_stays_in_range(
            entries in prop::collection::vec((0usize..5, 0.0f64..=5.0), 1..30)
        ) {
            let catalog = InMemoryCatalog::new();
            let m = catalog.insert(draft("Eternals")).unwrap();

            let mut users = std::collections::HashSet::new();
            let mut last = None;
            for (user, value) in entries {
                users.insert(user);
                let email = format!("user{user}@gmail.com");
                last = Some(catalog.save_score(score(m.id, &email, value)).unwrap());
            }

            let movie = last.unwrap();
            prop_assert!(movie.score >= SCORE_MIN && movie.score <= SCORE_MAX);
            prop_assert_eq!(movie.count as usize, users.len());
        }
    }
}
