use std::sync::Arc;
use std::time::Duration;

use marquee_auth::{AuthorizationEngine, InMemoryPrincipalStore, Principal, PrincipalStore, Role};
use marquee_core::{InMemoryCatalog, MovieCatalog, MovieDraft};

/// Handler-facing services (catalog, principal directory, authz engine).
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<dyn MovieCatalog>,
    pub principals: Arc<dyn PrincipalStore>,
    pub engine: Arc<AuthorizationEngine>,
    pub lookup_timeout: Duration,
}

/// Bcrypt hash of the demo password; stored opaque, never checked here.
const DEMO_PASSWORD_HASH: &str = "$2a$10$eACCYoNOHEqXve8aIWT8Nu3PkMXWBaOxJ9aORUYzfMQCbVBIhZ8tG";

pub fn demo_catalog() -> InMemoryCatalog {
    let movie = |title: &str, image: &str| MovieDraft {
        title: title.to_string(),
        score: 0.0,
        count: 0,
        image: image.to_string(),
    };

    InMemoryCatalog::with_movies([
        movie(
            "The Witcher",
            "https://www.themoviedb.org/t/p/w533_and_h300_bestv2/jBJWaqoSCiARWtfV0GlqHrcdidd.jpg",
        ),
        movie(
            "Venom: Tempo de Carnificina",
            "https://www.themoviedb.org/t/p/w533_and_h300_bestv2/vIgyYkXkg6NC2whRbYjBD7eb3Er.jpg",
        ),
        movie(
            "O Espetacular Homem-Aranha 2: A Ameaça de Electro",
            "https://www.themoviedb.org/t/p/w533_and_h300_bestv2/u7SeO6Y42P7VCTWLhpnL96cyOqd.jpg",
        ),
        movie(
            "Matrix Resurrections",
            "https://www.themoviedb.org/t/p/w533_and_h300_bestv2/hv7o3VgfsairBoQFAawgaQ4cR1m.jpg",
        ),
        movie(
            "Shang-Chi e a Lenda dos Dez Anéis",
            "https://www.themoviedb.org/t/p/w533_and_h300_bestv2/cinER0ESG0eJ49kXlExM0MEWGxW.jpg",
        ),
    ])
}

pub fn demo_principals() -> InMemoryPrincipalStore {
    InMemoryPrincipalStore::with_principals([
        Principal::new("maria@gmail.com", DEMO_PASSWORD_HASH, vec![Role::CLIENT]),
        Principal::new("alex@gmail.com", DEMO_PASSWORD_HASH, vec![Role::CLIENT, Role::ADMIN]),
    ])
}
