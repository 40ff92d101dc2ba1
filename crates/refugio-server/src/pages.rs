//! Role pages and the actions they expose.
//!
//! Every handler under a role partition sits behind the gateway, so a
//! [`Caller`] is always present and carries the bearer token relayed to the
//! backend.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use refugio_api::{
    AdoptionRequest, AdoptionUpdate, Adopcion, Animal, BackendApi, EstadoAdopcion, EstadoAnimal,
    Id, Resource, Usuario,
};
use refugio_auth::LOGIN_ROUTE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::gateway::Caller;
use crate::state::AppState;

const DOG_IMAGE_URL: &str = "https://images.unsplash.com/photo-1558788353-f76d92427f16";
const CAT_IMAGE_URL: &str = "https://images.unsplash.com/photo-1518791841217-8f162f1e1131";

/// Picture shown next to an animal, by species.
pub fn avatar_for(tipo: &str) -> &'static str {
    if tipo.eq_ignore_ascii_case("perro") {
        DOG_IMAGE_URL
    } else {
        CAT_IMAGE_URL
    }
}

fn with_avatar(mut animal: Animal) -> Animal {
    animal.avatar = Some(avatar_for(&animal.tipo).to_string());
    animal
}

/// An animal as offered to adopters.
#[derive(Debug, Serialize)]
pub struct AnimalCard {
    #[serde(flatten)]
    pub animal: Animal,
    pub adoptable: bool,
}

impl From<Animal> for AnimalCard {
    fn from(animal: Animal) -> Self {
        Self {
            adoptable: animal.estado == EstadoAnimal::EsperaDeAdopcion,
            animal: with_avatar(animal),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminPage {
    pub animales: Vec<Animal>,
    pub adopciones: Vec<Adopcion>,
    pub adoptantes: Vec<Usuario>,
    pub voluntarios: Vec<Usuario>,
    /// Sections the backend could not provide; rendered empty.
    pub unavailable: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct VoluntarioPage {
    pub adopciones: Vec<Adopcion>,
    pub animales: Vec<Animal>,
    pub adoptantes: Vec<Usuario>,
    pub unavailable: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct AdoptantePage {
    pub animales: Vec<AnimalCard>,
    pub unavailable: Vec<&'static str>,
}

/// Fetch one page section. `None` means the section is unavailable; the
/// cause has already been logged.
async fn fetch_section<T: DeserializeOwned>(
    backend: &dyn BackendApi,
    token: &str,
    resource: Resource,
) -> Option<Vec<T>> {
    let rows = match backend.list(token, resource).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(section = %resource, error = %e, "section unavailable");
            return None;
        }
    };

    let parsed = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(section = %resource, error = %e, "skipping unreadable record");
                None
            }
        })
        .collect();
    Some(parsed)
}

/// Collects section results, remembering which ones came back empty-handed.
#[derive(Default)]
struct Sections {
    unavailable: Vec<&'static str>,
}

impl Sections {
    fn take<T>(&mut self, name: &'static str, section: Option<Vec<T>>) -> Vec<T> {
        section.unwrap_or_else(|| {
            self.unavailable.push(name);
            Vec::new()
        })
    }
}

/// `GET /`: public, points the client at the login screen.
pub async fn root() -> Json<Value> {
    Json(json!({ "page": "index", "redirect": LOGIN_ROUTE }))
}

pub async fn login_page() -> Json<Value> {
    Json(json!({
        "page": "login",
        "action": "/api/login",
        "fields": ["correo", "contra"],
        "register": "/login/register",
    }))
}

pub async fn register_page() -> Json<Value> {
    Json(json!({
        "page": "register",
        "action": "/api/register",
        "fields": ["correo", "nombre", "apellido", "rol", "contra"],
        "roles": ["voluntario", "adoptante"],
        "login": LOGIN_ROUTE,
    }))
}

/// `GET /administrador`
pub async fn admin_page(State(state): State<AppState>, Caller(caller): Caller) -> Json<AdminPage> {
    let backend = state.backend.as_ref();
    let token = caller.token();
    let (animales, adopciones, adoptantes, voluntarios) = tokio::join!(
        fetch_section::<Animal>(backend, token, Resource::Animal),
        fetch_section::<Adopcion>(backend, token, Resource::Adopcion),
        fetch_section::<Usuario>(backend, token, Resource::Adoptantes),
        fetch_section::<Usuario>(backend, token, Resource::Voluntarios),
    );

    let mut sections = Sections::default();
    Json(AdminPage {
        animales: sections
            .take("animales", animales)
            .into_iter()
            .map(with_avatar)
            .collect(),
        adopciones: sections.take("adopciones", adopciones),
        adoptantes: sections.take("adoptantes", adoptantes),
        voluntarios: sections.take("voluntarios", voluntarios),
        unavailable: sections.unavailable,
    })
}

/// `GET /voluntario`
pub async fn voluntario_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Json<VoluntarioPage> {
    let backend = state.backend.as_ref();
    let token = caller.token();
    let (adopciones, animales, adoptantes) = tokio::join!(
        fetch_section::<Adopcion>(backend, token, Resource::Adopcion),
        fetch_section::<Animal>(backend, token, Resource::Animal),
        fetch_section::<Usuario>(backend, token, Resource::Adoptantes),
    );

    let mut sections = Sections::default();
    Json(VoluntarioPage {
        adopciones: sections.take("adopciones", adopciones),
        animales: sections
            .take("animales", animales)
            .into_iter()
            .map(with_avatar)
            .collect(),
        adoptantes: sections.take("adoptantes", adoptantes),
        unavailable: sections.unavailable,
    })
}

/// `GET /adoptante`
pub async fn adoptante_page(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Json<AdoptantePage> {
    let animales =
        fetch_section::<Animal>(state.backend.as_ref(), caller.token(), Resource::Animal).await;

    let mut sections = Sections::default();
    Json(AdoptantePage {
        animales: sections
            .take("animales", animales)
            .into_iter()
            .map(AnimalCard::from)
            .collect(),
        unavailable: sections.unavailable,
    })
}

fn object_body(body: Value) -> ApiResult<Value> {
    if body.is_object() {
        Ok(body)
    } else {
        Err(ApiError::BadRequest("expected a JSON object".to_string()))
    }
}

/// `POST /administrador/{resource}`
pub async fn admin_create(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    let resource: Resource = resource.parse()?;
    let body = object_body(body)?;
    state
        .backend
        .create(caller.token(), resource, &body)
        .await?;
    tracing::info!(%resource, "record created");
    Ok(StatusCode::CREATED)
}

/// `POST /administrador/{resource}/{id}`
pub async fn admin_update(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    let resource: Resource = resource.parse()?;
    let id = Id::from(id.as_str());
    let body = object_body(body)?;
    state
        .backend
        .update(caller.token(), resource, &id, &body)
        .await?;
    tracing::info!(%resource, %id, "record updated");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /administrador/{resource}/{id}/delete`
pub async fn admin_delete(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((resource, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let resource: Resource = resource.parse()?;
    let id = Id::from(id.as_str());
    state.backend.delete(caller.token(), resource, &id).await?;
    tracing::info!(%resource, %id, "record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /voluntario/adopciones/{id}/finalizar`
pub async fn finalize_adoption(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = Id::from(id.as_str());
    let update = AdoptionUpdate {
        estado: EstadoAdopcion::Finalizado,
        voluntario: caller.user_id().clone(),
    };
    let body = serde_json::to_value(&update).map_err(|e| {
        tracing::error!(error = %e, "failed to encode adoption update");
        ApiError::Internal
    })?;
    state
        .backend
        .update(caller.token(), Resource::Adopcion, &id, &body)
        .await?;
    tracing::info!(adopcion = %id, voluntario = %caller.user_id(), "adoption finalized");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /adoptante/animales/{id}/adoptar`
pub async fn request_adoption(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let request = AdoptionRequest {
        animal: Id::from(id.as_str()),
        adoptante: caller.user_id().clone(),
        estado: EstadoAdopcion::EnProceso,
    };
    state
        .backend
        .request_adoption(caller.token(), &request)
        .await?;
    tracing::info!(animal = %request.animal, adoptante = %request.adoptante, "adoption requested");
    Ok((StatusCode::CREATED, Json(request)))
}
