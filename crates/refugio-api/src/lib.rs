use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier as issued by the backend: numeric for most records, but the
/// backend is free to hand out strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Numeric(i64),
    Text(String),
}

pub type UserId = Id;

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Numeric(n) => write!(f, "{n}"),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Numeric(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        value
            .parse::<i64>()
            .map_or_else(|_| Id::Text(value.to_string()), Id::Numeric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrador,
    Voluntario,
    Adoptante,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrador, Role::Voluntario, Role::Adoptante];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::Voluntario => "voluntario",
            Role::Adoptante => "adoptante",
        }
    }

    /// Landing route for this role; also the root of its protected partition.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Administrador => "/administrador",
            Role::Voluntario => "/voluntario",
            Role::Adoptante => "/adoptante",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RefugioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| RefugioError::Validation(format!("unknown role: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoAnimal {
    EnAdopcion,
    Adoptado,
    EsperaDeAdopcion,
    #[serde(other)]
    Desconocido,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoAdopcion {
    EsperaDeAdopcion,
    EnProceso,
    Finalizado,
    #[serde(other)]
    Desconocido,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoUsuario {
    #[default]
    Activo,
    Inactivo,
    #[serde(other)]
    Desconocido,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Animal {
    pub id: Id,
    pub nombre: String,
    #[serde(default)]
    pub edad: Value,
    #[serde(default)]
    pub raza: String,
    #[serde(default)]
    pub tipo: String,
    pub estado: EstadoAnimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: Id,
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub correo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rol: Option<Role>,
    #[serde(default)]
    pub estado: EstadoUsuario,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adopcion {
    pub id: Id,
    #[serde(default)]
    pub animal_nombre: String,
    #[serde(default)]
    pub adoptante_nombre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voluntario_nombre: Option<String>,
    pub estado: EstadoAdopcion,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resource collections exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Animal,
    Adopcion,
    Adoptantes,
    Voluntarios,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Animal,
        Resource::Adopcion,
        Resource::Adoptantes,
        Resource::Voluntarios,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Animal => "animal",
            Resource::Adopcion => "adopcion",
            Resource::Adoptantes => "adoptantes",
            Resource::Voluntarios => "voluntarios",
        }
    }

    /// Prefix of the create/update endpoints. People collections are both
    /// written through the user endpoints.
    pub fn write_prefix(self) -> &'static str {
        match self {
            Resource::Adoptantes | Resource::Voluntarios => "usuario",
            other => other.as_str(),
        }
    }

    pub fn list_endpoint(self) -> String {
        format!("{}-list", self.as_str())
    }

    pub fn create_endpoint(self) -> String {
        format!("{}-create", self.write_prefix())
    }

    pub fn update_endpoint(self, id: &Id) -> String {
        format!("{}-update/{id}", self.write_prefix())
    }

    pub fn delete_endpoint(self, id: &Id) -> String {
        format!("{}-delete/{id}", self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = RefugioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| RefugioError::NotFound(format!("unknown resource: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub correo: String,
    pub contra: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub correo: String,
    pub nombre: String,
    pub apellido: String,
    #[serde(default)]
    pub estado: EstadoUsuario,
    pub rol: Role,
    pub contra: String,
}

/// Token pair returned by the backend's credential check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionRequest {
    pub animal: Id,
    pub adoptante: UserId,
    pub estado: EstadoAdopcion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionUpdate {
    pub estado: EstadoAdopcion,
    pub voluntario: UserId,
}

#[derive(Debug, thiserror::Error)]
pub enum RefugioError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub trait SecretStore: Send + Sync {
    fn get(&self, secret_ref: &str) -> Result<String, RefugioError>;
}

/// The external REST backend, as consumed by the portal.
///
/// Every call except `login` and `register` carries the caller's bearer token;
/// the backend enforces its own business rules on top of that.
#[async_trait::async_trait]
pub trait BackendApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedToken, RefugioError>;
    async fn register(&self, request: &RegistrationRequest) -> Result<(), RefugioError>;
    async fn list(&self, token: &str, resource: Resource) -> Result<Vec<Value>, RefugioError>;
    async fn create(&self, token: &str, resource: Resource, body: &Value)
    -> Result<(), RefugioError>;
    async fn update(
        &self,
        token: &str,
        resource: Resource,
        id: &Id,
        body: &Value,
    ) -> Result<(), RefugioError>;
    async fn delete(&self, token: &str, resource: Resource, id: &Id) -> Result<(), RefugioError>;
    async fn request_adoption(
        &self,
        token: &str,
        request: &AdoptionRequest,
    ) -> Result<(), RefugioError>;
}
