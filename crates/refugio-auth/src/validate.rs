//! Input rules applied to the login and registration forms before any call
//! reaches the backend.

use std::collections::BTreeMap;

use refugio_api::{LoginRequest, RegistrationRequest, Role};

/// Field name to message.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

/// Minimum password length on sign-in is exclusive: more than this many chars.
const LOGIN_MIN_PASSWORD: usize = 6;
/// Registration demands strictly more than this many chars.
const REGISTER_MIN_PASSWORD: usize = 10;

/// `^\S+@\S+$`: no whitespace anywhere, and an `@` with something on both sides.
pub fn is_plausible_email(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    value
        .char_indices()
        .any(|(i, c)| c == '@' && i > 0 && i + 1 < value.len())
}

pub fn validate_login(request: &LoginRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !is_plausible_email(&request.correo) {
        errors.insert("correo", "Invalid email");
    }
    if request.contra.chars().count() <= LOGIN_MIN_PASSWORD {
        errors.insert("contra", "Password must be at least 6 characters long");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_registration(request: &RegistrationRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !is_plausible_email(&request.correo) {
        errors.insert("correo", "Invalid email");
    }
    if request.nombre.trim().is_empty() {
        errors.insert("nombre", "Requerido");
    }
    if request.apellido.trim().is_empty() {
        errors.insert("apellido", "Requerido");
    }
    // Administrators are provisioned by other administrators, never self-registered.
    if request.rol == Role::Administrador {
        errors.insert("rol", "Rol no permitido");
    }
    if let Some(message) = password_problem(&request.contra) {
        errors.insert("contra", message);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn password_problem(contra: &str) -> Option<&'static str> {
    if contra.chars().count() <= REGISTER_MIN_PASSWORD {
        return Some("Tiene que tener más de 10 caracteres");
    }
    if !contra.chars().any(|c| c.is_ascii_alphabetic()) {
        return Some("Debe incluir al menos una letra");
    }
    if !contra.chars().any(|c| c.is_ascii_digit()) {
        return Some("Debe incluir al menos un número");
    }
    None
}
