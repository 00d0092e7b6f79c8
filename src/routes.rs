use std::sync::Arc;

use actix_web::{HttpResponse, Responder, guard, http::Method, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::relay::{GpioBackend, RelayDriver, RelayState};

pub struct AppState<B: GpioBackend> {
    pub driver: Arc<RelayDriver<B>>,
}

impl<B: GpioBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

#[derive(Deserialize)]
struct StatePayload {
    state: String,
}

#[derive(Serialize)]
struct StateBody {
    state: RelayState,
}

impl<B: GpioBackend + 'static> AppState<B> {
    pub fn api_scope(&self) -> actix_web::Scope {
        web::scope("")
            .service(
                web::resource("/health")
                    .route(web::get().to(health))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET]))
                            .to(method_not_allowed),
                    ),
            )
            .service(
                web::resource("/relay/1")
                    .route(web::get().to(get_state::<B>))
                    .route(web::post().to(set_state::<B>))
                    .route(
                        web::route()
                            .guard(guard_not_methods(&[Method::GET, Method::POST]))
                            .to(method_not_allowed),
                    ),
            )
    }
}

async fn health() -> impl Responder {
    web::Json(json!({ "ok": true }))
}

async fn get_state<B: GpioBackend + 'static>(
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let observed = state.driver.read_state().map_err(AppError::Read)?;

    Ok(web::Json(StateBody { state: observed }))
}

async fn set_state<B: GpioBackend + 'static>(
    body: web::Bytes,
    state: web::Data<AppState<B>>,
) -> Result<impl Responder, AppError> {
    let desired = parse_state_payload(&body)?;

    match desired {
        RelayState::On => state.driver.turn_on(),
        RelayState::Off => state.driver.turn_off(),
    }
    .map_err(AppError::Write)?;

    // report what the hardware actually did, not what was asked for
    let observed = state.driver.read_state().map_err(AppError::Write)?;

    Ok(web::Json(StateBody { state: observed }))
}

fn parse_state_payload(body: &[u8]) -> Result<RelayState, AppError> {
    if body.is_empty() {
        return Err(AppError::InvalidPayload);
    }

    let text = std::str::from_utf8(body).map_err(|_| AppError::InvalidPayload)?;
    let desired = match serde_json::from_str::<StatePayload>(text) {
        Ok(payload) => payload.state,
        // plain text bodies are accepted too
        Err(_) => text.trim().to_string(),
    };

    RelayState::parse(&desired).ok_or(AppError::InvalidPayload)
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().finish()
}

fn guard_not_methods(methods: &[Method]) -> impl guard::Guard {
    let allowed: Vec<Method> = methods.to_vec();
    guard::fn_guard(move |ctx| !allowed.iter().any(|m| m == ctx.head().method))
}
