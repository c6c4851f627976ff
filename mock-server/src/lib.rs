use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU16, AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

/// Address body in the BrasilAPI v1 shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub cep: String,
    pub state: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    pub service: String,
}

/// Error body in the BrasilAPI shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    fn new(message: &str, kind: &str) -> Self {
        Self {
            name: "CepPromiseError".to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
        }
    }
}

pub type Db = Arc<RwLock<HashMap<String, Address>>>;

/// Shared server state. Clones observe the same fixtures, fault and counter.
#[derive(Clone, Default)]
pub struct MockState {
    db: Db,
    fault: Arc<AtomicU16>,
    hits: Arc<AtomicUsize>,
}

impl MockState {
    /// State preloaded with `fixtures()`.
    pub fn seeded() -> Self {
        let db = fixtures()
            .into_iter()
            .map(|address| (digits(&address.cep), address))
            .collect();
        Self {
            db: Arc::new(RwLock::new(db)),
            ..Self::default()
        }
    }

    pub async fn insert(&self, address: Address) {
        self.db.write().await.insert(digits(&address.cep), address);
    }

    /// Answer every request with `status` until cleared with `None`.
    pub fn set_fault(&self, status: Option<u16>) {
        self.fault.store(status.unwrap_or(0), Ordering::SeqCst);
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Addresses served by a seeded mock.
pub fn fixtures() -> Vec<Address> {
    vec![
        Address {
            cep: "01310-100".to_string(),
            state: "SP".to_string(),
            city: "São Paulo".to_string(),
            neighborhood: "Bela Vista".to_string(),
            street: "Avenida Paulista".to_string(),
            service: "open-cep".to_string(),
        },
        Address {
            cep: "20040-002".to_string(),
            state: "RJ".to_string(),
            city: "Rio de Janeiro".to_string(),
            neighborhood: "Centro".to_string(),
            street: "Rua da Assembleia".to_string(),
            service: "correios".to_string(),
        },
        Address {
            cep: "70040-010".to_string(),
            state: "DF".to_string(),
            city: "Brasília".to_string(),
            neighborhood: "Asa Norte".to_string(),
            street: "SBN Quadra 1".to_string(),
            service: "viacep".to_string(),
        },
    ]
}

pub fn app() -> Router {
    app_with(MockState::seeded())
}

pub fn app_with(state: MockState) -> Router {
    Router::new()
        .route("/api/cep/v1/{cep}", get(get_cep))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockState::seeded()).await
}

pub async fn run_with(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

fn digits(cep: &str) -> String {
    cep.chars().filter(char::is_ascii_digit).collect()
}

async fn get_cep(
    State(state): State<MockState>,
    Path(cep): Path<String>,
) -> Result<Json<Address>, (StatusCode, Json<ErrorBody>)> {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let fault = state.fault.load(Ordering::SeqCst);
    if fault != 0 {
        let status = StatusCode::from_u16(fault).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(%status, "injected fault");
        return Err((
            status,
            Json(ErrorBody::new("Erro ao consultar os serviços de CEP.", "service_error")),
        ));
    }

    let cep = digits(&cep);
    if cep.len() != 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(
                "CEP deve conter exatamente 8 caracteres.",
                "validation_error",
            )),
        ));
    }

    let db = state.db.read().await;
    db.get(&cep).cloned().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new(
                "Todos os serviços de CEP retornaram erro.",
                "service_error",
            )),
        )
    })
}
