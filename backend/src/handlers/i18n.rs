//! Translation catalog for the browser

use std::collections::BTreeMap;

use axum::{extract::Path, Json};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use shared::{catalog, Language};

#[derive(Serialize)]
pub struct CatalogResponse {
    pub language: &'static str,
    pub strings: BTreeMap<&'static str, &'static str>,
}

/// All interface strings for one language
pub async fn get_catalog(Path(lang): Path<String>) -> AppResult<Json<CatalogResponse>> {
    let language: Language = lang
        .parse()
        .map_err(|_| AppError::NotFound(format!("Language '{}'", lang)))?;

    Ok(Json(CatalogResponse {
        language: language.code(),
        strings: catalog(language),
    }))
}
