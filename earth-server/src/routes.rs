//! HTTP routes under `/api/v1`.
//!
//! Single-entity routes are generic over the stored type; listing routes parse
//! their own options from the query string.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use earth_catalog::options::query_bool;
use earth_catalog::{
    City, CityQueryOptions, Continent, ContinentQueryOptions, Country, CountryQueryOptions,
    parse_identifier,
};
use earth_db::{
    Entity, create, find_by_uuid, list_cities, list_continents, list_countries, soft_delete,
    update,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;

type QueryMap = HashMap<String, String>;

/// Create the API router.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/continents", get(get_continents))
        .route("/api/v1/continent", get(get_entity::<Continent>))
        .route("/api/v1/continent/create", post(create_entity::<Continent>))
        .route("/api/v1/continent/update", put(update_entity::<Continent>))
        .route("/api/v1/continent/delete", delete(delete_entity::<Continent>))
        .route("/api/v1/countries", get(get_countries))
        .route("/api/v1/country", get(get_entity::<Country>))
        .route("/api/v1/country/create", post(create_entity::<Country>))
        .route("/api/v1/country/update", put(update_entity::<Country>))
        .route("/api/v1/country/delete", delete(delete_entity::<Country>))
        .route("/api/v1/cities", get(get_cities))
        .route("/api/v1/city", get(get_entity::<City>))
        .route("/api/v1/city/create", post(create_entity::<City>))
        .route("/api/v1/city/update", put(update_entity::<City>))
        .route("/api/v1/city/delete", delete(delete_entity::<City>))
        .layer(middleware::from_fn(log_request))
        .with_state(ctx)
}

async fn log_request(request: Request, next: Next) -> Response {
    log::info!("[http] {} {}", request.method(), request.uri());
    next.run(request).await
}

async fn ping() -> Json<&'static str> {
    Json("")
}

// ── Listings ────────────────────────────────────────────────────────────────

async fn get_continents(
    State(ctx): State<AppContext>,
    query: Result<Query<QueryMap>, QueryRejection>,
) -> Result<Json<Vec<Continent>>, ApiError> {
    let query = query_params(query)?;
    let options = ContinentQueryOptions::from_query(&query)?;
    let continents = ctx
        .with_connection(move |conn| list_continents(conn, &options))
        .await?;
    Ok(Json(continents))
}

async fn get_countries(
    State(ctx): State<AppContext>,
    query: Result<Query<QueryMap>, QueryRejection>,
) -> Result<Json<Vec<Country>>, ApiError> {
    let query = query_params(query)?;
    let options = CountryQueryOptions::from_query(&query)?;
    let countries = ctx
        .with_connection(move |conn| list_countries(conn, &options))
        .await?;
    Ok(Json(countries))
}

async fn get_cities(
    State(ctx): State<AppContext>,
    query: Result<Query<QueryMap>, QueryRejection>,
) -> Result<Json<Vec<City>>, ApiError> {
    let query = query_params(query)?;
    let options = CityQueryOptions::from_query(&query)?;
    let cities = ctx
        .with_connection(move |conn| list_cities(conn, &options))
        .await?;
    Ok(Json(cities))
}

// ── Single entities ─────────────────────────────────────────────────────────

async fn get_entity<E>(
    State(ctx): State<AppContext>,
    query: Result<Query<QueryMap>, QueryRejection>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize + Send + 'static,
{
    let query = query_params(query)?;
    let uuid = required_identifier(&query)?;
    let include_deleted = query_bool(&query, "deleted", false);
    let entity = ctx
        .with_connection(move |conn| find_by_uuid::<E>(conn, &uuid, include_deleted))
        .await?;
    Ok(Json(entity))
}

async fn create_entity<E>(
    State(ctx): State<AppContext>,
    payload: Result<Json<E>, JsonRejection>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize + DeserializeOwned + Send + 'static,
{
    let Json(entity) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let created = ctx.with_connection(move |conn| create(conn, &entity)).await?;
    Ok(Json(created))
}

async fn update_entity<E>(
    State(ctx): State<AppContext>,
    payload: Result<Json<E>, JsonRejection>,
) -> Result<Json<E>, ApiError>
where
    E: Entity + Serialize + DeserializeOwned + Send + 'static,
{
    let Json(entity) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let updated = ctx.with_connection(move |conn| update(conn, &entity)).await?;
    Ok(Json(updated))
}

async fn delete_entity<E>(
    State(ctx): State<AppContext>,
    query: Result<Query<QueryMap>, QueryRejection>,
) -> Result<Json<&'static str>, ApiError>
where
    E: Entity + Send + 'static,
{
    let uuid = required_identifier(&query_params(query)?)?;
    ctx.with_connection(move |conn| soft_delete::<E>(conn, &uuid))
        .await?;
    Ok(Json(""))
}

fn query_params(query: Result<Query<QueryMap>, QueryRejection>) -> Result<QueryMap, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn required_identifier(query: &QueryMap) -> Result<Uuid, ApiError> {
    let value = query
        .get("uuid")
        .ok_or_else(|| ApiError::bad_request("missing 'uuid' query parameter"))?;
    Ok(parse_identifier(value)?)
}
