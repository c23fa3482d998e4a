/*
 * Responsibility
 * - /drinks 系 CRUD handler
 * - 認可は route_layer (middleware::auth) 側で済ませ、handler は AuthCtxExtractor を受け取るだけ
 * - Json/Path の抽出失敗は AppError (400/404/422) に変換
 */
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    api::{
        dto::drinks::{
            CreateDrinkRequest, DeleteDrinkResponse, DrinkLong, DrinkShort, DrinksResponse,
            UpdateDrinkRequest,
        },
        extractors::AuthCtxExtractor,
    },
    error::AppError,
    state::AppState,
};

fn drink_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|_| AppError::not_found())
}

/// GET /drinks (public)
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>, AppError> {
    let drinks = state.drinks.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.into_iter().map(DrinkShort::from).collect(),
    )))
}

/// GET /drinks-detail
pub async fn list_drinks_detail(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let drinks = state.drinks.list().await?;
    tracing::debug!(
        subject = ?auth.subject(),
        permission = auth.permission,
        count = drinks.len(),
        "drink details listed"
    );

    Ok(Json(DrinksResponse::new(
        drinks.into_iter().map(DrinkLong::from).collect(),
    )))
}

/// POST /drinks
pub async fn create_drink(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let Json(req) = payload?;
    let (title, recipe) = req.validate().map_err(|reason| {
        tracing::debug!(reason, "rejected drink");
        AppError::Unprocessable
    })?;

    let drink = state.drinks.create(&title, &recipe).await?;
    tracing::info!(
        drink_id = drink.id,
        subject = ?auth.subject(),
        permission = auth.permission,
        "drink created"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(drink)])))
}

/// PATCH /drinks/{drink_id}
pub async fn update_drink(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let id = drink_id(path)?;
    let Json(req) = payload?;
    let (title, recipe) = req.validate().map_err(|reason| {
        tracing::debug!(reason, "rejected drink update");
        AppError::Unprocessable
    })?;

    let drink = state
        .drinks
        .update(id, title.as_deref(), recipe.as_deref())
        .await?
        .ok_or_else(AppError::not_found)?;
    tracing::info!(
        drink_id = id,
        subject = ?auth.subject(),
        permission = auth.permission,
        "drink updated"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(drink)])))
}

/// DELETE /drinks/{drink_id}
pub async fn delete_drink(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, AppError> {
    let id = drink_id(path)?;

    if !state.drinks.delete(id).await? {
        return Err(AppError::not_found());
    }
    tracing::info!(
        drink_id = id,
        subject = ?auth.subject(),
        permission = auth.permission,
        "drink deleted"
    );

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}
