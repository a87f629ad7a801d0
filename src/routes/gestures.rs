use actix_web::{web, HttpRequest, HttpResponse, Responder};
use validator::Validate;
use crate::models::{
    ErrorResponse, GestureType, RecordGestureRequest, RecordGestureResponse, UndoDislikeResponse,
};
use crate::services::StoreError;
use super::{authorization, unauthorized, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/gestures", web::post().to(record_gesture))
        .route("/gestures/dislike/undo", web::post().to(undo_dislike));
}

/// Record a gesture on a dish
///
/// POST /api/v1/gestures
///
/// Request body:
/// ```json
/// {
///   "restaurant_dish_id": "uuid",
///   "gesture_type": "like|dislike|wishlist"
/// }
/// ```
async fn record_gesture(
    state: web::Data<AppState>,
    body: web::Json<RecordGestureRequest>,
    req: HttpRequest,
) -> impl Responder {
    let user_id = match state.verifier.user_from_header(authorization(&req)) {
        Ok(user_id) => user_id,
        Err(e) => return unauthorized(e.to_string()),
    };

    if let Err(errors) = body.validate() {
        return bad_request("gesture_type", errors.to_string());
    }

    let gesture_type: GestureType = match body.gesture_type.parse() {
        Ok(gesture_type) => gesture_type,
        Err(message) => return bad_request("gesture_type", message),
    };

    match state
        .discovery
        .store()
        .record_gesture(user_id, body.restaurant_dish_id, gesture_type)
        .await
    {
        Ok(gesture) => {
            tracing::debug!(
                "Recorded {} of dish {} by {}",
                gesture_type.as_str(),
                gesture.restaurant_dish_id,
                user_id
            );
            HttpResponse::Ok().json(RecordGestureResponse {
                message: "Gesture recorded".to_string(),
                user_gesture_id: gesture.user_gesture_id,
            })
        }
        Err(StoreError::NotFound(message)) => bad_request("restaurant_dish_id", message),
        Err(e) => {
            tracing::error!("Failed to record gesture for {}: {}", user_id, e);
            internal_error("Failed to record gesture", e)
        }
    }
}

/// Undo the caller's most recent dislike
///
/// POST /api/v1/gestures/dislike/undo
async fn undo_dislike(state: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let user_id = match state.verifier.user_from_header(authorization(&req)) {
        Ok(user_id) => user_id,
        Err(e) => return unauthorized(e.to_string()),
    };

    match undo_latest_dislike(state.discovery.store().as_ref(), user_id).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            tracing::error!("Failed to undo dislike for {}: {}", user_id, e);
            internal_error("Failed to undo dislike", e)
        }
    }
}

async fn undo_latest_dislike(
    store: &dyn crate::services::DiscoveryStore,
    user_id: uuid::Uuid,
) -> Result<UndoDislikeResponse, StoreError> {
    let Some(gesture) = store.latest_active_dislike(user_id).await? else {
        return Ok(UndoDislikeResponse::nothing());
    };

    // Lost a race with a concurrent undo
    if !store.soft_delete_gesture(gesture.user_gesture_id).await? {
        return Ok(UndoDislikeResponse::nothing());
    }

    tracing::info!("Undid dislike {} of dish {} for {}", gesture.user_gesture_id, gesture.restaurant_dish_id, user_id);

    Ok(match store.dish_summary(gesture.restaurant_dish_id).await? {
        Some(summary) => summary.into(),
        None => UndoDislikeResponse::nothing(),
    })
}

fn bad_request(field: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "invalid_input".to_string(),
        message: message.into(),
        field: Some(field.to_string()),
        status_code: 400,
    })
}

fn internal_error(error: &str, e: StoreError) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        message: e.to_string(),
        field: None,
        status_code: 500,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DiscoveryStore, MemoryStore};
    use crate::models::{Dish, GestureStatus, PlaceId, RestaurantRecord};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let restaurant_info_id = Uuid::new_v4();
        let dish_id = Uuid::new_v4();
        store.add_restaurant(RestaurantRecord {
            restaurant_info_id,
            place_id: PlaceId::from("p1"),
            name: "Dosa Corner".to_string(),
            latitude: 12.9,
            longitude: 77.6,
            price: 2,
            rating: 4.2,
            address: None,
            contact_no: None,
        });
        store.add_dish(Dish {
            restaurant_dish_id: dish_id,
            restaurant_info_id,
            dish_image_url: Some("https://img/dosa.jpg".to_string()),
            labels: vec!["dosa".to_string()],
        });
        (store, dish_id)
    }

    #[tokio::test]
    async fn test_undo_restores_latest_dislike() {
        let (store, dish_id) = seeded();
        let user = Uuid::new_v4();
        let older = store.add_gesture_at(user, dish_id, GestureType::Dislike, Utc::now() - Duration::days(3));
        let newer = store.add_gesture_at(user, dish_id, GestureType::Dislike, Utc::now());

        let response = undo_latest_dislike(&store, user).await.unwrap();
        match response {
            UndoDislikeResponse::Restored { restaurant_name, restaurant_dish, .. } => {
                assert_eq!(restaurant_name, "Dosa Corner");
                assert_eq!(restaurant_dish.restaurant_dish_id, dish_id);
            }
            UndoDislikeResponse::Nothing { .. } => panic!("expected a restored dish"),
        }

        assert_eq!(store.dislike_history(user, dish_id).await.unwrap().len(), 1);
        assert_eq!(store.gesture(older).unwrap().status, GestureStatus::Active);
        assert_eq!(store.gesture(newer).unwrap().status, GestureStatus::Deleted);
    }

    #[tokio::test]
    async fn test_undo_without_dislikes() {
        let (store, dish_id) = seeded();
        let user = Uuid::new_v4();
        store.add_gesture_at(user, dish_id, GestureType::Like, Utc::now());

        let response = undo_latest_dislike(&store, user).await.unwrap();
        assert!(matches!(response, UndoDislikeResponse::Nothing { ref message } if message == "There is nothing to undo"));
    }
}
