//! 浏览记录与统计接口
//!
//! - `POST /{shops|products}/{id}/view`
//! - `GET  /{shops|products}/{id}/views`
//! - `GET  /{shops|products}/{id}/views/stats`

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::trace;

use crate::api::error_code::ErrorCode;
use crate::api::helpers::{api_result, error_response};
use crate::api::identity::VisitorExtractor;
use crate::errors::{MarketviewError, Result};
use crate::services::ViewService;
use crate::views::{EntityKind, ViewCount};

pub struct ViewsService;

impl ViewsService {
    pub async fn record_view(
        req: HttpRequest,
        path: web::Path<(String, String)>,
        service: web::Data<Arc<ViewService>>,
        extractor: web::Data<VisitorExtractor>,
    ) -> impl Responder {
        let (collection, raw_id) = path.into_inner();
        let Some(kind) = EntityKind::from_collection(&collection) else {
            return unknown_collection(&collection);
        };

        let visitor = extractor.extract(&req);
        trace!("Recording {} view from {:?}", kind, visitor);

        let result = match parse_entity_id(&raw_id) {
            Ok(id) => service.record_view(kind, id, &visitor).await,
            Err(e) => Err(e),
        };
        api_result(result)
    }

    pub async fn view_count(
        path: web::Path<(String, String)>,
        service: web::Data<Arc<ViewService>>,
    ) -> impl Responder {
        let (collection, raw_id) = path.into_inner();
        let Some(kind) = EntityKind::from_collection(&collection) else {
            return unknown_collection(&collection);
        };

        let result = match parse_entity_id(&raw_id) {
            Ok(id) => service
                .get_view_count(kind, id)
                .await
                .map(|views| ViewCount { views }),
            Err(e) => Err(e),
        };
        api_result(result)
    }

    pub async fn view_stats(
        path: web::Path<(String, String)>,
        service: web::Data<Arc<ViewService>>,
    ) -> impl Responder {
        let (collection, raw_id) = path.into_inner();
        let Some(kind) = EntityKind::from_collection(&collection) else {
            return unknown_collection(&collection);
        };

        let result = match parse_entity_id(&raw_id) {
            Ok(id) => service.get_view_stats(kind, id).await,
            Err(e) => Err(e),
        };
        api_result(result)
    }
}

fn parse_entity_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| MarketviewError::validation(format!("Invalid id: {}", raw)))
}

fn unknown_collection(collection: &str) -> HttpResponse {
    error_response(
        StatusCode::NOT_FOUND,
        ErrorCode::NotFound,
        &format!("Unknown resource: {}", collection),
    )
}

/// 浏览路由配置
pub fn views_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{collection}/{id}/view", web::post().to(ViewsService::record_view))
        .route("/{collection}/{id}/views", web::get().to(ViewsService::view_count))
        .route(
            "/{collection}/{id}/views/stats",
            web::get().to(ViewsService::view_stats),
        )
}
